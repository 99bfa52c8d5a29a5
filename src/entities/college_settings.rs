//! `SeaORM` Entity for college_settings table (single row, id 1)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const SETTINGS_ROW_ID: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "college_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub settings_id: i32,
    pub college_name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub website: Option<String>,
    pub current_academic_year: String,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
