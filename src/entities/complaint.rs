//! `SeaORM` Entity for complaint table

use super::sea_orm_active_enums::ComplaintStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "complaint")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub complaint_id: Uuid,
    pub student_id: Uuid,
    pub department_id: Option<Uuid>,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub status: ComplaintStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub response: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
