use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::config::APP_CONFIG;
use crate::entities::college_settings::{self, SETTINGS_ROW_ID};
use crate::static_service::database;

pub struct SettingsRepository;

#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub college_name: Option<String>,
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub website: Option<String>,
    pub current_academic_year: Option<String>,
}

/// `Some("")` clears an optional text column.
fn optional(value: String) -> Option<String> {
    Some(value).filter(|v| !v.trim().is_empty())
}

impl SettingsRepository {
    pub fn new() -> Self {
        Self
    }

    fn get_connection(&self) -> Result<&'static DatabaseConnection> {
        database()
    }

    /// Returns the settings row, creating it from configuration the first time.
    pub async fn get(&self) -> Result<college_settings::Model> {
        let db = self.get_connection()?;
        if let Some(settings) = college_settings::Entity::find_by_id(SETTINGS_ROW_ID)
            .one(db)
            .await?
        {
            return Ok(settings);
        }

        tracing::info!("Creating default college settings");
        let settings = college_settings::ActiveModel {
            settings_id: Set(SETTINGS_ROW_ID),
            college_name: Set(APP_CONFIG.college_name.clone()),
            address: Set(None),
            contact_email: Set(None),
            contact_phone: Set(None),
            website: Set(None),
            current_academic_year: Set(APP_CONFIG.default_academic_year.clone()),
            updated_at: Set(Utc::now().naive_utc()),
        };
        Ok(settings.insert(db).await?)
    }

    pub async fn current_academic_year(&self) -> Result<String> {
        Ok(self.get().await?.current_academic_year)
    }

    pub async fn update(&self, updates: SettingsUpdate) -> Result<college_settings::Model> {
        let current = self.get().await?;
        let db = self.get_connection()?;

        let mut active_model: college_settings::ActiveModel = current.into();
        if let Some(college_name) = updates.college_name {
            active_model.college_name = Set(college_name);
        }
        if let Some(address) = updates.address {
            active_model.address = Set(optional(address));
        }
        if let Some(contact_email) = updates.contact_email {
            active_model.contact_email = Set(optional(contact_email));
        }
        if let Some(contact_phone) = updates.contact_phone {
            active_model.contact_phone = Set(optional(contact_phone));
        }
        if let Some(website) = updates.website {
            active_model.website = Set(optional(website));
        }
        if let Some(current_academic_year) = updates.current_academic_year {
            active_model.current_academic_year = Set(current_academic_year);
        }
        active_model.updated_at = Set(Utc::now().naive_utc());

        Ok(active_model.update(db).await?)
    }
}
