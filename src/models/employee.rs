// src/models/employee.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    #[schema(example = "Ion")]
    pub first_name: String,
    #[schema(example = "Popescu")]
    pub last_name: String,
    // ID document, printed on the certificate. Never used as a credential.
    #[schema(example = "CJ")]
    pub id_series: Option<String>,
    #[schema(example = "123456")]
    pub id_number: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePayload {
    #[validate(length(min = 1, message = "required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "required"))]
    pub last_name: String,
    #[validate(length(max = 2, message = "id_series_too_long"))]
    pub id_series: Option<String>,
    pub id_number: Option<String>,
    pub phone: Option<String>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    /// "CJ 123456", or whatever part is known.
    pub fn id_document(&self) -> Option<String> {
        let parts: Vec<&str> = [self.id_series.as_deref(), self.id_number.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}
