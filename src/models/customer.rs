// src/models/customer.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::operation::OperationKind;

/// Contracted service type at a customer, with its own surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[schema(example = "Deratizare")]
    pub label: String,
    pub value: OperationKind,
    #[serde(default)]
    pub active: bool,
    // The admin screens send "" for an unset surface.
    #[serde(default, deserialize_with = "deserialize_surface")]
    #[schema(value_type = Option<f64>, example = 120.5)]
    pub surface: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[schema(example = "SC Exemplu SRL")]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(example = "C-2024/17")]
    pub contract_number: Option<String>,
    #[schema(example = "Str. Fabricii 3, Cluj-Napoca")]
    pub location: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub total_surface: Option<Decimal>,
    #[sqlx(json)]
    pub jobs: Vec<Job>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Surface used for `op`: the job's own surface, else the nominal total.
    pub fn surface_for(&self, op: OperationKind) -> Option<Decimal> {
        self.jobs
            .iter()
            .find(|job| job.value == op)
            .and_then(|job| job.surface)
            .or(self.total_surface)
    }
}

/// Body of create and update (full replace).
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "SC Exemplu SRL")]
    pub name: String,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub contract_number: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "deserialize_surface")]
    #[schema(value_type = Option<f64>)]
    pub total_surface: Option<Decimal>,
    #[serde(default)]
    #[validate(custom(function = "unique_job_values"))]
    pub jobs: Vec<Job>,
}

/// At most one job per operation type.
fn unique_job_values(jobs: &[Job]) -> Result<(), ValidationError> {
    let mut seen = Vec::with_capacity(jobs.len());
    for job in jobs {
        if seen.contains(&job.value) {
            let mut error = ValidationError::new("duplicate_job");
            error.message = Some(format!("duplicate job '{}'", job.value.as_str()).into());
            return Err(error);
        }
        seen.push(job.value);
    }
    Ok(())
}

pub(crate) fn deserialize_surface<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Decimal::try_from(n).map(Some).map_err(de::Error::custom),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => Decimal::from_str(&s.trim().replace(',', "."))
            .map(Some)
            .map_err(de::Error::custom),
    }
}
