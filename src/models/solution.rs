// src/models/solution.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A consumable chemical with its stock counters.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub id: Uuid,
    #[schema(example = "Brodifacoum Bloc")]
    pub name: String,
    #[schema(example = "L-2291")]
    pub lot: Option<String>,
    /// Percent.
    #[schema(value_type = Option<f64>, example = 0.005)]
    pub concentration: Option<Decimal>,
    #[schema(example = "kg")]
    pub unit_of_measure: Option<String>,
    /// Quantity used per unit of surface.
    #[schema(value_type = f64, example = 0.5)]
    pub dosage_per_area: Decimal,
    #[schema(value_type = f64)]
    pub initial_stock: Decimal,
    #[schema(value_type = f64)]
    pub total_quantity: Decimal,
    #[schema(value_type = f64)]
    pub remaining_quantity: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of create and update (full replace).
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "stock_counters_consistent"))]
pub struct SolutionPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: String,
    pub lot: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub concentration: Option<Decimal>,
    pub unit_of_measure: Option<String>,
    #[schema(value_type = f64)]
    pub dosage_per_area: Decimal,
    #[schema(value_type = f64)]
    pub initial_stock: Decimal,
    #[schema(value_type = f64)]
    pub total_quantity: Decimal,
    #[schema(value_type = f64)]
    pub remaining_quantity: Decimal,
}

/// `0 <= remaining <= total <= initial`, and no negative dosage.
fn stock_counters_consistent(payload: &SolutionPayload) -> Result<(), ValidationError> {
    if payload.dosage_per_area < Decimal::ZERO {
        return Err(ValidationError::new("negative_dosage"));
    }

    let ordered = Decimal::ZERO <= payload.remaining_quantity
        && payload.remaining_quantity <= payload.total_quantity
        && payload.total_quantity <= payload.initial_stock;

    if !ordered {
        let mut error = ValidationError::new("stock_counters");
        error.message = Some("expected 0 <= remaining <= total <= initial".into());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(initial: &str, total: &str, remaining: &str) -> SolutionPayload {
        SolutionPayload {
            name: "Raticid".to_string(),
            lot: None,
            concentration: None,
            unit_of_measure: Some("kg".to_string()),
            dosage_per_area: Decimal::ONE,
            initial_stock: initial.parse().unwrap(),
            total_quantity: total.parse().unwrap(),
            remaining_quantity: remaining.parse().unwrap(),
        }
    }

    #[test]
    fn stock_counters_must_be_ordered() {
        assert!(payload("100", "80", "20").validate().is_ok());
        assert!(payload("100", "80", "90").validate().is_err());
        assert!(payload("50", "80", "20").validate().is_err());
        assert!(payload("100", "80", "-1").validate().is_err());
    }
}
