// src/models/workflow.rs

use std::collections::BTreeMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{customer::Customer, employee::Employee, operation::OperationKind, solution::Solution},
};

/// Steps of the field form, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    SelectEmployee,
    SelectCustomer,
    SelectOperations,
    EnterClientRepresentative,
    ReviewAndSign,
    Submitted,
}

impl Step {
    pub fn next(self) -> Option<Step> {
        match self {
            Step::SelectEmployee => Some(Step::SelectCustomer),
            Step::SelectCustomer => Some(Step::SelectOperations),
            Step::SelectOperations => Some(Step::EnterClientRepresentative),
            Step::EnterClientRepresentative => Some(Step::ReviewAndSign),
            // Leaving ReviewAndSign is the submission itself.
            Step::ReviewAndSign | Step::Submitted => None,
        }
    }

    pub fn previous(self) -> Option<Step> {
        match self {
            Step::SelectEmployee | Step::Submitted => None,
            Step::SelectCustomer => Some(Step::SelectEmployee),
            Step::SelectOperations => Some(Step::SelectCustomer),
            Step::EnterClientRepresentative => Some(Step::SelectOperations),
            Step::ReviewAndSign => Some(Step::EnterClientRepresentative),
        }
    }
}

/// Employee as needed by the certificate.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRef {
    pub id: Uuid,
    pub full_name: String,
    pub id_document: Option<String>,
}

impl From<&Employee> for EmployeeRef {
    fn from(employee: &Employee) -> Self {
        Self {
            id: employee.id,
            full_name: employee.full_name(),
            id_document: employee.id_document(),
        }
    }
}

/// Solution picked for an operation. The unit of measure is deliberately not
/// part of it: it is read again when the certificate is rendered.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectedSolution {
    pub id: Uuid,
    pub name: String,
    pub lot: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub concentration: Option<Decimal>,
    #[schema(value_type = f64)]
    pub dosage_per_area: Decimal,
}

impl From<&Solution> for SelectedSolution {
    fn from(solution: &Solution) -> Self {
        Self {
            id: solution.id,
            name: solution.name.clone(),
            lot: solution.lot.clone(),
            concentration: solution.concentration,
            dosage_per_area: solution.dosage_per_area,
        }
    }
}

/// Image bytes of a captured signature (PNG or JPEG).
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    #[cfg(test)]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Signature(bytes)
    }

    /// Accepts a `data:image/png;base64,...` URL or bare base64.
    pub fn from_data_url(input: &str) -> Result<Self, AppError> {
        let encoded = match input.split_once(',') {
            Some((header, data)) if header.starts_with("data:") => data,
            _ => input,
        };

        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::InvalidDraft(format!("signature is not valid base64: {}", e)))?;

        if bytes.is_empty() {
            return Err(AppError::InvalidDraft("signature is empty".to_string()));
        }

        match image::guess_format(&bytes) {
            Ok(ImageFormat::Png | ImageFormat::Jpeg) => {}
            _ => {
                return Err(AppError::InvalidDraft(
                    "signature is not a PNG or JPEG image".to_string(),
                ));
            }
        }
        image::load_from_memory(&bytes)
            .map_err(|e| AppError::InvalidDraft(format!("signature image cannot be decoded: {}", e)))?;

        Ok(Signature(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({} bytes)", self.0.len())
    }
}

/// Data accumulated by the steps. Nothing here is persisted before finish.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub employee: Option<EmployeeRef>,
    pub customer: Option<Customer>,
    /// Selection order; it decides the procedure slot order of the record.
    pub operations: Vec<OperationKind>,
    pub solutions: BTreeMap<OperationKind, Vec<SelectedSolution>>,
    pub quantities: BTreeMap<OperationKind, Decimal>,
    pub representative_name: Option<String>,
    pub client_signature: Option<Signature>,
    pub employee_signature: Option<Signature>,
}

impl Draft {
    pub fn surface_for(&self, op: OperationKind) -> Option<Decimal> {
        self.customer.as_ref().and_then(|c| c.surface_for(op))
    }

    pub fn quantity_for(&self, op: OperationKind) -> Decimal {
        self.quantities.get(&op).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn solutions_for(&self, op: OperationKind) -> &[SelectedSolution] {
        self.solutions.get(&op).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Merge-patch for a draft: `None` leaves the field as it is.
/// Signatures use `Some(None)` to clear a captured image.
#[derive(Debug, Default)]
pub struct DraftPatch {
    pub employee: Option<EmployeeRef>,
    pub customer: Option<Customer>,
    pub operations: Option<Vec<OperationKind>>,
    /// Replaces the list of each operation present; other operations keep theirs.
    pub solutions: BTreeMap<OperationKind, Vec<SelectedSolution>>,
    pub representative_name: Option<String>,
    pub client_signature: Option<Option<Signature>>,
    pub employee_signature: Option<Option<Signature>>,
}

/// `surface × Σ dosage_per_area`, zero when the surface is unset or nothing is selected.
pub fn required_quantity(surface: Option<Decimal>, solutions: &[SelectedSolution]) -> Decimal {
    match surface {
        Some(surface) if !surface.is_zero() => {
            let dosage: Decimal = solutions.iter().map(|s| s.dosage_per_area).sum();
            surface * dosage
        }
        _ => Decimal::ZERO,
    }
}

/// Quantity of a single solution used on `surface`.
pub fn solution_usage(surface: Option<Decimal>, solution: &SelectedSolution) -> Decimal {
    required_quantity(surface, std::slice::from_ref(solution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::document_service::tests::png_signature;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    fn solution(dosage: &str) -> SelectedSolution {
        SelectedSolution {
            id: Uuid::new_v4(),
            name: "Produs".to_string(),
            lot: None,
            concentration: None,
            dosage_per_area: dec(dosage),
        }
    }

    #[test]
    fn quantity_is_surface_times_summed_dosage() {
        let picked = vec![solution("0.5"), solution("0.25")];
        assert_eq!(required_quantity(Some(dec("100")), &picked), dec("75"));
    }

    #[test]
    fn quantity_is_zero_without_surface_or_solutions() {
        assert_eq!(required_quantity(None, &[solution("0.5")]), Decimal::ZERO);
        assert_eq!(required_quantity(Some(Decimal::ZERO), &[solution("0.5")]), Decimal::ZERO);
        assert_eq!(required_quantity(Some(dec("100")), &[]), Decimal::ZERO);
    }

    #[test]
    fn signature_accepts_data_urls() {
        let png = png_signature();
        let url = format!("data:image/png;base64,{}", STANDARD.encode(&png));

        let sig = Signature::from_data_url(&url).unwrap();
        assert_eq!(sig.as_bytes(), png.as_slice());
        assert!(Signature::from_data_url(&STANDARD.encode(&png)).is_ok());
        assert!(Signature::from_data_url("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn signature_must_be_a_decodable_image() {
        // Valid base64, but not an image.
        assert!(matches!(
            Signature::from_data_url("AAAA"),
            Err(AppError::InvalidDraft(_))
        ));

        // PNG magic without a body.
        assert!(matches!(
            Signature::from_data_url("data:image/png;base64,iVBORw0KGgo="),
            Err(AppError::InvalidDraft(_))
        ));

        let gif = STANDARD.encode(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;");
        assert!(matches!(
            Signature::from_data_url(&gif),
            Err(AppError::InvalidDraft(_))
        ));
    }
}
