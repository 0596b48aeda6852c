// src/services/workflow.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        customer::Customer,
        operation::OperationKind,
        workflow::{required_quantity, Draft, DraftPatch, EmployeeRef, Signature, Step},
    },
};

/// One run of the field form: the current step plus the draft it is building.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub id: Uuid,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    step: Step,
    draft: Draft,
}

/// A draft that passed every step check and can be submitted.
#[derive(Debug)]
pub struct ReadyDraft<'a> {
    pub employee: &'a EmployeeRef,
    pub customer: &'a Customer,
    pub representative_name: &'a str,
    pub client_signature: &'a Signature,
    pub employee_signature: &'a Signature,
    pub draft: &'a Draft,
}

impl Workflow {
    pub fn new(owner: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            created_at: Utc::now(),
            step: Step::SelectEmployee,
            draft: Draft::default(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Shallow-merges `patch` into the draft. The patch is checked as a whole
    /// before anything changes.
    pub fn update(&mut self, patch: DraftPatch) -> Result<(), AppError> {
        if self.step == Step::Submitted {
            return Err(AppError::InvalidTransition(self.step));
        }

        let operations = patch.operations.map(dedup_operations);

        {
            let effective = operations.as_deref().unwrap_or(&self.draft.operations);
            if let Some(op) = patch.solutions.keys().find(|op| !effective.contains(op)) {
                return Err(AppError::InvalidDraft(format!(
                    "solutions given for unselected operation '{}'",
                    op.as_str()
                )));
            }
        }

        if let Some(employee) = patch.employee {
            self.draft.employee = Some(employee);
        }

        if let Some(customer) = patch.customer {
            self.draft.customer = Some(customer);
        }

        if let Some(ops) = operations {
            // Deselected operations lose their solutions and quantity.
            self.draft.solutions.retain(|op, _| ops.contains(op));
            self.draft.quantities.retain(|op, _| ops.contains(op));
            self.draft.operations = ops;
        }

        for (op, picked) in patch.solutions {
            self.draft.solutions.insert(op, picked);
        }

        if let Some(name) = patch.representative_name {
            let name = name.trim();
            self.draft.representative_name = (!name.is_empty()).then(|| name.to_string());
        }

        if let Some(signature) = patch.client_signature {
            self.draft.client_signature = signature;
        }

        if let Some(signature) = patch.employee_signature {
            self.draft.employee_signature = signature;
        }

        self.recompute_quantities();
        Ok(())
    }

    fn recompute_quantities(&mut self) {
        let draft = &self.draft;
        let quantities: BTreeMap<_, _> = draft
            .solutions
            .iter()
            .map(|(op, picked)| (*op, required_quantity(draft.surface_for(*op), picked)))
            .collect();
        self.draft.quantities = quantities;
    }

    /// First field the current step still needs, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        requirement(self.step, &self.draft)
    }

    pub fn can_advance(&self) -> bool {
        self.step.next().is_some() && self.missing_field().is_none()
    }

    pub fn next(&mut self) -> Result<Step, AppError> {
        let next = self
            .step
            .next()
            .ok_or(AppError::InvalidTransition(self.step))?;

        if let Some(field) = self.missing_field() {
            return Err(AppError::StepIncomplete {
                step: self.step,
                field,
            });
        }

        self.step = next;
        Ok(next)
    }

    pub fn back(&mut self) -> Result<Step, AppError> {
        let previous = self
            .step
            .previous()
            .ok_or(AppError::InvalidTransition(self.step))?;

        self.step = previous;
        Ok(previous)
    }

    /// Checks every step (a later patch may have emptied an earlier one) and
    /// hands out the validated parts.
    pub fn ready_for_submission(&self) -> Result<ReadyDraft<'_>, AppError> {
        if self.step != Step::ReviewAndSign {
            return Err(AppError::InvalidTransition(self.step));
        }

        let mut step = Step::SelectEmployee;
        loop {
            if let Some(field) = requirement(step, &self.draft) {
                return Err(AppError::StepIncomplete { step, field });
            }
            match step.next() {
                Some(next) => step = next,
                None => break,
            }
        }

        let incomplete = |field| AppError::StepIncomplete {
            step: Step::ReviewAndSign,
            field,
        };

        Ok(ReadyDraft {
            employee: self.draft.employee.as_ref().ok_or_else(|| incomplete("employee"))?,
            customer: self.draft.customer.as_ref().ok_or_else(|| incomplete("customer"))?,
            representative_name: self
                .draft
                .representative_name
                .as_deref()
                .ok_or_else(|| incomplete("representative_name"))?,
            client_signature: self
                .draft
                .client_signature
                .as_ref()
                .ok_or_else(|| incomplete("client_signature"))?,
            employee_signature: self
                .draft
                .employee_signature
                .as_ref()
                .ok_or_else(|| incomplete("employee_signature"))?,
            draft: &self.draft,
        })
    }

    pub fn mark_submitted(&mut self) {
        self.step = Step::Submitted;
    }
}

fn requirement(step: Step, draft: &Draft) -> Option<&'static str> {
    match step {
        Step::SelectEmployee if draft.employee.is_none() => Some("employee"),
        Step::SelectCustomer if draft.customer.is_none() => Some("customer"),
        Step::SelectOperations if draft.operations.is_empty() => Some("operations"),
        Step::EnterClientRepresentative if draft.representative_name.is_none() => {
            Some("representative_name")
        }
        Step::EnterClientRepresentative if draft.client_signature.is_none() => {
            Some("client_signature")
        }
        Step::ReviewAndSign if draft.employee_signature.is_none() => Some("employee_signature"),
        _ => None,
    }
}

/// Keeps the first occurrence of each operation, so at most four remain.
fn dedup_operations(ops: Vec<OperationKind>) -> Vec<OperationKind> {
    let mut unique: Vec<OperationKind> = Vec::with_capacity(OperationKind::ALL.len());
    for op in ops {
        if !unique.contains(&op) {
            unique.push(op);
        }
    }
    unique
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{customer::Job, workflow::SelectedSolution};
    use rust_decimal::Decimal;

    pub(crate) fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    pub(crate) fn sample_customer(surface: Option<Decimal>) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            name: "SC Depozit SRL".to_string(),
            email: Some("client@depozit.ro".to_string()),
            phone: None,
            contract_number: Some("C-17".to_string()),
            location: Some("Cluj-Napoca".to_string()),
            total_surface: None,
            jobs: OperationKind::ALL
                .iter()
                .map(|op| Job {
                    label: op.label().to_string(),
                    value: *op,
                    active: true,
                    surface,
                })
                .collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn sample_employee() -> EmployeeRef {
        EmployeeRef {
            id: Uuid::new_v4(),
            full_name: "Popescu Ion".to_string(),
            id_document: Some("CJ 123456".to_string()),
        }
    }

    pub(crate) fn sample_solution(dosage: &str) -> SelectedSolution {
        SelectedSolution {
            id: Uuid::new_v4(),
            name: "Raticid".to_string(),
            lot: Some("L-1".to_string()),
            concentration: Some(dec("0.005")),
            dosage_per_area: dec(dosage),
        }
    }

    pub(crate) fn signature() -> Signature {
        Signature::from_bytes(crate::services::document_service::tests::png_signature())
    }

    fn solutions(op: OperationKind, picked: Vec<SelectedSolution>) -> BTreeMap<OperationKind, Vec<SelectedSolution>> {
        BTreeMap::from([(op, picked)])
    }

    /// Workflow sitting on ReviewAndSign with everything but the employee signature.
    pub(crate) fn workflow_at_review(ops: Vec<OperationKind>, picked: Vec<SelectedSolution>) -> Workflow {
        let mut wf = Workflow::new(Uuid::new_v4());
        let first = ops[0];
        wf.update(DraftPatch {
            employee: Some(sample_employee()),
            customer: Some(sample_customer(Some(dec("100")))),
            operations: Some(ops),
            solutions: solutions(first, picked),
            representative_name: Some("Maria Ionescu".to_string()),
            client_signature: Some(Some(signature())),
            ..Default::default()
        })
        .unwrap();
        for _ in 0..4 {
            wf.next().unwrap();
        }
        assert_eq!(wf.step(), Step::ReviewAndSign);
        wf
    }

    #[test]
    fn quantity_follows_surface_and_dosage() {
        let mut wf = Workflow::new(Uuid::new_v4());
        wf.update(DraftPatch {
            customer: Some(sample_customer(Some(dec("100")))),
            operations: Some(vec![OperationKind::Deratizare]),
            solutions: solutions(OperationKind::Deratizare, vec![sample_solution("0.5")]),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(wf.draft().quantity_for(OperationKind::Deratizare), dec("50"));
    }

    #[test]
    fn quantity_is_recomputed_when_the_customer_changes() {
        let mut wf = Workflow::new(Uuid::new_v4());
        wf.update(DraftPatch {
            customer: Some(sample_customer(Some(dec("100")))),
            operations: Some(vec![OperationKind::Dezinfectie]),
            solutions: solutions(OperationKind::Dezinfectie, vec![sample_solution("0.2")]),
            ..Default::default()
        })
        .unwrap();

        wf.update(DraftPatch {
            customer: Some(sample_customer(None)),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(wf.draft().quantity_for(OperationKind::Dezinfectie), Decimal::ZERO);
    }

    #[test]
    fn deselecting_an_operation_leaves_no_orphans() {
        let mut wf = Workflow::new(Uuid::new_v4());
        wf.update(DraftPatch {
            customer: Some(sample_customer(Some(dec("10")))),
            operations: Some(vec![OperationKind::Deratizare, OperationKind::Dezinsectie]),
            solutions: BTreeMap::from([
                (OperationKind::Deratizare, vec![sample_solution("1")]),
                (OperationKind::Dezinsectie, vec![sample_solution("2")]),
            ]),
            ..Default::default()
        })
        .unwrap();

        wf.update(DraftPatch {
            operations: Some(vec![OperationKind::Dezinsectie]),
            ..Default::default()
        })
        .unwrap();

        let draft = wf.draft();
        assert!(!draft.solutions.contains_key(&OperationKind::Deratizare));
        assert!(!draft.quantities.contains_key(&OperationKind::Deratizare));
        assert_eq!(draft.quantity_for(OperationKind::Dezinsectie), dec("20"));
    }

    #[test]
    fn solutions_for_unselected_operation_are_rejected() {
        let mut wf = Workflow::new(Uuid::new_v4());
        let err = wf
            .update(DraftPatch {
                operations: Some(vec![OperationKind::Deratizare]),
                solutions: solutions(OperationKind::Dezinfectie, vec![sample_solution("1")]),
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidDraft(_)));
        // Nothing from the rejected patch was applied.
        assert!(wf.draft().operations.is_empty());
    }

    #[test]
    fn patch_preserves_unspecified_fields() {
        let mut wf = Workflow::new(Uuid::new_v4());
        wf.update(DraftPatch {
            employee: Some(sample_employee()),
            ..Default::default()
        })
        .unwrap();
        wf.update(DraftPatch {
            representative_name: Some("  Ana  ".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert!(wf.draft().employee.is_some());
        assert_eq!(wf.draft().representative_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn next_is_blocked_until_the_step_is_complete() {
        let mut wf = Workflow::new(Uuid::new_v4());
        assert!(!wf.can_advance());
        assert!(matches!(
            wf.next(),
            Err(AppError::StepIncomplete { step: Step::SelectEmployee, field: "employee" })
        ));

        wf.update(DraftPatch {
            employee: Some(sample_employee()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(wf.next().unwrap(), Step::SelectCustomer);
        assert!(matches!(
            wf.next(),
            Err(AppError::StepIncomplete { field: "customer", .. })
        ));
    }

    #[test]
    fn representative_step_needs_name_and_signature() {
        let mut wf = Workflow::new(Uuid::new_v4());
        wf.update(DraftPatch {
            employee: Some(sample_employee()),
            customer: Some(sample_customer(None)),
            operations: Some(vec![OperationKind::Dezinsectie]),
            representative_name: Some("Maria".to_string()),
            ..Default::default()
        })
        .unwrap();
        for _ in 0..3 {
            wf.next().unwrap();
        }

        assert!(matches!(
            wf.next(),
            Err(AppError::StepIncomplete { field: "client_signature", .. })
        ));
    }

    #[test]
    fn back_moves_one_step_and_stops_at_the_start() {
        let mut wf = workflow_at_review(vec![OperationKind::Deratizare], vec![]);
        assert_eq!(wf.back().unwrap(), Step::EnterClientRepresentative);

        let mut fresh = Workflow::new(Uuid::new_v4());
        assert!(matches!(fresh.back(), Err(AppError::InvalidTransition(Step::SelectEmployee))));
    }

    #[test]
    fn review_step_cannot_be_left_forward_with_next() {
        let mut wf = workflow_at_review(vec![OperationKind::Deratizare], vec![]);
        wf.update(DraftPatch {
            employee_signature: Some(Some(signature())),
            ..Default::default()
        })
        .unwrap();

        assert!(matches!(wf.next(), Err(AppError::InvalidTransition(Step::ReviewAndSign))));
        assert!(!wf.can_advance());
    }

    #[test]
    fn submission_requires_the_employee_signature() {
        let wf = workflow_at_review(vec![OperationKind::Deratizare], vec![]);
        assert!(matches!(
            wf.ready_for_submission(),
            Err(AppError::StepIncomplete { step: Step::ReviewAndSign, field: "employee_signature" })
        ));
    }

    #[test]
    fn submitted_workflow_rejects_changes() {
        let mut wf = workflow_at_review(vec![OperationKind::Deratizare], vec![]);
        wf.mark_submitted();

        assert!(wf.update(DraftPatch::default()).is_err());
        assert!(wf.back().is_err());
    }
}
