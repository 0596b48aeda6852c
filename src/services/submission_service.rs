// src/services/submission_service.rs

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::{AppError, SubmissionStage},
    models::{
        service_record::{displayed_order_number, NewServiceRecord, ProcedureSlot, PROCEDURE_SLOTS},
        workflow::{solution_usage, Draft},
    },
    services::{
        document_service::{CertificateData, DocumentService},
        mail_service::{MailAttachment, MailService, PDF_CONTENT_TYPE},
        workflow::{ReadyDraft, Workflow},
    },
};

/// Persistence needed by a submission. Each call is its own statement.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn current_order_number(&self) -> Result<i32, AppError>;

    /// Atomically bumps the counter and returns the new value.
    async fn increment_order_number(&self) -> Result<i32, AppError>;

    async fn units_of_measure(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Option<String>>, AppError>;

    async fn remaining_stock(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Decimal>, AppError>;

    async fn insert_record(&self, record: &NewServiceRecord) -> Result<Uuid, AppError>;

    /// Returns the remaining quantity after the deduction.
    async fn deduct_stock(&self, solution_id: Uuid, quantity: Decimal) -> Result<Decimal, AppError>;
}

/// What happens when a submission uses more than what is in stock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StockPolicy {
    /// Deduct anyway and log it; stock may go negative.
    #[default]
    Warn,
    /// Refuse the submission before anything is sent or written.
    Block,
}

impl FromStr for StockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warn" => Ok(StockPolicy::Warn),
            "block" => Ok(StockPolicy::Block),
            other => Err(format!("unknown stock policy '{}'", other)),
        }
    }
}

/// Quantity of one solution used by the whole submission.
#[derive(Debug, Clone, PartialEq)]
pub struct StockUsage {
    pub solution_id: Uuid,
    pub name: String,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub record_id: Uuid,
    /// Number printed on the certificate.
    pub display_number: i32,
    pub message_id: String,
}

#[derive(Clone)]
pub struct SubmissionService {
    store: Arc<dyn SubmissionStore>,
    documents: DocumentService,
    mail: MailService,
    stock_policy: StockPolicy,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        documents: DocumentService,
        mail: MailService,
        stock_policy: StockPolicy,
    ) -> Self {
        Self {
            store,
            documents,
            mail,
            stock_policy,
        }
    }

    /// Finishes the workflow: render, email, count, persist, deduct.
    /// Nothing already done is undone when a later stage fails.
    pub async fn submit(&self, workflow: &mut Workflow) -> Result<SubmissionReceipt, AppError> {
        let ready = workflow.ready_for_submission()?;
        let usage = solution_totals(ready.draft);

        if self.stock_policy == StockPolicy::Block {
            self.check_stock(&usage).await?;
        }

        let order_number = self
            .store
            .current_order_number()
            .await
            .map_err(|e| AppError::failed_at(SubmissionStage::ReadCounter, e))?;

        tracing::info!(workflow = %workflow.id, order_number, "Submitting service record");

        let pdf = self
            .render(&ready, order_number)
            .await
            .map_err(|e| AppError::failed_at(SubmissionStage::Render, e))?;

        let message_id = self
            .mail
            .send(
                ready.customer.email.as_deref(),
                format!("Proces verbal nr. {}", order_number),
                format!(
                    "Buna ziua,\n\nVa transmitem atasat procesul verbal nr. {} pentru lucrarea efectuata la {}.\n",
                    order_number, ready.customer.name
                ),
                vec![MailAttachment {
                    filename: format!("proces-verbal-{}.pdf", order_number),
                    content_type: PDF_CONTENT_TYPE,
                    content: pdf,
                }],
            )
            .await
            .map_err(|e| AppError::failed_at(SubmissionStage::SendEmail, e))?;

        let stored_number = self
            .store
            .increment_order_number()
            .await
            .map_err(|e| AppError::failed_at(SubmissionStage::IncrementCounter, e))?;

        let record = build_record(&ready, stored_number);
        let record_id = self
            .store
            .insert_record(&record)
            .await
            .map_err(|e| AppError::failed_at(SubmissionStage::PersistRecord, e))?;

        for item in &usage {
            let remaining = self
                .store
                .deduct_stock(item.solution_id, item.quantity)
                .await
                .map_err(|e| AppError::failed_at(SubmissionStage::DeductStock, e))?;

            if remaining < Decimal::ZERO {
                tracing::warn!(
                    solution = %item.solution_id,
                    name = %item.name,
                    remaining = %remaining,
                    "Solution stock is negative"
                );
            }
        }

        workflow.mark_submitted();

        tracing::info!(
            record = %record_id,
            display_number = displayed_order_number(stored_number),
            "Service record submitted"
        );

        Ok(SubmissionReceipt {
            record_id,
            display_number: displayed_order_number(stored_number),
            message_id,
        })
    }

    async fn check_stock(&self, usage: &[StockUsage]) -> Result<(), AppError> {
        let ids: Vec<Uuid> = usage.iter().map(|u| u.solution_id).collect();
        let remaining = self.store.remaining_stock(&ids).await?;

        for item in usage {
            let available = remaining
                .get(&item.solution_id)
                .copied()
                .ok_or(AppError::SolutionNotFound)?;

            if available < item.quantity {
                return Err(AppError::InsufficientStock {
                    solution: item.name.clone(),
                });
            }
        }
        Ok(())
    }

    async fn render(&self, ready: &ReadyDraft<'_>, order_number: i32) -> Result<Vec<u8>, AppError> {
        let ids: Vec<Uuid> = ready
            .draft
            .solutions
            .values()
            .flatten()
            .map(|s| s.id)
            .collect();

        // A failed lookup only costs the unit next to the quantity.
        let units = match self.store.units_of_measure(&ids).await {
            Ok(units) => units,
            Err(e) => {
                tracing::warn!("Unit of measure lookup failed: {}", e);
                HashMap::new()
            }
        };

        let data = CertificateData::from_draft(
            ready,
            order_number,
            chrono::Local::now().naive_local(),
            &units,
        );

        self.documents.generate_certificate(&data).await
    }
}

/// Per-solution usage over all operations, in first-use order.
pub fn solution_totals(draft: &Draft) -> Vec<StockUsage> {
    let mut totals: Vec<StockUsage> = Vec::new();

    for op in &draft.operations {
        let surface = draft.surface_for(*op);
        for solution in draft.solutions_for(*op) {
            let quantity = solution_usage(surface, solution);
            match totals.iter_mut().find(|u| u.solution_id == solution.id) {
                Some(existing) => existing.quantity += quantity,
                None => totals.push(StockUsage {
                    solution_id: solution.id,
                    name: solution.name.clone(),
                    quantity,
                }),
            }
        }
    }

    totals.retain(|u| !u.quantity.is_zero());
    totals
}

fn join_present(values: impl Iterator<Item = Option<String>>) -> Option<String> {
    let parts: Vec<String> = values
        .flatten()
        .filter(|v| !v.trim().is_empty())
        .collect();

    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Lays the operations into the four procedure slots, in selection order.
pub fn build_record(ready: &ReadyDraft<'_>, order_number: i32) -> NewServiceRecord {
    let draft = ready.draft;
    let mut slots: [Option<ProcedureSlot>; PROCEDURE_SLOTS] = Default::default();

    for (slot, op) in slots.iter_mut().zip(&draft.operations) {
        let picked = draft.solutions_for(*op);

        *slot = Some(ProcedureSlot {
            procedure: op.label().to_string(),
            product_name: join_present(picked.iter().map(|s| Some(s.name.clone()))),
            product_lot: join_present(picked.iter().map(|s| s.lot.clone())),
            product_quantity: (!picked.is_empty()).then(|| draft.quantity_for(*op)),
            concentration: join_present(
                picked
                    .iter()
                    .map(|s| s.concentration.map(|c| c.normalize().to_string())),
            ),
        });
    }

    NewServiceRecord {
        order_number,
        customer_id: ready.customer.id,
        employee_id: ready.employee.id,
        slots,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        models::{operation::OperationKind, workflow::{DraftPatch, Step}},
        services::{
            document_service::tests::blank_template,
            mail_service::{tests::RecordingTransport, RecipientSource},
            template_source::TemplateSource,
            workflow::tests::{dec, sample_solution, signature, workflow_at_review},
        },
    };
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct StoreState {
        pub(crate) counter: i32,
        pub(crate) records: Vec<NewServiceRecord>,
        pub(crate) deductions: Vec<(Uuid, Decimal)>,
        pub(crate) stock: HashMap<Uuid, Decimal>,
        pub(crate) fail_insert: bool,
    }

    pub(crate) struct FakeStore(pub(crate) Mutex<StoreState>);

    impl FakeStore {
        pub(crate) fn new() -> Self {
            FakeStore(Mutex::new(StoreState {
                counter: 1,
                ..Default::default()
            }))
        }
    }

    #[async_trait]
    impl SubmissionStore for FakeStore {
        async fn current_order_number(&self) -> Result<i32, AppError> {
            Ok(self.0.lock().unwrap().counter)
        }

        async fn increment_order_number(&self) -> Result<i32, AppError> {
            let mut state = self.0.lock().unwrap();
            state.counter += 1;
            Ok(state.counter)
        }

        async fn units_of_measure(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Option<String>>, AppError> {
            Ok(ids.iter().map(|id| (*id, Some("kg".to_string()))).collect())
        }

        async fn remaining_stock(&self, _ids: &[Uuid]) -> Result<HashMap<Uuid, Decimal>, AppError> {
            Ok(self.0.lock().unwrap().stock.clone())
        }

        async fn insert_record(&self, record: &NewServiceRecord) -> Result<Uuid, AppError> {
            let mut state = self.0.lock().unwrap();
            if state.fail_insert {
                return Err(AppError::InternalServerError(anyhow::anyhow!("insert failed")));
            }
            state.records.push(record.clone());
            Ok(Uuid::new_v4())
        }

        async fn deduct_stock(&self, solution_id: Uuid, quantity: Decimal) -> Result<Decimal, AppError> {
            let mut state = self.0.lock().unwrap();
            state.deductions.push((solution_id, quantity));
            let remaining = state.stock.entry(solution_id).or_insert(Decimal::ZERO);
            *remaining -= quantity;
            Ok(*remaining)
        }
    }

    pub(crate) struct BlankTemplate;

    #[async_trait]
    impl TemplateSource for BlankTemplate {
        async fn fetch(&self) -> Result<Vec<u8>, AppError> {
            Ok(blank_template())
        }
    }

    pub(crate) fn service(store: Arc<FakeStore>, transport: Arc<RecordingTransport>, policy: StockPolicy) -> SubmissionService {
        SubmissionService::new(
            store,
            DocumentService::new(Arc::new(BlankTemplate)),
            MailService::new(transport, RecipientSource::FromRecord),
            policy,
        )
    }

    pub(crate) fn signed(mut wf: Workflow) -> Workflow {
        wf.update(DraftPatch {
            employee_signature: Some(Some(signature())),
            ..Default::default()
        })
        .unwrap();
        wf
    }

    #[tokio::test]
    async fn missing_employee_signature_has_no_side_effects() {
        let store = Arc::new(FakeStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let service = service(store.clone(), transport.clone(), StockPolicy::Warn);

        let mut wf = workflow_at_review(vec![OperationKind::Deratizare], vec![sample_solution("0.5")]);
        let err = service.submit(&mut wf).await.unwrap_err();

        assert!(matches!(err, AppError::StepIncomplete { field: "employee_signature", .. }));
        assert!(transport.sent().is_empty());
        let state = store.0.lock().unwrap();
        assert_eq!(state.counter, 1);
        assert!(state.records.is_empty());
        assert!(state.deductions.is_empty());
        assert_eq!(wf.step(), Step::ReviewAndSign);
    }

    #[tokio::test]
    async fn finish_sends_counts_persists_and_deducts_once() {
        let store = Arc::new(FakeStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let service = service(store.clone(), transport.clone(), StockPolicy::Warn);

        let picked = sample_solution("0.5");
        let solution_id = picked.id;
        let mut wf = signed(workflow_at_review(vec![OperationKind::Deratizare], vec![picked]));

        let receipt = service.submit(&mut wf).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "client@depozit.ro");
        assert!(sent[0].attachments[0].content.starts_with(b"%PDF"));

        let state = store.0.lock().unwrap();
        assert_eq!(state.counter, 2);
        assert_eq!(state.records.len(), 1);

        let record = &state.records[0];
        let first = record.slots[0].as_ref().unwrap();
        assert_eq!(first.procedure, "Deratizare");
        assert_eq!(first.product_name.as_deref(), Some("Raticid"));
        assert_eq!(first.product_quantity, Some(dec("50")));
        assert!(record.slots[1..].iter().all(Option::is_none));

        // Certificate, listing and receipt agree on the number.
        assert_eq!(receipt.display_number, 1);
        assert_eq!(displayed_order_number(record.order_number), receipt.display_number);
        assert!(sent[0].subject.ends_with(" 1"));

        assert_eq!(state.deductions, vec![(solution_id, dec("50"))]);
        assert_eq!(wf.step(), Step::Submitted);
    }

    #[tokio::test]
    async fn slots_follow_selection_order() {
        let store = Arc::new(FakeStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let service = service(store.clone(), transport, StockPolicy::Warn);

        let mut wf = signed(workflow_at_review(
            vec![OperationKind::Dezinfectie, OperationKind::Deratizare],
            vec![sample_solution("0.1")],
        ));
        service.submit(&mut wf).await.unwrap();

        let state = store.0.lock().unwrap();
        let slots = &state.records[0].slots;
        assert_eq!(slots[0].as_ref().unwrap().procedure, "Dezinfectie");
        let second = slots[1].as_ref().unwrap();
        assert_eq!(second.procedure, "Deratizare");
        assert_eq!(second.product_name, None);
        assert_eq!(second.product_quantity, None);
        assert!(slots[2].is_none() && slots[3].is_none());
    }

    #[tokio::test]
    async fn failure_after_email_leaves_no_record_and_no_deduction() {
        let store = Arc::new(FakeStore::new());
        store.0.lock().unwrap().fail_insert = true;
        let transport = Arc::new(RecordingTransport::default());
        let service = service(store.clone(), transport.clone(), StockPolicy::Warn);

        let mut wf = signed(workflow_at_review(vec![OperationKind::Deratizare], vec![sample_solution("0.5")]));
        let err = service.submit(&mut wf).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::SubmissionFailed { stage: SubmissionStage::PersistRecord, .. }
        ));
        assert_eq!(transport.sent().len(), 1);
        let state = store.0.lock().unwrap();
        assert_eq!(state.counter, 2);
        assert!(state.records.is_empty());
        assert!(state.deductions.is_empty());
        assert_eq!(wf.step(), Step::ReviewAndSign);
    }

    #[tokio::test]
    async fn mail_failure_keeps_the_counter() {
        let store = Arc::new(FakeStore::new());
        let transport = Arc::new(RecordingTransport::failing());
        let service = service(store.clone(), transport, StockPolicy::Warn);

        let mut wf = signed(workflow_at_review(vec![OperationKind::Deratizare], vec![sample_solution("0.5")]));
        let err = service.submit(&mut wf).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::SubmissionFailed { stage: SubmissionStage::SendEmail, .. }
        ));
        assert_eq!(store.0.lock().unwrap().counter, 1);
    }

    #[tokio::test]
    async fn block_policy_refuses_before_any_side_effect() {
        let store = Arc::new(FakeStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let service = service(store.clone(), transport.clone(), StockPolicy::Block);

        let picked = sample_solution("0.5");
        store.0.lock().unwrap().stock.insert(picked.id, dec("10"));
        let mut wf = signed(workflow_at_review(vec![OperationKind::Deratizare], vec![picked]));

        let err = service.submit(&mut wf).await.unwrap_err();

        assert!(matches!(err, AppError::InsufficientStock { .. }));
        assert!(transport.sent().is_empty());
        assert_eq!(store.0.lock().unwrap().counter, 1);
    }

    #[tokio::test]
    async fn warn_policy_lets_stock_go_negative() {
        let store = Arc::new(FakeStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let service = service(store.clone(), transport, StockPolicy::Warn);

        let picked = sample_solution("0.5");
        let id = picked.id;
        store.0.lock().unwrap().stock.insert(id, dec("10"));
        let mut wf = signed(workflow_at_review(vec![OperationKind::Deratizare], vec![picked]));

        service.submit(&mut wf).await.unwrap();
        assert_eq!(store.0.lock().unwrap().stock[&id], dec("-40"));
    }

    #[test]
    fn usage_is_summed_across_operations() {
        let shared = sample_solution("0.5");
        let mut wf = Workflow::new(Uuid::new_v4());
        wf.update(DraftPatch {
            customer: Some(crate::services::workflow::tests::sample_customer(Some(dec("100")))),
            operations: Some(vec![OperationKind::Dezinsectie, OperationKind::Dezinsectie2]),
            solutions: std::collections::BTreeMap::from([
                (OperationKind::Dezinsectie, vec![shared.clone()]),
                (OperationKind::Dezinsectie2, vec![shared.clone()]),
            ]),
            ..Default::default()
        })
        .unwrap();

        let totals = solution_totals(wf.draft());
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].quantity, dec("100"));
    }

    #[test]
    fn stock_policy_parses() {
        assert_eq!("Block".parse::<StockPolicy>(), Ok(StockPolicy::Block));
        assert!("maybe".parse::<StockPolicy>().is_err());
    }
}
