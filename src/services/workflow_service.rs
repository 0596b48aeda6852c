// src/services/workflow_service.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::{Mutex, RwLock};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CustomerRepository, EmployeeRepository, SolutionRepository},
    models::{
        auth::SessionContext,
        customer::Customer,
        operation::OperationKind,
        workflow::{DraftPatch, EmployeeRef, SelectedSolution, Signature, Step},
    },
    services::{
        submission_service::{SubmissionReceipt, SubmissionService},
        workflow::Workflow,
    },
};

/// Abandoned workflows are dropped after this long.
const WORKFLOW_TTL_HOURS: i64 = 24;

// =============================================================================
//  PAYLOADS
// =============================================================================

// Distinguishes an absent field (None) from an explicit null (Some(None)).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update of a workflow draft; absent fields are left as they are.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPatchPayload {
    pub employee_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub operations: Option<Vec<OperationKind>>,
    /// Solution ids per operation; replaces the list of each operation given.
    #[serde(default)]
    #[schema(value_type = Object, example = json!({"deratizare": ["550e8400-e29b-41d4-a716-446655440000"]}))]
    pub solutions: BTreeMap<OperationKind, Vec<Uuid>>,
    pub representative_name: Option<String>,
    /// Data URL or base64 image; null clears it.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub client_signature: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub employee_signature: Option<Option<String>>,
}

// =============================================================================
//  VIEWS
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftView {
    pub employee: Option<EmployeeRef>,
    pub customer: Option<Customer>,
    pub operations: Vec<OperationKind>,
    #[schema(value_type = Object)]
    pub solutions: BTreeMap<OperationKind, Vec<SelectedSolution>>,
    #[schema(value_type = Object)]
    pub quantities: BTreeMap<OperationKind, Decimal>,
    pub representative_name: Option<String>,
    pub has_client_signature: bool,
    pub has_employee_signature: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowView {
    pub id: Uuid,
    pub step: Step,
    pub can_advance: bool,
    /// First thing the current step still needs.
    #[schema(value_type = Option<String>)]
    pub missing_field: Option<&'static str>,
    pub draft: DraftView,
}

impl From<&Workflow> for WorkflowView {
    fn from(workflow: &Workflow) -> Self {
        let draft = workflow.draft();
        Self {
            id: workflow.id,
            step: workflow.step(),
            can_advance: workflow.can_advance(),
            missing_field: workflow.missing_field(),
            draft: DraftView {
                employee: draft.employee.clone(),
                customer: draft.customer.clone(),
                operations: draft.operations.clone(),
                solutions: draft.solutions.clone(),
                quantities: draft.quantities.clone(),
                representative_name: draft.representative_name.clone(),
                has_client_signature: draft.client_signature.is_some(),
                has_employee_signature: draft.employee_signature.is_some(),
            },
        }
    }
}

// =============================================================================
//  SERVICE
// =============================================================================

type Registry = Arc<RwLock<HashMap<Uuid, Arc<Mutex<Workflow>>>>>;

/// In-memory workflows, one per field session, keyed by id.
#[derive(Clone)]
pub struct WorkflowService {
    registry: Registry,
    customers: CustomerRepository,
    employees: EmployeeRepository,
    solutions: SolutionRepository,
    submissions: SubmissionService,
}

impl WorkflowService {
    pub fn new(
        customers: CustomerRepository,
        employees: EmployeeRepository,
        solutions: SolutionRepository,
        submissions: SubmissionService,
    ) -> Self {
        Self {
            registry: Arc::new(RwLock::new(HashMap::new())),
            customers,
            employees,
            solutions,
            submissions,
        }
    }

    pub async fn start(&self, session: &SessionContext) -> WorkflowView {
        let workflow = Workflow::new(session.user_id);
        let view = WorkflowView::from(&workflow);

        let mut registry = self.registry.write().await;
        let cutoff = Utc::now() - Duration::hours(WORKFLOW_TTL_HOURS);
        registry.retain(|_, wf| match wf.try_lock() {
            Ok(wf) => wf.created_at > cutoff,
            // In use right now.
            Err(_) => true,
        });
        registry.insert(workflow.id, Arc::new(Mutex::new(workflow)));

        tracing::debug!(workflow = %view.id, user = %session.user_id, "Workflow started");
        view
    }

    /// The workflow, if it exists and belongs to the session user.
    async fn find(&self, session: &SessionContext, id: Uuid) -> Result<Arc<Mutex<Workflow>>, AppError> {
        let entry = self
            .registry
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppError::WorkflowNotFound)?;

        if entry.lock().await.owner != session.user_id {
            // Other users' workflows are reported as missing.
            return Err(AppError::WorkflowNotFound);
        }
        Ok(entry)
    }

    pub async fn get(&self, session: &SessionContext, id: Uuid) -> Result<WorkflowView, AppError> {
        let entry = self.find(session, id).await?;
        let workflow = entry.lock().await;
        Ok(WorkflowView::from(&*workflow))
    }

    pub async fn update(
        &self,
        session: &SessionContext,
        id: Uuid,
        payload: WorkflowPatchPayload,
    ) -> Result<WorkflowView, AppError> {
        let entry = self.find(session, id).await?;
        let patch = self.resolve(payload).await?;

        let mut workflow = entry.lock().await;
        workflow.update(patch)?;
        Ok(WorkflowView::from(&*workflow))
    }

    pub async fn next(&self, session: &SessionContext, id: Uuid) -> Result<WorkflowView, AppError> {
        let entry = self.find(session, id).await?;
        let mut workflow = entry.lock().await;
        workflow.next()?;
        Ok(WorkflowView::from(&*workflow))
    }

    pub async fn back(&self, session: &SessionContext, id: Uuid) -> Result<WorkflowView, AppError> {
        let entry = self.find(session, id).await?;
        let mut workflow = entry.lock().await;
        workflow.back()?;
        Ok(WorkflowView::from(&*workflow))
    }

    /// Runs the submission while holding the workflow lock, so a second
    /// finish waits and then finds it submitted.
    pub async fn finish(&self, session: &SessionContext, id: Uuid) -> Result<SubmissionReceipt, AppError> {
        let entry = self.find(session, id).await?;
        let mut workflow = entry.lock().await;
        self.submissions.submit(&mut workflow).await
    }

    pub async fn discard(&self, session: &SessionContext, id: Uuid) -> Result<(), AppError> {
        self.find(session, id).await?;
        self.registry.write().await.remove(&id);
        tracing::debug!(workflow = %id, "Workflow discarded");
        Ok(())
    }

    #[cfg(test)]
    async fn insert(&self, workflow: Workflow) -> Uuid {
        let id = workflow.id;
        self.registry.write().await.insert(id, Arc::new(Mutex::new(workflow)));
        id
    }

    /// Loads the referenced employee, customer and solutions.
    async fn resolve(&self, payload: WorkflowPatchPayload) -> Result<DraftPatch, AppError> {
        let employee = match payload.employee_id {
            Some(id) => Some(
                self.employees
                    .find_by_id(self.employees.pool(), id)
                    .await?
                    .map(|e| EmployeeRef::from(&e))
                    .ok_or(AppError::EmployeeNotFound)?,
            ),
            None => None,
        };

        let customer = match payload.customer_id {
            Some(id) => Some(
                self.customers
                    .find_by_id(self.customers.pool(), id)
                    .await?
                    .ok_or(AppError::CustomerNotFound)?,
            ),
            None => None,
        };

        let mut solutions = BTreeMap::new();
        if !payload.solutions.is_empty() {
            let ids: Vec<Uuid> = payload.solutions.values().flatten().copied().collect();
            let found: HashMap<Uuid, SelectedSolution> = self
                .solutions
                .find_many(self.solutions.pool(), &ids)
                .await?
                .iter()
                .map(|s| (s.id, SelectedSolution::from(s)))
                .collect();

            for (op, ids) in payload.solutions {
                let mut picked: Vec<SelectedSolution> = Vec::with_capacity(ids.len());
                for id in ids {
                    if picked.iter().any(|s| s.id == id) {
                        continue;
                    }
                    picked.push(found.get(&id).cloned().ok_or(AppError::SolutionNotFound)?);
                }
                solutions.insert(op, picked);
            }
        }

        let signature = |value: Option<Option<String>>| -> Result<Option<Option<Signature>>, AppError> {
            value
                .map(|inner| inner.as_deref().map(Signature::from_data_url).transpose())
                .transpose()
        };

        Ok(DraftPatch {
            employee,
            customer,
            operations: payload.operations,
            solutions,
            representative_name: payload.representative_name,
            client_signature: signature(payload.client_signature)?,
            employee_signature: signature(payload.employee_signature)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        mail_service::tests::RecordingTransport,
        submission_service::{
            tests::{service as submission_service, signed, FakeStore},
            StockPolicy,
        },
        workflow::tests::{sample_solution, workflow_at_review},
    };
    use sqlx::postgres::PgPoolOptions;

    // Nothing below reaches the database; the pool never connects.
    fn workflow_service(store: Arc<FakeStore>, transport: Arc<RecordingTransport>) -> WorkflowService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/pestcontrol")
            .unwrap();
        WorkflowService::new(
            CustomerRepository::new(pool.clone()),
            EmployeeRepository::new(pool.clone()),
            SolutionRepository::new(pool),
            submission_service(store, transport, StockPolicy::Warn),
        )
    }

    fn session() -> SessionContext {
        SessionContext {
            user_id: Uuid::new_v4(),
            email: "teren@firma.ro".to_string(),
            is_admin: false,
        }
    }

    /// Signed workflow on ReviewAndSign, owned by `owner`.
    fn ready_workflow(owner: &SessionContext) -> Workflow {
        let mut wf = signed(workflow_at_review(
            vec![OperationKind::Deratizare],
            vec![sample_solution("0.5")],
        ));
        wf.owner = owner.user_id;
        wf
    }

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let cleared: WorkflowPatchPayload =
            serde_json::from_str(r#"{"clientSignature": null}"#).unwrap();
        assert_eq!(cleared.client_signature, Some(None));
        assert_eq!(cleared.employee_signature, None);

        let untouched: WorkflowPatchPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(untouched.client_signature, None);
    }

    #[test]
    fn patch_reads_solutions_per_operation() {
        let id = Uuid::new_v4();
        let payload: WorkflowPatchPayload = serde_json::from_value(serde_json::json!({
            "operations": ["deratizare", "dezinsectie2"],
            "solutions": { "deratizare": [id] }
        }))
        .unwrap();

        assert_eq!(
            payload.operations,
            Some(vec![OperationKind::Deratizare, OperationKind::Dezinsectie2])
        );
        assert_eq!(payload.solutions[&OperationKind::Deratizare], vec![id]);
    }

    #[test]
    fn view_reports_what_the_step_still_needs() {
        let workflow = Workflow::new(Uuid::new_v4());
        let view = WorkflowView::from(&workflow);

        assert_eq!(view.step, Step::SelectEmployee);
        assert!(!view.can_advance);
        assert_eq!(view.missing_field, Some("employee"));
        assert!(!view.draft.has_client_signature);
    }

    #[tokio::test]
    async fn other_users_cannot_see_or_touch_a_workflow() {
        let service = workflow_service(Arc::new(FakeStore::new()), Arc::new(RecordingTransport::default()));
        let owner = session();
        let stranger = session();
        let id = service.start(&owner).await.id;

        assert!(matches!(service.get(&stranger, id).await, Err(AppError::WorkflowNotFound)));
        assert!(matches!(
            service.update(&stranger, id, WorkflowPatchPayload::default()).await,
            Err(AppError::WorkflowNotFound)
        ));
        assert!(matches!(service.next(&stranger, id).await, Err(AppError::WorkflowNotFound)));
        assert!(matches!(service.back(&stranger, id).await, Err(AppError::WorkflowNotFound)));
        assert!(matches!(service.finish(&stranger, id).await, Err(AppError::WorkflowNotFound)));
        assert!(matches!(service.discard(&stranger, id).await, Err(AppError::WorkflowNotFound)));

        // Still there for its owner.
        assert_eq!(service.get(&owner, id).await.unwrap().step, Step::SelectEmployee);
    }

    #[tokio::test]
    async fn concurrent_finish_submits_once() {
        let store = Arc::new(FakeStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let service = workflow_service(store.clone(), transport.clone());
        let owner = session();
        let id = service.insert(ready_workflow(&owner)).await;

        let (first, second) = tokio::join!(service.finish(&owner, id), service.finish(&owner, id));

        let (ok, err) = match (first, second) {
            (Ok(receipt), Err(e)) | (Err(e), Ok(receipt)) => (receipt, e),
            other => panic!("expected one success and one failure, got {:?}", other),
        };
        assert_eq!(ok.display_number, 1);
        assert!(matches!(err, AppError::InvalidTransition(Step::Submitted)));

        assert_eq!(transport.sent().len(), 1);
        {
            let state = store.0.lock().unwrap();
            assert_eq!(state.counter, 2);
            assert_eq!(state.records.len(), 1);
        }
        assert_eq!(service.get(&owner, id).await.unwrap().step, Step::Submitted);
    }

    #[tokio::test]
    async fn starting_a_workflow_drops_abandoned_ones() {
        let service = workflow_service(Arc::new(FakeStore::new()), Arc::new(RecordingTransport::default()));
        let owner = session();

        let mut abandoned = Workflow::new(owner.user_id);
        abandoned.created_at = Utc::now() - Duration::hours(WORKFLOW_TTL_HOURS + 1);
        let abandoned_id = service.insert(abandoned).await;

        let mut recent = Workflow::new(owner.user_id);
        recent.created_at = Utc::now() - Duration::hours(WORKFLOW_TTL_HOURS - 1);
        let recent_id = service.insert(recent).await;

        let started = service.start(&owner).await.id;

        assert!(matches!(service.get(&owner, abandoned_id).await, Err(AppError::WorkflowNotFound)));
        assert!(service.get(&owner, recent_id).await.is_ok());
        assert!(service.get(&owner, started).await.is_ok());
    }

    #[tokio::test]
    async fn non_image_signature_is_rejected_at_patch_time() {
        let service = workflow_service(Arc::new(FakeStore::new()), Arc::new(RecordingTransport::default()));
        let owner = session();
        let id = service.start(&owner).await.id;

        let payload: WorkflowPatchPayload = serde_json::from_value(serde_json::json!({
            "representativeName": "Maria Ionescu",
            "clientSignature": "AAAA"
        }))
        .unwrap();

        assert!(matches!(
            service.update(&owner, id, payload).await,
            Err(AppError::InvalidDraft(_))
        ));
        let view = service.get(&owner, id).await.unwrap();
        assert!(!view.draft.has_client_signature);
        assert_eq!(view.draft.representative_name, None);
    }
}
