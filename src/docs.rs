// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::create_user,

        // --- Customers ---
        handlers::customers::list_customers,
        handlers::customers::create_customer,
        handlers::customers::get_customer,
        handlers::customers::update_customer,
        handlers::customers::delete_customer,

        // --- Employees ---
        handlers::employees::list_employees,
        handlers::employees::create_employee,
        handlers::employees::get_employee,
        handlers::employees::update_employee,
        handlers::employees::delete_employee,

        // --- Solutions ---
        handlers::solutions::list_solutions,
        handlers::solutions::create_solution,
        handlers::solutions::get_solution,
        handlers::solutions::update_solution,
        handlers::solutions::delete_solution,

        // --- Records ---
        handlers::records::list_records,
        handlers::records::get_record,
        handlers::records::export_records,
        handlers::records::email_records,

        // --- Workflows ---
        handlers::workflows::start_workflow,
        handlers::workflows::get_workflow,
        handlers::workflows::update_workflow,
        handlers::workflows::discard_workflow,
        handlers::workflows::next_step,
        handlers::workflows::previous_step,
        handlers::workflows::finish_workflow,
        handlers::workflows::catalog_employees,
        handlers::workflows::catalog_customers,
        handlers::workflows::catalog_solutions,

        // --- Mail ---
        handlers::mail::send_email,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::SessionContext,
            models::auth::LoginUserPayload,
            models::auth::CreateUserPayload,
            models::auth::AuthResponse,

            // --- Catalog ---
            models::operation::OperationKind,
            models::customer::Job,
            models::customer::Customer,
            models::customer::CustomerPayload,
            models::employee::Employee,
            models::employee::EmployeePayload,
            models::solution::Solution,
            models::solution::SolutionPayload,

            // --- Records ---
            models::service_record::ProcedureSlot,
            models::service_record::ServiceRecord,
            handlers::records::EmailExportPayload,

            // --- Workflows ---
            models::workflow::Step,
            models::workflow::EmployeeRef,
            models::workflow::SelectedSolution,
            services::workflow_service::WorkflowPatchPayload,
            services::workflow_service::DraftView,
            services::workflow_service::WorkflowView,
            services::submission_service::SubmissionReceipt,

            // --- Mail ---
            models::mail::SendEmailRequest,
            models::mail::SendEmailResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Autentificare"),
        (name = "Users", description = "Utilizatori si sesiune"),
        (name = "Customers", description = "Administrare clienti"),
        (name = "Employees", description = "Administrare angajati"),
        (name = "Solutions", description = "Administrare solutii si stocuri"),
        (name = "Records", description = "Lucrari inregistrate si export"),
        (name = "Workflows", description = "Fluxul de teren pentru procesul verbal"),
        (name = "Mail", description = "Trimitere email cu atasamente")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/login",
            "/api/users/me",
            "/api/customers/{id}",
            "/api/records/export/email",
            "/api/workflows/{id}/finish",
            "/api/workflows/catalog/solutions",
            "/api/mail/send-email",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("api_jwt")));
    }
}
