pub mod auth;
pub mod customer_service;
pub mod document_service;
pub mod employee_service;
pub mod mail_service;
pub mod record_service;
pub mod solution_service;
pub mod submission_service;
pub mod template_source;
pub mod workflow;
pub mod workflow_service;
