pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod employee_repo;
pub use employee_repo::EmployeeRepository;
pub mod reception_repo;
pub use reception_repo::ReceptionRepository;
pub mod service_record_repo;
pub use service_record_repo::ServiceRecordRepository;
pub mod solution_repo;
pub use solution_repo::SolutionRepository;
pub mod submission_store;
pub use submission_store::PgSubmissionStore;
pub mod user_repo;
pub use user_repo::UserRepository;
