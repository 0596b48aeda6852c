pub mod auth;
pub mod customer;
pub mod employee;
pub mod mail;
pub mod operation;
pub mod pagination;
pub mod service_record;
pub mod solution;
pub mod workflow;
