pub mod auth;
pub mod customers;
pub mod employees;
pub mod mail;
pub mod records;
pub mod solutions;
pub mod workflows;
