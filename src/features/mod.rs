pub mod auth;
pub mod jurisdiction;
pub mod reports;
