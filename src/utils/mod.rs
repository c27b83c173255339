pub mod database_retry;
pub mod validation;
