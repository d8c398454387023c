//! loan_tracker Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod messages;
pub mod store;

mod error;

pub use config::Config;
pub use domain::{Amount, AmountError, DomainError, OperationContext, Percentage};
pub use error::{AppError, AppResult};
