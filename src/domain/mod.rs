//! Domain module
//!
//! Core domain types and business rules.

pub mod amount;
pub mod beneficiary;
pub mod context;
pub mod dates;
pub mod error;
pub mod id;
pub mod image;
pub mod loan;
pub mod payment;
pub mod user;

pub use amount::{Amount, AmountError, Percentage};
pub use beneficiary::{Beneficiary, BeneficiaryDraft};
pub use context::OperationContext;
pub use dates::{format_date, parse_date, DateError, MonthRange};
pub use error::DomainError;
pub use id::{is_valid_id, parse_id};
pub use image::{detect_image_type, is_image};
pub use loan::{Loan, LoanDraft};
pub use payment::{Payment, PaymentDraft, PaymentType};
pub use user::UserCredential;
