//! Storage module
//!
//! Storage collaborator seams. Managers only see these traits; the
//! PostgreSQL implementation backs the server and the in-memory one backs
//! tests and local development.

pub mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::domain::{
    Beneficiary, BeneficiaryDraft, Loan, LoanDraft, MonthRange, Payment, PaymentDraft,
    UserCredential,
};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait BeneficiaryStore: Send + Sync {
    async fn insert(&self, draft: BeneficiaryDraft) -> StoreResult<Beneficiary>;

    /// Persist the mutable fields of `beneficiary`, refreshing `updated_at`
    async fn update(&self, beneficiary: Beneficiary) -> StoreResult<Beneficiary>;

    async fn delete(&self, id: i64) -> StoreResult<()>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Beneficiary>>;

    async fn find_all(&self) -> StoreResult<Vec<Beneficiary>>;

    /// Case-insensitive substring match on the name
    async fn search_by_name(&self, fragment: &str) -> StoreResult<Vec<Beneficiary>>;

    async fn save_image(&self, id: i64, image: Vec<u8>) -> StoreResult<()>;

    async fn load_image(&self, id: i64) -> StoreResult<Option<Vec<u8>>>;
}

#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn insert(&self, draft: LoanDraft) -> StoreResult<Loan>;

    async fn update(&self, loan: Loan) -> StoreResult<Loan>;

    async fn delete(&self, id: i64) -> StoreResult<()>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Loan>>;

    async fn find_all(&self) -> StoreResult<Vec<Loan>>;

    async fn find_by_beneficiary(&self, beneficiary_id: i64) -> StoreResult<Vec<Loan>>;

    /// Unsettled loans whose due date is strictly before `date`
    async fn find_overdue(&self, date: NaiveDateTime) -> StoreResult<Vec<Loan>>;

    /// Loans with the given settled flag, due date ascending
    async fn find_by_settled(&self, settled: bool) -> StoreResult<Vec<Loan>>;

    /// `SUM(principal)` over loans dated in `month`
    async fn total_lent(&self, month: MonthRange) -> StoreResult<Option<Decimal>>;

    /// `SUM(principal * percentage / 100)` over unsettled loans due in `month`
    async fn total_receivable_gross(&self, month: MonthRange) -> StoreResult<Option<Decimal>>;

    /// `SUM(principal + principal * percentage / 100)` over unsettled loans due in `month`
    async fn total_receivable_net(&self, month: MonthRange) -> StoreResult<Option<Decimal>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, draft: PaymentDraft) -> StoreResult<Payment>;

    async fn update(&self, payment: Payment) -> StoreResult<Payment>;

    async fn delete(&self, id: i64) -> StoreResult<()>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Payment>>;

    async fn find_all(&self) -> StoreResult<Vec<Payment>>;

    /// Payments of a loan, payment date ascending
    async fn find_by_loan(&self, loan_id: i64) -> StoreResult<Vec<Payment>>;

    /// `SUM(amount)` over payments of a loan
    async fn total_received_for_loan(&self, loan_id: i64) -> StoreResult<Option<Decimal>>;

    /// `SUM(amount)` over payments dated in `month`
    async fn total_received(&self, month: MonthRange) -> StoreResult<Option<Decimal>>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_login(&self, login: &str) -> StoreResult<Option<UserCredential>>;
}
