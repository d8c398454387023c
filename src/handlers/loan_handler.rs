//! Loan Handler
//!
//! CRUD for loans, the loan listings, and the monthly loan aggregates.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::{
    Amount, DomainError, Loan, LoanDraft, MonthRange, OperationContext, Percentage,
};
use crate::messages::Messages;
use crate::store::{LoanStore, StoreError};

use super::{
    amount_error, bad_input, date_field, month_range, not_found, resolve_id, BeneficiaryHandler,
    LoanCommand,
};

#[derive(Clone)]
pub struct LoanHandler {
    store: Arc<dyn LoanStore>,
    beneficiaries: BeneficiaryHandler,
    messages: Messages,
}

impl LoanHandler {
    pub fn new(
        store: Arc<dyn LoanStore>,
        beneficiaries: BeneficiaryHandler,
        messages: Messages,
    ) -> Self {
        Self {
            store,
            beneficiaries,
            messages,
        }
    }

    fn id(&self, text: &str, ctx: &OperationContext) -> Result<i64, DomainError> {
        resolve_id(&self.messages, ctx, text, "loan.invalid_id")
    }

    fn not_found(&self, id: i64, ctx: &OperationContext) -> DomainError {
        not_found(&self.messages, ctx, "loan.not_found", id)
    }

    fn month(&self, year: i32, month: u32, ctx: &OperationContext) -> Result<MonthRange, DomainError> {
        month_range(&self.messages, ctx, year, month)
    }

    /// Resolve the beneficiary, then validate dates and amounts
    async fn draft(
        &self,
        command: LoanCommand,
        ctx: &OperationContext,
    ) -> Result<LoanDraft, DomainError> {
        let beneficiary = self.beneficiaries.find(command.beneficiary_id, ctx).await?;

        let loan_date = date_field(&self.messages, ctx, &command.loan_date)?;
        let due_date = date_field(&self.messages, ctx, &command.due_date)?;

        let principal = Amount::new(command.principal)
            .map_err(|e| amount_error(&self.messages, ctx, e, "loan.principal.positive"))?;
        let percentage = Percentage::new(command.percentage)
            .map_err(|e| amount_error(&self.messages, ctx, e, "loan.percentage.positive_or_zero"))?;

        Ok(LoanDraft {
            beneficiary_id: beneficiary.id,
            loan_date,
            due_date,
            principal,
            percentage,
            settled: command.settled,
            note: command.note,
        })
    }

    /// Map a write failure: a parent removed after resolution is reported
    /// as the missing beneficiary
    fn write_error(
        &self,
        err: StoreError,
        loan_id: Option<i64>,
        beneficiary_id: i64,
        ctx: &OperationContext,
    ) -> DomainError {
        match err {
            StoreError::ForeignKeyViolation(_) => {
                not_found(&self.messages, ctx, "beneficiary.not_found", beneficiary_id)
            }
            StoreError::RowNotFound(id) => self.not_found(loan_id.unwrap_or(id), ctx),
            other => other.into(),
        }
    }

    /// Load an existing loan by numeric id
    pub async fn find(&self, id: i64, ctx: &OperationContext) -> Result<Loan, DomainError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| self.not_found(id, ctx))
    }

    pub async fn insert(
        &self,
        command: LoanCommand,
        ctx: &OperationContext,
    ) -> Result<Loan, DomainError> {
        let draft = self.draft(command, ctx).await?;
        let beneficiary_id = draft.beneficiary_id;

        let loan = self
            .store
            .insert(draft)
            .await
            .map_err(|e| self.write_error(e, None, beneficiary_id, ctx))?;

        tracing::info!(
            loan_id = loan.id,
            beneficiary_id,
            principal = %loan.principal,
            correlation_id = ?ctx.correlation_id,
            "Loan created"
        );
        Ok(loan)
    }

    pub async fn update(
        &self,
        id: &str,
        command: LoanCommand,
        ctx: &OperationContext,
    ) -> Result<Loan, DomainError> {
        let id = self.id(id, ctx)?;
        let draft = self.draft(command, ctx).await?;
        let beneficiary_id = draft.beneficiary_id;

        let mut loan = self.find(id, ctx).await?;
        loan.apply(draft);

        let loan = self
            .store
            .update(loan)
            .await
            .map_err(|e| self.write_error(e, Some(id), beneficiary_id, ctx))?;

        tracing::info!(loan_id = id, correlation_id = ?ctx.correlation_id, "Loan updated");
        Ok(loan)
    }

    pub async fn remove(&self, id: &str, ctx: &OperationContext) -> Result<(), DomainError> {
        let id = self.id(id, ctx)?;
        self.find(id, ctx).await?;

        match self.store.delete(id).await {
            Ok(()) => {
                tracing::info!(loan_id = id, correlation_id = ?ctx.correlation_id, "Loan deleted");
                Ok(())
            }
            Err(StoreError::RowNotFound(_)) => Err(self.not_found(id, ctx)),
            Err(e) if e.is_foreign_key_violation() => {
                Err(bad_input(&self.messages, ctx, "loan.has_dependents", &[&id]))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_id(&self, id: &str, ctx: &OperationContext) -> Result<Loan, DomainError> {
        let id = self.id(id, ctx)?;
        self.find(id, ctx).await
    }

    pub async fn list_all(&self, _ctx: &OperationContext) -> Result<Vec<Loan>, DomainError> {
        Ok(self.store.find_all().await?)
    }

    /// Loans of one beneficiary; the beneficiary must exist
    pub async fn list_by_beneficiary(
        &self,
        beneficiary_id: &str,
        ctx: &OperationContext,
    ) -> Result<Vec<Loan>, DomainError> {
        let beneficiary = self.beneficiaries.get_by_id(beneficiary_id, ctx).await?;
        Ok(self.store.find_by_beneficiary(beneficiary.id).await?)
    }

    /// Unsettled loans due strictly before `date`
    pub async fn list_overdue(
        &self,
        date: &str,
        ctx: &OperationContext,
    ) -> Result<Vec<Loan>, DomainError> {
        let date = date_field(&self.messages, ctx, date)?;
        Ok(self.store.find_overdue(date).await?)
    }

    /// Loans with the given settled flag, earliest due date first
    pub async fn list_by_settled(
        &self,
        settled: bool,
        _ctx: &OperationContext,
    ) -> Result<Vec<Loan>, DomainError> {
        Ok(self.store.find_by_settled(settled).await?)
    }

    /// Sum of principal over loans dated in the month, `None` when there are none
    pub async fn total_lent_in_month(
        &self,
        year: i32,
        month: u32,
        ctx: &OperationContext,
    ) -> Result<Option<Decimal>, DomainError> {
        let month = self.month(year, month, ctx)?;
        Ok(self.store.total_lent(month).await?)
    }

    /// Sum of interest over unsettled loans due in the month
    pub async fn total_receivable_gross_in_month(
        &self,
        year: i32,
        month: u32,
        ctx: &OperationContext,
    ) -> Result<Option<Decimal>, DomainError> {
        let month = self.month(year, month, ctx)?;
        Ok(self.store.total_receivable_gross(month).await?)
    }

    /// Sum of principal plus interest over unsettled loans due in the month
    pub async fn total_receivable_net_in_month(
        &self,
        year: i32,
        month: u32,
        ctx: &OperationContext,
    ) -> Result<Option<Decimal>, DomainError> {
        let month = self.month(year, month, ctx)?;
        Ok(self.store.total_receivable_net(month).await?)
    }
}
