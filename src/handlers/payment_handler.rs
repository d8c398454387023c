//! Payment Handler
//!
//! CRUD for payments against a loan, plus the payment totals.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{Amount, DomainError, OperationContext, Payment, PaymentDraft, PaymentType};
use crate::messages::Messages;
use crate::store::{PaymentStore, StoreError};

use super::{
    amount_error, bad_input, date_field, month_range, not_found, resolve_id, LoanHandler,
    PaymentCommand,
};

/// Amount received for one loan, `total` is `None` when nothing was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoanTotal {
    pub loan_id: i64,
    pub total: Option<Decimal>,
}

#[derive(Clone)]
pub struct PaymentHandler {
    store: Arc<dyn PaymentStore>,
    loans: LoanHandler,
    messages: Messages,
}

impl PaymentHandler {
    pub fn new(store: Arc<dyn PaymentStore>, loans: LoanHandler, messages: Messages) -> Self {
        Self {
            store,
            loans,
            messages,
        }
    }

    fn id(&self, text: &str, ctx: &OperationContext) -> Result<i64, DomainError> {
        resolve_id(&self.messages, ctx, text, "payment.invalid_id")
    }

    fn not_found(&self, id: i64, ctx: &OperationContext) -> DomainError {
        not_found(&self.messages, ctx, "payment.not_found", id)
    }

    /// Resolve the loan, then validate date, amount and type
    async fn draft(
        &self,
        command: PaymentCommand,
        ctx: &OperationContext,
    ) -> Result<PaymentDraft, DomainError> {
        let loan = self.loans.find(command.loan_id, ctx).await?;

        let payment_date = date_field(&self.messages, ctx, &command.payment_date)?;
        let amount = Amount::new(command.amount)
            .map_err(|e| amount_error(&self.messages, ctx, e, "payment.amount.positive"))?;
        let payment_type: PaymentType = command.payment_type.parse().map_err(|_| {
            bad_input(&self.messages, ctx, "payment.type.invalid", &[&command.payment_type])
        })?;

        Ok(PaymentDraft {
            loan_id: loan.id,
            payment_date,
            amount,
            payment_type,
            note: command.note,
        })
    }

    fn write_error(
        &self,
        err: StoreError,
        payment_id: Option<i64>,
        loan_id: i64,
        ctx: &OperationContext,
    ) -> DomainError {
        match err {
            StoreError::ForeignKeyViolation(_) => {
                not_found(&self.messages, ctx, "loan.not_found", loan_id)
            }
            StoreError::RowNotFound(id) => self.not_found(payment_id.unwrap_or(id), ctx),
            other => other.into(),
        }
    }

    async fn find(&self, id: i64, ctx: &OperationContext) -> Result<Payment, DomainError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| self.not_found(id, ctx))
    }

    pub async fn insert(
        &self,
        command: PaymentCommand,
        ctx: &OperationContext,
    ) -> Result<Payment, DomainError> {
        let draft = self.draft(command, ctx).await?;
        let loan_id = draft.loan_id;

        let payment = self
            .store
            .insert(draft)
            .await
            .map_err(|e| self.write_error(e, None, loan_id, ctx))?;

        tracing::info!(
            payment_id = payment.id,
            loan_id,
            amount = %payment.amount,
            payment_type = %payment.payment_type,
            correlation_id = ?ctx.correlation_id,
            "Payment recorded"
        );
        Ok(payment)
    }

    pub async fn update(
        &self,
        id: &str,
        command: PaymentCommand,
        ctx: &OperationContext,
    ) -> Result<Payment, DomainError> {
        let id = self.id(id, ctx)?;
        let draft = self.draft(command, ctx).await?;
        let loan_id = draft.loan_id;

        let mut payment = self.find(id, ctx).await?;
        payment.apply(draft);

        let payment = self
            .store
            .update(payment)
            .await
            .map_err(|e| self.write_error(e, Some(id), loan_id, ctx))?;

        tracing::info!(payment_id = id, correlation_id = ?ctx.correlation_id, "Payment updated");
        Ok(payment)
    }

    pub async fn remove(&self, id: &str, ctx: &OperationContext) -> Result<(), DomainError> {
        let id = self.id(id, ctx)?;
        self.find(id, ctx).await?;

        match self.store.delete(id).await {
            Ok(()) => {
                tracing::info!(payment_id = id, correlation_id = ?ctx.correlation_id, "Payment deleted");
                Ok(())
            }
            Err(StoreError::RowNotFound(_)) => Err(self.not_found(id, ctx)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_id(
        &self,
        id: &str,
        ctx: &OperationContext,
    ) -> Result<Payment, DomainError> {
        let id = self.id(id, ctx)?;
        self.find(id, ctx).await
    }

    pub async fn list_all(&self, _ctx: &OperationContext) -> Result<Vec<Payment>, DomainError> {
        Ok(self.store.find_all().await?)
    }

    /// Payments of one loan, earliest first; the loan must exist
    pub async fn list_by_loan(
        &self,
        loan_id: &str,
        ctx: &OperationContext,
    ) -> Result<Vec<Payment>, DomainError> {
        let loan = self.loans.get_by_id(loan_id, ctx).await?;
        Ok(self.store.find_by_loan(loan.id).await?)
    }

    /// Sum paid against a loan. An absent loan has no payments, so the
    /// total is `None` rather than an error.
    pub async fn total_received_for_loan(
        &self,
        loan_id: &str,
        ctx: &OperationContext,
    ) -> Result<LoanTotal, DomainError> {
        let loan_id = resolve_id(&self.messages, ctx, loan_id, "loan.invalid_id")?;
        let total = self.store.total_received_for_loan(loan_id).await?;
        Ok(LoanTotal { loan_id, total })
    }

    /// Sum paid in the month, `None` when nothing was paid
    pub async fn total_received_in_month(
        &self,
        year: i32,
        month: u32,
        ctx: &OperationContext,
    ) -> Result<Option<Decimal>, DomainError> {
        let month = month_range(&self.messages, ctx, year, month)?;
        Ok(self.store.total_received(month).await?)
    }
}
