//! Command Handlers module
//!
//! One handler per entity. Each validates its input, resolves the entities
//! it references, and talks to the storage traits. Every failure leaves as
//! a [`DomainError`] with a message rendered in the caller's locale.

mod beneficiary_handler;
mod commands;
mod loan_handler;
mod payment_handler;


use std::fmt::Display;

use chrono::NaiveDateTime;

use crate::domain::{
    is_valid_id, parse_date, parse_id, AmountError, DomainError, MonthRange, OperationContext,
};
use crate::messages::Messages;

pub use beneficiary_handler::BeneficiaryHandler;
pub use commands::{BeneficiaryCommand, LoanCommand, PaymentCommand};
pub use loan_handler::LoanHandler;
pub use payment_handler::{LoanTotal, PaymentHandler};

fn render(
    messages: &Messages,
    ctx: &OperationContext,
    code: &'static str,
    args: &[&dyn Display],
) -> String {
    messages.render(ctx.locale.as_deref(), code, args)
}

fn bad_input(
    messages: &Messages,
    ctx: &OperationContext,
    code: &'static str,
    args: &[&dyn Display],
) -> DomainError {
    let message = render(messages, ctx, code, args);
    tracing::debug!(code, correlation_id = ?ctx.correlation_id, "Rejected input: {}", message);
    DomainError::bad_input(code, message)
}

fn not_found(
    messages: &Messages,
    ctx: &OperationContext,
    code: &'static str,
    id: i64,
) -> DomainError {
    let message = render(messages, ctx, code, &[&id]);
    tracing::debug!(code, id, correlation_id = ?ctx.correlation_id, "Entity not found");
    DomainError::not_found(code, message)
}

/// Validate a path id before any lookup. Digit-only text that does not fit
/// an `i64` cannot name a row and is rejected the same way.
fn resolve_id(
    messages: &Messages,
    ctx: &OperationContext,
    text: &str,
    code: &'static str,
) -> Result<i64, DomainError> {
    if !is_valid_id(text) {
        return Err(bad_input(messages, ctx, code, &[&text]));
    }
    parse_id(text).ok_or_else(|| bad_input(messages, ctx, code, &[&text]))
}

fn date_field(
    messages: &Messages,
    ctx: &OperationContext,
    text: &str,
) -> Result<NaiveDateTime, DomainError> {
    parse_date(text).map_err(|_| bad_input(messages, ctx, "date.invalid", &[&text]))
}

fn month_range(
    messages: &Messages,
    ctx: &OperationContext,
    year: i32,
    month: u32,
) -> Result<MonthRange, DomainError> {
    MonthRange::new(year, month)
        .map_err(|_| bad_input(messages, ctx, "month.invalid", &[&year, &month]))
}

/// `positive_code` when the value is not positive, `amount.invalid` for the
/// other bound violations
fn amount_error(
    messages: &Messages,
    ctx: &OperationContext,
    err: AmountError,
    positive_code: &'static str,
) -> DomainError {
    match err {
        AmountError::NotPositive(_) | AmountError::Negative(_) => {
            bad_input(messages, ctx, positive_code, &[])
        }
        other => bad_input(messages, ctx, "amount.invalid", &[&other]),
    }
}
