//! Loan
//!
//! A principal amount extended to a beneficiary with an interest percentage
//! and a due date.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amount::{Amount, Percentage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: i64,
    pub beneficiary_id: i64,
    pub loan_date: NaiveDateTime,
    pub due_date: NaiveDateTime,
    pub principal: Decimal,
    pub percentage: Decimal,
    pub settled: bool,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Interest owed: `principal * percentage / 100`
    pub fn interest(&self) -> Decimal {
        self.principal * self.percentage / Decimal::ONE_HUNDRED
    }

    /// Principal plus interest
    pub fn total_due(&self) -> Decimal {
        self.principal + self.interest()
    }

    /// Overwrite every mutable field, beneficiary reference included
    pub fn apply(&mut self, draft: LoanDraft) {
        self.beneficiary_id = draft.beneficiary_id;
        self.loan_date = draft.loan_date;
        self.due_date = draft.due_date;
        self.principal = draft.principal.value();
        self.percentage = draft.percentage.value();
        self.settled = draft.settled;
        self.note = draft.note;
    }
}

/// Validated input for insert/update. `beneficiary_id` has already been
/// resolved to an existing beneficiary.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanDraft {
    pub beneficiary_id: i64,
    pub loan_date: NaiveDateTime,
    pub due_date: NaiveDateTime,
    pub principal: Amount,
    pub percentage: Percentage,
    pub settled: bool,
    pub note: Option<String>,
}
