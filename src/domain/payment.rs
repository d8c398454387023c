//! Payment
//!
//! An amount applied against a specific loan.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::amount::Amount;

/// How a payment settles its loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    FullSettlement,
    InterestOnly,
    NegotiatedSettlement,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullSettlement => "FULL_SETTLEMENT",
            Self::InterestOnly => "INTEREST_ONLY",
            Self::NegotiatedSettlement => "NEGOTIATED_SETTLEMENT",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown payment type: {0}")]
pub struct UnknownPaymentType(pub String);

impl FromStr for PaymentType {
    type Err = UnknownPaymentType;

    /// Accepts the canonical names and the legacy `TOTAL`/`JUROS`/`ACORDO`
    /// spellings still present in older rows and clients.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULL_SETTLEMENT" | "TOTAL" => Ok(Self::FullSettlement),
            "INTEREST_ONLY" | "JUROS" => Ok(Self::InterestOnly),
            "NEGOTIATED_SETTLEMENT" | "ACORDO" => Ok(Self::NegotiatedSettlement),
            other => Err(UnknownPaymentType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub loan_id: i64,
    pub payment_date: NaiveDateTime,
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn apply(&mut self, draft: PaymentDraft) {
        self.loan_id = draft.loan_id;
        self.payment_date = draft.payment_date;
        self.amount = draft.amount.value();
        self.payment_type = draft.payment_type;
        self.note = draft.note;
    }
}

/// Validated input for insert/update. `loan_id` has already been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDraft {
    pub loan_id: i64,
    pub payment_date: NaiveDateTime,
    pub amount: Amount,
    pub payment_type: PaymentType,
    pub note: Option<String>,
}
