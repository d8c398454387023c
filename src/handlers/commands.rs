//! Command definitions
//!
//! Request payloads for the write operations. Field rules that need no
//! storage access are declared with `validator`; the error codes double as
//! message catalog keys.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// ASCII digits only; `\d` would also match other Unicode digits
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10,15}$").expect("static regex should not panic"));

fn name_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("beneficiary.name.blank"));
    }
    Ok(())
}

fn phone_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("beneficiary.phone.blank"));
    }
    Ok(())
}

/// Order in which beneficiary violations are reported
pub(crate) const BENEFICIARY_RULES: &[&str] = &[
    "beneficiary.name.blank",
    "beneficiary.name.too_long",
    "beneficiary.phone.blank",
    "beneficiary.phone.pattern",
];

/// First code of `rules` raised in `errors`
pub(crate) fn first_violation(
    errors: &ValidationErrors,
    rules: &[&'static str],
) -> Option<&'static str> {
    let raised: Vec<&str> = errors
        .field_errors()
        .values()
        .flat_map(|errors| errors.iter())
        .map(|error| error.code.as_ref())
        .collect();

    rules.iter().copied().find(|rule| raised.contains(rule))
}

/// Create or replace a beneficiary
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BeneficiaryCommand {
    #[validate(
        custom(function = "name_not_blank"),
        length(max = 100, code = "beneficiary.name.too_long")
    )]
    pub name: String,

    #[validate(
        custom(function = "phone_not_blank"),
        regex(path = *PHONE_PATTERN, code = "beneficiary.phone.pattern")
    )]
    pub phone: String,

    #[serde(default)]
    pub note: Option<String>,
}

impl BeneficiaryCommand {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Create or replace a loan. Dates are `YYYY-MM-DD` text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanCommand {
    pub beneficiary_id: i64,
    pub loan_date: String,
    pub due_date: String,
    pub principal: Decimal,
    pub percentage: Decimal,
    pub settled: bool,
    #[serde(default)]
    pub note: Option<String>,
}

impl LoanCommand {
    pub fn new(
        beneficiary_id: i64,
        loan_date: impl Into<String>,
        due_date: impl Into<String>,
        principal: Decimal,
        percentage: Decimal,
    ) -> Self {
        Self {
            beneficiary_id,
            loan_date: loan_date.into(),
            due_date: due_date.into(),
            principal,
            percentage,
            settled: false,
            note: None,
        }
    }

    pub fn settled(mut self, settled: bool) -> Self {
        self.settled = settled;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Create or replace a payment. `payment_type` is checked against
/// [`crate::domain::PaymentType`] by the handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCommand {
    pub loan_id: i64,
    pub payment_date: String,
    pub amount: Decimal,
    pub payment_type: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl PaymentCommand {
    pub fn new(
        loan_id: i64,
        payment_date: impl Into<String>,
        amount: Decimal,
        payment_type: impl Into<String>,
    ) -> Self {
        Self {
            loan_id,
            payment_date: payment_date.into(),
            amount,
            payment_type: payment_type.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(command: &BeneficiaryCommand) -> Option<&'static str> {
        command
            .validate()
            .err()
            .and_then(|errors| first_violation(&errors, BENEFICIARY_RULES))
    }

    #[test]
    fn test_valid_beneficiary() {
        let command = BeneficiaryCommand::new("Erick Marques", "081988888888");
        assert!(command.validate().is_ok());
    }

    #[test]
    fn test_blank_name() {
        let command = BeneficiaryCommand::new("   ", "081988888888");
        assert_eq!(violation(&command), Some("beneficiary.name.blank"));
    }

    #[test]
    fn test_long_name() {
        let command = BeneficiaryCommand::new("a".repeat(101), "081988888888");
        assert_eq!(violation(&command), Some("beneficiary.name.too_long"));

        let command = BeneficiaryCommand::new("a".repeat(100), "081988888888");
        assert_eq!(violation(&command), None);
    }

    #[test]
    fn test_phone_pattern() {
        for phone in ["123456789", "1234567890123456", "08198888888a", "(81)98888888"] {
            let command = BeneficiaryCommand::new("Ana", phone);
            assert_eq!(violation(&command), Some("beneficiary.phone.pattern"), "{phone}");
        }
        for phone in ["1234567890", "123456789012345"] {
            assert!(BeneficiaryCommand::new("Ana", phone).validate().is_ok(), "{phone}");
        }
    }

    #[test]
    fn test_phone_rejects_non_ascii_digits() {
        for phone in ["١٢٣٤٥٦٧٨٩٠", "１２３４５６７８９０", "۰۱۲۳۴۵۶۷۸۹"] {
            let command = BeneficiaryCommand::new("Ana", phone);
            assert_eq!(violation(&command), Some("beneficiary.phone.pattern"), "{phone}");
        }
    }

    #[test]
    fn test_blank_phone_reported_before_pattern() {
        let command = BeneficiaryCommand::new("Ana", "");
        assert_eq!(violation(&command), Some("beneficiary.phone.blank"));
    }

    #[test]
    fn test_loan_command_from_json() {
        let command: LoanCommand = serde_json::from_str(
            r#"{"beneficiary_id":1,"loan_date":"2024-01-10","due_date":"2024-02-10",
                "principal":"1000.00","percentage":30,"settled":true}"#,
        )
        .unwrap();

        assert!(command.settled);
        assert!(command.note.is_none());
        assert_eq!(command.principal, Decimal::new(100000, 2));
        assert_eq!(command.percentage, Decimal::from(30));
    }

    #[test]
    fn test_loan_command_requires_settled() {
        let missing = serde_json::from_str::<LoanCommand>(
            r#"{"beneficiary_id":1,"loan_date":"2024-01-10","due_date":"2024-02-10",
                "principal":"1000.00","percentage":30}"#,
        );
        assert!(missing.is_err());
    }
}
