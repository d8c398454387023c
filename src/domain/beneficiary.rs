//! Beneficiary
//!
//! A person who can receive loans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored beneficiary. The image blob is kept out of this read model;
/// `has_image` tells whether one is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub note: Option<String>,
    pub has_image: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Beneficiary {
    /// Overwrite the mutable fields with a validated draft
    pub fn apply(&mut self, draft: BeneficiaryDraft) {
        self.name = draft.name;
        self.phone = draft.phone;
        self.note = draft.note;
    }
}

/// Validated input for insert/update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeneficiaryDraft {
    pub name: String,
    pub phone: String,
    pub note: Option<String>,
}
