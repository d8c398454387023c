//! In-memory implementation of the store traits for testing and development
//!
//! Enforces the same referential rules as the PostgreSQL schema: children
//! must reference an existing parent and parents with children cannot be
//! deleted.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    BeneficiaryStore, CredentialStore, LoanStore, PaymentStore, StoreError, StoreResult,
};
use crate::domain::{
    Beneficiary, BeneficiaryDraft, Loan, LoanDraft, MonthRange, Payment, PaymentDraft,
    UserCredential,
};

#[derive(Debug, Clone)]
struct BeneficiaryRow {
    beneficiary: Beneficiary,
    image: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    beneficiaries: BTreeMap<i64, BeneficiaryRow>,
    loans: BTreeMap<i64, Loan>,
    payments: BTreeMap<i64, Payment>,
    users: HashMap<String, UserCredential>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn require_beneficiary(&self, id: i64) -> StoreResult<()> {
        if self.beneficiaries.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!(
                "beneficiary {id} is not present"
            )))
        }
    }

    fn require_loan(&self, id: i64) -> StoreResult<()> {
        if self.loans.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!("loan {id} is not present")))
        }
    }
}

/// In-memory store
///
/// Uses RwLock for thread-safe access. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

fn sum(values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    values.fold(None, |total, value| Some(total.unwrap_or(Decimal::ZERO) + value))
}

impl MemoryStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a credential, returning its id
    pub fn add_user(&self, login: &str, password_hash: &str) -> StoreResult<i64> {
        let mut tables = self.write()?;
        let id = tables.next_id();
        tables.users.insert(
            login.to_string(),
            UserCredential {
                id,
                login: login.to_string(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(id)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StoreError::Unavailable(format!("Failed to acquire read lock: {e}")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StoreError::Unavailable(format!("Failed to acquire write lock: {e}")))
    }
}

#[async_trait]
impl BeneficiaryStore for MemoryStore {
    async fn insert(&self, draft: BeneficiaryDraft) -> StoreResult<Beneficiary> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let beneficiary = Beneficiary {
            id: tables.next_id(),
            name: draft.name,
            phone: draft.phone,
            note: draft.note,
            has_image: false,
            created_at: now,
            updated_at: now,
        };
        tables.beneficiaries.insert(
            beneficiary.id,
            BeneficiaryRow {
                beneficiary: beneficiary.clone(),
                image: None,
            },
        );
        Ok(beneficiary)
    }

    async fn update(&self, mut beneficiary: Beneficiary) -> StoreResult<Beneficiary> {
        let mut tables = self.write()?;
        let row = tables
            .beneficiaries
            .get_mut(&beneficiary.id)
            .ok_or(StoreError::RowNotFound(beneficiary.id))?;

        beneficiary.created_at = row.beneficiary.created_at;
        beneficiary.has_image = row.image.is_some();
        beneficiary.updated_at = Utc::now();
        row.beneficiary = beneficiary.clone();
        Ok(beneficiary)
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.loans.values().any(|loan| loan.beneficiary_id == id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "beneficiary {id} is still referenced by loans"
            )));
        }
        tables
            .beneficiaries
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RowNotFound(id))
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Beneficiary>> {
        let tables = self.read()?;
        Ok(tables.beneficiaries.get(&id).map(|row| row.beneficiary.clone()))
    }

    async fn find_all(&self) -> StoreResult<Vec<Beneficiary>> {
        let tables = self.read()?;
        Ok(tables
            .beneficiaries
            .values()
            .map(|row| row.beneficiary.clone())
            .collect())
    }

    async fn search_by_name(&self, fragment: &str) -> StoreResult<Vec<Beneficiary>> {
        let needle = fragment.to_lowercase();
        let tables = self.read()?;
        Ok(tables
            .beneficiaries
            .values()
            .filter(|row| row.beneficiary.name.to_lowercase().contains(&needle))
            .map(|row| row.beneficiary.clone())
            .collect())
    }

    async fn save_image(&self, id: i64, image: Vec<u8>) -> StoreResult<()> {
        let mut tables = self.write()?;
        let row = tables
            .beneficiaries
            .get_mut(&id)
            .ok_or(StoreError::RowNotFound(id))?;
        row.image = Some(image);
        row.beneficiary.has_image = true;
        row.beneficiary.updated_at = Utc::now();
        Ok(())
    }

    async fn load_image(&self, id: i64) -> StoreResult<Option<Vec<u8>>> {
        let tables = self.read()?;
        Ok(tables.beneficiaries.get(&id).and_then(|row| row.image.clone()))
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn insert(&self, draft: LoanDraft) -> StoreResult<Loan> {
        let mut tables = self.write()?;
        tables.require_beneficiary(draft.beneficiary_id)?;

        let now = Utc::now();
        let loan = Loan {
            id: tables.next_id(),
            beneficiary_id: draft.beneficiary_id,
            loan_date: draft.loan_date,
            due_date: draft.due_date,
            principal: draft.principal.value(),
            percentage: draft.percentage.value(),
            settled: draft.settled,
            note: draft.note,
            created_at: now,
            updated_at: now,
        };
        tables.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn update(&self, mut loan: Loan) -> StoreResult<Loan> {
        let mut tables = self.write()?;
        tables.require_beneficiary(loan.beneficiary_id)?;

        let stored = tables
            .loans
            .get_mut(&loan.id)
            .ok_or(StoreError::RowNotFound(loan.id))?;
        loan.created_at = stored.created_at;
        loan.updated_at = Utc::now();
        *stored = loan.clone();
        Ok(loan)
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.payments.values().any(|payment| payment.loan_id == id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "loan {id} is still referenced by payments"
            )));
        }
        tables
            .loans
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RowNotFound(id))
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Loan>> {
        Ok(self.read()?.loans.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Loan>> {
        Ok(self.read()?.loans.values().cloned().collect())
    }

    async fn find_by_beneficiary(&self, beneficiary_id: i64) -> StoreResult<Vec<Loan>> {
        let tables = self.read()?;
        Ok(tables
            .loans
            .values()
            .filter(|loan| loan.beneficiary_id == beneficiary_id)
            .cloned()
            .collect())
    }

    async fn find_overdue(&self, date: NaiveDateTime) -> StoreResult<Vec<Loan>> {
        let tables = self.read()?;
        let mut loans: Vec<Loan> = tables
            .loans
            .values()
            .filter(|loan| !loan.settled && loan.due_date < date)
            .cloned()
            .collect();
        loans.sort_by_key(|loan| (loan.due_date, loan.id));
        Ok(loans)
    }

    async fn find_by_settled(&self, settled: bool) -> StoreResult<Vec<Loan>> {
        let tables = self.read()?;
        let mut loans: Vec<Loan> = tables
            .loans
            .values()
            .filter(|loan| loan.settled == settled)
            .cloned()
            .collect();
        loans.sort_by_key(|loan| (loan.due_date, loan.id));
        Ok(loans)
    }

    async fn total_lent(&self, month: MonthRange) -> StoreResult<Option<Decimal>> {
        let tables = self.read()?;
        Ok(sum(tables
            .loans
            .values()
            .filter(|loan| month.contains(&loan.loan_date))
            .map(|loan| loan.principal)))
    }

    async fn total_receivable_gross(&self, month: MonthRange) -> StoreResult<Option<Decimal>> {
        let tables = self.read()?;
        Ok(sum(tables
            .loans
            .values()
            .filter(|loan| !loan.settled && month.contains(&loan.due_date))
            .map(Loan::interest)))
    }

    async fn total_receivable_net(&self, month: MonthRange) -> StoreResult<Option<Decimal>> {
        let tables = self.read()?;
        Ok(sum(tables
            .loans
            .values()
            .filter(|loan| !loan.settled && month.contains(&loan.due_date))
            .map(Loan::total_due)))
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn insert(&self, draft: PaymentDraft) -> StoreResult<Payment> {
        let mut tables = self.write()?;
        tables.require_loan(draft.loan_id)?;

        let now = Utc::now();
        let payment = Payment {
            id: tables.next_id(),
            loan_id: draft.loan_id,
            payment_date: draft.payment_date,
            amount: draft.amount.value(),
            payment_type: draft.payment_type,
            note: draft.note,
            created_at: now,
            updated_at: now,
        };
        tables.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn update(&self, mut payment: Payment) -> StoreResult<Payment> {
        let mut tables = self.write()?;
        tables.require_loan(payment.loan_id)?;

        let stored = tables
            .payments
            .get_mut(&payment.id)
            .ok_or(StoreError::RowNotFound(payment.id))?;
        payment.created_at = stored.created_at;
        payment.updated_at = Utc::now();
        *stored = payment.clone();
        Ok(payment)
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.write()?
            .payments
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RowNotFound(id))
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Payment>> {
        Ok(self.read()?.payments.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Payment>> {
        Ok(self.read()?.payments.values().cloned().collect())
    }

    async fn find_by_loan(&self, loan_id: i64) -> StoreResult<Vec<Payment>> {
        let tables = self.read()?;
        let mut payments: Vec<Payment> = tables
            .payments
            .values()
            .filter(|payment| payment.loan_id == loan_id)
            .cloned()
            .collect();
        payments.sort_by_key(|payment| (payment.payment_date, payment.id));
        Ok(payments)
    }

    async fn total_received_for_loan(&self, loan_id: i64) -> StoreResult<Option<Decimal>> {
        let tables = self.read()?;
        Ok(sum(tables
            .payments
            .values()
            .filter(|payment| payment.loan_id == loan_id)
            .map(|payment| payment.amount)))
    }

    async fn total_received(&self, month: MonthRange) -> StoreResult<Option<Decimal>> {
        let tables = self.read()?;
        Ok(sum(tables
            .payments
            .values()
            .filter(|payment| month.contains(&payment.payment_date))
            .map(|payment| payment.amount)))
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_login(&self, login: &str) -> StoreResult<Option<UserCredential>> {
        Ok(self.read()?.users.get(login).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{parse_date, Amount, PaymentType, Percentage};
    use rust_decimal_macros::dec;

    fn beneficiary(name: &str) -> BeneficiaryDraft {
        BeneficiaryDraft {
            name: name.to_string(),
            phone: "081988888888".to_string(),
            note: None,
        }
    }

    fn loan(beneficiary_id: i64, loan_date: &str, due_date: &str, principal: Decimal) -> LoanDraft {
        LoanDraft {
            beneficiary_id,
            loan_date: parse_date(loan_date).unwrap(),
            due_date: parse_date(due_date).unwrap(),
            principal: Amount::new(principal).unwrap(),
            percentage: Percentage::new(dec!(30)).unwrap(),
            settled: false,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let store = MemoryStore::new();
        let stored = BeneficiaryStore::insert(&store, beneficiary("Erick Marques")).await.unwrap();

        assert!(stored.id > 0);
        assert_eq!(stored.created_at, stored.updated_at);
        assert!(!stored.has_image);

        let found = BeneficiaryStore::find_by_id(&store, stored.id).await.unwrap();
        assert_eq!(found, Some(stored));
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let store = MemoryStore::new();
        let stored = BeneficiaryStore::insert(&store, beneficiary("Ana")).await.unwrap();

        let mut changed = stored.clone();
        changed.name = "Ana Maria".to_string();
        changed.created_at = Utc::now() + chrono::Duration::days(1);
        let updated = BeneficiaryStore::update(&store, changed).await.unwrap();

        assert_eq!(updated.name, "Ana Maria");
        assert_eq!(updated.created_at, stored.created_at);
        assert!(updated.updated_at >= stored.updated_at);
    }

    #[tokio::test]
    async fn test_loan_requires_existing_beneficiary() {
        let store = MemoryStore::new();
        let result = LoanStore::insert(&store, loan(99, "2024-01-10", "2024-02-10", dec!(100))).await;
        assert!(matches!(result, Err(StoreError::ForeignKeyViolation(_))));
    }

    #[tokio::test]
    async fn test_delete_referenced_beneficiary_fails() {
        let store = MemoryStore::new();
        let owner = BeneficiaryStore::insert(&store, beneficiary("Ana")).await.unwrap();
        LoanStore::insert(&store, loan(owner.id, "2024-01-10", "2024-02-10", dec!(100)))
            .await
            .unwrap();

        let result = BeneficiaryStore::delete(&store, owner.id).await;
        assert!(result.unwrap_err().is_foreign_key_violation());
    }

    #[tokio::test]
    async fn test_delete_missing_row() {
        let store = MemoryStore::new();
        let result = PaymentStore::delete(&store, 5).await;
        assert!(matches!(result, Err(StoreError::RowNotFound(5))));
    }

    #[tokio::test]
    async fn test_find_by_settled_orders_by_due_date() {
        let store = MemoryStore::new();
        let owner = BeneficiaryStore::insert(&store, beneficiary("Ana")).await.unwrap();
        let late = LoanStore::insert(&store, loan(owner.id, "2024-01-01", "2024-06-01", dec!(1)))
            .await
            .unwrap();
        let early = LoanStore::insert(&store, loan(owner.id, "2024-01-01", "2024-03-01", dec!(1)))
            .await
            .unwrap();

        let loans = store.find_by_settled(false).await.unwrap();
        let ids: Vec<i64> = loans.iter().map(|loan| loan.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
        assert!(store.find_by_settled(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payments_by_loan_and_totals() {
        let store = MemoryStore::new();
        let owner = BeneficiaryStore::insert(&store, beneficiary("Ana")).await.unwrap();
        let target = LoanStore::insert(&store, loan(owner.id, "2024-01-01", "2024-02-01", dec!(3000)))
            .await
            .unwrap();

        for (date, amount) in [("2024-02-20", dec!(2000)), ("2024-02-10", dec!(1000))] {
            PaymentStore::insert(
                &store,
                PaymentDraft {
                    loan_id: target.id,
                    payment_date: parse_date(date).unwrap(),
                    amount: Amount::new(amount).unwrap(),
                    payment_type: PaymentType::InterestOnly,
                    note: None,
                },
            )
            .await
            .unwrap();
        }

        let payments = store.find_by_loan(target.id).await.unwrap();
        assert_eq!(payments[0].amount, dec!(1000));
        assert_eq!(payments[1].amount, dec!(2000));

        assert_eq!(store.total_received_for_loan(target.id).await.unwrap(), Some(dec!(3000)));
        assert_eq!(store.total_received_for_loan(target.id + 100).await.unwrap(), None);

        let february = MonthRange::new(2024, 2).unwrap();
        let march = MonthRange::new(2024, 3).unwrap();
        assert_eq!(store.total_received(february).await.unwrap(), Some(dec!(3000)));
        assert_eq!(store.total_received(march).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_credentials_lookup() {
        let store = MemoryStore::new();
        let id = store.add_user("admin", "hash").unwrap();

        let found = store.find_by_login("admin").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(store.find_by_login("ADMIN").await.unwrap().is_none());
    }
}
