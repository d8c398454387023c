//! PostgreSQL store
//!
//! Raw SQL over a `PgPool`. Each write is a single statement, so the
//! foreign keys in the schema make "parent exists, then child is written"
//! atomic: a parent removed concurrently turns the write into a
//! foreign key violation instead of an orphan row.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{
    BeneficiaryStore, CredentialStore, LoanStore, PaymentStore, StoreError, StoreResult,
};
use crate::domain::{
    Beneficiary, BeneficiaryDraft, Loan, LoanDraft, MonthRange, Payment, PaymentDraft,
    PaymentType, UserCredential,
};

const BENEFICIARY_COLUMNS: &str =
    "id, name, phone, note, image IS NOT NULL AS has_image, created_at, updated_at";

const LOAN_COLUMNS: &str = "id, beneficiary_id, loan_date, due_date, principal, percentage, \
                            settled, note, created_at, updated_at";

const PAYMENT_COLUMNS: &str =
    "id, loan_id, payment_date, amount, payment_type, note, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct BeneficiaryRow {
    id: i64,
    name: String,
    phone: String,
    note: Option<String>,
    has_image: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BeneficiaryRow> for Beneficiary {
    fn from(row: BeneficiaryRow) -> Self {
        Beneficiary {
            id: row.id,
            name: row.name,
            phone: row.phone,
            note: row.note,
            has_image: row.has_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LoanRow {
    id: i64,
    beneficiary_id: i64,
    loan_date: NaiveDateTime,
    due_date: NaiveDateTime,
    principal: Decimal,
    percentage: Decimal,
    settled: bool,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LoanRow> for Loan {
    fn from(row: LoanRow) -> Self {
        Loan {
            id: row.id,
            beneficiary_id: row.beneficiary_id,
            loan_date: row.loan_date,
            due_date: row.due_date,
            principal: row.principal,
            percentage: row.percentage,
            settled: row.settled,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    loan_id: i64,
    payment_date: NaiveDateTime,
    amount: Decimal,
    payment_type: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let payment_type: PaymentType = row
            .payment_type
            .parse()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;

        Ok(Payment {
            id: row.id,
            loan_id: row.loan_id,
            payment_date: row.payment_date,
            amount: row.amount,
            payment_type,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn payments(rows: Vec<PaymentRow>) -> StoreResult<Vec<Payment>> {
    rows.into_iter().map(Payment::try_from).collect()
}

/// Store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn delete_row(&self, table: &str, id: i64) -> StoreResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound(id));
        }
        Ok(())
    }

    async fn sum(&self, sql: &str, month: MonthRange) -> StoreResult<Option<Decimal>> {
        let total: Option<Decimal> = sqlx::query_scalar(sql)
            .bind(month.start)
            .bind(month.end)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

#[async_trait]
impl BeneficiaryStore for PgStore {
    async fn insert(&self, draft: BeneficiaryDraft) -> StoreResult<Beneficiary> {
        let row: BeneficiaryRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO beneficiaries (name, phone, note, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING {BENEFICIARY_COLUMNS}
            "#
        ))
        .bind(&draft.name)
        .bind(&draft.phone)
        .bind(&draft.note)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(&self, beneficiary: Beneficiary) -> StoreResult<Beneficiary> {
        let row: Option<BeneficiaryRow> = sqlx::query_as(&format!(
            r#"
            UPDATE beneficiaries
            SET name = $2, phone = $3, note = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {BENEFICIARY_COLUMNS}
            "#
        ))
        .bind(beneficiary.id)
        .bind(&beneficiary.name)
        .bind(&beneficiary.phone)
        .bind(&beneficiary.note)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Beneficiary::from)
            .ok_or(StoreError::RowNotFound(beneficiary.id))
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.delete_row("beneficiaries", id).await
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Beneficiary>> {
        let row: Option<BeneficiaryRow> = sqlx::query_as(&format!(
            "SELECT {BENEFICIARY_COLUMNS} FROM beneficiaries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Beneficiary::from))
    }

    async fn find_all(&self) -> StoreResult<Vec<Beneficiary>> {
        let rows: Vec<BeneficiaryRow> = sqlx::query_as(&format!(
            "SELECT {BENEFICIARY_COLUMNS} FROM beneficiaries ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Beneficiary::from).collect())
    }

    async fn search_by_name(&self, fragment: &str) -> StoreResult<Vec<Beneficiary>> {
        // strpos instead of ILIKE so '%' and '_' in the fragment match literally
        let rows: Vec<BeneficiaryRow> = sqlx::query_as(&format!(
            r#"
            SELECT {BENEFICIARY_COLUMNS}
            FROM beneficiaries
            WHERE strpos(lower(name), lower($1)) > 0
            ORDER BY id
            "#
        ))
        .bind(fragment)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Beneficiary::from).collect())
    }

    async fn save_image(&self, id: i64, image: Vec<u8>) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE beneficiaries SET image = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(image)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound(id));
        }
        Ok(())
    }

    async fn load_image(&self, id: i64) -> StoreResult<Option<Vec<u8>>> {
        let image: Option<Option<Vec<u8>>> =
            sqlx::query_scalar("SELECT image FROM beneficiaries WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(image.flatten())
    }
}

#[async_trait]
impl LoanStore for PgStore {
    async fn insert(&self, draft: LoanDraft) -> StoreResult<Loan> {
        let row: LoanRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO loans
                (beneficiary_id, loan_date, due_date, principal, percentage, settled, note,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(draft.beneficiary_id)
        .bind(draft.loan_date)
        .bind(draft.due_date)
        .bind(draft.principal.value())
        .bind(draft.percentage.value())
        .bind(draft.settled)
        .bind(&draft.note)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(&self, loan: Loan) -> StoreResult<Loan> {
        let row: Option<LoanRow> = sqlx::query_as(&format!(
            r#"
            UPDATE loans
            SET beneficiary_id = $2, loan_date = $3, due_date = $4, principal = $5,
                percentage = $6, settled = $7, note = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(loan.id)
        .bind(loan.beneficiary_id)
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .bind(loan.principal)
        .bind(loan.percentage)
        .bind(loan.settled)
        .bind(&loan.note)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Loan::from).ok_or(StoreError::RowNotFound(loan.id))
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.delete_row("loans", id).await
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Loan>> {
        let row: Option<LoanRow> =
            sqlx::query_as(&format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Loan::from))
    }

    async fn find_all(&self) -> StoreResult<Vec<Loan>> {
        let rows: Vec<LoanRow> =
            sqlx::query_as(&format!("SELECT {LOAN_COLUMNS} FROM loans ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Loan::from).collect())
    }

    async fn find_by_beneficiary(&self, beneficiary_id: i64) -> StoreResult<Vec<Loan>> {
        let rows: Vec<LoanRow> = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE beneficiary_id = $1 ORDER BY id"
        ))
        .bind(beneficiary_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Loan::from).collect())
    }

    async fn find_overdue(&self, date: NaiveDateTime) -> StoreResult<Vec<Loan>> {
        let rows: Vec<LoanRow> = sqlx::query_as(&format!(
            r#"
            SELECT {LOAN_COLUMNS}
            FROM loans
            WHERE due_date < $1 AND settled = false
            ORDER BY due_date, id
            "#
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Loan::from).collect())
    }

    async fn find_by_settled(&self, settled: bool) -> StoreResult<Vec<Loan>> {
        let rows: Vec<LoanRow> = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE settled = $1 ORDER BY due_date ASC, id"
        ))
        .bind(settled)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Loan::from).collect())
    }

    async fn total_lent(&self, month: MonthRange) -> StoreResult<Option<Decimal>> {
        self.sum(
            r#"
            SELECT SUM(principal)
            FROM loans
            WHERE loan_date >= $1 AND loan_date < $2
            "#,
            month,
        )
        .await
    }

    async fn total_receivable_gross(&self, month: MonthRange) -> StoreResult<Option<Decimal>> {
        self.sum(
            r#"
            SELECT SUM(principal * percentage / 100)
            FROM loans
            WHERE due_date >= $1 AND due_date < $2 AND settled = false
            "#,
            month,
        )
        .await
    }

    async fn total_receivable_net(&self, month: MonthRange) -> StoreResult<Option<Decimal>> {
        self.sum(
            r#"
            SELECT SUM(principal + principal * percentage / 100)
            FROM loans
            WHERE due_date >= $1 AND due_date < $2 AND settled = false
            "#,
            month,
        )
        .await
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn insert(&self, draft: PaymentDraft) -> StoreResult<Payment> {
        let row: PaymentRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO payments
                (loan_id, payment_date, amount, payment_type, note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(draft.loan_id)
        .bind(draft.payment_date)
        .bind(draft.amount.value())
        .bind(draft.payment_type.as_str())
        .bind(&draft.note)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn update(&self, payment: Payment) -> StoreResult<Payment> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            r#"
            UPDATE payments
            SET loan_id = $2, payment_date = $3, amount = $4, payment_type = $5, note = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment.id)
        .bind(payment.loan_id)
        .bind(payment.payment_date)
        .bind(payment.amount)
        .bind(payment.payment_type.as_str())
        .bind(&payment.note)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::RowNotFound(payment.id))?.try_into()
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.delete_row("payments", id).await
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Payment>> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_all(&self) -> StoreResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> =
            sqlx::query_as(&format!("SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        payments(rows)
    }

    async fn find_by_loan(&self, loan_id: i64) -> StoreResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE loan_id = $1
            ORDER BY payment_date ASC, id
            "#
        ))
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;

        payments(rows)
    }

    async fn total_received_for_loan(&self, loan_id: i64) -> StoreResult<Option<Decimal>> {
        let total: Option<Decimal> =
            sqlx::query_scalar("SELECT SUM(amount) FROM payments WHERE loan_id = $1")
                .bind(loan_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }

    async fn total_received(&self, month: MonthRange) -> StoreResult<Option<Decimal>> {
        self.sum(
            r#"
            SELECT SUM(amount)
            FROM payments
            WHERE payment_date >= $1 AND payment_date < $2
            "#,
            month,
        )
        .await
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_login(&self, login: &str) -> StoreResult<Option<UserCredential>> {
        let row: Option<(i64, String, String)> =
            sqlx::query_as("SELECT id, login, password_hash FROM users WHERE login = $1")
                .bind(login)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, login, password_hash)| UserCredential {
            id,
            login,
            password_hash,
        }))
    }
}
