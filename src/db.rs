//! Database module
//!
//! Connection and schema checks. The schema itself lives in
//! `migrations/` and is applied by the operator.

use sqlx::PgPool;

/// Tables the PostgreSQL store reads and writes
const REQUIRED_TABLES: [&str; 4] = ["users", "beneficiaries", "loans", "payments"];

/// Verify database connectivity
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if users == 0 {
        tracing::warn!("No users found; seed one with the hash_password binary before logging in");
    }

    Ok(true)
}
