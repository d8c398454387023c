//! Password hashing tool
//!
//! Prints an Argon2id hash for the `users.password_hash` column.
//!
//! Run with: cargo run --bin hash_password -- <password>

use loan_tracker::auth::hash_password;

fn main() -> anyhow::Result<()> {
    let password = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: hash_password <password>"))?;

    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }

    println!("{}", hash_password(&password)?);
    Ok(())
}
