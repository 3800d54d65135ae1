//! PostgreSQL account store backed by a `sqlx` pool.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Connection, PgPool, Row,
};
use std::time::Duration;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{Account, AccountChanges, AccountStore, NewAccount, StoreError};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const ACCOUNT_COLUMNS: &str =
    "id, email, password, name, is_active, is_staff, is_superuser";

const EMAIL_UNIQUE_CONSTRAINT: &str = "accounts_email_key";

#[derive(Clone, Debug)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool against `dsn`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be reached.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    /// Create the account and token tables if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error if any schema statement fails.
    pub async fn apply_schema(&self) -> Result<()> {
        for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }

        Ok(())
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        if account.email.is_empty() {
            return Err(StoreError::EmptyEmail);
        }

        let query = format!(
            "INSERT INTO accounts (id, email, password, name) VALUES ($1, $2, $3, $4) RETURNING {ACCOUNT_COLUMNS}"
        );
        let span = db_span("INSERT", &query);
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.name)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(map_unique_email)?;

        Ok(account_from_row(&row)?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        let span = db_span("SELECT", &query);
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        let query = "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2)) AS taken";
        let span = db_span("SELECT", query);
        let row = sqlx::query(query)
            .bind(email)
            .bind(exclude)
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.try_get("taken")?)
    }

    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, StoreError> {
        if changes.email.as_deref().is_some_and(str::is_empty) {
            return Err(StoreError::EmptyEmail);
        }

        let query = format!(
            r"
            UPDATE accounts
            SET
                email = COALESCE($1, email),
                name = COALESCE($2, name),
                password = COALESCE($3, password),
                updated_at = NOW()
            WHERE id = $4
            RETURNING {ACCOUNT_COLUMNS}
            "
        );
        let span = db_span("UPDATE", &query);
        let row = sqlx::query(&query)
            .bind(changes.email)
            .bind(changes.name)
            .bind(changes.password_hash)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(map_unique_email)?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn set_privileges(
        &self,
        id: Uuid,
        is_staff: bool,
        is_superuser: bool,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "UPDATE accounts SET is_staff = $1, is_superuser = $2, updated_at = NOW() WHERE id = $3 RETURNING {ACCOUNT_COLUMNS}"
        );
        let span = db_span("UPDATE", &query);
        let row = sqlx::query(&query)
            .bind(is_staff)
            .bind(is_superuser)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn get_or_create_token(
        &self,
        account_id: Uuid,
        candidate: &str,
    ) -> Result<String, StoreError> {
        // The unique account_id constraint keeps concurrent logins on one token.
        let insert = "INSERT INTO auth_tokens (key, account_id) VALUES ($1, $2) ON CONFLICT (account_id) DO NOTHING";
        let span = db_span("INSERT", insert);
        sqlx::query(insert)
            .bind(candidate)
            .bind(account_id)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        let select = "SELECT key FROM auth_tokens WHERE account_id = $1";
        let span = db_span("SELECT", select);
        let row = sqlx::query(select)
            .bind(account_id)
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.try_get("key")?)
    }

    async fn find_token_owner(&self, key: &str) -> Result<Option<Account>, StoreError> {
        let query = r"
            SELECT a.id, a.email, a.password, a.name, a.is_active, a.is_staff, a.is_superuser
            FROM auth_tokens t
            JOIN accounts a ON a.id = t.account_id
            WHERE t.key = $1
        ";
        let span = db_span("SELECT", query);
        let row = sqlx::query(query)
            .bind(key)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }
}

fn db_span(operation: &str, statement: &str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    Ok(Account {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password")?,
        name: row.try_get("name")?,
        is_active: row.try_get("is_active")?,
        is_staff: row.try_get("is_staff")?,
        is_superuser: row.try_get("is_superuser")?,
    })
}

fn map_unique_email(err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err, EMAIL_UNIQUE_CONSTRAINT) {
        StoreError::DuplicateEmail
    } else {
        StoreError::Database(err)
    }
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().is_some_and(|code| code.as_ref() == "23505")
                && db_err.constraint().map_or(true, |name| name == constraint)
        }
        _ => false,
    }
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}
