use crate::db::models::{DbSession, DbUser};
use crate::db::schema::SQLITE_INIT;
use crate::error::MazeError;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

pub type SqlitePool = Pool<Sqlite>;

/// Persistence for accounts, vaults, entries and billing rows.
///
/// Query groups live in sibling modules (`vaults`, `billing`, `scans`) as
/// further `impl VaultStorage` blocks.
#[derive(Clone)]
pub struct VaultStorage {
    pool: SqlitePool,
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

impl VaultStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database and apply the schema.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, MazeError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(connect_opts)
            .await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        info!(database_url = %database_url, "database ready");
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), MazeError> {
        // sqlx::query runs a single statement; split the bundle.
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), MazeError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Insert a new account on the free plan. Duplicate email maps to `Conflict`.
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<DbUser, MazeError> {
        let id = new_id();
        let now = Utc::now();
        sqlx::query(
            r#"INSERT INTO users (id, email, password_hash, subscription_plan,
                   subscription_status, failed_attempts, created_at)
               VALUES (?, ?, ?, 'free', 'active', 0, ?)"#,
        )
        .bind(&id)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                MazeError::Conflict("User already exists".to_string())
            } else {
                e.into()
            }
        })?;

        self.get_user(&id)
            .await?
            .ok_or(MazeError::NotFound("User"))
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<DbUser>, MazeError> {
        let user = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Case-insensitive lookup (the column is `COLLATE NOCASE`).
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<DbUser>, MazeError> {
        let user = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Count a failed login. Once `max_attempts` is reached the account is
    /// locked for `lockout` and the counter starts over. Returns the lock
    /// deadline when this call locked the account.
    pub async fn record_failed_login(
        &self,
        id: &str,
        max_attempts: i64,
        lockout: Duration,
    ) -> Result<Option<DateTime<Utc>>, MazeError> {
        let mut tx = self.pool.begin().await?;
        let (attempts,): (i64,) = sqlx::query_as(
            "UPDATE users SET failed_attempts = failed_attempts + 1 WHERE id = ? RETURNING failed_attempts",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let locked_until = if attempts >= max_attempts.max(1) {
            let until = Utc::now() + lockout;
            sqlx::query("UPDATE users SET failed_attempts = 0, locked_until = ? WHERE id = ?")
                .bind(until)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Some(until)
        } else {
            None
        };
        tx.commit().await?;
        Ok(locked_until)
    }

    pub async fn record_successful_login(&self, id: &str) -> Result<(), MazeError> {
        sqlx::query(
            "UPDATE users SET failed_attempts = 0, locked_until = NULL, last_login = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Store a new session and drop the user's expired ones.
    pub async fn create_session(
        &self,
        user_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), MazeError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let pruned = sqlx::query("DELETE FROM sessions WHERE user_id = ? AND expires_at <= ?")
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        if pruned > 0 {
            debug!(user_id = %user_id, pruned, "removed expired sessions");
        }
        Ok(())
    }

    pub async fn get_session(&self, token_hash: &str) -> Result<Option<DbSession>, MazeError> {
        let session =
            sqlx::query_as::<_, DbSession>("SELECT * FROM sessions WHERE token_hash = ?")
                .bind(token_hash)
                .fetch_optional(&self.pool)
                .await?;
        Ok(session)
    }

    pub async fn delete_session(&self, token_hash: &str) -> Result<(), MazeError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
