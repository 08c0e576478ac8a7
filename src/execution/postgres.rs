//! PostgreSQL query backend using sqlx
//!
//! Each statement runs in its own read-only transaction with a statement timeout and
//! is always rolled back. Rows are fetched as `row_to_json` so column order and names
//! survive without per-type decoding.

use crate::config::DatabaseConfig;
use crate::error::{AgentError, Result};
use crate::execution::executor::QueryBackend;
use crate::execution::value::{RawResultSet, RawRow};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::debug;

/// Initialize the database connection pool
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

pub struct PgQueryBackend {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgQueryBackend {
    pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = init_pool(config).await?;
        Ok(Self::new(pool, config.statement_timeout))
    }
}

#[async_trait]
impl QueryBackend for PgQueryBackend {
    async fn execute_select(&self, sql: &str) -> Result<RawResultSet> {
        let wrapped = wrap_as_json_rows(sql);
        debug!("Wrapped SQL: {}", wrapped);

        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;

        let fetched: std::result::Result<Vec<(serde_json::Value,)>, sqlx::Error> =
            sqlx::query_as(&wrapped).fetch_all(&mut *tx).await;
        tx.rollback().await?;

        fetched?
            .into_iter()
            .map(|(value,)| {
                RawRow::from_json_object(value).ok_or_else(|| {
                    AgentError::Database("row_to_json returned a non-object row".to_string())
                })
            })
            .collect()
    }
}

/// `SELECT row_to_json(q) FROM (<sql>) AS q`, with any trailing semicolons removed.
/// The body sits on its own lines so a trailing `--` comment cannot swallow `) AS q`.
pub fn wrap_as_json_rows(sql: &str) -> String {
    let body = sql.trim().trim_end_matches(';').trim_end();
    format!("SELECT row_to_json(q) FROM (\n{}\n) AS q", body)
}
