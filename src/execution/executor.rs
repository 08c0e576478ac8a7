//! Query Executor
//!
//! Runs a sanitized SELECT through a [`QueryBackend`] and never fails:
//! backend errors come back as a single synthetic error row.

use crate::error::Result;
use crate::execution::value::{RawResultSet, RawRow};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

pub const EXECUTION_FAILED: &str = "Query execution failed";

/// Relational store capability: run one ad hoc read-only statement.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn execute_select(&self, sql: &str) -> Result<RawResultSet>;
}

#[derive(Clone)]
pub struct QueryExecutor {
    backend: Arc<dyn QueryBackend>,
}

impl QueryExecutor {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self { backend }
    }

    pub async fn execute(&self, sql: &str) -> RawResultSet {
        info!("Executing SQL: {}", sql);
        match self.backend.execute_select(sql).await {
            Ok(rows) => {
                info!("Query returned {} rows", rows.len());
                rows
            }
            Err(e) => {
                error!("Error executing SQL: {} - {}", sql, e);
                vec![error_row(&e.to_string())]
            }
        }
    }
}

/// `{error: "Query execution failed", details: <message>}`
pub fn error_row(details: &str) -> RawRow {
    RawRow::from_pairs(vec![("error", EXECUTION_FAILED), ("details", details)])
}

pub fn is_error_row(row: &RawRow) -> bool {
    row.get("error")
        .map(|v| v.as_text() == EXECUTION_FAILED)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::execution::value::ScalarValue;

    struct FailingBackend;

    #[async_trait]
    impl QueryBackend for FailingBackend {
        async fn execute_select(&self, _sql: &str) -> Result<RawResultSet> {
            Err(AgentError::Database("connection refused".to_string()))
        }
    }

    struct FixedBackend(RawResultSet);

    #[async_trait]
    impl QueryBackend for FixedBackend {
        async fn execute_select(&self, _sql: &str) -> Result<RawResultSet> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_error_row() {
        let executor = QueryExecutor::new(Arc::new(FailingBackend));
        let rows = executor.execute("SELECT 1").await;

        assert_eq!(rows.len(), 1);
        let names: Vec<&str> = rows[0].column_names().collect();
        assert_eq!(names, vec!["error", "details"]);
        assert_eq!(rows[0].get("error"), Some(&ScalarValue::from(EXECUTION_FAILED)));
        assert_eq!(
            rows[0].get("details"),
            Some(&ScalarValue::from("Database error: connection refused"))
        );
        assert!(is_error_row(&rows[0]));
    }

    #[tokio::test]
    async fn test_rows_pass_through_in_order() {
        let rows = vec![
            RawRow::from_pairs(vec![("Address", "1 Elm St")]),
            RawRow::from_pairs(vec![("Address", "9 Oak Ave")]),
        ];
        let executor = QueryExecutor::new(Arc::new(FixedBackend(rows.clone())));
        assert_eq!(executor.execute("SELECT Address FROM Properties").await, rows);
    }

    #[tokio::test]
    async fn test_empty_result() {
        let executor = QueryExecutor::new(Arc::new(FixedBackend(Vec::new())));
        assert!(executor.execute("SELECT 1").await.is_empty());
    }
}
