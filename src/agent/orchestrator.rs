//! Query Agent
//!
//! Drives one question through the pipeline:
//!
//! ```text
//! SecurityCheck -> Denied
//!               -> SqlGen -> Informational -> ComposeCapabilities
//!                         -> Sanitize -> Blocked
//!                                     -> Execute -> Classify -> Structure -> Compose
//! ```
//!
//! Expected denials are outcomes, not errors. Executor failures are absorbed into an
//! error row. Anything else is caught once in [`QueryAgent::process_with_cancel`].

use crate::agent::contracts::{elapsed_ms, QueryRequest, QueryResponse};
use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::execution::{PgQueryBackend, QueryBackend, QueryExecutor, RawResultSet};
use crate::llm::{CompletionClient, LlmClient};
use crate::observability::{AuditEvent, AuditLogger, AuditSink};
use crate::response::{confidence_score, ResponseComposer, INFORMATIONAL_CONFIDENCE};
use crate::schema::SchemaCatalog;
use crate::security::{SecurityGate, SecurityPolicy, SqlSanitizer};
use crate::sql_generator::{GeneratedSql, SqlGenerator};
use crate::structuring::StructuredQueryResult;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Terminal states of a request that did not fail unexpectedly.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Denied {
        violation: String,
    },
    Blocked {
        sql: String,
        violation: String,
    },
    Informational {
        answer: String,
    },
    Answered {
        answer: String,
        sql: String,
        rows: RawResultSet,
        confidence: f64,
    },
}

impl PipelineOutcome {
    pub fn into_response(self, started: Instant) -> QueryResponse {
        match self {
            PipelineOutcome::Denied { violation } | PipelineOutcome::Blocked { violation, .. } => {
                QueryResponse::refusal(violation, started)
            }
            PipelineOutcome::Informational { answer } => QueryResponse {
                answer_text: answer,
                sql: None,
                data: Some(Vec::new()),
                confidence: Some(INFORMATIONAL_CONFIDENCE),
                execution_time_ms: Some(elapsed_ms(started)),
                error_message: None,
                timestamp: Utc::now(),
            },
            PipelineOutcome::Answered {
                answer,
                sql,
                rows,
                confidence,
            } => QueryResponse {
                answer_text: answer,
                sql: Some(sql),
                data: Some(rows),
                confidence: Some(confidence),
                execution_time_ms: Some(elapsed_ms(started)),
                error_message: None,
                timestamp: Utc::now(),
            },
        }
    }
}

pub struct QueryAgent {
    gate: SecurityGate,
    generator: SqlGenerator,
    sanitizer: SqlSanitizer,
    executor: QueryExecutor,
    composer: ResponseComposer,
    audit: Arc<dyn AuditSink>,
    record_blocked_sql: bool,
}

impl QueryAgent {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        backend: Arc<dyn QueryBackend>,
        catalog: Arc<SchemaCatalog>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self::with_policy(llm, backend, catalog, audit, Arc::new(SecurityPolicy::default()))
    }

    pub fn with_policy(
        llm: Arc<dyn CompletionClient>,
        backend: Arc<dyn QueryBackend>,
        catalog: Arc<SchemaCatalog>,
        audit: Arc<dyn AuditSink>,
        policy: Arc<SecurityPolicy>,
    ) -> Self {
        Self {
            gate: SecurityGate::new(policy.clone()),
            generator: SqlGenerator::new(llm.clone(), catalog.clone(), policy.clone()),
            sanitizer: SqlSanitizer::new(policy),
            executor: QueryExecutor::new(backend),
            composer: ResponseComposer::new(llm, catalog),
            audit,
            record_blocked_sql: false,
        }
    }

    /// Also record a `SecurityViolation` when generated SQL is blocked.
    pub fn record_blocked_sql(mut self, enabled: bool) -> Self {
        self.record_blocked_sql = enabled;
        self
    }

    /// Wire the production collaborators: HTTP completion client, Postgres backend,
    /// catalog file (or the built-in tax catalog) and the audit logger.
    pub async fn from_config(config: &AgentConfig, audit: Arc<AuditLogger>) -> Result<Self> {
        let catalog = match &config.schema_catalog_path {
            Some(path) => SchemaCatalog::load(path)?,
            None => SchemaCatalog::tax_default(),
        };
        let llm = LlmClient::new(config.llm.clone())?;
        let backend = PgQueryBackend::connect(&config.database).await?;
        info!(
            "Agent ready: {} tables, model {}",
            catalog.tables.len(),
            config.llm.model
        );

        Ok(Self::new(Arc::new(llm), Arc::new(backend), Arc::new(catalog), audit)
            .record_blocked_sql(config.audit.record_blocked_sql))
    }

    pub async fn process(&self, request: &QueryRequest) -> QueryResponse {
        self.process_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Never fails: every path ends in a [`QueryResponse`].
    pub async fn process_with_cancel(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> QueryResponse {
        let started = Instant::now();
        info!("Processing query: {}", request.question);

        match self.run(request, cancel).await {
            Ok(outcome) => outcome.into_response(started),
            Err(AgentError::Cancelled) => {
                warn!("Query cancelled: {}", request.question);
                QueryResponse::error(AgentError::Cancelled.to_string(), started)
            }
            Err(e) => {
                error!("Error processing query: {} - {}", request.question, e);
                QueryResponse::error(e.to_string(), started)
            }
        }
    }

    /// Run the pipeline up to a terminal state.
    pub async fn run(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome> {
        let question = request.question.as_str();

        let decision = self.gate.check(question);
        if !decision.allowed {
            let violation = decision.violation.unwrap_or_default();
            warn!("Question denied: {}", violation);
            self.audit.record(AuditEvent::security_violation(
                &violation,
                question,
                None,
                request.taxpayer_id,
                Some(request.session_id),
            ));
            return Ok(PipelineOutcome::Denied { violation });
        }

        let reply = until_cancelled(cancel, self.generator.generate(question, request.taxpayer_id))
            .await?;

        let candidate = match GeneratedSql::from_reply(&reply) {
            GeneratedSql::NoQuery => {
                info!("No query needed, answering from capabilities");
                let answer =
                    until_cancelled(cancel, self.composer.compose_capabilities(question)).await?;
                return Ok(PipelineOutcome::Informational { answer });
            }
            GeneratedSql::Statement(sql) => sql,
        };

        let sql = match self.sanitizer.sanitize(&candidate) {
            Ok(sql) => sql,
            Err(decision) => {
                let violation = decision.violation.unwrap_or_default();
                if self.record_blocked_sql {
                    self.audit.record(AuditEvent::security_violation(
                        &violation,
                        question,
                        Some(&candidate),
                        request.taxpayer_id,
                        Some(request.session_id),
                    ));
                }
                return Ok(PipelineOutcome::Blocked {
                    sql: candidate,
                    violation,
                });
            }
        };

        if let Some(id) = request.taxpayer_id {
            if !sql.to_lowercase().contains(&id.to_string()) {
                warn!("SQL for taxpayer {} does not filter by TaxpayerId: {}", id, sql);
            }
        }

        let rows = until_cancelled(cancel, async { Ok(self.executor.execute(&sql).await) }).await?;
        self.audit.record(AuditEvent::query_execution(
            question,
            &sql,
            request.taxpayer_id,
            request.session_id,
            true,
            rows.len(),
        ));

        let confidence = confidence_score(rows.len());
        let structured = StructuredQueryResult::build(&sql, rows, question);
        let answer = until_cancelled(cancel, self.composer.compose(question, &structured)).await?;

        Ok(PipelineOutcome::Answered {
            answer,
            sql,
            rows: structured.raw_rows,
            confidence,
        })
    }
}

/// Resolve `stage` unless the token fires first. An already-cancelled token
/// means the stage is never started.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    stage: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AgentError::Cancelled),
        result = stage => result,
    }
}
