#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tax_query_agent::error::{AgentError, Result};
use tax_query_agent::execution::{QueryBackend, RawResultSet, RawRow, ScalarValue};
use tax_query_agent::llm::{CompletionClient, CompletionRequest};
use tax_query_agent::observability::{AuditEvent, AuditSink};
use tax_query_agent::schema::SchemaCatalog;
use tax_query_agent::QueryAgent;
use tokio_util::sync::CancellationToken;

/// Replies in order; fails once the script runs out.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from(vec![Err(AgentError::Llm(message.to_string()))])),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::Llm("no scripted reply".to_string())))
    }
}

pub enum BackendBehavior {
    Rows(RawResultSet),
    Fail(String),
    /// Return rows, but cancel the token first.
    CancelAfter(RawResultSet, CancellationToken),
}

pub struct FakeBackend {
    behavior: BackendBehavior,
    pub executed: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(behavior: BackendBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            executed: Mutex::new(Vec::new()),
        })
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryBackend for FakeBackend {
    async fn execute_select(&self, sql: &str) -> Result<RawResultSet> {
        self.executed.lock().unwrap().push(sql.to_string());
        match &self.behavior {
            BackendBehavior::Rows(rows) => Ok(rows.clone()),
            BackendBehavior::Fail(message) => Err(AgentError::Database(message.clone())),
            BackendBehavior::CancelAfter(rows, token) => {
                token.cancel();
                Ok(rows.clone())
            }
        }
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    pub events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAudit {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn agent(
    llm: Arc<ScriptedLlm>,
    backend: Arc<FakeBackend>,
    audit: Arc<RecordingAudit>,
) -> QueryAgent {
    QueryAgent::new(
        llm,
        backend,
        Arc::new(SchemaCatalog::tax_default()),
        audit,
    )
}

pub fn property_rows() -> RawResultSet {
    vec![
        RawRow::from_pairs(vec![
            ("Address", ScalarValue::from("12 Elm St")),
            ("PropertyType", ScalarValue::from("Primary Residence")),
            ("CurrentValue", ScalarValue::from(450000.0)),
            ("MortgageBalance", ScalarValue::from(210000.0)),
        ]),
        RawRow::from_pairs(vec![
            ("Address", ScalarValue::from("7 Pine Rd")),
            ("PropertyType", ScalarValue::from("Rental Property")),
            ("CurrentValue", ScalarValue::from(310000.0)),
            ("MortgageBalance", ScalarValue::from(95000.0)),
        ]),
    ]
}
