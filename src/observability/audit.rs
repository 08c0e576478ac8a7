//! Audit Logger
//!
//! Side-effect-only record of security violations and query executions. Events go
//! to the `audit` tracing target, an optional JSON-lines file and a bounded
//! in-memory ring. Failures here are logged and swallowed.

use crate::config::AuditConfig;
use crate::error::{AgentError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_IN_MEMORY_EVENTS: usize = 1000;
pub const VIOLATION_SEVERITY: &str = "HIGH";
pub const UNKNOWN_TAXPAYER: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all_fields = "camelCase")]
pub enum AuditEvent {
    SecurityViolation {
        timestamp: DateTime<Utc>,
        violation: String,
        user_query: String,
        sql_query: Option<String>,
        taxpayer_id: Option<String>,
        session_id: Option<String>,
        severity: String,
    },
    QueryExecution {
        timestamp: DateTime<Utc>,
        user_query: String,
        sql_query: String,
        taxpayer_id: String,
        session_id: String,
        success: bool,
        result_count: usize,
    },
}

impl AuditEvent {
    pub fn security_violation(
        violation: &str,
        user_query: &str,
        sql_query: Option<&str>,
        taxpayer_id: Option<Uuid>,
        session_id: Option<Uuid>,
    ) -> Self {
        AuditEvent::SecurityViolation {
            timestamp: Utc::now(),
            violation: violation.to_string(),
            user_query: user_query.to_string(),
            sql_query: sql_query.map(str::to_string),
            taxpayer_id: taxpayer_id.map(|id| id.to_string()),
            session_id: session_id.map(|id| id.to_string()),
            severity: VIOLATION_SEVERITY.to_string(),
        }
    }

    /// A missing taxpayer is recorded as `"unknown"`.
    pub fn query_execution(
        user_query: &str,
        sql_query: &str,
        taxpayer_id: Option<Uuid>,
        session_id: Uuid,
        success: bool,
        result_count: usize,
    ) -> Self {
        AuditEvent::QueryExecution {
            timestamp: Utc::now(),
            user_query: user_query.to_string(),
            sql_query: sql_query.to_string(),
            taxpayer_id: taxpayer_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| UNKNOWN_TAXPAYER.to_string()),
            session_id: session_id.to_string(),
            success,
            result_count,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AuditEvent::SecurityViolation { .. } => "SecurityViolation",
            AuditEvent::QueryExecution { .. } => "QueryExecution",
        }
    }
}

/// Audit sink capability. Must be safe for concurrent use and must not fail the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

pub struct AuditLogger {
    log_file: Option<PathBuf>,
    /// Opened on first use and kept; dropped after a write error so the next event reopens it.
    writer: Mutex<Option<LineWriter<File>>>,
    events: Mutex<VecDeque<AuditEvent>>,
    max_in_memory_events: usize,
}

impl AuditLogger {
    pub fn new(log_file: Option<PathBuf>, max_in_memory_events: usize) -> Self {
        Self {
            log_file,
            writer: Mutex::new(None),
            events: Mutex::new(VecDeque::new()),
            max_in_memory_events,
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.log_path.clone(), DEFAULT_MAX_IN_MEMORY_EVENTS)
    }

    /// Most recent events, oldest first.
    pub fn recent_events(&self, limit: usize) -> Vec<AuditEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let skip = events.len().saturating_sub(limit);
        events.iter().skip(skip).cloned().collect()
    }

    fn remember(&self, event: AuditEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push_back(event);
        while events.len() > self.max_in_memory_events {
            events.pop_front();
        }
    }

    fn append_to_file(&self, json: &str) -> Result<()> {
        let Some(ref log_file) = self.log_file else {
            return Ok(());
        };

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .map_err(|e| AgentError::Audit(format!("Failed to open audit log: {}", e)))?;
            *writer = Some(LineWriter::new(file));
        }

        let written = match writer.as_mut() {
            Some(line_writer) => writeln!(line_writer, "{}", json),
            None => Ok(()),
        };
        if let Err(e) = written {
            *writer = None;
            return Err(AgentError::Audit(format!("Failed to write audit log: {}", e)));
        }
        Ok(())
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(None, DEFAULT_MAX_IN_MEMORY_EVENTS)
    }
}

impl AuditSink for AuditLogger {
    fn record(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => {
                match &event {
                    AuditEvent::SecurityViolation { .. } => {
                        warn!(target: "audit", event = %json, "SECURITY_AUDIT: {}", event.kind())
                    }
                    AuditEvent::QueryExecution { .. } => {
                        info!(target: "audit", event = %json, "QUERY_AUDIT: {}", event.kind())
                    }
                }
                if let Err(e) = self.append_to_file(&json) {
                    error!("{}", e);
                }
            }
            Err(e) => error!("Failed to serialize audit event: {}", e),
        }
        self.remember(event);
    }
}
