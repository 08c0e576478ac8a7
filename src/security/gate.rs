//! Natural-language security gate
//!
//! Screens the raw question before any LLM call.

use crate::security::policy::SecurityPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of a security screen. Produced by both the NL gate and the SQL guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityDecision {
    pub allowed: bool,
    pub violation: Option<String>,
}

impl SecurityDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            violation: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            violation: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityGate {
    policy: Arc<SecurityPolicy>,
}

impl SecurityGate {
    pub fn new(policy: Arc<SecurityPolicy>) -> Self {
        Self { policy }
    }

    /// Substring match against the NL denylist (first hit wins), then the length limit.
    pub fn check(&self, text: &str) -> SecurityDecision {
        let normalized = text.to_lowercase();

        if let Some(term) = self
            .policy
            .nl_denylist
            .iter()
            .find(|term| normalized.contains(term.as_str()))
        {
            return SecurityDecision::deny(format!(
                "Potentially dangerous content detected: '{}'",
                term
            ));
        }

        if normalized.chars().count() > self.policy.max_question_chars {
            return SecurityDecision::deny("Query is too long");
        }

        SecurityDecision::allow()
    }
}

impl Default for SecurityGate {
    fn default() -> Self {
        Self::new(Arc::new(SecurityPolicy::default()))
    }
}
