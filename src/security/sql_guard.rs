//! SQL guard
//!
//! Repairs reserved table aliases in generated SQL, then re-validates that the
//! statement is a single read-only SELECT.

use crate::security::gate::SecurityDecision;
use crate::security::policy::SecurityPolicy;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SqlSanitizer {
    policy: Arc<SecurityPolicy>,
    substitutions: Vec<(String, String)>,
}

impl SqlSanitizer {
    pub fn new(policy: Arc<SecurityPolicy>) -> Self {
        let substitutions = policy.alias_substitutions();
        Self {
            policy,
            substitutions,
        }
    }

    /// Apply the ordered alias substitutions. Plain text replacement, not a parser:
    /// a pattern only matches when the reserved alias ends at a word boundary.
    pub fn repair(&self, sql: &str) -> String {
        let mut repaired = sql.to_string();
        for (pattern, replacement) in &self.substitutions {
            repaired = replace_whole_alias(&repaired, pattern, replacement);
        }

        if repaired != sql {
            info!("SQL alias repair - original: {}, repaired: {}", sql, repaired);
        }
        repaired
    }

    /// Statement must start with SELECT and contain no mutating keyword anywhere,
    /// string literals included.
    pub fn check(&self, sql: &str) -> SecurityDecision {
        let upper = sql.to_uppercase();

        if !upper.trim_start().starts_with("SELECT") {
            return SecurityDecision::deny("Only SELECT statements are allowed");
        }

        if let Some(keyword) = self
            .policy
            .sql_denylist
            .iter()
            .find(|kw| upper.contains(kw.as_str()))
        {
            return SecurityDecision::deny(format!("Dangerous SQL keyword detected: '{}'", keyword));
        }

        SecurityDecision::allow()
    }

    /// Repair then validate. `Err` carries the violation; nothing is executed on denial.
    pub fn sanitize(&self, sql: &str) -> std::result::Result<String, SecurityDecision> {
        let repaired = self.repair(sql);
        let decision = self.check(&repaired);
        if decision.allowed {
            Ok(repaired)
        } else {
            warn!(
                "SQL security violation detected: {} - SQL: {}",
                decision.violation.as_deref().unwrap_or_default(),
                repaired
            );
            Err(decision)
        }
    }
}

impl Default for SqlSanitizer {
    fn default() -> Self {
        Self::new(Arc::new(SecurityPolicy::default()))
    }
}

fn replace_whole_alias(haystack: &str, pattern: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;

    while let Some(pos) = rest.find(pattern) {
        let end = pos + pattern.len();
        let continues_word = rest[end..]
            .chars()
            .next()
            .map(|c| c.is_alphanumeric() || c == '_')
            .unwrap_or(false);

        out.push_str(&rest[..pos]);
        if continues_word {
            out.push_str(pattern);
        } else {
            out.push_str(replacement);
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}
