//! Security Policy
//!
//! Denylists, length limit and alias-repair table shared by the NL gate and the SQL guard.
//! Built once at start-up and shared read-only.

use serde::{Deserialize, Serialize};

/// Terms rejected anywhere in a natural-language question (matched lower-cased).
pub const NL_DENYLIST: &[&str] = &[
    "drop", "delete", "insert", "update", "alter", "create", "exec", "execute", "ssn", "password",
    "admin", "root", "system", "hack", "exploit",
];

/// Keywords rejected anywhere in a generated statement (matched upper-cased).
pub const SQL_DENYLIST: &[&str] = &[
    "DROP", "DELETE", "INSERT", "UPDATE", "ALTER", "CREATE", "EXEC", "EXECUTE",
];

pub const MAX_QUESTION_CHARS: usize = 1000;

/// One reserved-alias substitution, e.g. `FROM IncomeSources IS` -> `FROM IncomeSources inc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRepair {
    pub table: String,
    pub reserved_alias: String,
    pub safe_alias: String,
}

impl AliasRepair {
    pub fn new(table: &str, reserved_alias: &str, safe_alias: &str) -> Self {
        Self {
            table: table.to_string(),
            reserved_alias: reserved_alias.to_string(),
            safe_alias: safe_alias.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub nl_denylist: Vec<String>,
    pub sql_denylist: Vec<String>,
    pub max_question_chars: usize,
    pub alias_repairs: Vec<AliasRepair>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            nl_denylist: NL_DENYLIST.iter().map(|s| s.to_string()).collect(),
            sql_denylist: SQL_DENYLIST.iter().map(|s| s.to_string()).collect(),
            max_question_chars: MAX_QUESTION_CHARS,
            alias_repairs: vec![
                AliasRepair::new("IncomeSources", "IS", "inc"),
                AliasRepair::new("TaxReturns", "TR", "ret"),
                AliasRepair::new("Taxpayers", "T", "tax"),
                AliasRepair::new("Properties", "P", "prop"),
                AliasRepair::new("Assets", "A", "ast"),
                AliasRepair::new("Dependents", "D", "dep"),
            ],
        }
    }
}

impl SecurityPolicy {
    /// Ordered `(pattern, replacement)` pairs, FROM before JOIN for each table.
    pub fn alias_substitutions(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.alias_repairs.len() * 2);
        for repair in &self.alias_repairs {
            for clause in ["FROM", "JOIN"] {
                pairs.push((
                    format!("{} {} {}", clause, repair.table, repair.reserved_alias),
                    format!("{} {} {}", clause, repair.table, repair.safe_alias),
                ));
            }
        }
        pairs
    }

    /// Safe alias table as rendered into the generation prompt.
    pub fn safe_alias_lines(&self) -> Vec<String> {
        self.alias_repairs
            .iter()
            .map(|r| format!("'{}' for {}", r.safe_alias, r.table))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutions_are_ordered_from_then_join() {
        let policy = SecurityPolicy::default();
        let subs = policy.alias_substitutions();
        assert_eq!(subs.len(), 12);
        assert_eq!(subs[0].0, "FROM IncomeSources IS");
        assert_eq!(subs[0].1, "FROM IncomeSources inc");
        assert_eq!(subs[1].0, "JOIN IncomeSources IS");
        assert_eq!(subs[11].1, "JOIN Dependents dep");
    }

    #[test]
    fn test_default_denylists() {
        let policy = SecurityPolicy::default();
        assert_eq!(policy.nl_denylist.len(), 15);
        assert_eq!(policy.sql_denylist.len(), 8);
        assert_eq!(policy.max_question_chars, 1000);
    }
}
