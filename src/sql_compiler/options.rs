//! Dialect options for generated scripts.

use serde::{Deserialize, Serialize};

/// Statement that opens the script's transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStart {
    /// `BEGIN;`
    #[default]
    Begin,
    /// `START TRANSACTION;`
    StartTransaction,
}

impl TransactionStart {
    pub fn statement(self) -> &'static str {
        match self {
            TransactionStart::Begin => "BEGIN;",
            TransactionStart::StartTransaction => "START TRANSACTION;",
        }
    }
}

/// SQLite `OR <resolution>` modifier for INSERT and UPDATE statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictClause {
    Rollback,
    Abort,
    Fail,
    Ignore,
    Replace,
}

impl ConflictClause {
    pub fn keyword(self) -> &'static str {
        match self {
            ConflictClause::Rollback => "OR ROLLBACK",
            ConflictClause::Abort => "OR ABORT",
            ConflictClause::Fail => "OR FAIL",
            ConflictClause::Ignore => "OR IGNORE",
            ConflictClause::Replace => "OR REPLACE",
        }
    }
}

/// Options controlling the shape of a compiled script.
///
/// The defaults produce portable SQL: `BEGIN;` / `COMMIT;`, bare identifiers,
/// no conflict modifiers, and every insert field kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptOptions {
    /// Opening statement of the transaction
    pub transaction_start: TransactionStart,
    /// Optional SQLite conflict modifier on INSERT and UPDATE
    pub conflict_clause: Option<ConflictClause>,
    /// Wrap table and column names in double quotes
    pub quote_identifiers: bool,
    /// Leave NULL-valued fields out of INSERT statements
    pub omit_null_inserts: bool,
}

impl ScriptOptions {
    /// Render a table or column name.
    pub(crate) fn identifier(&self, name: &str) -> String {
        if self.quote_identifiers {
            format!("\"{}\"", name.replace('"', "\"\""))
        } else {
            name.to_string()
        }
    }

    /// `INSERT`/`UPDATE` verb with the conflict modifier, if any.
    pub(crate) fn verb(&self, verb: &str) -> String {
        match self.conflict_clause {
            Some(clause) => format!("{} {}", verb, clause.keyword()),
            None => verb.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let options: ScriptOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ScriptOptions::default());
        assert_eq!(options.transaction_start.statement(), "BEGIN;");
    }

    #[test]
    fn test_partial_json() {
        let options: ScriptOptions = serde_json::from_str(
            r#"{"transaction_start": "start_transaction", "conflict_clause": "rollback"}"#,
        )
        .unwrap();
        assert_eq!(options.transaction_start, TransactionStart::StartTransaction);
        assert_eq!(options.verb("UPDATE"), "UPDATE OR ROLLBACK");
        assert!(!options.quote_identifiers);
    }

    #[test]
    fn test_quoted_identifier_doubles_quotes() {
        let options = ScriptOptions {
            quote_identifiers: true,
            ..Default::default()
        };
        assert_eq!(options.identifier("my\"col"), "\"my\"\"col\"");
    }
}
