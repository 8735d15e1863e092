//! SQL script rendering for reconciled changes.
//!
//! Each change renders to one literal statement (values are inlined, not
//! bound). Statements are grouped by kind, every non-empty group is preceded
//! by a `-- N <kind>s` comment, and the whole script is wrapped in a
//! transaction.

mod options;

use crate::change::{Change, ChangeKind, DeleteChange, InsertChange, UpdateChange};
use crate::error::JournalResult;
use crate::value::serialize_value;

pub use options::{ConflictClause, ScriptOptions, TransactionStart};

/// Closing statement of every script.
pub const COMMIT_STATEMENT: &str = "COMMIT;";

/// Render one change as a single SQL statement.
pub fn render_statement(change: &Change, options: &ScriptOptions) -> JournalResult<String> {
    match change {
        Change::Insert(c) => render_insert(c, options),
        Change::Update(c) => render_update(c, options),
        Change::Delete(c) => render_delete(c, options),
    }
}

/// Render a statement group, preceded by its count comment.
///
/// Returns an empty string for an empty group. Any value that cannot be
/// serialized fails the whole group.
pub fn render_group(kind: ChangeKind, changes: &[&Change], options: &ScriptOptions) -> JournalResult<String> {
    if changes.is_empty() {
        return Ok(String::new());
    }

    let statements = changes
        .iter()
        .map(|c| render_statement(c, options))
        .collect::<JournalResult<Vec<_>>>()?;

    Ok(format!(
        "{}\n{}\n",
        group_comment(kind, changes.len()),
        statements.join("\n")
    ))
}

/// Wrap rendered groups in the transaction statements.
pub fn wrap_transaction(groups: &[String], options: &ScriptOptions) -> String {
    let mut script = String::new();
    script.push_str(options.transaction_start.statement());
    script.push('\n');
    for group in groups {
        script.push_str(group);
    }
    script.push_str(COMMIT_STATEMENT);
    script.push('\n');
    script
}

/// `-- 1 insert`, `-- 2 inserts`, ...
fn group_comment(kind: ChangeKind, count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("-- {} {}{}", count, kind.label(), plural)
}

fn render_insert(change: &InsertChange, options: &ScriptOptions) -> JournalResult<String> {
    let table = options.identifier(&change.table);
    let verb = options.verb("INSERT");

    let fields: Vec<_> = change
        .values
        .iter()
        .filter(|(_, value)| !(options.omit_null_inserts && value.is_null()))
        .collect();

    if fields.is_empty() {
        return Ok(format!("{} INTO {} DEFAULT VALUES;", verb, table));
    }

    let columns = fields
        .iter()
        .map(|(column, _)| options.identifier(column))
        .collect::<Vec<_>>()
        .join(", ");
    let values = fields
        .iter()
        .map(|(_, value)| serialize_value(value))
        .collect::<JournalResult<Vec<_>>>()?
        .join(", ");

    Ok(format!("{} INTO {} ({}) VALUES ({});", verb, table, columns, values))
}

fn render_update(change: &UpdateChange, options: &ScriptOptions) -> JournalResult<String> {
    let set_clause = change
        .values
        .iter()
        .map(|(column, value)| -> JournalResult<String> {
            Ok(format!("{} = {}", options.identifier(column), serialize_value(value)?))
        })
        .collect::<JournalResult<Vec<_>>>()?
        .join(", ");

    Ok(format!(
        "{} {} SET {} WHERE {} = {};",
        options.verb("UPDATE"),
        options.identifier(&change.table),
        set_clause,
        options.identifier(&change.primary_key),
        serialize_value(&change.row_key)?
    ))
}

fn render_delete(change: &DeleteChange, options: &ScriptOptions) -> JournalResult<String> {
    Ok(format!(
        "DELETE FROM {} WHERE {} = {};",
        options.identifier(&change.table),
        options.identifier(&change.primary_key),
        serialize_value(&change.row_key)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Row;
    use crate::value::CellValue;

    fn insert(table: &str, values: Row) -> Change {
        Change::Insert(InsertChange {
            id: 0,
            table: table.to_string(),
            row_key: 0,
            values,
        })
    }

    fn row(fields: &[(&str, CellValue)]) -> Row {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_render_insert() {
        let change = insert("users", row(&[("name", "Al'ice".into()), ("age", 30i64.into())]));
        let sql = render_statement(&change, &ScriptOptions::default()).unwrap();
        assert_eq!(sql, "INSERT INTO users (name, age) VALUES ('Al''ice', 30);");
    }

    #[test]
    fn test_render_insert_without_columns() {
        let change = insert("users", Row::new());
        let sql = render_statement(&change, &ScriptOptions::default()).unwrap();
        assert_eq!(sql, "INSERT INTO users DEFAULT VALUES;");
    }

    #[test]
    fn test_render_insert_omits_nulls_when_asked() {
        let change = insert("users", row(&[("name", "Bob".into()), ("email", CellValue::Null)]));

        let kept = render_statement(&change, &ScriptOptions::default()).unwrap();
        assert_eq!(kept, "INSERT INTO users (name, email) VALUES ('Bob', NULL);");

        let options = ScriptOptions {
            omit_null_inserts: true,
            ..Default::default()
        };
        let omitted = render_statement(&change, &options).unwrap();
        assert_eq!(omitted, "INSERT INTO users (name) VALUES ('Bob');");
    }

    #[test]
    fn test_render_update() {
        let change = Change::Update(UpdateChange {
            id: 1,
            table: "users".to_string(),
            primary_key: "id".to_string(),
            row_key: 7i64.into(),
            values: row(&[("name", "Bob".into()), ("active", false.into())]),
        });
        let sql = render_statement(&change, &ScriptOptions::default()).unwrap();
        assert_eq!(sql, "UPDATE users SET name = 'Bob', active = FALSE WHERE id = 7;");
    }

    #[test]
    fn test_render_delete_with_text_key() {
        let change = Change::Delete(DeleteChange {
            id: 2,
            table: "tags".to_string(),
            primary_key: "slug".to_string(),
            row_key: "rock'n'roll".into(),
        });
        let sql = render_statement(&change, &ScriptOptions::default()).unwrap();
        assert_eq!(sql, "DELETE FROM tags WHERE slug = 'rock''n''roll';");
    }

    #[test]
    fn test_dialect_options() {
        let options = ScriptOptions {
            conflict_clause: Some(ConflictClause::Rollback),
            quote_identifiers: true,
            ..Default::default()
        };
        let change = insert("users", row(&[("name", "Bob".into())]));
        let sql = render_statement(&change, &options).unwrap();
        assert_eq!(sql, "INSERT OR ROLLBACK INTO \"users\" (\"name\") VALUES ('Bob');");

        let delete = Change::Delete(DeleteChange {
            id: 2,
            table: "users".to_string(),
            primary_key: "id".to_string(),
            row_key: 1i64.into(),
        });
        // Deletes take no conflict modifier
        let sql = render_statement(&delete, &options).unwrap();
        assert_eq!(sql, "DELETE FROM \"users\" WHERE \"id\" = 1;");
    }

    #[test]
    fn test_group_comment_pluralizes() {
        let a = insert("t", row(&[("x", 1i64.into())]));
        let b = insert("t", row(&[("x", 2i64.into())]));
        let options = ScriptOptions::default();

        let one = render_group(ChangeKind::Insert, &[&a], &options).unwrap();
        assert_eq!(one, "-- 1 insert\nINSERT INTO t (x) VALUES (1);\n");

        let two = render_group(ChangeKind::Insert, &[&a, &b], &options).unwrap();
        assert_eq!(
            two,
            "-- 2 inserts\nINSERT INTO t (x) VALUES (1);\nINSERT INTO t (x) VALUES (2);\n"
        );

        assert_eq!(render_group(ChangeKind::Delete, &[], &options).unwrap(), "");
    }

    #[test]
    fn test_group_fails_on_unsupported_value() {
        let bad = insert("t", row(&[("x", serde_json::json!({"a": 1}).into())]));
        assert!(render_group(ChangeKind::Insert, &[&bad], &ScriptOptions::default()).is_err());
    }

    #[test]
    fn test_wrap_transaction() {
        let options = ScriptOptions {
            transaction_start: TransactionStart::StartTransaction,
            ..Default::default()
        };
        let script = wrap_transaction(&["-- 1 delete\nDELETE FROM t WHERE id = 1;\n".to_string()], &options);
        assert_eq!(
            script,
            "START TRANSACTION;\n-- 1 delete\nDELETE FROM t WHERE id = 1;\nCOMMIT;\n"
        );
    }
}
