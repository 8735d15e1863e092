//! Pending change records.
//!
//! A change is one of three variants, tagged by `type` in its JSON form.
//! Each variant knows which logical row it targets; the journal uses these
//! identity rules to merge edits and to resolve conflicts at commit time.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::CellValue;

/// Journal-assigned change identifier. Unique per journal, never reused.
pub type ChangeId = u64;

/// Column name to pending value, in the order the columns were first set.
pub type Row = IndexMap<String, CellValue>;

/// Statement group a change belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Lowercase label used in script comments.
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// A row that does not exist in the database yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertChange {
    pub id: ChangeId,
    pub table: String,
    /// Ephemeral key the grid uses to address the row before it has a real
    /// primary key. Equal to `id`.
    pub row_key: ChangeId,
    pub values: Row,
}

/// Pending column edits on an existing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChange {
    pub id: ChangeId,
    pub table: String,
    pub primary_key: String,
    pub row_key: CellValue,
    pub values: Row,
}

/// An existing row marked for removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteChange {
    pub id: ChangeId,
    pub table: String,
    pub primary_key: String,
    pub row_key: CellValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Change {
    Insert(InsertChange),
    Update(UpdateChange),
    Delete(DeleteChange),
}

impl Change {
    pub fn id(&self) -> ChangeId {
        match self {
            Change::Insert(c) => c.id,
            Change::Update(c) => c.id,
            Change::Delete(c) => c.id,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Change::Insert(c) => &c.table,
            Change::Update(c) => &c.table,
            Change::Delete(c) => &c.table,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Insert(_) => ChangeKind::Insert,
            Change::Update(_) => ChangeKind::Update,
            Change::Delete(_) => ChangeKind::Delete,
        }
    }
}

/// Ephemeral key from a JS number. Rejects NaN, infinities, negative and
/// fractional values instead of truncating them onto another row.
pub fn change_id_from_f64(n: f64) -> Option<ChangeId> {
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64 {
        Some(n as ChangeId)
    } else {
        None
    }
}

impl InsertChange {
    pub fn targets(&self, table: &str, row_key: ChangeId) -> bool {
        self.table == table && self.row_key == row_key
    }
}

impl UpdateChange {
    pub fn targets(&self, table: &str, primary_key: &str, row_key: &CellValue) -> bool {
        self.table == table && self.primary_key == primary_key && self.row_key.same_key(row_key)
    }
}

impl DeleteChange {
    pub fn targets(&self, table: &str, primary_key: &str, row_key: &CellValue) -> bool {
        self.table == table && self.primary_key == primary_key && self.row_key.same_key(row_key)
    }

    /// A delete of a not-yet-persisted row is addressed by its ephemeral key.
    ///
    /// Matching is on (table, row key) only, so a delete of an existing row
    /// whose primary key happens to equal a pending insert's ephemeral key
    /// also drops that insert from the script.
    pub fn supersedes_insert(&self, insert: &InsertChange) -> bool {
        self.table == insert.table && self.row_key.same_key(&CellValue::from(insert.row_key))
    }

    /// Matched on (table, row key) only, like the grid addresses rows.
    pub fn supersedes_update(&self, update: &UpdateChange) -> bool {
        self.table == update.table && self.row_key.same_key(&update.row_key)
    }
}
