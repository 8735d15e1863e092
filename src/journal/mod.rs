//! The pending-edit journal.
//!
//! The journal owns every uncommitted change made through the grid. Edits
//! merge into existing records where they target the same logical row, and
//! edits aimed at rows the journal does not track are ignored. Committing
//! is a pure read: it reconciles the changes (a pending delete supersedes an
//! insert or update of the same row) and renders them as one SQL script.
//! Aborting drops everything and notifies the registered abort listeners.

mod listeners;


use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::change::{Change, ChangeId, ChangeKind, DeleteChange, InsertChange, Row, UpdateChange};
use crate::error::JournalResult;
use crate::sql_compiler::{render_group, wrap_transaction, ScriptOptions};
use crate::value::CellValue;

pub use listeners::{AbortListeners, ListenerToken};

/// Statistics about what a commit rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStats {
    /// INSERT statements in the script
    pub inserts: u32,
    /// UPDATE statements in the script
    pub updates: u32,
    /// DELETE statements in the script
    pub deletes: u32,
    /// Inserts and updates left out because a delete targets the same row
    pub superseded: u32,
}

/// Output of a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitOutput {
    /// Always `true` here; the FFI error envelope carries `false`, so hosts
    /// read one field to tell the two JSON shapes apart
    pub success: bool,
    /// The transaction-wrapped SQL script
    pub sql: String,
    /// What went into the script
    pub stats: CommitStats,
}

/// Input for compiling a change list without a live journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileInput {
    /// Changes in the order they were made
    pub changes: Vec<Change>,
    /// Script dialect options
    #[serde(default)]
    pub options: ScriptOptions,
}

/// Ledger of pending grid edits.
///
/// Construct one per application and hand it by reference to the views that
/// edit rows. Every mutating method runs to completion without suspending,
/// and [`Journal::commit`] never mutates, so callers may interleave them
/// freely.
#[derive(Debug, Default)]
pub struct Journal {
    next_id: ChangeId,
    changes: Vec<Change>,
    abort_listeners: AbortListeners,
    options: ScriptOptions,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ScriptOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &ScriptOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ScriptOptions) {
        self.options = options;
    }

    fn allocate_id(&mut self) -> ChangeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ── Updates ──────────────────────────────────────────────────────────

    /// Stage `column = value` on an existing row. Later writes to the same
    /// column win.
    pub fn add_or_merge_update(
        &mut self,
        table: &str,
        primary_key: &str,
        row_key: impl Into<CellValue>,
        column: &str,
        value: impl Into<CellValue>,
    ) {
        let row_key = row_key.into();
        let value = value.into();

        if let Some(update) = self.find_update_mut(table, primary_key, &row_key) {
            debug!(table, id = update.id, column, "Merging update field");
            update.values.insert(column.to_string(), value);
            return;
        }

        let id = self.allocate_id();
        debug!(table, id, column, "Creating update");
        let mut values = Row::new();
        values.insert(column.to_string(), value);
        self.changes.push(Change::Update(UpdateChange {
            id,
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            row_key,
            values,
        }));
    }

    /// Drop a staged column edit. The update itself goes away with its last
    /// column.
    pub fn remove_update_field(
        &mut self,
        table: &str,
        primary_key: &str,
        row_key: impl Into<CellValue>,
        column: &str,
    ) {
        let row_key = row_key.into();
        let Some(update) = self.find_update_mut(table, primary_key, &row_key) else {
            trace!(table, primary_key, column, "No update to remove field from");
            return;
        };

        update.values.shift_remove(column);
        if update.values.is_empty() {
            let id = update.id;
            debug!(table, id, "Update emptied, removing");
            self.remove_change(id);
        }
    }

    // ── Inserts ──────────────────────────────────────────────────────────

    /// Stage a new row. The returned id is also the row's ephemeral key.
    pub fn create_insert(&mut self, table: &str, values: Row) -> ChangeId {
        let id = self.allocate_id();
        debug!(table, id, columns = values.len(), "Creating insert");
        self.changes.push(Change::Insert(InsertChange {
            id,
            table: table.to_string(),
            row_key: id,
            values,
        }));
        id
    }

    pub fn update_insert_field(
        &mut self,
        table: &str,
        row_key: ChangeId,
        column: &str,
        value: impl Into<CellValue>,
    ) {
        let insert = self.changes.iter_mut().find_map(|c| match c {
            Change::Insert(i) if i.targets(table, row_key) => Some(i),
            _ => None,
        });
        match insert {
            Some(insert) => {
                debug!(table, id = insert.id, column, "Updating insert field");
                insert.values.insert(column.to_string(), value.into());
            }
            None => trace!(table, row_key, "No insert to update"),
        }
    }

    pub fn remove_insert(&mut self, table: &str, row_key: ChangeId) {
        let id = self.pending_insert(table, row_key).map(|i| i.id);
        match id {
            Some(id) => {
                debug!(table, id, "Removing insert");
                self.remove_change(id);
            }
            None => trace!(table, row_key, "No insert to remove"),
        }
    }

    // ── Deletes ──────────────────────────────────────────────────────────

    /// Mark a row for deletion, or unmark it if already marked.
    ///
    /// Returns whether the row is marked after the call.
    pub fn toggle_delete(&mut self, table: &str, primary_key: &str, row_key: impl Into<CellValue>) -> bool {
        let row_key = row_key.into();
        let existing = self.changes.iter().find_map(|c| match c {
            Change::Delete(d) if d.targets(table, primary_key, &row_key) => Some(d.id),
            _ => None,
        });

        if let Some(id) = existing {
            debug!(table, id, "Unmarking delete");
            self.remove_change(id);
            return false;
        }

        let id = self.allocate_id();
        debug!(table, id, "Marking delete");
        self.changes.push(Change::Delete(DeleteChange {
            id,
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            row_key,
        }));
        true
    }

    // ── Commit / abort ───────────────────────────────────────────────────

    /// Render the pending changes as a transaction-wrapped SQL script.
    pub fn commit(&self) -> JournalResult<String> {
        self.commit_with_stats().map(|output| output.sql)
    }

    pub fn commit_with_stats(&self) -> JournalResult<CommitOutput> {
        let output = compile_changes(&self.changes, &self.options).map_err(|e| {
            warn!(error = %e, "Commit script generation failed");
            e
        })?;
        info!(
            inserts = output.stats.inserts,
            updates = output.stats.updates,
            deletes = output.stats.deletes,
            superseded = output.stats.superseded,
            "Commit script generated"
        );
        Ok(output)
    }

    /// Drop every pending change and run the abort listeners.
    pub fn abort(&mut self) {
        info!(
            dropped = self.changes.len(),
            listeners = self.abort_listeners.len(),
            "Aborting pending changes"
        );
        self.changes.clear();
        self.abort_listeners.notify();
    }

    pub fn add_abort_listener(&mut self, listener: impl FnMut() + 'static) -> ListenerToken {
        self.abort_listeners.add(Box::new(listener))
    }

    /// Returns `false` if the token was not registered.
    pub fn remove_abort_listener(&mut self, token: ListenerToken) -> bool {
        self.abort_listeners.remove(token)
    }

    // ── Views ────────────────────────────────────────────────────────────

    /// All live changes, in the order they were created.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn inserts(&self) -> impl Iterator<Item = &InsertChange> {
        self.changes.iter().filter_map(|c| match c {
            Change::Insert(i) => Some(i),
            _ => None,
        })
    }

    pub fn updates(&self) -> impl Iterator<Item = &UpdateChange> {
        self.changes.iter().filter_map(|c| match c {
            Change::Update(u) => Some(u),
            _ => None,
        })
    }

    pub fn deletes(&self) -> impl Iterator<Item = &DeleteChange> {
        self.changes.iter().filter_map(|c| match c {
            Change::Delete(d) => Some(d),
            _ => None,
        })
    }

    pub fn pending_insert(&self, table: &str, row_key: ChangeId) -> Option<&InsertChange> {
        self.inserts().find(|i| i.targets(table, row_key))
    }

    pub fn pending_update(&self, table: &str, primary_key: &str, row_key: &CellValue) -> Option<&UpdateChange> {
        self.updates().find(|u| u.targets(table, primary_key, row_key))
    }

    pub fn is_row_deleted(&self, table: &str, primary_key: &str, row_key: &CellValue) -> bool {
        self.deletes().any(|d| d.targets(table, primary_key, row_key))
    }

    fn find_update_mut(&mut self, table: &str, primary_key: &str, row_key: &CellValue) -> Option<&mut UpdateChange> {
        self.changes.iter_mut().find_map(|c| match c {
            Change::Update(u) if u.targets(table, primary_key, row_key) => Some(u),
            _ => None,
        })
    }

    fn remove_change(&mut self, id: ChangeId) {
        self.changes.retain(|c| c.id() != id);
    }
}

/// Reconcile a change list and render it as one script.
///
/// Inserts and updates whose row is also pending deletion are left out;
/// deletes render last.
fn compile_changes(changes: &[Change], options: &ScriptOptions) -> JournalResult<CommitOutput> {
    let deletes: Vec<&DeleteChange> = changes
        .iter()
        .filter_map(|c| match c {
            Change::Delete(d) => Some(d),
            _ => None,
        })
        .collect();

    let mut stats = CommitStats::default();
    let mut retained: Vec<&Change> = Vec::new();

    for change in changes {
        let superseded = match change {
            Change::Insert(insert) => deletes.iter().any(|d| d.supersedes_insert(insert)),
            Change::Update(update) => {
                if update.values.is_empty() {
                    trace!(table = change.table(), id = change.id(), "Skipping update without fields");
                    continue;
                }
                deletes.iter().any(|d| d.supersedes_update(update))
            }
            Change::Delete(_) => false,
        };

        if superseded {
            trace!(
                table = change.table(),
                id = change.id(),
                kind = change.kind().label(),
                "Change superseded by delete"
            );
            stats.superseded += 1;
        } else {
            retained.push(change);
        }
    }

    let group = |kind: ChangeKind| {
        retained
            .iter()
            .copied()
            .filter(|c| c.kind() == kind)
            .collect::<Vec<_>>()
    };
    let insert_group = group(ChangeKind::Insert);
    let update_group = group(ChangeKind::Update);
    let delete_group = group(ChangeKind::Delete);

    let groups = [
        render_group(ChangeKind::Insert, &insert_group, options)?,
        render_group(ChangeKind::Update, &update_group, options)?,
        render_group(ChangeKind::Delete, &delete_group, options)?,
    ];

    stats.inserts = insert_group.len() as u32;
    stats.updates = update_group.len() as u32;
    stats.deletes = delete_group.len() as u32;

    Ok(CommitOutput {
        success: true,
        sql: wrap_transaction(&groups, options),
        stats,
    })
}

/// Compile a serialized change list without a live journal.
pub fn compile_script(input: CompileInput) -> JournalResult<CommitOutput> {
    compile_changes(&input.changes, &input.options)
}

/// Compile a JSON string input and return JSON string output.
/// Convenience function for FFI.
pub fn compile_script_json(input_json: &str) -> JournalResult<String> {
    let input: CompileInput = serde_json::from_str(input_json)?;
    let output = compile_script(input)?;
    let output_json = serde_json::to_string(&output)?;
    Ok(output_json)
}
