//! Grid Journal Library
//!
//! Pending-edit ledger for database grid editors, including:
//! - **journal**: Stages row inserts, updates and deletes, merges repeated
//!   edits, and compiles them into one transaction script
//! - **sql_compiler**: Renders reconciled changes as literal SQL statements
//! - **value**: Cell values and their SQL literal form
//!
//! The library performs no I/O. The host executes the generated script
//! against its own connection.
//!
//! # Example
//! ```
//! use grid_journal::{Journal, Row};
//!
//! let mut journal = Journal::new();
//! journal.add_or_merge_update("users", "id", 7, "name", "Bob");
//! journal.toggle_delete("users", "id", 9);
//! let id = journal.create_insert("users", Row::new());
//! journal.update_insert_field("users", id, "name", "Eve");
//!
//! let sql = journal.commit().unwrap();
//! assert!(sql.starts_with("BEGIN;\n-- 1 insert\n"));
//! ```

pub mod change;
pub mod error;
pub mod journal;
pub mod sql_compiler;
pub mod value;

pub use change::{Change, ChangeId, ChangeKind, DeleteChange, InsertChange, Row, UpdateChange};
pub use error::{JournalError, JournalResult};
pub use journal::{
    compile_script, compile_script_json, CommitOutput, CommitStats, CompileInput, Journal,
    ListenerToken,
};
pub use sql_compiler::{ConflictClause, ScriptOptions, TransactionStart};
pub use value::{serialize_value, CellValue};

/// Get the version of the grid-journal library.
pub fn get_core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// WASM bindings
#[cfg(feature = "wasm")]
pub mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::*;

// C FFI exports for the host process
#[cfg(feature = "ffi")]
pub mod ffi;
