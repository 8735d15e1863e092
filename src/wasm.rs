//! WASM bindings for the grid frontend.

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::change::{change_id_from_f64, ChangeId, Row};
use crate::journal::{compile_script, CompileInput, Journal, ListenerToken};
use crate::sql_compiler::ScriptOptions;
use crate::value::CellValue;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);
}

/// Initialize panic hook for better error messages.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Value conversion
// ═══════════════════════════════════════════════════════════════════════════════

/// Convert a JS cell value. `Date` objects (also inside arrays) become
/// timestamps; everything else goes through its JSON form.
fn to_cell_value(value: JsValue) -> Result<CellValue, JsValue> {
    if let Some(date) = value.dyn_ref::<js_sys::Date>() {
        let iso: String = date.to_iso_string().into();
        return CellValue::timestamp_from_str(&iso).map_err(|e| JsValue::from_str(&e.to_string()));
    }

    if js_sys::Array::is_array(&value) {
        let items = js_sys::Array::from(&value)
            .iter()
            .map(to_cell_value)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(CellValue::List(items));
    }

    let json: serde_json::Value = serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse value: {}", e)))?;
    Ok(CellValue::from(json))
}

/// Convert a plain JS object into a row, keeping property order.
fn to_row(values: JsValue) -> Result<Row, JsValue> {
    let mut row = Row::new();
    if values.is_undefined() || values.is_null() {
        return Ok(row);
    }

    let object = values
        .dyn_ref::<js_sys::Object>()
        .ok_or_else(|| JsValue::from_str("Row values must be an object"))?;
    for entry in js_sys::Object::entries(object).iter() {
        let pair = js_sys::Array::from(&entry);
        let column = pair
            .get(0)
            .as_string()
            .ok_or_else(|| JsValue::from_str("Column names must be strings"))?;
        row.insert(column, to_cell_value(pair.get(1))?);
    }
    Ok(row)
}

/// Ephemeral keys must arrive as the non-negative integers `createInsert`
/// handed out.
fn to_change_id(row_key: f64) -> Result<ChangeId, JsValue> {
    change_id_from_f64(row_key).ok_or_else(|| JsValue::from_str("Row key must be a non-negative integer"))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize output: {}", e)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Journal WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Pending-edit journal exposed to the grid.
///
/// Change ids and listener tokens cross the boundary as JS numbers.
#[wasm_bindgen(js_name = Journal)]
pub struct WasmJournal {
    inner: Journal,
}

#[wasm_bindgen(js_class = Journal)]
impl WasmJournal {
    /// Create a journal. `options` may be omitted for portable SQL.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<WasmJournal, JsValue> {
        let options: ScriptOptions = if options.is_undefined() || options.is_null() {
            ScriptOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)
                .map_err(|e| JsValue::from_str(&format!("Failed to parse options: {}", e)))?
        };
        Ok(WasmJournal {
            inner: Journal::with_options(options),
        })
    }

    #[wasm_bindgen(js_name = addOrMergeUpdate)]
    pub fn add_or_merge_update(
        &mut self,
        table: &str,
        primary_key: &str,
        row_key: JsValue,
        column: &str,
        value: JsValue,
    ) -> Result<(), JsValue> {
        let row_key = to_cell_value(row_key)?;
        let value = to_cell_value(value)?;
        self.inner.add_or_merge_update(table, primary_key, row_key, column, value);
        Ok(())
    }

    #[wasm_bindgen(js_name = removeUpdateField)]
    pub fn remove_update_field(
        &mut self,
        table: &str,
        primary_key: &str,
        row_key: JsValue,
        column: &str,
    ) -> Result<(), JsValue> {
        let row_key = to_cell_value(row_key)?;
        self.inner.remove_update_field(table, primary_key, row_key, column);
        Ok(())
    }

    /// Stage a new row; returns its ephemeral key.
    #[wasm_bindgen(js_name = createInsert)]
    pub fn create_insert(&mut self, table: &str, values: JsValue) -> Result<f64, JsValue> {
        let values = to_row(values)?;
        Ok(self.inner.create_insert(table, values) as f64)
    }

    #[wasm_bindgen(js_name = updateInsertField)]
    pub fn update_insert_field(
        &mut self,
        table: &str,
        row_key: f64,
        column: &str,
        value: JsValue,
    ) -> Result<(), JsValue> {
        let row_key = to_change_id(row_key)?;
        let value = to_cell_value(value)?;
        self.inner.update_insert_field(table, row_key, column, value);
        Ok(())
    }

    #[wasm_bindgen(js_name = removeInsert)]
    pub fn remove_insert(&mut self, table: &str, row_key: f64) -> Result<(), JsValue> {
        let row_key = to_change_id(row_key)?;
        self.inner.remove_insert(table, row_key);
        Ok(())
    }

    /// Returns whether the row is marked for deletion afterwards.
    #[wasm_bindgen(js_name = toggleDelete)]
    pub fn toggle_delete(&mut self, table: &str, primary_key: &str, row_key: JsValue) -> Result<bool, JsValue> {
        let row_key = to_cell_value(row_key)?;
        Ok(self.inner.toggle_delete(table, primary_key, row_key))
    }

    #[wasm_bindgen(js_name = isRowDeleted)]
    pub fn is_row_deleted(&self, table: &str, primary_key: &str, row_key: JsValue) -> Result<bool, JsValue> {
        let row_key = to_cell_value(row_key)?;
        Ok(self.inner.is_row_deleted(table, primary_key, &row_key))
    }

    /// All live changes as plain objects.
    pub fn changes(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.changes())
    }

    pub fn commit(&self) -> Result<String, JsValue> {
        self.inner
            .commit()
            .map_err(|e| JsValue::from_str(&format!("Commit failed: {}", e)))
    }

    #[wasm_bindgen(js_name = commitWithStats)]
    pub fn commit_with_stats(&self) -> Result<JsValue, JsValue> {
        let output = self
            .inner
            .commit_with_stats()
            .map_err(|e| JsValue::from_str(&format!("Commit failed: {}", e)))?;
        to_js(&output)
    }

    pub fn abort(&mut self) {
        self.inner.abort();
    }

    /// Register a callback run on abort; returns a token for removal.
    #[wasm_bindgen(js_name = addAbortListener)]
    pub fn add_abort_listener(&mut self, callback: js_sys::Function) -> f64 {
        let token = self.inner.add_abort_listener(move || {
            if let Err(e) = callback.call0(&JsValue::NULL) {
                log(&format!("Abort listener failed: {:?}", e));
            }
        });
        token as f64
    }

    #[wasm_bindgen(js_name = removeAbortListener)]
    pub fn remove_abort_listener(&mut self, token: f64) -> bool {
        self.inner.remove_abort_listener(token as ListenerToken)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Stateless Compile WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile a change list into a script.
///
/// Takes a JsValue (CompileInput) and returns a JsValue (CommitOutput).
#[wasm_bindgen(js_name = compileScript)]
pub fn compile_script_js(input: JsValue) -> Result<JsValue, JsValue> {
    let input: CompileInput = serde_wasm_bindgen::from_value(input)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse input: {}", e)))?;

    let output = compile_script(input)
        .map_err(|e| JsValue::from_str(&format!("Compile failed: {}", e)))?;

    to_js(&output)
}

/// Compile using JSON strings (alternative API).
///
/// Takes a JSON string and returns a JSON string.
#[wasm_bindgen(js_name = compileScriptJson)]
pub fn compile_script_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::journal::compile_script_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("Compile failed: {}", e)))
}

/// Get the version of the grid-journal library.
#[wasm_bindgen(js_name = getCoreVersion)]
pub fn get_core_version_js() -> String {
    crate::get_core_version().to_string()
}
