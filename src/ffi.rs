//! C FFI exports for the host process.
//!
//! The host keeps its own copy of the pending changes (as JSON) and asks the
//! library to compile them. All functions use JSON strings for input/output
//! to simplify marshalling.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::journal::{compile_script, CompileInput};

/// Compile a change list into a transaction script.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing the JSON result (CommitOutput).
/// Returns null on error.
#[no_mangle]
pub unsafe extern "C" fn compile_script_ffi(input_json: *const c_char) -> *mut c_char {
    if input_json.is_null() {
        return ptr::null_mut();
    }

    let c_str = match CStr::from_ptr(input_json).to_str() {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    let input: CompileInput = match serde_json::from_str(c_str) {
        Ok(i) => i,
        Err(e) => {
            return create_error_response(&format!("Failed to parse input: {}", e));
        }
    };

    let output = match compile_script(input) {
        Ok(o) => o,
        Err(e) => {
            return create_error_response(&format!("Compile failed: {}", e));
        }
    };

    match serde_json::to_string(&output) {
        Ok(json) => string_to_c_char(json),
        Err(e) => create_error_response(&format!("Failed to serialize output: {}", e)),
    }
}

/// Get the library version.
///
/// # Safety
///
/// - The returned pointer must be freed by calling `free_string`
#[no_mangle]
pub extern "C" fn get_core_version_ffi() -> *mut c_char {
    string_to_c_char(crate::get_core_version().to_string())
}

/// Free a string that was allocated by Rust.
///
/// # Safety
///
/// - `s` must be a pointer that was returned by one of the FFI functions
/// - This function must only be called once per pointer
/// - After calling this function, the pointer is invalid
#[no_mangle]
pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Convert a Rust string to a C string pointer.
fn string_to_c_char(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Create an error response JSON string.
fn create_error_response(message: &str) -> *mut c_char {
    let error_json = serde_json::json!({ "success": false, "error": message }).to_string();
    string_to_c_char(error_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take_string(ptr: *mut c_char) -> String {
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        free_string(ptr);
        s
    }

    #[test]
    fn test_null_input() {
        unsafe {
            let result = compile_script_ffi(ptr::null());
            assert!(result.is_null());
        }
    }

    #[test]
    fn test_invalid_json_input() {
        let invalid_json = CString::new("not valid json").unwrap();
        unsafe {
            let result = compile_script_ffi(invalid_json.as_ptr());
            assert!(!result.is_null());

            let json = take_string(result);
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["success"], serde_json::json!(false));
            assert!(value["error"].as_str().unwrap().starts_with("Failed to parse input"));
        }
    }

    #[test]
    fn test_unsupported_value_reports_error() {
        let input = CString::new(
            r#"{"changes": [{"type": "UPDATE", "id": 0, "table": "t", "primaryKey": "id",
                "rowKey": 1, "values": {"meta": {"a": 1}}}]}"#,
        )
        .unwrap();
        unsafe {
            let json = take_string(compile_script_ffi(input.as_ptr()));
            assert!(json.contains("Unsupported value type: object"));
        }
    }

    #[test]
    fn test_compile_round_trip() {
        let input = CString::new(
            r#"{"changes": [{"type": "DELETE", "id": 0, "table": "t", "primaryKey": "id", "rowKey": 1}]}"#,
        )
        .unwrap();
        unsafe {
            let json = take_string(compile_script_ffi(input.as_ptr()));
            let output: crate::journal::CommitOutput = serde_json::from_str(&json).unwrap();
            assert!(output.success);
            assert_eq!(output.sql, "BEGIN;\n-- 1 delete\nDELETE FROM t WHERE id = 1;\nCOMMIT;\n");
        }
    }

    #[test]
    fn test_success_flag_tells_envelopes_apart() {
        let ok = CString::new(r#"{"changes": []}"#).unwrap();
        let bad = CString::new(r#"{"changes": 1}"#).unwrap();
        unsafe {
            let ok: serde_json::Value = serde_json::from_str(&take_string(compile_script_ffi(ok.as_ptr()))).unwrap();
            assert_eq!(ok["success"], serde_json::json!(true));
            assert_eq!(ok["sql"], serde_json::json!("BEGIN;\nCOMMIT;\n"));
            assert!(ok.get("error").is_none());

            let bad: serde_json::Value = serde_json::from_str(&take_string(compile_script_ffi(bad.as_ptr()))).unwrap();
            assert_eq!(bad["success"], serde_json::json!(false));
            assert!(bad.get("sql").is_none());
        }
    }

    #[test]
    fn test_version() {
        unsafe {
            let version = take_string(get_core_version_ffi());
            assert_eq!(version, env!("CARGO_PKG_VERSION"));
        }
    }
}
