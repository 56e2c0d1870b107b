//! JSON output for the CLI
//!
//! - Output: one JSON object per command on stdout
//! - Success: `{"status": "ok", "data": ...}`
//! - Failure: `{"status": "error", "code": ..., "message": ...}`
//! - Logs go to stderr and never mix with responses

use std::io::{self, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

fn write_line(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Success response envelope
pub fn response_envelope(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

/// Error response envelope. Run failures also carry their error category.
pub fn error_envelope(error: &CliError) -> Value {
    let mut response = json!({
        "status": "error",
        "code": error.code_str(),
        "message": error.message()
    });
    if let (Some(category), Some(obj)) = (error.category(), response.as_object_mut()) {
        obj.insert("category".to_string(), json!(category.as_str()));
    }
    response
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_line(&response_envelope(data))
}

/// Write an error response to stdout
pub fn write_error(error: &CliError) -> CliResult<()> {
    write_line(&error_envelope(error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;

    #[test]
    fn test_envelopes() {
        assert_eq!(
            response_envelope(json!({"policies": []})),
            json!({"status": "ok", "data": {"policies": []}})
        );

        let err = CliError::config_error("bad");
        assert_eq!(
            error_envelope(&err),
            json!({"status": "error", "code": "TABSIGHT_CLI_CONFIG_ERROR", "message": "bad"})
        );

        let err = CliError::run_failed(ErrorCategory::Resolution, "missing roles");
        assert_eq!(error_envelope(&err)["category"], "resolution");
    }
}
