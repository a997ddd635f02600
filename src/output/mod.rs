pub mod human;

use serde_json::{Value, json};

use crate::error::SyncError;

/// Envelope wrapped around every JSON response.
pub fn success(command: &str, data: Value) -> Value {
    json!({
        "status": "ok",
        "command": command,
        "data": data,
        "error": null
    })
}

pub fn error(command: &str, code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "command": command,
        "data": null,
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Error envelope for an `anyhow` error, using the sync error code when the
/// root cause is a [`SyncError`].
pub fn error_from(command: &str, err: &anyhow::Error) -> Value {
    let code = err
        .downcast_ref::<SyncError>()
        .map(SyncError::code)
        .unwrap_or("general_error");
    error(command, code, &format!("{err:#}"))
}
