use std::path::Path;

use serde_json::{json, Value};
use vpack_domain::{Filter, FilterKind};

/// The single user-facing failure raised by discovery, filtering and packing.
///
/// `details` always carries a stable `code` (e.g. `VP301`) alongside any
/// structured context for the failure.
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct PackError {
    pub(crate) message: String,
    pub(crate) details: Value,
}

impl PackError {
    pub fn new(message: impl Into<String>, details: Value) -> Self {
        Self {
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn details(&self) -> &Value {
        &self.details
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.details.get("code").and_then(Value::as_str)
    }
}

pub(crate) fn pack_error(code: &str, message: impl Into<String>, details: Value) -> PackError {
    let mut merged = details;
    match merged {
        Value::Object(ref mut map) => {
            map.insert("code".into(), Value::String(code.to_string()));
        }
        Value::Null => {
            merged = json!({ "code": code });
        }
        _ => {
            merged = json!({
                "code": code,
                "details": merged,
            });
        }
    }
    PackError::new(message, merged)
}

pub(crate) fn io_error(
    code: &str,
    message: &str,
    path: &Path,
    err: &std::io::Error,
) -> PackError {
    pack_error(
        code,
        format!("{message} {}: {err}", path.display()),
        json!({ "path": path.display().to_string(), "error": err.to_string() }),
    )
}

/// Builds a [`Filter`] from a `(kind, pattern)` pair, rejecting unknown kinds.
pub fn parse_filter(kind: &str, pattern: &str) -> Result<Filter, PackError> {
    let kind = FilterKind::from_name(kind).ok_or_else(|| {
        pack_error(
            "VP204",
            format!("Unknown filter of kind '{kind}'"),
            json!({ "kind": kind, "pattern": pattern }),
        )
    })?;
    Ok(Filter {
        kind,
        pattern: pattern.to_string(),
    })
}
