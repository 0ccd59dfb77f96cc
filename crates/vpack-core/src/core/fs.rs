use std::env;
use std::path::{Component, Path, PathBuf};

use serde_json::json;

use crate::core::tooling::outcome::{pack_error, PackError};

/// Lexically normalizes `path`, dropping `.` and resolving `..` without
/// touching the filesystem. Symlinks are left alone.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Absolute, lexically normalized form of `path`, relative to the current directory.
pub(crate) fn absolute_path(path: &Path) -> Result<PathBuf, PackError> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let cwd = env::current_dir().map_err(|err| {
        pack_error(
            "VP903",
            "unable to determine current directory",
            json!({ "error": err.to_string() }),
        )
    })?;
    Ok(normalize_path(&cwd.join(path)))
}

/// `/`-joined archive path for `rel`, which must be relative.
/// Names that are not valid UTF-8 are rejected with `VP105`.
pub(crate) fn archive_path(rel: &Path) -> Result<String, PackError> {
    let mut parts = Vec::new();
    for component in rel.components() {
        if let Component::Normal(part) = component {
            let part = part.to_str().ok_or_else(|| {
                let path = rel.display().to_string();
                pack_error(
                    "VP105",
                    format!("File name is not valid UTF-8: {path}"),
                    json!({
                        "path": path,
                        "hint": "rename the file or exclude it from the environment",
                    }),
                )
            })?;
            parts.push(part);
        }
    }
    Ok(parts.join("/"))
}
