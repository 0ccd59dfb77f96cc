use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::debug;
use vpack_domain::{EnvDescriptor, EnvKind};

use crate::core::config::Settings;
use crate::core::fs::absolute_path;
use crate::core::tooling::outcome::{pack_error, PackError};

type Detector = fn(&Path) -> Option<EnvDescriptor>;

/// Layout checks in priority order; the first match wins.
const DETECTORS: [(EnvKind, Detector); 2] = [
    (EnvKind::Venv, detect_venv),
    (EnvKind::Virtualenv, detect_virtualenv),
];

/// Picks the environment to pack: the explicit path, else `VIRTUAL_ENV`.
pub fn resolve_prefix(explicit: Option<&Path>, settings: &Settings) -> Result<PathBuf, PackError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => settings.virtual_env.clone().ok_or_else(|| {
            pack_error(
                "VP103",
                "Current environment is not a virtual environment",
                json!({ "hint": "activate an environment or pass --prefix" }),
            )
        }),
    }
}

/// Classifies the environment at `prefix` and captures its original interpreter prefix.
pub fn discover(prefix: &Path) -> Result<EnvDescriptor, PackError> {
    let prefix = absolute_path(prefix)?;
    if !prefix.exists() {
        return Err(pack_error(
            "VP101",
            format!("Environment path '{}' doesn't exist", prefix.display()),
            json!({ "path": prefix.display().to_string() }),
        ));
    }

    for (kind, detect) in DETECTORS {
        if let Some(descriptor) = detect(&prefix) {
            debug!(prefix = %prefix.display(), kind = %kind, "detected environment layout");
            return Ok(descriptor);
        }
        debug!(prefix = %prefix.display(), kind = %kind, "layout check did not match");
    }

    Err(pack_error(
        "VP102",
        format!("'{}' is not a valid virtual environment", prefix.display()),
        json!({ "path": prefix.display().to_string() }),
    ))
}

fn detect_venv(prefix: &Path) -> Option<EnvDescriptor> {
    let contents = fs::read_to_string(prefix.join("pyvenv.cfg")).ok()?;
    let home = pyvenv_home(&contents)?;
    let orig_prefix = Path::new(home)
        .parent()
        .map_or_else(|| PathBuf::from(home), Path::to_path_buf);
    let (python_lib, python_include) = find_python_lib_include(prefix)?;
    Some(EnvDescriptor::new(
        prefix,
        EnvKind::Venv,
        orig_prefix,
        python_lib,
        python_include,
    ))
}

fn detect_virtualenv(prefix: &Path) -> Option<EnvDescriptor> {
    let (python_lib, python_include) = find_python_lib_include(prefix)?;
    let contents = fs::read_to_string(prefix.join(&python_lib).join("orig-prefix.txt")).ok()?;
    let orig_prefix = contents.trim();
    if orig_prefix.is_empty() {
        return None;
    }
    Some(EnvDescriptor::new(
        prefix,
        EnvKind::Virtualenv,
        orig_prefix,
        python_lib,
        python_include,
    ))
}

/// Value of the `home` key in a `pyvenv.cfg`.
pub(crate) fn pyvenv_home(contents: &str) -> Option<&str> {
    contents.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("home")
            .then(|| value.trim())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(windows)]
fn find_python_lib_include(_prefix: &Path) -> Option<(String, String)> {
    Some(("Lib".to_string(), "Include".to_string()))
}

#[cfg(not(windows))]
fn find_python_lib_include(prefix: &Path) -> Option<(String, String)> {
    let entries = fs::read_dir(prefix.join("lib")).ok()?;
    let mut pythons: Vec<String> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with("python"))
        .collect();
    match pythons.len() {
        1 => {
            let version = pythons.remove(0);
            Some((format!("lib/{version}"), format!("include/{version}")))
        }
        0 => {
            debug!(prefix = %prefix.display(), "no python version found under lib/");
            None
        }
        _ => {
            pythons.sort();
            debug!(prefix = %prefix.display(), found = ?pythons, "multiple python versions found under lib/");
            None
        }
    }
}
