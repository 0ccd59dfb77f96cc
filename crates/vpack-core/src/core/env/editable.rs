use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde_json::json;
use vpack_domain::EnvDescriptor;

use crate::core::fs::normalize_path;
use crate::core::tooling::outcome::{io_error, pack_error, PackError};

/// Fails when any `.pth` file in site-packages points outside the environment.
pub(crate) fn check_no_editable_packages(descriptor: &EnvDescriptor) -> Result<(), PackError> {
    let site_packages = descriptor.site_packages();
    let entries = match fs::read_dir(&site_packages) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(io_error(
                "VP901",
                "failed to list",
                &site_packages,
                &err,
            ))
        }
    };

    let mut editable = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|err| io_error("VP901", "failed to list", &site_packages, &err))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("pth") || !path.is_file() {
            continue;
        }
        let contents = fs::read(&path).map_err(|err| io_error("VP901", "failed to read", &path, &err))?;
        let contents = String::from_utf8_lossy(&contents);
        editable.extend(outside_references(&contents, &site_packages, descriptor.prefix()));
    }

    if editable.is_empty() {
        return Ok(());
    }
    let listing = editable
        .iter()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    Err(pack_error(
        "VP104",
        format!(
            "Cannot pack an environment with editable packages\n\
             installed (e.g. from `python setup.py develop` or\n\
             `pip install -e`). Editable packages found:\n\n{listing}"
        ),
        json!({ "editable": editable.into_iter().collect::<Vec<_>>() }),
    ))
}

/// Lines of a `.pth` file whose location resolves outside `prefix`.
fn outside_references(contents: &str, dir: &Path, prefix: &Path) -> Vec<String> {
    contents
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .filter(|line| !normalize_path(&dir.join(line)).starts_with(prefix))
        .map(str::to_string)
        .collect()
}
