use std::collections::HashSet;
use std::fs;
use std::path::Path;

use vpack_domain::{EnvDescriptor, FileEntry, BIN_DIR};
use walkdir::WalkDir;

use crate::core::fs::archive_path;
use crate::core::tooling::outcome::{io_error, pack_error, PackError};

/// Scripts that hardcode the environment prefix; a relocatable `activate`
/// is written in their place at pack time.
const ACTIVATION_SCRIPTS: [&str; 4] = ["activate", "activate.csh", "activate.fish", "deactivate"];

/// Enumerates every file of the environment in filesystem order.
///
/// Symlinks are never followed: a symlinked directory is recorded as one
/// entry. Empty directories are recorded so they survive extraction.
pub(crate) fn collect_files(descriptor: &EnvDescriptor) -> Result<Vec<FileEntry>, PackError> {
    let prefix = descriptor.prefix();
    let mut remove: HashSet<String> = ACTIVATION_SCRIPTS
        .iter()
        .map(|name| format!("{BIN_DIR}/{name}"))
        .collect();
    remove.insert(descriptor.origin_config_target());

    let mut files = Vec::new();
    let entries = fs::read_dir(prefix).map_err(|err| io_error("VP901", "failed to list", prefix, &err))?;
    for entry in entries {
        let entry = entry.map_err(|err| io_error("VP901", "failed to list", prefix, &err))?;
        let full_path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|err| io_error("VP901", "failed to inspect", &full_path, &err))?;
        if file_type.is_symlink() || full_path.is_file() {
            let target = archive_path(Path::new(&entry.file_name()))?;
            files.push(FileEntry::new(full_path, target));
        } else if file_type.is_dir() {
            walk_dir(prefix, &full_path, &mut files)?;
        }
    }

    files.retain(|file| !(remove.contains(&file.target) || is_junk(&file.target)));
    Ok(files)
}

fn walk_dir(prefix: &Path, dir: &Path, files: &mut Vec<FileEntry>) -> Result<(), PackError> {
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).display().to_string();
            pack_error(
                "VP901",
                format!("failed to walk {path}: {err}"),
                serde_json::json!({ "path": path, "error": err.to_string() }),
            )
        })?;
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(prefix) else {
            continue;
        };
        if entry.file_type().is_dir() {
            let mut children =
                fs::read_dir(path).map_err(|err| io_error("VP901", "failed to list", path, &err))?;
            if children.next().is_none() {
                files.push(FileEntry::new(path, archive_path(rel)?));
            }
        } else {
            files.push(FileEntry::new(path, archive_path(rel)?));
        }
    }
    Ok(())
}

fn is_junk(target: &str) -> bool {
    const DS_STORE: &str = ".ds_store";
    target.ends_with('~')
        || (target.len() >= DS_STORE.len()
            && target.is_char_boundary(target.len() - DS_STORE.len())
            && target[target.len() - DS_STORE.len()..].eq_ignore_ascii_case(DS_STORE))
}
