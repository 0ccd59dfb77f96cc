use std::fs;
use std::path::{Path, PathBuf};

use crate::core::tooling::outcome::{io_error, PackError};

/// A helper script shipped inside every packed environment's bin directory.
pub(crate) struct HelperScript {
    pub(crate) name: &'static str,
    pub(crate) contents: &'static [u8],
}

pub(crate) const HELPER_SCRIPTS: &[HelperScript] = &[HelperScript {
    name: "activate",
    contents: include_bytes!("../../../scripts/common/activate"),
}];

/// Writes every helper script into `dir` as an executable file and returns
/// `(path, name)` pairs in declaration order.
pub(crate) fn stage_helper_scripts(dir: &Path) -> Result<Vec<(PathBuf, &'static str)>, PackError> {
    HELPER_SCRIPTS
        .iter()
        .map(|script| {
            let path = dir.join(script.name);
            fs::write(&path, script.contents)
                .map_err(|err| io_error("VP903", "failed to stage helper script", &path, &err))?;
            make_executable(&path)?;
            Ok((path, script.name))
        })
        .collect()
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), PackError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|err| io_error("VP903", "failed to set permissions on", path, &err))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), PackError> {
    Ok(())
}
