use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the scripts directory inside an environment.
#[cfg(windows)]
pub const BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
pub const BIN_DIR: &str = "bin";

const PYVENV_CFG: &str = "pyvenv.cfg";
const ORIG_PREFIX_TXT: &str = "orig-prefix.txt";

/// The on-disk convention an environment follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvKind {
    /// Created by the stdlib `venv` module; records `home = ...` in `pyvenv.cfg`.
    Venv,
    /// Created by legacy `virtualenv`; records the prefix in `orig-prefix.txt`.
    Virtualenv,
}

impl EnvKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EnvKind::Venv => "venv",
            EnvKind::Virtualenv => "virtualenv",
        }
    }
}

impl fmt::Display for EnvKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one packageable environment and the interpreter it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvDescriptor {
    prefix: PathBuf,
    kind: EnvKind,
    orig_prefix: PathBuf,
    python_lib: String,
    python_include: String,
}

impl EnvDescriptor {
    /// `python_lib` and `python_include` are `/`-separated and relative to `prefix`.
    pub fn new(
        prefix: impl Into<PathBuf>,
        kind: EnvKind,
        orig_prefix: impl Into<PathBuf>,
        python_lib: impl Into<String>,
        python_include: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            kind,
            orig_prefix: orig_prefix.into(),
            python_lib: python_lib.into(),
            python_include: python_include.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn kind(&self) -> EnvKind {
        self.kind
    }

    pub fn orig_prefix(&self) -> &Path {
        &self.orig_prefix
    }

    pub fn python_lib(&self) -> &str {
        &self.python_lib
    }

    pub fn python_include(&self) -> &str {
        &self.python_include
    }

    /// Last component of the prefix, used for default archive names.
    pub fn name(&self) -> String {
        self.prefix
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn site_packages(&self) -> PathBuf {
        self.prefix.join(&self.python_lib).join("site-packages")
    }

    /// Archive-relative path of the file that records `orig_prefix`.
    pub fn origin_config_target(&self) -> String {
        match self.kind {
            EnvKind::Venv => PYVENV_CFG.to_string(),
            EnvKind::Virtualenv => format!("{}/{ORIG_PREFIX_TXT}", self.python_lib),
        }
    }

    pub fn origin_config_path(&self) -> PathBuf {
        match self.kind {
            EnvKind::Venv => self.prefix.join(PYVENV_CFG),
            EnvKind::Virtualenv => self.prefix.join(&self.python_lib).join(ORIG_PREFIX_TXT),
        }
    }

    /// Basename of the versioned library directory, e.g. `python3.11`.
    pub fn python_version_dir(&self) -> &str {
        self.python_lib
            .rsplit('/')
            .next()
            .unwrap_or(self.python_lib.as_str())
    }
}

/// A single archive record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute path on the source filesystem. May be a directory or a symlink.
    pub source: PathBuf,
    /// `/`-separated path relative to the archive root, e.g. `lib/foo/bar.py`.
    pub target: String,
}

impl FileEntry {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// True when `target` sits below the top-level directory `dir`.
    pub fn is_under(&self, dir: &str) -> bool {
        self.target
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}
