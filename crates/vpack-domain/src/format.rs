use std::fmt;

use serde::{Deserialize, Serialize};

/// Archive families the packer can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
}

impl ArchiveFormat {
    /// Parses a format name. Accepts the short aliases `tgz` and `tbz2`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "zip" => Some(ArchiveFormat::Zip),
            "tar" => Some(ArchiveFormat::Tar),
            "tar.gz" | "tgz" => Some(ArchiveFormat::TarGz),
            "tar.bz2" | "tbz2" => Some(ArchiveFormat::TarBz2),
            _ => None,
        }
    }

    /// Infers the format from an output file name.
    #[must_use]
    pub fn infer_from_path(path: &str) -> Option<Self> {
        if path.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if path.ends_with(".tar.bz2") || path.ends_with(".tbz2") {
            Some(ArchiveFormat::TarBz2)
        } else if path.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else {
            None
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarBz2 => "tar.bz2",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Requested output format: inferred from the output name or given explicitly.
///
/// `Named` keeps the spelling the caller used so default output names match
/// it (`env.tgz` rather than `env.tar.gz`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FormatSelection {
    #[default]
    Infer,
    Named(String),
}

impl FormatSelection {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value == "infer" {
            FormatSelection::Infer
        } else {
            FormatSelection::Named(value.to_string())
        }
    }
}
