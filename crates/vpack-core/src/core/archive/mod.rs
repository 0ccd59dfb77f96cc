//! Archive writers behind one small contract.
//!
//! - `tar.rs`: tar / tar.gz / tar.bz2, symlinks stored natively
//! - `zip.rs`: zip with optional symlink entries and ZIP64 enforcement

mod tar;
mod zip;

#[cfg(all(test, unix))]
mod tests;

use std::fs::File;
use std::path::Path;

use vpack_domain::ArchiveFormat;

use crate::core::tooling::outcome::PackError;

pub(crate) use self::tar::TarArchive;
pub(crate) use self::zip::ZipArchive;

/// Destination for packed entries. Targets are archive-relative and `/`-separated.
pub(crate) trait Archive {
    /// Adds `source` as-is. Directories are added without their contents.
    fn add(&mut self, source: &Path, target: &str) -> Result<(), PackError>;

    /// Adds `bytes` as the content of `target`; `source` supplies metadata.
    fn add_bytes(&mut self, source: &Path, bytes: &[u8], target: &str) -> Result<(), PackError>;

    /// Adds a symlink at `target` pointing to `link_target`; `source` supplies metadata.
    fn add_link(&mut self, source: &Path, link_target: &str, target: &str)
        -> Result<(), PackError>;

    /// Writes trailers and flushes the underlying file.
    fn finish(self: Box<Self>) -> Result<(), PackError>;
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ArchiveOptions {
    pub(crate) compress_level: u32,
    pub(crate) zip_symlinks: bool,
    pub(crate) zip_64: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            compress_level: 4,
            zip_symlinks: false,
            zip_64: true,
        }
    }
}

pub(crate) fn open_archive(
    file: File,
    format: ArchiveFormat,
    options: &ArchiveOptions,
) -> Box<dyn Archive> {
    match format {
        ArchiveFormat::Zip => Box::new(ZipArchive::new(file, options.zip_symlinks, options.zip_64)),
        ArchiveFormat::Tar | ArchiveFormat::TarGz | ArchiveFormat::TarBz2 => {
            Box::new(TarArchive::new(file, format, options.compress_level))
        }
    }
}
