use std::cell::Cell;
use std::fs::{self, File, Metadata};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use std::rc::Rc;

use serde_json::json;
use time::OffsetDateTime;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::core::fs::archive_path;
use crate::core::tooling::outcome::{io_error, pack_error, PackError};

use super::Archive;

/// Entry count above which the zip format needs ZIP64 records.
const ZIP_FILECOUNT_LIMIT: usize = 0xFFFF;
/// Member size or offset above which the zip format needs ZIP64 records.
const ZIP64_LIMIT: u64 = 0xFFFF_FFFF;

/// File wrapper that records the furthest byte written, so offsets can be
/// checked while the `ZipWriter` owns the stream.
struct TrackedFile {
    inner: File,
    position: u64,
    end: Rc<Cell<u64>>,
}

impl Write for TrackedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.position = self
            .position
            .saturating_add(written.try_into().unwrap_or(u64::MAX));
        self.end.set(self.end.get().max(self.position));
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for TrackedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = self.inner.seek(pos)?;
        Ok(self.position)
    }
}

/// Zip writer. Symlinks are dereferenced unless `zip_symlinks` is set.
pub(crate) struct ZipArchive {
    writer: ZipWriter<TrackedFile>,
    end: Rc<Cell<u64>>,
    zip_symlinks: bool,
    zip_64: bool,
    entries: usize,
    max_entries: usize,
}

impl ZipArchive {
    pub(crate) fn new(file: File, zip_symlinks: bool, zip_64: bool) -> Self {
        let end = Rc::new(Cell::new(0));
        let tracked = TrackedFile {
            inner: file,
            position: 0,
            end: Rc::clone(&end),
        };
        Self {
            writer: ZipWriter::new(tracked),
            end,
            zip_symlinks,
            zip_64,
            entries: 0,
            max_entries: ZIP_FILECOUNT_LIMIT,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_entry_limit(mut self, limit: usize) -> Self {
        self.max_entries = limit;
        self
    }

    /// Reserves room for one more entry of `size` bytes, failing when that
    /// would need ZIP64 records and they are disabled.
    fn reserve(&mut self, size: u64) -> Result<FileOptions, PackError> {
        let needs_zip64 = self.entries >= self.max_entries
            || size > ZIP64_LIMIT
            || self.end.get() > ZIP64_LIMIT;
        if needs_zip64 && !self.zip_64 {
            return Err(zip64_disabled(self.entries + 1, size));
        }
        self.entries += 1;
        Ok(FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(size >= ZIP64_LIMIT))
    }

    fn write_file(&mut self, source: &Path, target: &str) -> Result<(), PackError> {
        let metadata = fs::metadata(source)
            .map_err(|err| io_error("VP901", "failed to read metadata for", source, &err))?;
        let options = self
            .reserve(metadata.len())?
            .last_modified_time(zip_datetime(&metadata))
            .unix_permissions(unix_mode(&metadata));
        let mut file =
            File::open(source).map_err(|err| io_error("VP901", "failed to read", source, &err))?;
        self.writer
            .start_file(target, options)
            .map_err(|err| zip_error(&err, target))?;
        io::copy(&mut file, &mut self.writer)
            .map_err(|err| io_error("VP902", "failed to archive", source, &err))?;
        Ok(())
    }

    fn write_dir(&mut self, source: &Path, target: &str) -> Result<(), PackError> {
        let metadata = fs::metadata(source)
            .map_err(|err| io_error("VP901", "failed to read metadata for", source, &err))?;
        let options = self
            .reserve(0)?
            .last_modified_time(zip_datetime(&metadata))
            .unix_permissions(unix_mode(&metadata));
        self.writer
            .add_directory(target, options)
            .map_err(|err| zip_error(&err, target))
    }

    /// Stores the contents behind a directory symlink, following nested links.
    fn write_dereferenced_dir(&mut self, source: &Path, target: &str) -> Result<(), PackError> {
        for entry in WalkDir::new(source).follow_links(true) {
            let entry = entry.map_err(|err| {
                pack_error(
                    "VP901",
                    format!("failed to walk {}: {err}", source.display()),
                    json!({ "path": source.display().to_string(), "error": err.to_string() }),
                )
            })?;
            let rel = entry.path().strip_prefix(source).unwrap_or(Path::new(""));
            let nested = if rel.as_os_str().is_empty() {
                target.to_string()
            } else {
                format!("{target}/{}", archive_path(rel)?)
            };
            if entry.file_type().is_dir() {
                let mut children = fs::read_dir(entry.path())
                    .map_err(|err| io_error("VP901", "failed to list", entry.path(), &err))?;
                if children.next().is_none() {
                    self.write_dir(entry.path(), &nested)?;
                }
            } else {
                self.write_file(entry.path(), &nested)?;
            }
        }
        Ok(())
    }
}

impl Archive for ZipArchive {
    fn add(&mut self, source: &Path, target: &str) -> Result<(), PackError> {
        let metadata = fs::symlink_metadata(source)
            .map_err(|err| io_error("VP901", "failed to read metadata for", source, &err))?;
        if metadata.file_type().is_symlink() {
            if self.zip_symlinks {
                let link = fs::read_link(source)
                    .map_err(|err| io_error("VP901", "failed to read link", source, &err))?;
                self.add_link(source, &link.to_string_lossy(), target)
            } else if source.is_dir() {
                self.write_dereferenced_dir(source, target)
            } else {
                self.write_file(source, target)
            }
        } else if metadata.is_dir() {
            self.write_dir(source, target)
        } else {
            self.write_file(source, target)
        }
    }

    fn add_bytes(&mut self, source: &Path, bytes: &[u8], target: &str) -> Result<(), PackError> {
        let metadata = fs::metadata(source)
            .map_err(|err| io_error("VP901", "failed to read metadata for", source, &err))?;
        let options = self
            .reserve(bytes.len() as u64)?
            .last_modified_time(zip_datetime(&metadata))
            .unix_permissions(unix_mode(&metadata));
        self.writer
            .start_file(target, options)
            .map_err(|err| zip_error(&err, target))?;
        self.writer
            .write_all(bytes)
            .map_err(|err| io_error("VP902", "failed to archive", source, &err))
    }

    fn add_link(
        &mut self,
        source: &Path,
        link_target: &str,
        target: &str,
    ) -> Result<(), PackError> {
        if !self.zip_symlinks {
            // no link entries; store what the link resolves to
            return self.add(source, target);
        }
        let metadata = fs::symlink_metadata(source)
            .map_err(|err| io_error("VP901", "failed to read metadata for", source, &err))?;
        let options = self
            .reserve(link_target.len() as u64)?
            .last_modified_time(zip_datetime(&metadata));
        self.writer
            .add_symlink(target, link_target, options)
            .map_err(|err| zip_error(&err, target))
    }

    fn finish(self: Box<Self>) -> Result<(), PackError> {
        let ZipArchive {
            mut writer,
            end,
            zip_64,
            entries,
            ..
        } = *self;
        if !zip_64 && end.get() > ZIP64_LIMIT {
            return Err(zip64_disabled(entries, end.get()));
        }
        let mut file = writer.finish().map_err(|err| zip_error(&err, "central directory"))?;
        file.flush()
            .map_err(|err| io_error("VP902", "failed to flush", Path::new("zip archive"), &err))
    }
}

fn zip64_disabled(entries: usize, size: u64) -> PackError {
    pack_error(
        "VP301",
        "Large Zip File: ZIP64 extensions required but were disabled",
        json!({ "entries": entries, "bytes": size }),
    )
}

fn zip_error(err: &ZipError, target: &str) -> PackError {
    pack_error(
        "VP902",
        format!("failed to write {target} to zip archive: {err}"),
        json!({ "target": target, "error": err.to_string() }),
    )
}

fn zip_datetime(metadata: &Metadata) -> DateTime {
    let Ok(modified) = metadata.modified() else {
        return DateTime::default();
    };
    let stamp = OffsetDateTime::from(modified);
    let Ok(year) = u16::try_from(stamp.year()) else {
        return DateTime::default();
    };
    DateTime::from_date_and_time(
        year,
        u8::from(stamp.month()),
        stamp.day(),
        stamp.hour(),
        stamp.minute(),
        stamp.second(),
    )
    .unwrap_or_default()
}

#[cfg(unix)]
fn unix_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn unix_mode(metadata: &Metadata) -> u32 {
    if metadata.is_dir() {
        0o755
    } else if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
