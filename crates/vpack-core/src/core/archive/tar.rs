use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use tar::{Builder, EntryType, Header};
use vpack_domain::ArchiveFormat;

use crate::core::tooling::outcome::{io_error, pack_error, PackError};

use super::Archive;

/// Output stream for a tar archive, optionally compressed.
pub(crate) enum TarSink {
    Plain(File),
    Gzip(GzEncoder<File>),
    Bzip2(BzEncoder<File>),
}

impl TarSink {
    fn new(file: File, format: ArchiveFormat, compress_level: u32) -> Self {
        match format {
            ArchiveFormat::TarGz => {
                TarSink::Gzip(GzEncoder::new(file, Compression::new(compress_level.min(9))))
            }
            // bzip2 has no level 0
            ArchiveFormat::TarBz2 => TarSink::Bzip2(BzEncoder::new(
                file,
                bzip2::Compression::new(compress_level.clamp(1, 9)),
            )),
            ArchiveFormat::Tar | ArchiveFormat::Zip => TarSink::Plain(file),
        }
    }

    fn finish(self) -> io::Result<File> {
        let mut file = match self {
            TarSink::Plain(file) => file,
            TarSink::Gzip(encoder) => encoder.finish()?,
            TarSink::Bzip2(encoder) => encoder.finish()?,
        };
        file.flush()?;
        Ok(file)
    }
}

impl Write for TarSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            TarSink::Plain(file) => file.write(buf),
            TarSink::Gzip(encoder) => encoder.write(buf),
            TarSink::Bzip2(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            TarSink::Plain(file) => file.flush(),
            TarSink::Gzip(encoder) => encoder.flush(),
            TarSink::Bzip2(encoder) => encoder.flush(),
        }
    }
}

/// Tar-family writer. Links are stored as links and never dereferenced.
pub(crate) struct TarArchive {
    builder: Builder<TarSink>,
}

impl TarArchive {
    pub(crate) fn new(file: File, format: ArchiveFormat, compress_level: u32) -> Self {
        let mut builder = Builder::new(TarSink::new(file, format, compress_level));
        builder.follow_symlinks(false);
        Self { builder }
    }
}

fn source_header(source: &Path) -> Result<Header, PackError> {
    let metadata = fs::symlink_metadata(source)
        .map_err(|err| io_error("VP901", "failed to read metadata for", source, &err))?;
    let mut header = Header::new_gnu();
    header.set_metadata(&metadata);
    Ok(header)
}

impl Archive for TarArchive {
    fn add(&mut self, source: &Path, target: &str) -> Result<(), PackError> {
        self.builder
            .append_path_with_name(source, target)
            .map_err(|err| io_error("VP902", "failed to archive", source, &err))
    }

    fn add_bytes(&mut self, source: &Path, bytes: &[u8], target: &str) -> Result<(), PackError> {
        let mut header = source_header(source)?;
        header.set_entry_type(EntryType::Regular);
        header.set_size(bytes.len() as u64);
        self.builder
            .append_data(&mut header, target, bytes)
            .map_err(|err| io_error("VP902", "failed to archive", source, &err))
    }

    fn add_link(
        &mut self,
        source: &Path,
        link_target: &str,
        target: &str,
    ) -> Result<(), PackError> {
        let mut header = source_header(source)?;
        header.set_entry_type(EntryType::Symlink);
        header.set_size(0);
        self.builder
            .append_link(&mut header, target, link_target)
            .map_err(|err| io_error("VP902", "failed to archive link", source, &err))
    }

    fn finish(self: Box<Self>) -> Result<(), PackError> {
        let TarArchive { builder } = *self;
        builder
            .into_inner()
            .and_then(TarSink::finish)
            .map(drop)
            .map_err(|err| {
                pack_error(
                    "VP902",
                    format!("failed to finalize tar archive: {err}"),
                    json!({ "error": err.to_string() }),
                )
            })
    }
}
