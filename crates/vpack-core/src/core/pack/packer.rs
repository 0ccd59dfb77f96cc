use std::fs;
use std::path::Path;

use tracing::debug;
use vpack_domain::{EnvDescriptor, FileEntry, BIN_DIR};

use crate::core::archive::Archive;
use crate::core::tooling::outcome::{io_error, PackError};

use super::relocate::Relocation;
use super::scripts::stage_helper_scripts;
use super::shebang::rewrite_shebang;

/// Feeds manifest entries into an archive, applying shebang rewriting and
/// optional relocation, then appends the helper scripts and origin config.
pub(crate) struct Packer<'a> {
    descriptor: &'a EnvDescriptor,
    prefix: String,
    archive: Box<dyn Archive>,
    relocation: Option<Relocation>,
}

impl<'a> Packer<'a> {
    pub(crate) fn new(
        descriptor: &'a EnvDescriptor,
        archive: Box<dyn Archive>,
        relocation: Option<Relocation>,
    ) -> Self {
        if let Some(relocation) = &relocation {
            debug!(python_prefix = %relocation.python_prefix(), "relocating interpreter links");
        }
        Self {
            descriptor,
            prefix: descriptor.prefix().to_string_lossy().into_owned(),
            archive,
            relocation,
        }
    }

    pub(crate) fn add(&mut self, file: &FileEntry) -> Result<(), PackError> {
        let metadata = fs::symlink_metadata(&file.source)
            .map_err(|err| io_error("VP901", "failed to read metadata for", &file.source, &err))?;

        if metadata.file_type().is_symlink() {
            if let Some(rewritten) = self.relocated_link(&file.source)? {
                debug!(file = %file.target, link = %rewritten, "relinking");
                return self
                    .archive
                    .add_link(&file.source, &rewritten, &file.target);
            }
            return self.archive.add(&file.source, &file.target);
        }

        if metadata.is_file() && file.is_under(BIN_DIR) {
            let data = fs::read(&file.source)
                .map_err(|err| io_error("VP901", "failed to read", &file.source, &err))?;
            let (data, fixed) = rewrite_shebang(&data, &self.prefix);
            if !fixed {
                debug!(file = %file.target, "no relocatable shebang");
            }
            return self.archive.add_bytes(&file.source, &data, &file.target);
        }

        self.archive.add(&file.source, &file.target)
    }

    fn relocated_link(&self, source: &Path) -> Result<Option<String>, PackError> {
        let Some(relocation) = &self.relocation else {
            return Ok(None);
        };
        let link = fs::read_link(source)
            .map_err(|err| io_error("VP901", "failed to read link", source, &err))?;
        Ok(link.to_str().and_then(|target| relocation.rewrite_link(target)))
    }

    /// Adds the helper scripts and the origin config, then finalizes the archive.
    pub(crate) fn finish(mut self) -> Result<(), PackError> {
        let staging = tempfile::tempdir().map_err(|err| {
            io_error("VP903", "failed to create directory in", &std::env::temp_dir(), &err)
        })?;
        for (path, name) in stage_helper_scripts(staging.path())? {
            self.archive.add(&path, &format!("{BIN_DIR}/{name}"))?;
        }

        let config = self.descriptor.origin_config_path();
        let target = self.descriptor.origin_config_target();
        match &self.relocation {
            None => self.archive.add(&config, &target)?,
            Some(relocation) => {
                let current = fs::read_to_string(&config)
                    .map_err(|err| io_error("VP901", "failed to read", &config, &err))?;
                let contents = relocation.rewrite_origin_config(self.descriptor.kind(), &current);
                self.archive.add_bytes(&config, contents.as_bytes(), &target)?;
            }
        }

        self.archive.finish()
    }
}
