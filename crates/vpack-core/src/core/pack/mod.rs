//! Orchestration: resolve the output, stage an archive next to it, stream the
//! manifest through a [`Packer`](packer::Packer), and move the result into place.

mod packer;
mod relocate;
mod scripts;
pub mod shebang;


use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;
use vpack_domain::{ArchiveFormat, Filter, FormatSelection};

use crate::core::archive::{open_archive, ArchiveOptions};
use crate::core::config::Settings;
use crate::core::env::discovery::resolve_prefix;
use crate::core::env::Env;
use crate::core::tooling::outcome::{io_error, pack_error, PackError};
use crate::core::tooling::progress::Progress;

use self::packer::Packer;
use self::relocate::Relocation;

const DEFAULT_COMPRESS_LEVEL: u32 = 4;
const MAX_COMPRESS_LEVEL: u32 = 9;

/// Knobs for writing one archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackOptions {
    /// Output path; defaults to `<env name>.<format>` in the current directory.
    pub output: Option<PathBuf>,
    pub format: FormatSelection,
    /// Install prefix of the interpreter the unpacked environment should link to.
    pub python_prefix: Option<PathBuf>,
    /// Log progress and draw a progress bar on stderr.
    pub verbose: bool,
    /// Overwrite an existing output file.
    pub force: bool,
    /// 0-9; ignored for zip and plain tar.
    pub compress_level: u32,
    /// Store symlinks in zip archives instead of the files they point to.
    pub zip_symlinks: bool,
    pub zip_64: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            output: None,
            format: FormatSelection::Infer,
            python_prefix: None,
            verbose: false,
            force: false,
            compress_level: DEFAULT_COMPRESS_LEVEL,
            zip_symlinks: false,
            zip_64: true,
        }
    }
}

/// A full pack invocation: which environment, which filters, which options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackRequest {
    /// Environment prefix; falls back to `VIRTUAL_ENV`.
    pub prefix: Option<PathBuf>,
    /// Applied in order, later filters win.
    pub filters: Vec<Filter>,
    pub options: PackOptions,
}

/// Packs an environment end to end and returns the archive path.
pub fn pack(request: &PackRequest) -> Result<PathBuf, PackError> {
    pack_with_settings(request, &Settings::from_env())
}

pub(crate) fn pack_with_settings(
    request: &PackRequest,
    settings: &Settings,
) -> Result<PathBuf, PackError> {
    let prefix = resolve_prefix(request.prefix.as_deref(), settings)?;
    if request.options.verbose {
        info!("Collecting packages...");
    }
    let env = Env::new(&prefix)?.apply_filters(&request.filters)?;
    write_env(&env, &request.options, settings)
}

/// Chooses the output path and archive format.
///
/// Without an output or format this is `<name>.tar.gz`. An explicit format
/// keeps the caller's spelling in the default name (`env.tgz`).
pub fn resolve_output(
    output: Option<&Path>,
    format: &FormatSelection,
    name: &str,
) -> Result<(PathBuf, ArchiveFormat), PackError> {
    match format {
        FormatSelection::Infer => match output {
            None => Ok((
                PathBuf::from(format!("{name}.{}", ArchiveFormat::TarGz)),
                ArchiveFormat::TarGz,
            )),
            Some(output) => ArchiveFormat::infer_from_path(&output.to_string_lossy())
                .map(|format| (output.to_path_buf(), format))
                .ok_or_else(|| {
                    pack_error(
                        "VP202",
                        format!("Unknown file extension '{}'", output.display()),
                        json!({ "output": output.display().to_string() }),
                    )
                }),
        },
        FormatSelection::Named(spelling) => {
            let format = ArchiveFormat::from_name(spelling).ok_or_else(|| {
                pack_error(
                    "VP201",
                    format!("Unknown format '{spelling}'"),
                    json!({
                        "format": spelling,
                        "supported": ["zip", "tar.gz", "tgz", "tar.bz2", "tbz2", "tar"],
                    }),
                )
            })?;
            let output = output.map_or_else(
                || PathBuf::from(format!("{name}.{spelling}")),
                Path::to_path_buf,
            );
            Ok((output, format))
        }
    }
}

impl Env {
    /// Writes this environment's active files into an archive and returns
    /// its path. Nothing is left at the output path on failure.
    pub fn pack(&self, options: &PackOptions) -> Result<PathBuf, PackError> {
        write_env(self, options, &Settings::from_env())
    }
}

fn write_env(env: &Env, options: &PackOptions, settings: &Settings) -> Result<PathBuf, PackError> {
    let (output, format) = resolve_output(options.output.as_deref(), &options.format, &env.name())?;

    if output.exists() && !options.force {
        return Err(pack_error(
            "VP203",
            format!("File '{}' already exists", output.display()),
            json!({ "output": output.display().to_string(), "hint": "pass --force to overwrite" }),
        ));
    }
    if options.compress_level > MAX_COMPRESS_LEVEL {
        return Err(pack_error(
            "VP207",
            format!(
                "compress-level must be between 0 and {MAX_COMPRESS_LEVEL}, got {}",
                options.compress_level
            ),
            json!({ "compress_level": options.compress_level }),
        ));
    }
    let relocation = options
        .python_prefix
        .as_deref()
        .map(|prefix| Relocation::new(env.descriptor(), prefix))
        .transpose()?;

    if options.verbose {
        info!(
            "Packing environment at '{}' to '{}'",
            env.prefix().display(),
            output.display()
        );
    }

    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = tempfile::Builder::new()
        .prefix(".venv-pack-")
        .suffix(".partial")
        .tempfile_in(parent)
        .map_err(|err| io_error("VP903", "failed to create staging file in", parent, &err))?;
    let file = staged
        .as_file()
        .try_clone()
        .map_err(|err| io_error("VP903", "failed to open staging file", staged.path(), &err))?;

    let archive_options = ArchiveOptions {
        compress_level: options.compress_level,
        zip_symlinks: options.zip_symlinks,
        zip_64: options.zip_64,
    };
    let mut packer = Packer::new(
        env.descriptor(),
        open_archive(file, format, &archive_options),
        relocation,
    );
    for file in Progress::stderr(env.files().iter(), options.verbose && settings.progress) {
        packer.add(file)?;
    }
    packer.finish()?;

    let persisted = if options.force {
        staged.persist(&output)
    } else {
        staged.persist_noclobber(&output)
    };
    persisted.map_err(|err| io_error("VP903", "failed to move archive to", &output, &err.error))?;

    info!(
        output = %output.display(),
        format = %format,
        files = env.len(),
        "packed environment"
    );
    Ok(output)
}
