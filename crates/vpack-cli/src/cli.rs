use std::path::PathBuf;

use clap::{value_parser, ArgAction, ArgMatches, Parser};
use vpack_core::{parse_filter, Filter, PackError};

pub const FORMATS: [&str; 7] = ["infer", "zip", "tar.gz", "tgz", "tar.bz2", "tbz2", "tar"];

#[derive(Parser, Debug)]
#[command(
    name = "venv-pack",
    version,
    about = "Package an existing virtual environment into an archive file."
)]
#[allow(clippy::struct_excessive_bools)]
pub struct VenvPackCli {
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Full path to environment prefix. Default is current environment."
    )]
    pub prefix: Option<PathBuf>,
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "The path of the output file. Defaults to the environment name with a `.tar.gz` suffix (e.g. `my_env.tar.gz`)."
    )]
    pub output: Option<PathBuf>,
    #[arg(
        long,
        default_value = "infer",
        value_parser = FORMATS,
        help = "The archival format to use. By default this is inferred from the output file extension."
    )]
    pub format: String,
    #[arg(
        long,
        value_name = "PATH",
        help = "If provided, will be used as the new prefix path for linking `python` in the packaged environment."
    )]
    pub python_prefix: Option<PathBuf>,
    #[arg(
        long,
        default_value_t = 4,
        value_parser = value_parser!(u32).range(0..=9),
        help = "The compression level to use, from 0 to 9. Higher numbers decrease output file size at the expense of compression time. Ignored for zip."
    )]
    pub compress_level: u32,
    #[arg(
        long,
        help = "Store symbolic links in the zip archive, instead of the linked files. Ignored if format isn't zip."
    )]
    pub zip_symlinks: bool,
    #[arg(long, help = "Disable ZIP64 extensions.")]
    pub no_zip_64: bool,
    #[arg(
        long,
        value_name = "PATTERN",
        action = ArgAction::Append,
        help = "Exclude files matching this pattern"
    )]
    pub exclude: Vec<String>,
    #[arg(
        long,
        value_name = "PATTERN",
        action = ArgAction::Append,
        help = "Re-add excluded files matching this pattern"
    )]
    pub include: Vec<String>,
    #[arg(short, long, help = "Overwrite any existing archive at the output path.")]
    pub force: bool,
    #[arg(short, long, help = "Do not report progress")]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)")]
    pub verbose: u8,
    #[arg(long, help = "Emit {status,message,details} JSON envelopes")]
    pub json: bool,
}

/// Rebuilds the `--exclude`/`--include` sequence in command-line order.
pub fn ordered_filters(matches: &ArgMatches) -> Result<Vec<Filter>, PackError> {
    let mut indexed = Vec::new();
    for kind in ["exclude", "include"] {
        let (Some(indices), Some(values)) = (
            matches.indices_of(kind),
            matches.get_many::<String>(kind),
        ) else {
            continue;
        };
        for (index, pattern) in indices.zip(values) {
            indexed.push((index, parse_filter(kind, pattern)?));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, filter)| filter).collect())
}
