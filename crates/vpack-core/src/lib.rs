#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

mod core;

pub use vpack_domain::{
    ArchiveFormat, EnvDescriptor, EnvKind, FileEntry, Filter, FilterKind, FormatSelection, BIN_DIR,
};

pub use crate::core::config::{EnvSnapshot, Settings};
pub use crate::core::env::discovery::{discover, resolve_prefix};
pub use crate::core::env::Env;
pub use crate::core::pack::shebang::rewrite_shebang;
pub use crate::core::pack::{pack, resolve_output, PackOptions, PackRequest};
pub use crate::core::tooling::outcome::{parse_filter, PackError};
