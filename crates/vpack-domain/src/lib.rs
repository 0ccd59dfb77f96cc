#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod environment;
pub mod filter;
pub mod format;

pub use environment::{EnvDescriptor, EnvKind, FileEntry, BIN_DIR};
pub use filter::{Filter, FilterKind};
pub use format::{ArchiveFormat, FormatSelection};
