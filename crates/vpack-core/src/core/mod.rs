//! Environment discovery, filtering, relocation, and archive writing.

pub(crate) mod archive;
pub(crate) mod config;
pub(crate) mod env;
pub(crate) mod fs;
pub(crate) mod pack;
pub(crate) mod tooling;

#[cfg(all(test, unix))]
pub(crate) mod test_support;
