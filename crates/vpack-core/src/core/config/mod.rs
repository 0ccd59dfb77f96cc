//! Process-environment settings consumed by the packer.

pub mod settings;

pub use settings::*;
