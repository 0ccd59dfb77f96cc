//! The packaging session: a discovered environment plus its active and
//! excluded file lists.

pub mod discovery;
mod editable;
mod manifest;


use std::fmt;
use std::path::Path;
use std::sync::Arc;

use globset::{GlobBuilder, GlobMatcher};
use serde_json::json;
use tracing::debug;
use vpack_domain::{EnvDescriptor, EnvKind, FileEntry, Filter, FilterKind};

use crate::core::tooling::outcome::{pack_error, PackError};

/// A virtual environment ready for packaging.
///
/// `exclude` and `include` never mutate the receiver; each returns a new
/// `Env` so intermediate states stay inspectable.
#[derive(Clone, Debug)]
pub struct Env {
    descriptor: Arc<EnvDescriptor>,
    files: Vec<FileEntry>,
    excluded: Vec<FileEntry>,
}

impl Env {
    /// Discovers the environment at `prefix`, rejects editable installs, and
    /// collects its manifest.
    pub fn new(prefix: &Path) -> Result<Self, PackError> {
        let descriptor = discovery::discover(prefix)?;
        editable::check_no_editable_packages(&descriptor)?;
        let files = manifest::collect_files(&descriptor)?;
        debug!(
            prefix = %descriptor.prefix().display(),
            kind = %descriptor.kind(),
            files = files.len(),
            "collected environment manifest"
        );
        Ok(Self::from_parts(descriptor, files))
    }

    /// Wraps an already-built manifest without touching the filesystem.
    #[must_use]
    pub fn from_parts(descriptor: EnvDescriptor, files: Vec<FileEntry>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            files,
            excluded: Vec::new(),
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> &EnvDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn prefix(&self) -> &Path {
        self.descriptor.prefix()
    }

    #[must_use]
    pub fn kind(&self) -> EnvKind {
        self.descriptor.kind()
    }

    #[must_use]
    pub fn orig_prefix(&self) -> &Path {
        self.descriptor.orig_prefix()
    }

    /// Name of the environment directory.
    #[must_use]
    pub fn name(&self) -> String {
        self.descriptor.name()
    }

    #[must_use]
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    #[must_use]
    pub fn excluded(&self) -> &[FileEntry] {
        &self.excluded
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.files.iter()
    }

    /// Drops every active file whose target matches `pattern`.
    pub fn exclude(&self, pattern: &str) -> Result<Self, PackError> {
        let matcher = compile_pattern(pattern)?;
        let mut excluded = self.excluded.clone();
        let (matched, files): (Vec<_>, Vec<_>) = self
            .files
            .iter()
            .cloned()
            .partition(|file| matcher.is_match(&file.target));
        excluded.extend(matched);
        Ok(self.with_files(files, excluded))
    }

    /// Re-adds every excluded file whose target matches `pattern`.
    pub fn include(&self, pattern: &str) -> Result<Self, PackError> {
        let matcher = compile_pattern(pattern)?;
        let mut files = self.files.clone();
        let (matched, excluded): (Vec<_>, Vec<_>) = self
            .excluded
            .iter()
            .cloned()
            .partition(|file| matcher.is_match(&file.target));
        files.extend(matched);
        Ok(self.with_files(files, excluded))
    }

    /// Applies `filters` in order; later filters win.
    pub fn apply_filters(&self, filters: &[Filter]) -> Result<Self, PackError> {
        filters
            .iter()
            .try_fold(self.clone(), |env, filter| match filter.kind {
                FilterKind::Exclude => env.exclude(&filter.pattern),
                FilterKind::Include => env.include(&filter.pattern),
            })
    }

    fn with_files(&self, files: Vec<FileEntry>, excluded: Vec<FileEntry>) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            files,
            excluded,
        }
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Env<'{}', {} files>",
            self.descriptor.prefix().display(),
            self.files.len()
        )
    }
}

impl<'a> IntoIterator for &'a Env {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Compiles a shell-style pattern: `*`, `?` and `[...]` only. Braces and
/// backslashes match themselves.
fn compile_pattern(pattern: &str) -> Result<GlobMatcher, PackError> {
    GlobBuilder::new(&literal_braces(pattern))
        .backslash_escape(false)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|err| {
            pack_error(
                "VP205",
                format!("Invalid file pattern '{pattern}': {err}"),
                json!({ "pattern": pattern, "error": err.to_string() }),
            )
        })
}

/// Wraps `{` and `}` outside character classes in `[...]` so they are not
/// read as alternation.
fn literal_braces(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    while let Some(ch) = chars.next() {
        if in_class {
            out.push(ch);
            in_class = ch != ']';
            continue;
        }
        match ch {
            '{' | '}' => {
                out.push('[');
                out.push(ch);
                out.push(']');
            }
            '[' => {
                out.push(ch);
                in_class = true;
                if let Some(&'!') = chars.peek() {
                    out.push('!');
                    chars.next();
                }
                // a leading `]` is part of the class
                if let Some(&']') = chars.peek() {
                    out.push(']');
                    chars.next();
                }
            }
            _ => out.push(ch),
        }
    }
    out
}
