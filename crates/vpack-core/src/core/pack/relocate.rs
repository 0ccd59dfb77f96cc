use std::path::{Path, MAIN_SEPARATOR};

use serde_json::json;
use vpack_domain::{EnvDescriptor, EnvKind, BIN_DIR};

use crate::core::fs::normalize_path;
use crate::core::tooling::outcome::{pack_error, PackError};

/// Replaces a leading `from` in a link target with `to`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RewriteRule {
    from: String,
    to: String,
    /// Replacement used when the link target is exactly `from`.
    exact: Option<String>,
}

impl RewriteRule {
    fn new(from: String, to: String) -> Self {
        Self {
            from,
            to,
            exact: None,
        }
    }

    pub(crate) fn apply(&self, link_target: &str) -> Option<String> {
        if link_target == self.from {
            if let Some(exact) = &self.exact {
                return Some(exact.clone());
            }
        }
        link_target
            .strip_prefix(self.from.as_str())
            .map(|rest| format!("{}{rest}", self.to))
    }
}

/// How links and the origin config are retargeted at a new interpreter prefix.
#[derive(Clone, Debug)]
pub(crate) struct Relocation {
    orig_prefix: String,
    python_prefix: String,
    rules: Vec<RewriteRule>,
}

impl Relocation {
    /// `python_prefix` is the install prefix of the target interpreter
    /// (`/usr`, not `/usr/bin/python3`).
    pub(crate) fn new(descriptor: &EnvDescriptor, python_prefix: &Path) -> Result<Self, PackError> {
        if !python_prefix.is_absolute() {
            return Err(pack_error(
                "VP206",
                "python-prefix must be an absolute path",
                json!({ "python_prefix": python_prefix.display().to_string() }),
            ));
        }
        let new = normalize_path(python_prefix);
        let orig = descriptor.orig_prefix();
        let rules = match descriptor.kind() {
            EnvKind::Venv => {
                let mut rule = RewriteRule::new(
                    display(&orig.join(BIN_DIR).join("python")),
                    display(&new.join(BIN_DIR).join("python")),
                );
                if cfg!(not(windows)) {
                    rule.exact = Some(display(
                        &new.join(BIN_DIR).join(descriptor.python_version_dir()),
                    ));
                }
                vec![rule]
            }
            EnvKind::Virtualenv => vec![
                RewriteRule::new(
                    with_separator(&orig.join(descriptor.python_lib())),
                    with_separator(&new.join(descriptor.python_lib())),
                ),
                RewriteRule::new(
                    display(&orig.join(descriptor.python_include())),
                    display(&new.join(descriptor.python_include())),
                ),
            ],
        };
        Ok(Self {
            orig_prefix: display(orig),
            python_prefix: display(&new),
            rules,
        })
    }

    #[must_use]
    pub(crate) fn python_prefix(&self) -> &str {
        &self.python_prefix
    }

    /// New link target for `link_target`, if any rule covers it. First match wins.
    pub(crate) fn rewrite_link(&self, link_target: &str) -> Option<String> {
        self.rules.iter().find_map(|rule| rule.apply(link_target))
    }

    /// Contents of the origin config for the relocated environment.
    pub(crate) fn rewrite_origin_config(&self, kind: EnvKind, current: &str) -> String {
        match kind {
            EnvKind::Venv => current.replace(&self.orig_prefix, &self.python_prefix),
            EnvKind::Virtualenv => self.python_prefix.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn with_separator(path: &Path) -> String {
    let mut out = display(path);
    if !out.ends_with(MAIN_SEPARATOR) {
        out.push(MAIN_SEPARATOR);
    }
    out
}
