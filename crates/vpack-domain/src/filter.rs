use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Exclude,
    Include,
}

impl FilterKind {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "exclude" => Some(FilterKind::Exclude),
            "include" => Some(FilterKind::Include),
            _ => None,
        }
    }
}

/// One step of the ordered include/exclude pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub kind: FilterKind,
    pub pattern: String,
}

impl Filter {
    pub fn exclude(pattern: impl Into<String>) -> Self {
        Self {
            kind: FilterKind::Exclude,
            pattern: pattern.into(),
        }
    }

    pub fn include(pattern: impl Into<String>) -> Self {
        Self {
            kind: FilterKind::Include,
            pattern: pattern.into(),
        }
    }
}
