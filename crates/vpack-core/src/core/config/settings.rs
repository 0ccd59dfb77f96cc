use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    #[must_use]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub virtual_env: Option<PathBuf>,
    pub progress: bool,
}

impl Settings {
    /// Builds settings from the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    #[must_use]
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        Self {
            virtual_env: snapshot
                .var("VIRTUAL_ENV")
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            progress: match snapshot.var("VPACK_PROGRESS") {
                Some(value) => {
                    let lowered = value.to_ascii_lowercase();
                    !matches!(lowered.as_str(), "0" | "false" | "no" | "off")
                }
                None => true,
            },
        }
    }
}
