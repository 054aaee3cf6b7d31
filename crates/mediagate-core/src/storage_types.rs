use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Backend adapter variants
///
/// The closed set of concrete backends that can be registered at startup.
/// Dispatch happens on this tag in the storage factory; nothing inspects
/// adapter types at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote storage API reached over HTTP
    Http,
    /// Process-local map, for development and tests
    Memory,
}

impl BackendKind {
    /// Whether `put` on this kind of backend is a keyed overwrite by default,
    /// making a retry after an ambiguous failure safe.
    pub fn default_idempotent_writes(&self) -> bool {
        match self {
            BackendKind::Http => false,
            BackendKind::Memory => true,
        }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(BackendKind::Http),
            "memory" => Ok(BackendKind::Memory),
            _ => Err(anyhow::anyhow!("Invalid storage backend kind: {}", s)),
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BackendKind::Http => write!(f, "http"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}
