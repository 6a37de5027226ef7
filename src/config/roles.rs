//! Role prompt table loaded from `roles.json`.
//!
//! The file is a flat JSON object mapping the label shown in the role
//! selector to the system instruction sent with each request:
//!
//! ```json
//! {
//!   "Assistant": "",
//!   "Translator": "Translate everything the user says into English."
//! }
//! ```
//!
//! Entry order in the file is the selector order. An empty instruction means
//! no system message is sent. Unlike the other local files, a missing or
//! malformed table is fatal: there is nothing to put in the selector.
//! `assets/roles.json` is a ready-made table to copy into the config dir.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Why the role table could not be loaded.
#[derive(Debug, Error)]
pub enum RoleTableError {
    #[error("role table not found at {0} (copy assets/roles.json there to get started)")]
    NotFound(PathBuf),

    #[error("cannot read role table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("role table {path} is not a JSON object of strings: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("role table {0} defines no roles")]
    Empty(PathBuf),
}

/// Ordered, read-only mapping of role name → system instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleTable {
    entries: Vec<(String, String)>,
}

impl RoleTable {
    /// Load the table from `path`.
    pub fn load_from(path: &Path) -> Result<Self, RoleTableError> {
        if !path.exists() {
            return Err(RoleTableError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| RoleTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
            .map_err(|source| RoleTableError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut entries = Vec::with_capacity(map.len());
        for (name, value) in map {
            let instruction: String =
                serde_json::from_value(value).map_err(|source| RoleTableError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
            entries.push((name, instruction));
        }

        if entries.is_empty() {
            return Err(RoleTableError::Empty(path.to_path_buf()));
        }

        log::info!("loaded {} roles from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    /// Build a table from in-memory pairs (tests and embedding).
    pub fn from_pairs<I, N, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(n, p)| (n.into(), p.into()))
                .collect(),
        }
    }

    /// Role names in selector order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Instruction for `name`, or `None` when the role is unknown.
    pub fn instruction(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.as_str())
    }

    /// The first role, used as the initial selection.
    pub fn first(&self) -> Option<&str> {
        self.entries.first().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
