//! # Configuration File Parser
//!
//! Reads and parses `dsqgen.toml`, the optional configuration file that sets
//! defaults for `dsqgen generate` without CLI flags. Supports:
//!
//! - `[resources]` — directories of distribution and template overrides
//! - `[generate]` — default seed and query selection
//! - `[row_counts]` — per-relation row counts for `rowcount(...)`
//!
//! Example `dsqgen.toml`:
//!
//! ```toml
//! [resources]
//! distributions = "./dists"
//! templates = "./query_templates"
//!
//! [generate]
//! seed = 19620718
//! queries = [3, 7, 52]
//!
//! [row_counts]
//! store_sales = 28800991
//! active_counties = 1800
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DsqgenError, Result};
use crate::query::validate_query_id;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "dsqgen.toml";

/// Seed used when neither the command line nor dsqgen.toml sets one.
pub const DEFAULT_SEED: u64 = 19620718;

/// Top-level dsqgen.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DsqgenConfig {
    /// Resource directory overrides.
    pub resources: ResourcesConfig,
    /// Default generation settings.
    pub generate: GenerateConfig,
    /// Row counts keyed by relation name (case-insensitive).
    pub row_counts: BTreeMap<String, u64>,

    /// Absolute path to the directory containing dsqgen.toml.
    ///
    /// Populated by `read_config()` so that relative resource paths resolve
    /// against the config file's location, not the CWD.
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

/// Where to find distribution and template files.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Directory of `<name>.dst` files replacing bundled distributions.
    pub distributions: Option<PathBuf>,
    /// Directory of `query<N>.tpl` files.
    pub templates: Option<PathBuf>,
}

/// Default generation settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Seed for the random stream.
    pub seed: Option<u64>,
    /// Query ids to generate (empty = every loaded query).
    pub queries: Option<Vec<u64>>,
}

/// Read and parse a dsqgen.toml file from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed.
pub fn read_config(dir: &Path) -> Result<Option<DsqgenConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| DsqgenError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let mut config: DsqgenConfig = toml::from_str(&content).map_err(|e| DsqgenError::Config {
        message: format!("Failed to parse {}: {}", path.display(), e),
    })?;

    config.config_dir = Some(std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()));

    config.validate()?;

    Ok(Some(config))
}

impl DsqgenConfig {
    /// The configured seed, or [`DEFAULT_SEED`].
    pub fn seed(&self) -> u64 {
        self.generate.seed.unwrap_or(DEFAULT_SEED)
    }

    /// Resolve a configured path against the config file's directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.config_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn distributions_dir(&self) -> Option<PathBuf> {
        self.resources
            .distributions
            .as_deref()
            .map(|p| self.resolve_path(p))
    }

    pub fn templates_dir(&self) -> Option<PathBuf> {
        self.resources
            .templates
            .as_deref()
            .map(|p| self.resolve_path(p))
    }

    /// Configured query ids in order, without repeats.
    ///
    /// Repeated ids are logged via `tracing::warn` and skipped.
    pub fn query_ids(&self) -> Result<Vec<u8>> {
        let mut ids = Vec::new();
        for &raw in self.generate.queries.iter().flatten() {
            let id = validate_query_id(raw)?;
            if ids.contains(&id) {
                tracing::warn!(
                    "generate.queries lists query {} more than once. Ignoring the repeat.",
                    id
                );
                continue;
            }
            ids.push(id);
        }
        Ok(ids)
    }

    /// Validate semantic constraints that serde cannot enforce.
    pub fn validate(&self) -> Result<()> {
        for &id in self.generate.queries.iter().flatten() {
            if validate_query_id(id).is_err() {
                return Err(DsqgenError::Config {
                    message: format!(
                        "generate.queries contains {}; query ids run from 1 to 99",
                        id
                    ),
                });
            }
        }
        for name in self.row_counts.keys() {
            if name.trim().is_empty() {
                return Err(DsqgenError::Config {
                    message: "row_counts contains an empty relation name".to_string(),
                });
            }
        }
        Ok(())
    }
}
