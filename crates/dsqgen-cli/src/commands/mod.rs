pub mod dist;
pub mod generate;
pub mod parse;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dsqgen_core::DistributionRegistry;

/// Make a command-line path absolute against the working directory, so it
/// is not re-resolved against the config file's directory.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    Ok(cwd.join(path))
}

/// The bundled distributions, or the bundled set with `dir` overrides applied.
pub fn load_registry(dir: Option<&Path>) -> Result<DistributionRegistry> {
    let registry = match dir {
        Some(dir) => DistributionRegistry::with_overrides(dir)?,
        None => DistributionRegistry::bundled()?,
    };
    Ok(registry)
}
