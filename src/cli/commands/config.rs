//! Config Command
//!
//! Manage jsplens configuration.
//!
//! Usage:
//!   jsplens config show [PATH] [-f toml|json]
//!   jsplens config path [PATH]
//!   jsplens config init [PATH] [--force]

use std::path::{Path, PathBuf};

use crate::config::ConfigLoader;
use crate::types::{JspError, Result};

fn root_or_cwd(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| PathBuf::from("."))
}

/// Print the effective configuration (merged from all sources)
pub fn show(path: Option<PathBuf>, format: &str) -> Result<()> {
    let as_json = match format.to_lowercase().as_str() {
        "json" => true,
        "toml" | "text" => false,
        other => {
            return Err(JspError::Config(format!(
                "Invalid format '{}'. Valid values: toml, json",
                other
            )));
        }
    };

    let root = root_or_cwd(path);
    let config = ConfigLoader::load(&root)?;
    println!("{}", ConfigLoader::render_config(&config, as_json)?);
    Ok(())
}

/// Show configuration paths
pub fn path(path: Option<PathBuf>) -> Result<()> {
    ConfigLoader::show_path(&root_or_cwd(path));
    Ok(())
}

/// Write a project configuration file with the defaults
pub fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let root = root_or_cwd(path);
    require_dir(&root)?;

    let config_path = ConfigLoader::init_project(&root, force)?;
    println!("✓ Project configuration: {}", config_path.display());
    Ok(())
}

fn require_dir(root: &Path) -> Result<()> {
    if !root.exists() {
        return Err(JspError::RootNotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(JspError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    Ok(())
}
