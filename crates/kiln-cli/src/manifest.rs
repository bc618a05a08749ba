//! Package manifests on disk.
//!
//! A package root is a directory of package directories. Each package
//! directory holds a `package.toml`:
//!
//! ```toml
//! [package]
//! name = "lib1"
//! version = "1.0"
//! requires = ["base"]
//! ```
//!
//! and optionally an `entry_points.txt` with the declaration block. The
//! block may also be given inline as a top-level `entry_points` string.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use kiln_core::WorkingSet;
use kiln_schema::PackageDescriptor;

/// File name of a package manifest.
pub const MANIFEST_FILE: &str = "package.toml";

/// File name of a standalone declaration block.
pub const ENTRY_POINTS_FILE: &str = "entry_points.txt";

/// Parsed `package.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub package: PackageSection,
    #[serde(default)]
    pub entry_points: Option<String>,
}

/// The `[package]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub requires: Vec<String>,
}

impl Manifest {
    /// Parse the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Load the package in `dir`, if it is one.
pub fn load_package(dir: &Path) -> Result<Option<PackageDescriptor>> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Ok(None);
    }

    let manifest = Manifest::load(&manifest_path)?;

    let mut entry_points = manifest.entry_points.unwrap_or_default();
    let ep_path = dir.join(ENTRY_POINTS_FILE);
    if ep_path.is_file() {
        let text = fs::read_to_string(&ep_path)
            .with_context(|| format!("Failed to read {}", ep_path.display()))?;
        if !entry_points.is_empty() && !entry_points.ends_with('\n') {
            entry_points.push('\n');
        }
        entry_points.push_str(&text);
    }

    let package = PackageDescriptor::new(&manifest.package.name, &manifest.package.version, dir)
        .with_requires(&manifest.package.requires)
        .with_entry_points(entry_points);
    Ok(Some(package))
}

/// Scan `roots` in order and collect every package found.
///
/// Directories inside a root are visited in name order. A package name seen
/// again later is shadowed by the first one. Missing roots are skipped and
/// broken manifests are logged and skipped.
pub fn load_working_set(roots: &[PathBuf]) -> Result<WorkingSet> {
    let mut set = WorkingSet::new();

    for root in roots {
        if !root.is_dir() {
            tracing::debug!("package root '{}' does not exist; skipped", root.display());
            continue;
        }

        let mut dirs: Vec<PathBuf> = fs::read_dir(root)
            .with_context(|| format!("Failed to read package root {}", root.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            match load_package(&dir) {
                Ok(Some(package)) => {
                    tracing::trace!("found package '{}' in '{}'", package.id(), dir.display());
                    set.add(package);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("ignoring package at '{}': {e:#}", dir.display()),
            }
        }
    }

    tracing::debug!("loaded {} package(s)", set.len());
    Ok(set)
}
