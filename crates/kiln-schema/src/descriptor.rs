//! Package descriptors: identity, location and declared entry points.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::entry_point::{DeclarationError, EntryPoint, parse_entry_points};
use crate::types::{PackageName, Version};

/// Identity of an installed package, rendered as `name version` in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId {
    /// Normalized package name.
    pub name: PackageName,
    /// Installed version.
    pub version: Version,
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Snapshot of one installed package as reported by a metadata provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Normalized package name.
    pub name: PackageName,
    /// Installed version.
    pub version: Version,
    /// Names of the packages this one depends on, in declared order.
    #[serde(default)]
    pub requires: Vec<PackageName>,
    /// Raw declaration block (see [`crate::entry_point`]).
    #[serde(default)]
    pub entry_points: String,
    /// Directory holding this package's metadata; generated artifacts are
    /// written beneath it.
    pub metadata_root: PathBuf,
}

impl PackageDescriptor {
    /// Create a descriptor with no dependencies and no declarations.
    pub fn new(name: &str, version: &str, metadata_root: impl Into<PathBuf>) -> Self {
        Self {
            name: PackageName::new(name),
            version: Version::new(version),
            requires: Vec::new(),
            entry_points: String::new(),
            metadata_root: metadata_root.into(),
        }
    }

    /// Set the dependency list.
    pub fn with_requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.requires = requires
            .into_iter()
            .map(|s| PackageName::new(s.as_ref()))
            .collect();
        self
    }

    /// Set the declaration block text.
    pub fn with_entry_points(mut self, text: impl Into<String>) -> Self {
        self.entry_points = text.into();
        self
    }

    /// The `name version` identity of this package.
    pub fn id(&self) -> PackageId {
        PackageId {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    /// The metadata root as a path.
    pub fn metadata_root(&self) -> &Path {
        &self.metadata_root
    }

    /// Parse the declaration block, keeping only entries of `group`.
    ///
    /// Malformed lines are returned as errors in place so callers can log
    /// them. Lines that sit outside any group are reported to every caller.
    pub fn declarations(&self, group: &str) -> Vec<Result<EntryPoint, DeclarationError>> {
        parse_entry_points(&self.entry_points)
            .into_iter()
            .filter(|(g, _)| g.as_deref().is_none_or(|g| g == group))
            .map(|(_, ep)| ep)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declarations_filter_by_group() {
        let pkg = PackageDescriptor::new("App", "1.0", "/tmp/app").with_entry_points(
            "[kiln.artifacts]\napp.js = app.build:full\n[kiln.runtime]\napp = app.cli:main\n",
        );
        assert_eq!(pkg.name, "app");
        assert_eq!(pkg.id().to_string(), "app 1.0");

        let artifacts = pkg.declarations("kiln.artifacts");
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].as_ref().unwrap().name, "app.js");

        assert!(pkg.declarations("kiln.unknown").is_empty());
    }

    #[test]
    fn test_requires_are_normalized() {
        let pkg = PackageDescriptor::new("app", "1.0", "/tmp").with_requires(["Lib1", "lib2"]);
        assert_eq!(pkg.requires, vec![PackageName::new("lib1"), PackageName::new("lib2")]);
    }
}
