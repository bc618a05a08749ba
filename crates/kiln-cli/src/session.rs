//! Everything a command needs, loaded once per process.

use anyhow::{Context, Result};
use std::path::PathBuf;

use kiln_core::{
    ArtifactOptions, ArtifactRegistry, PackageProvider, Settings, SymbolTable, WorkingSet,
};
use kiln_schema::PackageDescriptor;

use crate::{builders, manifest};

/// Name of the package that ships the stock commands.
pub const BUILTIN_PACKAGE: &str = "kiln";

/// Declarations of the built-in package.
pub const BUILTIN_ENTRY_POINTS: &str = "\
[kiln.runtime]
build = kiln.cli:build
resolve = kiln.cli:resolve
deps = kiln.cli:deps
artifacts = kiln.cli:artifacts
";

/// The built-in package, registered ahead of everything on disk.
pub fn builtin_package() -> PackageDescriptor {
    let root = kiln_core::try_kiln_home().unwrap_or_else(|| PathBuf::from("."));
    PackageDescriptor::new(BUILTIN_PACKAGE, env!("KILN_VERSION"), root)
        .with_entry_points(BUILTIN_ENTRY_POINTS)
}

#[derive(Debug)]
pub struct Session {
    pub settings: Settings,
    pub packages: WorkingSet,
    pub artifacts: ArtifactRegistry,
    pub builders: SymbolTable,
}

impl Session {
    /// Scan the configured package roots.
    pub fn load(settings: Settings) -> Result<Self> {
        let mut packages = WorkingSet::new();
        packages.add(builtin_package());
        packages.extend(
            manifest::load_working_set(&settings.search_paths)
                .context("Failed to load installed packages")?
                .packages()
                .iter()
                .cloned(),
        );
        Self::from_packages(settings, packages)
    }

    /// Use an already assembled working set.
    pub fn from_packages(settings: Settings, packages: WorkingSet) -> Result<Self> {
        let artifacts = ArtifactRegistry::new(&packages, &ArtifactOptions::from(&settings));
        Ok(Self {
            settings,
            packages,
            artifacts,
            builders: builders::symbols()?,
        })
    }
}
