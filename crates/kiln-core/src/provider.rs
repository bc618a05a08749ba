//! Package metadata providers.
//!
//! The core never reads manifests itself. A provider hands it an ordered
//! snapshot of installed packages; everything downstream (registries,
//! dependency graphs) is derived from that snapshot once.

use std::collections::HashMap;

use kiln_schema::{PackageDescriptor, PackageName};

/// Source of installed package metadata.
pub trait PackageProvider {
    /// Every installed package, in a stable iteration order.
    fn packages(&self) -> &[PackageDescriptor];

    /// Look up a package by name.
    fn find(&self, name: &PackageName) -> Option<&PackageDescriptor> {
        self.packages().iter().find(|p| &p.name == name)
    }
}

/// An ordered, in-memory set of packages.
///
/// Earlier entries shadow later ones with the same name, the same way an
/// earlier search path entry wins.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    packages: Vec<PackageDescriptor>,
    index: HashMap<PackageName, usize>,
}

impl WorkingSet {
    /// An empty working set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a package unless one with the same name is already present.
    ///
    /// Returns `false` when the package was shadowed.
    pub fn add(&mut self, package: PackageDescriptor) -> bool {
        if let Some(&idx) = self.index.get(&package.name) {
            tracing::debug!(
                "package '{}' from '{}' shadowed by '{}' from '{}'",
                package.id(),
                package.metadata_root.display(),
                self.packages[idx].id(),
                self.packages[idx].metadata_root.display(),
            );
            return false;
        }
        self.index.insert(package.name.clone(), self.packages.len());
        self.packages.push(package);
        true
    }

    /// Number of packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// True when no packages are present.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PackageProvider for WorkingSet {
    fn packages(&self) -> &[PackageDescriptor] {
        &self.packages
    }

    fn find(&self, name: &PackageName) -> Option<&PackageDescriptor> {
        self.index.get(name).map(|&idx| &self.packages[idx])
    }
}

impl FromIterator<PackageDescriptor> for WorkingSet {
    fn from_iter<I: IntoIterator<Item = PackageDescriptor>>(iter: I) -> Self {
        let mut set = Self::new();
        for package in iter {
            set.add(package);
        }
        set
    }
}

impl Extend<PackageDescriptor> for WorkingSet {
    fn extend<I: IntoIterator<Item = PackageDescriptor>>(&mut self, iter: I) {
        for package in iter {
            self.add(package);
        }
    }
}
