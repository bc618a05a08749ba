//! Artifact declarations and their resolution.
//!
//! Every entry of the `kiln.artifacts` group names a file a package can
//! generate, e.g. `lib1.lib.js = example.builders:lib`. The file lands in
//! the package's own metadata root, so the full artifact path is the key
//! two declarations can collide on.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use kiln_schema::{EntryPoint, PackageDescriptor, PackageName};

use crate::paths::{self, ARTIFACTS_GROUP, Settings};
use crate::provider::PackageProvider;
use crate::registry::{Capability, Conflict, Record, Registry};
use crate::resolver::DependencyGraph;

/// Knobs for building an [`ArtifactRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactOptions {
    /// Declaration group to read.
    pub group: String,
    /// Compare artifact paths case-insensitively.
    pub case_insensitive: bool,
}

impl Default for ArtifactOptions {
    fn default() -> Self {
        Self {
            group: ARTIFACTS_GROUP.to_string(),
            case_insensitive: paths::platform_case_insensitive(),
        }
    }
}

impl From<&Settings> for ArtifactOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            case_insensitive: settings.case_insensitive,
            ..Self::default()
        }
    }
}

/// The artifact capability: keys are export paths, values the same paths
/// as [`PathBuf`]s.
#[derive(Debug, Clone)]
pub struct Artifacts {
    group: String,
    case_insensitive: bool,
}

impl Artifacts {
    /// Capability reading `options.group`.
    pub fn new(options: &ArtifactOptions) -> Self {
        Self {
            group: options.group.clone(),
            case_insensitive: options.case_insensitive,
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl Capability for Artifacts {
    type Value = PathBuf;

    fn group(&self) -> &str {
        &self.group
    }

    fn build_record(
        &self,
        package: &PackageDescriptor,
        entry_point: &EntryPoint,
    ) -> Option<(String, PathBuf)> {
        if !is_plain_file_name(&entry_point.name) {
            tracing::warn!(
                "bad '{}' entry point '{}' from package '{}': artifact name must be a plain \
                 file name",
                self.group,
                entry_point,
                package.id(),
            );
            return None;
        }

        let path = paths::artifact_path(package.metadata_root(), &entry_point.name);
        Some((path.to_string_lossy().into_owned(), path))
    }

    fn normalize(&self, raw_key: &str) -> String {
        if self.case_insensitive {
            raw_key.to_lowercase()
        } else {
            raw_key.to_string()
        }
    }

    fn on_conflict(&self, existing: &Record<PathBuf>, incoming: &Record<PathBuf>) -> Conflict {
        tracing::warn!(
            "entry point '{}' from package '{}' will generate an artifact at '{}' but it was \
             already registered to entry point '{}'; conflicting entry point registration will \
             be ignored.",
            incoming.entry_point,
            incoming.package,
            incoming.raw_key,
            existing.entry_point,
        );
        if existing.raw_key != incoming.raw_key {
            tracing::warn!(
                "the file mapping error is caused by this platform's case-insensitive filename \
                 normalization: '{}' and '{}' refer to the same file",
                existing.raw_key,
                incoming.raw_key,
            );
        }
        Conflict::Ignore
    }
}

/// Artifact records plus the dependency snapshot needed to order them.
#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    registry: Registry<Artifacts>,
    by_package: HashMap<PackageName, Vec<usize>>,
    metadata_roots: HashMap<PackageName, PathBuf>,
    graph: DependencyGraph,
}

impl ArtifactRegistry {
    /// Scan `provider` for artifact declarations.
    pub fn new(provider: &dyn PackageProvider, options: &ArtifactOptions) -> Self {
        let registry = Registry::new(Artifacts::new(options), provider);
        Self::assemble(registry, provider)
    }

    /// Build from an explicit ordered list of declarations; packages and
    /// dependencies still come from `provider`.
    pub fn from_declarations<'a, I>(
        provider: &dyn PackageProvider,
        options: &ArtifactOptions,
        declarations: I,
    ) -> Self
    where
        I: IntoIterator<Item = (&'a PackageDescriptor, EntryPoint)>,
    {
        let registry = Registry::from_declarations(Artifacts::new(options), declarations);
        Self::assemble(registry, provider)
    }

    fn assemble(registry: Registry<Artifacts>, provider: &dyn PackageProvider) -> Self {
        let mut by_package: HashMap<PackageName, Vec<usize>> = HashMap::new();
        for (idx, record) in registry.records().iter().enumerate() {
            by_package
                .entry(record.package.name.clone())
                .or_default()
                .push(idx);
        }

        let metadata_roots = provider
            .packages()
            .iter()
            .map(|p| (p.name.clone(), p.metadata_root.clone()))
            .collect();

        Self {
            registry,
            by_package,
            metadata_roots,
            graph: DependencyGraph::from_provider(provider),
        }
    }

    /// Artifact paths produced by builders named `builder_name` for
    /// `roots`, optionally expanded to their dependency closure.
    ///
    /// Packages are visited in resolution order, and each package's paths
    /// in registration order. Unknown packages or builders produce nothing.
    pub fn resolve(
        &self,
        roots: &[PackageName],
        builder_name: &str,
        include_dependencies: bool,
    ) -> Vec<PathBuf> {
        let packages = if include_dependencies {
            self.graph.resolve_closure(roots)
        } else {
            let mut seen = HashSet::new();
            roots
                .iter()
                .filter(|name| seen.insert(*name))
                .cloned()
                .collect()
        };

        packages
            .iter()
            .flat_map(|name| self.records_for(name))
            .filter(|record| record.entry_point.target.final_attr() == Some(builder_name))
            .map(|record| record.value.clone())
            .collect()
    }

    /// The record that generates the artifact at `path`, if any.
    pub fn belongs_to(&self, path: &Path) -> Option<&Record<PathBuf>> {
        self.registry.get(&path.to_string_lossy())
    }

    /// Where `package` would write an artifact called `name`.
    pub fn artifact_path(&self, package: &PackageName, name: &str) -> Option<PathBuf> {
        self.metadata_roots
            .get(package)
            .map(|root| paths::artifact_path(root, name))
    }

    /// Records declared directly by `package`, in registration order.
    pub fn records_for(&self, package: &PackageName) -> Vec<&Record<PathBuf>> {
        let records = self.registry.records();
        self.by_package
            .get(package)
            .map(|idx| idx.iter().map(|&i| &records[i]).collect())
            .unwrap_or_default()
    }

    /// All records in registration order.
    pub fn records(&self) -> &[Record<PathBuf>] {
        self.registry.records()
    }

    /// The dependency snapshot taken at construction.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Registry<Artifacts> {
        &self.registry
    }
}
