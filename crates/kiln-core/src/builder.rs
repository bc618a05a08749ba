//! Artifact build orchestration.
//!
//! Builds every artifact a package declares, one after the other. Each
//! entry is isolated: an unresolvable target, a builder with the wrong
//! shape, an unusable destination, a returned error or a panic all end up
//! as log events for that entry and the loop moves on. Nothing is returned
//! to the caller.
//!
//! ## Per-entry steps
//!
//! 1. Resolve the target reference through the [`SymbolResolver`].
//! 2. Check the symbol takes `(package_names, export_target)`.
//! 3. Prepare the destination: create the parent directory if needed and
//!    unlink any stale artifact.
//! 4. Call the builder with the package's dependency closure. An error or
//!    panic fails the entry even if a file was written.
//! 5. After a clean return, check the artifact now exists.
//!
//! Panics are caught, but the process panic hook still runs first, so the
//! usual panic message reaches stderr.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use kiln_schema::PackageName;

use crate::artifact::ArtifactRegistry;
use crate::registry::Record;
use crate::symbols::{BuilderFn, SymbolResolver, verify_builder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Built,
    Failed,
}

/// Runs artifact builders for packages known to an [`ArtifactRegistry`].
pub struct Builder<'a> {
    artifacts: &'a ArtifactRegistry,
    symbols: &'a dyn SymbolResolver,
}

impl<'a> Builder<'a> {
    /// Bind a registry to the resolver its targets are looked up in.
    pub fn new(artifacts: &'a ArtifactRegistry, symbols: &'a dyn SymbolResolver) -> Self {
        Self { artifacts, symbols }
    }

    /// Build every artifact declared directly by `package`.
    pub fn build(&self, package: &str) {
        let root = PackageName::new(package);
        let records = self.artifacts.records_for(&root);

        if !self.artifacts.graph().contains(&root) {
            tracing::warn!("package '{root}' is not available; no artifacts built");
            return;
        }

        if records.is_empty() {
            tracing::info!("package '{root}' declares no artifacts");
            return;
        }

        let package_names = self.artifacts.graph().resolve_closure(&[root.clone()]);
        tracing::debug!(
            "building {} artifact(s) for '{root}' from [{}]",
            records.len(),
            package_names
                .iter()
                .map(PackageName::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        );

        let built = records
            .iter()
            .map(|record| self.build_one(record, &package_names))
            .filter(|outcome| *outcome == Outcome::Built)
            .count();

        tracing::info!(
            "built {built} of {} artifact(s) for package '{root}'",
            records.len()
        );
    }

    /// Build each package in turn.
    pub fn build_all<'p, I>(&self, packages: I)
    where
        I: IntoIterator<Item = &'p PackageName>,
    {
        for package in packages {
            self.build(package.as_str());
        }
    }

    fn build_one(&self, record: &Record<PathBuf>, package_names: &[PackageName]) -> Outcome {
        let ep = &record.entry_point;
        let pkg = &record.package;
        let export_target = &record.value;

        let symbol = match self.symbols.resolve(&ep.target) {
            Ok(symbol) => symbol,
            Err(e) => {
                tracing::error!(
                    "unable to import the target builder for the entry point '{ep}' from \
                     package '{pkg}': {e}"
                );
                return Outcome::Failed;
            }
        };

        let Some(builder) = verify_builder(&symbol) else {
            tracing::error!(
                "the builder referenced by the entry point '{ep}' from package '{pkg}' has an \
                 incompatible signature"
            );
            return Outcome::Failed;
        };

        if let Err(reason) = prepare_export_target(export_target) {
            tracing::error!(
                "unable to prepare the export location '{}' for the entry point '{ep}' from \
                 package '{pkg}'; {reason}",
                export_target.display(),
            );
            return Outcome::Failed;
        }

        if let Err(reason) = invoke(builder.as_ref(), package_names, export_target) {
            tracing::error!(
                "the builder referenced by the entry point '{ep}' from package '{pkg}' \
                 encountered an error when building the artifact: {reason}"
            );
            return Outcome::Failed;
        }

        if export_target.exists() {
            tracing::info!(
                "the entry point '{ep}' from package '{pkg}' generated an artifact at '{}'",
                export_target.display(),
            );
            Outcome::Built
        } else {
            tracing::error!(
                "the entry point '{ep}' from package '{pkg}' failed to generate an artifact at \
                 '{}'",
                export_target.display(),
            );
            Outcome::Failed
        }
    }
}

fn prepare_export_target(export_target: &Path) -> Result<(), String> {
    if let Some(parent) = export_target.parent() {
        if parent.exists() && !parent.is_dir() {
            return Err("this target's parent is not a directory".to_string());
        }
        if !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("could not create '{}': {e}", parent.display()))?;
        }
    }

    if export_target.exists() {
        tracing::info!(
            "unlinking existing export target at '{}'",
            export_target.display()
        );
        fs::remove_file(export_target).map_err(|e| format!("could not unlink: {e}"))?;
    }

    Ok(())
}

fn invoke(
    builder: &dyn BuilderFn,
    package_names: &[PackageName],
    export_target: &Path,
) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(|| {
        builder.build(package_names, export_target)
    })) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(format!("builder panicked: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactOptions;
    use crate::provider::WorkingSet;
    use crate::symbols::{Symbol, SymbolTable};
    use crate::test_support::capture_logs;
    use kiln_schema::PackageDescriptor;
    use tempfile::TempDir;

    fn options() -> ArtifactOptions {
        ArtifactOptions {
            case_insensitive: false,
            ..ArtifactOptions::default()
        }
    }

    fn symbols() -> SymbolTable {
        SymbolTable::new()
            .with(
                "dummy:erroring",
                Symbol::builder(|_, _| Err(anyhow::anyhow!("no sources found"))),
            )
            .unwrap()
            .with(
                "dummy:panicking",
                Symbol::builder(|_, _| panic!("builder blew up")),
            )
            .unwrap()
            .with(
                "dummy:write",
                Symbol::builder(|names, target| {
                    let text: Vec<_> = names.iter().map(PackageName::as_str).collect();
                    fs::write(target, text.concat())?;
                    Ok(())
                }),
            )
            .unwrap()
    }

    #[test]
    fn test_errors_and_panics_are_contained() {
        let tmp = TempDir::new().unwrap();
        let set: WorkingSet = [PackageDescriptor::new("app", "1.0", tmp.path())
            .with_entry_points(
                "[kiln.artifacts]\nerr.js = dummy:erroring\nboom.js = dummy:panicking\n\
                 ok.js = dummy:write\n",
            )]
        .into_iter()
        .collect();
        let registry = ArtifactRegistry::new(&set, &options());
        let table = symbols();

        let ((), log) = capture_logs(|| Builder::new(&registry, &table).build("app"));

        assert!(log.contains("encountered an error when building the artifact: no sources found"));
        assert!(log.contains("builder panicked: builder blew up"));
        assert!(log.contains("built 1 of 3 artifact(s) for package 'app'"));
        assert_eq!(
            fs::read_to_string(tmp.path().join("kiln_artifacts/ok.js")).unwrap(),
            "app"
        );
    }

    #[test]
    fn test_crash_after_writing_is_a_failure() {
        let tmp = TempDir::new().unwrap();
        let table = SymbolTable::new()
            .with(
                "dummy:half",
                Symbol::builder(|_, target| {
                    fs::write(target, "partial")?;
                    anyhow::bail!("crashed midway")
                }),
            )
            .unwrap()
            .with(
                "dummy:half_panic",
                Symbol::builder(|_, target| {
                    fs::write(target, "partial").unwrap();
                    panic!("boom")
                }),
            )
            .unwrap();
        let set: WorkingSet = [PackageDescriptor::new("app", "1.0", tmp.path())
            .with_entry_points(
                "[kiln.artifacts]\nhalf.js = dummy:half\nboom.js = dummy:half_panic\n",
            )]
        .into_iter()
        .collect();
        let registry = ArtifactRegistry::new(&set, &options());

        let ((), log) = capture_logs(|| Builder::new(&registry, &table).build("app"));

        assert!(log.contains("encountered an error when building the artifact: crashed midway"));
        assert!(log.contains("builder panicked: boom"));
        assert!(!log.contains("generated an artifact"));
        assert!(!log.contains("failed to generate an artifact"));
        assert!(log.contains("built 0 of 2 artifact(s) for package 'app'"));
    }

    #[test]
    fn test_unknown_package_only_warns() {
        let registry = ArtifactRegistry::new(&WorkingSet::new(), &options());
        let table = symbols();
        let ((), log) = capture_logs(|| Builder::new(&registry, &table).build("ghost"));
        assert!(log.contains("WARN"));
        assert!(log.contains("package 'ghost' is not available"));
    }
}
