#![allow(dead_code)]

use std::path::Path;

use kiln_core::WorkingSet;
use kiln_schema::PackageDescriptor;

#[path = "../../src/test_support.rs"]
mod test_support;

pub(crate) use test_support::capture_logs;

/// A package rooted at `<dir>/<name>-<version>.kiln-info`.
pub fn package(
    dir: &Path,
    name: &str,
    requires: &[&str],
    entry_points: &str,
) -> PackageDescriptor {
    let root = dir.join(format!("{name}-1.0.kiln-info"));
    std::fs::create_dir_all(&root).unwrap();
    PackageDescriptor::new(name, "1.0", root)
        .with_requires(requires.iter().copied())
        .with_entry_points(entry_points)
}

/// `base <- lib1, lib2 <- app1`, each declaring one artifact.
pub fn diamond(dir: &Path) -> WorkingSet {
    [
        package(
            dir,
            "base",
            &[],
            "[kiln.artifacts]\nbase.lib.js = example.builders:lib\n",
        ),
        package(
            dir,
            "lib1",
            &["base"],
            "[kiln.artifacts]\nlib1.lib.js = example.builders:lib\n",
        ),
        package(
            dir,
            "lib2",
            &["base"],
            "[kiln.artifacts]\nlib2.lib.js = example.builders:lib\n",
        ),
        package(
            dir,
            "app1",
            &["lib1", "lib2"],
            "[kiln.artifacts]\napp1.full.js = example.builders:full\n",
        ),
    ]
    .into_iter()
    .collect()
}
