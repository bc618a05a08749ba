//! Stock artifact builders.
//!
//! Both write a description of the dependency closure they are handed:
//! `kiln.builders:listing` as plain text, `kiln.builders:manifest` as JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use kiln_core::{Symbol, SymbolTable};
use kiln_schema::PackageName;

/// Module the stock builders are exported from.
pub const MODULE: &str = "kiln.builders";

#[derive(Debug, Serialize)]
struct ClosureManifest<'a> {
    packages: &'a [PackageName],
}

/// Write one package name per line.
pub fn listing(package_names: &[PackageName], export_target: &Path) -> Result<()> {
    let mut text = String::new();
    for name in package_names {
        text.push_str(name);
        text.push('\n');
    }
    fs::write(export_target, text)
        .with_context(|| format!("Failed to write {}", export_target.display()))
}

/// Write `{"packages": [...]}`.
pub fn manifest(package_names: &[PackageName], export_target: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&ClosureManifest {
        packages: package_names,
    })?;
    fs::write(export_target, json + "\n")
        .with_context(|| format!("Failed to write {}", export_target.display()))
}

/// The table artifact declarations are resolved against.
pub fn symbols() -> Result<SymbolTable> {
    let mut table = SymbolTable::new();
    table
        .insert(&format!("{MODULE}:listing"), Symbol::builder(listing))?
        .insert(&format!("{MODULE}:manifest"), Symbol::builder(manifest))?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{SymbolResolver, verify_builder};
    use kiln_schema::Target;
    use tempfile::TempDir;

    fn names() -> Vec<PackageName> {
        vec![PackageName::new("base"), PackageName::new("app")]
    }

    #[test]
    fn test_listing() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("out.txt");
        listing(&names(), &target).unwrap();
        assert_eq!(fs::read_to_string(target).unwrap(), "base\napp\n");
    }

    #[test]
    fn test_manifest() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("out.json");
        manifest(&names(), &target).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(target).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"packages": ["base", "app"]}));
    }

    #[test]
    fn test_symbols_are_builders() {
        let table = symbols().unwrap();
        for name in ["listing", "manifest"] {
            let target = Target::parse(&format!("{MODULE}:{name}")).unwrap();
            assert!(verify_builder(&table.resolve(&target).unwrap()).is_some());
        }
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let err = listing(&names(), &tmp.path().join("nope/out.txt")).unwrap_err();
        assert!(err.to_string().contains("Failed to write"));
    }
}
