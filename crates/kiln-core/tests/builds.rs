mod common;

use std::fs;

use kiln_core::{ArtifactOptions, ArtifactRegistry, Builder, Symbol, SymbolTable, WorkingSet};
use kiln_schema::PackageName;
use tempfile::TempDir;

use common::{capture_logs, diamond, package};

fn options() -> ArtifactOptions {
    ArtifactOptions {
        case_insensitive: false,
        ..ArtifactOptions::default()
    }
}

fn writer() -> Symbol {
    Symbol::builder(|names, target| {
        let text: Vec<_> = names.iter().map(PackageName::as_str).collect();
        fs::write(target, text.concat())?;
        Ok(())
    })
}

fn dummy_symbols() -> SymbolTable {
    SymbolTable::new()
        .with("dummy:complete", writer())
        .unwrap()
        .with("dummy:partial", writer())
        .unwrap()
        .with("dummy:bad_builder", Symbol::Callable { arity: 0 })
        .unwrap()
        .with("dummy:nothing_builder", Symbol::builder(|_, _| Ok(())))
        .unwrap()
        .with("example.builders:lib", writer())
        .unwrap()
        .with("example.builders:full", writer())
        .unwrap()
}

#[test]
fn test_build_success() {
    let tmp = TempDir::new().unwrap();
    let set: WorkingSet = [package(
        tmp.path(),
        "app",
        &[],
        "[kiln.artifacts]\nartifact.js = dummy:complete\npartial.js = dummy:partial\n",
    )]
    .into_iter()
    .collect();
    let registry = ArtifactRegistry::new(&set, &options());
    let symbols = dummy_symbols();

    Builder::new(&registry, &symbols).build("app");

    let app = [PackageName::new("app")];
    let complete = registry.resolve(&app, "complete", false);
    let partial = registry.resolve(&app, "partial", false);
    assert_eq!(complete.len(), 1);
    assert_eq!(partial.len(), 1);
    assert!(complete[0].ends_with("artifact.js"));
    assert!(partial[0].ends_with("partial.js"));
    assert_eq!(fs::read_to_string(&complete[0]).unwrap(), "app");
    assert_eq!(fs::read_to_string(&partial[0]).unwrap(), "app");
}

#[test]
fn test_builder_receives_dependency_closure() {
    let tmp = TempDir::new().unwrap();
    let set = diamond(tmp.path());
    let registry = ArtifactRegistry::new(&set, &options());
    let symbols = dummy_symbols();

    Builder::new(&registry, &symbols).build("app1");

    let full = registry.resolve(&[PackageName::new("app1")], "full", false);
    assert_eq!(fs::read_to_string(&full[0]).unwrap(), "baselib1lib2app1");
}

#[test]
fn test_build_failures_are_logged_per_entry() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let set: WorkingSet = [
        package(
            dir,
            "app",
            &[],
            "[kiln.artifacts]\nnot_exist.js = dummy:not_exist\nbad.js = dummy:bad_builder\n\
             nothing.js = dummy:nothing_builder\n",
        ),
        package(
            dir,
            "bad",
            &[],
            "[kiln.artifacts]\nbad.js = dummy:bad_builder\nnothing.js = dummy:nothing_builder\n",
        ),
        package(
            dir,
            "nothing",
            &[],
            "[kiln.artifacts]\nnothing.js = dummy:nothing_builder\n",
        ),
    ]
    .into_iter()
    .collect();
    let registry = ArtifactRegistry::new(&set, &options());
    let symbols = dummy_symbols();
    let builder = Builder::new(&registry, &symbols);

    let ((), log) = capture_logs(|| builder.build("app"));
    assert!(log.contains(
        "unable to import the target builder for the entry point \
         'not_exist.js = dummy:not_exist' from package 'app 1.0'"
    ));
    assert!(log.contains(
        "the builder referenced by the entry point 'bad.js = dummy:bad_builder' from package \
         'app 1.0' has an incompatible signature"
    ));
    assert!(log.contains("'nothing.js = dummy:nothing_builder' from package 'app 1.0' failed"));
    assert_eq!(log.matches("ERROR").count(), 3);
    assert!(
        !registry
            .artifact_path(&PackageName::new("app"), "nothing.js")
            .unwrap()
            .exists()
    );

    // A stale artifact is removed before the builder runs.
    let target = registry
        .artifact_path(&PackageName::new("app"), "nothing.js")
        .unwrap();
    fs::write(&target, "").unwrap();
    let ((), log) = capture_logs(|| builder.build("app"));
    assert!(log.contains("unlinking existing export target at "));
    assert!(!target.exists());

    // Clog the artifact directory with a plain file.
    let bad_dir = registry
        .artifact_path(&PackageName::new("bad"), "bad.js")
        .unwrap();
    fs::write(bad_dir.parent().unwrap(), "").unwrap();
    let ((), log) = capture_logs(|| builder.build("bad"));
    assert!(log.contains("this target's parent is not a directory"));

    let ((), log) = capture_logs(|| builder.build("nothing"));
    assert!(log.contains(
        "the entry point 'nothing.js = dummy:nothing_builder' from package 'nothing 1.0' \
         failed to generate an artifact"
    ));
}

#[test]
fn test_build_all_follows_plan() {
    let tmp = TempDir::new().unwrap();
    let set = diamond(tmp.path());
    let registry = ArtifactRegistry::new(&set, &options());
    let symbols = dummy_symbols();

    let plan = registry.graph().build_plan().unwrap();
    Builder::new(&registry, &symbols).build_all(plan.iter().flatten());

    assert!(
        registry
            .records()
            .iter()
            .all(|record| record.value.exists())
    );
}
