//! Stock commands. Each is a [`kiln_core::Runtime`] bound to the session.

pub mod artifacts;
pub mod build;
pub mod deps;
pub mod resolve;

use std::sync::Arc;

use anyhow::Result;
use clap::{Arg, ArgMatches};
use kiln_core::{Symbol, SymbolTable};
use kiln_schema::PackageName;

use crate::Session;

/// Module the stock runtimes are exported from.
pub const MODULE: &str = "kiln.cli";

/// Positional package list; accepts `a,b c` as three names.
pub(crate) fn packages_arg() -> Arg {
    Arg::new("packages")
        .value_name("PACKAGE")
        .help("Package names, comma or space separated")
        .num_args(1..)
        .value_delimiter(',')
}

pub(crate) fn package_names(matches: &ArgMatches) -> Vec<PackageName> {
    matches
        .get_many::<String>("packages")
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(PackageName::new)
        .collect()
}

/// The table runtime declarations are resolved against.
pub fn symbols(session: &Arc<Session>) -> Result<SymbolTable> {
    let mut table = SymbolTable::new();
    table
        .insert(
            &format!("{MODULE}:build"),
            Symbol::runtime(build::BuildRuntime::new(Arc::clone(session))),
        )?
        .insert(
            &format!("{MODULE}:resolve"),
            Symbol::runtime(resolve::ResolveRuntime::new(Arc::clone(session))),
        )?
        .insert(
            &format!("{MODULE}:deps"),
            Symbol::runtime(deps::DepsRuntime::new(Arc::clone(session))),
        )?
        .insert(
            &format!("{MODULE}:artifacts"),
            Symbol::runtime(artifacts::ArtifactsRuntime::new(Arc::clone(session))),
        )?;
    Ok(table)
}
