use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use kiln_core::Runtime;

use super::{package_names, packages_arg};
use crate::Session;

/// `kiln deps`
#[derive(Debug)]
pub struct DepsRuntime {
    session: Arc<Session>,
}

impl DepsRuntime {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

impl Runtime for DepsRuntime {
    fn about(&self) -> String {
        "Print the dependency closure of packages, dependencies first".to_string()
    }

    fn configure(&self, command: Command) -> Command {
        command.arg(packages_arg().required(true)).arg(
            Arg::new("strict")
                .long("strict")
                .help("Fail on unknown packages and circular dependencies")
                .action(ArgAction::SetTrue),
        )
    }

    fn run(&self, matches: &ArgMatches) -> Result<()> {
        let roots = package_names(matches);
        let graph = self.session.artifacts.graph();

        let closure = if matches.get_flag("strict") {
            graph
                .resolve_closure_strict(&roots)
                .context("Failed to resolve dependencies")?
        } else {
            graph.resolve_closure(&roots)
        };

        for name in closure {
            println!("{name}");
        }
        Ok(())
    }
}
