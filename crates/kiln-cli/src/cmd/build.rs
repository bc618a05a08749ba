use std::sync::Arc;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use kiln_core::{Builder, PackageProvider, Runtime};
use kiln_schema::PackageName;

use super::{package_names, packages_arg};
use crate::Session;

/// `kiln build`
#[derive(Debug)]
pub struct BuildRuntime {
    session: Arc<Session>,
}

impl BuildRuntime {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Every known package, dependencies first.
    fn all_packages(&self) -> Vec<PackageName> {
        match self.session.artifacts.graph().build_plan() {
            Ok(layers) => layers.into_iter().flatten().collect(),
            Err(e) => {
                tracing::warn!("{e}; building in discovery order instead");
                self.session
                    .packages
                    .packages()
                    .iter()
                    .map(|p| p.name.clone())
                    .collect()
            }
        }
    }
}

impl Runtime for BuildRuntime {
    fn about(&self) -> String {
        "Build the artifacts declared by packages".to_string()
    }

    fn configure(&self, command: Command) -> Command {
        command
            .arg(packages_arg().required_unless_present("all"))
            .arg(
                Arg::new("all")
                    .long("all")
                    .help("Build every installed package, in dependency order")
                    .action(ArgAction::SetTrue)
                    .conflicts_with("packages"),
            )
    }

    fn run(&self, matches: &ArgMatches) -> Result<()> {
        let packages = if matches.get_flag("all") {
            self.all_packages()
        } else {
            package_names(matches)
        };

        // Per-artifact failures are logged by the builder, never fatal.
        let builder = Builder::new(&self.session.artifacts, &self.session.builders);
        builder.build_all(&packages);
        Ok(())
    }
}
