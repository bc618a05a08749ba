use std::sync::Arc;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use kiln_core::Runtime;

use super::{package_names, packages_arg};
use crate::Session;

/// `kiln resolve`
#[derive(Debug)]
pub struct ResolveRuntime {
    session: Arc<Session>,
}

impl ResolveRuntime {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

impl Runtime for ResolveRuntime {
    fn about(&self) -> String {
        "Print the artifact paths a builder produces for packages".to_string()
    }

    fn configure(&self, command: Command) -> Command {
        command
            .arg(packages_arg().required(true))
            .arg(
                Arg::new("builder")
                    .long("builder")
                    .short('b')
                    .value_name("NAME")
                    .help("Builder name, the last attribute of the declared target")
                    .required(true),
            )
            .arg(
                Arg::new("deps")
                    .long("deps")
                    .help("Include artifacts of every dependency")
                    .action(ArgAction::SetTrue),
            )
    }

    fn run(&self, matches: &ArgMatches) -> Result<()> {
        let roots = package_names(matches);
        let builder = matches
            .get_one::<String>("builder")
            .map_or("", String::as_str);

        for path in self
            .session
            .artifacts
            .resolve(&roots, builder, matches.get_flag("deps"))
        {
            println!("{}", path.display());
        }
        Ok(())
    }
}
