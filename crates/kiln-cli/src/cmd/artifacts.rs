use std::sync::Arc;

use anyhow::Result;
use clap::ArgMatches;
use crossterm::style::Stylize;
use kiln_core::Runtime;

use crate::Session;

/// `kiln artifacts`
#[derive(Debug)]
pub struct ArtifactsRuntime {
    session: Arc<Session>,
}

impl ArtifactsRuntime {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

impl Runtime for ArtifactsRuntime {
    fn about(&self) -> String {
        "List registered artifacts and whether they have been built".to_string()
    }

    fn run(&self, _matches: &ArgMatches) -> Result<()> {
        let records = self.session.artifacts.records();
        if records.is_empty() {
            println!("No artifacts registered.");
            return Ok(());
        }

        for record in records {
            let status = if record.value.exists() {
                "built".green()
            } else {
                "missing".dark_grey()
            };
            println!(
                "{:<24} {} {} [{status}]",
                record.package.to_string(),
                record.entry_point,
                record.value.display(),
            );
        }
        Ok(())
    }
}
