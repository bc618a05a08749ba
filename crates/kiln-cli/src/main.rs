//! kiln - package capability discovery and artifact builds

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use kiln_cli::{Session, cmd};
use kiln_core::{DispatchError, Dispatcher, Settings};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // RUST_LOG wins over -v/-q.
    let (verbose, quiet) = kiln_cli::count_verbosity(&args);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(kiln_cli::log_level(verbose, quiet)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let session = Arc::new(Session::load(Settings::from_env())?);
    let runtimes = cmd::symbols(&session)?;

    let mut dispatcher = Dispatcher::new(kiln_cli::root_command());
    dispatcher.init(&session.packages, &runtimes)?;

    let matches = match dispatcher.parse(&args) {
        Ok(matches) => matches,
        Err(DispatchError::Usage(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };

    if matches.get_flag("versions") {
        for line in dispatcher.describe()? {
            println!("{line}");
        }
        return Ok(());
    }

    if !dispatcher.run(&matches)? {
        dispatcher.argparser()?.clone().print_help()?;
    }

    Ok(())
}
