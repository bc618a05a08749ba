//! Command dispatch.
//!
//! Packages contribute subcommands through the `kiln.runtime` group. A name
//! can only be claimed once; a second package declaring the same name with
//! a different target is still reachable under its full target reference
//! (`module:attr`), which is why plain command names may not contain `.`,
//! `:` or whitespace.
//!
//! [`Dispatcher`] turns the resulting table into a `clap` command tree and
//! routes parsed arguments to the owning [`Runtime`].

use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgMatches, Command};
use kiln_schema::{EntryPoint, PackageDescriptor, PackageId, Target};
use thiserror::Error;

use crate::error::ConfigurationError;
use crate::paths::RUNTIME_GROUP;
use crate::provider::PackageProvider;
use crate::registry::{Capability, Conflict, Record, Registry};
use crate::symbols::{Symbol, SymbolResolver};

/// A subcommand contributed by a package.
pub trait Runtime: Send + Sync {
    /// One-line description shown in the parent's help.
    fn about(&self) -> String;

    /// Add this runtime's arguments to its subcommand.
    fn configure(&self, command: Command) -> Command {
        command
    }

    /// Execute with the subcommand's matches.
    ///
    /// # Errors
    ///
    /// Whatever the command wants to report to the user.
    fn run(&self, matches: &ArgMatches) -> anyhow::Result<()>;
}

/// The command capability.
#[derive(Debug, Clone)]
pub struct Commands {
    group: String,
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            group: RUNTIME_GROUP.to_string(),
        }
    }
}

fn is_reserved_name(name: &str) -> bool {
    name.chars().any(|c| c == '.' || c == ':' || c.is_whitespace())
}

impl Capability for Commands {
    type Value = ();

    fn group(&self) -> &str {
        &self.group
    }

    fn build_record(
        &self,
        package: &PackageDescriptor,
        entry_point: &EntryPoint,
    ) -> Option<(String, ())> {
        if is_reserved_name(&entry_point.name) {
            tracing::warn!(
                "bad '{}' entry point '{}' from package '{}': command names may not contain \
                 '.', ':' or whitespace",
                self.group,
                entry_point,
                package.id(),
            );
            return None;
        }
        Some((entry_point.name.clone(), ()))
    }

    fn on_conflict(&self, existing: &Record<()>, incoming: &Record<()>) -> Conflict {
        if existing.entry_point.target == incoming.entry_point.target {
            tracing::warn!(
                "duplicated registration of command '{}' via entry point '{}' ignored; \
                 registered by '{}' from '{}'",
                incoming.raw_key,
                incoming.entry_point,
                existing.entry_point,
                existing.package,
            );
            return Conflict::Ignore;
        }

        let fallback = incoming.entry_point.target.to_string();
        tracing::warn!(
            "a {} command named '{}' already registered. '{}' from '{}' is registered; \
             '{}' from '{}' will be available as '{fallback}'",
            self.group,
            incoming.raw_key,
            existing.entry_point,
            existing.package,
            incoming.entry_point,
            incoming.package,
        );
        Conflict::Fallback(fallback)
    }

    fn on_fallback_taken(&self, holder: &Record<()>, incoming: &Record<()>) {
        tracing::warn!(
            "'{}' from '{}' cannot be registered as '{}'; the fallback entry point is already \
             added. it is held by '{}' from '{}'",
            incoming.entry_point,
            incoming.package,
            holder.key,
            holder.entry_point,
            holder.package,
        );
    }
}

/// How a candidate declaration ended up in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    /// Registered under its declared name.
    Direct,
    /// Registered under its full target reference.
    Fallback,
    /// Not registered.
    Rejected,
}

/// Result of planning one command declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    /// Name the command is invoked by, or the declared name when rejected.
    pub name: String,
    /// Target reference.
    pub target: Target,
    /// Declaring package.
    pub package: PackageId,
    /// Outcome.
    pub status: CommandStatus,
}

impl CommandEntry {
    fn from_record(record: &Record<()>) -> Self {
        Self {
            name: record.key.clone(),
            target: record.entry_point.target.clone(),
            package: record.package.clone(),
            status: if record.key == record.entry_point.name {
                CommandStatus::Direct
            } else {
                CommandStatus::Fallback
            },
        }
    }
}

/// Decide the fate of every candidate, in order.
///
/// The same candidate list always produces the same plan.
pub fn plan_commands<'a, I>(candidates: I) -> Vec<CommandEntry>
where
    I: IntoIterator<Item = (&'a PackageDescriptor, EntryPoint)>,
{
    let candidates: Vec<_> = candidates.into_iter().collect();
    let registry = Registry::from_declarations(
        Commands::default(),
        candidates.iter().map(|(p, ep)| (*p, ep.clone())),
    );

    candidates
        .iter()
        .enumerate()
        .map(|(seq, (package, ep))| {
            registry
                .records()
                .iter()
                .find(|r| r.seq == seq)
                .map_or_else(
                    || CommandEntry {
                        name: ep.name.clone(),
                        target: ep.target.clone(),
                        package: package.id(),
                        status: CommandStatus::Rejected,
                    },
                    CommandEntry::from_record,
                )
        })
        .collect()
}

/// Errors surfaced by [`Dispatcher::dispatch`].
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Config(#[from] ConfigurationError),

    /// Bad arguments, or `--help`/`--version`; `clap` knows how to report it.
    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("command '{command}' failed: {error:#}")]
    Runtime {
        command: String,
        error: anyhow::Error,
    },
}

/// Lifecycle of a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing loaded yet.
    Uninitialized,
    /// Building the command table.
    Initializing,
    /// Table and parser attached and consistent.
    Ready,
}

#[derive(Clone)]
struct Mounted {
    record: Record<()>,
    metadata_root: Option<PathBuf>,
    runtime: Arc<dyn Runtime>,
}

/// Routes command lines to the runtimes packages registered.
pub struct Dispatcher {
    root: Command,
    state: DispatchState,
    mounted: Vec<Mounted>,
    argparser: Option<Command>,
}

impl Dispatcher {
    /// A dispatcher whose top-level parser starts out as `root`.
    pub fn new(root: Command) -> Self {
        Self {
            root,
            state: DispatchState::Uninitialized,
            mounted: Vec::new(),
            argparser: None,
        }
    }

    fn name(&self) -> String {
        self.root.get_name().to_string()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Scan `provider` for commands, resolve them and build the parser.
    ///
    /// Calling this again discards everything and starts over from a fresh
    /// scan. Commands whose targets cannot be resolved to a [`Runtime`] are
    /// logged and left out.
    ///
    /// # Errors
    ///
    /// Propagates a [`ConfigurationError`] from attaching the parser.
    pub fn init(
        &mut self,
        provider: &dyn PackageProvider,
        symbols: &dyn SymbolResolver,
    ) -> Result<(), ConfigurationError> {
        if self.state != DispatchState::Uninitialized {
            tracing::debug!("re-initializing '{}'; dropping existing commands", self.name());
            self.mounted.clear();
            self.argparser = None;
        }
        self.state = DispatchState::Initializing;

        let registry = Registry::new(Commands::default(), provider);
        for record in registry.records() {
            let ep = &record.entry_point;
            let runtime = match symbols.resolve(&ep.target) {
                Ok(Symbol::Runtime(runtime)) => runtime,
                Ok(_) => {
                    tracing::error!(
                        "the entry point '{ep}' from package '{}' does not reference a runtime; \
                         command '{}' not available",
                        record.package,
                        record.key,
                    );
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        "unable to import the runtime for the entry point '{ep}' from package \
                         '{}': {e}",
                        record.package,
                    );
                    continue;
                }
            };

            self.mounted.push(Mounted {
                record: record.clone(),
                metadata_root: provider
                    .find(&record.package.name)
                    .map(|p| p.metadata_root.clone()),
                runtime,
            });
        }

        self.init_argparser(self.root.clone())?;
        self.state = DispatchState::Ready;
        tracing::debug!("'{}' ready with {} command(s)", self.name(), self.mounted.len());
        Ok(())
    }

    /// Mount every resolved command onto `parser` and keep it.
    ///
    /// This happens once per initialization.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::ArgparserReused`] if a parser is already
    /// attached.
    pub fn init_argparser(&mut self, parser: Command) -> Result<(), ConfigurationError> {
        if self.argparser.is_some() {
            let err = ConfigurationError::ArgparserReused(self.name());
            tracing::error!(critical = true, "{err}");
            return Err(err);
        }

        let parser = self.mounted.iter().fold(parser, |parser, m| {
            let sub = Command::new(m.record.key.clone()).about(m.runtime.about());
            parser.subcommand(m.runtime.configure(sub))
        });
        self.argparser = Some(parser);
        Ok(())
    }

    fn ensure_ready(&self) -> Result<&Command, ConfigurationError> {
        let parser = self.argparser.as_ref().filter(|parser| {
            let mut mounted: Vec<&str> = parser.get_subcommands().map(Command::get_name).collect();
            let mut expected: Vec<&str> = self.mounted.iter().map(|m| m.record.key.as_str()).collect();
            mounted.sort_unstable();
            expected.sort_unstable();
            mounted == expected
        });

        match parser {
            Some(parser) if self.state == DispatchState::Ready => Ok(parser),
            _ => {
                let err = ConfigurationError::Improper(self.name());
                tracing::error!(critical = true, "{err}");
                Err(err)
            }
        }
    }

    /// The attached top-level parser.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::Improper`] unless ready and consistent.
    pub fn argparser(&self) -> Result<&Command, ConfigurationError> {
        self.ensure_ready()
    }

    /// Registered commands in registration order.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::Improper`] unless ready and consistent.
    pub fn entries(&self) -> Result<Vec<CommandEntry>, ConfigurationError> {
        self.ensure_ready()?;
        Ok(self
            .mounted
            .iter()
            .map(|m| CommandEntry::from_record(&m.record))
            .collect())
    }

    /// One line per command naming the package that provides it.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::Improper`] unless ready and consistent.
    pub fn describe(&self) -> Result<Vec<String>, ConfigurationError> {
        self.ensure_ready()?;
        Ok(self
            .mounted
            .iter()
            .map(|m| {
                let root = m
                    .metadata_root
                    .as_ref()
                    .map_or_else(|| "?".to_string(), |p| p.display().to_string());
                format!("{}: {} from {root}", m.record.key, m.record.package)
            })
            .collect())
    }

    /// Parse a full command line, program name first.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Config`] unless ready, [`DispatchError::Usage`] for
    /// anything `clap` rejects.
    pub fn parse<I, T>(&self, args: I) -> Result<ArgMatches, DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let parser = self.ensure_ready()?.clone();
        Ok(parser.try_get_matches_from(args)?)
    }

    /// Run the subcommand selected in `matches`.
    ///
    /// Returns `Ok(false)` when no subcommand was given.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Runtime`] when the runtime fails.
    pub fn run(&self, matches: &ArgMatches) -> Result<bool, DispatchError> {
        self.ensure_ready()?;
        let Some((name, sub)) = matches.subcommand() else {
            return Ok(false);
        };

        let Some(mounted) = self.mounted.iter().find(|m| m.record.key == name) else {
            let err = ConfigurationError::Improper(self.name());
            tracing::error!(critical = true, "{err}");
            return Err(err.into());
        };

        tracing::debug!(
            "running '{name}' provided by '{}' from package '{}'",
            mounted.record.entry_point,
            mounted.record.package,
        );
        mounted
            .runtime
            .run(sub)
            .map_err(|error| DispatchError::Runtime {
                command: name.to_string(),
                error,
            })?;
        Ok(true)
    }

    /// Parse `args` and run the selected subcommand.
    ///
    /// # Errors
    ///
    /// See [`Self::parse`] and [`Self::run`].
    pub fn dispatch<I, T>(&self, args: I) -> Result<bool, DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = self.parse(args)?;
        self.run(&matches)
    }
}
