pub mod artifact;
pub mod builder;
pub mod dispatch;
pub mod error;
pub mod paths;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod symbols;

#[cfg(test)]
mod test_support;

pub use artifact::{ArtifactOptions, ArtifactRegistry};
pub use builder::Builder;
pub use dispatch::{CommandEntry, CommandStatus, DispatchError, Dispatcher, Runtime, plan_commands};
pub use error::{ConfigurationError, ResolveError, SymbolError};
pub use paths::*;
pub use provider::{PackageProvider, WorkingSet};
pub use registry::{Capability, Conflict, Record, Registry};
pub use resolver::DependencyGraph;
pub use symbols::{BuilderFn, Symbol, SymbolResolver, SymbolTable, verify_builder};
