//! Typed errors raised by the core.
//!
//! Only [`ConfigurationError`] is meant to abort a caller. Everything that
//! can go wrong while registering or building is absorbed and logged by the
//! component that hit it.

use kiln_schema::PackageName;
use thiserror::Error;

/// Programmer errors in how a [`crate::dispatch::Dispatcher`] is driven.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The one-time argument parser hook was invoked again.
    #[error("root runtime '{0}' already initialized an argument parser and cannot be reused")]
    ArgparserReused(String),

    /// The dispatch table was needed while the instance was not in a
    /// consistent ready state.
    #[error("'{0}' instance has been used or initialized improperly")]
    Improper(String),
}

/// Failure to turn a target reference into a symbol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("no module named '{0}'")]
    NoModule(String),

    #[error("module '{module}' has no attribute '{attr}'")]
    NoAttribute { module: String, attr: String },
}

/// Errors from strict dependency resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("package '{0}' not found")]
    NotFound(PackageName),

    #[error("circular dependency detected involving package: {package}")]
    Cycle { package: PackageName },

    #[error("circular dependency detected in build graph")]
    CyclicPlan,
}
