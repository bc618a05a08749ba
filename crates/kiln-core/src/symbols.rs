//! Target reference resolution.
//!
//! Declarations name their targets with strings like
//! `example.builders:lib`. Something has to turn that into code; here that
//! is a [`SymbolResolver`]. The stock implementation is [`SymbolTable`], a
//! lookup table populated up front by whoever owns the binary.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use kiln_schema::{DeclarationError, PackageName, Target};

use crate::dispatch::Runtime;
use crate::error::SymbolError;

/// Produces one artifact from an ordered package list.
///
/// `package_names` is the dependency closure of the package being built,
/// ending with that package. The builder must write `export_target`.
pub trait BuilderFn: Send + Sync {
    /// Generate the artifact.
    ///
    /// # Errors
    ///
    /// Any error is logged by the caller and treated as a failed build of
    /// this one artifact.
    fn build(&self, package_names: &[PackageName], export_target: &Path) -> anyhow::Result<()>;
}

impl<F> BuilderFn for F
where
    F: Fn(&[PackageName], &Path) -> anyhow::Result<()> + Send + Sync,
{
    fn build(&self, package_names: &[PackageName], export_target: &Path) -> anyhow::Result<()> {
        self(package_names, export_target)
    }
}

/// Something a target reference can resolve to.
#[derive(Clone)]
pub enum Symbol {
    /// A builder taking `(package_names, export_target)`.
    Builder(Arc<dyn BuilderFn>),
    /// A command runtime.
    Runtime(Arc<dyn Runtime>),
    /// Any other callable, known only by how many positional arguments it
    /// takes.
    Callable { arity: usize },
}

impl Symbol {
    /// Wrap a builder closure.
    pub fn builder<F>(f: F) -> Self
    where
        F: Fn(&[PackageName], &Path) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Builder(Arc::new(f))
    }

    /// Wrap a runtime.
    pub fn runtime<R: Runtime + 'static>(runtime: R) -> Self {
        Self::Runtime(Arc::new(runtime))
    }

    /// Number of positional parameters the symbol accepts, if it is callable
    /// with positional arguments at all.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Self::Builder(_) => Some(2),
            Self::Runtime(_) => None,
            Self::Callable { arity } => Some(*arity),
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builder(_) => f.write_str("Symbol::Builder(..)"),
            Self::Runtime(_) => f.write_str("Symbol::Runtime(..)"),
            Self::Callable { arity } => write!(f, "Symbol::Callable {{ arity: {arity} }}"),
        }
    }
}

/// Return the builder if `symbol` has the `(package_names, export_target)`
/// signature.
pub fn verify_builder(symbol: &Symbol) -> Option<&Arc<dyn BuilderFn>> {
    match symbol {
        Symbol::Builder(builder) => Some(builder),
        _ => None,
    }
}

/// Resolves target references to symbols.
pub trait SymbolResolver {
    /// Locate the symbol `target` refers to.
    ///
    /// # Errors
    ///
    /// Returns a [`SymbolError`] when the module or an attribute along the
    /// chain does not exist.
    fn resolve(&self, target: &Target) -> Result<Symbol, SymbolError>;
}

/// A static table of modules and the symbols they export.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    modules: HashMap<String, HashMap<String, Symbol>>,
}

impl SymbolTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Export `symbol` at `reference` (`module:attr.chain`).
    ///
    /// # Errors
    ///
    /// Returns an error if `reference` is not a valid target, or names a
    /// module without an attribute chain.
    pub fn insert(&mut self, reference: &str, symbol: Symbol) -> Result<&mut Self, DeclarationError> {
        let target = Target::parse(reference)?;
        if target.attrs.is_empty() {
            return Err(DeclarationError::InvalidTarget(reference.to_string()));
        }
        self.modules
            .entry(target.module.clone())
            .or_default()
            .insert(target.attr_path(), symbol);
        Ok(self)
    }

    /// Builder-style [`Self::insert`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::insert`].
    pub fn with(mut self, reference: &str, symbol: Symbol) -> Result<Self, DeclarationError> {
        self.insert(reference, symbol)?;
        Ok(self)
    }
}

impl SymbolResolver for SymbolTable {
    fn resolve(&self, target: &Target) -> Result<Symbol, SymbolError> {
        let exports = self
            .modules
            .get(&target.module)
            .ok_or_else(|| SymbolError::NoModule(target.module.clone()))?;

        exports
            .get(&target.attr_path())
            .cloned()
            .ok_or_else(|| SymbolError::NoAttribute {
                module: target.module.clone(),
                attr: if target.attrs.is_empty() {
                    "<module>".to_string()
                } else {
                    target.attr_path()
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        SymbolTable::new()
            .with("demo.build:good", Symbol::builder(|_, _| Ok(())))
            .unwrap()
            .with("demo.build:bad", Symbol::Callable { arity: 0 })
            .unwrap()
    }

    #[test]
    fn test_resolve_and_verify() {
        let table = table();
        let good = table.resolve(&Target::parse("demo.build:good").unwrap()).unwrap();
        assert!(verify_builder(&good).is_some());
        assert_eq!(good.arity(), Some(2));

        let bad = table.resolve(&Target::parse("demo.build:bad").unwrap()).unwrap();
        assert!(verify_builder(&bad).is_none());
        assert_eq!(bad.arity(), Some(0));
    }

    #[test]
    fn test_resolution_errors() {
        let table = table();
        assert_eq!(
            table.resolve(&Target::parse("nowhere:thing").unwrap()).unwrap_err(),
            SymbolError::NoModule("nowhere".into())
        );
        assert_eq!(
            table.resolve(&Target::parse("demo.build:not_exist").unwrap()).unwrap_err(),
            SymbolError::NoAttribute {
                module: "demo.build".into(),
                attr: "not_exist".into()
            }
        );
    }

    #[test]
    fn test_insert_requires_attribute() {
        let mut table = SymbolTable::new();
        assert!(table.insert("demo.build", Symbol::Callable { arity: 1 }).is_err());
        assert!(table.insert("not valid:", Symbol::Callable { arity: 1 }).is_err());
    }
}
