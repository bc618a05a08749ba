//! Entry point declarations.
//!
//! Packages advertise capabilities through an INI-like block of
//! declarations grouped under `[group]` headers:
//!
//! ```text
//! [kiln.artifacts]
//! bundle.js = example.builders:bundle
//! lib.js = example.builders:lib [minify]
//!
//! [kiln.runtime]
//! example = example.cli:runtime
//! ```
//!
//! Each line is `name = module.path[:attr.chain] [extras]`. The target is
//! opaque to this crate; a symbol resolver turns it into something callable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

use regex::Regex;

static DOTTED_IDENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").ok()
});

fn is_dotted_ident(s: &str) -> bool {
    DOTTED_IDENT.as_ref().is_some_and(|re| re.is_match(s))
}

/// Errors produced while parsing declarations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    /// The line has no `=` between name and target.
    #[error("expected 'name = module:attrs', got '{0}'")]
    MissingSeparator(String),

    /// The name on the left of `=` is empty.
    #[error("entry point has an empty name: '{0}'")]
    EmptyName(String),

    /// The target is not a dotted module path with an optional attribute chain.
    #[error("invalid target reference '{0}'")]
    InvalidTarget(String),

    /// The extras list is not closed or contains an empty item.
    #[error("invalid extras in '{0}'")]
    InvalidExtras(String),

    /// A declaration appeared before any `[group]` header.
    #[error("declaration '{0}' appears before any [group] header")]
    MissingGroup(String),

    /// A `[group]` header was empty or unterminated.
    #[error("invalid group header '{0}'")]
    InvalidGroup(String),
}

/// A reference to something a symbol resolver can locate: a dotted module
/// path plus an optional attribute chain inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Dotted module path, e.g. `example.builders`.
    pub module: String,
    /// Attribute chain walked from the module, e.g. `["npm", "runtime"]`.
    pub attrs: Vec<String>,
}

impl Target {
    /// Parse `module.path` or `module.path:attr.chain`.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::InvalidTarget`] when either half is not a
    /// dotted identifier.
    pub fn parse(s: &str) -> Result<Self, DeclarationError> {
        let s = s.trim();
        let (module, attrs) = match s.split_once(':') {
            Some((module, attrs)) => (module.trim(), Some(attrs.trim())),
            None => (s, None),
        };

        if !is_dotted_ident(module) {
            return Err(DeclarationError::InvalidTarget(s.to_string()));
        }

        let attrs = match attrs {
            Some(chain) if is_dotted_ident(chain) => {
                chain.split('.').map(str::to_string).collect()
            }
            Some(_) => return Err(DeclarationError::InvalidTarget(s.to_string())),
            None => Vec::new(),
        };

        Ok(Self {
            module: module.to_string(),
            attrs,
        })
    }

    /// The innermost attribute name, which doubles as the logical name of
    /// the capability (a builder registered as `pkg.builders:lib` builds
    /// `lib` artifacts).
    pub fn final_attr(&self) -> Option<&str> {
        self.attrs.last().map(String::as_str)
    }

    /// The attribute chain joined back with dots.
    pub fn attr_path(&self) -> String {
        self.attrs.join(".")
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs.is_empty() {
            f.write_str(&self.module)
        } else {
            write!(f, "{}:{}", self.module, self.attr_path())
        }
    }
}

impl FromStr for Target {
    type Err = DeclarationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One `name = target [extras]` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryPoint {
    /// The key as declared, before any normalization.
    pub name: String,
    /// What the entry point refers to.
    pub target: Target,
    /// Optional extras, kept for display and introspection.
    #[serde(default)]
    pub extras: Vec<String>,
}

impl EntryPoint {
    /// Parse a single declaration line.
    ///
    /// # Errors
    ///
    /// Returns a [`DeclarationError`] describing the first problem found.
    pub fn parse(line: &str) -> Result<Self, DeclarationError> {
        let line = line.trim();
        let (name, value) = line
            .split_once('=')
            .ok_or_else(|| DeclarationError::MissingSeparator(line.to_string()))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(DeclarationError::EmptyName(line.to_string()));
        }

        let value = value.trim();
        let (target, extras) = match value.find('[') {
            Some(open) => {
                let rest = value[open + 1..].trim_end();
                let inner = rest
                    .strip_suffix(']')
                    .ok_or_else(|| DeclarationError::InvalidExtras(line.to_string()))?;
                let extras: Vec<String> = inner
                    .split(',')
                    .map(|e| e.trim().to_string())
                    .collect();
                if extras.iter().any(String::is_empty) {
                    return Err(DeclarationError::InvalidExtras(line.to_string()));
                }
                (&value[..open], extras)
            }
            None => (value, Vec::new()),
        };

        Ok(Self {
            name: name.to_string(),
            target: Target::parse(target)?,
            extras,
        })
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.target)?;
        if !self.extras.is_empty() {
            write!(f, " [{}]", self.extras.join(","))?;
        }
        Ok(())
    }
}

impl FromStr for EntryPoint {
    type Err = DeclarationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One parsed line of a declaration block.
///
/// `group` is `None` for lines that appear outside any valid `[group]`
/// header; those are always errors.
pub type Declaration = (Option<String>, Result<EntryPoint, DeclarationError>);

/// Parse a whole declaration block.
///
/// Order is preserved exactly as written; registration order downstream
/// depends on it. Every malformed line produces its own `Err` item so a
/// caller can report it and keep going with the rest of the block.
pub fn parse_entry_points(text: &str) -> Vec<Declaration> {
    let mut group: Option<String> = None;
    let mut out = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            match header.strip_suffix(']').map(str::trim) {
                Some(name) if !name.is_empty() => group = Some(name.to_string()),
                _ => {
                    // Drop declarations until the next good header.
                    group = None;
                    out.push((None, Err(DeclarationError::InvalidGroup(line.to_string()))));
                }
            }
            continue;
        }

        match &group {
            Some(g) => out.push((Some(g.clone()), EntryPoint::parse(line))),
            None => out.push((None, Err(DeclarationError::MissingGroup(line.to_string())))),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_point() {
        let ep = EntryPoint::parse("full.js = example.builders:full").unwrap();
        assert_eq!(ep.name, "full.js");
        assert_eq!(ep.target.module, "example.builders");
        assert_eq!(ep.target.attrs, vec!["full"]);
        assert_eq!(ep.to_string(), "full.js = example.builders:full");
    }

    #[test]
    fn test_parse_attribute_chain_and_extras() {
        let ep: EntryPoint = "npm = calm.npm:npm.runtime [cli, extra]".parse().unwrap();
        assert_eq!(ep.target.attrs, vec!["npm", "runtime"]);
        assert_eq!(ep.target.final_attr(), Some("runtime"));
        assert_eq!(ep.extras, vec!["cli", "extra"]);
        assert_eq!(ep.to_string(), "npm = calm.npm:npm.runtime [cli,extra]");
    }

    #[test]
    fn test_module_only_target() {
        let ep = EntryPoint::parse("module1 = example.testing.module1").unwrap();
        assert!(ep.target.attrs.is_empty());
        assert_eq!(ep.target.final_attr(), None);
        assert_eq!(ep.target.to_string(), "example.testing.module1");
    }

    #[test]
    fn test_names_are_not_validated_here() {
        // Name policy belongs to the registries that consume the entry points.
        let ep = EntryPoint::parse("bad name = calm.npm:npm.runtime").unwrap();
        assert_eq!(ep.name, "bad name");
    }

    #[test]
    fn test_malformed_entry_points() {
        assert!(matches!(
            EntryPoint::parse("no separator here"),
            Err(DeclarationError::MissingSeparator(_))
        ));
        assert!(matches!(
            EntryPoint::parse(" = mod:attr"),
            Err(DeclarationError::EmptyName(_))
        ));
        assert!(matches!(
            EntryPoint::parse("x = 9mod:attr"),
            Err(DeclarationError::InvalidTarget(_))
        ));
        assert!(matches!(
            EntryPoint::parse("x = mod:"),
            Err(DeclarationError::InvalidTarget(_))
        ));
        assert!(matches!(
            EntryPoint::parse("x = mod:attr [a,"),
            Err(DeclarationError::InvalidExtras(_))
        ));
    }

    #[test]
    fn test_parse_block_preserves_order_and_groups() {
        let block = "\
# comment
[kiln.artifacts]
b.js = pkg.build:b
a.js = pkg.build:a

[kiln.runtime]
cmd = pkg.cli:runtime
";
        let names: Vec<_> = parse_entry_points(block)
            .into_iter()
            .map(|(g, ep)| format!("{}/{}", g.unwrap(), ep.unwrap().name))
            .collect();
        assert_eq!(
            names,
            vec!["kiln.artifacts/b.js", "kiln.artifacts/a.js", "kiln.runtime/cmd"]
        );
    }

    #[test]
    fn test_parse_block_reports_bad_lines_and_continues() {
        let block = "\
orphan = pkg:x
[kiln.artifacts]
good.js = pkg:good
garbage
[]
lost.js = pkg:lost
[kiln.artifacts]
also.js = pkg:also
";
        let parsed = parse_entry_points(block);
        assert_eq!(parsed.len(), 6);
        assert!(matches!(parsed[0], (None, Err(DeclarationError::MissingGroup(_)))));
        assert!(parsed[1].1.is_ok());
        // A bad line inside a group is still attributed to that group.
        assert_eq!(parsed[2].0.as_deref(), Some("kiln.artifacts"));
        assert!(matches!(parsed[2].1, Err(DeclarationError::MissingSeparator(_))));
        assert!(matches!(parsed[3], (None, Err(DeclarationError::InvalidGroup(_)))));
        assert!(matches!(parsed[4], (None, Err(DeclarationError::MissingGroup(_)))));
        assert_eq!(parsed[5].1.as_ref().unwrap().name, "also.js");
    }
}
