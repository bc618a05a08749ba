//! Capability registries.
//!
//! A [`Registry`] is built once from an ordered list of declarations and is
//! read-only afterwards. What a record stores, how keys are normalized and
//! how collisions are reported is decided by a [`Capability`]; the registry
//! itself only enforces the one invariant they all share: after
//! construction, exactly one record owns each normalized key, and it is the
//! first one registered under it.

use std::collections::HashMap;

use kiln_schema::{EntryPoint, PackageDescriptor, PackageId};

use crate::provider::PackageProvider;

/// A registered declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<V> {
    /// Normalized key the record is stored under.
    pub key: String,
    /// Key before normalization.
    pub raw_key: String,
    /// Package that declared the entry point.
    pub package: PackageId,
    /// The declaration itself.
    pub entry_point: EntryPoint,
    /// Position in registration order; breaks ties deterministically.
    pub seq: usize,
    /// Capability-specific payload.
    pub value: V,
}

/// What to do with a declaration whose key is already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Drop the incoming declaration.
    Ignore,
    /// Retry the incoming declaration under another key.
    Fallback(String),
}

/// Policy hooks that specialize a [`Registry`].
pub trait Capability {
    /// What a record stores.
    type Value;

    /// Declaration group this capability reads, e.g. `kiln.artifacts`.
    fn group(&self) -> &str;

    /// Decide the raw key and payload for a declaration.
    ///
    /// Returning `None` rejects the declaration; the implementation is
    /// responsible for logging why.
    fn build_record(
        &self,
        package: &PackageDescriptor,
        entry_point: &EntryPoint,
    ) -> Option<(String, Self::Value)>;

    /// Map a raw key to the form keys are compared in.
    fn normalize(&self, raw_key: &str) -> String {
        raw_key.to_string()
    }

    /// Report a collision and decide what happens to `incoming`.
    fn on_conflict(
        &self,
        existing: &Record<Self::Value>,
        incoming: &Record<Self::Value>,
    ) -> Conflict {
        tracing::warn!(
            "entry point '{}' from package '{}' conflicts with '{}' from package '{}' \
             under the key '{}'; conflicting entry point registration will be ignored.",
            incoming.entry_point,
            incoming.package,
            existing.entry_point,
            existing.package,
            existing.key,
        );
        Conflict::Ignore
    }

    /// Report that the fallback key chosen by [`Capability::on_conflict`] is
    /// taken as well. The incoming declaration is dropped afterwards.
    fn on_fallback_taken(&self, holder: &Record<Self::Value>, incoming: &Record<Self::Value>) {
        tracing::warn!(
            "entry point '{}' from package '{}' could not fall back to '{}', \
             already held by '{}' from package '{}'",
            incoming.entry_point,
            incoming.package,
            holder.key,
            holder.entry_point,
            holder.package,
        );
    }
}

/// An immutable, first-wins table of capability records.
#[derive(Debug, Clone)]
pub struct Registry<C: Capability> {
    capability: C,
    records: Vec<Record<C::Value>>,
    index: HashMap<String, usize>,
    seq: usize,
}

impl<C: Capability> Registry<C> {
    /// Scan every package of `provider`, in its iteration order, and
    /// register the declarations of this capability's group.
    ///
    /// Malformed declaration lines are logged and skipped.
    pub fn new(capability: C, provider: &dyn PackageProvider) -> Self {
        let mut registry = Self::empty(capability);

        for package in provider.packages() {
            for declaration in package.declarations(registry.capability.group()) {
                match declaration {
                    Ok(entry_point) => registry.register(package, entry_point),
                    Err(e) => tracing::warn!(
                        "bad '{}' entry point declaration in package '{}': {e}",
                        registry.capability.group(),
                        package.id(),
                    ),
                }
            }
        }

        tracing::debug!(
            "registry '{}' initialized with {} record(s)",
            registry.capability.group(),
            registry.len(),
        );
        registry
    }

    /// Build a registry from an explicit, ordered candidate list.
    ///
    /// The result depends only on the order of `declarations`.
    pub fn from_declarations<'a, I>(capability: C, declarations: I) -> Self
    where
        I: IntoIterator<Item = (&'a PackageDescriptor, EntryPoint)>,
    {
        let mut registry = Self::empty(capability);
        for (package, entry_point) in declarations {
            registry.register(package, entry_point);
        }
        registry
    }

    fn empty(capability: C) -> Self {
        Self {
            capability,
            records: Vec::new(),
            index: HashMap::new(),
            seq: 0,
        }
    }

    /// Register one declaration. First registration under a key wins.
    pub(crate) fn register(&mut self, package: &PackageDescriptor, entry_point: EntryPoint) {
        let seq = self.seq;
        self.seq += 1;

        let Some((raw_key, value)) = self.capability.build_record(package, &entry_point) else {
            return;
        };

        let incoming = Record {
            key: self.capability.normalize(&raw_key),
            raw_key,
            package: package.id(),
            entry_point,
            seq,
            value,
        };

        let Some(&existing) = self.index.get(&incoming.key) else {
            self.insert(incoming);
            return;
        };

        match self.capability.on_conflict(&self.records[existing], &incoming) {
            Conflict::Ignore => {}
            Conflict::Fallback(raw_key) => {
                let key = self.capability.normalize(&raw_key);
                if let Some(&holder) = self.index.get(&key) {
                    self.capability
                        .on_fallback_taken(&self.records[holder], &incoming);
                } else {
                    self.insert(Record {
                        key,
                        raw_key,
                        ..incoming
                    });
                }
            }
        }
    }

    fn insert(&mut self, record: Record<C::Value>) {
        tracing::trace!(
            "registered '{}' from package '{}' under '{}'",
            record.entry_point,
            record.package,
            record.key,
        );
        self.index.insert(record.key.clone(), self.records.len());
        self.records.push(record);
    }

    /// Look up the record owning `key`. The key is normalized first.
    pub fn get(&self, key: &str) -> Option<&Record<C::Value>> {
        let key = self.capability.normalize(key);
        self.index.get(&key).map(|&idx| &self.records[idx])
    }

    /// Iterate `(key, record)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record<C::Value>)> {
        self.records.iter().map(|r| (r.key.as_str(), r))
    }

    /// All records in registration order.
    pub fn records(&self) -> &[Record<C::Value>] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The capability this registry was built with.
    pub fn capability(&self) -> &C {
        &self.capability
    }
}
