use std::collections::{HashMap, HashSet, VecDeque};

use kiln_schema::PackageName;

use crate::error::ResolveError;
use crate::provider::PackageProvider;

/// Snapshot of the declared dependency edges between installed packages.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    requires: HashMap<PackageName, Vec<PackageName>>,
    order: Vec<PackageName>,
}

impl DependencyGraph {
    /// Capture the dependency lists of every package the provider knows.
    pub fn from_provider(provider: &dyn PackageProvider) -> Self {
        let mut graph = Self::default();
        for package in provider.packages() {
            if graph.requires.contains_key(&package.name) {
                continue;
            }
            graph.order.push(package.name.clone());
            graph
                .requires
                .insert(package.name.clone(), package.requires.clone());
        }
        graph
    }

    /// True when the package is part of the snapshot.
    pub fn contains(&self, name: &PackageName) -> bool {
        self.requires.contains_key(name)
    }

    /// Declared dependencies of a package, empty when unknown.
    pub fn requires(&self, name: &PackageName) -> &[PackageName] {
        self.requires.get(name).map_or(&[], Vec::as_slice)
    }

    /// Resolves the dependency closure of `roots`, dependencies first.
    ///
    /// Performs a depth-first traversal over the roots in the order given,
    /// then over each package's dependencies in declared order, emitting a
    /// package only after all of its dependencies. Packages are never
    /// emitted twice.
    ///
    /// Anything already visited is never revisited, which is what stops
    /// the traversal on circular declarations. The output for a cycle is
    /// therefore best-effort: see [`Self::resolve_closure_strict`] for a
    /// variant that refuses them. Unknown names are skipped.
    pub fn resolve_closure(&self, roots: &[PackageName]) -> Vec<PackageName> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();

        for name in roots {
            if !self.contains(name) {
                tracing::debug!("package '{name}' is not available; skipped");
                continue;
            }
            self.visit(name, &mut order, &mut visited);
        }

        order
    }

    fn visit(
        &self,
        name: &PackageName,
        order: &mut Vec<PackageName>,
        visited: &mut HashSet<PackageName>,
    ) {
        if !visited.insert(name.clone()) {
            return;
        }

        for dep in self.requires(name) {
            if !self.contains(dep) {
                tracing::debug!("package '{dep}' required by '{name}' is not available; skipped");
                continue;
            }
            self.visit(dep, order, visited);
        }

        order.push(name.clone());
    }

    /// Same traversal as [`Self::resolve_closure`], but circular
    /// declarations and unknown roots are errors instead of being skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] for an unknown root and
    /// [`ResolveError::Cycle`] when a package depends on itself, directly or
    /// transitively.
    pub fn resolve_closure_strict(
        &self,
        roots: &[PackageName],
    ) -> Result<Vec<PackageName>, ResolveError> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();

        for name in roots {
            if !self.contains(name) {
                return Err(ResolveError::NotFound(name.clone()));
            }
            self.visit_strict(name, &mut order, &mut visited, &mut visiting)?;
        }

        Ok(order)
    }

    fn visit_strict(
        &self,
        name: &PackageName,
        order: &mut Vec<PackageName>,
        visited: &mut HashSet<PackageName>,
        visiting: &mut HashSet<PackageName>,
    ) -> Result<(), ResolveError> {
        if visited.contains(name) {
            return Ok(());
        }

        if visiting.contains(name) {
            return Err(ResolveError::Cycle {
                package: name.clone(),
            });
        }

        visiting.insert(name.clone());

        for dep in self.requires(name) {
            if self.contains(dep) {
                self.visit_strict(dep, order, visited, visiting)?;
            }
        }

        visiting.remove(name);
        visited.insert(name.clone());
        order.push(name.clone());

        Ok(())
    }

    /// Layers every known package so that each layer only depends on
    /// packages in earlier layers.
    ///
    /// Uses Kahn's algorithm. Layers are sorted so the plan is
    /// deterministic. Dependencies on unknown packages are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::CyclicPlan`] if some packages can never be
    /// scheduled because they depend on each other.
    pub fn build_plan(&self) -> Result<Vec<Vec<PackageName>>, ResolveError> {
        let mut dependents: HashMap<&PackageName, Vec<&PackageName>> = HashMap::new();
        let mut in_degree: HashMap<&PackageName, usize> = HashMap::new();

        for name in &self.order {
            in_degree.entry(name).or_default();
            let mut seen = HashSet::new();
            for dep in self.requires(name) {
                if !self.contains(dep) || !seen.insert(dep) {
                    continue;
                }
                dependents.entry(dep).or_default().push(name);
                *in_degree.entry(name).or_default() += 1;
            }
        }

        let mut ready: Vec<&PackageName> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();
        ready.sort();
        let mut queue = VecDeque::from(ready);

        let mut layers = Vec::new();
        while !queue.is_empty() {
            let mut layer = Vec::new();
            let mut next = Vec::new();

            while let Some(u) = queue.pop_front() {
                layer.push(u.clone());
                for v in dependents.get(u).into_iter().flatten() {
                    if let Some(degree) = in_degree.get_mut(v) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(*v);
                        }
                    }
                }
            }

            layer.sort();
            layers.push(layer);

            next.sort();
            queue = VecDeque::from(next);
        }

        let scheduled: usize = layers.iter().map(Vec::len).sum();
        if scheduled < self.order.len() {
            return Err(ResolveError::CyclicPlan);
        }

        Ok(layers)
    }
}
