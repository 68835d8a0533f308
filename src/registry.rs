//! Catalog of capability providers, indexed by name and by category.

use crate::capability::{Capability, CapabilityDescriptor, Category};
use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;

/// Two selected providers that refuse to be composed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub a: String,
    pub b: String,
    pub reason: String,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' and '{}': {}", self.a, self.b, self.reason)
    }
}

/// In-memory provider catalog.
///
/// The registry is an ordinary owned value: build one, register descriptors
/// and hand a reference to the generator. Iteration follows registration order.
#[derive(Debug, Default)]
pub struct Registry {
    descriptors: IndexMap<String, CapabilityDescriptor>,
    categories: IndexMap<Category, Vec<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor to the catalog.
    ///
    /// # Errors
    /// * `Error::MissingMetadata` if the name or display name is blank
    /// * `Error::DuplicateCapability` if the name is already registered
    pub fn register(&mut self, descriptor: CapabilityDescriptor) -> Result<()> {
        if descriptor.name.trim().is_empty() {
            return Err(Error::MissingMetadata { field: "name" });
        }
        if descriptor.display_name.trim().is_empty() {
            return Err(Error::MissingMetadata { field: "display_name" });
        }
        if self.descriptors.contains_key(&descriptor.name) {
            return Err(Error::DuplicateCapability { name: descriptor.name });
        }

        debug!("Registering capability '{}' ({})", descriptor.name, descriptor.category);
        self.categories
            .entry(descriptor.category)
            .or_default()
            .push(descriptor.name.clone());
        self.descriptors.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Removes a descriptor from both indices. Unknown names are ignored.
    pub fn unregister(&mut self, name: &str) -> Option<CapabilityDescriptor> {
        let removed = self.descriptors.shift_remove(name)?;
        if let Some(names) = self.categories.get_mut(&removed.category) {
            names.retain(|n| n != name);
            if names.is_empty() {
                self.categories.shift_remove(&removed.category);
            }
        }
        Some(removed)
    }

    pub fn get(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.descriptors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    pub fn by_category(&self, category: Category) -> Vec<&CapabilityDescriptor> {
        self.categories
            .get(&category)
            .map(|names| names.iter().filter_map(|n| self.descriptors.get(n)).collect())
            .unwrap_or_default()
    }

    /// Categories that currently hold at least one descriptor.
    pub fn all_categories(&self) -> Vec<Category> {
        self.categories.keys().copied().collect()
    }

    pub fn all(&self) -> Vec<&CapabilityDescriptor> {
        self.descriptors.values().collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Binds a registered descriptor to a configuration.
    ///
    /// # Errors
    /// * `Error::UnknownCapability` if `name` is not registered
    pub fn instantiate(&self, name: &str, config: &ProjectConfig) -> Result<Box<dyn Capability>> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| Error::UnknownCapability { name: name.to_string() })?;
        Ok(descriptor.instantiate(config))
    }

    /// Every other descriptor that `name` can be composed with.
    ///
    /// A pair counts as compatible only when both providers agree.
    pub fn compatible_pairs(&self, name: &str) -> Result<Vec<&CapabilityDescriptor>> {
        let probe = self.probe(name)?;
        Ok(self
            .descriptors
            .values()
            .filter(|other| other.name != name)
            .filter(|other| {
                let other_probe = other.instantiate(&ProjectConfig::default());
                probe.is_compatible_with(&other.name) && other_probe.is_compatible_with(name)
            })
            .collect())
    }

    /// Checks every pair of `names` and reports each incompatible pair once.
    ///
    /// Names that are not registered are skipped.
    pub fn validate_compatibility<S: AsRef<str>>(&self, names: &[S]) -> Vec<Conflict> {
        let probes: Vec<(&str, Box<dyn Capability>)> = names
            .iter()
            .map(|name| name.as_ref())
            .filter_map(|name| self.probe(name).ok().map(|probe| (name, probe)))
            .collect();

        let mut conflicts = Vec::new();
        for (i, (a, probe_a)) in probes.iter().enumerate() {
            for (b, probe_b) in probes.iter().skip(i + 1) {
                let a_accepts = probe_a.is_compatible_with(b);
                let b_accepts = probe_b.is_compatible_with(a);
                let reason = match (a_accepts, b_accepts) {
                    (true, true) => continue,
                    (false, false) => "mutually exclusive".to_string(),
                    (false, true) => format!("'{a}' cannot be combined with '{b}'"),
                    (true, false) => format!("'{b}' cannot be combined with '{a}'"),
                };
                conflicts.push(Conflict { a: a.to_string(), b: b.to_string(), reason });
            }
        }
        conflicts
    }

    // Compatibility is a property of provider identity, so probes are bound to
    // an empty configuration.
    fn probe(&self, name: &str) -> Result<Box<dyn Capability>> {
        self.instantiate(name, &ProjectConfig::default())
    }
}
