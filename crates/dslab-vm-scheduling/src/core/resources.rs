//! Resource vectors.

use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Quantities of named resources (e.g. CPU cores, RAM) kept in declaration order.
///
/// The first declared resource is the primary one for sorting heuristics, the second one is the secondary.
/// A resource absent from the vector has zero quantity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resources {
    values: IndexMap<String, u64>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<S: Into<String>, I: IntoIterator<Item = (S, u64)>>(pairs: I) -> Self {
        let mut values = IndexMap::new();
        for (name, quantity) in pairs {
            values.insert(name.into(), quantity);
        }
        Self { values }
    }

    /// Builder-style setter.
    pub fn with<S: Into<String>>(mut self, name: S, quantity: u64) -> Self {
        self.set(name, quantity);
        self
    }

    pub fn set<S: Into<String>>(&mut self, name: S, quantity: u64) {
        self.values.insert(name.into(), quantity);
    }

    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|name| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(name, quantity)| (name.as_str(), *quantity))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns quantities of the specified resources in the specified order.
    pub fn ordered_by(&self, names: &[String]) -> Vec<u64> {
        names.iter().map(|name| self.get(name)).collect()
    }

    /// Returns the first resource of this demand which is not covered by `available`,
    /// together with the requested and the available quantities.
    pub fn first_shortage<'a>(&'a self, available: &Resources) -> Option<(&'a str, u64, u64)> {
        self.values
            .iter()
            .find(|(name, quantity)| **quantity > available.get(name))
            .map(|(name, quantity)| (name.as_str(), *quantity, available.get(name)))
    }

    /// Checks whether this demand can be served from `available` in every resource dimension.
    pub fn fits_into(&self, available: &Resources) -> bool {
        self.first_shortage(available).is_none()
    }

    pub fn increase(&mut self, other: &Resources) {
        for (name, quantity) in other.values.iter() {
            *self.values.entry(name.clone()).or_insert(0) += quantity;
        }
    }

    pub fn decrease(&mut self, other: &Resources) {
        for (name, quantity) in other.values.iter() {
            let value = self.values.entry(name.clone()).or_insert(0);
            *value = value.saturating_sub(*quantity);
        }
    }
}

impl Display for Resources {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (name, quantity)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, quantity)?;
        }
        write!(f, "}}")
    }
}
