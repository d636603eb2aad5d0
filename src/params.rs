//! Caller-supplied report parameters.

use std::collections::HashMap;

/// Case-insensitive, multi-valued mapping of parameter names to raw values.
///
/// Keys that differ only by case share a single entry: the spelling of the
/// first insertion is kept and later values are appended to it. Entries keep
/// their insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterBag {
    entries: Vec<(String, Vec<String>)>,
}

impl ParameterBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under `name`, merging with an existing entry whose
    /// name matches case-insensitively.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Appends a value and returns the updated bag.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(name, value);
        self
    }

    /// Appends several values under one name and returns the updated bag.
    pub fn with_values<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let name = name.into();
        for value in values {
            self.add(name.clone(), value);
        }
        self
    }

    /// Returns the stored key and all values for `name`, matched case-insensitively.
    pub fn entry(&self, name: &str) -> Option<(&str, &[String])> {
        self.position(name)
            .map(|index| (self.entries[index].0.as_str(), self.entries[index].1.as_slice()))
    }

    /// Returns every value stored for `name`.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.entry(name).map(|(_, values)| values)
    }

    /// Returns the first value stored for `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns `true` if the bag has an entry for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of distinct (case-insensitive) names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no parameters were supplied.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(candidate, _)| names_match(candidate, name))
    }
}

/// Case-insensitive parameter name comparison.
pub fn names_match(left: &str, right: &str) -> bool {
    left.eq_ignore_ascii_case(right) || left.to_lowercase() == right.to_lowercase()
}

impl<K, V> FromIterator<(K, V)> for ParameterBag
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = ParameterBag::new();
        for (name, value) in iter {
            bag.add(name, value);
        }
        bag
    }
}

impl<K, V> Extend<(K, V)> for ParameterBag
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.add(name, value);
        }
    }
}

impl From<HashMap<String, String>> for ParameterBag {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<&HashMap<String, String>> for ParameterBag {
    fn from(map: &HashMap<String, String>) -> Self {
        map.iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect()
    }
}
