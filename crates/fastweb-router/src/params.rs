//! Captured path parameters

use smallvec::SmallVec;

/// A single captured wildcard: `:name` or `*name` bound to its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

/// Parameters captured by a lookup, ordered left to right as the
/// wildcards occur in the matched pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: SmallVec<[Param; 4]>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the first parameter named `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.push(Param {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|p| (p.key.as_str(), p.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Params as owned `(key, value)` pairs
    pub fn to_vec(&self) -> Vec<(String, String)> {
        self.inner
            .iter()
            .map(|p| (p.key.clone(), p.value.clone()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}
