//! The parameter bag: an insertion-ordered bind-name to value mapping.

use sqlrepo_core::Value;

/// Parameters accumulated while composing a statement.
///
/// Keys are unique: writing an existing key overwrites its value in place
/// without disturbing insertion order. Anonymous values get deterministic
/// synthetic names (`p0`, `p1`, ...) in call order.
#[derive(Debug, Clone, Default)]
pub struct ParameterBag {
    entries: Vec<(String, Value)>,
}

impl ParameterBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether a bind name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Get the value bound to a name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Bind a named value; an existing key is overwritten in place.
    pub fn add(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Bind an anonymous value under the next `p{N}` name, returning the
    /// name that was assigned.
    pub fn add_positional(&mut self, value: Value) -> String {
        let name = format!("p{}", self.entries.len());
        self.add(name.clone(), value);
        name
    }

    /// Merge another bag into this one; its keys overwrite on collision.
    pub fn merge(&mut self, other: ParameterBag) {
        for (name, value) in other.entries {
            self.add(name, value);
        }
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a ParameterBag {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
