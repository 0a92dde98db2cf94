//! Metric label sets.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::cache::MemorySize;

/// The label set identifying a single time series.
///
/// Labels are kept sorted by name so two label sets with the same pairs
/// always compare and print identically.
///
/// ```
/// use promwarden_core::Labels;
///
/// let labels = Labels::from_iter([("job", "node"), ("instance", "a:9100")]);
/// assert_eq!(labels.get("job"), Some("node"));
/// assert_eq!(labels.to_string(), r#"{instance="a:9100", job="node"}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(BTreeMap<SmolStr, SmolStr>);

impl Labels {
    /// Creates an empty label set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of label `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(SmolStr::as_str)
    }

    /// Returns the metric name (`__name__` label), if present.
    pub fn metric_name(&self) -> Option<&str> {
        self.get("__name__")
    }

    /// Number of labels in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set has no labels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Labels
where
    K: Into<SmolStr>,
    V: Into<SmolStr>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value:?}")?;
        }
        f.write_str("}")
    }
}

impl MemorySize for Labels {
    fn memory_size(&self) -> usize {
        // BTreeMap node overhead is approximated per entry.
        self.0
            .iter()
            .map(|(k, v)| 2 * std::mem::size_of::<SmolStr>() + 16 + heap_len(k) + heap_len(v))
            .sum()
    }
}

/// Bytes stored outside the `SmolStr` itself (strings over the 23 byte inline limit).
pub(crate) fn heap_len(s: &SmolStr) -> usize {
    if s.is_heap_allocated() { s.len() } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_sorted() {
        let labels = Labels::from_iter([("b", "2"), ("a", "1")]);
        assert_eq!(labels.to_string(), r#"{a="1", b="2"}"#);
    }

    #[test]
    fn test_empty_display() {
        assert_eq!(Labels::new().to_string(), "{}");
    }

    #[test]
    fn test_deserialize_from_object() {
        let labels: Labels =
            serde_json::from_str(r#"{"__name__":"up","job":"prometheus"}"#).unwrap();
        assert_eq!(labels.metric_name(), Some("up"));
        assert_eq!(labels.len(), 2);
    }
}
