//! Parikh 向量：标签序列的计数多重集，与顺序无关.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Label → occurrence count. Zero counts are never stored, so two vectors
/// are equal exactly when they count every label the same.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParikhVector(BTreeMap<String, u64>);

impl ParikhVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sequence<I, S>(sequence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vector = Self::new();
        for label in sequence {
            vector.add(label.as_ref(), 1);
        }
        vector
    }

    pub fn add(&mut self, label: &str, count: u64) {
        if count > 0 {
            *self.0.entry(label.to_owned()).or_insert(0) += count;
        }
    }

    pub fn get(&self, label: &str) -> u64 {
        self.0.get(label).copied().unwrap_or(0)
    }

    /// Total number of occurrences.
    pub fn len(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(label, count)| (label.as_str(), *count))
    }

    /// No label occurs in both vectors.
    pub fn is_disjoint(&self, other: &ParikhVector) -> bool {
        self.labels().all(|label| other.get(label) == 0)
    }
}

impl fmt::Debug for ParikhVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for ParikhVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, (label, count)) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{label}: {count}")?;
        }
        f.write_str("}")
    }
}

impl<S: AsRef<str>> FromIterator<S> for ParikhVector {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_sequence(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_does_not_matter() {
        let left = ParikhVector::from_sequence(["a", "b", "a"]);
        let right: ParikhVector = ["b", "a", "a"].into_iter().collect();

        assert_eq!(left, right);
        assert_eq!(left.get("a"), 2);
        assert_eq!(left.get("c"), 0);
        assert_eq!(left.len(), 3);
        assert_eq!(left.to_string(), "{a: 2, b: 1}");
    }

    #[test]
    fn disjointness() {
        let ab = ParikhVector::from_sequence(["a", "b"]);
        let c = ParikhVector::from_sequence(["c", "c"]);
        let bc = ParikhVector::from_sequence(["b", "c"]);

        assert!(ab.is_disjoint(&c));
        assert!(c.is_disjoint(&ab));
        assert!(!ab.is_disjoint(&bc));
        assert!(ParikhVector::new().is_disjoint(&ab));

        let mut grown = ab.clone();
        grown.add("z", 0);
        assert_eq!(grown, ab);
    }
}
