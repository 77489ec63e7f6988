//! Object identifiers: parsing, ordering, and the prefix relation used
//! throughout the record store and lookup engine.

use std::fmt;
use std::str::FromStr;

/// An SNMP object identifier: an ordered sequence of unsigned integers.
///
/// Ordering is lexicographic over the component sequence, which is the
/// same order GETNEXT/GETBULK must walk records in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn new(components: Vec<u32>) -> Self {
        Oid(components)
    }

    pub fn root() -> Self {
        Oid(Vec::new())
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }

    /// True if `self` is a prefix of `other` (including equality).
    pub fn is_prefix_of(&self, other: &Oid) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Canonical dotted-decimal string form, used as the index key.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for Oid {
    type Err = ParseOidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Oid::root());
        }

        let mut components = Vec::new();
        for part in s.trim_matches('.').split('.') {
            let n: u32 = part.parse().map_err(|_| ParseOidError(s.to_string()))?;
            components.push(n);
        }

        Ok(Oid(components))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed OID: {0}")]
pub struct ParseOidError(pub String);

impl From<Vec<u32>> for Oid {
    fn from(v: Vec<u32>) -> Self {
        Oid(v)
    }
}
