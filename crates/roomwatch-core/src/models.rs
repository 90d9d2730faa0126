use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Canonical key identifying one listing.
///
/// Built from a display name and an address as `"<name> - <address>"` with
/// whitespace normalized. Two listings are the same listing if and only if
/// their identities are equal. An identity is never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryIdentity(String);

impl EntryIdentity {
    /// Normalize a raw identity string. Returns `None` if nothing is left.
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = collapse_whitespace(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// Combine a listing name and its (possibly multi-line) address.
    ///
    /// Address lines are trimmed and joined with `", "`. Returns `None` when
    /// either component is empty after normalization.
    pub fn from_parts(name: &str, address: &str) -> Option<Self> {
        let name = collapse_whitespace(name);
        let address = address
            .lines()
            .map(collapse_whitespace)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        if name.is_empty() || address.is_empty() {
            return None;
        }
        Some(Self(format!("{name} - {address}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntryIdentity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value).ok_or_else(|| "entry identity must not be empty".to_string())
    }
}

impl From<EntryIdentity> for String {
    fn from(value: EntryIdentity) -> Self {
        value.0
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The set of entries seen during one monitoring cycle.
///
/// Duplicates collapse; iteration is in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeSet<EntryIdentity>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: EntryIdentity) -> bool {
        self.0.insert(entry)
    }

    pub fn contains(&self, entry: &EntryIdentity) -> bool {
        self.0.contains(entry)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntryIdentity> {
        self.0.iter()
    }

    pub fn as_set(&self) -> &BTreeSet<EntryIdentity> {
        &self.0
    }

    /// SHA-256 over the sorted identities, as 64-char hex.
    ///
    /// Equal snapshots always produce equal fingerprints.
    pub fn fingerprint(&self) -> String {
        let joined = self
            .0
            .iter()
            .map(EntryIdentity::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        compute_hash(&joined)
    }
}

impl FromIterator<EntryIdentity> for Snapshot {
    fn from_iter<I: IntoIterator<Item = EntryIdentity>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<EntryIdentity> for Snapshot {
    fn extend<I: IntoIterator<Item = EntryIdentity>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Snapshot {
    type Item = EntryIdentity;
    type IntoIter = std::collections::btree_set::IntoIter<EntryIdentity>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a EntryIdentity;
    type IntoIter = std::collections::btree_set::Iter<'a, EntryIdentity>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Entries that appeared and disappeared between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Present now, absent before.
    pub added: BTreeSet<EntryIdentity>,
    /// Present before, absent now.
    pub removed: BTreeSet<EntryIdentity>,
}

impl DiffResult {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}

/// Everything reported about one completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// 1-based cycle counter, including aborted cycles.
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages_requested: usize,
    pub pages_failed: usize,
    pub entry_count: usize,
    /// Fingerprint of the snapshot this cycle retained.
    pub fingerprint: String,
    pub diff: DiffResult,
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntryIdentity {
        EntryIdentity::new(s).unwrap()
    }

    #[test]
    fn test_identity_collapses_whitespace() {
        assert_eq!(id("  A   -\tAddr 1 ").as_str(), "A - Addr 1");
    }

    #[test]
    fn test_identity_rejects_empty() {
        assert!(EntryIdentity::new("").is_none());
        assert!(EntryIdentity::new(" \n\t ").is_none());
    }

    #[test]
    fn test_identity_from_parts_joins_address_lines() {
        let entry = EntryIdentity::from_parts(
            " Cozy  flat ",
            "Hauptstr. 1\n  10115 Berlin \n",
        )
        .unwrap();
        assert_eq!(entry.as_str(), "Cozy flat - Hauptstr. 1, 10115 Berlin");
    }

    #[test]
    fn test_identity_from_parts_requires_both_components() {
        assert!(EntryIdentity::from_parts("", "Addr").is_none());
        assert!(EntryIdentity::from_parts("Name", "  \n ").is_none());
    }

    #[test]
    fn test_identity_deserialize_rejects_empty() {
        let ok: EntryIdentity = serde_json::from_str("\"X  - Y\"").unwrap();
        assert_eq!(ok.as_str(), "X - Y");
        assert!(serde_json::from_str::<EntryIdentity>("\"   \"").is_err());
    }

    #[test]
    fn test_snapshot_collapses_duplicates() {
        let snapshot: Snapshot = ["B - 2", "A - 1", "B - 2"].into_iter().map(id).collect();
        assert_eq!(snapshot.len(), 2);
        let order: Vec<_> = snapshot.iter().map(EntryIdentity::as_str).collect();
        assert_eq!(order, vec!["A - 1", "B - 2"]);
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let a: Snapshot = ["A - 1", "B - 2"].into_iter().map(id).collect();
        let b: Snapshot = ["B - 2", "A - 1"].into_iter().map(id).collect();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_ne!(a.fingerprint(), Snapshot::new().fingerprint());
    }

    #[test]
    fn test_compute_hash_consistency() {
        let h1 = compute_hash("hello world");
        let h2 = compute_hash("hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }
}
