//! Set difference between two cycle snapshots.

use crate::models::{DiffResult, Snapshot};

/// Compute which entries appeared and disappeared between `previous` and `current`.
///
/// `added = current \ previous`, `removed = previous \ current`. Pure and
/// deterministic; two empty snapshots give an empty result.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> DiffResult {
    let previous = previous.as_set();
    let current = current.as_set();

    DiffResult {
        added: current.difference(previous).cloned().collect(),
        removed: previous.difference(current).cloned().collect(),
    }
}
