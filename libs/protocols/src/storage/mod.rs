//! Per-node share storage with scoped lifetimes.

use crate::message::SecretId;
use rustc_hash::FxHashMap;
use shamir_sharing::Share;

/// How long a stored share survives bulk cleanup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lifetime {
    /// Retained across bulk cleanups; used for long-lived setup material such as the
    /// multiplication mask and the comparison bit shares.
    Sticky,

    /// Associated with a caller-chosen tag so a whole working set can be purged at once.
    Tagged(String),
}

impl Lifetime {
    /// Map the wire-level tag convention onto a lifetime: `None` stores sticky, a string stores
    /// tagged.
    pub fn from_tag(tag: Option<String>) -> Self {
        match tag {
            Some(tag) => Self::Tagged(tag),
            None => Self::Sticky,
        }
    }
}

/// A stored share together with its lifetime.
#[derive(Clone, Debug)]
pub struct ShareRecord {
    /// The share itself.
    pub share: Share,

    /// How long it survives cleanup.
    pub lifetime: Lifetime,
}

/// A node's secret-id-indexed share container.
///
/// Accessed only from the runtime's execution stream, so no interior locking. Callers must copy
/// shares they want to outlive a `remove` or `clear_all`.
#[derive(Default, Debug)]
pub struct ShareStorage {
    records: FxHashMap<SecretId, ShareRecord>,
}

impl ShareStorage {
    /// Construct an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the share stored under an id.
    ///
    /// Passing `None` as the lifetime preserves the attribute of the record being overwritten;
    /// brand-new records default to sticky.
    pub fn put(&mut self, id: impl Into<SecretId>, share: Share, lifetime: Option<Lifetime>) {
        let id = id.into();
        match (self.records.get_mut(&id), lifetime) {
            (Some(record), Some(lifetime)) => *record = ShareRecord { share, lifetime },
            (Some(record), None) => record.share = share,
            (None, lifetime) => {
                let lifetime = lifetime.unwrap_or(Lifetime::Sticky);
                self.records.insert(id, ShareRecord { share, lifetime });
            }
        }
    }

    /// The share stored under an id, if any.
    pub fn get(&self, id: &str) -> Option<&Share> {
        self.records.get(id).map(|record| &record.share)
    }

    /// The full record stored under an id, if any.
    pub fn get_info(&self, id: &str) -> Option<&ShareRecord> {
        self.records.get(id)
    }

    /// Remove and return the share stored under an id.
    pub fn remove(&mut self, id: &str) -> Option<Share> {
        self.records.remove(id).map(|record| record.share)
    }

    /// Remove every tagged record, keeping the sticky ones.
    pub fn clear_non_sticky(&mut self) {
        self.records.retain(|_, record| record.lifetime == Lifetime::Sticky);
    }

    /// Remove every record carrying the given tag.
    pub fn clear_by_tag(&mut self, tag: &str) {
        self.records
            .retain(|_, record| !matches!(&record.lifetime, Lifetime::Tagged(t) if t == tag));
    }

    /// Remove everything, sticky records included.
    pub fn clear_all(&mut self) {
        self.records.clear();
    }

    /// The total number of stored records.
    pub fn count(&self) -> usize {
        self.records.len()
    }
}

/// The conventional id of the `index`-th component of a vector secret.
pub fn component_id(base: &str, index: usize) -> SecretId {
    format!("{base}[{index}]")
}
