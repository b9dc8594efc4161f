//! Ordered, string-keyed collection of snapshots

use crate::error::{PipediffError, Result};
use crate::snapshot::Snapshot;
use indexmap::IndexMap;
use std::ops::{Bound, Index, RangeBounds};
use std::sync::Arc;

/// Prefix of keys generated for snapshots appended without a key
pub const AUTO_KEY_PREFIX: &str = "entry_";

/// Address of an entry: its key or its position in insertion order.
/// Negative positions count from the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryRef {
    Key(String),
    Position(isize),
}

impl From<&str> for EntryRef {
    fn from(key: &str) -> Self {
        EntryRef::Key(key.to_string())
    }
}

impl From<String> for EntryRef {
    fn from(key: String) -> Self {
        EntryRef::Key(key)
    }
}

impl From<isize> for EntryRef {
    fn from(position: isize) -> Self {
        EntryRef::Position(position)
    }
}

impl From<i32> for EntryRef {
    fn from(position: i32) -> Self {
        EntryRef::Position(position as isize)
    }
}

/// Snapshots in insertion order, each under a unique non-empty key.
///
/// Entries are shared as `Arc<Snapshot>` so slices and lookups hand out the
/// same records. There is no removal; [`SnapshotLog::reset`] clears
/// everything at once.
#[derive(Debug, Clone, Default)]
pub struct SnapshotLog {
    entries: IndexMap<String, Arc<Snapshot>>,
    assignments: usize,
}

impl SnapshotLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot and return the key it was stored under.
    ///
    /// Without a key, one is generated from an assignment counter that never
    /// reuses a taken key. An explicit key that already exists is rejected
    /// and the collection is left untouched.
    pub fn append(&mut self, snapshot: Snapshot, key: Option<&str>) -> Result<String> {
        self.append_shared(Arc::new(snapshot), key)
    }

    pub fn append_shared(&mut self, snapshot: Arc<Snapshot>, key: Option<&str>) -> Result<String> {
        let key = match key {
            Some("") => return Err(PipediffError::InvalidKey),
            Some(k) if self.entries.contains_key(k) => {
                return Err(PipediffError::duplicate_key(k));
            }
            Some(k) => k.to_string(),
            None => self.next_auto_key(),
        };

        self.entries.insert(key.clone(), snapshot);
        self.assignments += 1;
        Ok(key)
    }

    fn next_auto_key(&self) -> String {
        let mut n = self.assignments;
        loop {
            let candidate = format!("{}{}", AUTO_KEY_PREFIX, n);
            if !self.entries.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Snapshot>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&Arc<Snapshot>> {
        self.entries.get(key)
    }

    pub fn get_by_key(&self, key: &str) -> Result<&Arc<Snapshot>> {
        self.entries
            .get(key)
            .ok_or_else(|| PipediffError::key_not_found(key))
    }

    pub fn get_by_position(&self, position: isize) -> Result<&Arc<Snapshot>> {
        let index = self.absolute(position)?;
        self.entries
            .get_index(index)
            .map(|(_, snapshot)| snapshot)
            .ok_or(PipediffError::PositionOutOfRange {
                position,
                len: self.len(),
            })
    }

    /// Key and snapshot for either kind of address
    pub fn resolve(&self, entry: &EntryRef) -> Result<(&str, &Arc<Snapshot>)> {
        match entry {
            EntryRef::Key(key) => self
                .entries
                .get_key_value(key.as_str())
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| PipediffError::key_not_found(key.as_str())),
            EntryRef::Position(position) => {
                let index = self.absolute(*position)?;
                self.entries
                    .get_index(index)
                    .map(|(k, v)| (k.as_str(), v))
                    .ok_or(PipediffError::PositionOutOfRange {
                        position: *position,
                        len: self.len(),
                    })
            }
        }
    }

    fn absolute(&self, position: isize) -> Result<usize> {
        let len = self.len() as isize;
        let index = if position < 0 { position + len } else { position };
        if index < 0 || index >= len {
            return Err(PipediffError::PositionOutOfRange {
                position,
                len: self.len(),
            });
        }
        Ok(index as usize)
    }

    /// Positional slice into a new collection with the same keys and order.
    /// Negative bounds count from the end and out-of-range bounds are clamped.
    pub fn slice<R: RangeBounds<isize>>(&self, range: R) -> SnapshotLog {
        let len = self.len() as isize;
        let clamp = |i: isize| if i < 0 { (i + len).max(0) } else { i.min(len) };

        let start = match range.start_bound() {
            Bound::Included(&s) => clamp(s),
            Bound::Excluded(&s) => clamp(s).saturating_add(1).min(len),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => clamp(e).saturating_add(1).min(len),
            Bound::Excluded(&e) => clamp(e),
            Bound::Unbounded => len,
        };

        let mut sliced = SnapshotLog::new();
        if start < end {
            let (start, end) = (start as usize, end as usize);
            for (key, snapshot) in self.entries.iter().skip(start).take(end - start) {
                sliced.entries.insert(key.clone(), Arc::clone(snapshot));
            }
        }
        sliced.assignments = sliced.entries.len();
        sliced
    }

    /// Drop every entry and start over with a fresh collection
    pub fn reset(&mut self) {
        *self = SnapshotLog::new();
    }
}

impl Index<&str> for SnapshotLog {
    type Output = Snapshot;

    fn index(&self, key: &str) -> &Snapshot {
        match self.entries.get(key) {
            Some(snapshot) => snapshot.as_ref(),
            None => panic!("No snapshot under key '{}'", key),
        }
    }
}

impl Index<usize> for SnapshotLog {
    type Output = Snapshot;

    fn index(&self, position: usize) -> &Snapshot {
        match self.entries.get_index(position) {
            Some((_, snapshot)) => snapshot.as_ref(),
            None => panic!("No snapshot at position {}", position),
        }
    }
}
