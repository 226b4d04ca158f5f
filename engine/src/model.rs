//! Core data model for fit decisions.
//!
//! This module defines the structures shared by every fit strategy:
//! - ItemTable: the item universe (identifier -> size), in insertion order
//! - FitResult: the chosen subset and the capacity it consumes
//! - SpanJob: a planned fit or span over a directory tree
//! - JobMode, JobState: enums controlling job behavior

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::EngineError;
use crate::fit::FitAlgorithm;
use crate::span::SpanItem;

/// Bound satisfied by anything usable as an item identifier.
pub trait ItemKey: Clone + Eq + Hash + fmt::Debug {}

impl<T: Clone + Eq + Hash + fmt::Debug> ItemKey for T {}

/// A single candidate item: an identifier and its size in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item<K> {
    pub id: K,
    pub size: u64,
}

/// The item universe for one fit decision.
///
/// Behaves like a map keyed on item identifier. Inserting an identifier that
/// is already present overwrites its size but keeps its original position,
/// so iteration order is the order in which identifiers were first seen.
/// First-fit walks the table in exactly this order.
#[derive(Debug, Clone)]
pub struct ItemTable<K> {
    entries: Vec<Item<K>>,
    index: HashMap<K, usize>,
}

impl<K: ItemKey> ItemTable<K> {
    pub fn new() -> Self {
        ItemTable {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_capacity(n: usize) -> Self {
        ItemTable {
            entries: Vec::with_capacity(n),
            index: HashMap::with_capacity(n),
        }
    }

    /// Build a table from signed sizes, rejecting negative values.
    ///
    /// This is the validation boundary for callers whose sizes come from an
    /// untyped source (configuration, user input).
    pub fn try_from_signed<I>(items: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = (K, i64)>,
    {
        let mut table = ItemTable::new();
        for (id, size) in items {
            let size = u64::try_from(size).map_err(|_| EngineError::NegativeSize {
                item: format!("{:?}", id),
                size,
            })?;
            table.insert(id, size);
        }
        Ok(table)
    }

    /// Insert or overwrite an item. Returns the previous size, if any.
    pub fn insert(&mut self, id: K, size: u64) -> Option<u64> {
        match self.index.get(&id) {
            Some(&pos) => {
                let previous = self.entries[pos].size;
                self.entries[pos].size = size;
                Some(previous)
            }
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push(Item { id, size });
                None
            }
        }
    }

    pub fn get(&self, id: &K) -> Option<u64> {
        self.index.get(id).map(|&pos| self.entries[pos].size)
    }

    pub fn contains(&self, id: &K) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate items in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Item<K>> {
        self.entries.iter()
    }

    /// Sum of all item sizes.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|item| item.size).sum()
    }

    /// Remove every listed identifier. Unknown identifiers are ignored.
    ///
    /// Used to compute the remainder after one volume has been filled.
    pub fn remove_all(&mut self, ids: &[K]) {
        if ids.is_empty() {
            return;
        }
        let before = self.entries.len();
        for id in ids {
            self.index.remove(id);
        }
        if self.index.len() == before {
            return;
        }
        let index = &self.index;
        self.entries.retain(|item| index.contains_key(&item.id));
        for (pos, item) in self.entries.iter().enumerate() {
            self.index.insert(item.id.clone(), pos);
        }
    }

    /// A copy of this table without the listed identifiers.
    pub fn without(&self, ids: &[K]) -> Self {
        let mut remainder = self.clone();
        remainder.remove_all(ids);
        remainder
    }
}

impl<K: ItemKey> Default for ItemTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ItemKey> FromIterator<(K, u64)> for ItemTable<K> {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut table = ItemTable::new();
        table.extend(iter);
        table
    }
}

impl<K: ItemKey> Extend<(K, u64)> for ItemTable<K> {
    fn extend<I: IntoIterator<Item = (K, u64)>>(&mut self, iter: I) {
        for (id, size) in iter {
            self.insert(id, size);
        }
    }
}

impl<'a, K> IntoIterator for &'a ItemTable<K> {
    type Item = &'a Item<K>;
    type IntoIter = std::slice::Iter<'a, Item<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Validate a signed capacity at the boundary.
pub fn capacity_from_signed(capacity: i64) -> Result<u64, EngineError> {
    u64::try_from(capacity).map_err(|_| EngineError::InvalidCapacity {
        reason: format!("capacity {} is negative", capacity),
    })
}

/// Outcome of one fit decision.
///
/// `items` lists the chosen identifiers in the order the strategy accepted
/// them; `used` is the sum of their sizes and never exceeds the capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FitResult<K> {
    pub items: Vec<K>,
    pub used: u64,
}

impl<K: PartialEq> FitResult<K> {
    pub fn empty() -> Self {
        FitResult {
            items: Vec::new(),
            used: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &K) -> bool {
        self.items.contains(id)
    }

    /// Capacity utilization as a percentage (0-100). Zero capacity yields 0.
    pub fn utilization(&self, capacity: u64) -> f64 {
        if capacity == 0 {
            0.0
        } else {
            self.used as f64 / capacity as f64 * 100.0
        }
    }
}

/// Represents a single fit or span job over a directory tree.
#[derive(Debug, Serialize)]
pub struct SpanJob {
    /// Unique identifier for this job
    pub id: Uuid,

    /// Fit a single volume or span all volumes
    pub mode: JobMode,

    /// Root directory whose files are the candidate items
    pub source_path: PathBuf,

    /// Usable capacity of one volume, in bytes
    pub capacity: u64,

    /// Strategy used for every volume
    pub algorithm: FitAlgorithm,

    /// Candidate items, populated by planning
    #[serde(skip)]
    pub items: ItemTable<PathBuf>,

    /// Volumes produced by running the job
    pub volumes: Vec<SpanItem<PathBuf>>,

    /// Items left over in Fit mode (they go on a later volume or are reported)
    pub deferred: Vec<PathBuf>,

    pub state: JobState,

    pub created_at: DateTime<Utc>,

    pub started_at: Option<DateTime<Utc>>,

    pub finished_at: Option<DateTime<Utc>>,
}

impl SpanJob {
    /// Total size of all candidate items.
    pub fn total_bytes(&self) -> u64 {
        self.items.total_size()
    }
}

/// What a job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// Choose what fits on one volume; the rest is deferred
    Fit,
    /// Spread every item across as many volumes as needed
    Span,
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobMode::Fit => write!(f, "Fit"),
            JobMode::Span => write!(f, "Span"),
        }
    }
}

/// The state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created or planned, not yet run
    Pending,
    /// Currently fitting
    Running,
    /// All volumes decided
    Completed,
}
