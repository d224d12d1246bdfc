//! Append-only storage for the entries of a history walk
//!
//! A walk appends entries one at a time and hands out a [`LogSnapshot`]
//! after each append. Snapshots share the storage: taking one costs a
//! reference count bump, never a copy of the entries. Entries below a
//! snapshot's length are never touched again, so a snapshot stays valid
//! while the walk keeps growing the log.
//!
//! Storage is split into segments of doubling size, so appending never
//! moves an entry that a snapshot may be reading.

use std::fmt;
use std::ops::Index;
use std::sync::{Arc, OnceLock};

use super::LogEntry;

/// Slots in the first segment; segment `k` holds `FIRST_SEGMENT << k`
const FIRST_SEGMENT: usize = 32;
const FIRST_SEGMENT_BITS: u32 = FIRST_SEGMENT.trailing_zeros();
const SEGMENTS: usize = 32;

type Segment = Box<[OnceLock<LogEntry>]>;

struct Segments {
    segments: [OnceLock<Segment>; SEGMENTS],
}

impl Segments {
    fn new() -> Self {
        Self {
            segments: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    fn slot(&self, index: usize) -> Option<&OnceLock<LogEntry>> {
        let (segment, offset) = locate(index)?;
        self.segments[segment].get()?.get(offset)
    }

    fn slot_or_alloc(&self, index: usize) -> Option<&OnceLock<LogEntry>> {
        let (segment, offset) = locate(index)?;
        self.segments[segment]
            .get_or_init(|| (0..FIRST_SEGMENT << segment).map(|_| OnceLock::new()).collect())
            .get(offset)
    }
}

/// Segment and offset of an entry index
fn locate(index: usize) -> Option<(usize, usize)> {
    let shifted = index.checked_add(FIRST_SEGMENT)?;
    let top_bit = usize::BITS - 1 - shifted.leading_zeros();
    let segment = (top_bit - FIRST_SEGMENT_BITS) as usize;
    if segment >= SEGMENTS {
        return None;
    }
    Some((segment, shifted - (FIRST_SEGMENT << segment)))
}

/// Writer side: owned by the walk that produces the entries
pub(crate) struct EntryLog {
    storage: Arc<Segments>,
    len: usize,
}

impl EntryLog {
    pub(crate) fn new() -> Self {
        Self {
            storage: Arc::new(Segments::new()),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Append an entry; false once the log is full
    pub(crate) fn push(&mut self, entry: LogEntry) -> bool {
        let Some(slot) = self.storage.slot_or_alloc(self.len) else {
            return false;
        };
        // Only this writer fills slots, always at `len`
        if slot.set(entry).is_err() {
            return false;
        }
        self.len += 1;
        true
    }

    /// Every entry appended so far
    pub(crate) fn snapshot(&self) -> LogSnapshot {
        LogSnapshot {
            storage: Some(Arc::clone(&self.storage)),
            len: self.len,
        }
    }
}

/// Read-only view of the first `len` entries of a walk
#[derive(Clone, Default)]
pub struct LogSnapshot {
    storage: Option<Arc<Segments>>,
    len: usize,
}

impl LogSnapshot {
    /// A snapshot with no entries
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        if index >= self.len {
            return None;
        }
        self.storage.as_ref()?.slot(index)?.get()
    }

    pub fn first(&self) -> Option<&LogEntry> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Entries in walk order
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Do two snapshots read the same walk's storage?
    pub fn shares_storage_with(&self, other: &LogSnapshot) -> bool {
        match (&self.storage, &other.storage) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.iter().cloned().collect()
    }
}

impl Index<usize> for LogSnapshot {
    type Output = LogEntry;

    fn index(&self, index: usize) -> &LogEntry {
        match self.get(index) {
            Some(entry) => entry,
            None => panic!("entry index {index} out of range for {} entries", self.len),
        }
    }
}

impl<'a> IntoIterator for &'a LogSnapshot {
    type Item = &'a LogEntry;
    type IntoIter = Box<dyn Iterator<Item = &'a LogEntry> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl fmt::Debug for LogSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
