//! Narrow contract to the physical column-family store.
//!
//! The read path depends only on this interface: point lookups and range
//! scans keyed by row key and physical column identifiers with version and
//! time bounds, returning raw schema-tagged cell bytes. The store's wire
//! protocol is out of scope.
//!
//! [`MemoryStore`] is the in-crate implementation. It doubles as the test
//! fixture and supports fault injection (per-row retrieval failures, scan
//! timeouts) to exercise the partial-failure contracts.

pub(crate) mod memory;

use std::fmt;
use std::io;

use crate::layout::PhysicalColumn;
use crate::request::{PointLookup, ScanDescriptor};

pub use memory::MemoryStore;

/// Opaque, immutable row-key representation. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(Vec<u8>);

impl EntityId {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for EntityId {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for EntityId {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

/// Errors surfaced by the physical store.
#[derive(Debug)]
pub enum StoreError {
    /// An I/O error occurred.
    Io(io::Error),
    /// The physical call exceeded the store's deadline.
    Timeout,
    /// The store rejected or could not serve the call.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "store I/O error: {e}"),
            StoreError::Timeout => write!(f, "store call timed out"),
            StoreError::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// One raw stored cell: physical column, version timestamp, schema-tagged
/// payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCell {
    pub column: PhysicalColumn,
    pub timestamp: u64,
    pub payload: Vec<u8>,
}

/// The raw cells fetched for one row. May be empty: an empty row is "no
/// data", which is distinct from a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub key: Vec<u8>,
    pub cells: Vec<RawCell>,
}

impl RawRow {
    pub fn empty(key: Vec<u8>) -> Self {
        Self {
            key,
            cells: Vec::new(),
        }
    }
}

/// Client for the physical column-family store.
///
/// Implementations must be safe to share across threads; the read path calls
/// them concurrently without additional locking.
pub trait StoreClient: Send + Sync {
    /// Fetches one row. A row with no matching cells comes back empty, not
    /// as an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the row could not be fetched.
    fn get(&self, row: &EntityId, lookup: &PointLookup) -> Result<RawRow, StoreError>;

    /// Fetches many rows in one physical call.
    ///
    /// The result has exactly one entry per requested row, in the same
    /// order. A `None` entry marks a row the store failed to retrieve for
    /// internal reasons; sibling rows are unaffected.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] only for whole-batch failures.
    fn batch_get(
        &self,
        rows: &[EntityId],
        lookup: &PointLookup,
    ) -> Result<Vec<Option<RawRow>>, StoreError>;

    /// Opens a range scan.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the scan could not be opened.
    fn open_scan(&self, scan: &ScanDescriptor) -> Result<Box<dyn ScanCursor>, StoreError>;
}

/// Server-side cursor over a range scan.
pub trait ScanCursor: Send {
    /// Returns up to `max_rows` further rows in key order. An empty batch
    /// means the scan is exhausted.
    ///
    /// # Errors
    ///
    /// May return [`StoreError::Timeout`] if the physical connection idled
    /// out; the scanner decides whether to reopen.
    fn next_batch(&mut self, max_rows: usize) -> Result<Vec<RawRow>, StoreError>;
}
