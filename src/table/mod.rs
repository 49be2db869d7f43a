//! Open-table handles and the read path.
//!
//! A [`TableHandle`] is the reference-counted anchor for one open table. It
//! owns the current [`LayoutCapsule`] (the bundle of layout, column name
//! translator, and cell decoder provider derived from one layout version)
//! behind an atomically swappable pointer. Readers and scanners capture the
//! capsule once per operation, so an operation in flight never observes a
//! layout change, and no lock is held across store I/O.
//!
//! # Concurrency model
//!
//! Many readers and one layout update may share a handle concurrently:
//! - the reference count is an atomic counter, retained by every dependent,
//! - the capsule pointer swaps as a unit when a layout commit succeeds,
//! - `RowData`, requests, and scanners are exclusively owned by their
//!   creator and never mutated concurrently.

pub(crate) mod capsule;
pub(crate) mod handle;
pub(crate) mod reader;
pub(crate) mod row;
pub(crate) mod scanner;

use std::fmt;

use crate::layout::LayoutError;
use crate::request::RequestError;
use crate::store::StoreError;

pub use capsule::LayoutCapsule;
pub use handle::TableHandle;
pub use reader::TableReader;
pub use row::RowData;
pub use scanner::RowScanner;

/// Errors raised by read-path operations on an open table.
#[derive(Debug)]
pub enum TableError {
    /// The reader or scanner was used after `close()`.
    Closed,
    /// A layout operation failed; the current layout is unchanged.
    Layout(LayoutError),
    /// The request failed validation or translation; no physical call was
    /// made.
    Request(RequestError),
    /// The physical store reported an error.
    Store(StoreError),
    /// A broken internal invariant, such as a batch result count mismatch.
    /// Never silently swallowed.
    Internal(String),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::Closed => write!(f, "table reader or scanner used after close"),
            TableError::Layout(e) => write!(f, "layout error: {e}"),
            TableError::Request(e) => write!(f, "request error: {e}"),
            TableError::Store(e) => write!(f, "store error: {e}"),
            TableError::Internal(reason) => write!(f, "internal invariant violated: {reason}"),
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableError::Layout(e) => Some(e),
            TableError::Request(e) => Some(e),
            TableError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LayoutError> for TableError {
    fn from(err: LayoutError) -> Self {
        TableError::Layout(err)
    }
}

impl From<RequestError> for TableError {
    fn from(err: RequestError) -> Self {
        TableError::Request(err)
    }
}

impl From<StoreError> for TableError {
    fn from(err: StoreError) -> Self {
        TableError::Store(err)
    }
}
