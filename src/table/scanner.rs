use std::collections::VecDeque;
use std::sync::Arc;

use crate::request::ScanDescriptor;
use crate::store::{EntityId, RawRow, ScanCursor, StoreError};

use super::capsule::LayoutCapsule;
use super::handle::TableHandle;
use super::row::RowData;
use super::TableError;

/// Ordered pull-based iterator over the rows of a scan range.
///
/// Rows come back in ascending row-key order, each bound to the capsule
/// captured when the scanner was opened. Batches are fetched lazily: the
/// next physical round trip happens only when the buffer runs dry.
///
/// With reopen-on-timeout enabled, one store timeout is absorbed by
/// reopening the physical scan just past the last delivered row, so the
/// caller sees neither a duplicate nor a gap. A second timeout with no
/// delivered row in between is fatal.
pub struct RowScanner {
    /// `Some` while open. `close()` takes it, releasing the table.
    table: Option<TableHandle>,
    capsule: Arc<LayoutCapsule>,
    scan: ScanDescriptor,
    /// `Some` while open; dropped eagerly on close so the physical scan is
    /// released without waiting for the scanner value to die.
    cursor: Option<Box<dyn ScanCursor>>,
    buffer: VecDeque<RawRow>,
    /// Key of the last row handed to the caller; the resume point after a
    /// timeout.
    last_key: Option<Vec<u8>>,
    reopen_on_timeout: bool,
    /// Set while recovering from a timeout, cleared by the next delivered
    /// row.
    timed_out: bool,
    exhausted: bool,
}

impl RowScanner {
    pub(crate) fn open(
        table: TableHandle,
        capsule: Arc<LayoutCapsule>,
        scan: ScanDescriptor,
        reopen_on_timeout: bool,
    ) -> Result<Self, TableError> {
        let cursor = table.store().open_scan(&scan)?;
        Ok(Self {
            table: Some(table),
            capsule,
            scan,
            cursor: Some(cursor),
            buffer: VecDeque::new(),
            last_key: None,
            reopen_on_timeout,
            timed_out: false,
            exhausted: false,
        })
    }

    /// The layout version every row of this scan is decoded against.
    pub fn layout_version(&self) -> u64 {
        self.capsule.layout().version()
    }

    /// Returns the next row, or `None` when the range is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Closed`] after `close()`, and
    /// [`TableError::Store`] for store failures, including a timeout that
    /// reopen-on-timeout is disabled for or that follows another timeout
    /// with no progress in between.
    pub fn next_row(&mut self) -> Result<Option<RowData>, TableError> {
        if self.table.is_none() {
            return Err(TableError::Closed);
        }

        loop {
            if let Some(raw) = self.buffer.pop_front() {
                self.timed_out = false;
                self.last_key = Some(raw.key.clone());
                let entity_id = EntityId::from_bytes(raw.key.clone());
                return Ok(Some(RowData::from_raw(
                    entity_id,
                    raw,
                    self.capsule.clone(),
                )));
            }
            if self.exhausted {
                return Ok(None);
            }

            let cursor = self.cursor.as_mut().ok_or(TableError::Closed)?;
            match cursor.next_batch(self.scan.batch_size) {
                Ok(batch) if batch.is_empty() => {
                    self.exhausted = true;
                    return Ok(None);
                }
                Ok(batch) => self.buffer.extend(batch),
                Err(StoreError::Timeout) if self.reopen_on_timeout && !self.timed_out => {
                    self.timed_out = true;
                    self.reopen()?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Reopens the physical scan starting strictly after the last delivered
    /// row. With no row delivered yet, the original start bound is reused.
    fn reopen(&mut self) -> Result<(), TableError> {
        let table = self.table.as_ref().ok_or(TableError::Closed)?;

        let mut resume = self.scan.clone();
        if let Some(last) = &self.last_key {
            resume.start_row = Some(successor_key(last));
        }

        #[cfg(feature = "logging")]
        log::warn!(
            "scan on table '{}' timed out, reopening past the last delivered row",
            table.name()
        );

        self.cursor = Some(table.store().open_scan(&resume)?);
        Ok(())
    }

    /// Releases the physical cursor and the table handle. A second close
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Closed`] if already closed.
    pub fn close(&mut self) -> Result<(), TableError> {
        match self.table.take() {
            Some(table) => {
                self.cursor = None;
                self.buffer.clear();
                drop(table);
                Ok(())
            }
            None => Err(TableError::Closed),
        }
    }
}

impl Iterator for RowScanner {
    type Item = Result<RowData, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

impl Drop for RowScanner {
    fn drop(&mut self) {
        self.cursor = None;
        self.buffer.clear();
        if self.table.take().is_some() {
            #[cfg(feature = "logging")]
            log::warn!("row scanner dropped without close()");
        }
    }
}

/// Smallest key strictly greater than `key` in lexicographic byte order.
fn successor_key(key: &[u8]) -> Vec<u8> {
    let mut successor = Vec::with_capacity(key.len() + 1);
    successor.extend_from_slice(key);
    successor.push(0);
    successor
}
