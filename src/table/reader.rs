use std::sync::Mutex;

use crate::request::{DataRequest, DataRequestValidator, RequestTranslator, ScanOptions};
use crate::store::EntityId;

use super::handle::TableHandle;
use super::row::RowData;
use super::scanner::RowScanner;
use super::TableError;

/// Executes get, bulk-get, and scan requests against an open table.
///
/// Each operation captures the handle's current capsule once: the request is
/// validated against that snapshot's layout, translated through its name
/// translator, and the result is bound to the same snapshot for lazy
/// decoding. A layout advancing mid-operation never changes the operation's
/// behavior.
///
/// A reader moves through `Open → (reads)* → Closed`. Reads after `close()`
/// fail with [`TableError::Closed`], as does a second `close()`.
pub struct TableReader {
    table: Mutex<Option<TableHandle>>,
}

impl TableReader {
    pub(crate) fn new(table: TableHandle) -> Self {
        Self {
            table: Mutex::new(Some(table)),
        }
    }

    /// Clones the retained handle out of the slot, failing once closed. The
    /// clone keeps the table alive for the duration of the operation without
    /// holding the slot lock across store I/O.
    fn table(&self) -> Result<TableHandle, TableError> {
        self.table
            .lock()
            .unwrap()
            .as_ref()
            .cloned()
            .ok_or(TableError::Closed)
    }

    /// Reads one row.
    ///
    /// A request whose translated column set is empty short-circuits to an
    /// empty [`RowData`] without a physical call. A row with no data also
    /// yields an empty [`RowData`], not an error.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Closed`], [`TableError::Request`] before any
    /// physical call, or [`TableError::Store`].
    pub fn get(&self, entity_id: &EntityId, request: &DataRequest) -> Result<RowData, TableError> {
        let table = self.table()?;
        let capsule = table.capsule();

        DataRequestValidator::for_layout(capsule.layout()).validate(request)?;
        let lookup = RequestTranslator::new(capsule.translator()).to_point_lookup(request)?;
        if lookup.is_empty() {
            return Ok(RowData::empty(entity_id.clone(), capsule));
        }

        let raw = table.store().get(entity_id, &lookup)?;
        Ok(RowData::from_raw(entity_id.clone(), raw, capsule))
    }

    /// Reads many rows in one physical batch.
    ///
    /// The result always has exactly one entry per requested id, in input
    /// order. `None` marks a row the store failed to retrieve; an empty
    /// [`RowData`] marks a row with no data. A single id delegates to
    /// [`TableReader::get`], skipping the batching overhead.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Internal`] if the store breaks the alignment
    /// contract, plus everything [`TableReader::get`] returns.
    pub fn bulk_get(
        &self,
        entity_ids: &[EntityId],
        request: &DataRequest,
    ) -> Result<Vec<Option<RowData>>, TableError> {
        let table = self.table()?;
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }
        if entity_ids.len() == 1 {
            return Ok(vec![Some(self.get(&entity_ids[0], request)?)]);
        }

        let capsule = table.capsule();
        DataRequestValidator::for_layout(capsule.layout()).validate(request)?;
        let lookup = RequestTranslator::new(capsule.translator()).to_point_lookup(request)?;
        if lookup.is_empty() {
            return Ok(entity_ids
                .iter()
                .map(|id| Some(RowData::empty(id.clone(), capsule.clone())))
                .collect());
        }

        let results = table.store().batch_get(entity_ids, &lookup)?;
        if results.len() != entity_ids.len() {
            return Err(TableError::Internal(format!(
                "store returned {} results for a batch of {} rows",
                results.len(),
                entity_ids.len()
            )));
        }

        Ok(entity_ids
            .iter()
            .zip(results)
            .map(|(id, raw)| raw.map(|raw| RowData::from_raw(id.clone(), raw, capsule.clone())))
            .collect())
    }

    /// Opens a scanner over a row-key range.
    ///
    /// The scanner is bound to the capsule snapshot taken here and never
    /// observes a later layout change.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Closed`], [`TableError::Request`], or
    /// [`TableError::Store`] if the physical scan cannot be opened.
    pub fn get_scanner(
        &self,
        request: &DataRequest,
        options: ScanOptions,
    ) -> Result<RowScanner, TableError> {
        let table = self.table()?;
        let capsule = table.capsule();

        DataRequestValidator::for_layout(capsule.layout()).validate(request)?;
        let scan = RequestTranslator::new(capsule.translator()).to_scan(request, &options)?;

        RowScanner::open(table, capsule, scan, options.reopen_on_timeout)
    }

    /// Releases the table handle. Safe to call on a reader that never
    /// served a read; a second close fails.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Closed`] if already closed.
    pub fn close(&self) -> Result<(), TableError> {
        match self.table.lock().unwrap().take() {
            Some(table) => {
                drop(table);
                Ok(())
            }
            None => Err(TableError::Closed),
        }
    }
}

impl Drop for TableReader {
    fn drop(&mut self) {
        if self.table.lock().unwrap().take().is_some() {
            #[cfg(feature = "logging")]
            log::warn!("table reader dropped without close()");
        }
    }
}
