use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::layout::PhysicalColumn;
use crate::request::{ColumnSelector, PointLookup, ScanDescriptor};

use super::{EntityId, RawCell, RawRow, ScanCursor, StoreClient, StoreError};

/// Versions of one physical column, keyed by timestamp.
type VersionMap = BTreeMap<u64, Vec<u8>>;
/// All cells of one row, keyed by (physical family, physical qualifier).
type RowMap = BTreeMap<(String, String), VersionMap>;

/// Shared scan fault-injection state.
///
/// `delivered` counts rows handed out by every cursor of the store. A
/// timeout mark fires (and is consumed) when a cursor asks for more rows
/// after at least `mark` rows have been delivered store-wide, which lets
/// tests place a timeout precisely between two rows of a scan.
#[derive(Default)]
struct ScanFaults {
    delivered: AtomicU64,
    timeout_marks: Mutex<Vec<u64>>,
}

/// In-memory [`StoreClient`].
///
/// Serves as the reference store implementation and the test fixture for the
/// read path. Rows can be marked as failing retrieval and scans can be made
/// to time out at chosen points.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<Vec<u8>, RowMap>>,
    failed_rows: RwLock<HashSet<Vec<u8>>>,
    faults: Arc<ScanFaults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one cell. Physical identifiers, as produced by the column name
    /// translator.
    pub fn put(
        &self,
        row: &EntityId,
        column: &PhysicalColumn,
        timestamp: u64,
        payload: Vec<u8>,
    ) {
        let mut rows = self.rows.write().unwrap();
        rows.entry(row.as_bytes().to_vec())
            .or_default()
            .entry((column.family.clone(), column.qualifier.clone()))
            .or_default()
            .insert(timestamp, payload);
    }

    /// Marks a row as failing retrieval: batch gets return `None` at its
    /// index, single gets fail with [`StoreError::Unavailable`].
    pub fn fail_row(&self, row: &EntityId) {
        self.failed_rows
            .write()
            .unwrap()
            .insert(row.as_bytes().to_vec());
    }

    /// Schedules one scan timeout, fired by the first `next_batch` call made
    /// after `delivered_rows` rows have been handed out store-wide.
    pub fn inject_scan_timeout_at(&self, delivered_rows: u64) {
        self.faults
            .timeout_marks
            .lock()
            .unwrap()
            .push(delivered_rows);
    }

    fn is_failed(&self, row: &EntityId) -> bool {
        self.failed_rows.read().unwrap().contains(row.as_bytes())
    }

    /// Applies the selectors to one stored row. Each stored column is
    /// matched by at most one selector (the first that accepts it).
    fn collect_cells(row: &RowMap, selectors: &[ColumnSelector]) -> Vec<RawCell> {
        let mut cells = Vec::new();
        for ((family, qualifier), versions) in row {
            let Some(selector) = selectors.iter().find(|s| s.matches(family, qualifier)) else {
                continue;
            };
            let mut taken = 0;
            for (&timestamp, payload) in versions.iter().rev() {
                if taken == selector.max_versions {
                    break;
                }
                if let Some(range) = &selector.time_range {
                    if !range.contains(timestamp) {
                        continue;
                    }
                }
                cells.push(RawCell {
                    column: PhysicalColumn::new(family.clone(), qualifier.clone()),
                    timestamp,
                    payload: payload.clone(),
                });
                taken += 1;
            }
        }
        cells
    }

    fn fetch_row(&self, row: &EntityId, lookup: &PointLookup) -> RawRow {
        let rows = self.rows.read().unwrap();
        let cells = rows
            .get(row.as_bytes())
            .map(|stored| Self::collect_cells(stored, &lookup.selectors))
            .unwrap_or_default();
        RawRow {
            key: row.as_bytes().to_vec(),
            cells,
        }
    }
}

impl StoreClient for MemoryStore {
    fn get(&self, row: &EntityId, lookup: &PointLookup) -> Result<RawRow, StoreError> {
        if self.is_failed(row) {
            return Err(StoreError::Unavailable(format!(
                "row {:?} failed retrieval",
                row.as_bytes()
            )));
        }
        Ok(self.fetch_row(row, lookup))
    }

    fn batch_get(
        &self,
        rows: &[EntityId],
        lookup: &PointLookup,
    ) -> Result<Vec<Option<RawRow>>, StoreError> {
        Ok(rows
            .iter()
            .map(|row| {
                if self.is_failed(row) {
                    None
                } else {
                    Some(self.fetch_row(row, lookup))
                }
            })
            .collect())
    }

    fn open_scan(&self, scan: &ScanDescriptor) -> Result<Box<dyn ScanCursor>, StoreError> {
        let rows = self.rows.read().unwrap();
        let start = scan
            .start_row
            .as_ref()
            .map(|k| Bound::Included(k.clone()))
            .unwrap_or(Bound::Unbounded);
        let stop = scan
            .stop_row
            .as_ref()
            .map(|k| Bound::Excluded(k.clone()))
            .unwrap_or(Bound::Unbounded);

        let mut matched = Vec::new();
        for (key, stored) in rows.range((start, stop)) {
            if let Some(filter) = &scan.filter {
                if !filter.accepts(key) {
                    continue;
                }
            }
            let cells = Self::collect_cells(stored, &scan.selectors);
            // Rows with no matching cells are skipped, not surfaced empty.
            if !cells.is_empty() {
                matched.push(RawRow {
                    key: key.clone(),
                    cells,
                });
            }
        }

        Ok(Box::new(MemoryScanCursor {
            rows: matched,
            pos: 0,
            faults: Arc::clone(&self.faults),
        }))
    }
}

struct MemoryScanCursor {
    rows: Vec<RawRow>,
    pos: usize,
    faults: Arc<ScanFaults>,
}

impl ScanCursor for MemoryScanCursor {
    fn next_batch(&mut self, max_rows: usize) -> Result<Vec<RawRow>, StoreError> {
        let delivered = self.faults.delivered.load(Ordering::SeqCst);
        {
            let mut marks = self.faults.timeout_marks.lock().unwrap();
            if let Some(idx) = marks.iter().position(|&mark| mark <= delivered) {
                marks.remove(idx);
                return Err(StoreError::Timeout);
            }
        }

        let end = usize::min(self.pos + max_rows, self.rows.len());
        let batch: Vec<RawRow> = self.rows[self.pos..end].to_vec();
        self.pos = end;
        self.faults
            .delivered
            .fetch_add(batch.len() as u64, Ordering::SeqCst);
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::TimeRange;

    fn selector(family: &str, qualifier: Option<&str>) -> ColumnSelector {
        ColumnSelector {
            family: family.to_string(),
            qualifier: qualifier.map(|q| q.to_string()),
            qualifier_prefix: None,
            max_versions: u32::MAX,
            time_range: None,
        }
    }

    fn lookup(selectors: Vec<ColumnSelector>) -> PointLookup {
        PointLookup { selectors }
    }

    #[test]
    fn test_get_missing_row_is_empty_not_error() {
        let store = MemoryStore::new();
        let row = store
            .get(&EntityId::from("nope"), &lookup(vec![selector("f", None)]))
            .unwrap();
        assert!(row.cells.is_empty());
    }

    #[test]
    fn test_versions_newest_first_and_capped() {
        let store = MemoryStore::new();
        let row = EntityId::from("r1");
        let column = PhysicalColumn::new("f", "q");
        for ts in 1..=5 {
            store.put(&row, &column, ts, vec![ts as u8]);
        }

        let mut sel = selector("f", Some("q"));
        sel.max_versions = 2;
        let fetched = store.get(&row, &lookup(vec![sel])).unwrap();
        let timestamps: Vec<u64> = fetched.cells.iter().map(|c| c.timestamp).collect();
        assert_eq!(timestamps, vec![5, 4]);
    }

    #[test]
    fn test_time_range_filters_versions() {
        let store = MemoryStore::new();
        let row = EntityId::from("r1");
        let column = PhysicalColumn::new("f", "q");
        for ts in 1..=5 {
            store.put(&row, &column, ts, vec![]);
        }

        let mut sel = selector("f", Some("q"));
        sel.time_range = Some(TimeRange::new(2, 4));
        let fetched = store.get(&row, &lookup(vec![sel])).unwrap();
        let timestamps: Vec<u64> = fetched.cells.iter().map(|c| c.timestamp).collect();
        assert_eq!(timestamps, vec![3, 2]);
    }

    #[test]
    fn test_batch_get_alignment_with_failed_row() {
        let store = MemoryStore::new();
        let column = PhysicalColumn::new("f", "q");
        let ids: Vec<EntityId> = ["a", "b", "c"].into_iter().map(EntityId::from).collect();
        for id in &ids {
            store.put(id, &column, 1, vec![]);
        }
        store.fail_row(&ids[1]);

        let results = store
            .batch_get(&ids, &lookup(vec![selector("f", Some("q"))]))
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_some());
        assert!(results[1].is_none());
        assert!(results[2].is_some());
    }

    #[test]
    fn test_scan_bounds_and_prefix_matching() {
        let store = MemoryStore::new();
        let column = PhysicalColumn::new("0", "1:name");
        for key in ["a", "b", "c", "d"] {
            store.put(&EntityId::from(key), &column, 1, vec![]);
        }

        let mut sel = selector("0", None);
        sel.qualifier_prefix = Some("1:".to_string());
        let scan = ScanDescriptor {
            selectors: vec![sel],
            start_row: Some(b"b".to_vec()),
            stop_row: Some(b"d".to_vec()),
            batch_size: 10,
            filter: None,
        };
        let mut cursor = store.open_scan(&scan).unwrap();
        let keys: Vec<Vec<u8>> = cursor
            .next_batch(10)
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);
        assert!(cursor.next_batch(10).unwrap().is_empty());
    }

    #[test]
    fn test_injected_timeout_fires_once() {
        let store = MemoryStore::new();
        let column = PhysicalColumn::new("f", "q");
        for key in ["a", "b", "c", "d"] {
            store.put(&EntityId::from(key), &column, 1, vec![]);
        }
        store.inject_scan_timeout_at(2);

        let scan = ScanDescriptor {
            selectors: vec![selector("f", Some("q"))],
            start_row: None,
            stop_row: None,
            batch_size: 2,
            filter: None,
        };
        let mut cursor = store.open_scan(&scan).unwrap();
        assert_eq!(cursor.next_batch(2).unwrap().len(), 2);
        assert!(matches!(cursor.next_batch(2), Err(StoreError::Timeout)));
        // The mark is consumed; the next call succeeds.
        assert_eq!(cursor.next_batch(2).unwrap().len(), 2);
    }
}
