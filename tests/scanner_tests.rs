use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use trellis::layout::{LayoutMutation, LayoutStore, MemoryLayoutStore, NamingPolicy, TableLayout};
use trellis::request::{DataRequest, RowFilter, ScanOptions};
use trellis::schema::{
    encode_cell, CellSchema, CellValue, MemorySchemaRegistry, SchemaId, SchemaRegistry,
};
use trellis::store::{EntityId, MemoryStore, StoreError};
use trellis::table::{RowScanner, TableError, TableHandle};

struct Fixture {
    store: Arc<MemoryStore>,
    table: TableHandle,
}

impl Fixture {
    fn new() -> Self {
        let mut builder = TableLayout::builder("events", NamingPolicy::Compact);
        builder.add_locality_group("default").unwrap();
        builder.add_group_family("default", "event", 3).unwrap();
        builder
            .add_column("event", "kind", CellSchema::Utf8, 1)
            .unwrap();

        let layout_store = Arc::new(MemoryLayoutStore::new());
        layout_store.write(&builder.build().unwrap()).unwrap();

        let registry = Arc::new(MemorySchemaRegistry::new());
        registry.register(CellSchema::Utf8).unwrap();

        let store = Arc::new(MemoryStore::new());
        let table =
            TableHandle::open("events", store.clone(), layout_store, registry).unwrap();
        Self { store, table }
    }

    fn put_kind(&self, row: &[u8], value: &str) {
        let column = self
            .table
            .capsule()
            .translator()
            .to_physical("event", "kind")
            .unwrap();
        self.store.put(
            &EntityId::from(row),
            &column,
            1,
            encode_cell(
                SchemaId::of(CellSchema::Utf8),
                &CellValue::Utf8(value.to_string()),
            ),
        );
    }
}

fn kind_request() -> DataRequest {
    DataRequest::builder().column("event", "kind").build()
}

fn drain_keys(scanner: &mut RowScanner) -> Vec<Vec<u8>> {
    let mut keys = Vec::new();
    while let Some(row) = scanner.next_row().unwrap() {
        keys.push(row.entity_id().as_bytes().to_vec());
    }
    keys
}

/// Random but reproducible workload of distinct row keys.
fn random_keys(count: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keys = Vec::with_capacity(count);
    while keys.len() < count {
        let len = rng.random_range(4..12);
        let key: Vec<u8> = (0..len).map(|_| rng.random_range(b'a'..=b'z')).collect();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

#[test]
fn test_scan_returns_rows_in_key_order() {
    let fx = Fixture::new();
    let mut keys = random_keys(60, 7);
    for key in &keys {
        fx.put_kind(key, "click");
    }

    let reader = fx.table.reader();
    let mut scanner = reader
        .get_scanner(&kind_request(), ScanOptions::new().with_batch_size(16))
        .unwrap();
    let scanned = drain_keys(&mut scanner);
    scanner.close().unwrap();
    reader.close().unwrap();

    keys.sort();
    assert_eq!(scanned, keys);
}

#[test]
fn test_scan_respects_bounds_and_filter() {
    let fx = Fixture::new();
    for key in [&b"ant"[..], b"apple", b"banana", b"bee", b"cat"] {
        fx.put_kind(key, "click");
    }

    let reader = fx.table.reader();
    let options = ScanOptions::new()
        .with_start_row(EntityId::from(&b"apple"[..]))
        .with_stop_row(EntityId::from(&b"cat"[..]))
        .with_row_filter(RowFilter::RowKeyPrefix(b"b".to_vec()));
    let mut scanner = reader.get_scanner(&kind_request(), options).unwrap();
    let scanned = drain_keys(&mut scanner);
    scanner.close().unwrap();
    reader.close().unwrap();

    assert_eq!(scanned, vec![b"banana".to_vec(), b"bee".to_vec()]);
}

#[test]
fn test_rows_decode_through_the_scan() {
    let fx = Fixture::new();
    fx.put_kind(b"r1", "click");
    fx.put_kind(b"r2", "view");

    let reader = fx.table.reader();
    let scanner = reader
        .get_scanner(&kind_request(), ScanOptions::new())
        .unwrap();
    let mut kinds = Vec::new();
    for row in scanner {
        let mut row = row.unwrap();
        kinds.push(
            row.value("event", "kind")
                .unwrap()
                .unwrap()
                .as_str()
                .unwrap()
                .to_string(),
        );
    }
    reader.close().unwrap();

    assert_eq!(kinds, vec!["click".to_string(), "view".to_string()]);
}

#[test]
fn test_timeout_reopen_neither_skips_nor_repeats() {
    let fx = Fixture::new();
    let mut keys = random_keys(50, 11);
    for key in &keys {
        fx.put_kind(key, "click");
    }
    fx.store.inject_scan_timeout_at(20);

    let reader = fx.table.reader();
    let options = ScanOptions::new()
        .with_batch_size(10)
        .with_reopen_on_timeout(true);
    let mut scanner = reader.get_scanner(&kind_request(), options).unwrap();
    let scanned = drain_keys(&mut scanner);
    scanner.close().unwrap();
    reader.close().unwrap();

    keys.sort();
    assert_eq!(scanned, keys);
}

#[test]
fn test_separated_timeouts_are_each_absorbed() {
    let fx = Fixture::new();
    for key in [&b"a"[..], b"b", b"c", b"d", b"e", b"f"] {
        fx.put_kind(key, "click");
    }
    // Two timeouts with delivered rows in between; both recoverable.
    fx.store.inject_scan_timeout_at(2);
    fx.store.inject_scan_timeout_at(4);

    let reader = fx.table.reader();
    let options = ScanOptions::new()
        .with_batch_size(2)
        .with_reopen_on_timeout(true);
    let mut scanner = reader.get_scanner(&kind_request(), options).unwrap();
    let scanned = drain_keys(&mut scanner);
    scanner.close().unwrap();
    reader.close().unwrap();

    assert_eq!(
        scanned,
        vec![
            b"a".to_vec(),
            b"b".to_vec(),
            b"c".to_vec(),
            b"d".to_vec(),
            b"e".to_vec(),
            b"f".to_vec()
        ]
    );
}

#[test]
fn test_back_to_back_timeouts_abort_the_scan() {
    let fx = Fixture::new();
    for key in [&b"a"[..], b"b", b"c", b"d"] {
        fx.put_kind(key, "click");
    }
    // The reopened scan times out again before delivering anything.
    fx.store.inject_scan_timeout_at(2);
    fx.store.inject_scan_timeout_at(2);

    let reader = fx.table.reader();
    let options = ScanOptions::new()
        .with_batch_size(2)
        .with_reopen_on_timeout(true);
    let mut scanner = reader.get_scanner(&kind_request(), options).unwrap();

    assert!(scanner.next_row().unwrap().is_some());
    assert!(scanner.next_row().unwrap().is_some());
    let err = scanner.next_row().unwrap_err();
    assert!(matches!(err, TableError::Store(StoreError::Timeout)));

    scanner.close().unwrap();
    reader.close().unwrap();
}

#[test]
fn test_timeout_without_reopen_is_fatal() {
    let fx = Fixture::new();
    for key in [&b"a"[..], b"b", b"c"] {
        fx.put_kind(key, "click");
    }
    fx.store.inject_scan_timeout_at(2);

    let reader = fx.table.reader();
    let mut scanner = reader
        .get_scanner(&kind_request(), ScanOptions::new().with_batch_size(2))
        .unwrap();
    assert!(scanner.next_row().unwrap().is_some());
    assert!(scanner.next_row().unwrap().is_some());
    assert!(matches!(
        scanner.next_row(),
        Err(TableError::Store(StoreError::Timeout))
    ));
    scanner.close().unwrap();
    reader.close().unwrap();
}

#[test]
fn test_scan_pins_the_layout_it_opened_with() {
    let fx = Fixture::new();
    fx.put_kind(b"r1", "click");
    fx.put_kind(b"r2", "view");

    let reader = fx.table.reader();
    let mut scanner = reader
        .get_scanner(&kind_request(), ScanOptions::new().with_batch_size(1))
        .unwrap();
    let first = scanner.next_row().unwrap().unwrap();
    assert_eq!(first.layout_version(), 1);

    fx.table
        .apply_layout_update(&[LayoutMutation::AddColumn {
            family: "event".to_string(),
            qualifier: "source".to_string(),
            schema: CellSchema::Utf8,
            max_versions: 1,
        }])
        .unwrap();

    // Rows delivered after the update still decode against the version the
    // scan opened with.
    let second = scanner.next_row().unwrap().unwrap();
    assert_eq!(second.layout_version(), 1);
    assert_eq!(scanner.layout_version(), 1);

    scanner.close().unwrap();
    reader.close().unwrap();
}

#[test]
fn test_scanner_close_semantics() {
    let fx = Fixture::new();
    fx.put_kind(b"r1", "click");

    let reader = fx.table.reader();
    let mut scanner = reader
        .get_scanner(&kind_request(), ScanOptions::new())
        .unwrap();
    scanner.close().unwrap();
    assert!(matches!(scanner.next_row(), Err(TableError::Closed)));
    assert!(matches!(scanner.close(), Err(TableError::Closed)));
    reader.close().unwrap();
}
