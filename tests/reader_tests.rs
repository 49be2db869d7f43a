use std::sync::Arc;

use trellis::layout::{LayoutMutation, LayoutStore, MemoryLayoutStore, NamingPolicy, TableLayout};
use trellis::request::{ColumnRequest, DataRequest, RequestError};
use trellis::schema::{
    encode_cell, CellSchema, CellValue, MemorySchemaRegistry, SchemaId, SchemaRegistry,
};
use trellis::store::{EntityId, MemoryStore, StoreError};
use trellis::table::{TableError, TableHandle};

struct Fixture {
    store: Arc<MemoryStore>,
    table: TableHandle,
}

impl Fixture {
    fn new() -> Self {
        let mut builder = TableLayout::builder("users", NamingPolicy::Compact);
        builder.add_locality_group("default").unwrap();
        builder.add_group_family("default", "info", 3).unwrap();
        builder
            .add_column("info", "name", CellSchema::Utf8, 1)
            .unwrap();
        builder
            .add_column("info", "age", CellSchema::Long, 2)
            .unwrap();
        builder
            .add_map_family("default", "tags", CellSchema::Long, 5)
            .unwrap();

        let layout_store = Arc::new(MemoryLayoutStore::new());
        layout_store.write(&builder.build().unwrap()).unwrap();

        let registry = Arc::new(MemorySchemaRegistry::new());
        registry.register(CellSchema::Utf8).unwrap();
        registry.register(CellSchema::Long).unwrap();

        let store = Arc::new(MemoryStore::new());
        let table =
            TableHandle::open("users", store.clone(), layout_store, registry).unwrap();
        Self { store, table }
    }

    fn put_utf8(&self, row: &str, family: &str, qualifier: &str, timestamp: u64, value: &str) {
        let column = self
            .table
            .capsule()
            .translator()
            .to_physical(family, qualifier)
            .unwrap();
        self.store.put(
            &EntityId::from(row),
            &column,
            timestamp,
            encode_cell(
                SchemaId::of(CellSchema::Utf8),
                &CellValue::Utf8(value.to_string()),
            ),
        );
    }

    fn put_long(&self, row: &str, family: &str, qualifier: &str, timestamp: u64, value: i64) {
        let column = self
            .table
            .capsule()
            .translator()
            .to_physical(family, qualifier)
            .unwrap();
        self.store.put(
            &EntityId::from(row),
            &column,
            timestamp,
            encode_cell(SchemaId::of(CellSchema::Long), &CellValue::Long(value)),
        );
    }
}

#[test]
fn test_get_decodes_requested_columns() {
    let fx = Fixture::new();
    fx.put_utf8("alice", "info", "name", 10, "Alice");
    fx.put_long("alice", "info", "age", 10, 34);

    let reader = fx.table.reader();
    let request = DataRequest::builder()
        .column("info", "name")
        .column("info", "age")
        .build();
    let mut row = reader.get(&EntityId::from("alice"), &request).unwrap();

    assert_eq!(
        row.value("info", "name").unwrap().unwrap().as_str(),
        Some("Alice")
    );
    assert_eq!(row.value("info", "age").unwrap().unwrap().as_long(), Some(34));
    reader.close().unwrap();
}

#[test]
fn test_unrequested_columns_not_returned() {
    let fx = Fixture::new();
    fx.put_utf8("alice", "info", "name", 10, "Alice");
    fx.put_long("alice", "info", "age", 10, 34);

    let reader = fx.table.reader();
    let request = DataRequest::builder().column("info", "name").build();
    let mut row = reader.get(&EntityId::from("alice"), &request).unwrap();

    assert!(row.contains_column("info", "name"));
    assert!(!row.contains_column("info", "age"));
    assert_eq!(row.value("info", "age").unwrap(), None);
    reader.close().unwrap();
}

#[test]
fn test_missing_row_is_empty_not_error() {
    let fx = Fixture::new();
    let reader = fx.table.reader();
    let request = DataRequest::builder().column("info", "name").build();
    let row = reader.get(&EntityId::from("nobody"), &request).unwrap();
    assert!(row.is_empty());
    reader.close().unwrap();
}

#[test]
fn test_empty_request_short_circuits_before_store() {
    let fx = Fixture::new();
    // The store would fail this row; an empty request must never reach it.
    fx.store.fail_row(&EntityId::from("alice"));

    let reader = fx.table.reader();
    let row = reader
        .get(&EntityId::from("alice"), &DataRequest::default())
        .unwrap();
    assert!(row.is_empty());
    reader.close().unwrap();
}

#[test]
fn test_version_history_newest_first() {
    let fx = Fixture::new();
    for ts in 1..=4 {
        fx.put_long("alice", "info", "age", ts, ts as i64);
    }

    let reader = fx.table.reader();
    let request = DataRequest::builder()
        .add(ColumnRequest::new("info").with_qualifier("age").with_max_versions(2))
        .build();
    let mut row = reader.get(&EntityId::from("alice"), &request).unwrap();

    assert_eq!(row.timestamps("info", "age"), vec![4, 3]);
    let versions = row.versions("info", "age");
    assert_eq!(versions[0].1.as_ref().unwrap().as_long(), Some(4));
    assert_eq!(versions[1].1.as_ref().unwrap().as_long(), Some(3));
    reader.close().unwrap();
}

#[test]
fn test_map_family_read_by_family() {
    let fx = Fixture::new();
    fx.put_long("alice", "tags", "sports", 5, 1);
    fx.put_long("alice", "tags", "music", 6, 2);

    let reader = fx.table.reader();
    let request = DataRequest::builder().family("tags").build();
    let mut row = reader.get(&EntityId::from("alice"), &request).unwrap();

    let mut qualifiers: Vec<String> = row
        .columns()
        .map(|(_, qualifier)| qualifier.to_string())
        .collect();
    qualifiers.sort();
    assert_eq!(qualifiers, vec!["music".to_string(), "sports".to_string()]);
    assert_eq!(row.value("tags", "music").unwrap().unwrap().as_long(), Some(2));
    reader.close().unwrap();
}

#[test]
fn test_bulk_get_stays_index_aligned() {
    let fx = Fixture::new();
    fx.put_utf8("alice", "info", "name", 1, "Alice");
    fx.put_utf8("carol", "info", "name", 1, "Carol");
    fx.store.fail_row(&EntityId::from("bob"));
    // "bob" has data too; only its retrieval fails.
    fx.put_utf8("bob", "info", "name", 1, "Bob");

    let reader = fx.table.reader();
    let request = DataRequest::builder().column("info", "name").build();
    let ids: Vec<EntityId> = ["alice", "bob", "carol"]
        .into_iter()
        .map(EntityId::from)
        .collect();
    let mut results = reader.bulk_get(&ids, &request).unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[1].is_none());
    let alice = results[0].as_mut().unwrap();
    assert_eq!(
        alice.value("info", "name").unwrap().unwrap().as_str(),
        Some("Alice")
    );
    let carol = results[2].as_mut().unwrap();
    assert_eq!(
        carol.value("info", "name").unwrap().unwrap().as_str(),
        Some("Carol")
    );
    reader.close().unwrap();
}

#[test]
fn test_bulk_get_single_id_uses_single_row_path() {
    let fx = Fixture::new();
    fx.store.fail_row(&EntityId::from("bob"));

    let reader = fx.table.reader();
    let request = DataRequest::builder().column("info", "name").build();

    // On the single-row path a failed row surfaces as the get error, not as
    // an aligned None.
    let err = reader
        .bulk_get(&[EntityId::from("bob")], &request)
        .unwrap_err();
    assert!(matches!(err, TableError::Store(StoreError::Unavailable(_))));
    reader.close().unwrap();
}

#[test]
fn test_bulk_get_empty_id_list() {
    let fx = Fixture::new();
    let reader = fx.table.reader();
    let request = DataRequest::builder().column("info", "name").build();
    assert!(reader.bulk_get(&[], &request).unwrap().is_empty());
    reader.close().unwrap();
}

#[test]
fn test_invalid_request_fails_before_store() {
    let fx = Fixture::new();
    fx.store.fail_row(&EntityId::from("alice"));

    let reader = fx.table.reader();
    let request = DataRequest::builder().column("info", "missing").build();
    let err = reader
        .get(&EntityId::from("alice"), &request)
        .unwrap_err();
    // Validation rejects the request; the failing store is never consulted.
    assert!(matches!(err, TableError::Request(_)));
    reader.close().unwrap();
}

#[test]
fn test_schema_expectation_checked_during_validation() {
    let fx = Fixture::new();
    let reader = fx.table.reader();
    let request = DataRequest::builder()
        .add(
            ColumnRequest::new("info")
                .with_qualifier("age")
                .with_expected_schema(CellSchema::Utf8),
        )
        .build();
    let err = reader
        .get(&EntityId::from("alice"), &request)
        .unwrap_err();
    assert!(matches!(
        err,
        TableError::Request(RequestError::InvalidRequest { .. })
    ));
    reader.close().unwrap();
}

#[test]
fn test_reads_pin_the_layout_they_started_with() {
    let fx = Fixture::new();
    fx.put_utf8("alice", "info", "name", 1, "Alice");

    let reader = fx.table.reader();
    let request = DataRequest::builder().column("info", "name").build();
    let mut old_row = reader.get(&EntityId::from("alice"), &request).unwrap();

    fx.table
        .apply_layout_update(&[LayoutMutation::AddColumn {
            family: "info".to_string(),
            qualifier: "email".to_string(),
            schema: CellSchema::Utf8,
            max_versions: 1,
        }])
        .unwrap();

    // The already-read row stays bound to the version it was read under and
    // still decodes.
    assert_eq!(old_row.layout_version(), 1);
    assert_eq!(
        old_row.value("info", "name").unwrap().unwrap().as_str(),
        Some("Alice")
    );

    // A fresh read through the same reader sees the new version.
    let new_row = reader.get(&EntityId::from("alice"), &request).unwrap();
    assert_eq!(new_row.layout_version(), 2);
    reader.close().unwrap();
}

#[test]
fn test_row_data_is_inspectable() {
    let fx = Fixture::new();
    fx.put_utf8("alice", "info", "name", 1, "Alice");

    let reader = fx.table.reader();
    let request = DataRequest::builder().column("info", "name").build();
    let row = reader.get(&EntityId::from("alice"), &request).unwrap();

    let rendered = format!("{row:?}");
    assert!(rendered.contains("RowData"));
    assert!(rendered.contains("layout_version"));
    reader.close().unwrap();
}

#[test]
fn test_use_after_close() {
    let fx = Fixture::new();
    let reader = fx.table.reader();
    reader.close().unwrap();

    let request = DataRequest::builder().column("info", "name").build();
    assert!(matches!(
        reader.get(&EntityId::from("alice"), &request),
        Err(TableError::Closed)
    ));
    assert!(matches!(
        reader.bulk_get(&[EntityId::from("alice")], &request),
        Err(TableError::Closed)
    ));
    assert!(matches!(reader.close(), Err(TableError::Closed)));
}

#[test]
fn test_table_outlives_reader_via_refcount() {
    let fx = Fixture::new();
    assert_eq!(fx.table.ref_count(), 1);
    {
        let reader = fx.table.reader();
        let second = fx.table.reader();
        assert_eq!(fx.table.ref_count(), 3);
        reader.close().unwrap();
        drop(second);
    }
    assert_eq!(fx.table.ref_count(), 1);
}
