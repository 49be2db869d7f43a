//! # trellis
//!
//! Schema-aware data-access layer for distributed column-family stores.
//!
//! Trellis sits between applications and a sparse, versioned key-value store.
//! Applications address data by entity id and logical column names; trellis
//! owns the mapping to physical storage coordinates, the typed encoding of
//! cell values, and the evolution of table schemas over time.
//!
//! ## Features
//!
//! - **Versioned layouts**: immutable table schemas evolved through validated
//!   all-or-nothing mutation batches; dropped definitions are tombstoned so
//!   old data stays readable and physical encodings are never reused
//! - **Name translation**: bidirectional logical-to-physical column mapping,
//!   verbatim or compacted to short identifiers for storage efficiency
//! - **Snapshot-consistent reads**: every get, bulk get, and scan captures
//!   one layout snapshot and is decoded against it end to end, even while
//!   the table's schema advances concurrently
//! - **Partial-failure contracts**: batch reads stay index-aligned with
//!   per-row failures, cell decoding fails per cell, and scans can absorb
//!   one store timeout by transparently resuming after the last row
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use trellis::layout::{LayoutStore, MemoryLayoutStore, NamingPolicy, TableLayout};
//! use trellis::request::DataRequest;
//! use trellis::schema::{encode_cell, CellSchema, CellValue, MemorySchemaRegistry, SchemaId, SchemaRegistry};
//! use trellis::store::{EntityId, MemoryStore};
//! use trellis::table::TableHandle;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Describe the table: one locality group, one family, one typed column.
//! let mut builder = TableLayout::builder("users", NamingPolicy::Compact);
//! builder.add_locality_group("default")?;
//! builder.add_group_family("default", "info", 3)?;
//! builder.add_column("info", "name", CellSchema::Utf8, 1)?;
//!
//! let layout_store = Arc::new(MemoryLayoutStore::new());
//! layout_store.write(&builder.build()?)?;
//!
//! let registry = Arc::new(MemorySchemaRegistry::new());
//! registry.register(CellSchema::Utf8)?;
//!
//! let store = Arc::new(MemoryStore::new());
//! let table = TableHandle::open("users", store.clone(), layout_store, registry)?;
//!
//! // Write one cell at the physical coordinates the layout assigns.
//! let column = table.capsule().translator().to_physical("info", "name")?;
//! let payload = encode_cell(
//!     SchemaId::of(CellSchema::Utf8),
//!     &CellValue::Utf8("Alice".to_string()),
//! );
//! store.put(&EntityId::from("alice"), &column, 1, payload);
//!
//! // Read it back by logical name.
//! let reader = table.reader();
//! let request = DataRequest::builder().column("info", "name").build();
//! let mut row = reader.get(&EntityId::from("alice"), &request)?;
//! assert_eq!(row.value("info", "name")?.unwrap().as_str(), Some("Alice"));
//! reader.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The crate is organized along the request path:
//!
//! - [`layout`]: versioned table layouts, the mutation engine, and the
//!   column name translator
//! - [`schema`]: cell value encoding, schema fingerprints, and per-column
//!   decoders backed by a schema registry
//! - [`request`]: logical read requests, structural validation, and
//!   compilation into physical lookups and scans
//! - [`store`]: the narrow client contract to the physical store, plus the
//!   in-memory implementation used for tests
//! - [`table`]: reference-counted open-table handles, readers, row results,
//!   and scanners
//!
//! Trellis is a read-path and schema-management layer. It does not implement
//! the physical store itself: anything that speaks the [`store::StoreClient`]
//! contract plugs in underneath.

pub mod layout;
pub mod request;
pub mod schema;
pub mod store;
pub mod table;

pub use layout::{LayoutBuilder, LayoutMutation, LayoutStore, NamingPolicy, TableLayout};
pub use request::{DataRequest, ScanOptions};
pub use schema::{CellSchema, CellValue};
pub use store::EntityId;
pub use table::{RowData, RowScanner, TableError, TableHandle, TableReader};
