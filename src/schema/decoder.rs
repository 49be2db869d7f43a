use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::layout::{FamilyKind, TableLayout};

use super::registry::{SchemaId, SchemaRegistry};
use super::value::{self, CellSchema, CellValue, DecodeError};

/// Decoder for one column's cells.
///
/// A decoder is pinned to the schema its layout version configures for the
/// column. Each payload's embedded schema reference is resolved through the
/// registry (with a small local cache) and checked against that expectation
/// before the value bytes are parsed.
pub struct CellDecoder {
    expected: CellSchema,
    registry: Arc<dyn SchemaRegistry>,
    resolved: Mutex<HashMap<SchemaId, CellSchema>>,
}

impl CellDecoder {
    pub(crate) fn new(expected: CellSchema, registry: Arc<dyn SchemaRegistry>) -> Self {
        Self {
            expected,
            registry,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// The schema this decoder expects cells to carry.
    pub fn expected_schema(&self) -> CellSchema {
        self.expected
    }

    /// Decodes one schema-tagged cell payload.
    ///
    /// # Errors
    ///
    /// Returns a per-cell [`DecodeError`]; the caller reports it for this
    /// cell only.
    pub fn decode(&self, payload: &[u8]) -> Result<CellValue, DecodeError> {
        let (id, value_bytes) = value::split_cell(payload)?;
        let actual = self.resolve(id)?;
        if actual != self.expected {
            return Err(DecodeError::SchemaMismatch {
                expected: self.expected,
                actual,
            });
        }
        CellValue::from_bytes(actual, value_bytes)
    }

    fn resolve(&self, id: SchemaId) -> Result<CellSchema, DecodeError> {
        if let Some(schema) = self.resolved.lock().unwrap().get(&id) {
            return Ok(*schema);
        }
        let schema = self.registry.resolve(id)?;
        self.resolved.lock().unwrap().insert(id, schema);
        Ok(schema)
    }
}

/// Per-layout-version provider of cell decoders.
///
/// Built once per capsule from a single layout version: one decoder per live
/// column of each group-type family, one family-wide decoder per map-type
/// family. Lookups after construction are lock-free.
pub struct CellDecoderProvider {
    columns: HashMap<(String, String), Arc<CellDecoder>>,
    families: HashMap<String, Arc<CellDecoder>>,
}

impl CellDecoderProvider {
    pub(crate) fn new(layout: &TableLayout, registry: Arc<dyn SchemaRegistry>) -> Self {
        let mut columns = HashMap::new();
        let mut families = HashMap::new();

        for family in layout.live_families() {
            match &family.kind {
                FamilyKind::Group { columns: defs } => {
                    for column in defs.iter().filter(|c| !c.deleted) {
                        columns.insert(
                            (family.name.clone(), column.name.clone()),
                            Arc::new(CellDecoder::new(column.schema, registry.clone())),
                        );
                    }
                }
                FamilyKind::Map { schema } => {
                    families.insert(
                        family.name.clone(),
                        Arc::new(CellDecoder::new(*schema, registry.clone())),
                    );
                }
            }
        }

        Self { columns, families }
    }

    /// Returns the decoder for a logical column, if the bound layout version
    /// defines one. Map-type families resolve through their family-wide
    /// decoder for any qualifier.
    pub fn decoder_for(&self, family: &str, qualifier: &str) -> Option<&Arc<CellDecoder>> {
        self.columns
            .get(&(family.to_string(), qualifier.to_string()))
            .or_else(|| self.families.get(family))
    }
}
