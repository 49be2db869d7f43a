use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::schema::{CellValue, DecodeError};
use crate::store::{EntityId, RawRow};

use super::capsule::LayoutCapsule;

/// Materialized result of one row read.
///
/// Cells are held raw, keyed by logical (family, qualifier), newest version
/// first. A cell is decoded only when first requested and the decoded value
/// is cached. Decoding goes through the capsule captured when the row was
/// read, not the table's current layout, so reads stay correct across
/// schema evolution, and a decode failure is reported for that cell only.
pub struct RowData {
    entity_id: EntityId,
    capsule: Arc<LayoutCapsule>,
    cells: BTreeMap<(String, String), Vec<(u64, Vec<u8>)>>,
    decoded: HashMap<(String, String, u64), CellValue>,
}

impl fmt::Debug for RowData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowData")
            .field("entity_id", &self.entity_id)
            .field("layout_version", &self.capsule.layout().version())
            .field("columns", &self.cells.len())
            .finish_non_exhaustive()
    }
}

impl RowData {
    /// Builds row data from a raw store result, translating physical column
    /// identifiers back to logical names through the capsule.
    ///
    /// Cells whose physical column does not resolve against the capsule's
    /// layout version are skipped; they belong to definitions this snapshot
    /// cannot see.
    pub(crate) fn from_raw(entity_id: EntityId, raw: RawRow, capsule: Arc<LayoutCapsule>) -> Self {
        let mut cells: BTreeMap<(String, String), Vec<(u64, Vec<u8>)>> = BTreeMap::new();
        for cell in raw.cells {
            match capsule.translator().to_logical(&cell.column) {
                Ok((family, qualifier)) => {
                    cells
                        .entry((family, qualifier))
                        .or_default()
                        .push((cell.timestamp, cell.payload));
                }
                Err(_) => {
                    #[cfg(feature = "logging")]
                    log::debug!(
                        "skipping cell in unresolvable physical column {}",
                        cell.column
                    );
                }
            }
        }
        for versions in cells.values_mut() {
            versions.sort_by(|a, b| b.0.cmp(&a.0));
        }
        Self {
            entity_id,
            capsule,
            cells,
            decoded: HashMap::new(),
        }
    }

    /// An empty result: the row exists in no physical response, so it
    /// reports no cells. Not an error.
    pub(crate) fn empty(entity_id: EntityId, capsule: Arc<LayoutCapsule>) -> Self {
        Self {
            entity_id,
            capsule,
            cells: BTreeMap::new(),
            decoded: HashMap::new(),
        }
    }

    /// The row key this data was read for.
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// The layout version this row is bound to.
    pub fn layout_version(&self) -> u64 {
        self.capsule.layout().version()
    }

    /// True when the read returned no cells at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when at least one version exists for the column.
    pub fn contains_column(&self, family: &str, qualifier: &str) -> bool {
        self.cells
            .contains_key(&(family.to_string(), qualifier.to_string()))
    }

    /// Logical columns present in this row.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells
            .keys()
            .map(|(family, qualifier)| (family.as_str(), qualifier.as_str()))
    }

    /// Version timestamps for a column, newest first.
    pub fn timestamps(&self, family: &str, qualifier: &str) -> Vec<u64> {
        self.cells
            .get(&(family.to_string(), qualifier.to_string()))
            .map(|versions| versions.iter().map(|(ts, _)| *ts).collect())
            .unwrap_or_default()
    }

    /// Decodes and returns the most recent value of a column, or `None` if
    /// the row holds no cell for it.
    ///
    /// # Errors
    ///
    /// Returns the per-cell [`DecodeError`]; other columns of the row are
    /// unaffected.
    pub fn value(
        &mut self,
        family: &str,
        qualifier: &str,
    ) -> Result<Option<CellValue>, DecodeError> {
        match self.timestamps(family, qualifier).first() {
            Some(&timestamp) => self.value_at(family, qualifier, timestamp),
            None => Ok(None),
        }
    }

    /// Decodes and returns the value of a column at an exact version
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns the per-cell [`DecodeError`].
    pub fn value_at(
        &mut self,
        family: &str,
        qualifier: &str,
        timestamp: u64,
    ) -> Result<Option<CellValue>, DecodeError> {
        let cache_key = (family.to_string(), qualifier.to_string(), timestamp);
        if let Some(value) = self.decoded.get(&cache_key) {
            return Ok(Some(value.clone()));
        }

        let Some(versions) = self
            .cells
            .get(&(family.to_string(), qualifier.to_string()))
        else {
            return Ok(None);
        };
        let Some((_, payload)) = versions.iter().find(|(ts, _)| *ts == timestamp) else {
            return Ok(None);
        };

        let decoder = self
            .capsule
            .decoder_provider()
            .decoder_for(family, qualifier)
            .ok_or_else(|| {
                DecodeError::Malformed(format!(
                    "no decoder for column '{family}:{qualifier}' at layout version {}",
                    self.capsule.layout().version()
                ))
            })?;
        let value = decoder.decode(payload)?;
        self.decoded.insert(cache_key, value.clone());
        Ok(Some(value))
    }

    /// Decodes every version of a column, newest first. Failures are
    /// per-cell: one undecodable version does not hide its siblings.
    pub fn versions(
        &mut self,
        family: &str,
        qualifier: &str,
    ) -> Vec<(u64, Result<CellValue, DecodeError>)> {
        self.timestamps(family, qualifier)
            .into_iter()
            .map(|timestamp| {
                let value = self
                    .value_at(family, qualifier, timestamp)
                    .map(|v| v.expect("timestamp listed but cell missing"));
                (timestamp, value)
            })
            .collect()
    }
}
