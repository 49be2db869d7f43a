use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::table_layout::{LayoutError, TableLayout};

/// Durable storage for current and historical table layouts.
///
/// The data-access layer reads the current version to build a capsule and
/// writes a new version when a mutation batch commits. Implementations keep
/// every version so cells written under old layouts stay resolvable.
pub trait LayoutStore: Send + Sync {
    /// Returns the most recent layout stored for the table.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NoSuchTable`] if no layout has been stored.
    fn read_current(&self, table: &str) -> Result<Arc<TableLayout>, LayoutError>;

    /// Returns a specific historical layout version.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NoSuchTable`] for an unknown table or
    /// [`LayoutError::InvalidLayout`] for an unknown version.
    fn read_version(&self, table: &str, version: u64) -> Result<Arc<TableLayout>, LayoutError>;

    /// Appends a new layout version for its table.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidLayout`] if the version does not
    /// advance past the stored current version.
    fn write(&self, layout: &TableLayout) -> Result<(), LayoutError>;
}

/// In-memory [`LayoutStore`] keeping full version history per table.
#[derive(Default)]
pub struct MemoryLayoutStore {
    tables: RwLock<HashMap<String, Vec<Arc<TableLayout>>>>,
}

impl MemoryLayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of versions stored for a table. Zero for unknown tables.
    pub fn version_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn read_current(&self, table: &str) -> Result<Arc<TableLayout>, LayoutError> {
        let tables = self.tables.read().unwrap();
        tables
            .get(table)
            .and_then(|versions| versions.last().cloned())
            .ok_or_else(|| LayoutError::NoSuchTable(table.to_string()))
    }

    fn read_version(&self, table: &str, version: u64) -> Result<Arc<TableLayout>, LayoutError> {
        let tables = self.tables.read().unwrap();
        let versions = tables
            .get(table)
            .ok_or_else(|| LayoutError::NoSuchTable(table.to_string()))?;
        versions
            .iter()
            .find(|l| l.version() == version)
            .cloned()
            .ok_or_else(|| {
                LayoutError::InvalidLayout(format!(
                    "table '{table}' has no layout version {version}"
                ))
            })
    }

    fn write(&self, layout: &TableLayout) -> Result<(), LayoutError> {
        layout.validate()?;
        let mut tables = self.tables.write().unwrap();
        let versions = tables.entry(layout.name().to_string()).or_default();
        if let Some(current) = versions.last() {
            if layout.version() <= current.version() {
                return Err(LayoutError::InvalidLayout(format!(
                    "layout version {} does not advance past stored version {}",
                    layout.version(),
                    current.version()
                )));
            }
        }
        versions.push(Arc::new(layout.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::NamingPolicy;

    fn layout_v1() -> TableLayout {
        let mut builder = TableLayout::builder("users", NamingPolicy::Verbatim);
        builder.add_locality_group("default").unwrap();
        builder.add_group_family("default", "info", 1).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_write_and_read_current() {
        let store = MemoryLayoutStore::new();
        let v1 = layout_v1();
        store.write(&v1).unwrap();
        assert_eq!(store.read_current("users").unwrap().version(), 1);

        let v2 = v1.to_builder().build().unwrap();
        store.write(&v2).unwrap();
        assert_eq!(store.read_current("users").unwrap().version(), 2);
        assert_eq!(store.read_version("users", 1).unwrap().version(), 1);
        assert_eq!(store.version_count("users"), 2);
    }

    #[test]
    fn test_stale_version_rejected() {
        let store = MemoryLayoutStore::new();
        let v1 = layout_v1();
        store.write(&v1).unwrap();
        assert!(matches!(
            store.write(&v1),
            Err(LayoutError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_unknown_table() {
        let store = MemoryLayoutStore::new();
        assert!(matches!(
            store.read_current("missing"),
            Err(LayoutError::NoSuchTable(_))
        ));
    }
}
