use crate::layout::ColumnNameTranslator;
use crate::store::EntityId;

use super::{DataRequest, RequestError, TimeRange};

/// Default number of physical rows fetched per scan round trip.
const DEFAULT_BATCH_SIZE: usize = 100;

/// One physical column constraint within a lookup or scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelector {
    /// Physical family identifier.
    pub family: String,
    /// Physical qualifier; `None` selects the whole physical family.
    pub qualifier: Option<String>,
    /// Physical qualifier prefix narrowing a whole-family selection when
    /// several logical families share one physical family.
    pub qualifier_prefix: Option<String>,
    /// Maximum cell versions to return per matched column.
    pub max_versions: u32,
    /// Optional `[min, max)` timestamp bound.
    pub time_range: Option<TimeRange>,
}

impl ColumnSelector {
    /// Returns true if a physical (family, qualifier) pair matches this
    /// selector, ignoring version and time constraints.
    pub fn matches(&self, family: &str, qualifier: &str) -> bool {
        if self.family != family {
            return false;
        }
        match (&self.qualifier, &self.qualifier_prefix) {
            (Some(expected), _) => expected == qualifier,
            (None, Some(prefix)) => qualifier.starts_with(prefix.as_str()),
            (None, None) => true,
        }
    }
}

/// Physical parameters for a single-row read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PointLookup {
    pub selectors: Vec<ColumnSelector>,
}

impl PointLookup {
    /// True when the lookup selects no columns at all. The reader
    /// short-circuits such lookups to an empty result instead of issuing a
    /// degenerate physical call.
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

/// Logical row filter attached to a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    /// Keep only rows whose key starts with the given bytes.
    RowKeyPrefix(Vec<u8>),
}

/// Pushdown filter compiled from a [`RowFilter`], evaluated by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    RowKeyPrefix(Vec<u8>),
}

impl FilterSpec {
    /// Returns true if a row key passes the filter.
    pub fn accepts(&self, key: &[u8]) -> bool {
        match self {
            FilterSpec::RowKeyPrefix(prefix) => key.starts_with(prefix),
        }
    }
}

/// Caller-facing options for opening a row scanner.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Inclusive start row.
    pub start_row: Option<EntityId>,
    /// Exclusive stop row.
    pub stop_row: Option<EntityId>,
    /// Rows fetched per physical round trip; 0 means the default.
    pub batch_size: usize,
    /// Optional logical row filter, compiled into a pushdown filter.
    pub row_filter: Option<RowFilter>,
    /// Transparently reopen the physical scan once after a timeout,
    /// resuming after the last delivered row.
    pub reopen_on_timeout: bool,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_start_row(mut self, start: EntityId) -> Self {
        self.start_row = Some(start);
        self
    }

    #[must_use]
    pub fn with_stop_row(mut self, stop: EntityId) -> Self {
        self.stop_row = Some(stop);
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_row_filter(mut self, filter: RowFilter) -> Self {
        self.row_filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_reopen_on_timeout(mut self, reopen: bool) -> Self {
        self.reopen_on_timeout = reopen;
        self
    }
}

/// Physical parameters for a range scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanDescriptor {
    pub selectors: Vec<ColumnSelector>,
    /// Inclusive start key.
    pub start_row: Option<Vec<u8>>,
    /// Exclusive stop key.
    pub stop_row: Option<Vec<u8>>,
    /// Rows per physical round trip.
    pub batch_size: usize,
    pub filter: Option<FilterSpec>,
}

/// Compiles validated logical requests into physical lookup and scan
/// descriptors via a layout-scoped name translator.
pub struct RequestTranslator<'a> {
    translator: &'a ColumnNameTranslator,
}

impl<'a> RequestTranslator<'a> {
    pub fn new(translator: &'a ColumnNameTranslator) -> Self {
        Self { translator }
    }

    fn selectors(&self, request: &DataRequest) -> Result<Vec<ColumnSelector>, RequestError> {
        let mut selectors = Vec::with_capacity(request.columns().len());
        for column in request.columns() {
            let selector = match &column.qualifier {
                Some(qualifier) => {
                    let physical = self.translator.to_physical(&column.family, qualifier)?;
                    ColumnSelector {
                        family: physical.family,
                        qualifier: Some(physical.qualifier),
                        qualifier_prefix: None,
                        max_versions: column.max_versions,
                        time_range: column.time_range,
                    }
                }
                None => {
                    let family = self.translator.to_physical_family(&column.family)?;
                    ColumnSelector {
                        family: family.family,
                        qualifier: None,
                        qualifier_prefix: family.qualifier_prefix,
                        max_versions: column.max_versions,
                        time_range: column.time_range,
                    }
                }
            };
            selectors.push(selector);
        }
        Ok(selectors)
    }

    /// Compiles a point-lookup descriptor for a single row.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidColumnName`] if any reference fails to
    /// translate; no physical call has been made at that point.
    pub fn to_point_lookup(&self, request: &DataRequest) -> Result<PointLookup, RequestError> {
        Ok(PointLookup {
            selectors: self.selectors(request)?,
        })
    }

    /// Compiles a scan descriptor with row bounds, batch size hint, and a
    /// pushdown filter.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidColumnName`] if any reference fails to
    /// translate.
    pub fn to_scan(
        &self,
        request: &DataRequest,
        options: &ScanOptions,
    ) -> Result<ScanDescriptor, RequestError> {
        let batch_size = if options.batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            options.batch_size
        };
        let filter = options.row_filter.as_ref().map(|f| match f {
            RowFilter::RowKeyPrefix(prefix) => FilterSpec::RowKeyPrefix(prefix.clone()),
        });
        Ok(ScanDescriptor {
            selectors: self.selectors(request)?,
            start_row: options.start_row.as_ref().map(|e| e.as_bytes().to_vec()),
            stop_row: options.stop_row.as_ref().map(|e| e.as_bytes().to_vec()),
            batch_size,
            filter,
        })
    }
}
