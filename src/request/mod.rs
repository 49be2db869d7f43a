//! Logical data requests, their validation, and translation into physical
//! store descriptors.
//!
//! A [`DataRequest`] names logical columns only; it is validated structurally
//! against a single layout version and then compiled by the
//! [`RequestTranslator`] into point-lookup or scan parameters carrying
//! physical column identifiers. Validation and translation never touch the
//! store: every request error is raised before any physical call is made.

pub(crate) mod translate;
pub(crate) mod validator;

use std::fmt;

use crate::schema::CellSchema;

pub use translate::{
    ColumnSelector, FilterSpec, PointLookup, RequestTranslator, RowFilter, ScanDescriptor,
    ScanOptions,
};
pub use validator::DataRequestValidator;

/// Errors raised while validating or translating a data request.
#[derive(Debug)]
pub enum RequestError {
    /// A logical column name does not resolve against the layout.
    InvalidColumnName(String),
    /// A column reference is structurally invalid for the layout.
    InvalidRequest {
        family: String,
        qualifier: Option<String>,
        reason: String,
    },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidColumnName(name) => {
                write!(f, "invalid column name '{name}'")
            }
            RequestError::InvalidRequest {
                family,
                qualifier,
                reason,
            } => match qualifier {
                Some(qualifier) => {
                    write!(f, "invalid request for '{family}:{qualifier}': {reason}")
                }
                None => write!(f, "invalid request for family '{family}': {reason}"),
            },
        }
    }
}

impl std::error::Error for RequestError {}

/// Half-open timestamp interval `[min, max)` constraining which cell versions
/// a column request matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Inclusive lower bound.
    pub min: u64,
    /// Exclusive upper bound.
    pub max: u64,
}

impl TimeRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, timestamp: u64) -> bool {
        timestamp >= self.min && timestamp < self.max
    }
}

/// One column reference within a [`DataRequest`].
///
/// With no qualifier the request covers the whole family. Requests are
/// immutable once built; the chaining setters consume and return the value.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRequest {
    pub family: String,
    pub qualifier: Option<String>,
    pub max_versions: u32,
    pub time_range: Option<TimeRange>,
    /// Declared value-type expectation, checked against the column's
    /// configured schema during validation.
    pub expected_schema: Option<CellSchema>,
}

impl ColumnRequest {
    /// A whole-family request with a version cap of one.
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: None,
            max_versions: 1,
            time_range: None,
            expected_schema: None,
        }
    }

    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    #[must_use]
    pub fn with_max_versions(mut self, max_versions: u32) -> Self {
        self.max_versions = max_versions;
        self
    }

    #[must_use]
    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = Some(time_range);
        self
    }

    #[must_use]
    pub fn with_expected_schema(mut self, schema: CellSchema) -> Self {
        self.expected_schema = Some(schema);
        self
    }
}

/// An immutable logical read request: an ordered set of column references.
///
/// Consumed, never mutated, during validation and translation. An empty
/// request is legal and reads nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataRequest {
    columns: Vec<ColumnRequest>,
}

impl DataRequest {
    pub fn builder() -> DataRequestBuilder {
        DataRequestBuilder {
            columns: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[ColumnRequest] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Builder for [`DataRequest`].
pub struct DataRequestBuilder {
    columns: Vec<ColumnRequest>,
}

impl DataRequestBuilder {
    /// Adds a fully configured column reference.
    #[must_use]
    pub fn add(mut self, column: ColumnRequest) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a single-version request for one qualified column.
    #[must_use]
    pub fn column(self, family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        self.add(ColumnRequest::new(family).with_qualifier(qualifier))
    }

    /// Adds a single-version request for a whole family.
    #[must_use]
    pub fn family(self, family: impl Into<String>) -> Self {
        self.add(ColumnRequest::new(family))
    }

    pub fn build(self) -> DataRequest {
        DataRequest {
            columns: self.columns,
        }
    }
}
