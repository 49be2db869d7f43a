use crate::layout::{FamilyKind, TableLayout};

use super::{ColumnRequest, DataRequest, RequestError};

/// Structural validator for data requests against one layout version.
///
/// Validation never touches the store. Failures carry the offending family
/// and qualifier so the caller can localize the error.
pub struct DataRequestValidator<'a> {
    layout: &'a TableLayout,
}

impl<'a> DataRequestValidator<'a> {
    pub fn for_layout(layout: &'a TableLayout) -> Self {
        Self { layout }
    }

    /// Checks every column reference of the request against the layout.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidRequest`] for the first offending
    /// column.
    pub fn validate(&self, request: &DataRequest) -> Result<(), RequestError> {
        for column in request.columns() {
            self.validate_column(column)?;
        }
        Ok(())
    }

    fn validate_column(&self, column: &ColumnRequest) -> Result<(), RequestError> {
        let invalid = |reason: String| RequestError::InvalidRequest {
            family: column.family.clone(),
            qualifier: column.qualifier.clone(),
            reason,
        };

        if column.max_versions == 0 {
            return Err(invalid("requested zero versions".to_string()));
        }
        if let Some(range) = &column.time_range {
            if range.min >= range.max {
                return Err(invalid(format!(
                    "empty time range [{}, {})",
                    range.min, range.max
                )));
            }
        }

        let (_, family_def) = self
            .layout
            .family(&column.family)
            .ok_or_else(|| invalid("no such family".to_string()))?;

        let (configured_schema, retention) = match &column.qualifier {
            Some(qualifier) => match &family_def.kind {
                FamilyKind::Group { .. } => {
                    let def = family_def
                        .column(qualifier)
                        .ok_or_else(|| invalid("no such column".to_string()))?;
                    (def.schema, def.max_versions)
                }
                // Map-type families accept any qualifier.
                FamilyKind::Map { schema } => (*schema, family_def.max_versions),
            },
            None => match &family_def.kind {
                FamilyKind::Map { schema } => (*schema, family_def.max_versions),
                // A whole-family read over explicit columns has no single
                // schema; only the family-wide retention cap applies.
                FamilyKind::Group { .. } => {
                    if column.max_versions > family_def.max_versions {
                        return Err(invalid(format!(
                            "requests {} versions but family retains at most {}",
                            column.max_versions, family_def.max_versions
                        )));
                    }
                    if let Some(expected) = column.expected_schema {
                        return Err(invalid(format!(
                            "family-wide read cannot expect schema '{expected}'"
                        )));
                    }
                    return Ok(());
                }
            },
        };

        if column.max_versions > retention {
            return Err(invalid(format!(
                "requests {} versions but column retains at most {}",
                column.max_versions, retention
            )));
        }
        if let Some(expected) = column.expected_schema {
            if expected != configured_schema {
                return Err(invalid(format!(
                    "expects schema '{expected}' but column is configured as '{configured_schema}'"
                )));
            }
        }
        Ok(())
    }
}
