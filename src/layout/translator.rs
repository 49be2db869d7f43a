use std::fmt;
use std::sync::Arc;

use crate::request::RequestError;

use super::table_layout::{FamilyKind, NamingPolicy, TableLayout};

/// The underlying store's representation of a logical (family, qualifier)
/// pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicalColumn {
    /// Physical family identifier.
    pub family: String,
    /// Physical qualifier identifier.
    pub qualifier: String,
}

impl PhysicalColumn {
    pub fn new(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
        }
    }
}

impl fmt::Display for PhysicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.qualifier)
    }
}

/// Physical selector for a whole-family read.
///
/// Under the compact naming policy several logical families share one
/// physical family (the locality group), so a family-wide selector carries a
/// qualifier prefix narrowing the match to one logical family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilySelector {
    /// Physical family identifier.
    pub family: String,
    /// Physical qualifier prefix, when the physical family is shared.
    pub qualifier_prefix: Option<String>,
}

/// Pure, layout-scoped bidirectional mapping between logical column names and
/// physical store identifiers.
///
/// Deterministic for a fixed layout version. Names absent from the layout,
/// including names resolving only to a tombstoned definition, are rejected
/// with [`RequestError::InvalidColumnName`] in both directions.
pub struct ColumnNameTranslator {
    layout: Arc<TableLayout>,
}

impl ColumnNameTranslator {
    pub fn new(layout: Arc<TableLayout>) -> Self {
        Self { layout }
    }

    /// Translates a logical (family, qualifier) pair to its physical column.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidColumnName`] if the pair does not
    /// resolve to a live definition.
    pub fn to_physical(
        &self,
        family: &str,
        qualifier: &str,
    ) -> Result<PhysicalColumn, RequestError> {
        let (group, family_def) = self
            .layout
            .family(family)
            .ok_or_else(|| RequestError::InvalidColumnName(format!("{family}:{qualifier}")))?;

        match self.layout.naming_policy() {
            NamingPolicy::Verbatim => match &family_def.kind {
                FamilyKind::Group { .. } => {
                    if family_def.column(qualifier).is_none() {
                        return Err(RequestError::InvalidColumnName(format!(
                            "{family}:{qualifier}"
                        )));
                    }
                    Ok(PhysicalColumn::new(family, qualifier))
                }
                FamilyKind::Map { .. } => Ok(PhysicalColumn::new(family, qualifier)),
            },
            NamingPolicy::Compact => {
                let physical_family = group.id.to_string();
                match &family_def.kind {
                    FamilyKind::Group { .. } => {
                        let column = family_def.column(qualifier).ok_or_else(|| {
                            RequestError::InvalidColumnName(format!("{family}:{qualifier}"))
                        })?;
                        Ok(PhysicalColumn::new(
                            physical_family,
                            format!("{}:{}", family_def.id, column.id),
                        ))
                    }
                    FamilyKind::Map { .. } => Ok(PhysicalColumn::new(
                        physical_family,
                        format!("{}:{}", family_def.id, qualifier),
                    )),
                }
            }
        }
    }

    /// Translates a logical family name to a physical whole-family selector.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidColumnName`] if no live family matches.
    pub fn to_physical_family(&self, family: &str) -> Result<FamilySelector, RequestError> {
        let (group, family_def) = self
            .layout
            .family(family)
            .ok_or_else(|| RequestError::InvalidColumnName(family.to_string()))?;

        match self.layout.naming_policy() {
            NamingPolicy::Verbatim => Ok(FamilySelector {
                family: family.to_string(),
                qualifier_prefix: None,
            }),
            NamingPolicy::Compact => Ok(FamilySelector {
                family: group.id.to_string(),
                qualifier_prefix: Some(format!("{}:", family_def.id)),
            }),
        }
    }

    /// Translates a physical column back to its logical (family, qualifier)
    /// pair.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidColumnName`] if the physical column
    /// does not belong to any live definition of this layout version.
    pub fn to_logical(&self, physical: &PhysicalColumn) -> Result<(String, String), RequestError> {
        let invalid = || RequestError::InvalidColumnName(physical.to_string());

        match self.layout.naming_policy() {
            NamingPolicy::Verbatim => {
                let (_, family_def) =
                    self.layout.family(&physical.family).ok_or_else(invalid)?;
                match &family_def.kind {
                    FamilyKind::Group { .. } => {
                        if family_def.column(&physical.qualifier).is_none() {
                            return Err(invalid());
                        }
                    }
                    FamilyKind::Map { .. } => {}
                }
                Ok((physical.family.clone(), physical.qualifier.clone()))
            }
            NamingPolicy::Compact => {
                let group_id: u32 = physical.family.parse().map_err(|_| invalid())?;
                let group = self
                    .layout
                    .locality_group_by_id(group_id)
                    .ok_or_else(invalid)?;

                let (family_part, rest) =
                    physical.qualifier.split_once(':').ok_or_else(invalid)?;
                let family_id: u32 = family_part.parse().map_err(|_| invalid())?;
                let family_def = group.family_by_id(family_id).ok_or_else(invalid)?;

                match &family_def.kind {
                    FamilyKind::Group { .. } => {
                        let column_id: u32 = rest.parse().map_err(|_| invalid())?;
                        let column = family_def.column_by_id(column_id).ok_or_else(invalid)?;
                        Ok((family_def.name.clone(), column.name.clone()))
                    }
                    FamilyKind::Map { .. } => {
                        Ok((family_def.name.clone(), rest.to_string()))
                    }
                }
            }
        }
    }
}
