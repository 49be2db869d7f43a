use crate::schema::CellSchema;

use super::builder::LayoutBuilder;
use super::table_layout::{FamilyKind, LayoutError, LocalityGroupAttribute, TableLayout};

/// One logical schema-change operation.
///
/// Mutations follow a two-phase lifecycle: [`LayoutMutation::validate`]
/// checks preconditions against the *current* layout, then
/// [`LayoutMutation::apply`] edits a builder seeded from it. Several
/// mutations may be applied to the same builder; the merged candidate must
/// still pass the global structural validation in
/// [`LayoutBuilder::build`] before it can replace the current layout, so a
/// batch commits all-or-nothing.
///
/// Drops set a tombstone flag rather than removing the definition, keeping
/// cells written under older layout versions resolvable and preventing reuse
/// of a still-live physical encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutMutation {
    /// Adds a group-type family to a locality group. With `map_schema` set,
    /// adds a map-type family sharing that value schema instead.
    AddFamily {
        locality_group: String,
        name: String,
        max_versions: u32,
        map_schema: Option<CellSchema>,
    },
    /// Tombstones a live family.
    DropFamily { name: String },
    /// Adds a column to a live group-type family.
    AddColumn {
        family: String,
        qualifier: String,
        schema: CellSchema,
        max_versions: u32,
    },
    /// Tombstones a live column of a group-type family.
    DropColumn { family: String, qualifier: String },
    /// Updates a storage attribute of a locality group.
    SetLocalityGroupAttribute {
        locality_group: String,
        attribute: LocalityGroupAttribute,
    },
}

impl LayoutMutation {
    /// Checks this mutation's preconditions against the current layout.
    ///
    /// A tombstoned definition counts as absent: dropping it again fails
    /// with a no-such error, and re-adding its name is allowed.
    ///
    /// # Errors
    ///
    /// Returns the precondition violation: [`LayoutError::NoSuchFamily`],
    /// [`LayoutError::NoSuchColumn`], [`LayoutError::NoSuchLocalityGroup`],
    /// [`LayoutError::DuplicateDefinition`], or
    /// [`LayoutError::InvalidLayout`] for kind mismatches.
    pub fn validate(&self, layout: &TableLayout) -> Result<(), LayoutError> {
        match self {
            LayoutMutation::AddFamily {
                locality_group,
                name,
                ..
            } => {
                if layout.locality_group(locality_group).is_none() {
                    return Err(LayoutError::NoSuchLocalityGroup(locality_group.clone()));
                }
                if layout.family(name).is_some() {
                    return Err(LayoutError::DuplicateDefinition(name.clone()));
                }
                Ok(())
            }
            LayoutMutation::DropFamily { name } => match layout.family(name) {
                Some(_) => Ok(()),
                None => Err(LayoutError::NoSuchFamily(name.clone())),
            },
            LayoutMutation::AddColumn {
                family, qualifier, ..
            } => {
                let (_, family_def) = layout
                    .family(family)
                    .ok_or_else(|| LayoutError::NoSuchFamily(family.clone()))?;
                match &family_def.kind {
                    FamilyKind::Map { .. } => Err(LayoutError::InvalidLayout(format!(
                        "map-type family '{family}' does not take explicit columns"
                    ))),
                    FamilyKind::Group { .. } => {
                        if family_def.column(qualifier).is_some() {
                            return Err(LayoutError::DuplicateDefinition(format!(
                                "{family}:{qualifier}"
                            )));
                        }
                        Ok(())
                    }
                }
            }
            LayoutMutation::DropColumn { family, qualifier } => {
                let (_, family_def) = layout
                    .family(family)
                    .ok_or_else(|| LayoutError::NoSuchFamily(family.clone()))?;
                match &family_def.kind {
                    FamilyKind::Map { .. } => Err(LayoutError::InvalidLayout(format!(
                        "map-type family '{family}' has no explicit columns"
                    ))),
                    FamilyKind::Group { .. } => match family_def.column(qualifier) {
                        Some(_) => Ok(()),
                        None => Err(LayoutError::NoSuchColumn(
                            family.clone(),
                            qualifier.clone(),
                        )),
                    },
                }
            }
            LayoutMutation::SetLocalityGroupAttribute { locality_group, .. } => {
                if layout.locality_group(locality_group).is_none() {
                    return Err(LayoutError::NoSuchLocalityGroup(locality_group.clone()));
                }
                Ok(())
            }
        }
    }

    /// Applies this mutation to a builder seeded from the validated layout.
    ///
    /// # Errors
    ///
    /// Propagates builder errors; with [`LayoutMutation::validate`] already
    /// passed, these only arise from conflicts with earlier mutations in the
    /// same batch.
    pub fn apply(&self, builder: &mut LayoutBuilder) -> Result<(), LayoutError> {
        match self {
            LayoutMutation::AddFamily {
                locality_group,
                name,
                max_versions,
                map_schema,
            } => match map_schema {
                Some(schema) => {
                    builder.add_map_family(locality_group, name.clone(), *schema, *max_versions)
                }
                None => builder.add_group_family(locality_group, name.clone(), *max_versions),
            },
            LayoutMutation::DropFamily { name } => builder.tombstone_family(name),
            LayoutMutation::AddColumn {
                family,
                qualifier,
                schema,
                max_versions,
            } => builder.add_column(family, qualifier.clone(), *schema, *max_versions),
            LayoutMutation::DropColumn { family, qualifier } => {
                builder.tombstone_column(family, qualifier)
            }
            LayoutMutation::SetLocalityGroupAttribute {
                locality_group,
                attribute,
            } => builder.set_locality_group_attribute(locality_group, *attribute),
        }
    }

    /// Validates and applies a batch of mutations against a layout,
    /// producing the candidate successor version.
    ///
    /// Each mutation is validated against `layout` (not against the partially
    /// edited builder); the merged result must then pass the global
    /// structural validation. On any failure no candidate is produced.
    ///
    /// # Errors
    ///
    /// Returns the first precondition or structural violation.
    pub fn apply_all(
        mutations: &[LayoutMutation],
        layout: &TableLayout,
    ) -> Result<TableLayout, LayoutError> {
        for mutation in mutations {
            mutation.validate(layout)?;
        }
        let mut builder = layout.to_builder();
        for mutation in mutations {
            mutation.apply(&mut builder)?;
        }
        builder.build()
    }
}
