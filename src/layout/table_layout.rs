use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::CellSchema;

use super::builder::LayoutBuilder;

/// Stable physical identifier assigned to a family or column definition.
///
/// Identifiers are allocated by the layout builder and are never reused, even
/// after the definition they belong to has been tombstoned.
pub type ColumnId = u32;

/// Stable physical identifier assigned to a locality group.
pub type LocalityGroupId = u32;

/// Errors raised while building, validating, or mutating a table layout.
#[derive(Debug)]
pub enum LayoutError {
    /// No live column family with this name exists in the layout.
    NoSuchFamily(String),
    /// No live column with this (family, qualifier) pair exists.
    NoSuchColumn(String, String),
    /// No locality group with this name exists.
    NoSuchLocalityGroup(String),
    /// A live definition with this name already exists.
    DuplicateDefinition(String),
    /// No layout has been stored for this table.
    NoSuchTable(String),
    /// The layout failed global structural validation.
    InvalidLayout(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::NoSuchFamily(name) => {
                write!(f, "no such column family '{name}'")
            }
            LayoutError::NoSuchColumn(family, qualifier) => {
                write!(f, "no such column '{family}:{qualifier}'")
            }
            LayoutError::NoSuchLocalityGroup(name) => {
                write!(f, "no such locality group '{name}'")
            }
            LayoutError::DuplicateDefinition(name) => {
                write!(f, "definition '{name}' already exists")
            }
            LayoutError::NoSuchTable(name) => {
                write!(f, "no layout stored for table '{name}'")
            }
            LayoutError::InvalidLayout(reason) => {
                write!(f, "invalid layout: {reason}")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

/// Naming policy declared by a layout, controlling how logical column names
/// map to physical store identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamingPolicy {
    /// Physical names are the logical names, verbatim.
    Verbatim,
    /// Physical names are derived from the numeric identifiers assigned by
    /// the layout builder, keeping stored keys short and rename-stable.
    Compact,
}

/// An alterable storage attribute of a locality group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalityGroupAttribute {
    /// Whether the group's data should be pinned in memory by the store.
    InMemory(bool),
    /// Target block size in bytes for the group's storage files.
    BlockSize(u32),
}

/// A qualified column definition within a group-type family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Logical qualifier of this column.
    pub name: String,
    /// Stable physical identifier; never reused.
    pub id: ColumnId,
    /// Serialization schema for cells written to this column.
    pub schema: CellSchema,
    /// Maximum number of cell versions retained.
    pub max_versions: u32,
    /// Tombstone flag. A deleted column stays in the layout so cells written
    /// under earlier versions remain resolvable.
    pub deleted: bool,
}

/// The shape of a column family: explicit qualifiers or free-form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FamilyKind {
    /// Group-type family with an explicit, schema'd set of qualifiers.
    Group {
        /// Column definitions, including tombstoned ones.
        columns: Vec<ColumnDefinition>,
    },
    /// Map-type family accepting free-form qualifiers, all sharing one
    /// value schema.
    Map {
        /// Value schema shared by every cell in the family.
        schema: CellSchema,
    },
}

/// A named column family within a locality group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyDefinition {
    /// Logical family name.
    pub name: String,
    /// Stable physical identifier; never reused.
    pub id: ColumnId,
    /// Family-wide version retention cap. Group-type columns may declare a
    /// tighter per-column cap.
    pub max_versions: u32,
    /// Group-type or map-type contents.
    pub kind: FamilyKind,
    /// Tombstone flag; see [`ColumnDefinition::deleted`].
    pub deleted: bool,
}

impl FamilyDefinition {
    /// Returns true if this family accepts free-form qualifiers.
    pub fn is_map(&self) -> bool {
        matches!(self.kind, FamilyKind::Map { .. })
    }

    /// Looks up a live column by qualifier. Always `None` for map-type
    /// families, which have no explicit columns.
    pub fn column(&self, qualifier: &str) -> Option<&ColumnDefinition> {
        match &self.kind {
            FamilyKind::Group { columns } => columns
                .iter()
                .find(|c| !c.deleted && c.name == qualifier),
            FamilyKind::Map { .. } => None,
        }
    }

    /// Looks up a live column by physical id.
    pub(crate) fn column_by_id(&self, id: ColumnId) -> Option<&ColumnDefinition> {
        match &self.kind {
            FamilyKind::Group { columns } => {
                columns.iter().find(|c| !c.deleted && c.id == id)
            }
            FamilyKind::Map { .. } => None,
        }
    }

    /// Returns the cell schema configured for the given qualifier, if the
    /// qualifier resolves against this family.
    pub fn schema_for(&self, qualifier: &str) -> Option<&CellSchema> {
        match &self.kind {
            FamilyKind::Group { .. } => self.column(qualifier).map(|c| &c.schema),
            FamilyKind::Map { schema } => Some(schema),
        }
    }

    /// Returns the version retention cap for the given qualifier.
    pub fn retention_for(&self, qualifier: &str) -> Option<u32> {
        match &self.kind {
            FamilyKind::Group { .. } => self.column(qualifier).map(|c| c.max_versions),
            FamilyKind::Map { .. } => Some(self.max_versions),
        }
    }
}

/// A physical storage grouping of one or more families sharing storage
/// attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalityGroup {
    /// Name of the locality group.
    pub name: String,
    /// Stable physical identifier; never reused.
    pub id: LocalityGroupId,
    /// Whether the group's data is pinned in memory by the store.
    pub in_memory: bool,
    /// Target block size in bytes for the group's storage files.
    pub block_size: u32,
    /// Families stored in this group, including tombstoned ones.
    pub families: Vec<FamilyDefinition>,
}

impl LocalityGroup {
    /// Looks up a live family by name.
    pub fn family(&self, name: &str) -> Option<&FamilyDefinition> {
        self.families.iter().find(|f| !f.deleted && f.name == name)
    }

    /// Looks up a live family by physical id.
    pub(crate) fn family_by_id(&self, id: ColumnId) -> Option<&FamilyDefinition> {
        self.families.iter().find(|f| !f.deleted && f.id == id)
    }
}

/// An immutable, versioned snapshot of a table's logical schema.
///
/// Layouts are produced either by [`TableLayout::builder`] (version 1) or by
/// applying [`super::LayoutMutation`]s to a builder seeded from an existing
/// layout via [`TableLayout::to_builder`]. Every construction path runs the
/// global structural validation in [`TableLayout::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableLayout {
    pub(crate) name: String,
    pub(crate) version: u64,
    pub(crate) naming: NamingPolicy,
    pub(crate) locality_groups: Vec<LocalityGroup>,
    pub(crate) next_column_id: ColumnId,
    pub(crate) next_group_id: LocalityGroupId,
}

impl TableLayout {
    /// Returns a builder for the first layout version of a new table.
    pub fn builder(name: impl Into<String>, naming: NamingPolicy) -> LayoutBuilder {
        LayoutBuilder::new_table(name.into(), naming)
    }

    /// Returns a builder seeded from this layout. Building it produces the
    /// next layout version.
    pub fn to_builder(&self) -> LayoutBuilder {
        LayoutBuilder::from_layout(self)
    }

    /// Name of the table this layout describes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version id of this layout snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Naming policy used to derive physical column identifiers.
    pub fn naming_policy(&self) -> NamingPolicy {
        self.naming
    }

    /// All locality groups, in declaration order.
    pub fn locality_groups(&self) -> &[LocalityGroup] {
        &self.locality_groups
    }

    /// Looks up a locality group by name.
    pub fn locality_group(&self, name: &str) -> Option<&LocalityGroup> {
        self.locality_groups.iter().find(|g| g.name == name)
    }

    /// Looks up a locality group by physical id.
    pub(crate) fn locality_group_by_id(&self, id: LocalityGroupId) -> Option<&LocalityGroup> {
        self.locality_groups.iter().find(|g| g.id == id)
    }

    /// Looks up a live family by name, together with its locality group.
    pub fn family(&self, name: &str) -> Option<(&LocalityGroup, &FamilyDefinition)> {
        self.locality_groups
            .iter()
            .find_map(|g| g.family(name).map(|f| (g, f)))
    }

    /// Looks up a live column by (family, qualifier). Always `None` for
    /// map-type families.
    pub fn column(&self, family: &str, qualifier: &str) -> Option<&ColumnDefinition> {
        self.family(family).and_then(|(_, f)| f.column(qualifier))
    }

    /// Iterates over all live families.
    pub fn live_families(&self) -> impl Iterator<Item = &FamilyDefinition> {
        self.locality_groups
            .iter()
            .flat_map(|g| g.families.iter())
            .filter(|f| !f.deleted)
    }

    /// Runs the global structural validation pass.
    ///
    /// Checks live-name uniqueness across the whole layout, identifier
    /// uniqueness including tombstoned definitions, retention sanity, and
    /// id-counter consistency. Every layout handed out by a builder has
    /// already passed this check.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidLayout`] describing the first violated
    /// constraint.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.version == 0 {
            return Err(LayoutError::InvalidLayout(
                "layout version must be positive".to_string(),
            ));
        }

        let mut group_names = std::collections::HashSet::new();
        let mut group_ids = std::collections::HashSet::new();
        let mut family_names = std::collections::HashSet::new();
        let mut ids = std::collections::HashSet::new();

        for group in &self.locality_groups {
            if !group_names.insert(group.name.as_str()) {
                return Err(LayoutError::InvalidLayout(format!(
                    "duplicate locality group '{}'",
                    group.name
                )));
            }
            if !group_ids.insert(group.id) || group.id >= self.next_group_id {
                return Err(LayoutError::InvalidLayout(format!(
                    "locality group '{}' has inconsistent id {}",
                    group.name, group.id
                )));
            }

            for family in &group.families {
                if !ids.insert(family.id) || family.id >= self.next_column_id {
                    return Err(LayoutError::InvalidLayout(format!(
                        "family '{}' has inconsistent id {}",
                        family.name, family.id
                    )));
                }
                if !family.deleted {
                    if !family_names.insert(family.name.as_str()) {
                        return Err(LayoutError::InvalidLayout(format!(
                            "duplicate family '{}'",
                            family.name
                        )));
                    }
                    if family.max_versions == 0 {
                        return Err(LayoutError::InvalidLayout(format!(
                            "family '{}' retains zero versions",
                            family.name
                        )));
                    }
                }

                if let FamilyKind::Group { columns } = &family.kind {
                    let mut column_names = std::collections::HashSet::new();
                    for column in columns {
                        if !ids.insert(column.id) || column.id >= self.next_column_id {
                            return Err(LayoutError::InvalidLayout(format!(
                                "column '{}:{}' has inconsistent id {}",
                                family.name, column.name, column.id
                            )));
                        }
                        if !column.deleted {
                            if !column_names.insert(column.name.as_str()) {
                                return Err(LayoutError::InvalidLayout(format!(
                                    "duplicate column '{}:{}'",
                                    family.name, column.name
                                )));
                            }
                            if column.max_versions == 0 {
                                return Err(LayoutError::InvalidLayout(format!(
                                    "column '{}:{}' retains zero versions",
                                    family.name, column.name
                                )));
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
