use crate::schema::CellSchema;

use super::table_layout::{
    ColumnDefinition, ColumnId, FamilyDefinition, FamilyKind, LayoutError, LocalityGroup,
    LocalityGroupAttribute, LocalityGroupId, NamingPolicy, TableLayout,
};

/// Default target block size for a new locality group (64 KB).
const DEFAULT_BLOCK_SIZE: u32 = 64 * 1024;

/// Mutable builder producing the next version of a table layout.
///
/// A builder is seeded either empty (new table, builds version 1) or from an
/// existing layout (builds the successor version). Edits accumulate on the
/// builder; nothing is visible to readers until [`LayoutBuilder::build`]
/// succeeds, and `build` re-runs the global structural validation so a
/// builder can never hand out an inconsistent layout.
pub struct LayoutBuilder {
    name: String,
    naming: NamingPolicy,
    base_version: u64,
    locality_groups: Vec<LocalityGroup>,
    next_column_id: ColumnId,
    next_group_id: LocalityGroupId,
}

impl LayoutBuilder {
    pub(crate) fn new_table(name: String, naming: NamingPolicy) -> Self {
        Self {
            name,
            naming,
            base_version: 0,
            locality_groups: Vec::new(),
            next_column_id: 0,
            next_group_id: 0,
        }
    }

    pub(crate) fn from_layout(layout: &TableLayout) -> Self {
        Self {
            name: layout.name.clone(),
            naming: layout.naming,
            base_version: layout.version,
            locality_groups: layout.locality_groups.clone(),
            next_column_id: layout.next_column_id,
            next_group_id: layout.next_group_id,
        }
    }

    fn alloc_column_id(&mut self) -> ColumnId {
        let id = self.next_column_id;
        self.next_column_id += 1;
        id
    }

    fn alloc_group_id(&mut self) -> LocalityGroupId {
        let id = self.next_group_id;
        self.next_group_id += 1;
        id
    }

    fn group_mut(&mut self, name: &str) -> Result<&mut LocalityGroup, LayoutError> {
        self.locality_groups
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| LayoutError::NoSuchLocalityGroup(name.to_string()))
    }

    fn live_family_mut(&mut self, name: &str) -> Result<&mut FamilyDefinition, LayoutError> {
        self.locality_groups
            .iter_mut()
            .flat_map(|g| g.families.iter_mut())
            .find(|f| !f.deleted && f.name == name)
            .ok_or_else(|| LayoutError::NoSuchFamily(name.to_string()))
    }

    fn live_family(&self, name: &str) -> Option<&FamilyDefinition> {
        self.locality_groups
            .iter()
            .flat_map(|g| g.families.iter())
            .find(|f| !f.deleted && f.name == name)
    }

    fn live_family_exists(&self, name: &str) -> bool {
        self.live_family(name).is_some()
    }

    fn group_exists(&self, name: &str) -> bool {
        self.locality_groups.iter().any(|g| g.name == name)
    }

    /// Adds a locality group with default storage attributes.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::DuplicateDefinition`] if a group with this name
    /// already exists.
    pub fn add_locality_group(&mut self, name: impl Into<String>) -> Result<(), LayoutError> {
        let name = name.into();
        if self.locality_groups.iter().any(|g| g.name == name) {
            return Err(LayoutError::DuplicateDefinition(name));
        }
        let id = self.alloc_group_id();
        self.locality_groups.push(LocalityGroup {
            name,
            id,
            in_memory: false,
            block_size: DEFAULT_BLOCK_SIZE,
            families: Vec::new(),
        });
        Ok(())
    }

    /// Adds a group-type family (explicit qualifiers) to a locality group.
    ///
    /// The family name must not collide with any live family anywhere in the
    /// layout. A tombstoned family of the same name does not block the add;
    /// the new definition receives a fresh physical id.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NoSuchLocalityGroup`] or
    /// [`LayoutError::DuplicateDefinition`].
    pub fn add_group_family(
        &mut self,
        locality_group: &str,
        name: impl Into<String>,
        max_versions: u32,
    ) -> Result<(), LayoutError> {
        let name = name.into();
        if self.live_family_exists(&name) {
            return Err(LayoutError::DuplicateDefinition(name));
        }
        if !self.group_exists(locality_group) {
            return Err(LayoutError::NoSuchLocalityGroup(locality_group.to_string()));
        }
        // All preconditions hold, so the id taken here is always used.
        let id = self.alloc_column_id();
        let group = self.group_mut(locality_group)?;
        group.families.push(FamilyDefinition {
            name,
            id,
            max_versions,
            kind: FamilyKind::Group {
                columns: Vec::new(),
            },
            deleted: false,
        });
        Ok(())
    }

    /// Adds a map-type family (free-form qualifiers, one shared value schema).
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NoSuchLocalityGroup`] or
    /// [`LayoutError::DuplicateDefinition`].
    pub fn add_map_family(
        &mut self,
        locality_group: &str,
        name: impl Into<String>,
        schema: CellSchema,
        max_versions: u32,
    ) -> Result<(), LayoutError> {
        let name = name.into();
        if self.live_family_exists(&name) {
            return Err(LayoutError::DuplicateDefinition(name));
        }
        if !self.group_exists(locality_group) {
            return Err(LayoutError::NoSuchLocalityGroup(locality_group.to_string()));
        }
        let id = self.alloc_column_id();
        let group = self.group_mut(locality_group)?;
        group.families.push(FamilyDefinition {
            name,
            id,
            max_versions,
            kind: FamilyKind::Map { schema },
            deleted: false,
        });
        Ok(())
    }

    /// Adds a column to a live group-type family.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NoSuchFamily`] if the family does not exist or
    /// is tombstoned, [`LayoutError::InvalidLayout`] if it is map-type, or
    /// [`LayoutError::DuplicateDefinition`] if a live column with this
    /// qualifier already exists.
    pub fn add_column(
        &mut self,
        family: &str,
        qualifier: impl Into<String>,
        schema: CellSchema,
        max_versions: u32,
    ) -> Result<(), LayoutError> {
        let qualifier = qualifier.into();
        // Check every precondition before taking an id so a rejected add
        // never burns one.
        match &self
            .live_family(family)
            .ok_or_else(|| LayoutError::NoSuchFamily(family.to_string()))?
            .kind
        {
            FamilyKind::Group { columns } => {
                if columns.iter().any(|c| !c.deleted && c.name == qualifier) {
                    return Err(LayoutError::DuplicateDefinition(format!(
                        "{family}:{qualifier}"
                    )));
                }
            }
            FamilyKind::Map { .. } => {
                return Err(LayoutError::InvalidLayout(format!(
                    "map-type family '{family}' does not take explicit columns"
                )));
            }
        }

        let id = self.alloc_column_id();
        let family_def = self.live_family_mut(family)?;
        if let FamilyKind::Group { columns } = &mut family_def.kind {
            columns.push(ColumnDefinition {
                name: qualifier,
                id,
                schema,
                max_versions,
                deleted: false,
            });
        }
        Ok(())
    }

    /// Sets the tombstone flag on a live family.
    ///
    /// The definition stays in the layout so cells written under earlier
    /// versions remain resolvable; its physical id is never reused.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NoSuchFamily`] if no live family matches.
    /// An already-tombstoned family counts as absent.
    pub fn tombstone_family(&mut self, name: &str) -> Result<(), LayoutError> {
        let family = self.live_family_mut(name)?;
        family.deleted = true;
        Ok(())
    }

    /// Sets the tombstone flag on a live column of a group-type family.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NoSuchFamily`], [`LayoutError::InvalidLayout`]
    /// for a map-type family, or [`LayoutError::NoSuchColumn`].
    pub fn tombstone_column(&mut self, family: &str, qualifier: &str) -> Result<(), LayoutError> {
        let family_def = self.live_family_mut(family)?;
        match &mut family_def.kind {
            FamilyKind::Group { columns } => {
                let column = columns
                    .iter_mut()
                    .find(|c| !c.deleted && c.name == qualifier)
                    .ok_or_else(|| {
                        LayoutError::NoSuchColumn(family.to_string(), qualifier.to_string())
                    })?;
                column.deleted = true;
                Ok(())
            }
            FamilyKind::Map { .. } => Err(LayoutError::InvalidLayout(format!(
                "map-type family '{family}' has no explicit columns"
            ))),
        }
    }

    /// Updates a storage attribute of a locality group.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NoSuchLocalityGroup`].
    pub fn set_locality_group_attribute(
        &mut self,
        locality_group: &str,
        attribute: LocalityGroupAttribute,
    ) -> Result<(), LayoutError> {
        let group = self.group_mut(locality_group)?;
        match attribute {
            LocalityGroupAttribute::InMemory(value) => group.in_memory = value,
            LocalityGroupAttribute::BlockSize(value) => group.block_size = value,
        }
        Ok(())
    }

    /// Finalizes the builder into the next layout version.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidLayout`] if the merged result fails the
    /// global structural validation. Nothing is committed on failure.
    pub fn build(self) -> Result<TableLayout, LayoutError> {
        let layout = TableLayout {
            name: self.name,
            version: self.base_version + 1,
            naming: self.naming,
            locality_groups: self.locality_groups,
            next_column_id: self.next_column_id,
            next_group_id: self.next_group_id,
        };
        layout.validate()?;
        Ok(layout)
    }
}
