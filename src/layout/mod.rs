//! Versioned table layouts and the schema-mutation engine.
//!
//! A [`TableLayout`] is an immutable snapshot of a table's logical schema:
//! locality groups, column families, qualified columns, per-column cell
//! schemas and retention. Layouts are never edited in place. A new version is
//! produced by seeding a [`LayoutBuilder`] from the current layout, applying
//! one or more [`LayoutMutation`] commands, and rebuilding, which re-runs the
//! global structural validation before anything is committed.
//!
//! Dropped definitions are tombstoned rather than removed so that cells
//! written under an older layout version remain resolvable, and so that a
//! retired physical encoding is never reused by a later definition of the
//! same name.

pub(crate) mod builder;
pub(crate) mod mutation;
pub(crate) mod persistence;
pub(crate) mod table_layout;
pub(crate) mod translator;

pub use builder::LayoutBuilder;
pub use mutation::LayoutMutation;
pub use persistence::{LayoutStore, MemoryLayoutStore};
pub use table_layout::{
    ColumnDefinition, ColumnId, FamilyDefinition, FamilyKind, LayoutError, LocalityGroup,
    LocalityGroupAttribute, LocalityGroupId, NamingPolicy, TableLayout,
};
pub use translator::{ColumnNameTranslator, FamilySelector, PhysicalColumn};
