use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::layout::{LayoutMutation, LayoutStore, TableLayout};
use crate::schema::SchemaRegistry;
use crate::store::StoreClient;

use super::capsule::LayoutCapsule;
use super::reader::TableReader;
use super::TableError;

/// Shared state behind every clone of a [`TableHandle`].
struct TableInner {
    name: String,
    store: Arc<dyn StoreClient>,
    layout_store: Arc<dyn LayoutStore>,
    registry: Arc<dyn SchemaRegistry>,
    capsule: ArcSwap<LayoutCapsule>,
    /// Number of live dependents, the opening handle included.
    refs: AtomicUsize,
    /// Serializes layout commits. Never held across store I/O on the read
    /// path.
    commit_lock: Mutex<()>,
}

/// Reference-counted handle to an open table.
///
/// Every reader and scanner built from a handle retains it (cloning a handle
/// increments the count, dropping a clone decrements it), so the table's
/// shared state lives exactly as long as its longest-lived dependent.
/// Releasing more times than retained is a programming error and panics
/// rather than silently corrupting the count.
///
/// The handle owns the current [`LayoutCapsule`] behind an atomically
/// swappable pointer: [`TableHandle::capsule`] is a wait-free snapshot and
/// [`TableHandle::apply_layout_update`] swaps in a new capsule after a
/// mutation batch commits.
pub struct TableHandle {
    inner: Arc<TableInner>,
}

impl TableHandle {
    /// Opens a table: reads its current layout, builds the initial capsule,
    /// and starts the reference count at one for the returned handle.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Layout`] if no layout is stored for the table.
    pub fn open(
        name: impl Into<String>,
        store: Arc<dyn StoreClient>,
        layout_store: Arc<dyn LayoutStore>,
        registry: Arc<dyn SchemaRegistry>,
    ) -> Result<Self, TableError> {
        let name = name.into();
        let layout = layout_store.read_current(&name)?;
        let capsule = Arc::new(LayoutCapsule::new(layout, registry.clone()));

        #[cfg(feature = "logging")]
        log::debug!("opened table '{name}'");

        Ok(Self {
            inner: Arc::new(TableInner {
                name,
                store,
                layout_store,
                registry,
                capsule: ArcSwap::new(capsule),
                refs: AtomicUsize::new(1),
                commit_lock: Mutex::new(()),
            }),
        })
    }

    /// Name of the open table.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Snapshot of the current capsule. Operations capture one snapshot and
    /// use it for their entire duration.
    pub fn capsule(&self) -> Arc<LayoutCapsule> {
        self.inner.capsule.load_full()
    }

    /// The current layout version.
    pub fn layout(&self) -> Arc<TableLayout> {
        self.inner.capsule.load().layout().clone()
    }

    /// Current number of live dependents, this handle included.
    pub fn ref_count(&self) -> usize {
        self.inner.refs.load(Ordering::Acquire)
    }

    pub(crate) fn store(&self) -> &Arc<dyn StoreClient> {
        &self.inner.store
    }

    /// Opens a reader on this table. The reader retains the handle until it
    /// is closed or dropped.
    pub fn reader(&self) -> TableReader {
        TableReader::new(self.clone())
    }

    /// Validates, commits, and activates a batch of layout mutations.
    ///
    /// Each mutation is validated against the current layout, all are
    /// applied to one builder, and the merged candidate must pass the global
    /// structural validation before it is persisted. Only after the write
    /// succeeds is a new capsule swapped in; operations already in flight
    /// keep the capsule they captured.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Layout`] on any precondition or structural
    /// failure; nothing is persisted and the active capsule is untouched.
    pub fn apply_layout_update(
        &self,
        mutations: &[LayoutMutation],
    ) -> Result<Arc<TableLayout>, TableError> {
        let _commit = self.inner.commit_lock.lock().unwrap();

        let current = self.capsule().layout().clone();
        let candidate = LayoutMutation::apply_all(mutations, &current)?;
        self.inner.layout_store.write(&candidate)?;

        let layout = Arc::new(candidate);
        let capsule = Arc::new(LayoutCapsule::new(
            layout.clone(),
            self.inner.registry.clone(),
        ));
        self.inner.capsule.store(capsule);

        #[cfg(feature = "logging")]
        log::info!(
            "table '{}' layout advanced to version {}",
            self.inner.name,
            layout.version()
        );

        Ok(layout)
    }

    fn retain(&self) {
        let previous = self.inner.refs.fetch_add(1, Ordering::AcqRel);
        assert!(
            previous > 0,
            "table handle '{}' retained after final release",
            self.inner.name
        );
    }

    fn release(&self) {
        let previous = self.inner.refs.fetch_sub(1, Ordering::AcqRel);
        assert!(
            previous > 0,
            "table handle '{}' released more times than retained",
            self.inner.name
        );
        if previous == 1 {
            // Final release: dependents are gone, the shared state (and with
            // it the store connection) is torn down when the last Arc drops.
            #[cfg(feature = "logging")]
            log::debug!("closed table '{}'", self.inner.name);
        }
    }
}

impl Clone for TableHandle {
    fn clone(&self) -> Self {
        self.retain();
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for TableHandle {
    fn drop(&mut self) {
        self.release();
    }
}
