use std::sync::Arc;

use crate::layout::{ColumnNameTranslator, TableLayout};
use crate::schema::{CellDecoderProvider, SchemaRegistry};

/// The bundle of layout, column name translator, and cell decoder provider
/// derived from a single layout version.
///
/// A capsule is assembled from exactly one layout so its three parts can
/// never disagree about a version. The table handle swaps its capsule as a
/// unit when the layout advances; operations capture the capsule they start
/// with and old capsules stay alive until the last in-flight operation
/// releases them.
pub struct LayoutCapsule {
    layout: Arc<TableLayout>,
    translator: ColumnNameTranslator,
    decoders: CellDecoderProvider,
}

impl LayoutCapsule {
    pub(crate) fn new(layout: Arc<TableLayout>, registry: Arc<dyn SchemaRegistry>) -> Self {
        let translator = ColumnNameTranslator::new(layout.clone());
        let decoders = CellDecoderProvider::new(&layout, registry);
        Self {
            layout,
            translator,
            decoders,
        }
    }

    /// The layout version this capsule was built from.
    pub fn layout(&self) -> &Arc<TableLayout> {
        &self.layout
    }

    /// Name translator scoped to this capsule's layout version.
    pub fn translator(&self) -> &ColumnNameTranslator {
        &self.translator
    }

    /// Decoder provider scoped to this capsule's layout version.
    pub fn decoder_provider(&self) -> &CellDecoderProvider {
        &self.decoders
    }
}
