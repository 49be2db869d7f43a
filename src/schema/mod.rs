//! Cell schemas, typed values, the schema registry, and cell decoders.
//!
//! Stored cells are schema-tagged: the payload opens with the little-endian
//! id of the schema the writer registered, followed by the value encoding.
//! Decoders resolve the embedded id through a [`SchemaRegistry`] and check it
//! against the schema the layout configures for the column, so a cell written
//! under an older layout version still decodes through the layout version it
//! was read under.

pub(crate) mod decoder;
pub(crate) mod registry;
pub(crate) mod value;

pub use decoder::{CellDecoder, CellDecoderProvider};
pub use registry::{MemorySchemaRegistry, SchemaId, SchemaRegistry};
pub use value::{CellSchema, CellValue, DecodeError, encode_cell};
