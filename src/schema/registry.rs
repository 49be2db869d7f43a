use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use super::value::{CellSchema, DecodeError};

/// Stable reference to a registered schema, embeddable in a cell payload.
///
/// The id is the crc32 fingerprint of the schema's canonical encoding, so
/// registering the same schema anywhere always yields the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaId(u32);

impl SchemaId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Fingerprints a schema into its stable id.
    pub fn of(schema: CellSchema) -> Self {
        Self(crc32fast::hash(schema.canonical_bytes()))
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Resolves schema references embedded in stored cells.
///
/// The data-access layer treats the registry as a synchronous lookup.
/// Unavailability surfaces as a per-cell [`DecodeError::RegistryUnavailable`],
/// never as a fatal error for the whole read.
pub trait SchemaRegistry: Send + Sync {
    /// Returns the schema a stored cell references.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownSchema`] or
    /// [`DecodeError::RegistryUnavailable`].
    fn resolve(&self, id: SchemaId) -> Result<CellSchema, DecodeError>;

    /// Registers a schema and returns its stable reference.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::RegistryUnavailable`].
    fn register(&self, schema: CellSchema) -> Result<SchemaId, DecodeError>;
}

/// In-memory [`SchemaRegistry`] with an availability switch for tests.
#[derive(Default)]
pub struct MemorySchemaRegistry {
    schemas: RwLock<HashMap<SchemaId, CellSchema>>,
    unavailable: AtomicBool,
}

impl MemorySchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a registry outage; lookups fail until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DecodeError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DecodeError::RegistryUnavailable(
                "registry offline".to_string(),
            ));
        }
        Ok(())
    }
}

impl SchemaRegistry for MemorySchemaRegistry {
    fn resolve(&self, id: SchemaId) -> Result<CellSchema, DecodeError> {
        self.check_available()?;
        self.schemas
            .read()
            .unwrap()
            .get(&id)
            .copied()
            .ok_or(DecodeError::UnknownSchema(id))
    }

    fn register(&self, schema: CellSchema) -> Result<SchemaId, DecodeError> {
        self.check_available()?;
        let id = SchemaId::of(schema);
        self.schemas.write().unwrap().insert(id, schema);
        Ok(id)
    }
}
