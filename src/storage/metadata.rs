use std::collections::HashMap;
use parking_lot::RwLock;
use crate::core::error::Result;
use crate::core::types::{DetailLevel, MaterializedRecord};

/// Supplies full record bodies for identifiers the index returned.
///
/// `Ok(None)` means the record is gone; the engine never inspects the body.
pub trait MetadataStore: Send + Sync {
    fn fetch(
        &self,
        identifier: &str,
        output_profile: &str,
        detail: DetailLevel,
    ) -> Result<Option<MaterializedRecord>>;
}

/// Map-backed store, for embedding and tests
pub struct InMemoryMetadataStore {
    bodies: RwLock<HashMap<String, String>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        InMemoryMetadataStore {
            bodies: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, identifier: &str, body: impl Into<String>) {
        self.bodies.write().insert(identifier.to_string(), body.into());
    }

    pub fn delete(&self, identifier: &str) {
        self.bodies.write().remove(identifier);
    }
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn fetch(
        &self,
        identifier: &str,
        _output_profile: &str,
        detail: DetailLevel,
    ) -> Result<Option<MaterializedRecord>> {
        Ok(self.bodies.read().get(identifier).map(|body| {
            let body = match detail {
                DetailLevel::Full => body.clone(),
                // brief/summary views keep the first line only
                DetailLevel::Brief | DetailLevel::Summary => {
                    body.lines().next().unwrap_or_default().to_string()
                }
            };
            MaterializedRecord::new(identifier, body)
        }))
    }
}
