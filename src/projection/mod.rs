//! Per-record projection façade: store-key derivation, sync detection
//! and the guarded write/delete operations.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::{Payload, Result};
use crate::manifest::ManifestRegistry;
use crate::parser::{DEFAULT_MAX_DEPTH, ManifestParser};
use crate::record::ProjectableRecord;
use crate::store::PayloadStore;
use crate::transform::KeyTransformer;

/// Projection configuration
#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    /// Record attribute the store key is derived from.
    pub key_attribute: String,

    /// Relation recursion depth cap.
    pub max_depth: usize,
}

impl ProjectionConfig {
    pub fn new(key_attribute: &str) -> Self {
        Self {
            key_attribute: key_attribute.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the recursion depth cap
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self::new("ID")
    }
}

/// Orchestrates the projection engine against an injected payload
/// store. One controller serves any number of records; per-call state
/// lives in the parser's validation-error list.
///
/// ```
/// use std::sync::Arc;
/// use readstore::{
///     InMemoryPayloadStore, Manifest, ManifestRegistry, MemoryRecord,
///     ProjectionConfig, ProjectionController,
/// };
///
/// # fn main() -> readstore::Result<()> {
/// let registry = ManifestRegistry::new()
///     .with("Article", Manifest::new().bare("ID").flag("Title", true));
/// let store = Arc::new(InMemoryPayloadStore::new());
/// let mut controller =
///     ProjectionController::new(ProjectionConfig::default(), registry, store);
///
/// let article = MemoryRecord::new("Article", "Hello")
///     .field("ID", "article-1")
///     .field("Title", "Hello");
///
/// assert!(!controller.is_in_sync(&article)?);
/// assert!(controller.write_to_store(&article)?);
/// assert!(controller.is_in_sync(&article)?);
/// # Ok(())
/// # }
/// ```
pub struct ProjectionController {
    config: ProjectionConfig,
    parser: ManifestParser,
    store: Arc<dyn PayloadStore>,
}

impl ProjectionController {
    pub fn new(
        config: ProjectionConfig,
        registry: ManifestRegistry,
        store: Arc<dyn PayloadStore>,
    ) -> Self {
        let parser = ManifestParser::new(registry).with_max_depth(config.max_depth);
        Self {
            config,
            parser,
            store,
        }
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn KeyTransformer>) -> Self {
        self.parser = self.parser.with_transformer(transformer);
        self
    }

    /// Derives the store key from the configured key attribute. An empty
    /// attribute value falls back to the attribute name itself, which
    /// acts as a namespacing default for unkeyed records.
    pub fn store_key(&self, record: &dyn ProjectableRecord) -> String {
        let raw = record.field_value(&self.config.key_attribute);
        let key = raw.to_string();
        if key.is_empty() {
            self.config.key_attribute.clone()
        } else {
            key
        }
    }

    /// Compares the stored payload against a fresh projection by
    /// canonical checksum. Never touches the validation-error channel
    /// and never fails on missing required data; only configuration
    /// errors propagate.
    pub fn is_in_sync(&mut self, record: &dyn ProjectableRecord) -> Result<bool> {
        let stored = self.store.read(&self.store_key(record));
        let fresh = self.parser.commit(record, false)?;
        let in_sync = stored.checksum() == fresh.checksum();
        debug!(
            record_type = record.type_identity(),
            in_sync, "sync check against payload store"
        );
        Ok(in_sync)
    }

    /// Projects the record and writes the payload under its store key.
    ///
    /// Returns `Ok(false)` without writing when the record's guard hook
    /// vetoes projection or when validation errors accumulate; the
    /// errors stay readable via [`validation_errors`](Self::validation_errors).
    pub fn write_to_store(&mut self, record: &dyn ProjectableRecord) -> Result<bool> {
        if !record.can_project() {
            warn!(
                record_type = record.type_identity(),
                "record vetoed projection, skipping write"
            );
            return Ok(false);
        }

        let payload = self.parser.commit(record, true)?;
        if !self.parser.can_commit() {
            warn!(
                record_type = record.type_identity(),
                errors = self.parser.validation_errors().len(),
                "payload has validation errors, skipping write"
            );
            return Ok(false);
        }

        let key = self.store_key(record);
        self.store.write(&key, &payload)?;
        info!(
            record_type = record.type_identity(),
            key = %key,
            backend = self.store.name(),
            "payload written to store"
        );
        Ok(true)
    }

    /// Deletes the record's stored payload. Deletion keys off the raw
    /// key attribute value with no fallback; an unkeyed record deletes
    /// the empty key, never the namespacing default used by writes.
    pub fn remove_from_store(&self, record: &dyn ProjectableRecord) -> Result<()> {
        let key = record.field_value(&self.config.key_attribute).to_string();
        self.store.delete(&key)?;
        info!(
            record_type = record.type_identity(),
            key = %key,
            backend = self.store.name(),
            "payload removed from store"
        );
        Ok(())
    }

    /// Errors accumulated by the most recent write attempt.
    pub fn validation_errors(&self) -> &[String] {
        self.parser.validation_errors()
    }

    /// Commits the record through the engine without touching the store.
    pub fn commit(&mut self, record: &dyn ProjectableRecord) -> Result<Payload> {
        self.parser.commit(record, true)
    }

    pub fn can_commit(&self) -> bool {
        self.parser.can_commit()
    }

    pub fn store(&self) -> &Arc<dyn PayloadStore> {
        &self.store
    }

    /// Checksum of the payload currently stored for the record.
    pub fn stored_checksum(&self, record: &dyn ProjectableRecord) -> String {
        self.store.read(&self.store_key(record)).checksum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::record::MemoryRecord;
    use crate::store::InMemoryPayloadStore;

    fn controller(registry: ManifestRegistry) -> ProjectionController {
        ProjectionController::new(
            ProjectionConfig::default(),
            registry,
            Arc::new(InMemoryPayloadStore::new()),
        )
    }

    #[test]
    fn test_store_key_uses_attribute_value() {
        let registry = ManifestRegistry::new().with("Article", Manifest::new().bare("ID"));
        let controller = controller(registry);
        let record = MemoryRecord::new("Article", "Hello").field("ID", "article-1");

        assert_eq!(controller.store_key(&record), "article-1");
    }

    #[test]
    fn test_store_key_falls_back_to_attribute_name() {
        let registry = ManifestRegistry::new().with("Article", Manifest::new().bare("ID"));
        let controller = controller(registry);

        let unset = MemoryRecord::new("Article", "Hello");
        assert_eq!(controller.store_key(&unset), "ID");

        let empty = MemoryRecord::new("Article", "Hello").field("ID", "");
        assert_eq!(controller.store_key(&empty), "ID");
    }

    #[test]
    fn test_numeric_key_attribute_renders_as_string() {
        let registry = ManifestRegistry::new().with("Article", Manifest::new().bare("ID"));
        let controller = controller(registry);
        let record = MemoryRecord::new("Article", "Hello").field("ID", 42i64);

        assert_eq!(controller.store_key(&record), "42");
    }

    #[test]
    fn test_guard_hook_vetoes_write() {
        let registry = ManifestRegistry::new().with("Article", Manifest::new().bare("ID"));
        let mut controller = controller(registry);
        let record = MemoryRecord::new("Article", "Hello")
            .field("ID", "article-1")
            .not_projectable();

        assert!(!controller.write_to_store(&record).unwrap());
        assert!(controller.store().read("article-1").is_empty());
        assert!(controller.validation_errors().is_empty());
    }
}
