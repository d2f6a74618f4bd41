//! The manifest-driven projection engine.
//!
//! `ManifestParser::commit` walks a record's manifest, resolves each
//! entry against the record (field, relation or method), recursively
//! projects related records and produces the transformed payload.
//! Missing required data accumulates as validation errors; a broken
//! manifest aborts with a configuration error.

use std::sync::Arc;

use tracing::debug;

use crate::core::{Payload, Result, StoreError, Value};
use crate::manifest::{EntrySpec, ManifestEntry, ManifestRegistry};
use crate::record::{MethodValue, ProjectableRecord, Relation};
use crate::transform::{KeyTransformer, LowerCamelCase};

pub const DEFAULT_MAX_DEPTH: usize = 32;

/// How an entry's value was resolved; decides the error message shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Field,
    Method,
    Relation,
}

pub struct ManifestParser {
    transformer: Arc<dyn KeyTransformer>,
    registry: ManifestRegistry,
    errors: Vec<String>,
    max_depth: usize,
}

impl ManifestParser {
    pub fn new(registry: ManifestRegistry) -> Self {
        Self {
            transformer: Arc::new(LowerCamelCase::new()),
            registry,
            errors: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn KeyTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    /// Caps the relation recursion depth; cyclic relation graphs abort
    /// with a configuration error instead of looping.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Projects `record` through its registered manifest.
    ///
    /// With `collect_errors` the error list is reset and repopulated;
    /// without it (the sync-check path) the error channel is left
    /// untouched. Configuration errors abort either way.
    pub fn commit(
        &mut self,
        record: &dyn ProjectableRecord,
        collect_errors: bool,
    ) -> Result<Payload> {
        if collect_errors {
            self.errors.clear();
        }
        debug!(
            record_type = record.type_identity(),
            collect_errors, "committing record projection"
        );
        self.commit_at(record, collect_errors, 0)
    }

    /// True iff the most recent error-collecting `commit` accumulated no
    /// validation errors. Vacuously true before any commit.
    pub fn can_commit(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn validation_errors(&self) -> &[String] {
        &self.errors
    }

    pub fn clear_validation_errors(&mut self) {
        self.errors.clear();
    }

    fn commit_at(
        &mut self,
        record: &dyn ProjectableRecord,
        collect_errors: bool,
        depth: usize,
    ) -> Result<Payload> {
        if depth > self.max_depth {
            return Err(StoreError::RecursionLimit(format!(
                "projection of {} exceeded the relation depth limit of {}",
                record.type_identity(),
                self.max_depth
            )));
        }

        let manifest = self
            .registry
            .get(record.type_identity())
            .cloned()
            .ok_or_else(|| {
                StoreError::Manifest(format!(
                    "No manifest registered for record type \"{}\"",
                    record.type_identity()
                ))
            })?;

        let mut raw = Payload::new();
        for entry in manifest.entries() {
            let (key, value) = self.parse_entry(record, entry, collect_errors, depth)?;
            raw.insert(key, value);
        }

        // Transform once, over the final flat mapping; sub-payloads were
        // already transformed by their own sub-commit. Post-transform key
        // collisions overwrite in manifest order (known footgun, kept).
        let mut payload = Payload::new();
        for (key, value) in raw.iter() {
            payload.insert(self.transformer.transform(key), value.clone());
        }
        Ok(payload)
    }

    /// Resolves one manifest entry to `(key, value)`, accumulating a
    /// validation error when a required value turns out empty.
    fn parse_entry(
        &mut self,
        record: &dyn ProjectableRecord,
        entry: &ManifestEntry,
        collect_errors: bool,
        depth: usize,
    ) -> Result<(String, Value)> {
        let (key, required, spec) = entry.normalize();

        let (value, kind) = match &spec {
            EntrySpec::Required(_) => {
                self.resolve_probed(record, key, required, collect_errors, depth)?
            }
            EntrySpec::Mapping(method) | EntrySpec::Extended { mapping: method, .. } => {
                if !record.has_method(method) {
                    return Err(StoreError::Manifest(format!(
                        "The record type {} must define the method \"{}\"",
                        record.type_identity(),
                        method
                    )));
                }
                let value = self.resolve_method(record, method, collect_errors, depth)?;
                (value, EntryKind::Method)
            }
        };

        if required && value.is_empty() && collect_errors {
            if kind == EntryKind::Relation {
                self.missing_error(record, key);
            } else {
                self.required_error(record, key);
            }
        }

        Ok((key.to_string(), value))
    }

    /// Bare/bool-form resolution: field, then to-one relation, then
    /// to-many relation, then method, in that priority order. An entry
    /// resolving to nothing stays null and is reported like a field.
    fn resolve_probed(
        &mut self,
        record: &dyn ProjectableRecord,
        key: &str,
        required: bool,
        collect_errors: bool,
        depth: usize,
    ) -> Result<(Value, EntryKind)> {
        if record.has_field(key) {
            return Ok((record.field_value(key), EntryKind::Field));
        }

        match record.relation(key) {
            Relation::ToOne(Some(related)) => {
                // The related record's own manifest governs its required
                // fields; the parent's flag only gates error collection
                // for this slot's subtree.
                let payload =
                    self.commit_at(related.as_ref(), collect_errors && required, depth + 1)?;
                return Ok((Value::Payload(payload), EntryKind::Relation));
            }
            Relation::ToOne(None) => return Ok((Value::Null, EntryKind::Relation)),
            Relation::ToMany(related) => {
                let mut items = Vec::with_capacity(related.len());
                for related_record in &related {
                    let payload = self.commit_at(
                        related_record.as_ref(),
                        collect_errors && required,
                        depth + 1,
                    )?;
                    items.push(Value::Payload(payload));
                }
                return Ok((Value::List(items), EntryKind::Relation));
            }
            Relation::Absent => {}
        }

        if record.has_method(key) {
            let value = self.resolve_method(record, key, collect_errors, depth)?;
            return Ok((value, EntryKind::Method));
        }

        Ok((Value::Null, EntryKind::Field))
    }

    /// Invokes a method; record collections are projected element-wise,
    /// each member through its own manifest.
    fn resolve_method(
        &mut self,
        record: &dyn ProjectableRecord,
        method: &str,
        collect_errors: bool,
        depth: usize,
    ) -> Result<Value> {
        match record.invoke(method)? {
            MethodValue::Scalar(value) => Ok(value),
            MethodValue::Records(records) => {
                let mut items = Vec::with_capacity(records.len());
                for related in &records {
                    let payload = self.commit_at(related.as_ref(), collect_errors, depth + 1)?;
                    items.push(Value::Payload(payload));
                }
                Ok(Value::List(items))
            }
        }
    }

    fn required_error(&mut self, record: &dyn ProjectableRecord, field: &str) {
        self.validation_error(format!(
            "\"{}\" is required for {} \"{}\"",
            field,
            record.type_identity(),
            record.title()
        ));
    }

    fn missing_error(&mut self, record: &dyn ProjectableRecord, field: &str) {
        self.validation_error(format!(
            "No {} entries found for {} \"{}\"",
            field,
            record.type_identity(),
            record.title()
        ));
    }

    fn validation_error(&mut self, error: String) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::record::MemoryRecord;

    fn parser_for(type_identity: &str, manifest: Manifest) -> ManifestParser {
        ManifestParser::new(ManifestRegistry::new().with(type_identity, manifest))
    }

    #[test]
    fn test_commit_projects_fields_in_manifest_order() {
        let record = MemoryRecord::new("Article", "Hello")
            .field("ID", 7i64)
            .field("My Title", "Hello");
        let mut parser = parser_for("Article", Manifest::new().bare("ID").bare("My Title"));

        let payload = parser.commit(&record, true).unwrap();

        let keys: Vec<&str> = payload.keys().collect();
        assert_eq!(keys, vec!["id", "myTitle"]);
        assert_eq!(payload.get("id"), Some(&Value::Integer(7)));
        assert!(parser.can_commit());
    }

    #[test]
    fn test_field_shadows_method_of_same_name() {
        let record = MemoryRecord::new("Article", "Hello")
            .field("Title", "from field")
            .scalar_method("Title", "from method");
        let mut parser = parser_for("Article", Manifest::new().bare("Title"));

        let payload = parser.commit(&record, true).unwrap();
        assert_eq!(payload.get("title"), Some(&Value::Text("from field".into())));
    }

    #[test]
    fn test_unresolved_entry_stays_null_and_reports_as_field() {
        let record = MemoryRecord::new("Article", "Hello");
        let mut parser = parser_for("Article", Manifest::new().bare("Ghost"));

        let payload = parser.commit(&record, true).unwrap();
        assert_eq!(payload.get("ghost"), Some(&Value::Null));
        assert_eq!(
            parser.validation_errors(),
            &["\"Ghost\" is required for Article \"Hello\"".to_string()]
        );
    }

    #[test]
    fn test_unregistered_record_type_is_a_manifest_error() {
        let record = MemoryRecord::new("Unknown", "x");
        let mut parser = parser_for("Article", Manifest::new().bare("ID"));

        assert!(matches!(
            parser.commit(&record, true),
            Err(StoreError::Manifest(_))
        ));
    }

    #[test]
    fn test_errors_reset_on_each_collecting_commit() {
        let broken = MemoryRecord::new("Article", "Broken");
        let fine = MemoryRecord::new("Article", "Fine").field("Title", "x");
        let mut parser = parser_for("Article", Manifest::new().bare("Title"));

        parser.commit(&broken, true).unwrap();
        assert!(!parser.can_commit());

        parser.commit(&fine, true).unwrap();
        assert!(parser.can_commit());
    }

    #[test]
    fn test_sync_path_leaves_error_channel_untouched() {
        let broken = MemoryRecord::new("Article", "Broken");
        let mut parser = parser_for("Article", Manifest::new().bare("Title"));

        parser.commit(&broken, true).unwrap();
        let errors = parser.validation_errors().to_vec();

        parser.commit(&broken, false).unwrap();
        assert_eq!(parser.validation_errors(), errors.as_slice());
    }
}
