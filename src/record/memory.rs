//! Reference in-memory record, handy for tests and embedding.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{Result, StoreError, Value};
use crate::record::{MethodValue, ProjectableRecord, RecordHandle, Relation};

type MethodFn = Arc<dyn Fn() -> MethodValue + Send + Sync>;

/// Map-backed [`ProjectableRecord`] implementation with builder-style
/// construction: fields hold values, methods are registered closures,
/// relations hold record handles.
///
/// ```
/// use readstore::MemoryRecord;
///
/// let record = MemoryRecord::new("Article", "Launch post")
///     .field("ID", 7i64)
///     .field("Title", "Launch post");
/// ```
pub struct MemoryRecord {
    type_identity: String,
    title: String,
    fields: HashMap<String, Value>,
    methods: HashMap<String, MethodFn>,
    to_one: HashMap<String, Option<RecordHandle>>,
    to_many: HashMap<String, Vec<RecordHandle>>,
    projectable: bool,
}

impl MemoryRecord {
    pub fn new(type_identity: &str, title: &str) -> Self {
        Self {
            type_identity: type_identity.to_string(),
            title: title.to_string(),
            fields: HashMap::new(),
            methods: HashMap::new(),
            to_one: HashMap::new(),
            to_many: HashMap::new(),
            projectable: true,
        }
    }

    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn() -> MethodValue + Send + Sync + 'static,
    {
        self.methods.insert(name.to_string(), Arc::new(f));
        self
    }

    /// Registers a method returning a plain value.
    pub fn scalar_method(self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.method(name, move || MethodValue::Scalar(value.clone()))
    }

    pub fn has_one(mut self, name: &str, related: Option<RecordHandle>) -> Self {
        self.to_one.insert(name.to_string(), related);
        self
    }

    pub fn has_many(mut self, name: &str, related: Vec<RecordHandle>) -> Self {
        self.to_many.insert(name.to_string(), related);
        self
    }

    /// Makes `can_project` veto writes for this record.
    pub fn not_projectable(mut self) -> Self {
        self.projectable = false;
        self
    }

    pub fn into_handle(self) -> RecordHandle {
        Arc::new(self)
    }
}

impl ProjectableRecord for MemoryRecord {
    fn type_identity(&self) -> &str {
        &self.type_identity
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    fn field_value(&self, name: &str) -> Value {
        self.fields.get(name).cloned().unwrap_or(Value::Null)
    }

    fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    fn invoke(&self, name: &str) -> Result<MethodValue> {
        let method = self.methods.get(name).ok_or_else(|| {
            StoreError::Manifest(format!(
                "The record type {} must define the method \"{}\"",
                self.type_identity, name
            ))
        })?;
        Ok(method())
    }

    fn relation(&self, name: &str) -> Relation {
        if let Some(related) = self.to_one.get(name) {
            return Relation::ToOne(related.clone());
        }
        if let Some(related) = self.to_many.get(name) {
            return Relation::ToMany(related.clone());
        }
        Relation::Absent
    }

    fn can_project(&self) -> bool {
        self.projectable
    }
}
