//! The capability surface the projection engine consumes from the host
//! record system.

pub mod memory;

pub use memory::MemoryRecord;

use std::sync::Arc;

use crate::core::{Result, Value};

/// Shared handle to a projectable record. Relations and record-returning
/// methods hand these out; the engine never sees concrete record types.
pub type RecordHandle = Arc<dyn ProjectableRecord>;

/// Outcome of probing a record for a named relation.
pub enum Relation {
    /// No relation of that name exists on the record type.
    Absent,
    /// A to-one relation; `None` when no related record is attached.
    ToOne(Option<RecordHandle>),
    /// A to-many (has-many / many-to-many) relation.
    ToMany(Vec<RecordHandle>),
}

/// Result of invoking a zero-argument record method: either a plain
/// value or a collection of related records to be projected element-wise.
pub enum MethodValue {
    Scalar(Value),
    Records(Vec<RecordHandle>),
}

/// Introspection contract a host record type must satisfy to be
/// projected. Replaces dynamic field/method probing with an explicit
/// seam; the engine depends only on this trait.
pub trait ProjectableRecord: Send + Sync {
    /// Stable type identity, used for manifest lookup and error messages.
    fn type_identity(&self) -> &str;

    /// Human-readable record title for validation errors.
    fn title(&self) -> String;

    fn has_field(&self, name: &str) -> bool;

    /// Direct attribute read; `Value::Null` for absent or unset fields.
    fn field_value(&self, name: &str) -> Value;

    fn has_method(&self, name: &str) -> bool;

    /// Invokes a zero-argument method. Callers check `has_method` first;
    /// invoking an unknown method is a configuration error.
    fn invoke(&self, name: &str) -> Result<MethodValue>;

    fn relation(&self, name: &str) -> Relation;

    /// Pre-write guard hook: when false, `write_to_store` is a no-op
    /// failure without projecting. Defaults to eligible.
    fn can_project(&self) -> bool {
        true
    }
}
