// ============================================================================
// readstore Library
// ============================================================================
//
// A write-behind, read-optimized projection layer: source-of-truth records
// are committed through declarative per-type manifests into denormalized
// JSON payloads and pushed to a fast-read payload store on explicit request.
// Consumers read only from the store; staleness is detected by comparing
// canonical content checksums without writing.

pub mod core;
pub mod manifest;
pub mod parser;
pub mod projection;
pub mod record;
pub mod store;
pub mod transform;

// Re-export main types for convenience
pub use crate::core::{Payload, Result, StoreError, Value};
pub use manifest::{EntrySpec, Manifest, ManifestEntry, ManifestRegistry};
pub use parser::ManifestParser;
pub use projection::{ProjectionConfig, ProjectionController};
pub use record::{MemoryRecord, MethodValue, ProjectableRecord, RecordHandle, Relation};
pub use store::{InMemoryPayloadStore, JsonFileStore, PayloadStore};
pub use transform::{KeyTransformer, LowerCamelCase};
