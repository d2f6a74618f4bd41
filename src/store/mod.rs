pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::InMemoryPayloadStore;

use crate::core::{Payload, Result};

/// Payload store contract - allows pluggable fast-read backends.
///
/// Backends are injected explicitly (`Arc<dyn PayloadStore>`) at
/// composition time; there is no lazily-constructed global instance.
pub trait PayloadStore: Send + Sync {
    /// Reads the payload stored under `key`. Absent keys and transient
    /// read failures both yield an empty payload, never an error.
    fn read(&self, key: &str) -> Payload;

    /// Upserts the whole document under `key`.
    fn write(&self, key: &str, payload: &Payload) -> Result<()>;

    /// Deletes the document under `key`; deleting an absent key is fine.
    fn delete(&self, key: &str) -> Result<()>;

    /// Backend diagnostics; shape is backend-specific.
    fn info(&self, option: Option<&str>) -> Payload;

    /// Stable backend identifier, e.g. `"memory"` or `"file"`.
    fn name(&self) -> &'static str;
}
