//! File-backed payload store: one JSON document per key.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::{Payload, Result};
use crate::store::PayloadStore;

/// Stores each payload as a JSON file in a directory. Writes go through
/// a temporary file and a rename, so readers never observe a partial
/// document. Documents are written in canonical (numeric-coerced) form,
/// matching the checksum path.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are record identifiers, not paths; anything unsafe for a
        // file name gets replaced.
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let safe = if safe.is_empty() { "_".to_string() } else { safe };
        self.dir.join(format!("{}.json", safe))
    }
}

impl PayloadStore for JsonFileStore {
    fn read(&self, key: &str) -> Payload {
        let path = self.path_for(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Payload::new(),
            Err(err) => {
                warn!(key, error = %err, "payload read failed, treating as absent");
                return Payload::new();
            }
        };

        match serde_json::from_str::<serde_json::Value>(&contents) {
            Ok(json) => Payload::from_json_value(&json).unwrap_or_else(|| {
                warn!(key, "stored document is not a JSON object, treating as absent");
                Payload::new()
            }),
            Err(err) => {
                warn!(key, error = %err, "stored document is not valid JSON, treating as absent");
                Payload::new()
            }
        }
    }

    fn write(&self, key: &str, payload: &Payload) -> Result<()> {
        let path = self.path_for(key);
        let document = payload.to_json_value(true).to_string();

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, document)?;
        fs::rename(&tmp_path, &path)?;
        debug!(key, path = %path.display(), "payload written to file store");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "payload removed from file store");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn info(&self, option: Option<&str>) -> Payload {
        let entries = fs::read_dir(&self.dir)
            .map(|dir| {
                dir.filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                    .count()
            })
            .unwrap_or(0);

        let mut info = Payload::new();
        info.insert("backend", self.name());
        info.insert("path", self.dir.display().to_string());
        info.insert("entries", entries as i64);
        if let Some(option) = option {
            info.insert("option", option);
        }
        info
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
