//! Declarative per-record-type projection manifests.
//!
//! A manifest is an ordered list of entries in one of four shapes,
//! mirroring the configuration documents the projection layer is driven
//! by:
//!
//! ```json
//! [
//!     "ID",
//!     { "Title": true },
//!     { "Teaser": false },
//!     { "Cover": "coverData" },
//!     { "Gallery": { "required": true, "mapping": "galleryImages" } }
//! ]
//! ```
//!
//! The shapes are resolved into a tagged enum once, at parse time; the
//! engine never re-branches on dynamic value shapes.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::core::{Result, StoreError};

/// The keyed part of a manifest entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntrySpec {
    /// Bool form: probe field, then relation, then method; the flag is
    /// the required flag.
    Required(bool),
    /// String form: the named zero-argument method, always required.
    Mapping(String),
    /// Object form: explicit required flag and method name.
    Extended { required: bool, mapping: String },
}

/// One manifest entry: a bare name (required, key defaults to the name)
/// or a key with a spec.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestEntry {
    Bare(String),
    Keyed { key: String, spec: EntrySpec },
}

impl ManifestEntry {
    /// Normalizes into `(key, required, spec)`; bare names become a
    /// required bool-form entry keyed by the name itself.
    pub fn normalize(&self) -> (&str, bool, EntrySpec) {
        match self {
            Self::Bare(name) => (name, true, EntrySpec::Required(true)),
            Self::Keyed { key, spec } => {
                let required = match spec {
                    EntrySpec::Required(required) => *required,
                    EntrySpec::Mapping(_) => true,
                    EntrySpec::Extended { required, .. } => *required,
                };
                (key, required, spec.clone())
            }
        }
    }
}

/// Ordered projection manifest for one record type. Entry order defines
/// payload field order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bare-name entry: required, key and source resolved by probing.
    pub fn bare(mut self, name: &str) -> Self {
        self.entries.push(ManifestEntry::Bare(name.to_string()));
        self
    }

    /// Bool-form entry.
    pub fn flag(mut self, key: &str, required: bool) -> Self {
        self.entries.push(ManifestEntry::Keyed {
            key: key.to_string(),
            spec: EntrySpec::Required(required),
        });
        self
    }

    /// String-form entry: value from the named method, always required.
    pub fn mapping(mut self, key: &str, method: &str) -> Self {
        self.entries.push(ManifestEntry::Keyed {
            key: key.to_string(),
            spec: EntrySpec::Mapping(method.to_string()),
        });
        self
    }

    /// Object-form entry with an explicit required flag.
    pub fn extended(mut self, key: &str, required: bool, method: &str) -> Self {
        self.entries.push(ManifestEntry::Keyed {
            key: key.to_string(),
            spec: EntrySpec::Extended {
                required,
                mapping: method.to_string(),
            },
        });
        self
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses a manifest from its JSON document form. A malformed
    /// document (object form missing `required` or `mapping`, unexpected
    /// value shapes) is a configuration error.
    pub fn from_json(document: &str) -> Result<Self> {
        serde_json::from_str(document)
            .map_err(|e| StoreError::Manifest(format!("Malformed manifest document: {}", e)))
    }
}

/// Raw keyed-spec wire shapes; untagged so the JSON forms map directly.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSpec {
    Required(bool),
    Mapping(String),
    Extended { required: bool, mapping: String },
}

impl From<RawSpec> for EntrySpec {
    fn from(raw: RawSpec) -> Self {
        match raw {
            RawSpec::Required(required) => Self::Required(required),
            RawSpec::Mapping(mapping) => Self::Mapping(mapping),
            RawSpec::Extended { required, mapping } => Self::Extended { required, mapping },
        }
    }
}

struct EntryVisitor;

impl<'de> Visitor<'de> for EntryVisitor {
    type Value = ManifestEntry;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a field name or a single-key manifest entry object")
    }

    fn visit_str<E: de::Error>(self, name: &str) -> std::result::Result<ManifestEntry, E> {
        Ok(ManifestEntry::Bare(name.to_string()))
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut map: A,
    ) -> std::result::Result<ManifestEntry, A::Error> {
        let (key, raw): (String, RawSpec) = map
            .next_entry()?
            .ok_or_else(|| de::Error::custom("manifest entry object must have exactly one key"))?;
        if map.next_key::<String>()?.is_some() {
            return Err(de::Error::custom(
                "manifest entry object must have exactly one key",
            ));
        }
        Ok(ManifestEntry::Keyed {
            key,
            spec: raw.into(),
        })
    }
}

impl<'de> Deserialize<'de> for ManifestEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(EntryVisitor)
    }
}

/// Maps record type identities to their manifests. A record type
/// reached during projection without a registered manifest is a
/// configuration error.
#[derive(Debug, Clone, Default)]
pub struct ManifestRegistry {
    manifests: HashMap<String, Manifest>,
}

impl ManifestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_identity: &str, manifest: Manifest) {
        self.manifests.insert(type_identity.to_string(), manifest);
    }

    /// Builder-style registration for composition-time setup.
    pub fn with(mut self, type_identity: &str, manifest: Manifest) -> Self {
        self.register(type_identity, manifest);
        self
    }

    pub fn get(&self, type_identity: &str) -> Option<&Manifest> {
        self.manifests.get(type_identity)
    }
}
