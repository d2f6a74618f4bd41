//! Key-name transformation for the external payload convention.

use std::collections::HashMap;

/// Maps a raw field/method/relation name to the payload's key naming
/// convention. Implementations must be pure, total and deterministic;
/// the engine depends on this trait, never on a concrete transformer.
pub trait KeyTransformer: Send + Sync {
    fn transform(&self, raw: &str) -> String;
}

/// The reference transformer: trims surrounding whitespace, title-cases
/// each whitespace-separated word, strips the whitespace and lower-cases
/// the first character. A dictionary of overrides wins over the
/// algorithm; by default the identity field `ID` maps to `id`.
///
/// Keys without whitespace pass through unchanged apart from trimming,
/// so `already_camel` stays `already_camel`.
pub struct LowerCamelCase {
    overrides: HashMap<String, String>,
}

impl LowerCamelCase {
    pub fn new() -> Self {
        let mut overrides = HashMap::new();
        overrides.insert("ID".to_string(), "id".to_string());
        Self { overrides }
    }

    /// Adds or replaces a dictionary override.
    pub fn with_override(mut self, raw: &str, fixed: &str) -> Self {
        self.overrides.insert(raw.to_string(), fixed.to_string());
        self
    }
}

impl Default for LowerCamelCase {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyTransformer for LowerCamelCase {
    fn transform(&self, raw: &str) -> String {
        if let Some(fixed) = self.overrides.get(raw) {
            return fixed.clone();
        }

        let mut camel = String::with_capacity(raw.len());
        for word in raw.trim().split_whitespace() {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                camel.extend(first.to_uppercase());
                camel.push_str(chars.as_str());
            }
        }

        let mut chars = camel.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => camel,
        }
    }
}
