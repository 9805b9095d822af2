//! Codec Module
//!
//! Pluggable serialization for cache entries. A codec turns a `CacheEntry`
//! into bytes and back; the registry maps format names to codec instances so
//! the active format can be switched at runtime and extended with custom
//! formats.

use std::collections::HashMap;
use std::sync::Arc;

mod json;
mod yaml;

pub use json::JsonCodec;
pub use yaml::YamlCodec;

use crate::cache::CacheEntry;
use crate::error::Result;

// == Codec Trait ==
/// One serialization format for cache entries.
///
/// Implementations must be stateless and cheap to share; the registry hands
/// out `Arc` clones on every lookup.
pub trait Codec: Send + Sync {
    /// Format name used for registry lookups (e.g. "json")
    fn name(&self) -> &'static str;

    /// File extension used by filesystem-backed storage, without the dot
    fn extension(&self) -> &'static str;

    /// Serializes an entry to bytes.
    fn encode(&self, entry: &CacheEntry) -> Result<Vec<u8>>;

    /// Deserializes an entry from bytes.
    fn decode(&self, bytes: &[u8]) -> Result<CacheEntry>;
}

// == Codec Registry ==
/// Name-to-codec table consulted on every cache operation.
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    // == Constructor ==
    /// Creates a registry pre-populated with the built-in JSON and YAML codecs.
    pub fn builtin() -> Self {
        let mut registry = Self {
            codecs: HashMap::new(),
        };
        registry.register(Arc::new(JsonCodec));
        registry.register(Arc::new(YamlCodec));
        registry
    }

    // == Register ==
    /// Adds a codec under its own name, replacing any codec already
    /// registered under that name.
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        self.codecs.insert(codec.name().to_string(), codec);
    }

    // == Lookup ==
    /// Returns the codec registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(name).cloned()
    }

    /// Checks whether a format name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }

    /// Returns all registered format names, sorted for stable output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.codecs.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
