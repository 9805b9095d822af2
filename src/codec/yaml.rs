//! YAML codec, useful when cache blobs are inspected by hand.

use crate::cache::CacheEntry;
use crate::codec::Codec;
use crate::error::{CacheError, Result};

// == YAML Codec ==
/// Encodes cache entries as YAML documents.
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn extension(&self) -> &'static str {
        "yaml"
    }

    fn encode(&self, entry: &CacheEntry) -> Result<Vec<u8>> {
        serde_yaml::to_string(entry)
            .map(String::into_bytes)
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<CacheEntry> {
        serde_yaml::from_slice(bytes).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}
