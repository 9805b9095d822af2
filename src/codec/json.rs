//! JSON codec, the default serialization format.

use crate::cache::CacheEntry;
use crate::codec::Codec;
use crate::error::{CacheError, Result};

// == JSON Codec ==
/// Encodes cache entries as compact JSON.
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn encode(&self, entry: &CacheEntry) -> Result<Vec<u8>> {
        serde_json::to_vec(entry).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<CacheEntry> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}
