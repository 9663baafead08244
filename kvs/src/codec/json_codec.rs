use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::Codec;
use crate::error::{Error, KvResult};

/// Canonical JSON codec for map-shaped store states.
///
/// The state is a `BTreeMap<String, V>`, so serde_json emits the keys in
/// lexicographic order and the same logical state always produces the same
/// bytes. Both the plain store (`V = String`) and the TTL store
/// (`V = TtlEntry`) use this codec.
#[derive(Clone, Copy)]
pub struct MapCodec<V> {
    value_type: PhantomData<V>,
}

impl<V> MapCodec<V> {
    pub fn new() -> Self {
        MapCodec { value_type: PhantomData }
    }
}

impl<V> Default for MapCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Codec<BTreeMap<String, V>> for MapCodec<V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    fn codec_name(&self) -> String {
        "MapCodec".to_string()
    }

    fn default_value(&self) -> BTreeMap<String, V> {
        BTreeMap::new()
    }

    fn encode(&self, value: &BTreeMap<String, V>) -> KvResult<Vec<u8>> {
        match serde_json::to_vec(value) {
            Ok(bytes) => Ok(bytes),
            Err(err) => Err(Error::Internal(err.to_string())),
        }
    }

    fn decode(&self, bytes: &[u8]) -> KvResult<BTreeMap<String, V>> {
        match serde_json::from_slice(bytes) {
            Ok(map) => Ok(map),
            Err(err) => Err(Error::Parse(err.to_string())),
        }
    }
}
