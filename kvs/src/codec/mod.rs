pub mod json_codec;
pub mod string_codec;

pub use json_codec::MapCodec;
pub use string_codec::StringCodec;

use crate::error::KvResult;

/// Serializes a store's in-memory state to bytes and back. The encryption
/// layer sits below this: cells persist `encrypt(encode(state))`.
pub trait Codec<T>: Send + Sync {
    fn codec_name(&self) -> String;

    /// The state adopted when the backing file is missing or empty.
    fn default_value(&self) -> T;

    fn encode(&self, value: &T) -> KvResult<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> KvResult<T>;
}
