use crate::codec::Codec;
use crate::error::{Error, KvResult};

/// Identity codec for the document store: the state is a single string and
/// the on-disk representation is its raw UTF-8 bytes. The default value is
/// the empty string.
#[derive(Clone, Copy)]
pub struct StringCodec;

impl StringCodec {
    pub fn new() -> Self {
        StringCodec
    }
}

impl Default for StringCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec<String> for StringCodec {
    fn codec_name(&self) -> String {
        "StringCodec".to_string()
    }

    fn default_value(&self) -> String {
        String::new()
    }

    fn encode(&self, value: &String) -> KvResult<Vec<u8>> {
        Ok(value.clone().into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> KvResult<String> {
        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Ok(text),
            Err(err) => Err(Error::Parse(err.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_round_trip() {
        let codec = StringCodec::new();
        let text = "a document payload, opaque to the engine".to_string();
        assert_eq!(codec.decode(&codec.encode(&text).unwrap()).unwrap(), text);
    }

    #[test]
    fn test_default_is_empty() {
        assert_eq!(StringCodec::new().default_value(), "");
    }

    #[test]
    fn test_invalid_utf8() {
        let codec = StringCodec::new();
        assert!(matches!(codec.decode(&[0xff, 0xfe]), Err(Error::Parse(_))));
    }
}
