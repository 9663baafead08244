pub mod aes;

pub use aes::AesGcmEncryptor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{Error, KvResult};

/// Symmetric transform applied to serialized bytes before they reach disk.
/// `decrypt(encrypt(b)) == b` must hold for any byte sequence.
pub trait Encryptor: Send + Sync {
    fn encrypt(&self, plain: &[u8]) -> KvResult<Vec<u8>>;

    fn decrypt(&self, cipher: &[u8]) -> KvResult<Vec<u8>>;
}

/// The identity transform, used when a store is not encrypted.
#[derive(Clone, Copy, Default)]
pub struct PassThrough;

impl PassThrough {
    pub fn new() -> Self {
        PassThrough
    }
}

impl Encryptor for PassThrough {
    fn encrypt(&self, plain: &[u8]) -> KvResult<Vec<u8>> {
        Ok(plain.to_vec())
    }

    fn decrypt(&self, cipher: &[u8]) -> KvResult<Vec<u8>> {
        Ok(cipher.to_vec())
    }
}

/// Encrypts a textual value for embedding in a string-valued store:
/// `base64(encrypt(utf8(text)))`.
pub fn seal_text(encryptor: &dyn Encryptor, text: &str) -> KvResult<String> {
    let cipher = encryptor.encrypt(text.as_bytes())?;
    Ok(BASE64.encode(cipher))
}

/// Reverses [`seal_text`]. Fails with `Decrypt` if the payload is not valid
/// base64 or cannot be recovered to UTF-8 plaintext.
pub fn open_text(encryptor: &dyn Encryptor, sealed: &str) -> KvResult<String> {
    let cipher = BASE64
        .decode(sealed)
        .map_err(|err| Error::Decrypt(err.to_string()))?;
    let plain = encryptor.decrypt(&cipher)?;
    String::from_utf8(plain).map_err(|err| Error::Decrypt(err.to_string()))
}
