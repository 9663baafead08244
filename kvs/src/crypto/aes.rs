use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::crypto::Encryptor;
use crate::error::{Error, KvResult};

/// AES-GCM nonce size in bytes; the nonce is prepended to the ciphertext.
const NONCE_LEN: usize = 12;

/// AES-256-GCM encryptor. The 256-bit key is derived from a caller-supplied
/// passphrase via SHA-256; the output layout is `nonce || ciphertext || tag`
/// with a fresh random nonce per encryption.
#[derive(Clone)]
pub struct AesGcmEncryptor {
    cipher: Aes256Gcm,
}

impl AesGcmEncryptor {
    pub fn new(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        AesGcmEncryptor { cipher: Aes256Gcm::new(key) }
    }
}

impl Encryptor for AesGcmEncryptor {
    fn encrypt(&self, plain: &[u8]) -> KvResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plain)
            .map_err(|err| Error::Encrypt(err.to_string()))?;

        let mut out = nonce_bytes.to_vec();
        out.extend(ciphertext);
        Ok(out)
    }

    fn decrypt(&self, cipher: &[u8]) -> KvResult<Vec<u8>> {
        if cipher.len() < NONCE_LEN {
            return Err(Error::Decrypt("ciphertext shorter than nonce".to_string()));
        }
        let nonce = Nonce::from_slice(&cipher[..NONCE_LEN]);
        self.cipher
            .decrypt(nonce, &cipher[NONCE_LEN..])
            .map_err(|err| Error::Decrypt(err.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_round_trip() {
        let e = AesGcmEncryptor::new("secret");
        for data in [&b""[..], &b"x"[..], &[0u8; 4096][..]] {
            let cipher = e.encrypt(data).unwrap();
            assert_eq!(e.decrypt(&cipher).unwrap(), data);
        }
    }

    #[test]
    /// Each encryption draws a fresh nonce, so equal plaintexts must not
    /// produce equal ciphertexts.
    fn test_nonce_freshness() {
        let e = AesGcmEncryptor::new("secret");
        let a = e.encrypt(b"same").unwrap();
        let b = e.encrypt(b"same").unwrap();
        assert_ne!(a, b);
        assert_eq!(e.decrypt(&a).unwrap(), e.decrypt(&b).unwrap());
    }

    #[test]
    fn test_wrong_passphrase() {
        let cipher = AesGcmEncryptor::new("right").encrypt(b"payload").unwrap();
        let wrong = AesGcmEncryptor::new("wrong");
        assert!(matches!(wrong.decrypt(&cipher), Err(Error::Decrypt(_))));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let e = AesGcmEncryptor::new("secret");
        let mut cipher = e.encrypt(b"payload").unwrap();
        let last = cipher.len() - 1;
        cipher[last] ^= 0x01;
        assert!(matches!(e.decrypt(&cipher), Err(Error::Decrypt(_))));
    }

    #[test]
    fn test_truncated_input() {
        let e = AesGcmEncryptor::new("secret");
        assert!(matches!(e.decrypt(&[0u8; 4]), Err(Error::Decrypt(_))));
    }
}
