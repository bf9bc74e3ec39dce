use aes::Aes256;
use base64::{
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
    Engine as _,
};
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::constants::{ATTACHMENT_IV_SIZE, ATTACHMENT_KEY_SIZE, SHA256_SIZE};
use crate::error::CryptoError;
use crate::event::UnlockMaterial;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

pub type AttachmentKey = [u8; ATTACHMENT_KEY_SIZE];

pub fn generate_attachment_key() -> AttachmentKey {
    let mut key = [0u8; ATTACHMENT_KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut key);
    key
}

// Upper 8 bytes random, lower 8 bytes are the block counter and start at zero
pub fn generate_iv() -> [u8; ATTACHMENT_IV_SIZE] {
    let mut iv = [0u8; ATTACHMENT_IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv[..8]);
    iv
}

/// Encrypt an attachment the way homeserver clients do, returning the
/// ciphertext and the unlock material to publish alongside it.
pub fn encrypt_attachment(plaintext: &[u8]) -> (Vec<u8>, UnlockMaterial) {
    let key = generate_attachment_key();
    let iv = generate_iv();

    let mut data = plaintext.to_vec();
    let mut cipher = Aes256Ctr::new(&key.into(), &iv.into());
    cipher.apply_keystream(&mut data);

    let digest = Sha256::digest(&data);
    let unlock = UnlockMaterial {
        key: URL_SAFE_NO_PAD.encode(key),
        sha256: STANDARD_NO_PAD.encode(digest),
        iv: STANDARD_NO_PAD.encode(iv),
    };
    (data, unlock)
}

/// Verify and decrypt an attachment. The ciphertext hash is checked before
/// any decryption happens.
pub fn decrypt_attachment(ciphertext: &[u8], unlock: &UnlockMaterial) -> Result<Vec<u8>, CryptoError> {
    let key = decode_url_safe(&unlock.key).map_err(CryptoError::InvalidKey)?;
    if key.len() != ATTACHMENT_KEY_SIZE {
        return Err(CryptoError::InvalidKey(format!(
            "expected {ATTACHMENT_KEY_SIZE} bytes, got {}",
            key.len()
        )));
    }

    let iv = decode_standard(&unlock.iv).map_err(CryptoError::InvalidIv)?;
    if iv.len() != ATTACHMENT_IV_SIZE {
        return Err(CryptoError::InvalidIv(format!(
            "expected {ATTACHMENT_IV_SIZE} bytes, got {}",
            iv.len()
        )));
    }

    let expected = decode_standard(&unlock.sha256).map_err(CryptoError::InvalidHash)?;
    if expected.len() != SHA256_SIZE {
        return Err(CryptoError::InvalidHash(format!(
            "expected {SHA256_SIZE} bytes, got {}",
            expected.len()
        )));
    }

    let digest = Sha256::digest(ciphertext);
    if !bool::from(digest.as_slice().ct_eq(&expected)) {
        return Err(CryptoError::HashMismatch);
    }

    let mut cipher = Aes256Ctr::new_from_slices(&key, &iv)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let mut plaintext = ciphertext.to_vec();
    cipher.apply_keystream(&mut plaintext);
    Ok(plaintext)
}

// Senders are inconsistent about padding, so accept it and strip it
fn decode_standard(s: &str) -> Result<Vec<u8>, String> {
    STANDARD_NO_PAD
        .decode(s.trim_end_matches('='))
        .map_err(|e| e.to_string())
}

fn decode_url_safe(s: &str) -> Result<Vec<u8>, String> {
    URL_SAFE_NO_PAD
        .decode(s.trim_end_matches('='))
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = b"a picture of a cat";

        let (ciphertext, unlock) = encrypt_attachment(plaintext);
        assert_ne!(ciphertext, plaintext);

        let decrypted = decrypt_attachment(&ciphertext, &unlock).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_known_vector() {
        // all-zero key and iv: the keystream is AES-256(0, counter)
        let unlock_for = |ciphertext: &[u8]| UnlockMaterial {
            key: URL_SAFE_NO_PAD.encode([0u8; 32]),
            sha256: STANDARD_NO_PAD.encode(Sha256::digest(ciphertext)),
            iv: STANDARD_NO_PAD.encode([0u8; 16]),
        };

        let plaintext = b"known plaintext for the archive!";
        let mut ciphertext = plaintext.to_vec();
        let mut cipher = Aes256Ctr::new(&[0u8; 32].into(), &[0u8; 16].into());
        cipher.apply_keystream(&mut ciphertext);

        let decrypted = decrypt_attachment(&ciphertext, &unlock_for(&ciphertext)).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_hash_mismatch_fails() {
        let (mut ciphertext, unlock) = encrypt_attachment(b"Important data");
        let len = ciphertext.len();
        ciphertext[len - 1] ^= 0xFF;

        assert!(matches!(
            decrypt_attachment(&ciphertext, &unlock),
            Err(CryptoError::HashMismatch)
        ));
    }

    #[test]
    fn test_wrong_hash_fails() {
        let (ciphertext, mut unlock) = encrypt_attachment(b"payload");
        unlock.sha256 = STANDARD_NO_PAD.encode([7u8; 32]);

        assert!(matches!(
            decrypt_attachment(&ciphertext, &unlock),
            Err(CryptoError::HashMismatch)
        ));
    }

    #[test]
    fn test_padded_encodings_accepted() {
        let (ciphertext, mut unlock) = encrypt_attachment(b"padding");
        unlock.sha256.push('=');
        unlock.iv.push_str("==");

        assert_eq!(decrypt_attachment(&ciphertext, &unlock).unwrap(), b"padding");
    }

    #[test]
    fn test_short_key_rejected() {
        let (ciphertext, mut unlock) = encrypt_attachment(b"data");
        unlock.key = URL_SAFE_NO_PAD.encode([1u8; 16]);

        assert!(matches!(
            decrypt_attachment(&ciphertext, &unlock),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_garbage_iv_rejected() {
        let (ciphertext, mut unlock) = encrypt_attachment(b"data");
        unlock.iv = "!!not base64!!".into();

        assert!(matches!(
            decrypt_attachment(&ciphertext, &unlock),
            Err(CryptoError::InvalidIv(_))
        ));
    }

    #[test]
    fn test_iv_counter_starts_at_zero() {
        let iv = generate_iv();
        assert_eq!(&iv[8..], &[0u8; 8]);
    }
}
