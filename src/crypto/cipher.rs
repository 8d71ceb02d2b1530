//! Sealed Proposals
//!
//! ChaCha20-Poly1305 under a per-turn shared key. The player seals a proposal
//! with the key it shares with the game master; the game master derives the
//! same key from its side and opens it.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::kdf::DerivedKey;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Cipher errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CipherError {
    /// Encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,
    /// Wrong key, tampered ciphertext, or wrong nonce.
    #[error("decryption failed - invalid ciphertext or wrong key")]
    DecryptionFailed,
    /// Plaintext is not UTF-8.
    #[error("decrypted proposal is not valid utf-8")]
    InvalidUtf8,
    /// Wire form too short or not hex.
    #[error("malformed sealed proposal: {0}")]
    Malformed(String),
}

/// Encrypted proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedProposal {
    /// Random nonce.
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with 16-byte tag.
    pub ciphertext: Vec<u8>,
}

impl SealedProposal {
    /// Encrypt a proposal.
    pub fn seal<R: RngCore + CryptoRng>(
        key: &DerivedKey,
        plaintext: &str,
        rng: &mut R,
    ) -> Result<Self, CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        Ok(Self { nonce, ciphertext })
    }

    /// Decrypt a proposal.
    pub fn open(&self, key: &DerivedKey) -> Result<String, CipherError> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
            .map_err(|_| CipherError::DecryptionFailed)?;
        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }

    /// `0x` + hex(nonce ‖ ciphertext), as posted on chain.
    pub fn to_hex(&self) -> String {
        let mut bytes = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        format!("0x{}", hex::encode(bytes))
    }

    /// Parse the form produced by [`SealedProposal::to_hex`].
    pub fn from_hex(s: &str) -> Result<Self, CipherError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| CipherError::Malformed(e.to_string()))?;
        if bytes.len() < NONCE_LEN {
            return Err(CipherError::Malformed(format!("{} bytes is shorter than a nonce", bytes.len())));
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[..NONCE_LEN]);
        Ok(Self { nonce, ciphertext: bytes[NONCE_LEN..].to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_seal_open() {
        let key = DerivedKey([7; 32]);
        let sealed = SealedProposal::seal(&key, "plant more trees", &mut OsRng).unwrap();
        assert_eq!(sealed.ciphertext.len(), "plant more trees".len() + 16);
        assert_eq!(sealed.open(&key).unwrap(), "plant more trees");
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = SealedProposal::seal(&DerivedKey([7; 32]), "secret", &mut OsRng).unwrap();
        assert_eq!(sealed.open(&DerivedKey([8; 32])), Err(CipherError::DecryptionFailed));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = DerivedKey([7; 32]);
        let mut sealed = SealedProposal::seal(&key, "secret", &mut OsRng).unwrap();
        sealed.ciphertext[0] ^= 1;
        assert_eq!(sealed.open(&key), Err(CipherError::DecryptionFailed));
    }

    #[test]
    fn test_hex_wire_form() {
        let key = DerivedKey([1; 32]);
        let sealed = SealedProposal::seal(&key, "", &mut OsRng).unwrap();
        let parsed = SealedProposal::from_hex(&sealed.to_hex()).unwrap();
        assert_eq!(parsed, sealed);
        assert_eq!(parsed.open(&key).unwrap(), "");

        assert!(matches!(SealedProposal::from_hex("0x0102"), Err(CipherError::Malformed(_))));
        assert!(matches!(SealedProposal::from_hex("0xnothex"), Err(CipherError::Malformed(_))));
    }
}
