//! src/crypto/legacy.rs
//! Blowfish ECB transform used by format versions up to 103
//!
//! Those archives have no IV and no chaining: every 32-byte buffer is four
//! independent 8-byte Blowfish blocks. The key is the password text (up to the
//! first NUL within the first 31 bytes of the key buffer) followed by a fixed
//! footer.

use blowfish::cipher::generic_array::GenericArray;
use blowfish::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

use secure_gate::RevealSecret;

use crate::aliases::ArchiveKey32;
use crate::consts::{ATC_BUF_SIZE, ATC_KEY_SIZE, ATC_LEGACY_PASS_FOOTER};
use crate::error::AtcError;

type LegacyCipher = blowfish::Blowfish;

const LEGACY_BLOCK: usize = 8;

/// Keyed Blowfish over whole 32-byte buffers.
#[derive(Clone)]
pub struct LegacyStream {
    cipher: LegacyCipher,
}

impl std::fmt::Debug for LegacyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyStream").finish_non_exhaustive()
    }
}

impl LegacyStream {
    pub fn new(key: &ArchiveKey32) -> Result<Self, AtcError> {
        let mut key_text = legacy_key_text(key);
        let cipher = LegacyCipher::new_from_slice(&key_text)
            .map_err(|_| AtcError::InvalidState("legacy key length out of range"));
        zeroize::Zeroize::zeroize(&mut key_text);
        Ok(Self { cipher: cipher? })
    }

    pub fn decrypt(&self, buffer: &mut [u8; ATC_BUF_SIZE]) {
        for chunk in buffer.chunks_exact_mut(LEGACY_BLOCK) {
            self.cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
        }
    }

    /// Inverse of [`decrypt`](Self::decrypt). The library never writes legacy
    /// archives; this exists for building fixtures.
    pub fn encrypt(&self, buffer: &mut [u8; ATC_BUF_SIZE]) {
        for chunk in buffer.chunks_exact_mut(LEGACY_BLOCK) {
            self.cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
        }
    }
}

/// Password bytes up to the first NUL, then [`ATC_LEGACY_PASS_FOOTER`].
///
/// The last key byte is never part of the text, so a password filling all
/// 32 bytes is cut to 31.
pub fn legacy_key_text(key: &ArchiveKey32) -> Vec<u8> {
    let raw = &key.expose_secret()[..ATC_KEY_SIZE - 1];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let mut text = Vec::with_capacity(end + ATC_LEGACY_PASS_FOOTER.len());
    text.extend_from_slice(&raw[..end]);
    text.extend_from_slice(ATC_LEGACY_PASS_FOOTER);
    text
}
