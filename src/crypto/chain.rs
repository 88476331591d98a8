//! src/crypto/chain.rs
//! CBC chaining over 32-byte blocks with a caller-owned chain buffer
//!
//! The chain value lives outside the cipher so one session can keep separate
//! chains for the manifest and the payload region (each starts from its own IV).

use secure_gate::{RevealSecret, RevealSecretMut};

use crate::aliases::Iv32;
use crate::consts::ATC_BUF_SIZE;
use crate::crypto::rijndael::Rijndael;
use crate::crypto::BlockCipher;
use crate::utils::xor_blocks;

/// A block cipher run in CBC mode, one 32-byte block per call.
#[derive(Debug, Clone)]
pub struct BlockCipherChain<C: BlockCipher = Rijndael> {
    cipher: C,
}

impl<C: BlockCipher> BlockCipherChain<C> {
    pub fn new(cipher: C) -> Self {
        Self { cipher }
    }

    /// `block ^= chain`, encrypt in place, then `chain = block`.
    #[inline(always)]
    pub fn encrypt(&self, block: &mut [u8; ATC_BUF_SIZE], chain: &mut Iv32) {
        let mut mixed = [0u8; ATC_BUF_SIZE];
        xor_blocks(block, chain.expose_secret(), &mut mixed);
        *block = mixed;
        self.cipher.encrypt_block(block);
        chain.expose_secret_mut().copy_from_slice(block);
    }

    /// Decrypt in place, XOR with `chain`, then `chain` = the ciphertext that
    /// came in.
    #[inline(always)]
    pub fn decrypt(&self, block: &mut [u8; ATC_BUF_SIZE], chain: &mut Iv32) {
        let ciphertext = *block;
        self.cipher.decrypt_block(block);
        let mut plain = [0u8; ATC_BUF_SIZE];
        xor_blocks(block, chain.expose_secret(), &mut plain);
        *block = plain;
        chain.expose_secret_mut().copy_from_slice(&ciphertext);
    }
}
