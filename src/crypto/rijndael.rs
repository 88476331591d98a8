//! src/crypto/rijndael.rs
//! Rijndael block cipher with selectable block size
//!
//! The container encrypts with a 256-bit key *and* a 256-bit block, which AES
//! does not cover. This is plain Rijndael as submitted to the AES contest:
//! block sizes of 128, 192 or 256 bits, key sizes of 128, 192 or 256 bits.
//! With a 128-bit block it is exactly AES.
//!
//! Tables are generated at compile time from the GF(2^8) definition.

use zeroize::{Zeroize, ZeroizeOnDrop};

use secure_gate::RevealSecret;

use crate::aliases::ArchiveKey32;
use crate::consts::ATC_BUF_SIZE;
use crate::crypto::BlockCipher;
use crate::error::AtcError;

const MAX_NB: usize = 8;
const MAX_ROUNDS: usize = 14;
const MAX_ROUND_KEY_BYTES: usize = 4 * MAX_NB * (MAX_ROUNDS + 1);

const fn xtime(x: u8) -> u8 {
    (x << 1) ^ if x & 0x80 != 0 { 0x1b } else { 0 }
}

const fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        a = xtime(a);
        b >>= 1;
    }
    product
}

// a^254 == a^-1 in GF(2^8); 0 maps to 0
const fn gf_inv(a: u8) -> u8 {
    let mut result = 1u8;
    let mut base = a;
    let mut exp = 254u8;
    while exp != 0 {
        if exp & 1 != 0 {
            result = gf_mul(result, base);
        }
        base = gf_mul(base, base);
        exp >>= 1;
    }
    if a == 0 {
        0
    } else {
        result
    }
}

const fn build_sbox() -> [u8; 256] {
    let mut sbox = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let inv = gf_inv(i as u8);
        sbox[i] = inv
            ^ inv.rotate_left(1)
            ^ inv.rotate_left(2)
            ^ inv.rotate_left(3)
            ^ inv.rotate_left(4)
            ^ 0x63;
        i += 1;
    }
    sbox
}

const fn build_inv_sbox(sbox: &[u8; 256]) -> [u8; 256] {
    let mut inv = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        inv[sbox[i] as usize] = i as u8;
        i += 1;
    }
    inv
}

const SBOX: [u8; 256] = build_sbox();
const INV_SBOX: [u8; 256] = build_inv_sbox(&SBOX);

/// Row shift offsets (rows 1..3) for a given block width in 32-bit words.
const fn shift_offsets(nb: usize) -> [usize; 4] {
    if nb == 8 {
        [0, 1, 3, 4]
    } else {
        [0, 1, 2, 3]
    }
}

/// Expanded Rijndael key.
///
/// Produced once per session by [`Rijndael::new`] / [`Rijndael::make_key`];
/// round keys are wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Rijndael {
    round_keys: [u8; MAX_ROUND_KEY_BYTES],
    nb: usize,
    nr: usize,
}

impl std::fmt::Debug for Rijndael {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rijndael")
            .field("block_bits", &(self.nb * 32))
            .field("rounds", &self.nr)
            .finish_non_exhaustive()
    }
}

impl Rijndael {
    /// Key schedule for arbitrary Rijndael parameters.
    ///
    /// `key` must be 16, 24 or 32 bytes, `block_size` 16, 24 or 32.
    pub fn new(key: &[u8], block_size: usize) -> Result<Self, AtcError> {
        if !matches!(key.len(), 16 | 24 | 32) || !matches!(block_size, 16 | 24 | 32) {
            return Err(AtcError::InvalidState(
                "Rijndael key and block size must be 16, 24 or 32 bytes",
            ));
        }
        let nk = key.len() / 4;
        let nb = block_size / 4;
        let nr = nk.max(nb) + 6;

        let mut this = Self {
            round_keys: [0u8; MAX_ROUND_KEY_BYTES],
            nb,
            nr,
        };
        this.expand_key(key, nk);
        Ok(this)
    }

    /// The container's key schedule: 256-bit key, 256-bit block.
    pub fn make_key(key: &ArchiveKey32) -> Self {
        let nk = 8;
        let mut this = Self {
            round_keys: [0u8; MAX_ROUND_KEY_BYTES],
            nb: ATC_BUF_SIZE / 4,
            nr: 14,
        };
        this.expand_key(key.expose_secret(), nk);
        this
    }

    /// Block size in bytes.
    pub const fn block_size(&self) -> usize {
        self.nb * 4
    }

    fn expand_key(&mut self, key: &[u8], nk: usize) {
        let total_words = self.nb * (self.nr + 1);
        let w = &mut self.round_keys;
        w[..key.len()].copy_from_slice(key);

        let mut rcon = 1u8;
        for i in nk..total_words {
            let mut temp = [0u8; 4];
            temp.copy_from_slice(&w[4 * (i - 1)..4 * i]);

            if i % nk == 0 {
                temp.rotate_left(1);
                for b in temp.iter_mut() {
                    *b = SBOX[*b as usize];
                }
                temp[0] ^= rcon;
                rcon = xtime(rcon);
            } else if nk > 6 && i % nk == 4 {
                for b in temp.iter_mut() {
                    *b = SBOX[*b as usize];
                }
            }

            for j in 0..4 {
                w[4 * i + j] = w[4 * (i - nk) + j] ^ temp[j];
            }
        }
    }

    /// Encrypt one block in place (ECB, no chaining).
    pub fn encrypt(&self, block: &mut [u8]) {
        debug_assert_eq!(block.len(), self.block_size());

        self.add_round_key(block, 0);
        for round in 1..self.nr {
            sub_bytes(block, &SBOX);
            self.shift_rows(block, false);
            mix_columns(block);
            self.add_round_key(block, round);
        }
        sub_bytes(block, &SBOX);
        self.shift_rows(block, false);
        self.add_round_key(block, self.nr);
    }

    /// Decrypt one block in place (ECB, no chaining).
    pub fn decrypt(&self, block: &mut [u8]) {
        debug_assert_eq!(block.len(), self.block_size());

        self.add_round_key(block, self.nr);
        for round in (1..self.nr).rev() {
            self.shift_rows(block, true);
            sub_bytes(block, &INV_SBOX);
            self.add_round_key(block, round);
            inv_mix_columns(block);
        }
        self.shift_rows(block, true);
        sub_bytes(block, &INV_SBOX);
        self.add_round_key(block, 0);
    }

    #[inline(always)]
    fn add_round_key(&self, block: &mut [u8], round: usize) {
        let width = self.block_size();
        let key = &self.round_keys[round * width..(round + 1) * width];
        for (b, k) in block.iter_mut().zip(key) {
            *b ^= k;
        }
    }

    // state[r][c] lives at block[r + 4c]
    fn shift_rows(&self, block: &mut [u8], inverse: bool) {
        let nb = self.nb;
        let offsets = shift_offsets(nb);
        let mut row = [0u8; MAX_NB];

        for (r, &shift) in offsets.iter().enumerate().skip(1) {
            for c in 0..nb {
                row[c] = block[r + 4 * c];
            }
            for c in 0..nb {
                let src = if inverse {
                    (c + nb - shift) % nb
                } else {
                    (c + shift) % nb
                };
                block[r + 4 * c] = row[src];
            }
        }
    }
}

impl BlockCipher for Rijndael {
    #[inline(always)]
    fn encrypt_block(&self, block: &mut [u8; ATC_BUF_SIZE]) {
        self.encrypt(block);
    }

    #[inline(always)]
    fn decrypt_block(&self, block: &mut [u8; ATC_BUF_SIZE]) {
        self.decrypt(block);
    }
}

#[inline(always)]
fn sub_bytes(block: &mut [u8], table: &[u8; 256]) {
    for b in block.iter_mut() {
        *b = table[*b as usize];
    }
}

fn mix_columns(block: &mut [u8]) {
    for col in block.chunks_exact_mut(4) {
        let [a0, a1, a2, a3] = [col[0], col[1], col[2], col[3]];
        col[0] = xtime(a0) ^ (xtime(a1) ^ a1) ^ a2 ^ a3;
        col[1] = a0 ^ xtime(a1) ^ (xtime(a2) ^ a2) ^ a3;
        col[2] = a0 ^ a1 ^ xtime(a2) ^ (xtime(a3) ^ a3);
        col[3] = (xtime(a0) ^ a0) ^ a1 ^ a2 ^ xtime(a3);
    }
}

fn inv_mix_columns(block: &mut [u8]) {
    for col in block.chunks_exact_mut(4) {
        let [a0, a1, a2, a3] = [col[0], col[1], col[2], col[3]];
        col[0] = gf_mul(a0, 14) ^ gf_mul(a1, 11) ^ gf_mul(a2, 13) ^ gf_mul(a3, 9);
        col[1] = gf_mul(a0, 9) ^ gf_mul(a1, 14) ^ gf_mul(a2, 11) ^ gf_mul(a3, 13);
        col[2] = gf_mul(a0, 13) ^ gf_mul(a1, 9) ^ gf_mul(a2, 14) ^ gf_mul(a3, 11);
        col[3] = gf_mul(a0, 11) ^ gf_mul(a1, 13) ^ gf_mul(a2, 9) ^ gf_mul(a3, 14);
    }
}
