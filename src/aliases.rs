//! # Secure-Gate Type Aliases
//!
//! Fixed-size secret buffers built on [`secure-gate`](https://github.com/Slurp9187/secure-gate).
//! Every type here zeroizes on drop and only hands out its bytes through an
//! explicit `.expose_secret()` / `.expose_secret_mut()`.
//!
//! - [`SpanBuffer<N>`] - generic secure stack buffer
//! - [`ArchiveKey32`] - the 32-byte key buffer (password text, zero padded)
//! - [`Iv32`] - initialization vector / CBC chain buffer
//! - [`Block32`] - one cipher block of manifest or payload

/// Generic secure stack buffer (direct alias to secure-gate's `Fixed`).
pub type SpanBuffer<const N: usize> = secure_gate::Fixed<[u8; N]>;

pub type ArchiveKey32 = SpanBuffer<32>;
pub type Iv32 = SpanBuffer<32>; // manifest IV, payload IV, running chain value
pub type Block32 = SpanBuffer<32>; // one Rijndael-256 block
