//! Utility functions used across the library.

use secure_gate::{RevealSecret, RevealSecretMut};

use crate::aliases::ArchiveKey32;
use crate::consts::{ATC_BUF_SIZE, ATC_KEY_SIZE, DAYS_BETWEEN_AD_AND_UNIX_EPOCH};

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// XORs two 32-byte blocks and writes the result to `output`.
///
/// # Panics (by contract)
///
/// Panics if any slice is shorter than 32 bytes. Every caller passes the
/// `expose_secret()` view of a [`Block32`](crate::aliases::Block32) or
/// [`Iv32`](crate::aliases::Iv32), so this never happens in practice.
#[inline(always)]
pub const fn xor_blocks(block_a: &[u8], block_b: &[u8], output: &mut [u8]) {
    let mut i = 0;
    while i < ATC_BUF_SIZE {
        output[i] = block_a[i] ^ block_b[i];
        i += 1;
    }
}

/// A timestamp in the host platform's encoding: a proleptic Gregorian day
/// serial (0001-01-01 is day 1) plus milliseconds since midnight, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TTimeStamp {
    pub date: i32,
    pub time: i32,
}

/// Converts a Unix timestamp (seconds) into a [`TTimeStamp`].
///
/// Sub-second precision does not exist on the Unix side, so `time` is always
/// a multiple of 1000. Dates before 1970 are floored to the previous day.
///
/// ```
/// use attachecase_rs::utils::{unix_to_ttime, TTimeStamp};
///
/// assert_eq!(unix_to_ttime(0), TTimeStamp { date: 719_163, time: 0 });
/// assert_eq!(unix_to_ttime(86_399), TTimeStamp { date: 719_163, time: 86_399_000 });
/// ```
pub fn unix_to_ttime(unix: i64) -> TTimeStamp {
    let days = unix.div_euclid(SECONDS_PER_DAY);
    let seconds = unix.rem_euclid(SECONDS_PER_DAY);

    let date = (DAYS_BETWEEN_AD_AND_UNIX_EPOCH + days + 1).clamp(i32::MIN as i64, i32::MAX as i64);

    TTimeStamp {
        date: date as i32,
        time: (seconds * 1000) as i32,
    }
}

/// Converts a [`TTimeStamp`] back into a Unix timestamp (seconds).
///
/// Milliseconds are truncated toward zero.
pub fn ttime_to_unix(stamp: TTimeStamp) -> i64 {
    let days_from_epoch = stamp.date as i64 - DAYS_BETWEEN_AD_AND_UNIX_EPOCH - 1;
    days_from_epoch * SECONDS_PER_DAY + stamp.time as i64 / 1000
}

/// Builds the 32-byte key buffer from password text.
///
/// The format keys Rijndael with the raw password bytes, zero padded; anything
/// beyond 32 bytes is dropped. The legacy cipher later reads the same buffer
/// back as a NUL-terminated string.
pub fn key_from_password(password: &str) -> ArchiveKey32 {
    let mut key = ArchiveKey32::new([0u8; ATC_KEY_SIZE]);
    let bytes = password.as_bytes();
    let len = bytes.len().min(ATC_KEY_SIZE);
    key.expose_secret_mut()[..len].copy_from_slice(&bytes[..len]);
    key
}

/// `true` when every byte of the key buffer is zero.
#[inline]
pub fn is_null_key(key: &ArchiveKey32) -> bool {
    key.expose_secret().iter().all(|&b| b == 0)
}
