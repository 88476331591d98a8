//! # Constants
//!
//! This module defines the constants of the AttacheCase container format:
//! format versions, buffer granularities, header tokens and the limits that
//! apply to the password retry counter.

/// The format version written by [`Locker`](crate::Locker).
///
/// Readers accept every version up to and including this one.
pub const ATC_DATA_FILE_VERSION: i32 = 105;

/// The sub-version written by [`Locker`](crate::Locker).
pub const ATC_DATA_SUB_VERSION: u8 = 6;

/// Highest format version that still uses the legacy Blowfish stream cipher.
pub const ATC_LEGACY_MAX_VERSION: i32 = 103;

/// Highest format version whose manifest carries only the `AttacheCase` marker.
pub const ATC_LEGACY_MARKER_MAX_VERSION: i32 = 102;

/// Format versions at or above this value belong to an unrelated container family.
pub const ATC_UNRELATED_VERSION_THRESHOLD: i32 = 200;

/// First sub-version that carries the retry-limit and self-destruct bytes.
pub const ATC_SUB_VERSION_WITH_DESTRUCT: u8 = 6;

/// Key buffer size (256-bit).
pub const ATC_KEY_SIZE: usize = 32;

/// Cipher block size. Rijndael runs with a 256-bit block here.
pub const ATC_BUF_SIZE: usize = 32;

/// Read-side decompression chunk size.
pub const ATC_LARGE_BUF_SIZE: usize = 1024;

/// Default number of password attempts before a caller should self-destruct.
pub const ATC_DEFAULT_PASSWORD_TRY_LIMIT: u8 = 3;
/// Lowest accepted retry limit.
pub const ATC_MIN_PASSWORD_TRY_LIMIT: u8 = 1;
/// Highest accepted retry limit.
pub const ATC_MAX_PASSWORD_TRY_LIMIT: u8 = 10;

/// Algorithm id stored in the plain header for the legacy Blowfish cipher.
pub const ATC_ALGORITHM_BLOWFISH: i32 = 0;
/// Algorithm id stored in the plain header for Rijndael (current).
pub const ATC_ALGORITHM_RIJNDAEL: i32 = 1;

/// Token of a live archive.
pub const ATC_TOKEN: &[u8; 16] = b"_AttacheCaseData";
/// Token left behind once an archive has been self-destructed.
pub const ATC_BROKEN_TOKEN: &[u8; 16] = b"_Atc_Broken_Data";

/// Size of the plain header written by the current format.
pub const ATC_PLAIN_HEADER_SIZE: usize = 28;
/// Size of the plain header prefix shared by every version (info bytes + token).
pub const ATC_PLAIN_PREFIX_SIZE: usize = 20;
/// Size of the trailing archive length field of a self-extracting executable.
pub const ATC_SFX_TRAILER_SIZE: usize = 8;

/// Suffix appended to the password text to form the legacy Blowfish key.
pub const ATC_LEGACY_PASS_FOOTER: &[u8] = b"_AttacheCase-M.Hibara";

/// Separator between the legacy-encoded and UTF-8 manifest blocks.
pub const ATC_MANIFEST_SEPARATOR: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Days between 0001-01-01 (proleptic Gregorian) and 1970-01-01.
pub const DAYS_BETWEEN_AD_AND_UNIX_EPOCH: i64 = 719_162;

/// Default zlib compression level (what `Z_DEFAULT_COMPRESSION` maps to).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;
