// src/lib.rs

//! Reader and writer for the AttacheCase encrypted archive container.
//!
//! A container is a small plain header, a Rijndael-256 CBC encrypted
//! manifest listing the entries, and one zlib stream holding every entry's
//! bytes back to back, encrypted in 32-byte blocks. Archives written by format
//! versions up to 103 (Blowfish) can be read; version 105 is written.

pub mod aliases;
pub mod builders;
pub mod consts;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod header;
pub mod locker;
pub mod unlocker;
pub mod utils;
pub mod version;

// High-level API
pub use builders::LockerBuilder;
pub use entry::FileEntry;
pub use error::AtcError;
pub use locker::Locker;
pub use unlocker::Unlocker;

pub use aliases::ArchiveKey32;
pub use header::{probe, ArchiveLocation};
pub use utils::{key_from_password, ttime_to_unix, unix_to_ttime, TTimeStamp};
pub use version::{CipherKind, VersionPolicy};
