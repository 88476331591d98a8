//! # Version Policy
//!
//! Everything that differs between format versions is decided here, once, at
//! open time. The rest of the pipeline is version-agnostic.
//!
//! | Format version | Cipher                | Header after version         | Manifest marker |
//! |----------------|-----------------------|------------------------------|-----------------|
//! | ≤ 102          | Blowfish ECB          | none (size in info bytes)    | `AttacheCase`   |
//! | 103            | Blowfish ECB          | none (size in info bytes)    | `Passcode`      |
//! | 104 – 105      | Rijndael-256 CBC      | algorithm id + manifest size | `Passcode`      |
//! | ≥ 106          | rejected              |                              |                 |
//!
//! For version 104 and later, sub-version 6 added the password retry limit and
//! the self-destruct flag to the plain header.

use crate::consts::{
    ATC_DATA_FILE_VERSION, ATC_LEGACY_MARKER_MAX_VERSION, ATC_LEGACY_MAX_VERSION,
    ATC_SUB_VERSION_WITH_DESTRUCT, ATC_UNRELATED_VERSION_THRESHOLD,
};
use crate::error::AtcError;

/// Which cipher protects the manifest and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherKind {
    /// Blowfish in ECB mode, keyed with the password text plus a fixed suffix.
    Blowfish,
    /// Rijndael with a 256-bit block in CBC mode.
    Rijndael,
}

/// Per-version behaviour of one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionPolicy {
    version: i32,
    sub_version: u8,
}

impl VersionPolicy {
    /// Validate a format version read from a plain header.
    ///
    /// Versions newer than [`ATC_DATA_FILE_VERSION`] are rejected, whether they
    /// are a future revision of this format or belong to an unrelated family
    /// (≥ [`ATC_UNRELATED_VERSION_THRESHOLD`]).
    pub fn check(version: i32, sub_version: u8) -> Result<Self, AtcError> {
        if version > ATC_DATA_FILE_VERSION {
            if version >= ATC_UNRELATED_VERSION_THRESHOLD {
                tracing::debug!(version, "format version belongs to an unrelated container");
            }
            return Err(AtcError::UnsupportedVersion(version));
        }
        Ok(Self {
            version,
            sub_version,
        })
    }

    /// Policy of the version this crate writes.
    pub const fn current(sub_version: u8) -> Self {
        Self {
            version: ATC_DATA_FILE_VERSION,
            sub_version,
        }
    }

    pub const fn version(&self) -> i32 {
        self.version
    }

    pub const fn sub_version(&self) -> u8 {
        self.sub_version
    }

    pub const fn is_legacy(&self) -> bool {
        self.version <= ATC_LEGACY_MAX_VERSION
    }

    pub const fn cipher(&self) -> CipherKind {
        if self.is_legacy() {
            CipherKind::Blowfish
        } else {
            CipherKind::Rijndael
        }
    }

    /// Algorithm id and manifest size follow the version field.
    pub const fn has_extended_header(&self) -> bool {
        !self.is_legacy()
    }

    /// A fresh IV sits between the manifest and the payload.
    pub const fn has_payload_iv(&self) -> bool {
        !self.is_legacy()
    }

    /// Retry limit and self-destruct bytes are meaningful.
    pub const fn has_destruct_fields(&self) -> bool {
        !self.is_legacy() && self.sub_version >= ATC_SUB_VERSION_WITH_DESTRUCT
    }

    /// Substring the first decrypted manifest block must contain.
    pub const fn manifest_marker(&self) -> &'static [u8] {
        if self.version <= ATC_LEGACY_MARKER_MAX_VERSION {
            b"AttacheCase"
        } else {
            b"Passcode"
        }
    }
}
