//! src/builders/locker_builder.rs
//! Writer configuration

use crate::consts::{ATC_DEFAULT_PASSWORD_TRY_LIMIT, DEFAULT_COMPRESSION_LEVEL};
use crate::crypto::IvGenerator;
use crate::header::plain::clamp_try_limit;
use crate::locker::Locker;

/// Builder for [`Locker`].
///
/// Defaults: retry limit 3, no self-destruction, zlib level 6, creation time
/// = now, IVs from the operating system's entropy source.
#[derive(Debug, Clone)]
pub struct LockerBuilder {
    passwd_try_limit: u8,
    self_destruction: bool,
    compression_level: u32,
    create_time: Option<i64>,
    iv_seed: Option<u64>,
}

impl LockerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            passwd_try_limit: ATC_DEFAULT_PASSWORD_TRY_LIMIT,
            self_destruction: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            create_time: None,
            iv_seed: None,
        }
    }

    /// Retry limit stored in the header (outside `1..=10` falls back to 3).
    #[must_use]
    pub fn with_passwd_try_limit(mut self, limit: u8) -> Self {
        self.passwd_try_limit = clamp_try_limit(limit);
        self
    }

    #[must_use]
    pub fn with_self_destruction(mut self, enabled: bool) -> Self {
        self.self_destruction = enabled;
        self
    }

    /// zlib level, capped at 9.
    #[must_use]
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Unix time written as the manifest's `LastDateTime`.
    #[must_use]
    pub fn with_create_time(mut self, unix: i64) -> Self {
        self.create_time = Some(unix);
        self
    }

    /// Seed the IV generator for byte-identical output across runs.
    #[must_use]
    pub fn with_iv_seed(mut self, seed: u64) -> Self {
        self.iv_seed = Some(seed);
        self
    }

    #[must_use]
    pub const fn passwd_try_limit(&self) -> u8 {
        self.passwd_try_limit
    }

    #[must_use]
    pub const fn compression_level(&self) -> u32 {
        self.compression_level
    }

    #[must_use]
    pub fn build(self) -> Locker {
        let create_time = self
            .create_time
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        let iv_source = self
            .iv_seed
            .map_or_else(IvGenerator::from_os, IvGenerator::from_seed);

        Locker::from_parts(
            self.passwd_try_limit,
            self.self_destruction,
            self.compression_level,
            create_time,
            iv_source,
        )
    }
}

impl Default for LockerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
