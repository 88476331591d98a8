// src/locker/mod.rs

//! Archive writer.
//!
//! One [`Locker`] writes one archive, in this order:
//!
//! 1. [`open`](Locker::open) writes the plain header and keys the cipher
//! 2. [`add_file_entry`](Locker::add_file_entry) for every entry
//! 3. [`write_encrypted_header`](Locker::write_encrypted_header)
//! 4. [`write_file_data`](Locker::write_file_data) once per sized entry, in
//!    entry order, with exactly that entry's size
//! 5. [`close`](Locker::close)
//!
//! ```
//! use attachecase_rs::{key_from_password, FileEntry, Locker, Unlocker};
//! use std::io::Cursor;
//!
//! let key = key_from_password("hunter2");
//! let body = b"hello, archive";
//!
//! let mut archive = Vec::new();
//! let mut locker = Locker::builder().with_iv_seed(1).build();
//! locker.open(&mut archive, &key)?;
//! locker.add_file_entry(FileEntry::new("hello.txt", body.len() as i64))?;
//! locker.write_encrypted_header(&mut archive)?;
//! locker.write_file_data(&mut archive, &mut &body[..], body.len() as u64)?;
//! locker.close()?;
//!
//! let mut src = Cursor::new(archive);
//! let mut unlocker = Unlocker::new();
//! unlocker.open(&mut src, Some(&key))?;
//! let mut out = Vec::new();
//! unlocker.extract_file_data(&mut out, &mut src, body.len())?;
//! assert_eq!(out, body);
//! # Ok::<(), attachecase_rs::AtcError>(())
//! ```

pub(crate) mod stream;
pub(crate) mod write;

use std::io::{Read, Write};

use crate::aliases::{ArchiveKey32, Iv32};
use crate::builders::LockerBuilder;
use crate::consts::ATC_BUF_SIZE;
use crate::crypto::{BlockCipherChain, IvGenerator, Rijndael};
use crate::entry::FileEntry;
use crate::error::AtcError;
use crate::header::{build_manifest, format_last_date_time, PlainHeader};
use crate::utils::is_null_key;

use stream::DeflateBridge;
pub use write::{write_encrypted_manifest, write_iv, write_octets, write_plain_header};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockerState {
    Created,
    Opened,
    HeaderWritten,
    Closed,
}

/// Writer for one archive.
pub struct Locker {
    state: LockerState,
    passwd_try_limit: u8,
    self_destruction: bool,
    compression_level: u32,
    create_time: i64,
    iv_source: IvGenerator,
    entries: Vec<FileEntry>,
    cipher: Option<BlockCipherChain>,
    chain: Iv32,
    bridge: Option<DeflateBridge>,
}

impl std::fmt::Debug for Locker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locker")
            .field("state", &self.state)
            .field("passwd_try_limit", &self.passwd_try_limit)
            .field("self_destruction", &self.self_destruction)
            .field("compression_level", &self.compression_level)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl Default for Locker {
    fn default() -> Self {
        LockerBuilder::new().build()
    }
}

impl Locker {
    /// Writer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> LockerBuilder {
        LockerBuilder::new()
    }

    pub(crate) fn from_parts(
        passwd_try_limit: u8,
        self_destruction: bool,
        compression_level: u32,
        create_time: i64,
        iv_source: IvGenerator,
    ) -> Self {
        Self {
            state: LockerState::Created,
            passwd_try_limit,
            self_destruction,
            compression_level,
            create_time,
            iv_source,
            entries: Vec::new(),
            cipher: None,
            chain: Iv32::new([0u8; ATC_BUF_SIZE]),
            bridge: None,
        }
    }

    /// Write the plain header and key the cipher.
    ///
    /// An all-zero key fails with [`AtcError::NullKey`] before anything is
    /// written.
    pub fn open<W: Write>(&mut self, dst: &mut W, key: &ArchiveKey32) -> Result<(), AtcError> {
        if self.state != LockerState::Created {
            return Err(AtcError::InvalidState("locker already opened"));
        }
        if is_null_key(key) {
            return Err(AtcError::NullKey);
        }

        let header = PlainHeader::current(self.passwd_try_limit, self.self_destruction);
        write_plain_header(dst, &header)?;

        self.cipher = Some(BlockCipherChain::new(Rijndael::make_key(key)));
        self.state = LockerState::Opened;
        tracing::debug!(
            passwd_try_limit = header.passwd_try_limit,
            self_destruction = header.self_destruction,
            "plain header written"
        );
        Ok(())
    }

    /// Queue an entry for the manifest.
    ///
    /// Both names must be non-empty and free of tabs and line breaks.
    pub fn add_file_entry(&mut self, entry: FileEntry) -> Result<(), AtcError> {
        match self.state {
            LockerState::Created | LockerState::Opened => {}
            LockerState::HeaderWritten => {
                return Err(AtcError::InvalidEntry(
                    "entries cannot be added after the manifest is written".into(),
                ))
            }
            LockerState::Closed => return Err(AtcError::InvalidState("locker is closed")),
        }

        if entry.name_legacy.is_empty() || entry.name_utf8.is_empty() {
            return Err(AtcError::InvalidEntry("entry name is empty".into()));
        }
        let breaks_line = |b: &u8| matches!(b, b'\t' | b'\r' | b'\n');
        if entry.name_legacy.iter().any(breaks_line)
            || entry.name_utf8.bytes().any(|b| breaks_line(&b))
        {
            return Err(AtcError::InvalidEntry(format!(
                "entry name contains a tab or line break: {:?}",
                entry.name_utf8
            )));
        }

        self.entries.push(entry);
        Ok(())
    }

    /// Write the encrypted manifest and the payload IV, and start the
    /// compressor.
    pub fn write_encrypted_header<W: Write>(&mut self, dst: &mut W) -> Result<(), AtcError> {
        if self.state != LockerState::Opened {
            return Err(AtcError::InvalidState(
                "encrypted header must follow open and be written once",
            ));
        }
        let cipher = self
            .cipher
            .as_ref()
            .ok_or(AtcError::InvalidState("cipher not keyed"))?;

        let date = format_last_date_time(self.create_time);
        let manifest = build_manifest(&self.entries, &date);

        self.chain = self.iv_source.next_iv();
        let manifest_size = write_encrypted_manifest(dst, &manifest, cipher, &mut self.chain)?;

        self.chain = self.iv_source.next_iv();
        write_iv(dst, &self.chain)?;

        let total_length = self.total_length();
        self.bridge = Some(DeflateBridge::new(self.compression_level, total_length));
        self.state = LockerState::HeaderWritten;

        tracing::debug!(
            entries = self.entries.len(),
            manifest_size,
            total_length,
            "encrypted header written"
        );
        Ok(())
    }

    /// Compress and encrypt `length` bytes read from `src`.
    ///
    /// Call once per entry with its declared size. When the running total
    /// reaches the sum of declared sizes the stream is finished and the padded
    /// last block is written.
    pub fn write_file_data<W: Write, R: Read>(
        &mut self,
        dst: &mut W,
        src: &mut R,
        length: u64,
    ) -> Result<(), AtcError> {
        if self.state != LockerState::HeaderWritten {
            return Err(AtcError::InvalidState(
                "file data must follow the encrypted header",
            ));
        }
        let (Some(cipher), Some(bridge)) = (self.cipher.as_ref(), self.bridge.as_mut()) else {
            return Err(AtcError::InvalidState("compressor not initialised"));
        };

        bridge.write(dst, src, length, cipher, &mut self.chain)
    }

    /// Release the compressor. Safe to call any number of times.
    pub fn close(&mut self) -> Result<(), AtcError> {
        if self.state == LockerState::Closed {
            return Ok(());
        }
        if let Some(bridge) = self.bridge.take() {
            if !bridge.is_complete() && self.total_length() > 0 {
                tracing::warn!(
                    written = bridge.total_written(),
                    declared = self.total_length(),
                    "locker closed before the payload stream was finished"
                );
            }
        }
        self.cipher = None;
        self.state = LockerState::Closed;
        Ok(())
    }

    /// Sum of all known entry sizes.
    pub fn total_length(&self) -> u64 {
        self.entries.iter().map(FileEntry::payload_size).sum()
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn passwd_try_limit(&self) -> u8 {
        self.passwd_try_limit
    }

    pub fn self_destruction(&self) -> bool {
        self.self_destruction
    }

    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    pub fn create_time(&self) -> i64 {
        self.create_time
    }

    pub fn is_closed(&self) -> bool {
        self.state == LockerState::Closed
    }
}

impl Drop for Locker {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::key_from_password;

    #[test]
    fn null_key_writes_nothing() {
        let mut out = Vec::new();
        let mut locker = Locker::new();
        let zero = ArchiveKey32::new([0u8; 32]);
        assert!(matches!(locker.open(&mut out, &zero), Err(AtcError::NullKey)));
        assert!(out.is_empty());
    }

    #[test]
    fn rejects_empty_and_multiline_names() {
        let mut locker = Locker::new();
        assert!(matches!(
            locker.add_file_entry(FileEntry::new("", 1)),
            Err(AtcError::InvalidEntry(_))
        ));

        let mut entry = FileEntry::new("a.txt", 1);
        entry.name_utf8.clear();
        assert!(matches!(locker.add_file_entry(entry), Err(AtcError::InvalidEntry(_))));

        assert!(matches!(
            locker.add_file_entry(FileEntry::new("a\tb", 1)),
            Err(AtcError::InvalidEntry(_))
        ));
    }

    #[test]
    fn state_order_enforced() {
        let mut out = Vec::new();
        let mut locker = Locker::new();
        assert!(matches!(
            locker.write_encrypted_header(&mut out),
            Err(AtcError::InvalidState(_))
        ));

        locker.open(&mut out, &key_from_password("k")).unwrap();
        assert!(matches!(
            locker.write_file_data(&mut out, &mut &b""[..], 0),
            Err(AtcError::InvalidState(_))
        ));

        locker.write_encrypted_header(&mut out).unwrap();
        assert!(matches!(
            locker.add_file_entry(FileEntry::new("late", 0)),
            Err(AtcError::InvalidEntry(_))
        ));
    }

    #[test]
    fn header_region_layout() {
        let mut out = Vec::new();
        let mut locker = Locker::builder().with_iv_seed(3).build();
        locker.open(&mut out, &key_from_password("k")).unwrap();
        assert_eq!(out.len(), 28);

        locker.add_file_entry(FileEntry::new("x", 0)).unwrap();
        locker.write_encrypted_header(&mut out).unwrap();

        let size = i32::from_le_bytes(out[28..32].try_into().unwrap()) as usize;
        assert_eq!(size % 32, 0);
        assert_eq!(out.len(), 28 + 4 + 32 + size + 32);
    }

    #[test]
    fn close_is_idempotent() {
        let mut locker = Locker::new();
        locker.close().unwrap();
        locker.close().unwrap();
        assert!(locker.is_closed());
    }
}
