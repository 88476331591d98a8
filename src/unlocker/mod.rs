// src/unlocker/mod.rs

//! Archive reader.
//!
//! [`Unlocker::open`] locates the container (at offset 0 or embedded in a
//! self-extracting executable), checks the key against the manifest and
//! parses the entries. Payload bytes are then pulled with
//! [`Unlocker::extract_file_data`] from the same stream.

pub(crate) mod read;
pub(crate) mod stream;

use std::io::{Read, Seek, SeekFrom, Write};

use crate::aliases::{ArchiveKey32, Iv32};
use crate::consts::ATC_BUF_SIZE;
use crate::crypto::CipherMode;
use crate::entry::FileEntry;
use crate::error::AtcError;
use crate::header::plain::locate;
use crate::header::{parse_manifest, ArchiveLocation, PlainHeader};
use crate::utils::is_null_key;

pub use read::{read_encrypted_manifest, read_exact_span, read_iv};
use stream::InflateBridge;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnlockerState {
    Created,
    HeaderParsed,
    Closed,
}

/// Reader for one archive.
pub struct Unlocker {
    state: UnlockerState,
    location: Option<ArchiveLocation>,
    header: Option<PlainHeader>,
    last_date_time: String,
    entries: Vec<FileEntry>,
    cipher: Option<CipherMode>,
    chain: Iv32,
    payload_len: u64,
    bridge: Option<InflateBridge>,
}

impl std::fmt::Debug for Unlocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unlocker")
            .field("state", &self.state)
            .field("location", &self.location)
            .field("header", &self.header)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl Default for Unlocker {
    fn default() -> Self {
        Self::new()
    }
}

impl Unlocker {
    pub fn new() -> Self {
        Self {
            state: UnlockerState::Created,
            location: None,
            header: None,
            last_date_time: String::new(),
            entries: Vec::new(),
            cipher: None,
            chain: Iv32::new([0u8; ATC_BUF_SIZE]),
            payload_len: 0,
            bridge: None,
        }
    }

    /// Open the archive in `src`.
    ///
    /// With `key = None` this only checks that `src` holds a container
    /// (and where) and returns `Ok(())` without reading further. On success
    /// with a key, `src` is left at the first payload block. On any error, and
    /// after a key-less probe, `src` is put back where it was.
    ///
    /// A failed open can be retried with another key.
    pub fn open<R: Read + Seek>(
        &mut self,
        src: &mut R,
        key: Option<&ArchiveKey32>,
    ) -> Result<(), AtcError> {
        if self.state != UnlockerState::Created {
            return Err(AtcError::InvalidState("unlocker already opened"));
        }

        let original = src.stream_position()?;
        match self.open_inner(src, key) {
            Ok(true) => {
                self.state = UnlockerState::HeaderParsed;
                Ok(())
            }
            Ok(false) => {
                src.seek(SeekFrom::Start(original))?;
                Ok(())
            }
            Err(e) => {
                self.reset();
                if let Err(seek_err) = src.seek(SeekFrom::Start(original)) {
                    tracing::warn!(error = %seek_err, "could not restore stream position");
                }
                Err(e)
            }
        }
    }

    // Ok(false): probe only
    fn open_inner<R: Read + Seek>(
        &mut self,
        src: &mut R,
        key: Option<&ArchiveKey32>,
    ) -> Result<bool, AtcError> {
        let (location, prefix) = locate(src)?;
        self.location = Some(location);

        let Some(key) = key else {
            tracing::debug!(
                start = location.start,
                embedded = location.embedded,
                "format probe"
            );
            return Ok(false);
        };
        if is_null_key(key) {
            return Err(AtcError::NullKey);
        }

        let (header, policy) = PlainHeader::read_after_prefix(&prefix, src)?;
        let manifest_size = header.manifest_size as u64;

        let mut chain = if policy.has_payload_iv() {
            read_iv(src)?
        } else {
            Iv32::new([0u8; ATC_BUF_SIZE])
        };

        let cursor = src.stream_position()?;
        let manifest_blocks = manifest_size.div_ceil(ATC_BUF_SIZE as u64) * ATC_BUF_SIZE as u64;
        if cursor.saturating_add(manifest_blocks) > location.end {
            return Err(AtcError::BrokenHeader(format!(
                "manifest of {manifest_size} bytes runs past the end of the archive"
            )));
        }

        let cipher = CipherMode::new(policy.cipher(), key)?;
        let plain = read_encrypted_manifest(
            src,
            manifest_size as usize,
            &cipher,
            &mut chain,
            policy.manifest_marker(),
        )?;
        let manifest = parse_manifest(&plain, policy.manifest_marker())?;

        let cursor = src.stream_position()?;
        let trailing_iv = if policy.has_payload_iv() {
            ATC_BUF_SIZE as u64
        } else {
            0
        };
        let payload_len = location
            .end
            .saturating_sub(cursor)
            .saturating_sub(trailing_iv);
        let payload_len = payload_len - payload_len % ATC_BUF_SIZE as u64;

        if policy.has_payload_iv() {
            chain = read_iv(src)?;
        }

        tracing::debug!(
            version = policy.version(),
            sub_version = policy.sub_version(),
            legacy = policy.is_legacy(),
            entries = manifest.entries.len(),
            payload_len,
            "manifest parsed"
        );

        self.bridge = Some(InflateBridge::new(payload_len, policy.is_legacy()));
        self.header = Some(header);
        self.last_date_time = manifest.last_date_time;
        self.entries = manifest.entries;
        self.cipher = Some(cipher);
        self.chain = chain;
        self.payload_len = payload_len;
        Ok(true)
    }

    fn reset(&mut self) {
        self.location = None;
        self.header = None;
        self.last_date_time.clear();
        self.entries.clear();
        self.cipher = None;
        self.bridge = None;
        self.payload_len = 0;
    }

    /// Entry at `index`.
    pub fn entry(&self, index: usize) -> Result<&FileEntry, AtcError> {
        self.entries.get(index).ok_or(AtcError::InvalidIndex {
            index,
            len: self.entries.len(),
        })
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Read, decrypt and inflate until `length` plaintext bytes have been
    /// written to `dst`, or the payload ends. Returns the byte count written.
    pub fn extract_file_data<W: Write, R: Read>(
        &mut self,
        dst: &mut W,
        src: &mut R,
        length: usize,
    ) -> Result<usize, AtcError> {
        if self.state != UnlockerState::HeaderParsed {
            return Err(AtcError::InvalidState("extract requires an opened archive"));
        }
        let (Some(cipher), Some(bridge)) = (self.cipher.as_ref(), self.bridge.as_mut()) else {
            return Err(AtcError::InvalidState("decompressor not initialised"));
        };
        bridge.extract(dst, src, length, cipher, &mut self.chain)
    }

    /// Release the decompressor. Safe to call any number of times.
    pub fn close(&mut self) -> Result<(), AtcError> {
        if self.state == UnlockerState::Closed {
            return Ok(());
        }
        self.bridge = None;
        self.cipher = None;
        self.state = UnlockerState::Closed;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.state == UnlockerState::Closed
    }

    /// Where the archive was found. Set after any successful `open`,
    /// including a probe.
    pub fn location(&self) -> Option<ArchiveLocation> {
        self.location
    }

    pub fn data_version(&self) -> Option<i32> {
        self.header.map(|h| h.version)
    }

    pub fn data_sub_version(&self) -> Option<u8> {
        self.header.map(|h| h.sub_version)
    }

    /// Algorithm id from the header (`0` Blowfish, `1` Rijndael).
    pub fn algorithm(&self) -> Option<i32> {
        self.header.map(|h| h.algorithm)
    }

    pub fn passwd_try_limit(&self) -> Option<u8> {
        self.header.map(|h| h.passwd_try_limit)
    }

    pub fn self_destruction(&self) -> Option<bool> {
        self.header.map(|h| h.self_destruction)
    }

    /// `LastDateTime` text from the manifest.
    pub fn last_date_time(&self) -> &str {
        &self.last_date_time
    }

    /// Ciphertext bytes in the payload region.
    pub fn payload_length(&self) -> u64 {
        self.payload_len
    }
}

impl Drop for Unlocker {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
