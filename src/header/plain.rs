//! src/header/plain.rs
//! Plain (unencrypted) header and archive location
//!
//! Current layout, 28 bytes, integers little-endian:
//!
//! ```text
//! u8  sub_version | u8 reserved | u8 passwd_try_limit | u8 self_destruct
//! [u8; 16] token
//! i32 format_version
//! i32 algorithm_id        (version >= 104 only)
//! ```
//!
//! Up to version 103 the four info bytes instead hold the encrypted manifest
//! size and no algorithm id follows the version.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::consts::{
    ATC_ALGORITHM_BLOWFISH, ATC_ALGORITHM_RIJNDAEL, ATC_BROKEN_TOKEN, ATC_DATA_SUB_VERSION,
    ATC_DEFAULT_PASSWORD_TRY_LIMIT, ATC_MAX_PASSWORD_TRY_LIMIT, ATC_MIN_PASSWORD_TRY_LIMIT,
    ATC_PLAIN_HEADER_SIZE, ATC_SFX_TRAILER_SIZE, ATC_TOKEN,
};
use crate::error::AtcError;
use crate::version::VersionPolicy;

/// What a 16-byte token says about the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Live,
    Destroyed,
    Foreign,
}

#[inline]
pub fn classify_token(token: &[u8; 16]) -> TokenKind {
    if token == ATC_TOKEN {
        TokenKind::Live
    } else if token == ATC_BROKEN_TOKEN {
        TokenKind::Destroyed
    } else {
        TokenKind::Foreign
    }
}

/// The 20 bytes every version starts with: four info bytes and the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlainPrefix {
    pub info: [u8; 4],
    pub token: [u8; 16],
}

impl PlainPrefix {
    /// Read the prefix, or `None` if the stream ends first.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>, AtcError> {
        let mut raw = [0u8; 20];
        match reader.read_exact(&mut raw) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let mut info = [0u8; 4];
        let mut token = [0u8; 16];
        info.copy_from_slice(&raw[..4]);
        token.copy_from_slice(&raw[4..]);
        Ok(Some(Self { info, token }))
    }

    pub fn token_kind(&self) -> TokenKind {
        classify_token(&self.token)
    }
}

/// Decoded plain header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlainHeader {
    pub sub_version: u8,
    /// Clamped to `1..=10`, `3` when absent.
    pub passwd_try_limit: u8,
    pub self_destruction: bool,
    pub version: i32,
    pub algorithm: i32,
    /// Byte length of the encrypted manifest (a multiple of 32).
    pub manifest_size: i32,
}

impl PlainHeader {
    /// Header this crate writes. The manifest size is not part of the 28 bytes
    /// and is left at zero.
    pub fn current(passwd_try_limit: u8, self_destruction: bool) -> Self {
        Self {
            sub_version: ATC_DATA_SUB_VERSION,
            passwd_try_limit: clamp_try_limit(passwd_try_limit),
            self_destruction,
            version: VersionPolicy::current(ATC_DATA_SUB_VERSION).version(),
            algorithm: ATC_ALGORITHM_RIJNDAEL,
            manifest_size: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; ATC_PLAIN_HEADER_SIZE] {
        let mut out = [0u8; ATC_PLAIN_HEADER_SIZE];
        out[0] = self.sub_version;
        out[1] = 0;
        out[2] = self.passwd_try_limit;
        out[3] = u8::from(self.self_destruction);
        out[4..20].copy_from_slice(ATC_TOKEN);
        out[20..24].copy_from_slice(&self.version.to_le_bytes());
        out[24..28].copy_from_slice(&self.algorithm.to_le_bytes());
        out
    }

    /// Read everything after the prefix up to (not including) the manifest IV.
    ///
    /// Fails with [`AtcError::UnsupportedVersion`] before reading past the
    /// version field.
    pub fn read_after_prefix<R: Read>(
        prefix: &PlainPrefix,
        reader: &mut R,
    ) -> Result<(Self, VersionPolicy), AtcError> {
        let version = read_i32(reader)?;
        let sub_version = prefix.info[0];
        let policy = VersionPolicy::check(version, sub_version)?;

        let header = if policy.has_extended_header() {
            let algorithm = read_i32(reader)?;
            let manifest_size = read_i32(reader)?;
            let (passwd_try_limit, self_destruction) = if policy.has_destruct_fields() {
                (clamp_try_limit(prefix.info[2]), prefix.info[3] != 0)
            } else {
                (ATC_DEFAULT_PASSWORD_TRY_LIMIT, false)
            };
            Self {
                sub_version,
                passwd_try_limit,
                self_destruction,
                version,
                algorithm,
                manifest_size,
            }
        } else {
            Self {
                sub_version,
                passwd_try_limit: ATC_DEFAULT_PASSWORD_TRY_LIMIT,
                self_destruction: false,
                version,
                algorithm: ATC_ALGORITHM_BLOWFISH,
                manifest_size: i32::from_le_bytes(prefix.info),
            }
        };

        if header.manifest_size < 0 {
            return Err(AtcError::BrokenHeader(format!(
                "negative manifest size {}",
                header.manifest_size
            )));
        }
        Ok((header, policy))
    }

    /// Decode a complete plain header from bytes, including the manifest size
    /// field that follows it in current archives.
    pub fn parse(bytes: &[u8]) -> Result<(Self, VersionPolicy), AtcError> {
        let mut cursor = std::io::Cursor::new(bytes);
        let prefix = PlainPrefix::read_from(&mut cursor)?.ok_or(AtcError::UnrecognizedFormat)?;
        match prefix.token_kind() {
            TokenKind::Live => Self::read_after_prefix(&prefix, &mut cursor),
            TokenKind::Destroyed => Err(AtcError::DestroyedArchive),
            TokenKind::Foreign => Err(AtcError::UnrecognizedFormat),
        }
    }
}

/// Out-of-range limits fall back to the default.
pub fn clamp_try_limit(limit: u8) -> u8 {
    if (ATC_MIN_PASSWORD_TRY_LIMIT..=ATC_MAX_PASSWORD_TRY_LIMIT).contains(&limit) {
        limit
    } else {
        ATC_DEFAULT_PASSWORD_TRY_LIMIT
    }
}

/// Where a container sits inside a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLocation {
    /// Offset of the plain header.
    pub start: u64,
    /// Offset one past the last payload byte.
    pub end: u64,
    /// Found through the trailing length of a self-extracting executable.
    pub embedded: bool,
}

/// Find the container and read its prefix. On success the reader sits just
/// past the prefix.
pub(crate) fn locate<R: Read + Seek>(
    reader: &mut R,
) -> Result<(ArchiveLocation, PlainPrefix), AtcError> {
    reader.seek(SeekFrom::Start(0))?;
    if let Some(prefix) = PlainPrefix::read_from(reader)? {
        match prefix.token_kind() {
            TokenKind::Live => {
                let end = reader.seek(SeekFrom::End(0))?;
                reader.seek(SeekFrom::Start(20))?;
                return Ok((
                    ArchiveLocation {
                        start: 0,
                        end,
                        embedded: false,
                    },
                    prefix,
                ));
            }
            TokenKind::Destroyed => return Err(AtcError::DestroyedArchive),
            TokenKind::Foreign => {}
        }
    }

    locate_embedded(reader)
}

fn locate_embedded<R: Read + Seek>(
    reader: &mut R,
) -> Result<(ArchiveLocation, PlainPrefix), AtcError> {
    let total = reader.seek(SeekFrom::End(0))?;
    let trailer = ATC_SFX_TRAILER_SIZE as u64;
    if total < trailer {
        return Err(AtcError::UnrecognizedFormat);
    }

    let end = total - trailer;
    reader.seek(SeekFrom::Start(end))?;
    let mut raw = [0u8; ATC_SFX_TRAILER_SIZE];
    reader.read_exact(&mut raw)?;
    let archive_len = i64::from_le_bytes(raw);

    let start = u64::try_from(archive_len)
        .ok()
        .and_then(|len| end.checked_sub(len))
        .ok_or(AtcError::UnrecognizedFormat)?;

    reader.seek(SeekFrom::Start(start))?;
    match PlainPrefix::read_from(reader)? {
        Some(prefix) if prefix.token_kind() == TokenKind::Live && start + 20 <= end => {
            tracing::debug!(start, archive_len, "embedded archive located");
            Ok((
                ArchiveLocation {
                    start,
                    end,
                    embedded: true,
                },
                prefix,
            ))
        }
        _ => Err(AtcError::UnrecognizedFormat),
    }
}

/// Report whether `reader` holds a container, and where, without a key.
///
/// The stream position is restored before returning.
pub fn probe<R: Read + Seek>(reader: &mut R) -> Result<ArchiveLocation, AtcError> {
    let original = reader.stream_position()?;
    let result = locate(reader).map(|(location, _)| location);
    reader.seek(SeekFrom::Start(original))?;
    result
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32, AtcError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}
