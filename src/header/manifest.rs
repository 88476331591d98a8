//! src/header/manifest.rs
//! The encrypted manifest: two line-oriented blocks, one per name encoding
//!
//! ```text
//! Passcode:AttacheCase\n\r\n
//! LastDateTime:2024/01/31 12:00:00\n\r\n
//! Fn_0:<legacy name>\t<size|*>\t<attr>\t<chg_date>\t<chg_time>\t<crt_date>\t<crt_time>\r\n
//! EF BB BF
//! Passcode:AttacheCase\n\r\n
//! LastDateTime:2024/01/31 12:00:00\n\r\n
//! U_0:<utf-8 name>\t...\r\n
//! ```

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::consts::ATC_MANIFEST_SEPARATOR;
use crate::entry::FileEntry;
use crate::error::AtcError;
use crate::utils::{ttime_to_unix, unix_to_ttime, TTimeStamp};

const MANIFEST_PREAMBLE: &[u8] = b"Passcode:AttacheCase\n\r\n";
const LAST_DATE_TIME_LABEL: &str = "LastDateTime:";
const LEGACY_LABEL: &[u8] = b"Fn_";
const UTF8_LABEL: &[u8] = b"U_";
const DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Parsed manifest contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Text after `LastDateTime:` (local time of the writer, unparsed).
    pub last_date_time: String,
    pub entries: Vec<FileEntry>,
}

/// `LastDateTime` text for a Unix time, in the local time zone.
pub fn format_last_date_time(unix: i64) -> String {
    match Local.timestamp_opt(unix, 0).earliest() {
        Some(local) => local.format(DATE_FORMAT).to_string(),
        None => DateTime::<Utc>::from_timestamp(unix, 0)
            .unwrap_or_default()
            .format(DATE_FORMAT)
            .to_string(),
    }
}

/// Manifest plaintext for `entries`. The caller pads it to whole blocks.
pub fn build_manifest(entries: &[FileEntry], last_date_time: &str) -> Vec<u8> {
    let mut legacy = block_preamble(last_date_time);
    let mut utf8 = legacy.clone();

    for (index, entry) in entries.iter().enumerate() {
        let fields = entry_fields(entry);

        legacy.extend_from_slice(LEGACY_LABEL);
        legacy.extend_from_slice(format!("{index}:").as_bytes());
        legacy.extend_from_slice(&entry.name_legacy);
        legacy.extend_from_slice(fields.as_bytes());

        utf8.extend_from_slice(UTF8_LABEL);
        utf8.extend_from_slice(format!("{index}:").as_bytes());
        utf8.extend_from_slice(entry.name_utf8.as_bytes());
        utf8.extend_from_slice(fields.as_bytes());
    }

    let mut out = legacy;
    out.extend_from_slice(&ATC_MANIFEST_SEPARATOR);
    out.extend_from_slice(&utf8);
    out
}

fn block_preamble(last_date_time: &str) -> Vec<u8> {
    let mut block = MANIFEST_PREAMBLE.to_vec();
    block.extend_from_slice(LAST_DATE_TIME_LABEL.as_bytes());
    block.extend_from_slice(last_date_time.as_bytes());
    block.extend_from_slice(b"\n\r\n");
    block
}

// "\t<size|*>\t<attr>\t<chg_dt>\t<chg_tm>\t<crt_dt>\t<crt_tm>\r\n"
fn entry_fields(entry: &FileEntry) -> String {
    let size = if entry.has_known_size() {
        entry.size.to_string()
    } else {
        "*".to_string()
    };
    let change = unix_to_ttime(entry.change_unix_time);
    let create = unix_to_ttime(entry.create_unix_time);
    format!(
        "\t{size}\t{}\t{}\t{}\t{}\t{}\r\n",
        entry.attribute, change.date, change.time, create.date, create.time
    )
}

/// Parse decrypted manifest bytes.
///
/// `marker` must appear in the first line ([`AtcError::WrongKey`] otherwise).
/// Trailing NUL padding is ignored. When the legacy and UTF-8 blocks disagree
/// on the entry count the UTF-8 names are dropped and every entry gets an
/// empty `name_utf8`.
pub fn parse_manifest(bytes: &[u8], marker: &[u8]) -> Result<Manifest, AtcError> {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let lines: Vec<&[u8]> = bytes[..end]
        .split(|&b| b == b'\n')
        .filter(|line| *line != b"\r")
        .map(trim_cr)
        .collect();

    let first = lines.first().copied().unwrap_or_default();
    if !contains(first, marker) {
        return Err(AtcError::WrongKey);
    }
    let date_line = lines
        .get(1)
        .ok_or_else(|| AtcError::BrokenHeader("manifest has no LastDateTime line".into()))?;
    let date_line = String::from_utf8_lossy(date_line);
    let last_date_time = date_line
        .strip_prefix(LAST_DATE_TIME_LABEL)
        .unwrap_or(date_line.as_ref())
        .to_string();

    let legacy: Vec<&[u8]> = lines
        .iter()
        .copied()
        .filter(|l| l.starts_with(LEGACY_LABEL))
        .collect();
    let utf8: Vec<&[u8]> = lines
        .iter()
        .copied()
        .filter(|l| l.starts_with(UTF8_LABEL))
        .collect();

    let utf8_available = utf8.len() == legacy.len();
    if !utf8_available {
        tracing::warn!(
            legacy = legacy.len(),
            utf8 = utf8.len(),
            "manifest name blocks disagree, dropping UTF-8 names"
        );
    }

    let mut entries = Vec::with_capacity(legacy.len());
    for (i, line) in legacy.iter().enumerate() {
        let mut entry = parse_entry_line(line)?;
        if utf8_available {
            let (name, _) = split_name(utf8[i]);
            entry.name_utf8 = String::from_utf8_lossy(name).into_owned();
        }
        entries.push(entry);
    }

    Ok(Manifest {
        last_date_time,
        entries,
    })
}

/// Name is the text between the first ':' and the next tab.
fn split_name(line: &[u8]) -> (&[u8], Option<&[u8]>) {
    let start = line.iter().position(|&b| b == b':').map_or(0, |p| p + 1);
    let rest = &line[start..];
    match rest.iter().position(|&b| b == b'\t') {
        Some(tab) => (&rest[..tab], Some(&rest[tab + 1..])),
        None => (rest, None),
    }
}

fn parse_entry_line(line: &[u8]) -> Result<FileEntry, AtcError> {
    let (name, fields) = split_name(line);
    let fields = fields.ok_or_else(|| {
        AtcError::BrokenHeader(format!(
            "entry without fields: {}",
            String::from_utf8_lossy(line)
        ))
    })?;
    let fields: Vec<&[u8]> = fields.split(|&b| b == b'\t').collect();

    let size = parse_number::<i64>(fields[0]);
    let attribute = fields.get(1).map_or(-1, |f| parse_number::<i32>(f));

    let (change, create) = match fields.len() {
        6 => (
            TTimeStamp {
                date: parse_number(fields[2]),
                time: parse_number(fields[3]),
            },
            TTimeStamp {
                date: parse_number(fields[4]),
                time: parse_number(fields[5]),
            },
        ),
        // one value stands in for all four components
        3 => {
            let v = parse_number(fields[2]);
            let stamp = TTimeStamp { date: v, time: v };
            (stamp, stamp)
        }
        n => {
            return Err(AtcError::BrokenHeader(format!(
                "entry has {n} fields, expected 6 or 3"
            )))
        }
    };

    Ok(FileEntry {
        name_legacy: name.to_vec(),
        name_utf8: String::new(),
        size,
        attribute,
        change_unix_time: ttime_to_unix(change),
        create_unix_time: ttime_to_unix(create),
    })
}

/// Non-numeric fields (including `*`) read as `-1`.
fn parse_number<T: std::str::FromStr + From<i8>>(field: &[u8]) -> T {
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_else(|| T::from(-1))
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}
