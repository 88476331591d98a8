//! tests/unlocker_tests.rs
//! Reader behaviour on wrong keys, damaged headers and embedded archives

mod common;

use attachecase_rs::consts::ATC_BROKEN_TOKEN;
use attachecase_rs::{key_from_password, probe, AtcError, ArchiveKey32, Unlocker};
use common::{
    archive_with_manifest, entry, lock, manifest_block, payload, seeded_locker, sfx_wrap,
    test_key, WRONG_PASSWORD,
};
use std::io::{Cursor, Seek, SeekFrom};

fn sample_archive() -> (Vec<u8>, Vec<u8>) {
    let data = payload(777, 3);
    let archive = lock(
        &[(entry(0, 777), data.clone())],
        &test_key(),
        seeded_locker(),
    );
    (archive, data)
}

#[test]
fn wrong_key_leaves_position_and_allows_retry() {
    let (archive, data) = sample_archive();
    let mut src = Cursor::new(archive);
    src.seek(SeekFrom::Start(13)).unwrap();

    let mut unlocker = Unlocker::new();
    let err = unlocker
        .open(&mut src, Some(&key_from_password(WRONG_PASSWORD)))
        .unwrap_err();
    assert!(matches!(err, AtcError::WrongKey), "got {err:?}");
    assert_eq!(src.stream_position().unwrap(), 13);
    assert_eq!(unlocker.entry_count(), 0);

    unlocker.open(&mut src, Some(&test_key())).unwrap();
    let mut out = Vec::new();
    unlocker.extract_file_data(&mut out, &mut src, 777).unwrap();
    assert_eq!(out, data);
}

#[test]
fn null_key_on_read_is_key_error() {
    let (archive, _) = sample_archive();
    let mut src = Cursor::new(archive);
    let zero = ArchiveKey32::new([0u8; 32]);
    assert!(matches!(
        Unlocker::new().open(&mut src, Some(&zero)),
        Err(AtcError::NullKey)
    ));
    assert_eq!(src.stream_position().unwrap(), 0);
}

#[test]
fn probe_without_key() {
    let (archive, _) = sample_archive();
    let mut src = Cursor::new(archive);
    src.seek(SeekFrom::Start(5)).unwrap();

    let mut unlocker = Unlocker::new();
    unlocker.open(&mut src, None).unwrap();
    assert_eq!(src.stream_position().unwrap(), 5);
    assert_eq!(unlocker.entry_count(), 0);
    let location = unlocker.location().unwrap();
    assert_eq!(location.start, 0);
    assert!(!location.embedded);

    // a probe does not consume the session
    unlocker.open(&mut src, Some(&test_key())).unwrap();
    assert_eq!(unlocker.entry_count(), 1);
}

#[test]
fn destroyed_archive() {
    let (mut archive, _) = sample_archive();
    archive[4..20].copy_from_slice(ATC_BROKEN_TOKEN);

    assert!(matches!(
        Unlocker::new().open(&mut Cursor::new(archive.clone()), Some(&test_key())),
        Err(AtcError::DestroyedArchive)
    ));
    assert!(matches!(
        probe(&mut Cursor::new(archive)),
        Err(AtcError::DestroyedArchive)
    ));
}

#[test]
fn unrecognized_inputs() {
    let cases: Vec<(&str, Vec<u8>)> = vec![
        ("empty", Vec::new()),
        ("short", b"MZ".to_vec()),
        ("filler", vec![0x11; 100]),
        ("zero trailer", vec![0u8; 100]),
    ];
    for (desc, data) in cases {
        let err = Unlocker::new()
            .open(&mut Cursor::new(data), Some(&test_key()))
            .unwrap_err();
        assert!(matches!(err, AtcError::UnrecognizedFormat), "{desc}: {err:?}");
    }
}

#[test]
fn unsupported_versions() {
    let (archive, _) = sample_archive();
    for version in [106i32, 199, 200, 9999] {
        let mut bytes = archive.clone();
        bytes[20..24].copy_from_slice(&version.to_le_bytes());
        let err = Unlocker::new()
            .open(&mut Cursor::new(bytes), Some(&test_key()))
            .unwrap_err();
        assert!(
            matches!(err, AtcError::UnsupportedVersion(v) if v == version),
            "version {version}: {err:?}"
        );
    }
}

#[test]
fn self_extracting_archive_any_prefix() {
    let (archive, data) = sample_archive();

    for prefix_len in [0usize, 1, 20, 31, 4096] {
        let prefix = payload(prefix_len, 99);
        let image = sfx_wrap(&prefix, &archive);

        let mut src = Cursor::new(image);
        let mut unlocker = Unlocker::new();
        unlocker
            .open(&mut src, Some(&test_key()))
            .unwrap_or_else(|e| panic!("prefix {prefix_len}: {e:?}"));

        let location = unlocker.location().unwrap();
        assert_eq!(location.start, prefix_len as u64);
        assert_eq!(location.embedded, prefix_len > 0);
        assert_eq!(unlocker.entry(0).unwrap(), &entry(0, 777));

        let mut out = Vec::new();
        unlocker.extract_file_data(&mut out, &mut src, 777).unwrap();
        assert_eq!(out, data, "prefix {prefix_len}");
    }
}

#[test]
fn probe_reports_embedded_location() {
    let (archive, _) = sample_archive();
    let image = sfx_wrap(&[0x90; 300], &archive);
    let mut src = Cursor::new(image);

    let location = probe(&mut src).unwrap();
    assert_eq!(location.start, 300);
    assert_eq!(location.end, 300 + archive.len() as u64);
    assert!(location.embedded);
    assert_eq!(src.stream_position().unwrap(), 0);
}

#[test]
fn trailer_pointing_before_file_start() {
    let (archive, _) = sample_archive();
    let mut image = sfx_wrap(&[0x90; 10], &archive);
    let len = image.len();
    image[len - 8..].copy_from_slice(&(archive.len() as i64 + 11).to_le_bytes());

    assert!(matches!(
        Unlocker::new().open(&mut Cursor::new(image), Some(&test_key())),
        Err(AtcError::UnrecognizedFormat)
    ));
}

#[test]
fn utf8_names_dropped_on_count_mismatch() {
    let mut manifest = manifest_block("Fn_", &["a", "b", "c"]).into_bytes();
    manifest.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
    manifest.extend_from_slice(manifest_block("U_", &["a", "b"]).as_bytes());
    let archive = archive_with_manifest(&manifest, &test_key());

    let mut unlocker = Unlocker::new();
    unlocker
        .open(&mut Cursor::new(archive), Some(&test_key()))
        .unwrap();

    assert_eq!(unlocker.entry_count(), 3);
    for (i, name) in ["a", "b", "c"].iter().enumerate() {
        let e = unlocker.entry(i).unwrap();
        assert_eq!(e.name_legacy, name.as_bytes());
        assert!(e.name_utf8.is_empty());
        assert_eq!(e.size, i as i64 + 1);
    }
    assert_eq!(unlocker.last_date_time(), common::FIXED_DATE);
}

#[test]
fn malformed_entry_is_broken_header() {
    let manifest = "Passcode:AttacheCase\n\r\nLastDateTime:x\n\r\nFn_0:bad\t1\t2\t3\t4\r\n";
    let archive = archive_with_manifest(manifest.as_bytes(), &test_key());

    let mut src = Cursor::new(archive);
    assert!(matches!(
        Unlocker::new().open(&mut src, Some(&test_key())),
        Err(AtcError::BrokenHeader(_))
    ));
    assert_eq!(src.stream_position().unwrap(), 0);
}

#[test]
fn manifest_size_past_end_is_broken_header() {
    let (mut archive, _) = sample_archive();
    archive[28..32].copy_from_slice(&(1i32 << 30).to_le_bytes());
    assert!(matches!(
        Unlocker::new().open(&mut Cursor::new(archive), Some(&test_key())),
        Err(AtcError::BrokenHeader(_))
    ));
}

#[test]
fn entry_index_out_of_range() {
    let (archive, _) = sample_archive();
    let mut unlocker = Unlocker::new();
    unlocker
        .open(&mut Cursor::new(archive), Some(&test_key()))
        .unwrap();
    assert!(matches!(
        unlocker.entry(1),
        Err(AtcError::InvalidIndex { index: 1, len: 1 })
    ));
}

#[test]
fn close_is_idempotent_and_final() {
    let (archive, _) = sample_archive();
    let mut src = Cursor::new(archive);
    let mut unlocker = Unlocker::new();
    unlocker.open(&mut src, Some(&test_key())).unwrap();

    unlocker.close().unwrap();
    unlocker.close().unwrap();

    let mut out = Vec::new();
    assert!(matches!(
        unlocker.extract_file_data(&mut out, &mut src, 1),
        Err(AtcError::InvalidState(_))
    ));
}

#[test]
fn truncated_payload_is_io_error() {
    let (archive, _) = sample_archive();
    let mut src = Cursor::new(archive);
    let mut unlocker = Unlocker::new();
    unlocker.open(&mut src, Some(&test_key())).unwrap();

    // cut the stream under the reader after open
    let pos = src.position() as usize;
    let mut cut = src.into_inner();
    cut.truncate(pos + 40);
    let mut src = Cursor::new(cut);
    src.set_position(pos as u64);

    let mut out = Vec::new();
    let err = unlocker.extract_file_data(&mut out, &mut src, 777).unwrap_err();
    assert!(matches!(err, AtcError::Io(_)), "got {err:?}");
}
