//! tests/common.rs
//! Common constants and archive builders shared across test files

#![allow(dead_code)] // each test binary uses a different subset

use std::io::Write;

use attachecase_rs::aliases::{ArchiveKey32, Iv32};
use attachecase_rs::consts::{ATC_BUF_SIZE, ATC_LEGACY_PASS_FOOTER, ATC_TOKEN};
use attachecase_rs::crypto::{BlockCipherChain, Rijndael};
use attachecase_rs::header::PlainHeader;
use attachecase_rs::locker::{write_encrypted_manifest, write_iv, write_plain_header};
use attachecase_rs::{key_from_password, FileEntry, Locker};
use blowfish::cipher::generic_array::GenericArray;
use blowfish::cipher::{BlockEncrypt, KeyInit};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Standard test password
pub const TEST_PASSWORD: &str = "Hello";

/// A password that is not [`TEST_PASSWORD`]
pub const WRONG_PASSWORD: &str = "Goodbye";

/// Payload sizes straddling the 32-byte block boundary
pub const PAYLOAD_SIZES: &[usize] = &[0, 31, 32, 33, 10_000];

pub const FIXED_DATE: &str = "2024/01/31 12:00:00";

pub fn test_key() -> ArchiveKey32 {
    key_from_password(TEST_PASSWORD)
}

/// Deterministic payload; odd seeds give incompressible noise, even seeds text.
pub fn payload(len: usize, seed: u64) -> Vec<u8> {
    if seed % 2 == 1 {
        let mut data = vec![0u8; len];
        StdRng::seed_from_u64(seed).fill_bytes(&mut data);
        data
    } else {
        b"The quick brown fox jumps over the lazy dog. "
            .iter()
            .copied()
            .cycle()
            .take(len)
            .collect()
    }
}

/// Entry `i` of a generated set, with distinct metadata.
pub fn entry(i: usize, size: i64) -> FileEntry {
    FileEntry::new(&format!("dir/file_{i}.bin"), size)
        .with_attribute(0x20 + i as i32)
        .with_times(1_600_000_000 + i as i64 * 86_401, 1_500_000_000 - i as i64 * 3_599)
}

/// Lock `files` (entry + bytes) with `key` through the public writer API.
pub fn lock(files: &[(FileEntry, Vec<u8>)], key: &ArchiveKey32, locker: Locker) -> Vec<u8> {
    let mut locker = locker;
    let mut out = Vec::new();
    locker
        .open(&mut out, key)
        .unwrap_or_else(|e| panic!("open failed: {e:?}"));
    for (entry, _) in files {
        locker
            .add_file_entry(entry.clone())
            .unwrap_or_else(|e| panic!("add_file_entry failed: {e:?}"));
    }
    locker
        .write_encrypted_header(&mut out)
        .unwrap_or_else(|e| panic!("write_encrypted_header failed: {e:?}"));
    for (entry, data) in files {
        if entry.has_known_size() {
            locker
                .write_file_data(&mut out, &mut data.as_slice(), data.len() as u64)
                .unwrap_or_else(|e| panic!("write_file_data failed: {e:?}"));
        }
    }
    locker.close().unwrap();
    out
}

pub fn seeded_locker() -> Locker {
    Locker::builder().with_iv_seed(0xA7C).build()
}

/// `prefix` + `archive` + i64 LE archive length, as a self-extracting
/// executable lays it out.
pub fn sfx_wrap(prefix: &[u8], archive: &[u8]) -> Vec<u8> {
    let mut out = prefix.to_vec();
    out.extend_from_slice(archive);
    out.extend_from_slice(&(archive.len() as i64).to_le_bytes());
    out
}

/// Current-format archive whose manifest plaintext is `manifest`, with no
/// payload. Lets tests feed hand-written manifests to the reader.
pub fn archive_with_manifest(manifest: &[u8], key: &ArchiveKey32) -> Vec<u8> {
    let cbc = BlockCipherChain::new(Rijndael::make_key(key));
    let mut out = Vec::new();
    write_plain_header(&mut out, &PlainHeader::current(3, false)).unwrap();
    let mut chain = Iv32::new([0x5C; ATC_BUF_SIZE]);
    write_encrypted_manifest(&mut out, manifest, &cbc, &mut chain).unwrap();
    write_iv(&mut out, &Iv32::new([0xC5; ATC_BUF_SIZE])).unwrap();
    out
}

/// Manifest line block in the on-disk text format.
pub fn manifest_block(label: &str, names: &[&str]) -> String {
    let mut text = format!("Passcode:AttacheCase\n\r\nLastDateTime:{FIXED_DATE}\n\r\n");
    for (i, name) in names.iter().enumerate() {
        text.push_str(&format!(
            "{label}{i}:{name}\t{}\t32\t738000\t3600000\t738000\t0\r\n",
            i + 1
        ));
    }
    text
}

fn blowfish_ecb(password: &str, data: &mut [u8]) {
    let mut key = password.as_bytes().to_vec();
    key.extend_from_slice(ATC_LEGACY_PASS_FOOTER);
    let cipher = <blowfish::Blowfish>::new_from_slice(&key).unwrap();
    for chunk in data.chunks_exact_mut(8) {
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
    }
}

/// Build a format version ≤ 103 archive: manifest size in the info bytes,
/// Blowfish ECB, no IVs, one zlib stream for all payloads.
pub fn legacy_archive(version: i32, password: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    let names: Vec<&str> = files.iter().map(|(n, _)| *n).collect();
    let mut manifest = String::new();
    manifest.push_str("Passcode:AttacheCase\n\r\nLastDateTime:2001/02/03 04:05:06\n\r\n");
    for (i, (name, data)) in files.iter().enumerate() {
        manifest.push_str(&format!(
            "Fn_{i}:{name}\t{}\t0\t730000\t1000\t730000\t2000\r\n",
            data.len()
        ));
    }
    let mut manifest = manifest.into_bytes();
    manifest.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
    manifest.extend_from_slice(manifest_block("U_", &names).as_bytes());
    manifest.resize(manifest.len().div_ceil(ATC_BUF_SIZE) * ATC_BUF_SIZE, 0);
    blowfish_ecb(password, &mut manifest);

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    for (_, data) in files {
        encoder.write_all(data).unwrap();
    }
    let mut payload = encoder.finish().unwrap();
    let pad = ATC_BUF_SIZE - payload.len() % ATC_BUF_SIZE;
    payload.resize(payload.len() + pad, pad as u8);
    blowfish_ecb(password, &mut payload);

    let mut out = (manifest.len() as i32).to_le_bytes().to_vec();
    out.extend_from_slice(ATC_TOKEN);
    out.extend_from_slice(&version.to_le_bytes());
    out.extend_from_slice(&manifest);
    out.extend_from_slice(&payload);
    out
}
