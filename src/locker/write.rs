//! src/locker/write.rs
//! Header write helpers

use std::io::Write;

use secure_gate::RevealSecret;

use crate::aliases::Iv32;
use crate::consts::ATC_BUF_SIZE;
use crate::crypto::BlockCipherChain;
use crate::error::AtcError;
use crate::header::PlainHeader;

#[inline]
pub fn write_octets<W: Write>(writer: &mut W, data: &[u8]) -> Result<(), AtcError> {
    writer.write_all(data).map_err(AtcError::Io)
}

#[inline]
pub fn write_plain_header<W: Write>(writer: &mut W, header: &PlainHeader) -> Result<(), AtcError> {
    write_octets(writer, &header.to_bytes())
}

#[inline]
pub fn write_iv<W: Write>(writer: &mut W, iv: &Iv32) -> Result<(), AtcError> {
    write_octets(writer, iv.expose_secret())
}

/// Zero-pad the manifest to whole blocks, then write its length, the IV held
/// in `chain` and the CBC-encrypted blocks. `chain` ends at the last
/// ciphertext block.
pub fn write_encrypted_manifest<W: Write>(
    writer: &mut W,
    manifest: &[u8],
    cipher: &BlockCipherChain,
    chain: &mut Iv32,
) -> Result<usize, AtcError> {
    let padded_len = manifest.len().div_ceil(ATC_BUF_SIZE) * ATC_BUF_SIZE;
    let size = i32::try_from(padded_len)
        .map_err(|_| AtcError::InvalidEntry("manifest exceeds 2 GiB".into()))?;

    write_octets(writer, &size.to_le_bytes())?;
    write_iv(writer, chain)?;

    for chunk in manifest.chunks(ATC_BUF_SIZE) {
        let mut block = [0u8; ATC_BUF_SIZE];
        block[..chunk.len()].copy_from_slice(chunk);
        cipher.encrypt(&mut block, chain);
        write_octets(writer, &block)?;
    }
    Ok(padded_len)
}
