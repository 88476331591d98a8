//! src/unlocker/read.rs
//! Header read helpers

use std::io::Read;

use crate::aliases::Iv32;
use crate::consts::ATC_BUF_SIZE;
use crate::crypto::CipherMode;
use crate::error::AtcError;

/// Read exactly `N` bytes into a stack array.
#[inline(always)]
pub fn read_exact_span<R, const N: usize>(reader: &mut R) -> Result<[u8; N], AtcError>
where
    R: Read,
{
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(AtcError::Io)?;
    Ok(buf)
}

#[inline]
pub fn read_iv<R: Read>(reader: &mut R) -> Result<Iv32, AtcError> {
    Ok(Iv32::new(read_exact_span::<_, ATC_BUF_SIZE>(reader)?))
}

/// Read and decrypt `size` bytes of manifest, rounded up to whole blocks.
///
/// The first decrypted block must contain `marker`, otherwise the key is
/// wrong and [`AtcError::WrongKey`] is returned.
pub fn read_encrypted_manifest<R: Read>(
    reader: &mut R,
    size: usize,
    cipher: &CipherMode,
    chain: &mut Iv32,
    marker: &[u8],
) -> Result<Vec<u8>, AtcError> {
    let blocks = size.div_ceil(ATC_BUF_SIZE);
    let mut plain = Vec::with_capacity(blocks * ATC_BUF_SIZE);

    for index in 0..blocks {
        let mut block = read_exact_span::<_, ATC_BUF_SIZE>(reader)?;
        cipher.decrypt(&mut block, chain);

        if index == 0 && !block.windows(marker.len()).any(|w| w == marker) {
            return Err(AtcError::WrongKey);
        }
        plain.extend_from_slice(&block);
    }
    Ok(plain)
}
