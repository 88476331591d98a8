//! src/unlocker/stream.rs
//! Reader-side compression bridge: 32-byte cipher blocks → zlib → plaintext
//!
//! Decompressed bytes collect in `pending`; each extract call drains as much
//! as the caller asked for and keeps the rest for the next call, so callers
//! can pull arbitrary chunk sizes independent of block boundaries.

use std::io::{Read, Write};

use flate2::{Decompress, FlushDecompress, Status};

use crate::aliases::Iv32;
use crate::consts::{ATC_BUF_SIZE, ATC_LARGE_BUF_SIZE};
use crate::crypto::CipherMode;
use crate::error::AtcError;

pub(crate) struct InflateBridge {
    decompress: Decompress,
    input: [u8; ATC_BUF_SIZE],
    in_pos: usize,
    in_len: usize,
    pending: Vec<u8>,
    payload_len: u64,
    read_total: u64,
    stream_end: bool,
    tolerate_data_error: bool,
}

impl InflateBridge {
    /// `payload_len` is the number of ciphertext bytes after the payload IV.
    /// Version ≤ 103 payloads treat a zlib data error as end of stream.
    pub(crate) fn new(payload_len: u64, tolerate_data_error: bool) -> Self {
        Self {
            decompress: Decompress::new(true),
            input: [0u8; ATC_BUF_SIZE],
            in_pos: 0,
            in_len: 0,
            pending: Vec::with_capacity(ATC_LARGE_BUF_SIZE),
            payload_len,
            read_total: 0,
            stream_end: false,
            tolerate_data_error,
        }
    }

    /// Deliver up to `length` decompressed bytes to `dst`; returns how many.
    ///
    /// Fewer than `length` bytes means the payload is exhausted.
    pub(crate) fn extract<W: Write, R: Read>(
        &mut self,
        dst: &mut W,
        src: &mut R,
        length: usize,
        cipher: &CipherMode,
        chain: &mut Iv32,
    ) -> Result<usize, AtcError> {
        while self.pending.len() < length && !self.stream_end {
            if self.in_pos == self.in_len {
                if self.read_total >= self.payload_len {
                    // input exhausted; drain what zlib still holds
                    if !self.inflate_step()? {
                        if self.payload_len > 0 {
                            return Err(AtcError::Codec(
                                "payload ended before the zlib stream".into(),
                            ));
                        }
                        break;
                    }
                    continue;
                }
                self.next_block(src, cipher, chain)?;
            }
            self.inflate_step()?;
        }

        let out = length.min(self.pending.len());
        dst.write_all(&self.pending[..out])?;
        self.pending.drain(..out);
        Ok(out)
    }

    fn next_block<R: Read>(
        &mut self,
        src: &mut R,
        cipher: &CipherMode,
        chain: &mut Iv32,
    ) -> Result<(), AtcError> {
        src.read_exact(&mut self.input)?;
        self.read_total += ATC_BUF_SIZE as u64;
        cipher.decrypt(&mut self.input, chain);

        self.in_pos = 0;
        self.in_len = ATC_BUF_SIZE;
        if self.read_total >= self.payload_len {
            self.in_len = ATC_BUF_SIZE - padding_len(&self.input);
        }
        tracing::trace!(read_total = self.read_total, "payload block decrypted");
        Ok(())
    }

    // Ok(false): no input used, no output produced, stream not ended
    fn inflate_step(&mut self) -> Result<bool, AtcError> {
        self.pending.reserve(ATC_LARGE_BUF_SIZE);
        let before_in = self.decompress.total_in();
        let before_out = self.decompress.total_out();

        let status = self.decompress.decompress_vec(
            &self.input[self.in_pos..self.in_len],
            &mut self.pending,
            FlushDecompress::None,
        );

        let used = (self.decompress.total_in() - before_in) as usize;
        let produced = self.decompress.total_out() - before_out;
        self.in_pos += used;

        match status {
            Ok(Status::StreamEnd) => {
                self.stream_end = true;
                tracing::debug!(
                    inflated = self.decompress.total_out(),
                    "payload stream finished"
                );
            }
            Ok(Status::Ok | Status::BufError) => {
                if used == 0 && produced == 0 {
                    if self.in_pos < self.in_len {
                        return Err(AtcError::Codec("inflate stalled".into()));
                    }
                    return Ok(false);
                }
            }
            Err(e) if self.tolerate_data_error => {
                tracing::warn!(
                    error = %e,
                    "legacy payload inflate error treated as end of stream"
                );
                self.stream_end = true;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(true)
    }
}

/// Number of trailing pad bytes in a decrypted final block.
///
/// The last byte `p` counts as padding only when `p <= 127` and exactly `p`
/// trailing bytes equal it; otherwise nothing is stripped.
pub(crate) fn padding_len(block: &[u8; ATC_BUF_SIZE]) -> usize {
    let pad = block[ATC_BUF_SIZE - 1];
    if pad > 127 {
        return 0;
    }
    let run = block.iter().rev().take_while(|&&b| b == pad).count();
    if run == pad as usize {
        run
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::key_from_password;
    use crate::version::CipherKind;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Cursor;

    fn text(len: usize) -> Vec<u8> {
        b"lorem ipsum dolor sit amet "
            .iter()
            .copied()
            .cycle()
            .take(len)
            .collect()
    }

    // Pad and encrypt `stream` the way the writer does.
    fn seal(stream: &[u8], cipher: &CipherMode) -> Vec<u8> {
        let mut padded = stream.to_vec();
        let pad = ATC_BUF_SIZE - padded.len() % ATC_BUF_SIZE;
        padded.resize(padded.len() + pad, pad as u8);

        let mut chain = Iv32::new([0u8; ATC_BUF_SIZE]);
        let mut sealed = Vec::with_capacity(padded.len());
        for chunk in padded.chunks_exact(ATC_BUF_SIZE) {
            let mut block: [u8; ATC_BUF_SIZE] = chunk.try_into().unwrap();
            cipher.encrypt(&mut block, &mut chain);
            sealed.extend_from_slice(&block);
        }
        sealed
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn run(sealed: Vec<u8>, cipher: &CipherMode, want: usize) -> Result<Vec<u8>, AtcError> {
        let mut bridge = InflateBridge::new(sealed.len() as u64, false);
        let mut chain = Iv32::new([0u8; ATC_BUF_SIZE]);
        let mut out = Vec::new();
        let mut src = Cursor::new(sealed);
        bridge.extract(&mut out, &mut src, want, cipher, &mut chain)?;
        Ok(out)
    }

    #[test]
    fn drains_inflater_after_input_is_consumed() {
        let cipher = CipherMode::new(CipherKind::Rijndael, &key_from_password("k")).unwrap();
        let data = text(50_000);
        let sealed = seal(&zlib(&data), &cipher);
        assert!(sealed.len() < 1024);

        assert_eq!(run(sealed, &cipher, data.len()).unwrap(), data);
    }

    #[test]
    fn truncated_zlib_stream_is_codec_error() {
        let cipher = CipherMode::new(CipherKind::Rijndael, &key_from_password("k")).unwrap();
        let data = text(50_000);
        let stream = zlib(&data);
        let sealed = seal(&stream[..stream.len() - 6], &cipher);

        assert!(matches!(
            run(sealed, &cipher, data.len()),
            Err(AtcError::Codec(_))
        ));
    }

    #[test]
    fn padding_detection() {
        let mut block = [0xAAu8; 32];
        block[29..].fill(3);
        assert_eq!(padding_len(&block), 3);

        // run longer than the value: not padding
        block[28] = 3;
        assert_eq!(padding_len(&block), 0);

        assert_eq!(padding_len(&[32u8; 32]), 32);
        assert_eq!(padding_len(&[0x80u8; 32]), 0);

        let mut zero_tail = [1u8; 32];
        zero_tail[31] = 0;
        assert_eq!(padding_len(&zero_tail), 0);
    }
}
