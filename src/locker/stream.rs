//! src/locker/stream.rs
//! Writer-side compression bridge: plaintext → zlib → 32-byte CBC blocks
//!
//! Deflate output is collected in one 32-byte block; every time it fills, the
//! block is encrypted and written. The compressor is told to finish once the
//! bytes fed reach the sum of all declared entry sizes. The final block is
//! always padded: a partial block with `32 - filled` copies of the value
//! `32 - filled`, and an exactly full stream with one extra block of 32 × `0x20`.

use std::io::{Read, Write};

use flate2::{Compress, Compression, FlushCompress, Status};

use secure_gate::{RevealSecret, RevealSecretMut};

use crate::aliases::{Block32, Iv32};
use crate::consts::ATC_BUF_SIZE;
use crate::crypto::{BlockCipher, BlockCipherChain};
use crate::error::AtcError;

pub(crate) struct DeflateBridge {
    compress: Compress,
    output: Block32,
    filled: usize,
    total_length: u64,
    total_written: u64,
    stream_end: bool,
}

impl DeflateBridge {
    pub(crate) fn new(level: u32, total_length: u64) -> Self {
        Self {
            compress: Compress::new(Compression::new(level), true),
            output: Block32::new([0u8; ATC_BUF_SIZE]),
            filled: 0,
            total_length,
            total_written: 0,
            stream_end: false,
        }
    }

    /// The compressed stream has ended and its padded last block was written.
    pub(crate) fn is_complete(&self) -> bool {
        self.stream_end
    }

    pub(crate) fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Compress and encrypt exactly `length` bytes from `src`.
    pub(crate) fn write<R, W, C>(
        &mut self,
        dst: &mut W,
        src: &mut R,
        length: u64,
        cipher: &BlockCipherChain<C>,
        chain: &mut Iv32,
    ) -> Result<(), AtcError>
    where
        R: Read,
        W: Write,
        C: BlockCipher,
    {
        if self.stream_end {
            if length == 0 {
                return Ok(());
            }
            return Err(AtcError::InvalidState(
                "payload already complete; declared entry sizes exceeded",
            ));
        }

        let mut remaining = length;
        let mut input = [0u8; ATC_BUF_SIZE];

        loop {
            let n = remaining.min(ATC_BUF_SIZE as u64) as usize;
            src.read_exact(&mut input[..n])?;
            remaining -= n as u64;
            self.total_written += n as u64;

            let flush = if self.total_written >= self.total_length {
                FlushCompress::Finish
            } else {
                FlushCompress::None
            };

            self.deflate_chunk(dst, &input[..n], flush, cipher, chain)?;

            if self.stream_end {
                if remaining > 0 {
                    return Err(AtcError::InvalidState(
                        "payload already complete; declared entry sizes exceeded",
                    ));
                }
                return Ok(());
            }
            if remaining == 0 {
                return Ok(());
            }
        }
    }

    fn deflate_chunk<W, C>(
        &mut self,
        dst: &mut W,
        input: &[u8],
        flush: FlushCompress,
        cipher: &BlockCipherChain<C>,
        chain: &mut Iv32,
    ) -> Result<(), AtcError>
    where
        W: Write,
        C: BlockCipher,
    {
        let finishing = matches!(flush, FlushCompress::Finish);
        let mut consumed = 0usize;

        loop {
            let before_in = self.compress.total_in();
            let before_out = self.compress.total_out();

            let status = self.compress.compress(
                &input[consumed..],
                &mut self.output.expose_secret_mut()[self.filled..],
                flush,
            )?;

            let used = (self.compress.total_in() - before_in) as usize;
            let produced = (self.compress.total_out() - before_out) as usize;
            consumed += used;
            self.filled += produced;

            if self.filled == ATC_BUF_SIZE {
                self.emit(dst, cipher, chain)?;
            }

            if status == Status::StreamEnd {
                self.finish_stream(dst, cipher, chain)?;
                return Ok(());
            }

            let input_done = consumed == input.len();
            if !finishing && input_done && self.filled < ATC_BUF_SIZE {
                return Ok(());
            }
            if self.filled < ATC_BUF_SIZE {
                check_progress(used, produced, input.len() - consumed)?;
            }
        }
    }

    fn finish_stream<W, C>(
        &mut self,
        dst: &mut W,
        cipher: &BlockCipherChain<C>,
        chain: &mut Iv32,
    ) -> Result<(), AtcError>
    where
        W: Write,
        C: BlockCipher,
    {
        // a full last block was already emitted; pad with a whole extra block
        let pad = (ATC_BUF_SIZE - self.filled) as u8;
        self.output.expose_secret_mut()[self.filled..].fill(pad);
        self.filled = ATC_BUF_SIZE;
        self.emit(dst, cipher, chain)?;
        self.stream_end = true;

        tracing::debug!(
            plaintext = self.total_written,
            compressed = self.compress.total_out(),
            pad,
            "payload stream finished"
        );
        Ok(())
    }

    fn emit<W, C>(
        &mut self,
        dst: &mut W,
        cipher: &BlockCipherChain<C>,
        chain: &mut Iv32,
    ) -> Result<(), AtcError>
    where
        W: Write,
        C: BlockCipher,
    {
        let mut block = *self.output.expose_secret();
        cipher.encrypt(&mut block, chain);
        dst.write_all(&block)?;
        self.filled = 0;
        tracing::trace!("payload block written");
        Ok(())
    }
}

// Reached only with input left over or the stream not yet ended.
fn check_progress(used: usize, produced: usize, left: usize) -> Result<(), AtcError> {
    if used == 0 && produced == 0 {
        return Err(AtcError::Codec(format!(
            "deflate stalled with {left} input bytes left"
        )));
    }
    Ok(())
}
