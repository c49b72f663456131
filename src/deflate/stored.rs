//! Level 0: stored (uncompressed) blocks.

use std::io::{self, Write};

/// Stored-block payloads are capped by the 16-bit LEN field.
const MAX_STORED: usize = 65535;
const BLOCK_SIZE: usize = 64 * 1024;

pub(crate) struct StoredCompressor<W: Write> {
    w: W,
    buffer: Vec<u8>,
    offset: usize,
}

impl<W: Write> StoredCompressor<W> {
    pub fn new(w: W) -> Self {
        Self { w, buffer: vec![0u8; BLOCK_SIZE], offset: 0 }
    }

    pub fn accumulate(&mut self, data: &[u8]) -> (usize, bool) {
        let n = (BLOCK_SIZE - self.offset).min(data.len());
        self.buffer[self.offset..self.offset + n].copy_from_slice(&data[..n]);
        self.offset += n;
        (n, self.offset == BLOCK_SIZE)
    }

    pub fn compress(&mut self) -> io::Result<()> {
        self.emit_blocks(false)
    }

    fn emit_blocks(&mut self, final_block: bool) -> io::Result<()> {
        let mut pos = 0usize;
        loop {
            let remaining = self.offset - pos;
            if remaining == 0 && !(final_block && pos == 0 && self.offset == 0) {
                break;
            }
            let chunk = remaining.min(MAX_STORED);
            let is_last = final_block && pos + chunk == self.offset;
            let header = [
                is_last as u8,
                chunk as u8,
                (chunk >> 8) as u8,
                !(chunk as u8),
                !((chunk >> 8) as u8),
            ];
            self.w.write_all(&header)?;
            self.w.write_all(&self.buffer[pos..pos + chunk])?;
            pos += chunk;
            if remaining == 0 {
                break;
            }
        }
        self.offset = 0;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        // Pending data goes out as non-final stored blocks; an empty one
        // follows only when there was nothing to write, keeping the
        // stream aligned and decodable either way.
        if self.offset == 0 {
            self.w.write_all(&[0x00, 0x00, 0x00, 0xFF, 0xFF])?;
        } else {
            self.emit_blocks(false)?;
        }
        self.w.flush()
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.emit_blocks(true)
    }

    pub fn reset(&mut self, w: W) -> W {
        let old = std::mem::replace(&mut self.w, w);
        self.offset = 0;
        old
    }

    pub fn get_ref(&self) -> &W {
        &self.w
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}
