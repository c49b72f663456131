//! Huffman-only compression: a degenerate pipeline that never emits
//! back-references. Bytes accumulate into a 64 KiB block, get a dynamic
//! header built from their plain frequencies, and stream out three
//! literals per inner-loop iteration.

use super::header::DynamicHeader;
use super::histogram::Histogram;
use crate::bits::BitWriter;
use crate::huffman::LenLimitedCode;
use std::io::{self, Write};

const BLOCK_SIZE: usize = 64 * 1024;
const OUTPUT_BUF_SIZE: usize = 8 * 1024;

pub(crate) struct HuffmanOnly<W: Write> {
    w: W,
    hist: Histogram,
    buffer: Vec<u8>,
    offset: usize,
    hdr: DynamicHeader,
    lit_gen: LenLimitedCode,
    buf: BitWriter,
}

impl<W: Write> HuffmanOnly<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            hist: Histogram::new(),
            buffer: vec![0u8; BLOCK_SIZE],
            offset: 0,
            hdr: DynamicHeader::new(),
            lit_gen: LenLimitedCode::new(),
            buf: BitWriter::with_capacity(OUTPUT_BUF_SIZE),
        }
    }

    pub fn accumulate(&mut self, data: &[u8]) -> (usize, bool) {
        let n = (BLOCK_SIZE - self.offset).min(data.len());
        self.buffer[self.offset..self.offset + n].copy_from_slice(&data[..n]);
        self.offset += n;
        (n, self.offset == BLOCK_SIZE)
    }

    pub fn compress(&mut self) -> io::Result<()> {
        self.encode_block(false, false)
    }

    fn encode_block(&mut self, final_block: bool, flush: bool) -> io::Result<()> {
        if self.offset == 0 {
            if final_block {
                self.buf.write_final_empty_block();
                self.w.write_all(self.buf.pending())?;
                self.buf.idx = 0;
            }
            // Nothing pending and not final: flush framing alone keeps
            // the stream aligned.
            return Ok(());
        }

        self.hist.reset();
        for &byte in &self.buffer[..self.offset] {
            self.hist.literal_codes[byte as usize] += 1;
        }
        self.hist.reduce_counts();
        self.hist.literal_codes[256] = 1;
        self.lit_gen.generate(15, &mut self.hist.literal_codes[..286]);
        crate::huffman::code::generate_codes_in_place(&mut self.hist.literal_codes[..286]);
        self.hdr.write_to(&self.hist, final_block, &mut self.buf);

        let mut num = 0usize;
        while num < self.offset {
            num += encode_bytes(&self.hist, &self.buffer[num..self.offset], &mut self.buf);
            if num == self.offset && flush {
                self.buf.flush_last_byte();
            }
            self.w.write_all(self.buf.pending())?;
            self.buf.idx = 0;
        }
        self.offset = 0;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.encode_block(false, true)?;
        self.buf.write_empty_block();
        self.w.write_all(self.buf.pending())?;
        self.buf.idx = 0;
        self.w.flush()
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.encode_block(true, true)
    }

    pub fn reset(&mut self, w: W) -> W {
        let old = std::mem::replace(&mut self.w, w);
        self.buf.reset();
        self.offset = 0;
        self.hist.reset();
        old
    }

    pub fn get_ref(&self) -> &W {
        &self.w
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}

/// Encode literals three at a time, spilling whole bytes after each
/// triple; appends the end-of-block code once the data is exhausted.
/// Returns bytes consumed.
fn encode_bytes(hist: &Histogram, data: &[u8], buf: &mut BitWriter) -> usize {
    buf.sync();
    let end = buf.output.len() - 16;
    let mut idx = buf.idx;
    let mut bits = buf.bits;
    let mut bit_len = buf.bit_len;
    if end <= idx {
        return 0;
    }

    let mut num = 0usize;
    let chunk_end = data.len().saturating_sub(3);
    while num < chunk_end {
        for &lit in &data[num..num + 3] {
            let (code, count) = hist.lit_code(lit as u32);
            bits |= (code as u64) << bit_len;
            bit_len += count;
        }
        num += 3;

        let size = (bit_len / 8) as usize;
        for out in &mut buf.output[idx..idx + size] {
            *out = bits as u8;
            bits >>= 8;
        }
        idx += size;
        bit_len %= 8;

        if idx >= end {
            buf.idx = idx;
            buf.bits = bits;
            buf.bit_len = bit_len;
            return num;
        }
    }

    while num < data.len() {
        let (code, count) = hist.lit_code(data[num] as u32);
        bits |= (code as u64) << bit_len;
        bit_len += count;
        num += 1;
    }
    let size = (bit_len / 8) as usize;
    for out in &mut buf.output[idx..idx + size] {
        *out = bits as u8;
        bits >>= 8;
    }
    idx += size;
    bit_len %= 8;

    let (code, count) = hist.lit_code(256);
    bits |= (code as u64) << bit_len;
    bit_len += count;

    buf.idx = idx;
    buf.bits = bits;
    buf.bit_len = bit_len;
    num
}
