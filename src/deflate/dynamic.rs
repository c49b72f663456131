//! The LZ77 + dynamic-Huffman compressor backing levels 1 and 2.

use super::header::DynamicHeader;
use super::histogram::Histogram;
use super::lz77::{hash4, lz77, LEVEL1_HASH_BITS, LEVEL2_HASH_BITS, MAX_MATCH_LENGTH, MIN_MATCH_LENGTH};
use super::token::{Token, END_OF_BLOCK};
use crate::bits::reader::load_u32_le;
use crate::bits::BitWriter;
use crate::huffman::LenLimitedCode;
use std::io::{self, Write};

pub(crate) const TOKENS_CAP: usize = 32 * 1024;
pub(crate) const MAX_TOKEN_SIZE: usize = TOKENS_CAP - 1;

const OUTPUT_BUF_SIZE: usize = 8 * 1024;

/// Level-selected matcher state: the hash table size is the only
/// difference between the fast and balanced levels.
pub(crate) enum Matcher {
    Level1 { table: Box<[u16; 1 << LEVEL1_HASH_BITS]> },
    Level2 { table: Box<[u16; 1 << LEVEL2_HASH_BITS]> },
}

impl Matcher {
    fn new(level: i32) -> Self {
        match level {
            1 => Matcher::Level1 { table: Box::new([0; 1 << LEVEL1_HASH_BITS]) },
            _ => Matcher::Level2 { table: Box::new([0; 1 << LEVEL2_HASH_BITS]) },
        }
    }

    fn reset(&mut self) {
        match self {
            Matcher::Level1 { table } => table.fill(0),
            Matcher::Level2 { table } => table.fill(0),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn generate(
        &mut self,
        flush: bool,
        window_size: usize,
        hist: &mut Histogram,
        input: &[u8],
        processed: usize,
        offset: usize,
        tokens: &mut Vec<Token>,
        max_tokens: usize,
    ) -> usize {
        match self {
            Matcher::Level1 { table } => lz77(
                flush,
                &mut table[..],
                (1 << LEVEL1_HASH_BITS) - 1,
                window_size,
                hist,
                input,
                processed,
                offset,
                tokens,
                max_tokens,
            ),
            Matcher::Level2 { table } => lz77(
                flush,
                &mut table[..],
                (1 << LEVEL2_HASH_BITS) - 1,
                window_size,
                hist,
                input,
                processed,
                offset,
                tokens,
                max_tokens,
            ),
        }
    }

    fn seed(&mut self, buffer: &[u8], upto: usize) {
        let (table, mask) = match self {
            Matcher::Level1 { table } => (&mut table[..], (1u32 << LEVEL1_HASH_BITS) - 1),
            Matcher::Level2 { table } => (&mut table[..], (1u32 << LEVEL2_HASH_BITS) - 1),
        };
        for offset in 0..upto.saturating_sub(MIN_MATCH_LENGTH) {
            let w = load_u32_le(buffer, offset);
            table[(hash4(w) & mask) as usize] = offset as u16;
        }
    }
}

/// Streaming compressor: accumulates input into a sliding window with
/// lookahead, tokenizes in batches bounded by the token cap, and emits
/// dynamic-header blocks.
pub(crate) struct DynCompressor<W: Write> {
    window_size: usize,
    w: W,
    buffer: Vec<u8>,
    /// Total bytes tokenized since the last reset (fingerprint base).
    processed: usize,
    /// Next buffer position to tokenize.
    idx: usize,
    /// Buffer write head.
    end: usize,
    tokens: Vec<Token>,
    hdr: DynamicHeader,
    buf: BitWriter,
    lit_gen: LenLimitedCode,
    dist_gen: LenLimitedCode,
    hist: Histogram,
    matcher: Matcher,
}

impl<W: Write> DynCompressor<W> {
    pub fn new(w: W, level: i32, window_size: usize) -> Self {
        Self {
            window_size,
            w,
            buffer: vec![0u8; window_size * 2 + MAX_MATCH_LENGTH + MIN_MATCH_LENGTH],
            processed: 0,
            idx: 0,
            end: 0,
            tokens: Vec::with_capacity(TOKENS_CAP),
            hdr: DynamicHeader::new(),
            buf: BitWriter::with_capacity(OUTPUT_BUF_SIZE),
            lit_gen: LenLimitedCode::new(),
            dist_gen: LenLimitedCode::new(),
            hist: Histogram::new(),
            matcher: Matcher::new(level),
        }
    }

    /// Preload a dictionary: its tail becomes match history and the hash
    /// table is seeded over it.
    pub fn preset_dictionary(&mut self, dict: &[u8]) {
        let keep = dict.len().min(self.window_size);
        let tail = &dict[dict.len() - keep..];
        self.buffer[..keep].copy_from_slice(tail);
        self.idx = keep;
        self.end = keep;
        self.processed = keep;
        self.matcher.seed(&self.buffer, keep);
    }

    /// Buffer input. Returns `(consumed, trigger)`; `trigger` means the
    /// window is full and a compression pass should run.
    pub fn accumulate(&mut self, data: &[u8]) -> (usize, bool) {
        if self.idx >= 2 * self.window_size {
            // Slide, keeping one window of history before idx.
            let offset = self.idx - self.window_size;
            self.buffer.copy_within(offset..self.end, 0);
            self.idx -= offset;
            self.end -= offset;
        }
        let cap = 2 * self.window_size + MAX_MATCH_LENGTH;
        let n = (cap - self.end).min(data.len());
        self.buffer[self.end..self.end + n].copy_from_slice(&data[..n]);
        self.end += n;
        (n, self.end == cap)
    }

    pub fn compress(&mut self) -> io::Result<()> {
        self.compress_block(false, false)
    }

    fn compress_block(&mut self, flush: bool, final_block: bool) -> io::Result<()> {
        if final_block && self.end == 0 {
            self.buf.write_final_empty_block();
            self.w.write_all(self.buf.pending())?;
            self.buf.idx = 0;
            return Ok(());
        }
        loop {
            let next_idx = self.matcher.generate(
                flush,
                self.window_size,
                &mut self.hist,
                &self.buffer[..self.end],
                self.processed,
                self.idx,
                &mut self.tokens,
                MAX_TOKEN_SIZE,
            );
            self.processed += next_idx - self.idx;
            self.idx = next_idx;
            if self.tokens.len() < MAX_TOKEN_SIZE && !flush {
                return Ok(());
            }

            self.encode_block(final_block && self.idx == self.end)?;

            if self.idx == self.end {
                return Ok(());
            }
        }
    }

    fn encode_block(&mut self, last: bool) -> io::Result<()> {
        self.buf.idx = 0;
        self.tokens.push(END_OF_BLOCK);
        self.hist.generate_codes(&mut self.lit_gen, &mut self.dist_gen);
        self.hdr.write_to(&self.hist, last, &mut self.buf);
        self.hist.expand_codes();

        let mut idx = 0usize;
        while idx < self.tokens.len() {
            idx += encode_tokens(&self.hist, &self.tokens[idx..], &mut self.buf);
            if last && idx == self.tokens.len() {
                self.buf.flush_last_byte();
            }
            self.w.write_all(self.buf.pending())?;
            self.buf.idx = 0;
        }
        self.tokens.clear();
        self.hist.reset();
        Ok(())
    }

    /// Compress what is buffered, then byte-align with an empty stored
    /// block so the sink sees a decodable prefix.
    pub fn flush(&mut self) -> io::Result<()> {
        self.compress_block(true, false)?;
        self.buf.write_empty_block();
        self.w.write_all(self.buf.pending())?;
        self.buf.idx = 0;
        self.w.flush()
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.compress_block(true, true)
    }

    pub fn reset(&mut self, w: W) -> W {
        let old = std::mem::replace(&mut self.w, w);
        self.processed = 0;
        self.idx = 0;
        self.end = 0;
        self.tokens.clear();
        self.buf.reset();
        self.hist.reset();
        self.matcher.reset();
        old
    }

    pub fn get_ref(&self) -> &W {
        &self.w
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}

/// Encode tokens until the output buffer nears its tail guard. Every
/// token is three accumulator pushes (litlen code, distance code, extra
/// bits); at most one 8-byte spill can happen per push, and the loop
/// breaks while 16 slack bytes remain. Returns tokens consumed.
pub(crate) fn encode_tokens(hist: &Histogram, tokens: &[Token], buf: &mut BitWriter) -> usize {
    let end = buf.output.len() - 16;
    let mut idx = buf.idx;
    let mut bits = buf.bits;
    let mut bit_len = buf.bit_len;
    if end <= idx {
        return 0;
    }

    let mut consumed = 0usize;
    for &token in tokens {
        consumed += 1;
        let (litlen, dist, extra) = token.extract();

        let (code, count) = hist.lit_code(litlen);
        if bit_len < 64 {
            bits |= (code as u64) << bit_len;
        }
        bit_len += count;
        if bit_len > 64 {
            buf.output[idx..idx + 8].copy_from_slice(&bits.to_le_bytes());
            idx += 8;
            bit_len -= 64;
            bits = (code as u64) >> (count - bit_len);
        }

        let (code, count, extra_count) = hist.dist_code(dist);
        if bit_len < 64 {
            bits |= (code as u64) << bit_len;
        }
        bit_len += count;
        if bit_len > 64 {
            buf.output[idx..idx + 8].copy_from_slice(&bits.to_le_bytes());
            idx += 8;
            bit_len -= 64;
            bits = (code as u64) >> (count - bit_len);
        }

        if bit_len < 64 {
            bits |= (extra as u64) << bit_len;
        }
        bit_len += extra_count;
        if bit_len > 64 {
            buf.output[idx..idx + 8].copy_from_slice(&bits.to_le_bytes());
            idx += 8;
            bit_len -= 64;
            bits = (extra as u64) >> (extra_count - bit_len);
        }

        if idx >= end {
            break;
        }
    }

    buf.idx = idx;
    buf.bits = bits;
    buf.bit_len = bit_len;
    consumed
}
