//! The public streaming decompressor.

use super::decode::{byte_copy, decode_huffman, decode_literal_block};
use super::{InflateState, Phase, HISTORY_SIZE, LOOK_AHEAD};
use crate::error::{Error, Status};
use std::io::{self, Read};

/// History window plus slack for overflow drains.
const HISTORY_BUF_SIZE: usize = 2 * HISTORY_SIZE + LOOK_AHEAD;

const PEEK_BUF_SIZE: usize = 32 * 1024;

/// Buffered byte source exposing the peek/discard contract the inflate
/// engine consumes: `peek` fills the buffer as full as the source allows
/// and returns everything buffered, `discard` commits consumed bytes.
/// Bytes trailing the DEFLATE stream stay buffered and can be read back
/// through the [`Read`] passthrough.
pub struct PeekReader<R> {
    inner: R,
    buf: Box<[u8]>,
    start: usize,
    end: usize,
    eof: bool,
}

impl<R: Read> PeekReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: vec![0u8; PEEK_BUF_SIZE].into_boxed_slice(),
            start: 0,
            end: 0,
            eof: false,
        }
    }

    /// All buffered bytes, after reading the source until the buffer is
    /// full or the source is exhausted. An empty slice means end of input.
    pub fn peek(&mut self) -> io::Result<&[u8]> {
        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        while self.end < self.buf.len() && !self.eof {
            match self.inner.read(&mut self.buf[self.end..]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.end += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(&self.buf[..self.end])
    }

    /// Drop `n` bytes from the front of the buffered data.
    pub fn discard(&mut self, n: usize) {
        self.start = (self.start + n).min(self.end);
    }

    /// Whether the underlying source has reported end of input.
    pub fn source_exhausted(&self) -> bool {
        self.eof
    }

    /// Swap in a new source, clearing buffered data.
    pub fn reset(&mut self, inner: R) {
        self.inner = inner;
        self.start = 0;
        self.end = 0;
        self.eof = false;
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for PeekReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.start < self.end {
            let n = (self.end - self.start).min(out.len());
            out[..n].copy_from_slice(&self.buf[self.start..self.start + n]);
            self.start += n;
            return Ok(n);
        }
        self.inner.read(out)
    }
}

/// Streaming DEFLATE decompressor over any byte source.
///
/// Reads return decoded bytes; at end of stream `read` returns `Ok(0)` and
/// any bytes following the final block remain readable from the upstream
/// [`PeekReader`]. Corruption surfaces as `ErrorKind::InvalidData` carrying
/// the input byte offset; truncation as `ErrorKind::UnexpectedEof`. Errors
/// latch: subsequent reads keep failing.
pub struct Reader<R: Read> {
    state: Box<InflateState>,
    history: Box<[u8]>,
    write_pos: usize,
    read_pos: usize,
    upstream: PeekReader<R>,
    err: Option<Error>,
}

impl<R: Read> Reader<R> {
    pub fn new(source: R) -> Self {
        Self {
            state: Box::new(InflateState::new()),
            history: vec![0u8; HISTORY_BUF_SIZE].into_boxed_slice(),
            write_pos: 0,
            read_pos: 0,
            upstream: PeekReader::new(source),
            err: None,
        }
    }

    /// Reinitialize for a new stream, keeping all allocations.
    pub fn reset(&mut self, source: R) {
        self.state.reset();
        self.write_pos = 0;
        self.read_pos = 0;
        self.upstream.reset(source);
        self.err = None;
    }

    /// No resources beyond the owned buffers; releasing those is drop's job.
    pub fn close(&mut self) {}

    pub fn get_ref(&self) -> &PeekReader<R> {
        &self.upstream
    }

    pub fn get_mut(&mut self) -> &mut PeekReader<R> {
        &mut self.upstream
    }

    /// Hand back the upstream source, e.g. to read bytes that trail the
    /// compressed stream.
    pub fn into_inner(self) -> PeekReader<R> {
        self.upstream
    }

    /// Decode one batch: peek upstream, run the engine into the history
    /// buffer, then discard exactly the bytes consumed (whole bytes still
    /// held in the bit buffer stay un-discarded so trailing data survives).
    fn step(&mut self) -> Result<(), Error> {
        let Self { state, history, write_pos, read_pos, upstream, .. } = self;

        let peek_size = upstream.peek()?.len();
        let eof = upstream.source_exhausted();
        let skip = (state.bits_len.max(0) / 8) as usize;
        let mut input: &[u8] = &upstream.peek()?[skip.min(peek_size)..];

        *read_pos = *write_pos;
        if *read_pos >= 2 * HISTORY_SIZE {
            // Fold the last window back to the front; the copy regions
            // never overlap because the fold point is a full window past
            // the window size.
            history.copy_within(*read_pos - HISTORY_SIZE..*read_pos, 0);
            *read_pos = HISTORY_SIZE;
            *write_pos = HISTORY_SIZE;
        }

        let start_input = input.len();
        let start_bits = state.bits_len;
        let result = run_decoder(state, history, write_pos, &mut input);
        state.advance_roffset(start_input, start_bits, input.len());

        let held = (state.bits_len.max(0) / 8) as usize;
        let discard = peek_size - input.len() - held;
        upstream.discard(discard);

        match result {
            Err(status) if status.is_terminal() => Err(Error::CorruptInput(state.roffset)),
            Err(Status::EndInput) if eof => Err(Error::UnexpectedEof),
            _ => {
                if state.phase == Phase::StreamEnd && *write_pos == *read_pos {
                    state.phase = Phase::Finish;
                }
                Ok(())
            }
        }
    }
}

impl<R: Read> Read for Reader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            if self.write_pos > self.read_pos {
                let n = (self.write_pos - self.read_pos).min(out.len());
                out[..n].copy_from_slice(&self.history[self.read_pos..self.read_pos + n]);
                self.read_pos += n;
                return Ok(n);
            }
            if let Some(err) = &self.err {
                return Err(err.to_io());
            }
            if self.state.phase == Phase::Finish {
                return Ok(0);
            }
            if let Err(e) = self.step() {
                // Data decoded before the error is delivered first; the
                // latched error surfaces on the next call.
                self.err = Some(e);
            }
        }
    }
}

/// Drive the engine until it stops making progress, then replay any
/// overflow output into the slack area past the fold boundary.
fn run_decoder(
    state: &mut InflateState,
    history: &mut [u8],
    write_pos: &mut usize,
    input: &mut &[u8],
) -> Result<(), Status> {
    let limited = history.len() - LOOK_AHEAD;
    let mut idx = *write_pos;
    let mut result = Ok(());

    while state.phase != Phase::StreamEnd {
        if matches!(state.phase, Phase::NewBlock | Phase::DecodingHeader) {
            if let Err(e) = state.read_header(input) {
                result = Err(e);
                break;
            }
        }
        let (next_idx, r) = if state.phase == Phase::LitBlock {
            decode_literal_block(state, input, &mut history[..limited], idx)
        } else {
            decode_huffman(state, input, &mut history[..limited], idx)
        };
        idx = next_idx;
        if let Err(e) = r {
            result = Err(e);
            break;
        }
    }

    if state.write_overflow_len != 0 {
        history[idx..idx + 4].copy_from_slice(&state.write_overflow_lits.to_le_bytes());
        idx += state.write_overflow_len as usize;
        state.write_overflow_lits = 0;
        state.write_overflow_len = 0;
    }
    if state.copy_overflow_length != 0 {
        byte_copy(
            history,
            idx,
            state.copy_overflow_distance as usize,
            state.copy_overflow_length as usize,
        );
        idx += state.copy_overflow_length as usize;
        state.copy_overflow_distance = 0;
        state.copy_overflow_length = 0;
    }

    *write_pos = idx;
    result
}
