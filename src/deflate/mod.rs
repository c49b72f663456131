//! Streaming DEFLATE compression.

pub(crate) mod dynamic;
pub(crate) mod header;
pub(crate) mod histogram;
pub(crate) mod huffonly;
pub(crate) mod lz77;
pub(crate) mod stored;
pub(crate) mod token;

use dynamic::DynCompressor;
use huffonly::HuffmanOnly;
use std::io::{self, Write};
use stored::StoredCompressor;

/// Store-only output (level 0).
pub const NO_COMPRESSION: i32 = 0;
/// Fastest matching (level 1): 4 Ki-entry hash table.
pub const BEST_SPEED: i32 = 1;
/// Resolves to the balanced level 2.
pub const DEFAULT_COMPRESSION: i32 = -1;
/// Entropy coding only, no back-references.
pub const HUFFMAN_ONLY: i32 = -2;

const DEFAULT_WINDOW: usize = 32 * 1024;
const SMALL_WINDOW: usize = 4 * 1024;

enum Engine<W: Write> {
    Dynamic(DynCompressor<W>),
    Huffman(HuffmanOnly<W>),
    Stored(StoredCompressor<W>),
}

/// Streaming DEFLATE compressor.
///
/// Levels 1 and 2 run the LZ77 + dynamic-Huffman pipeline, `HUFFMAN_ONLY`
/// entropy-codes literals, `NO_COMPRESSION` stores. Every other level
/// falls back to the balanced level-2 engine. After a sink error the
/// writer latches it and refuses further work.
pub struct Writer<W: Write> {
    engine: Engine<W>,
    err: Option<io::ErrorKind>,
}

impl<W: Write> Writer<W> {
    /// Compressor with the standard 32 KiB window.
    pub fn new(sink: W, level: i32) -> Self {
        Self::with_window(sink, level, DEFAULT_WINDOW)
    }

    /// Compressor with a 4 KiB window: a smaller hash table and shorter
    /// back-references, cheaper for small payloads.
    pub fn with_4k_window(sink: W, level: i32) -> Self {
        Self::with_window(sink, level, SMALL_WINDOW)
    }

    /// Compressor with a preset dictionary; matches may reference the
    /// dictionary tail before any input is written. An empty dictionary
    /// behaves exactly like [`Writer::new`].
    pub fn with_dict(sink: W, level: i32, dict: &[u8]) -> Self {
        let mut w = Self::with_window(sink, level, DEFAULT_WINDOW);
        if !dict.is_empty() {
            if let Engine::Dynamic(c) = &mut w.engine {
                c.preset_dictionary(dict);
            }
        }
        w
    }

    fn with_window(sink: W, level: i32, window: usize) -> Self {
        let level = if level == DEFAULT_COMPRESSION { 2 } else { level };
        let engine = match level {
            NO_COMPRESSION => Engine::Stored(StoredCompressor::new(sink)),
            HUFFMAN_ONLY => Engine::Huffman(HuffmanOnly::new(sink)),
            1 | 2 => Engine::Dynamic(DynCompressor::new(sink, level, window)),
            _ => Engine::Dynamic(DynCompressor::new(sink, 2, window)),
        };
        Self { engine, err: None }
    }

    fn check(&self) -> io::Result<()> {
        match self.err {
            Some(kind) => Err(io::Error::new(kind, "deflate writer previously failed")),
            None => Ok(()),
        }
    }

    fn latch<T>(&mut self, res: io::Result<T>) -> io::Result<T> {
        if let Err(e) = &res {
            self.err = Some(e.kind());
        }
        res
    }

    /// Terminate the stream with a final block. The writer stays usable
    /// only through [`Writer::reset`] afterwards.
    pub fn close(&mut self) -> io::Result<()> {
        self.check()?;
        let res = match &mut self.engine {
            Engine::Dynamic(c) => c.close(),
            Engine::Huffman(c) => c.close(),
            Engine::Stored(c) => c.close(),
        };
        self.latch(res)
    }

    /// Swap in a new sink and reinitialize for a fresh stream, keeping
    /// allocations. Returns the previous sink.
    pub fn reset(&mut self, sink: W) -> W {
        self.err = None;
        match &mut self.engine {
            Engine::Dynamic(c) => c.reset(sink),
            Engine::Huffman(c) => c.reset(sink),
            Engine::Stored(c) => c.reset(sink),
        }
    }

    pub fn get_ref(&self) -> &W {
        match &self.engine {
            Engine::Dynamic(c) => c.get_ref(),
            Engine::Huffman(c) => c.get_ref(),
            Engine::Stored(c) => c.get_ref(),
        }
    }

    /// Close the stream and hand back the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.close()?;
        Ok(match self.engine {
            Engine::Dynamic(c) => c.into_inner(),
            Engine::Huffman(c) => c.into_inner(),
            Engine::Stored(c) => c.into_inner(),
        })
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.check()?;
        let total = data.len();
        let mut fed = 0usize;
        while fed < total {
            let (n, trigger) = match &mut self.engine {
                Engine::Dynamic(c) => c.accumulate(&data[fed..]),
                Engine::Huffman(c) => c.accumulate(&data[fed..]),
                Engine::Stored(c) => c.accumulate(&data[fed..]),
            };
            if trigger {
                let res = match &mut self.engine {
                    Engine::Dynamic(c) => c.compress(),
                    Engine::Huffman(c) => c.compress(),
                    Engine::Stored(c) => c.compress(),
                };
                self.latch(res)?;
            }
            fed += n;
        }
        Ok(total)
    }

    /// Compress pending input and byte-align the stream so everything
    /// written so far is decodable.
    fn flush(&mut self) -> io::Result<()> {
        self.check()?;
        let res = match &mut self.engine {
            Engine::Dynamic(c) => c.flush(),
            Engine::Huffman(c) => c.flush(),
            Engine::Stored(c) => c.flush(),
        };
        self.latch(res)
    }
}
