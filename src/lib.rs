//! Streaming DEFLATE (RFC 1951) codec.
//!
//! The decompressor is a resumable state machine built around two-level
//! Huffman lookup tables (with multi-symbol literal packing on the hot
//! path) and a 32 KiB sliding history. The compressor tokenizes input
//! with a hash-probe LZ77 matcher and emits dynamic-Huffman blocks with
//! length-limited canonical codes.
//!
//! ```
//! use std::io::{Read, Write};
//!
//! let mut writer = fastflate::Writer::new(Vec::new(), fastflate::DEFAULT_COMPRESSION);
//! writer.write_all(b"hello hello hello hello").unwrap();
//! let compressed = writer.finish().unwrap();
//!
//! let mut reader = fastflate::Reader::new(&compressed[..]);
//! let mut out = Vec::new();
//! reader.read_to_end(&mut out).unwrap();
//! assert_eq!(out, b"hello hello hello hello");
//! ```

mod bits;
pub mod deflate;
mod error;
pub mod inflate;
mod huffman;
mod tables;

pub use deflate::{Writer, BEST_SPEED, DEFAULT_COMPRESSION, HUFFMAN_ONLY, NO_COMPRESSION};
pub use error::{Error, Result};
pub use inflate::{PeekReader, Reader};
