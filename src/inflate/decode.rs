//! Block payload decoding: stored-block drain and the Huffman hot loop.

use super::tables::{
    DIST_SYM_MASK, LARGE_FLAG_BIT, LARGE_LONG_CODE_LEN_OFFSET, LARGE_LONG_SYM_MASK,
    LARGE_SHORT_CODE_LEN_OFFSET, LARGE_SHORT_MAX_LEN_OFFSET, LARGE_SHORT_SYM_MASK,
    LARGE_SYM_COUNT_MASK, LARGE_SYM_COUNT_OFFSET, SMALL_FLAG_BIT, SMALL_LONG_CODE_LEN_OFFSET,
    SMALL_SHORT_CODE_LEN_OFFSET, SMALL_SHORT_SYM_MASK,
};
use super::{
    InflateState, Phase, DIST_LEN, DIST_LOOKUP_BITS, INVALID_SYMBOL, LITLEN_LOOKUP_BITS,
    MAX_CODE_LEN, MAX_LITLEN_SYM,
};
use crate::bits::BitBuffer;
use crate::error::Status;
use crate::tables::{DIST_EXTRA_BITS, DIST_START};

pub(crate) type DecodeResult = (usize, Result<(), Status>);

/// Drain a stored block. Any 0..7 alignment bits were dropped by the
/// header parser, but whole bytes already pulled into the bit buffer must
/// come out of it before the bulk copy from the input slice.
pub(crate) fn decode_literal_block(
    state: &mut InflateState,
    input: &mut &[u8],
    output: &mut [u8],
    mut written: usize,
) -> DecodeResult {
    state.phase = if state.bfinal != 0 { Phase::StreamEnd } else { Phase::NewBlock };
    if state.lit_block_length == 0 {
        return (written, Ok(()));
    }
    let mut length = state.lit_block_length;
    let rest = output.len() - written;
    let mut result = Ok(());

    if length > rest {
        length = rest;
        state.phase = Phase::LitBlock;
        result = Err(Status::OutputOverflow);
        if rest == 0 {
            return (written, result);
        }
    }
    let avail = (state.bits_len / 8) as usize + input.len();
    if length > avail {
        length = avail;
        state.phase = Phase::LitBlock;
        result = Err(Status::EndInput);
    }
    state.lit_block_length -= length;

    let mut count = 0usize;
    while state.bits_len != 0 {
        output[written] = (state.bits & 0xFF) as u8;
        written += 1;
        state.bits >>= 8;
        state.bits_len -= 8;
        count += 1;
        if count == length {
            return (written, result);
        }
    }

    let num = (length - count).min(input.len());
    output[written..written + num].copy_from_slice(&input[..num]);
    written += num;
    *input = &input[num..];
    state.bits = 0;
    (written, result)
}

/// The Huffman decode hot loop.
///
/// Each iteration refills to at least 57 bits, snapshots the bit state,
/// and decodes one literal/length table entry (1..3 packed literals, a
/// single symbol, or a long-code pointer chase). Output-full conditions
/// stash the surplus in the overflow fields instead of checking bounds
/// per symbol; bit-buffer underflow restores the snapshot and reports
/// `EndInput`.
pub(crate) fn decode_huffman(
    state: &mut InflateState,
    input: &mut &[u8],
    output: &mut [u8],
    mut written: usize,
) -> DecodeResult {
    let mut b = BitBuffer::new(state.bits, state.bits_len, *input);
    let mut result: Result<(), Status> = Ok(());

    state.copy_overflow_length = 0;
    state.copy_overflow_distance = 0;

    'decode: while state.phase == Phase::HeaderDecoded {
        b.refill();
        let snapshot = b;
        let written_snapshot = written;

        let mut next_lits: u32;
        let mut sym_count: u32;
        {
            if b.len <= MAX_CODE_LEN {
                b.refill();
            }
            let next_bits = b.peek(LITLEN_LOOKUP_BITS as u8) as u32;
            let mut next_sym = state.litlen_table.short_lookup[next_bits as usize];
            if next_sym & LARGE_FLAG_BIT == 0 {
                let bit_count = next_sym >> LARGE_SHORT_CODE_LEN_OFFSET;
                b.consume(bit_count);
                if bit_count == 0 {
                    next_sym = INVALID_SYMBOL;
                }
                sym_count = (next_sym >> LARGE_SYM_COUNT_OFFSET) & LARGE_SYM_COUNT_MASK;
                next_lits = next_sym & LARGE_SHORT_SYM_MASK;
            } else {
                let max_len = next_sym >> LARGE_SHORT_MAX_LEN_OFFSET;
                let bit_mask = (1u32 << max_len) - 1;
                let long_bits = (b.bits as u32) & bit_mask;
                next_sym = state.litlen_table.long_lookup[((next_sym & LARGE_SHORT_SYM_MASK)
                    + (long_bits >> LITLEN_LOOKUP_BITS))
                    as usize] as u32;
                let bit_count = next_sym >> LARGE_LONG_CODE_LEN_OFFSET;
                b.consume(bit_count);
                if bit_count == 0 {
                    next_sym = INVALID_SYMBOL;
                }
                sym_count = 1;
                next_lits = next_sym & LARGE_LONG_SYM_MASK;
            }
        }

        if sym_count == 0 {
            result = Err(Status::InvalidSymbol);
            break 'decode;
        }
        if b.len < 0 {
            b = snapshot;
            result = Err(Status::EndInput);
            break 'decode;
        }

        while sym_count > 0 {
            let next_lit = next_lits & 0xFFFF;
            if next_lit < 256 || sym_count > 1 {
                if output.len() == written {
                    // Park the undelivered literals; if the entry ends in
                    // a length symbol, decode its match now so the copy
                    // overflow fields capture it too.
                    state.write_overflow_lits = next_lits;
                    state.write_overflow_len = sym_count;
                    next_lits >>= 8 * (sym_count - 1);
                    sym_count = 1;
                    if next_lits < 256 {
                        result = Err(Status::OutputOverflow);
                        break 'decode;
                    } else if next_lits == 256 {
                        state.write_overflow_len -= 1;
                        state.phase =
                            if state.bfinal == 1 { Phase::StreamEnd } else { Phase::NewBlock };
                        result = Err(Status::OutputOverflow);
                        break 'decode;
                    } else {
                        state.write_overflow_len -= 1;
                        continue;
                    }
                }
                output[written] = next_lit as u8;
                written += 1;
            } else if next_lit == 256 {
                state.phase = if state.bfinal == 1 { Phase::StreamEnd } else { Phase::NewBlock };
            } else if next_lit <= MAX_LITLEN_SYM {
                let mut repeat_length = (next_lit - 254) as usize;

                if b.len <= MAX_CODE_LEN {
                    b.refill();
                }
                let next_bits = b.peek(DIST_LOOKUP_BITS as u8) as u32;
                let mut next_sym = state.dist_table.short_lookup[next_bits as usize] as u32;
                let next_dist;
                if next_sym & SMALL_FLAG_BIT == 0 {
                    let bit_count = next_sym >> SMALL_SHORT_CODE_LEN_OFFSET;
                    b.consume(bit_count);
                    if bit_count == 0 {
                        b.len -= next_sym as i32;
                        next_sym = INVALID_SYMBOL;
                    }
                    next_dist = next_sym & DIST_SYM_MASK;
                } else {
                    let mask_bits = (next_sym - SMALL_FLAG_BIT) >> SMALL_SHORT_CODE_LEN_OFFSET;
                    let bit_mask = (1u32 << mask_bits) - 1;
                    let long_bits = (b.bits as u32) & bit_mask;
                    next_sym = state.dist_table.long_lookup[((next_sym & SMALL_SHORT_SYM_MASK)
                        + (long_bits >> DIST_LOOKUP_BITS))
                        as usize] as u32;
                    let bit_count = next_sym >> SMALL_LONG_CODE_LEN_OFFSET;
                    b.consume(bit_count);
                    if bit_count == 0 {
                        b.len -= next_sym as i32;
                        next_sym = INVALID_SYMBOL;
                    }
                    next_dist = next_sym & DIST_SYM_MASK;
                }

                let mut look_back_dist = 0usize;
                if b.len >= 0 {
                    if next_dist >= DIST_LEN as u32 {
                        result = Err(Status::InvalidSymbol);
                        break 'decode;
                    }
                    let bit_count = DIST_EXTRA_BITS[next_dist as usize];
                    b.refill();
                    let extra = b.take(bit_count);
                    look_back_dist = DIST_START[next_dist as usize] as usize + extra as usize;
                }

                if b.len < 0 {
                    b = snapshot;
                    written = written_snapshot;
                    state.write_overflow_lits = 0;
                    state.write_overflow_len = 0;
                    result = Err(Status::EndInput);
                    break 'decode;
                }
                if written < look_back_dist {
                    result = Err(Status::InvalidLookBack);
                    break 'decode;
                }

                let avail_out = output.len() - written;
                if avail_out < repeat_length {
                    state.copy_overflow_length = (repeat_length - avail_out) as u32;
                    state.copy_overflow_distance = look_back_dist as u32;
                    repeat_length = avail_out;
                }

                if look_back_dist >= repeat_length {
                    let (head, tail) = output.split_at_mut(written);
                    let src = written - look_back_dist;
                    tail[..repeat_length].copy_from_slice(&head[src..src + repeat_length]);
                } else {
                    byte_copy(output, written, look_back_dist, repeat_length);
                }
                written += repeat_length;

                if state.copy_overflow_length > 0 {
                    result = Err(Status::OutputOverflow);
                    break 'decode;
                }
            } else {
                result = Err(Status::InvalidSymbol);
                break 'decode;
            }
            next_lits >>= 8;
            sym_count -= 1;
        }
    }

    b.clamp();
    state.bits = b.bits;
    state.bits_len = b.len;
    *input = b.input;
    (written, result)
}

/// Forward overlap copy with LZ77 semantics: the source pattern doubles
/// every pass, so RLE-style references (dist < len) replicate correctly.
pub(crate) fn byte_copy(buf: &mut [u8], mut curr: usize, dist: usize, length: usize) {
    let end = curr + length;
    let start = curr - dist;
    while curr < end {
        let n = (curr - start).min(end - curr);
        let (head, tail) = buf.split_at_mut(curr);
        tail[..n].copy_from_slice(&head[start..start + n]);
        curr += n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_copy_rle_single_byte() {
        let mut buf = vec![0u8; 16];
        buf[0] = b'A';
        byte_copy(&mut buf, 1, 1, 5);
        assert_eq!(&buf[..6], b"AAAAAA");
    }

    #[test]
    fn byte_copy_pattern() {
        let mut buf = vec![0u8; 16];
        buf[..2].copy_from_slice(b"AB");
        byte_copy(&mut buf, 2, 2, 6);
        assert_eq!(&buf[..8], b"ABABABAB");
    }

    #[test]
    fn byte_copy_longer_distance() {
        let mut buf = vec![0u8; 16];
        buf[..4].copy_from_slice(b"WXYZ");
        byte_copy(&mut buf, 4, 4, 3);
        assert_eq!(&buf[..7], b"WXYZWXY");
    }

    #[test]
    fn stored_block_drains_bit_buffer_first() {
        let mut state = Box::new(InflateState::new());
        // Header: BFINAL=1, BTYPE=00, then LEN=3/NLEN, then payload.
        let data = [0b0000_0001u8, 0x03, 0x00, 0xFC, 0xFF, b'x', b'y', b'z'];
        let mut input: &[u8] = &data;
        state.read_header(&mut input).unwrap();
        assert_eq!(state.phase, Phase::LitBlock);
        let mut out = [0u8; 8];
        let (written, res) = decode_literal_block(&mut state, &mut input, &mut out, 0);
        res.unwrap();
        assert_eq!(written, 3);
        assert_eq!(&out[..3], b"xyz");
        assert_eq!(state.phase, Phase::StreamEnd);
    }

    #[test]
    fn stored_block_partial_output() {
        let mut state = Box::new(InflateState::new());
        let data = [0b0000_0001u8, 0x04, 0x00, 0xFB, 0xFF, b'a', b'b', b'c', b'd'];
        let mut input: &[u8] = &data;
        state.read_header(&mut input).unwrap();
        let mut out = [0u8; 2];
        let (written, res) = decode_literal_block(&mut state, &mut input, &mut out, 0);
        assert_eq!(res, Err(Status::OutputOverflow));
        assert_eq!(written, 2);
        assert_eq!(&out[..], b"ab");
        assert_eq!(state.phase, Phase::LitBlock);
        assert_eq!(state.lit_block_length, 2);

        let mut out2 = [0u8; 4];
        let (written, res) = decode_literal_block(&mut state, &mut input, &mut out2, 0);
        res.unwrap();
        assert_eq!(written, 2);
        assert_eq!(&out2[..2], b"cd");
        assert_eq!(state.phase, Phase::StreamEnd);
    }

    #[test]
    fn static_block_decodes_literals_and_match() {
        // flate2 with fixed-code preference still emits valid streams we
        // can decode; build one by hand instead: BFINAL=1 BTYPE=01, then
        // "abcabcabc" as literals 'a','b','c' + match(len 6, dist 3) + EOB.
        let mut w = crate::bits::BitWriter::with_capacity(64);
        w.write_bits(0b011, 3); // final + static
        for &byte in b"abc" {
            // Static literal codes for 'a'..'c' are 8 bits: 0x30 + byte.
            let code = crate::huffman::bit_reverse(0x30 + byte as u16, 8);
            w.write_bits(code as u16, 8);
        }
        // Length 6 -> code 260, 7-bit code (260 - 256 = 4).
        let len_code = crate::huffman::bit_reverse(4, 7);
        w.write_bits(len_code as u16, 7);
        // Distance 3 -> symbol 2, 5-bit code.
        let dist_code = crate::huffman::bit_reverse(2, 5);
        w.write_bits(dist_code as u16, 5);
        // End of block: 7-bit zero code.
        w.write_bits(0, 7);
        w.flush_last_byte();

        let mut state = Box::new(InflateState::new());
        let mut input: &[u8] = w.pending();
        state.read_header(&mut input).unwrap();
        assert_eq!(state.phase, Phase::HeaderDecoded);
        let mut out = [0u8; 16];
        let (written, res) = decode_huffman(&mut state, &mut input, &mut out, 0);
        res.unwrap();
        assert_eq!(written, 9);
        assert_eq!(&out[..9], b"abcabcabc");
        assert_eq!(state.phase, Phase::StreamEnd);
    }

    #[test]
    fn lookback_past_history_rejected() {
        // Static block: a match with distance 4 before any output exists.
        let mut w = crate::bits::BitWriter::with_capacity(64);
        w.write_bits(0b011, 3);
        let len_code = crate::huffman::bit_reverse(4, 7); // length 6
        w.write_bits(len_code as u16, 7);
        let dist_code = crate::huffman::bit_reverse(3, 5); // distance 4
        w.write_bits(dist_code as u16, 5);
        w.write_bits(0, 7);
        w.flush_last_byte();

        let mut state = Box::new(InflateState::new());
        let mut input: &[u8] = w.pending();
        state.read_header(&mut input).unwrap();
        let mut out = [0u8; 16];
        let (_, res) = decode_huffman(&mut state, &mut input, &mut out, 0);
        assert_eq!(res, Err(Status::InvalidLookBack));
    }

    #[test]
    fn output_overflow_stashes_copy() {
        // "aaaaaaaa" via literal 'a' + match(len 7, dist 1) into a 4-byte
        // output: the rest must land in the copy overflow fields.
        let mut w = crate::bits::BitWriter::with_capacity(64);
        w.write_bits(0b011, 3);
        let lit = crate::huffman::bit_reverse(0x30 + b'a' as u16, 8);
        w.write_bits(lit as u16, 8);
        let len_code = crate::huffman::bit_reverse(5, 7); // code 261 = length 7
        w.write_bits(len_code as u16, 7);
        let dist_code = crate::huffman::bit_reverse(0, 5); // distance 1
        w.write_bits(dist_code as u16, 5);
        w.write_bits(0, 7);
        w.flush_last_byte();

        let mut state = Box::new(InflateState::new());
        let mut input: &[u8] = w.pending();
        state.read_header(&mut input).unwrap();
        let mut out = [0u8; 4];
        let (written, res) = decode_huffman(&mut state, &mut input, &mut out, 0);
        assert_eq!(res, Err(Status::OutputOverflow));
        assert_eq!(written, 4);
        assert_eq!(&out[..], b"aaaa");
        assert_eq!(state.copy_overflow_length, 4);
        assert_eq!(state.copy_overflow_distance, 1);
    }

    #[test]
    fn end_input_mid_symbol_restores_state() {
        let mut w = crate::bits::BitWriter::with_capacity(64);
        w.write_bits(0b011, 3);
        for &byte in b"hello" {
            let code = crate::huffman::bit_reverse(0x30 + byte as u16, 8);
            w.write_bits(code as u16, 8);
        }
        w.write_bits(0, 7);
        w.flush_last_byte();
        let stream = w.pending().to_vec();

        // Truncate before the end-of-block code completes.
        let mut state = Box::new(InflateState::new());
        let mut input: &[u8] = &stream[..3];
        state.read_header(&mut input).unwrap();
        let mut out = [0u8; 16];
        let (written, res) = decode_huffman(&mut state, &mut input, &mut out, 0);
        assert_eq!(res, Err(Status::EndInput));
        assert!(written < 5);
        assert_eq!(state.phase, Phase::HeaderDecoded);

        // Feeding the rest completes the stream.
        let mut rest: &[u8] = &stream[3..];
        let (written, res) = decode_huffman(&mut state, &mut rest, &mut out, written);
        res.unwrap();
        assert_eq!(written, 5);
        assert_eq!(&out[..5], b"hello");
        assert_eq!(state.phase, Phase::StreamEnd);
    }
}
