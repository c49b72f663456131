//! Block-header parsing and dynamic Huffman table setup.
//!
//! Header decoding is resumable: when the input slice runs out mid-header,
//! the bit buffer is restored from a snapshot, the bytes seen so far are
//! stashed in a 328-byte scratch buffer, and the next call replays them in
//! front of the fresh input.

use super::tables::{
    static_tables, SMALL_FLAG_BIT, SMALL_LONG_CODE_LEN_OFFSET, SMALL_LONG_SYM_MASK,
    SMALL_SHORT_CODE_LEN_OFFSET, SMALL_SHORT_SYM_MASK,
};
use super::{
    InflateState, Multisym, Phase, SmallCodeTable, DIST_LEN, DIST_LOOKUP_BITS, DOUBLE_SYM_THRESH,
    INVALID_SYMBOL, LITLEN_ELEMS, LIT_LEN, LIT_TABLE_SIZE, MAX_CODE_LEN, MAX_HDR_SIZE,
    MAX_LITLEN_COUNT, SINGLE_SYM_THRESH,
};
use crate::bits::reader::low_mask;
use crate::bits::BitBuffer;
use crate::error::Status;
use crate::huffman::code::MAX_TREE_DEPTH;
use crate::huffman::{bit_reverse, set_codes, HuffCode};
use crate::tables::{CODE_LENGTH_ORDER, LENGTH_EXTRA_BITS};

const CODE_LEN_CODES: usize = 19;

/// Per-block scratch for dynamic header decoding and table construction.
pub(crate) struct HeaderScratch {
    /// Code records for 257 literal symbols, then (after expansion) one
    /// record per reachable match length; distance records live at
    /// `LIT_LEN..LIT_LEN + DIST_LEN` until the distance table is built.
    pub lit_and_dist: [HuffCode; LITLEN_ELEMS],
    pub clc_table: SmallCodeTable,
    /// Symbol indexes grouped by (expanded) code length.
    pub code_list: [u32; LITLEN_ELEMS + 2],
    /// Raw length counts while reading the header; prefix sums afterwards.
    pub lit_count: [u16; MAX_LITLEN_COUNT],
    pub dist_count: [u16; 16],
    /// Wrapping deltas for extra-bit expansion, then insertion cursors.
    pub lit_expand_count: [u16; MAX_LITLEN_COUNT],
    pub next_code: [u32; 16],
    /// Length-symbol records saved before the expansion overwrites them.
    pub len_huff_codes: [HuffCode; LIT_LEN - LIT_TABLE_SIZE],
}

impl HeaderScratch {
    pub fn new() -> Self {
        Self {
            lit_and_dist: [HuffCode::default(); LITLEN_ELEMS],
            clc_table: SmallCodeTable::new(),
            code_list: [0; LITLEN_ELEMS + 2],
            lit_count: [0; MAX_LITLEN_COUNT],
            dist_count: [0; 16],
            lit_expand_count: [0; MAX_LITLEN_COUNT],
            next_code: [0; 16],
            len_huff_codes: [HuffCode::default(); LIT_LEN - LIT_TABLE_SIZE],
        }
    }

    fn reset_for_block(&mut self) {
        self.lit_and_dist = [HuffCode::default(); LITLEN_ELEMS];
        self.lit_count = [0; MAX_LITLEN_COUNT];
        self.dist_count = [0; 16];
        self.lit_expand_count = [0; MAX_LITLEN_COUNT];
    }

    /// Turn the per-length counts into canonical code assignments and
    /// expand every length symbol into one record per reachable match
    /// length (a symbol with k extra bits becomes 2^k records of length
    /// `code_len + k`).
    pub(crate) fn set_and_expand_litlen(&mut self) -> Result<(), Status> {
        let mut count_total: u32 = 0;
        let mut count_tmp: u32 = self.lit_expand_count[1] as u32;
        self.next_code[0] = 0;
        self.next_code[1] = 0;
        self.lit_expand_count[0] = 0;
        self.lit_expand_count[1] = 0;

        for i in 1..MAX_TREE_DEPTH {
            count_total =
                (self.lit_count[i] as u32).wrapping_add(count_tmp).wrapping_add(count_total);
            count_tmp = self.lit_expand_count[i + 1] as u32;
            self.lit_expand_count[i + 1] = count_total as u16;
            self.next_code[i + 1] = (self.next_code[i] + self.lit_count[i] as u32) << 1;
        }
        count_tmp = (self.lit_count[MAX_TREE_DEPTH] as u32).wrapping_add(count_tmp);
        for i in MAX_TREE_DEPTH..MAX_LITLEN_COUNT - 1 {
            count_total = count_tmp.wrapping_add(count_total);
            count_tmp = self.lit_expand_count[i + 1] as u32;
            self.lit_expand_count[i + 1] = count_total as u16;
        }

        let max = self.next_code[MAX_TREE_DEPTH] + self.lit_count[MAX_TREE_DEPTH] as u32;
        if max > 1 << MAX_TREE_DEPTH {
            return Err(Status::InvalidBlock);
        }

        self.lit_count = self.lit_expand_count;
        self.len_huff_codes.copy_from_slice(&self.lit_and_dist[LIT_TABLE_SIZE..LIT_LEN]);
        for entry in &mut self.lit_and_dist[LIT_TABLE_SIZE..] {
            *entry = HuffCode::default();
        }
        self.calc_code_for_lit();
        self.expand_len_codes();
        Ok(())
    }

    fn calc_code_for_lit(&mut self) {
        for i in 0..LIT_TABLE_SIZE {
            let code_len = self.lit_and_dist[i].length();
            if code_len == 0 {
                continue;
            }
            let code = bit_reverse(self.next_code[code_len as usize] as u16, code_len);
            let insert_index = self.lit_expand_count[code_len as usize];
            self.code_list[insert_index as usize] = i as u32;
            self.lit_expand_count[code_len as usize] = insert_index.wrapping_add(1);
            self.lit_and_dist[i].set(code, code_len);
            self.next_code[code_len as usize] += 1;
        }
    }

    fn expand_len_codes(&mut self) {
        let mut expands_idx = LIT_TABLE_SIZE;
        for len_sym in 0..LIT_LEN - LIT_TABLE_SIZE {
            let extra_count = LENGTH_EXTRA_BITS[len_sym] as u32;
            let len_size = 1usize << extra_count;

            let code_len = self.len_huff_codes[len_sym].length();
            if code_len == 0 {
                expands_idx += len_size;
                continue;
            }

            let code = bit_reverse(self.next_code[code_len as usize] as u16, code_len);
            let expand_len = code_len + extra_count;
            self.next_code[code_len as usize] += 1;
            let insert_index = self.lit_expand_count[expand_len as usize] as usize;
            self.lit_expand_count[expand_len as usize] =
                (insert_index as u16).wrapping_add(len_size as u16);

            for extra in 0..len_size {
                self.code_list[insert_index + extra] = expands_idx as u32;
                self.lit_and_dist[expands_idx].set(code | (extra as u32) << code_len, expand_len);
                expands_idx += 1;
            }
        }
    }
}

impl InflateState {
    /// Decode the next block header, replaying any bytes stashed by an
    /// earlier `EndInput` in front of the fresh input.
    pub(crate) fn read_header(&mut self, input: &mut &[u8]) -> Result<(), Status> {
        let saved_bits = self.bits;
        let saved_len = self.bits_len;
        let orig: &[u8] = *input;
        let phase = self.phase;

        let res = if phase == Phase::DecodingHeader {
            let buffered = self.header_buffered;
            let copy_size = (MAX_HDR_SIZE - buffered).min(orig.len());
            let mut tmp = [0u8; MAX_HDR_SIZE];
            tmp[..buffered].copy_from_slice(&self.header_buffer[..buffered]);
            tmp[buffered..buffered + copy_size].copy_from_slice(&orig[..copy_size]);
            let total = buffered + copy_size;
            let mut hdr_input: &[u8] = &tmp[..total];
            let r = self.try_decode_header(&mut hdr_input);
            let read = total - hdr_input.len() - buffered;
            *input = &orig[read..];
            r
        } else {
            self.try_decode_header(input)
        };

        if res == Err(Status::EndInput) {
            self.bits = saved_bits;
            self.bits_len = saved_len;
            let size = (MAX_HDR_SIZE - self.header_buffered).min(orig.len());
            self.header_buffer[self.header_buffered..self.header_buffered + size]
                .copy_from_slice(&orig[..size]);
            self.header_buffered += size;
            *input = &orig[orig.len()..];
            self.phase = Phase::DecodingHeader;
        } else {
            self.header_buffered = 0;
        }
        res
    }

    fn try_decode_header(&mut self, input: &mut &[u8]) -> Result<(), Status> {
        self.bfinal = self.read_bits(input, 1) as u32;
        let btype = self.read_bits(input, 2) as u32;
        if self.bits_len < 0 {
            return Err(Status::EndInput);
        }
        match btype {
            0 => self.prepare_for_lit_block(input),
            1 => {
                self.setup_static_header();
                Ok(())
            }
            2 => self.setup_dynamic_header(input),
            _ => Err(Status::InvalidBlock),
        }
    }

    /// Stored block: drop the 0..7 alignment bits, then validate LEN/NLEN.
    fn prepare_for_lit_block(&mut self, input: &mut &[u8]) -> Result<(), Status> {
        self.load_bits(input);
        let bytes = self.bits_len / 8;
        if bytes < 4 {
            return Err(Status::EndInput);
        }
        self.bits >>= (self.bits_len % 8) as u32;
        self.bits_len = bytes * 8;

        let len = (self.bits & 0xFFFF) as u16;
        self.bits >>= 16;
        let nlen = (self.bits & 0xFFFF) as u16;
        self.bits >>= 16;
        self.bits_len -= 32;

        if len != !nlen {
            return Err(Status::InvalidBlock);
        }
        self.bits &= low_mask(self.bits_len);

        self.lit_block_length = len as usize;
        self.phase = Phase::LitBlock;
        Ok(())
    }

    pub(crate) fn setup_static_header(&mut self) {
        let st = static_tables();
        self.litlen_table.clone_from(&st.litlen);
        self.dist_table.clone_from(&st.dist);
        self.phase = Phase::HeaderDecoded;
    }

    fn setup_dynamic_header(&mut self, input: &mut &[u8]) -> Result<(), Status> {
        self.scratch.reset_for_block();

        let mut multisym = Multisym::Triple;
        if self.bfinal != 0 && input.len() <= SINGLE_SYM_THRESH {
            multisym = Multisym::Single;
        } else if self.bfinal != 0 && input.len() <= DOUBLE_SYM_THRESH {
            multisym = Multisym::Double;
        }

        self.load_bits(input);
        if self.bits_len < 14 {
            return Err(Status::EndInput);
        }
        let hlit = self.next_bits(5) as usize;
        let hdist = self.next_bits(5) as usize;
        let hclen = self.next_bits(4) as usize;
        if hlit > 29 || hdist > 29 || hclen > 15 {
            return Err(Status::InvalidBlock);
        }

        self.code_len_codes(input, hclen)?;
        self.read_lit_dist_lens(input, hdist, hlit)?;
        if self.bits_len < 0 {
            return Err(Status::EndInput);
        }

        set_codes(
            &mut self.scratch.lit_and_dist[LIT_LEN..LIT_LEN + DIST_LEN],
            &self.scratch.dist_count,
        )?;
        self.dist_table.generate_for_dists(
            &mut self.scratch.lit_and_dist[LIT_LEN..LIT_LEN + DIST_LEN],
            &self.scratch.dist_count,
            DIST_LEN as u32,
        );
        self.scratch.set_and_expand_litlen()?;
        self.litlen_table.generate_for_litlen(&mut self.scratch, multisym);

        self.phase = Phase::HeaderDecoded;
        Ok(())
    }

    /// Read the HCLEN 3-bit lengths in permutation order and build the
    /// code-length-code table.
    fn code_len_codes(&mut self, input: &mut &[u8], hclen: usize) -> Result<(), Status> {
        let mut code_huff = [HuffCode::default(); CODE_LEN_CODES];
        let mut code_count = [0u16; 16];

        for i in 0..4 {
            let length = self.next_bits(3) as u32;
            code_huff[CODE_LENGTH_ORDER[i]].set(0, length);
            code_count[length as usize] += 1;
        }
        self.load_bits(input);
        for i in 4..hclen + 4 {
            let length = self.next_bits(3) as u32;
            code_huff[CODE_LENGTH_ORDER[i]].set(0, length);
            code_count[length as usize] += 1;
        }
        if self.bits_len < 0 {
            return Err(Status::EndInput);
        }

        set_codes(&mut code_huff, &code_count)?;
        self.scratch.clc_table.generate_for_header(
            &mut code_huff,
            &code_count,
            CODE_LEN_CODES as u32,
        );
        Ok(())
    }

    /// Decode exactly `hlit + hdist + 258` code lengths for the combined
    /// literal/length and distance alphabets, tracking the expansion
    /// deltas for length symbols with extra bits as they stream past.
    fn read_lit_dist_lens(
        &mut self,
        input: &mut &[u8],
        hdist: usize,
        hlit: usize,
    ) -> Result<(), Status> {
        let mut b = BitBuffer::new(self.bits, self.bits_len, *input);
        let end = LIT_LEN + hdist + 1;
        let boundary = LIT_TABLE_SIZE + hlit;
        let mut curr = 0usize;
        let mut prev: isize = -1;
        let mut counting_dist = false;
        let mut result = Ok(());

        'decode: while curr < end {
            let symbol;
            {
                if b.len <= MAX_CODE_LEN {
                    b.refill();
                }
                let next_bits = b.peek(DIST_LOOKUP_BITS as u8) as u32;
                let mut next_sym = self.scratch.clc_table.short_lookup[next_bits as usize] as u32;
                if next_sym & SMALL_FLAG_BIT == 0 {
                    let bit_count = next_sym >> SMALL_SHORT_CODE_LEN_OFFSET;
                    b.consume(bit_count);
                    if bit_count == 0 {
                        next_sym = INVALID_SYMBOL;
                    }
                    symbol = next_sym & SMALL_SHORT_SYM_MASK;
                } else {
                    let mask_bits = (next_sym - SMALL_FLAG_BIT) >> SMALL_SHORT_CODE_LEN_OFFSET;
                    let bit_mask = (1u32 << mask_bits) - 1;
                    let long_bits = (b.bits as u32) & bit_mask;
                    next_sym = self.scratch.clc_table.long_lookup[((next_sym
                        & SMALL_SHORT_SYM_MASK)
                        + (long_bits >> DIST_LOOKUP_BITS))
                        as usize] as u32;
                    let bit_count = next_sym >> SMALL_LONG_CODE_LEN_OFFSET;
                    b.consume(bit_count);
                    symbol = next_sym & SMALL_LONG_SYM_MASK;
                }
            }
            if b.len < 0 {
                // A header missing its end-of-block code can be rejected
                // before more input arrives.
                result = if curr > 256 && self.scratch.lit_and_dist[256].length() == 0 {
                    Err(Status::InvalidBlock)
                } else {
                    Err(Status::EndInput)
                };
                break 'decode;
            }

            match symbol {
                0..=15 => {
                    if curr == boundary {
                        curr = LIT_LEN;
                        counting_dist = true;
                    }
                    if counting_dist {
                        self.scratch.dist_count[symbol as usize] += 1;
                    } else {
                        self.scratch.lit_count[symbol as usize] += 1;
                    }
                    self.scratch.lit_and_dist[curr].set(0, symbol);
                    prev = curr as isize;
                    curr += 1;
                    if symbol == 0 || prev >= boundary as isize || prev < 264 {
                        continue;
                    }
                    let extra = LENGTH_EXTRA_BITS[prev as usize - LIT_TABLE_SIZE] as usize;
                    let s = symbol as usize;
                    self.scratch.lit_expand_count[s] =
                        self.scratch.lit_expand_count[s].wrapping_sub(1);
                    self.scratch.lit_expand_count[s + extra] =
                        self.scratch.lit_expand_count[s + extra].wrapping_add(1 << extra);
                }
                16 => {
                    b.refill();
                    let repeat = 3 + b.take(2) as usize;
                    if curr + repeat > end || prev == -1 {
                        result = Err(Status::InvalidBlock);
                        break 'decode;
                    }
                    let rep_code = self.scratch.lit_and_dist[prev as usize];
                    for _ in 0..repeat {
                        if curr == boundary {
                            curr = LIT_LEN;
                            counting_dist = true;
                        }
                        self.scratch.lit_and_dist[curr] = rep_code;
                        let l = rep_code.length() as usize;
                        if counting_dist {
                            self.scratch.dist_count[l] += 1;
                        } else {
                            self.scratch.lit_count[l] += 1;
                        }
                        prev = curr as isize;
                        curr += 1;
                        if rep_code.length() == 0 || prev >= boundary as isize || prev < 264 {
                            continue;
                        }
                        let extra = LENGTH_EXTRA_BITS[prev as usize - LIT_TABLE_SIZE] as usize;
                        self.scratch.lit_expand_count[l] =
                            self.scratch.lit_expand_count[l].wrapping_sub(1);
                        self.scratch.lit_expand_count[l + extra] =
                            self.scratch.lit_expand_count[l + extra].wrapping_add(1 << extra);
                    }
                }
                17 => {
                    b.refill();
                    let repeat = 3 + b.take(3) as usize;
                    curr += repeat;
                    prev = curr as isize - 1;
                    if !counting_dist && curr > boundary {
                        curr += LIT_LEN - boundary;
                        counting_dist = true;
                        if curr > LIT_LEN {
                            prev = curr as isize - 1;
                        }
                    }
                }
                18 => {
                    b.refill();
                    let repeat = 11 + b.take(7) as usize;
                    curr += repeat;
                    prev = curr as isize - 1;
                    if !counting_dist && curr > boundary {
                        curr += LIT_LEN - boundary;
                        counting_dist = true;
                        if curr > LIT_LEN {
                            prev = curr as isize - 1;
                        }
                    }
                }
                _ => {
                    result = Err(Status::InvalidBlock);
                    break 'decode;
                }
            }
        }

        if result.is_ok() && (curr > end || self.scratch.lit_and_dist[256].length() == 0) {
            result = Err(Status::InvalidBlock);
        }

        self.bits = b.bits;
        self.bits_len = b.len;
        *input = b.input;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::InflateState;

    fn state() -> Box<InflateState> {
        Box::new(InflateState::new())
    }

    #[test]
    fn stored_header_validates_nlen() {
        // BFINAL=1, BTYPE=00, LEN=5, NLEN=!5.
        let data = [0b0000_0001u8, 0x05, 0x00, 0xFA, 0xFF];
        let mut s = state();
        let mut input: &[u8] = &data;
        s.read_header(&mut input).unwrap();
        assert_eq!(s.phase, Phase::LitBlock);
        assert_eq!(s.lit_block_length, 5);
        assert_eq!(s.bfinal, 1);
    }

    #[test]
    fn stored_header_rejects_mismatched_nlen() {
        let data = [0b0000_0001u8, 0x05, 0x00, 0x00, 0x00];
        let mut s = state();
        let mut input: &[u8] = &data;
        assert_eq!(s.read_header(&mut input), Err(Status::InvalidBlock));
    }

    #[test]
    fn reserved_block_type_rejected() {
        // BTYPE=11.
        let data = [0b0000_0111u8, 0, 0, 0, 0, 0, 0, 0];
        let mut s = state();
        let mut input: &[u8] = &data;
        assert_eq!(s.read_header(&mut input), Err(Status::InvalidBlock));
    }

    #[test]
    fn static_header_installs_tables() {
        let data = [0b0000_0011u8, 0, 0, 0, 0, 0, 0, 0];
        let mut s = state();
        let mut input: &[u8] = &data;
        s.read_header(&mut input).unwrap();
        assert_eq!(s.phase, Phase::HeaderDecoded);
        // Spot-check the installed table: EOB at index 0, 7 bits.
        assert_eq!(s.litlen_table.short_lookup[0] & 0xFFFF, 256);
    }

    #[test]
    fn truncated_header_buffers_and_resumes() {
        // Compressible prose makes flate2 emit a dynamic block, whose
        // header spans well past two bytes.
        let compressed = {
            use std::io::Write;
            let mut enc =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::new(9));
            let data = b"the quick brown fox jumps over the lazy dog. ".repeat(200);
            enc.write_all(&data).unwrap();
            enc.finish().unwrap()
        };
        let mut s = state();
        let mut input: &[u8] = &compressed[..2];
        let r = s.read_header(&mut input);
        assert_eq!(r, Err(Status::EndInput));
        assert_eq!(s.phase, Phase::DecodingHeader);
        assert!(s.header_buffered >= 2);
        assert!(input.is_empty());

        // Retry with the remainder; the stashed bytes are replayed.
        let mut rest: &[u8] = &compressed[2..];
        s.read_header(&mut rest).unwrap();
        assert!(matches!(s.phase, Phase::HeaderDecoded | Phase::LitBlock));
    }

    #[test]
    fn corrupt_header_bits_never_panic() {
        let compressed = {
            use std::io::Write;
            let mut enc =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::new(9));
            let data: Vec<u8> = (0..4000u32).map(|i| (i % 7) as u8 * 31).collect();
            enc.write_all(&data).unwrap();
            enc.finish().unwrap()
        };
        // Flipping bits in the header region must never panic; it either
        // errors or (rarely) still parses.
        for byte in 1..12usize {
            let mut bad = compressed.clone();
            bad[byte] ^= 0xA5;
            let mut s = state();
            let mut input: &[u8] = &bad;
            let _ = s.read_header(&mut input);
        }
    }
}
