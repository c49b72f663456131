//! Huffman decode tables.
//!
//! Both tables share one design: a direct-indexed short lookup covering
//! codes up to the lookup width, and a long-code overflow area reached
//! through pointer entries. A leaf and a pointer reuse the same slot,
//! distinguished by a flag bit; the consumed bit count always sits in the
//! top bits so one shift recovers it.
//!
//! The small table serves the distance and code-length-code alphabets
//! (16-bit entries). The large table serves literal/length symbols
//! (32-bit entries) and additionally packs up to three short literal codes
//! into a single entry for multi-symbol decode.

use super::header::HeaderScratch;
use super::{
    Multisym, DIST_LEN, DIST_LOOKUP_BITS, INVALID_CODE, LITLEN_LOOKUP_BITS, LIT_TABLE_SIZE,
    MAX_LITLEN_CODE_LEN, MAX_LITLEN_COUNT, MAX_LITLEN_SYM,
};
use crate::huffman::{bit_reverse, HuffCode};
use crate::tables::{
    static_litlen_length, DIST_EXTRA_BITS, LENGTH_EXTRA_BITS, LENGTH_START, STATIC_DIST_LENGTH,
};
use std::sync::OnceLock;

// Small-table entry layout. Leaf: symbol in bits 0..9, code length in bits
// 11..16. Pointer: long-area offset in bits 0..10, max group length in bits
// 11..16, flag bit 10 set. Distance leaves also carry the extra-bit count
// in bits 5..9.
pub(crate) const SMALL_SHORT_SYM_MASK: u32 = (1 << 9) - 1;
pub(crate) const SMALL_LONG_SYM_MASK: u32 = (1 << 9) - 1;
pub(crate) const SMALL_SHORT_CODE_LEN_OFFSET: u32 = 11;
pub(crate) const SMALL_LONG_CODE_LEN_OFFSET: u32 = 10;
pub(crate) const SMALL_FLAG_BIT: u32 = 1 << 10;
pub(crate) const DIST_SYM_MASK: u32 = (1 << 5) - 1;
pub(crate) const DIST_SYM_EXTRA_OFFSET: u32 = 5;

// Large-table entry layout. Multi-symbol leaf: packed symbols in bits
// 0..25 (8 bits each, a trailing length symbol may use up to 10), symbol
// count in bits 26..28, total bit length in bits 28..32. Pointer: long
// -area offset in bits 0..25, flag bit 25 set, max group length in bits
// 26..32. Long-area leaf: symbol in bits 0..10, length above.
pub(crate) const LARGE_SHORT_SYM_MASK: u32 = (1 << 25) - 1;
pub(crate) const LARGE_LONG_SYM_MASK: u32 = (1 << 10) - 1;
pub(crate) const LARGE_SHORT_CODE_LEN_OFFSET: u32 = 28;
pub(crate) const LARGE_LONG_CODE_LEN_OFFSET: u32 = 10;
pub(crate) const LARGE_FLAG_BIT: u32 = 1 << 25;
pub(crate) const LARGE_SYM_COUNT_OFFSET: u32 = 26;
pub(crate) const LARGE_SYM_COUNT_MASK: u32 = 3;
pub(crate) const LARGE_SHORT_MAX_LEN_OFFSET: u32 = 26;

/// Expanded table indexes 257..=513 map onto literal/length values; 513 is
/// the duplicate length-258 code sharing value 512.
#[inline]
pub(crate) fn index_to_sym(index: u32) -> u32 {
    if index != 513 {
        index
    } else {
        512
    }
}

#[derive(Clone)]
pub(crate) struct SmallCodeTable {
    pub short_lookup: [u16; 1 << DIST_LOOKUP_BITS],
    pub long_lookup: [u16; 80],
}

impl SmallCodeTable {
    pub fn new() -> Self {
        Self { short_lookup: [0; 1 << DIST_LOOKUP_BITS], long_lookup: [0; 80] }
    }

    /// Build the table for a header (code-length-code) alphabet.
    pub fn generate_for_header(&mut self, codes: &mut [HuffCode], count: &[u16; 16], max_symbol: u32) {
        self.generate(codes, count, max_symbol, false);
    }

    /// Build the table for a distance alphabet. Leaves additionally carry
    /// the symbol's extra-bit count so the hot loop reads the extra bits
    /// straight after the lookup.
    pub fn generate_for_dists(&mut self, codes: &mut [HuffCode], count: &[u16; 16], max_symbol: u32) {
        self.generate(codes, count, max_symbol, true);
    }

    fn generate(&mut self, codes: &mut [HuffCode], count: &[u16; 16], max_symbol: u32, dists: bool) {
        let mut count_total = [0u32; 17];
        for i in 2..17 {
            count_total[i] = count_total[i - 1] + count[i - 1] as u32;
        }
        let code_list_len = count_total[16] as usize;
        if code_list_len == 0 {
            return;
        }

        // Sort symbols by code length with a counting bucket.
        let mut count_total_tmp = count_total;
        let mut code_list = [0u32; DIST_LEN + 2];
        for (i, code) in codes.iter().enumerate() {
            let code_length = code.length() as usize;
            if code_length == 0 {
                continue;
            }
            let insert_index = count_total_tmp[code_length] as usize;
            code_list[insert_index] = i as u32;
            count_total_tmp[code_length] += 1;
        }

        let mut last_length = codes[code_list[0] as usize].length();
        if last_length > DIST_LOOKUP_BITS {
            last_length = DIST_LOOKUP_BITS + 1;
        }
        let mut copy_size = 1usize << (last_length - 1);
        // Slots never reached by a code must read as invalid (length 0),
        // not as leftovers of the previous block's table.
        self.short_lookup[..copy_size].fill(0);

        while last_length <= DIST_LOOKUP_BITS {
            self.short_lookup.copy_within(..copy_size, copy_size);
            copy_size *= 2;

            for k in count_total[last_length as usize]..count_total[last_length as usize + 1] {
                let idx = code_list[k as usize];
                let code = codes[idx as usize];
                if idx >= max_symbol {
                    if dists {
                        // Reserved symbols decode as invalid but keep their
                        // slot from aliasing a real code.
                        self.short_lookup[code.code() as usize] = code.length() as u16;
                    }
                    continue;
                }
                let entry = if dists {
                    idx | (DIST_EXTRA_BITS[idx as usize] as u32) << DIST_SYM_EXTRA_OFFSET
                        | code.length() << SMALL_SHORT_CODE_LEN_OFFSET
                } else {
                    idx | code.length() << SMALL_SHORT_CODE_LEN_OFFSET
                };
                self.short_lookup[code.code() as usize] = entry as u16;
            }
            last_length += 1;
        }

        // Group long codes by their shared low lookup-width bits; every
        // group gets a span of the long area sized by its deepest code.
        let long_code_start = count_total[DIST_LOOKUP_BITS as usize + 1] as usize;
        let long_code_length = code_list_len - long_code_start;
        let long_code_list = &code_list[long_code_start..];
        let mut long_lookup_length = 0usize;
        let mut temp_code_list = [0u16; 1 << (15 - DIST_LOOKUP_BITS)];

        for i in 0..long_code_length {
            if codes[long_code_list[i] as usize].code() == 0xFFFF {
                continue;
            }
            let mut max_length = codes[long_code_list[i] as usize].length();
            let first_bits =
                codes[long_code_list[i] as usize].code() & ((1 << DIST_LOOKUP_BITS) - 1);

            temp_code_list[0] = long_code_list[i] as u16;
            let mut temp_code_length = 1usize;
            for j in i + 1..long_code_length {
                if codes[long_code_list[j] as usize].code() & ((1 << DIST_LOOKUP_BITS) - 1)
                    == first_bits
                {
                    if max_length < codes[long_code_list[j] as usize].length() {
                        max_length = codes[long_code_list[j] as usize].length();
                    }
                    temp_code_list[temp_code_length] = long_code_list[j] as u16;
                    temp_code_length += 1;
                }
            }

            let span = 1usize << (max_length - DIST_LOOKUP_BITS);
            if long_lookup_length + span > self.long_lookup.len() {
                // Only a grossly incomplete code can exhaust the long
                // area; poison the prefix so it decodes as invalid.
                self.short_lookup[first_bits as usize] = 0;
                continue;
            }
            let zero_end = (long_lookup_length + 2 * span).min(self.long_lookup.len());
            self.long_lookup[long_lookup_length..zero_end].fill(0);

            for &sym in &temp_code_list[..temp_code_length] {
                let code_length = codes[sym as usize].length();
                let mut long_bits = (codes[sym as usize].code() >> DIST_LOOKUP_BITS) as usize;
                let min_increment = 1usize << (code_length - DIST_LOOKUP_BITS);
                while long_bits < span {
                    let entry = if sym as u32 >= max_symbol {
                        code_length as u16
                    } else if dists {
                        (sym as u32
                            | (DIST_EXTRA_BITS[sym as usize] as u32) << DIST_SYM_EXTRA_OFFSET
                            | code_length << SMALL_LONG_CODE_LEN_OFFSET) as u16
                    } else {
                        (sym as u32 | code_length << SMALL_LONG_CODE_LEN_OFFSET) as u16
                    };
                    self.long_lookup[long_lookup_length + long_bits] = entry;
                    long_bits += min_increment;
                }
                codes[sym as usize].set_code(0xFFFF);
            }
            self.short_lookup[first_bits as usize] = (long_lookup_length as u32
                | max_length << SMALL_SHORT_CODE_LEN_OFFSET
                | SMALL_FLAG_BIT) as u16;
            long_lookup_length += span;
        }
    }
}

#[derive(Clone)]
pub(crate) struct LargeCodeTable {
    pub short_lookup: [u32; 1 << LITLEN_LOOKUP_BITS],
    pub long_lookup: [u16; 1264],
}

impl LargeCodeTable {
    pub fn new() -> Self {
        Self { short_lookup: [0; 1 << LITLEN_LOOKUP_BITS], long_lookup: [0; 1264] }
    }

    /// Build the literal/length table from the expanded code records in
    /// `ctx` (`lit_count` holds prefix sums per expanded length,
    /// `code_list` the symbol indexes grouped by it).
    pub fn generate_for_litlen(&mut self, ctx: &mut HeaderScratch, multisym: Multisym) {
        let code_list_len = ctx.lit_count[MAX_LITLEN_COUNT - 1] as u32;
        if code_list_len == 0 {
            self.short_lookup.fill(0);
            return;
        }

        let mut last_len = ctx.lit_and_dist[ctx.code_list[0] as usize].length();
        if last_len > LITLEN_LOOKUP_BITS {
            last_len = LITLEN_LOOKUP_BITS + 1;
        }
        let mut copy_size = 1usize << (last_len - 1);
        self.short_lookup[..copy_size].fill(0);

        let min_len = last_len;
        while last_len <= LITLEN_LOOKUP_BITS {
            self.short_lookup.copy_within(..copy_size, copy_size);
            copy_size *= 2;
            self.encode_singles(ctx, last_len);

            if multisym >= Multisym::Single || last_len < 2 * min_len {
                last_len += 1;
                continue;
            }
            self.encode_pairs(ctx, last_len, min_len);

            if multisym >= Multisym::Double || last_len < 3 * min_len {
                last_len += 1;
                continue;
            }
            self.encode_triples(ctx, last_len, min_len);
            last_len += 1;
        }
        self.encode_long_codes(ctx, code_list_len);
    }

    fn encode_singles(&mut self, ctx: &HeaderScratch, length: u32) {
        let start = ctx.lit_count[length as usize] as usize;
        let end = ctx.lit_count[length as usize + 1] as usize;
        for &index in &ctx.code_list[start..end] {
            let sym = index_to_sym(index);
            let code = ctx.lit_and_dist[index as usize];
            if sym > MAX_LITLEN_SYM {
                continue;
            }
            self.short_lookup[code.code() as usize] = sym
                | code.length() << LARGE_SHORT_CODE_LEN_OFFSET
                | 1 << LARGE_SYM_COUNT_OFFSET;
        }
    }

    /// Fill entries decoding two symbols at once: a literal followed by any
    /// symbol whose combined code length equals `length`.
    fn encode_pairs(&mut self, ctx: &HeaderScratch, length: u32, min_len: u32) {
        let iend = ctx.lit_count[(length - min_len + 1) as usize] as usize;
        let mut index1 = ctx.lit_count[min_len as usize] as usize;
        while index1 < iend {
            let sym1_index = ctx.code_list[index1];
            let sym1 = index_to_sym(sym1_index);
            let code = ctx.lit_and_dist[sym1_index as usize];
            let sym1_len = code.length();
            let sym1_code = code.code();

            // Only literals may be followed by another symbol; skip to the
            // end of this length group otherwise.
            if sym1 >= 256 {
                index1 = ctx.lit_count[sym1_len as usize + 1] as usize;
                continue;
            }

            let sym2_len = length - sym1_len;
            let start = ctx.lit_count[sym2_len as usize] as usize;
            let end = ctx.lit_count[sym2_len as usize + 1] as usize;
            for &sym2_index in &ctx.code_list[start..end] {
                let sym2 = index_to_sym(sym2_index);
                if sym2 > MAX_LITLEN_SYM {
                    break;
                }
                let sym2_code = ctx.lit_and_dist[sym2_index as usize].code();
                let combined = sym1_code | sym2_code << sym1_len;
                let code_len = sym1_len + sym2_len;
                self.short_lookup[combined as usize] = sym1
                    | sym2 << 8
                    | code_len << LARGE_SHORT_CODE_LEN_OFFSET
                    | 2 << LARGE_SYM_COUNT_OFFSET;
            }
            index1 += 1;
        }
    }

    /// Fill entries decoding three literals at once. The third symbol is
    /// capped below 512 so its 9 bits cannot collide with the pointer flag.
    fn encode_triples(&mut self, ctx: &HeaderScratch, length: u32, min_len: u32) {
        let i1_end = ctx.lit_count[(length - 2 * min_len + 1) as usize] as usize;
        let mut index1 = ctx.lit_count[min_len as usize] as usize;
        while index1 < i1_end {
            let sym1_index = ctx.code_list[index1];
            let sym1 = index_to_sym(sym1_index);
            let sym1_len = ctx.lit_and_dist[sym1_index as usize].length();
            let sym1_code = ctx.lit_and_dist[sym1_index as usize].code();

            if sym1 >= 256 {
                index1 = ctx.lit_count[sym1_len as usize + 1] as usize;
                continue;
            }
            if length - sym1_len < 2 * min_len {
                break;
            }

            let i2_end = ctx.lit_count[(length - sym1_len - min_len + 1) as usize] as usize;
            let mut index2 = ctx.lit_count[min_len as usize] as usize;
            while index2 < i2_end {
                let sym2_index = ctx.code_list[index2];
                let sym2 = index_to_sym(sym2_index);
                let sym2_len = ctx.lit_and_dist[sym2_index as usize].length();
                let sym2_code = ctx.lit_and_dist[sym2_index as usize].code();

                if sym2 >= 256 {
                    index2 = ctx.lit_count[sym2_len as usize + 1] as usize;
                    continue;
                }

                let sym3_len = length - sym1_len - sym2_len;
                let start = ctx.lit_count[sym3_len as usize] as usize;
                let end = ctx.lit_count[sym3_len as usize + 1] as usize;
                for &sym3_index in &ctx.code_list[start..end] {
                    let sym3 = index_to_sym(sym3_index);
                    if sym3 > MAX_LITLEN_SYM - 1 {
                        break;
                    }
                    let sym3_code = ctx.lit_and_dist[sym3_index as usize].code();
                    let combined =
                        sym1_code | sym2_code << sym1_len | sym3_code << (sym2_len + sym1_len);
                    let code_len = sym1_len + sym2_len + sym3_len;
                    self.short_lookup[combined as usize] = sym1
                        | sym2 << 8
                        | sym3 << 16
                        | code_len << LARGE_SHORT_CODE_LEN_OFFSET
                        | 3 << LARGE_SYM_COUNT_OFFSET;
                }
                index2 += 1;
            }
            index1 += 1;
        }
    }

    fn encode_long_codes(&mut self, ctx: &mut HeaderScratch, code_list_len: u32) {
        let idx = ctx.lit_count[LITLEN_LOOKUP_BITS as usize + 1] as usize;
        let long_code_length = code_list_len as usize - idx;

        let mut temp_code_list = [0u16; 1 << (MAX_LITLEN_CODE_LEN - LITLEN_LOOKUP_BITS as usize)];
        let mut long_lookup_length = 0usize;
        for i in 0..long_code_length {
            let long_code_list = &ctx.code_list[idx..idx + long_code_length];
            if ctx.lit_and_dist[long_code_list[i] as usize].code() == INVALID_CODE {
                continue;
            }

            let mut max_len = ctx.lit_and_dist[long_code_list[i] as usize].length();
            let first_bits =
                ctx.lit_and_dist[long_code_list[i] as usize].code() & ((1 << LITLEN_LOOKUP_BITS) - 1);

            temp_code_list[0] = long_code_list[i] as u16;
            let mut temp_code_length = 1usize;
            for j in i + 1..long_code_length {
                if ctx.lit_and_dist[long_code_list[j] as usize].code()
                    & ((1 << LITLEN_LOOKUP_BITS) - 1)
                    == first_bits
                {
                    max_len = ctx.lit_and_dist[long_code_list[j] as usize].length();
                    temp_code_list[temp_code_length] = long_code_list[j] as u16;
                    temp_code_length += 1;
                }
            }

            let span = 1usize << (max_len - LITLEN_LOOKUP_BITS);
            if long_lookup_length + span > self.long_lookup.len() {
                self.short_lookup[first_bits as usize] = 0;
                continue;
            }
            for &entry in &temp_code_list[..temp_code_length] {
                let sym_index = entry as u32;
                let sym = index_to_sym(sym_index);
                let sym_len = ctx.lit_and_dist[sym_index as usize].length();
                let sym_code = ctx.lit_and_dist[sym_index as usize].code();

                let mut long_bits = (sym_code >> LITLEN_LOOKUP_BITS) as usize;
                let min_increment = 1usize << (sym_len - LITLEN_LOOKUP_BITS);
                while long_bits < span {
                    self.long_lookup[long_lookup_length + long_bits] =
                        (sym | sym_len << LARGE_LONG_CODE_LEN_OFFSET) as u16;
                    long_bits += min_increment;
                }
                ctx.lit_and_dist[sym_index as usize].set_code(INVALID_CODE);
            }
            self.short_lookup[first_bits as usize] = long_lookup_length as u32
                | max_len << LARGE_SHORT_MAX_LEN_OFFSET
                | LARGE_FLAG_BIT;
            long_lookup_length += span;
        }
    }
}

pub(crate) struct StaticTables {
    pub litlen: LargeCodeTable,
    pub dist: SmallCodeTable,
}

/// Decode tables for static blocks, built once from the fixed RFC 3.2.6
/// code lengths and copied into the state per block.
pub(crate) fn static_tables() -> &'static StaticTables {
    static TABLES: OnceLock<Box<StaticTables>> = OnceLock::new();
    TABLES.get_or_init(build_static_tables)
}

/// Unreversed canonical code of a static literal/length symbol.
fn static_litlen_code(sym: usize) -> u16 {
    match sym {
        0..=143 => 0b0011_0000 + sym as u16,
        144..=255 => 0b1_1001_0000 + (sym - 144) as u16,
        256..=279 => (sym - 256) as u16,
        _ => 0b1100_0000 + (sym - 280) as u16,
    }
}

fn build_static_tables() -> Box<StaticTables> {
    let mut ctx = Box::new(HeaderScratch::new());
    let mut counts = [0u32; MAX_LITLEN_COUNT];

    for sym in 0..LIT_TABLE_SIZE {
        let len = static_litlen_length(sym);
        ctx.lit_and_dist[sym].set(bit_reverse(static_litlen_code(sym), len), len);
        counts[len as usize] += 1;
    }
    // Length codes expand into one record per reachable match length, at
    // index 254 + length (the duplicate length-258 code lands on 513).
    for len_sym in 0..29usize {
        let code_len = static_litlen_length(257 + len_sym);
        let code = bit_reverse(static_litlen_code(257 + len_sym), code_len);
        let extra = LENGTH_EXTRA_BITS[len_sym] as u32;
        let expand_len = code_len + extra;
        let base = LENGTH_START[len_sym] as usize;
        for e in 0..(1usize << extra) {
            let idx = if len_sym == 28 { 513 } else { 254 + base + e };
            ctx.lit_and_dist[idx].set(code | (e as u32) << code_len, expand_len);
            counts[expand_len as usize] += 1;
        }
    }

    // Prefix sums per expanded length, then bucket the symbol indexes:
    // literals in symbol order first, expansions after, matching the
    // insertion order of the dynamic-header path.
    let mut total = 0u32;
    for (len, &count) in counts.iter().enumerate() {
        ctx.lit_count[len] = total as u16;
        total += count;
    }
    let mut cursor = [0u32; MAX_LITLEN_COUNT];
    for (len, slot) in cursor.iter_mut().enumerate() {
        *slot = ctx.lit_count[len] as u32;
    }
    for sym in 0..LIT_TABLE_SIZE {
        let len = ctx.lit_and_dist[sym].length() as usize;
        ctx.code_list[cursor[len] as usize] = sym as u32;
        cursor[len] += 1;
    }
    for len_sym in 0..29usize {
        let extra = LENGTH_EXTRA_BITS[len_sym] as u32;
        let base = LENGTH_START[len_sym] as usize;
        for e in 0..(1usize << extra) {
            let idx = if len_sym == 28 { 513 } else { 254 + base + e };
            let len = ctx.lit_and_dist[idx].length() as usize;
            ctx.code_list[cursor[len] as usize] = idx as u32;
            cursor[len] += 1;
        }
    }

    let mut litlen = LargeCodeTable::new();
    litlen.generate_for_litlen(&mut ctx, Multisym::Triple);

    // Static distance codes: 32 five-bit codes, of which 30 are real.
    let mut dist_codes = [HuffCode::default(); 32];
    let mut dist_count = [0u16; 16];
    for (sym, entry) in dist_codes.iter_mut().enumerate() {
        entry.set(bit_reverse(sym as u16, STATIC_DIST_LENGTH), STATIC_DIST_LENGTH);
    }
    dist_count[STATIC_DIST_LENGTH as usize] = 32;
    let mut dist = SmallCodeTable::new();
    dist.generate_for_dists(&mut dist_codes, &dist_count, DIST_LEN as u32);

    Box::new(StaticTables { litlen, dist })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_litlen_codes_match_rfc() {
        assert_eq!(static_litlen_code(0), 0x30);
        assert_eq!(static_litlen_code(143), 0xBF);
        assert_eq!(static_litlen_code(144), 0x190);
        assert_eq!(static_litlen_code(255), 0x1FF);
        assert_eq!(static_litlen_code(256), 0);
        assert_eq!(static_litlen_code(279), 23);
        assert_eq!(static_litlen_code(280), 0xC0);
        assert_eq!(static_litlen_code(287), 0xC7);
    }

    #[test]
    fn static_table_single_literal() {
        let st = static_tables();
        // Literal 'A' (65): static code 0x30 + 65 = 0x71, 8 bits,
        // bit-reversed = 0b10001110.
        let rev = bit_reverse(0x71, 8);
        // Pad to 12 bits with zeros: the entry must decode symbol 65 in 8
        // bits (possibly as the first of a multi-symbol entry).
        let entry = st.litlen.short_lookup[rev as usize];
        assert_eq!(entry & LARGE_FLAG_BIT, 0);
        let count = (entry >> LARGE_SYM_COUNT_OFFSET) & LARGE_SYM_COUNT_MASK;
        assert!(count >= 1);
        assert_eq!(entry & 0xFF, 65);
        if count == 1 {
            assert_eq!(entry >> LARGE_SHORT_CODE_LEN_OFFSET, 8);
        }
    }

    #[test]
    fn static_table_eob() {
        let st = static_tables();
        // The 7-bit all-zero EOB code: lookup index 0 must decode symbol
        // 256 consuming 7 bits.
        let entry = st.litlen.short_lookup[0];
        assert_eq!(entry & LARGE_FLAG_BIT, 0);
        assert_eq!((entry >> LARGE_SYM_COUNT_OFFSET) & LARGE_SYM_COUNT_MASK, 1);
        assert_eq!(entry & 0xFFFF, 256);
        assert_eq!(entry >> LARGE_SHORT_CODE_LEN_OFFSET, 7);
    }

    #[test]
    fn static_table_match_length_three() {
        let st = static_tables();
        // Length code 257 (match length 3) is the 7-bit code 0000001,
        // bit-reversed 1000000.
        let rev = bit_reverse(1, 7);
        let entry = st.litlen.short_lookup[rev as usize];
        assert_eq!(entry & LARGE_FLAG_BIT, 0);
        assert_eq!((entry >> LARGE_SYM_COUNT_OFFSET) & LARGE_SYM_COUNT_MASK, 1);
        // Expanded symbol 257 means repeat length 257 - 254 = 3.
        assert_eq!(entry & 0xFFFF, 257);
        assert_eq!(entry >> LARGE_SHORT_CODE_LEN_OFFSET, 7);
    }

    #[test]
    fn static_table_length_with_extra_bits() {
        let st = static_tables();
        // Code 265 (base length 11, 1 extra bit): 7-bit code 0001001.
        let code = bit_reverse(static_litlen_code(265), 7);
        // Extra bit = 1 selects length 12 -> expanded symbol 266.
        let idx = (code | 1 << 7) as usize;
        let entry = st.litlen.short_lookup[idx];
        assert_eq!(entry & LARGE_FLAG_BIT, 0);
        assert_eq!(entry & 0xFFFF, 266);
        assert_eq!(entry >> LARGE_SHORT_CODE_LEN_OFFSET, 8);
    }

    #[test]
    fn static_dist_table_entries() {
        let st = static_tables();
        // Distance symbol 4 (1 extra bit): 5-bit code 00100 reversed.
        let rev = bit_reverse(4, 5) as usize;
        let entry = st.dist.short_lookup[rev] as u32;
        assert_eq!(entry & SMALL_FLAG_BIT, 0);
        assert_eq!(entry & DIST_SYM_MASK, 4);
        assert_eq!((entry >> DIST_SYM_EXTRA_OFFSET) & 0xF, 1);
        assert_eq!(entry >> SMALL_SHORT_CODE_LEN_OFFSET, 5);
        // Reserved symbol 30 decodes as invalid (zero code length).
        let rev30 = bit_reverse(30, 5) as usize;
        let entry30 = st.dist.short_lookup[rev30] as u32;
        assert_eq!(entry30 >> SMALL_SHORT_CODE_LEN_OFFSET, 0);
    }

    #[test]
    fn small_table_rejects_unused_slots() {
        // A single 1-bit distance code: the '1' side of the tree is
        // unused and must read as invalid.
        let mut codes = [HuffCode::default(); 30];
        codes[3].set(0, 1);
        let mut count = [0u16; 16];
        count[1] = 1;
        let mut t = SmallCodeTable::new();
        t.generate_for_dists(&mut codes, &count, 30);
        let hit = t.short_lookup[0] as u32;
        assert_eq!(hit & DIST_SYM_MASK, 3);
        assert_eq!(hit >> SMALL_SHORT_CODE_LEN_OFFSET, 1);
        let miss = t.short_lookup[1] as u32;
        assert_eq!(miss >> SMALL_SHORT_CODE_LEN_OFFSET, 0);
    }
}
