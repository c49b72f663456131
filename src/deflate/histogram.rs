//! Per-block frequency table that becomes the code table in place.
//!
//! During matching every slot holds a frequency. Code generation then
//! squashes the 256 expanded match-length slots down to the 29 length
//! codes, runs the length-limited generator, and re-expands so the token
//! encoder can index `literal_codes[litlen]` directly: each re-expanded
//! slot carries the code with its extra bits pre-shifted in. Distance
//! slots gain their extra-bit count; slot 30 stays zero so literal tokens
//! emit no distance bits.

use crate::huffman::{code::generate_codes_in_place, LenLimitedCode};

const MAX_MATCH: usize = 258;
const MIN_MATCH: usize = 3;

pub(crate) struct Histogram {
    /// Distance code slots 0..30 plus the literal sentinel at 30.
    /// After expansion: `code | extra_bit_count << 16 | length << 24`.
    pub distance_codes: [u32; 31],
    /// Literals 0..=255, end-of-block at 256, match lengths 3..=258 at
    /// `length + 254` (257..=512).
    pub literal_codes: [u32; 256 + 1 + (MAX_MATCH - MIN_MATCH + 1)],
}

impl Histogram {
    pub fn new() -> Self {
        Self { distance_codes: [0; 31], literal_codes: [0; 513] }
    }

    pub fn reset(&mut self) {
        self.distance_codes.fill(0);
        self.literal_codes.fill(0);
    }

    /// Fold the expanded length slots 265..=512 into their length codes so
    /// the tree generator sees the 286-symbol alphabet. Lengths 3..=10
    /// (codes 257..=264) already sit in place; the groups above carry
    /// 1..5 extra bits in runs of four codes each.
    pub fn reduce_counts(&mut self) {
        let mut curr = 265usize;
        let mut idx = 265usize;
        for bits in 1..=5usize {
            for _ in 0..4 {
                let mut val = 0u32;
                for _ in 0..1usize << bits {
                    val += self.literal_codes[curr];
                    curr += 1;
                }
                self.literal_codes[idx] = val;
                idx += 1;
            }
        }
        // Length 258 belongs to code 285, not the tail of 284's range.
        self.literal_codes[285] = self.literal_codes[512];
    }

    /// Inverse of [`reduce_counts`] once codes exist: spread each length
    /// code across its expanded slots with the extra-bit value pre-shifted
    /// past the code, and decorate distance slots with extra-bit counts.
    pub fn expand_codes(&mut self) {
        let mut origin = [0u32; 285 - 265 + 1];
        origin.copy_from_slice(&self.literal_codes[265..=285]);
        let mut offset = 0usize;
        let mut idx = 0usize;
        for bits in 1..=5u32 {
            for _ in 0..4 {
                let packed = origin[idx];
                let length = packed >> 24;
                let code = packed & 0xFF_FFFF;
                idx += 1;
                for extra in 0..1u32 << bits {
                    let ncode = code | extra << length;
                    let nlength = length + bits;
                    self.set_lit_code(265 + offset, ncode, nlength);
                    offset += 1;
                }
            }
        }
        self.literal_codes[512] = origin[20];

        let mut slot = 4usize;
        for extra in 1u32..=13 {
            self.distance_codes[slot] |= extra << 16;
            self.distance_codes[slot + 1] |= extra << 16;
            slot += 2;
        }
        self.distance_codes[30] = 0;
    }

    #[inline]
    pub fn lit_code(&self, litlen: u32) -> (u32, u32) {
        let packed = self.literal_codes[litlen as usize];
        (packed & 0xFF_FFFF, packed >> 24)
    }

    #[inline]
    fn set_lit_code(&mut self, litlen: usize, code: u32, count: u32) {
        self.literal_codes[litlen] = code | count << 24;
    }

    /// `(code, bit_count, extra_bit_count)` for a distance symbol. The
    /// sentinel slot yields all zeros, so literal tokens spend only their
    /// litlen bits.
    #[inline]
    pub fn dist_code(&self, dist: u32) -> (u32, u32, u32) {
        let packed = self.distance_codes[dist as usize];
        let counts = packed >> 16;
        (packed & 0xFFFF, counts >> 8, counts & 0xFF)
    }

    /// Generate the per-block canonical codes from the collected counts.
    pub fn generate_codes(&mut self, lit_gen: &mut LenLimitedCode, dist_gen: &mut LenLimitedCode) {
        self.reduce_counts();
        self.literal_codes[256] = 1;
        dist_gen.generate(15, &mut self.distance_codes[..30]);
        generate_codes_in_place(&mut self.distance_codes[..30]);
        lit_gen.generate(15, &mut self.literal_codes[..286]);
        generate_codes_in_place(&mut self.literal_codes[..286]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_folds_expanded_lengths() {
        let mut h = Histogram::new();
        // Length 11 (code 265, extra bit 0) and length 12 (code 265,
        // extra bit 1).
        h.literal_codes[265] = 3;
        h.literal_codes[266] = 4;
        // Length 258 -> code 285.
        h.literal_codes[512] = 9;
        h.reduce_counts();
        assert_eq!(h.literal_codes[265], 7);
        assert_eq!(h.literal_codes[285], 9);
    }

    #[test]
    fn expand_decorates_distances() {
        let mut h = Histogram::new();
        h.expand_codes();
        assert_eq!(h.dist_code(0).2, 0);
        assert_eq!(h.dist_code(4).2, 1);
        assert_eq!(h.dist_code(5).2, 1);
        assert_eq!(h.dist_code(28).2, 13);
        assert_eq!(h.dist_code(29).2, 13);
        // The literal sentinel encodes nothing.
        assert_eq!(h.dist_code(super::super::token::INVALID_DIST), (0, 0, 0));
    }

    #[test]
    fn generate_and_expand_give_usable_codes() {
        let mut h = Histogram::new();
        for b in b"abracadabra" {
            h.literal_codes[*b as usize] += 1;
        }
        // One match of length 4, distance 7 (symbol 5).
        h.literal_codes[4 + 254] += 1;
        h.distance_codes[5] += 1;
        let mut lit_gen = LenLimitedCode::new();
        let mut dist_gen = LenLimitedCode::new();
        h.generate_codes(&mut lit_gen, &mut dist_gen);
        h.expand_codes();

        let (_, n) = h.lit_code(b'a' as u32);
        assert!(n > 0 && n <= 15);
        let (_, n) = h.lit_code(256);
        assert!(n > 0);
        // The expanded slot for length 4 carries the code for symbol 258.
        let (_, n) = h.lit_code(258);
        assert!(n > 0);
        let (_, bits, extra) = h.dist_code(5);
        assert!(bits > 0);
        assert_eq!(extra, 1);
    }

    #[test]
    fn expanded_slots_embed_extra_bits() {
        let mut h = Histogram::new();
        // Two distinct lengths sharing code 265: 11 and 12.
        h.literal_codes[265] = 5;
        h.literal_codes[266] = 5;
        h.literal_codes[256] = 1;
        let mut lit_gen = LenLimitedCode::new();
        let mut dist_gen = LenLimitedCode::new();
        h.generate_codes(&mut lit_gen, &mut dist_gen);
        h.expand_codes();
        let (code_a, len_a) = h.lit_code(265);
        let (code_b, len_b) = h.lit_code(266);
        // Same base code, same total length, different extra bit.
        assert_eq!(len_a, len_b);
        assert_ne!(code_a, code_b);
    }
}
