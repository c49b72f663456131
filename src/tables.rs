//! RFC 1951 constant tables shared by the inflate and deflate engines.

/// Base match length for each length code 257-285, indexed by `code - 257`.
pub(crate) const LENGTH_START: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

/// Extra bits carried by each length code 257-285, indexed by `code - 257`.
pub(crate) const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Base distance for each distance code 0-29.
pub(crate) const DIST_START: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Extra bits carried by each distance code 0-29.
pub(crate) const DIST_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Transmission order of the code-length-code alphabet (RFC 1951 section 3.2.7).
pub(crate) const CODE_LENGTH_ORDER: [usize; 19] =
    [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

/// Code length of a literal/length symbol in a static block (RFC 1951 section 3.2.6).
pub(crate) fn static_litlen_length(sym: usize) -> u32 {
    match sym {
        0..=143 => 8,
        144..=255 => 9,
        256..=279 => 7,
        _ => 8,
    }
}

/// All static-block distance codes are 5 bits wide.
pub(crate) const STATIC_DIST_LENGTH: u32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_table_covers_all_match_lengths() {
        // Every length 3..=258 must fall in exactly one code's range.
        for len in 3u16..=257 {
            let covered = LENGTH_START
                .iter()
                .zip(LENGTH_EXTRA_BITS.iter())
                .take(28)
                .any(|(&base, &extra)| len >= base && len < base + (1 << extra));
            assert!(covered, "length {} not covered", len);
        }
        assert_eq!(LENGTH_START[28], 258);
    }

    #[test]
    fn dist_table_covers_full_window() {
        for (i, (&base, &extra)) in DIST_START.iter().zip(DIST_EXTRA_BITS.iter()).enumerate() {
            let top = base as u32 + (1u32 << extra) - 1;
            if i == 29 {
                assert_eq!(top, 32768);
            } else {
                assert_eq!(top + 1, DIST_START[i + 1] as u32);
            }
        }
    }

    #[test]
    fn static_lengths_satisfy_kraft() {
        let mut sum = 0f64;
        for sym in 0..288 {
            sum += 2f64.powi(-(static_litlen_length(sym) as i32));
        }
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
