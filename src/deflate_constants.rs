/* Alphabet sizes and codeword limits fixed by RFC 1951 section 3.2. */

pub const DEFLATE_MAX_CODEWORD_LEN: usize = 15;
pub const DEFLATE_MAX_PRE_CODEWORD_LEN: usize = 7;

pub const DEFLATE_NUM_LITLEN_SYMS: usize = 288;
pub const DEFLATE_NUM_DISTANCE_SYMS: usize = 32;
pub const DEFLATE_NUM_PRECODE_SYMS: usize = 19;

pub const DEFLATE_BLOCKTYPE_UNCOMPRESSED: u32 = 0;
pub const DEFLATE_BLOCKTYPE_STATIC_HUFFMAN: u32 = 1;
pub const DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN: u32 = 2;

pub const DEFLATE_END_OF_BLOCK: u16 = 256;
pub const DEFLATE_MAX_MATCH_LEN: usize = 258;

pub const DEFLATE_WINDOW_SIZE: usize = 32768;
const_assert!(DEFLATE_WINDOW_SIZE.is_power_of_two());

/* The order in which precode codeword lengths are transmitted. */
pub const DEFLATE_PRECODE_LENS_PERMUTATION: [u8; DEFLATE_NUM_PRECODE_SYMS] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/* Base values and extra-bit counts for length symbols 257..=285. */
pub const LENGTH_BASES: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/* Base values and extra-bit counts for distance symbols 0..=29. */
pub const DISTANCE_BASES: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

const_assert!(LENGTH_BASES.len() == LENGTH_EXTRA_BITS.len());
const_assert!(DISTANCE_BASES.len() == DISTANCE_EXTRA_BITS.len());

/*
 * The fixed codes of RFC 1951 section 3.2.6, written as (last_symbol,
 * bit_length) range descriptors and expanded through the canonical builder.
 */
pub struct CodeLengthRange {
    pub last_symbol: u16,
    pub bit_length: u8,
}

const fn range(last_symbol: u16, bit_length: u8) -> CodeLengthRange {
    CodeLengthRange {
        last_symbol,
        bit_length,
    }
}

pub const FIXED_LITLEN_RANGES: [CodeLengthRange; 4] =
    [range(143, 8), range(255, 9), range(279, 7), range(287, 8)];

pub const FIXED_DISTANCE_RANGES: [CodeLengthRange; 1] = [range(31, 5)];
