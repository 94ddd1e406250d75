use crate::bitstream::BitStream;
use crate::deflate_constants::{CodeLengthRange, DEFLATE_MAX_CODEWORD_LEN};
use crate::{DecodeError, DeflateInput};

const NO_CHILD: u16 = u16::MAX;
const NO_SYMBOL: u16 = u16::MAX;

#[derive(Clone, Copy)]
struct TrieNode {
    children: [u16; 2],
    symbol: u16,
}

impl TrieNode {
    const EMPTY: TrieNode = TrieNode {
        children: [NO_CHILD; 2],
        symbol: NO_SYMBOL,
    };
}

/*
 * Decoding trie for one canonical prefix code (RFC 1951 section 3.2.2).
 * Interior nodes carry no payload; leaves carry the decoded symbol. The
 * path from the root spells the codeword MSB-first. A tree lives exactly
 * as long as the block it was built for.
 */
pub struct HuffmanTree {
    nodes: Vec<TrieNode>,
}

impl HuffmanTree {
    /*
     * Build the canonical code described by `lens`, where `lens[sym]` is the
     * codeword length of `sym` and 0 marks an absent symbol. `offset` is the
     * input byte offset reported if the vector is invalid.
     *
     * Overfull vectors (Kraft violation) and lengths above 15 are rejected
     * here. Incomplete vectors build a partial trie: the unused part of the
     * codespace has no branches, and following it during decoding errors.
     * The all-zero vector yields a bare root, legal as long as it is never
     * consulted.
     */
    pub fn from_lens(lens: &[u8], offset: usize) -> Result<Self, DecodeError> {
        debug_assert!(lens.len() < usize::from(u16::MAX));

        let mut bl_count = [0u16; DEFLATE_MAX_CODEWORD_LEN + 1];
        let mut max_len = 0usize;
        for &len in lens {
            let len = usize::from(len);
            if len > DEFLATE_MAX_CODEWORD_LEN {
                return Err(DecodeError::MalformedCode {
                    reason: "codeword length exceeds 15 bits",
                    offset,
                });
            }
            bl_count[len] += 1;
            max_len = max_len.max(len);
        }

        let mut tree = Self {
            nodes: vec![TrieNode::EMPTY],
        };
        if max_len == 0 {
            return Ok(tree);
        }

        /* A codeword of length n claims 2^(max_len - n) of the codespace;
         * claiming more than 2^max_len in total cannot be prefix-free. */
        let mut codespace_used = 0u32;
        for count in &bl_count[1..=max_len] {
            codespace_used = (codespace_used << 1) + u32::from(*count);
        }
        if codespace_used > 1u32 << max_len {
            return Err(DecodeError::MalformedCode {
                reason: "code lengths violate the Kraft inequality",
                offset,
            });
        }

        /* Starting canonical codeword for each length. */
        let mut next_code = [0u32; DEFLATE_MAX_CODEWORD_LEN + 1];
        for len in 2..=max_len {
            next_code[len] = (next_code[len - 1] + u32::from(bl_count[len - 1])) << 1;
        }

        for (symbol, &len) in lens.iter().enumerate() {
            if len > 0 {
                let len = usize::from(len);
                let code = next_code[len];
                next_code[len] += 1;
                tree.insert(code, len, symbol as u16, offset)?;
            }
        }

        Ok(tree)
    }

    fn insert(
        &mut self,
        code: u32,
        len: usize,
        symbol: u16,
        offset: usize,
    ) -> Result<(), DecodeError> {
        let mut node = 0usize;
        for depth in (0..len).rev() {
            if self.nodes[node].symbol != NO_SYMBOL {
                return Err(DecodeError::MalformedCode {
                    reason: "codeword extends past a shorter codeword",
                    offset,
                });
            }
            let bit = ((code >> depth) & 1) as usize;
            let child = self.nodes[node].children[bit];
            node = if child == NO_CHILD {
                let next = self.nodes.len() as u16;
                self.nodes[node].children[bit] = next;
                self.nodes.push(TrieNode::EMPTY);
                usize::from(next)
            } else {
                usize::from(child)
            };
        }
        self.nodes[node].symbol = symbol;
        Ok(())
    }

    /* Extract one symbol, consuming codeword bits MSB-first from `bits`.
     * Descending into an absent branch is a decode error. */
    #[inline(always)]
    pub fn decode_symbol<I: DeflateInput>(
        &self,
        bits: &mut BitStream<'_, I>,
    ) -> Result<u16, DecodeError> {
        let mut node = &self.nodes[0];
        loop {
            let bit = bits.next_bit()?;
            let child = node.children[usize::from(bit)];
            if child == NO_CHILD {
                return Err(DecodeError::MalformedCode {
                    reason: "code bits select an absent branch",
                    offset: bits.byte_position(),
                });
            }
            node = &self.nodes[usize::from(child)];
            if node.symbol != NO_SYMBOL {
                return Ok(node.symbol);
            }
        }
    }
}

/* Expand (last_symbol, bit_length) range descriptors into the flat
 * code-length vector the canonical builder consumes. */
pub(crate) fn lens_from_ranges(ranges: &[CodeLengthRange]) -> Vec<u8> {
    let Some(last) = ranges.last() else {
        return Vec::new();
    };

    let mut lens = Vec::with_capacity(usize::from(last.last_symbol) + 1);
    let mut symbol = 0u16;
    for range in ranges {
        while symbol <= range.last_symbol {
            lens.push(range.bit_length);
            symbol += 1;
        }
    }
    lens
}
