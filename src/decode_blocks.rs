use crate::bitstream::BitStream;
use crate::deflate_constants::{
    DEFLATE_MAX_PRE_CODEWORD_LEN, DEFLATE_NUM_DISTANCE_SYMS, DEFLATE_NUM_LITLEN_SYMS,
    DEFLATE_NUM_PRECODE_SYMS, DEFLATE_PRECODE_LENS_PERMUTATION, FIXED_DISTANCE_RANGES,
    FIXED_LITLEN_RANGES,
};
use crate::huffman::{lens_from_ranges, HuffmanTree};
use crate::{DecodeError, DeflateInput, DeflateOutput};

/* BFINAL / BTYPE pair prefixing every DEFLATE block. */
pub struct BlockHeader {
    pub is_final: bool,
    pub block_type: u32,
}

pub fn decode_block_header<I: DeflateInput>(
    bits: &mut BitStream<'_, I>,
) -> Result<BlockHeader, DecodeError> {
    let is_final = bits.read_bits_le(1)? != 0;
    let block_type = bits.read_bits_le(2)?;
    Ok(BlockHeader {
        is_final,
        block_type,
    })
}

/* The literal/length and distance trees a compressed block decodes with. */
pub struct BlockTrees {
    pub litlen: HuffmanTree,
    pub distance: HuffmanTree,
}

impl BlockTrees {
    /* The static codes of RFC 1951 section 3.2.6, expanded from range
     * descriptors through the same canonical builder dynamic blocks use. */
    pub fn fixed() -> Result<Self, DecodeError> {
        Ok(Self {
            litlen: HuffmanTree::from_lens(&lens_from_ranges(&FIXED_LITLEN_RANGES), 0)?,
            distance: HuffmanTree::from_lens(&lens_from_ranges(&FIXED_DISTANCE_RANGES), 0)?,
        })
    }

    /*
     * Decode a dynamic-block header: the HLIT/HDIST/HCLEN counts, the
     * 19-symbol precode, and the run-length-encoded literal/length and
     * distance code-length vectors (repeat codes 16/17/18).
     */
    pub fn dynamic<I: DeflateInput>(bits: &mut BitStream<'_, I>) -> Result<Self, DecodeError> {
        const_assert!(DEFLATE_NUM_LITLEN_SYMS == ((1 << 5) - 1) + 257);
        let num_litlen_syms = bits.read_bits_le(5)? as usize + 257;

        const_assert!(DEFLATE_NUM_DISTANCE_SYMS == ((1 << 5) - 1) + 1);
        let num_distance_syms = bits.read_bits_le(5)? as usize + 1;

        const_assert!(DEFLATE_NUM_PRECODE_SYMS == ((1 << 4) - 1) + 4);
        let num_explicit_precode_lens = bits.read_bits_le(4)? as usize + 4;

        /* The precode lengths arrive permuted, three bits each; entries the
         * header does not transmit stay zero. */
        const_assert!(DEFLATE_MAX_PRE_CODEWORD_LEN == (1 << 3) - 1);
        let mut precode_lens = [0u8; DEFLATE_NUM_PRECODE_SYMS];
        for &position in &DEFLATE_PRECODE_LENS_PERMUTATION[..num_explicit_precode_lens] {
            precode_lens[usize::from(position)] = bits.read_bits_le(3)? as u8;
        }

        let precode = HuffmanTree::from_lens(&precode_lens, bits.byte_position())?;

        /* Expand the literal/length and distance codeword lengths. */
        let total = num_litlen_syms + num_distance_syms;
        let mut lens: Vec<u8> = Vec::with_capacity(total);
        while lens.len() < total {
            let presym = precode.decode_symbol(bits)?;
            match presym {
                0..=15 => lens.push(presym as u8),
                16 => {
                    /* Repeat the previous length 3..=6 times. */
                    let previous = match lens.last() {
                        Some(&len) => len,
                        None => {
                            return Err(DecodeError::MalformedCode {
                                reason: "repeat code with no previous length",
                                offset: bits.byte_position(),
                            })
                        }
                    };
                    let count = 3 + bits.read_bits_le(2)? as usize;
                    extend_lens(&mut lens, previous, count, total, bits.byte_position())?;
                }
                17 => {
                    /* 3..=10 zeros. */
                    let count = 3 + bits.read_bits_le(3)? as usize;
                    extend_lens(&mut lens, 0, count, total, bits.byte_position())?;
                }
                18 => {
                    /* 11..=138 zeros. */
                    let count = 11 + bits.read_bits_le(7)? as usize;
                    extend_lens(&mut lens, 0, count, total, bits.byte_position())?;
                }
                _ => {
                    return Err(DecodeError::MalformedCode {
                        reason: "code-length symbol outside 0..=18",
                        offset: bits.byte_position(),
                    })
                }
            }
        }

        let litlen = HuffmanTree::from_lens(&lens[..num_litlen_syms], bits.byte_position())?;
        let distance = HuffmanTree::from_lens(&lens[num_litlen_syms..], bits.byte_position())?;
        Ok(Self { litlen, distance })
    }
}

fn extend_lens(
    lens: &mut Vec<u8>,
    value: u8,
    count: usize,
    total: usize,
    offset: usize,
) -> Result<(), DecodeError> {
    if lens.len() + count > total {
        return Err(DecodeError::MalformedCode {
            reason: "repeat count overruns the length vector",
            offset,
        });
    }
    lens.resize(lens.len() + count, value);
    Ok(())
}

/*
 * Stored block: align to the next byte boundary, check LEN against its
 * complement NLEN, then pass LEN literal bytes through the window to the
 * sink.
 */
pub fn decode_stored_block<I: DeflateInput, O: DeflateOutput>(
    bits: &mut BitStream<'_, I>,
    output: &mut O,
) -> Result<(), DecodeError> {
    bits.align_to_byte();

    let len = bits.read_aligned_le_u16()?;
    let nlen = bits.read_aligned_le_u16()?;
    if nlen != !len {
        return Err(DecodeError::MalformedHeader {
            reason: "stored-block NLEN is not the complement of LEN",
            offset: bits.byte_position(),
        });
    }

    for _ in 0..len {
        let byte = bits.read_aligned_byte()?;
        output.write_byte(byte)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::bitstream::BitStream;
    use crate::decode_blocks::BlockTrees;
    use crate::decompress_deflate::deflate_decompress;
    use crate::streams::deflate_slice_input::DeflateSliceInput;
    use crate::streams::deflate_window_output::DeflateWindowOutput;
    use crate::test_utils::BitWriter;
    use crate::{DecodeError, DeflateOutput};

    /*
     * A dynamic header whose distance vector is one long zero run produced
     * by code-length symbol 18, and whose literal/length code contains only
     * the end-of-block symbol. Layout: HLIT=0, HDIST=29, HCLEN=14; precode
     * assigns length 1 to symbols 1 and 18.
     */
    fn write_repeat_heavy_header(writer: &mut BitWriter) {
        writer.write_bits_le(0, 5); /* HLIT */
        writer.write_bits_le(29, 5); /* HDIST */
        writer.write_bits_le(14, 4); /* HCLEN */

        /* Permutation order 16 17 18 0 8 7 9 6 10 5 11 4 12 3 13 2 14 1:
         * all zero except positions of symbols 18 and 1. */
        for position in 0..18u32 {
            let len = match position {
                2 | 17 => 1,
                _ => 0,
            };
            writer.write_bits_le(len, 3);
        }

        /* Precode: symbol 1 -> '0', symbol 18 -> '1'. Literal/length vector:
         * 256 zeros, then a single length 1 for the end-of-block symbol. */
        writer.write_code_msb(1, 1); /* 18 */
        writer.write_bits_le(127, 7); /* 138 zeros */
        writer.write_code_msb(1, 1); /* 18 */
        writer.write_bits_le(107, 7); /* 118 zeros */
        writer.write_code_msb(0, 1); /* length 1 for symbol 256 */

        /* Distance vector: 30 zeros from one repeat. */
        writer.write_code_msb(1, 1); /* 18 */
        writer.write_bits_le(19, 7); /* 30 zeros */
    }

    #[test]
    fn dynamic_header_with_long_zero_runs() {
        let mut writer = BitWriter::new();
        write_repeat_heavy_header(&mut writer);
        let data = writer.finish();

        let mut input = DeflateSliceInput::new(&data);
        let mut bits = BitStream::new(&mut input);
        let trees = BlockTrees::dynamic(&mut bits).unwrap();

        /* The only litlen codeword is '0' for end-of-block. */
        let tail = [0u8];
        let mut input = DeflateSliceInput::new(&tail);
        let mut bits = BitStream::new(&mut input);
        assert_eq!(trees.litlen.decode_symbol(&mut bits).unwrap(), 256);
    }

    #[test]
    fn dynamic_block_with_empty_distance_code_decodes() {
        /* The distance code is all zeros; legal because the block emits no
         * back-references before its end-of-block symbol. */
        let mut writer = BitWriter::new();
        writer.write_bits_le(1, 1); /* BFINAL */
        writer.write_bits_le(2, 2); /* dynamic */
        write_repeat_heavy_header(&mut writer);
        writer.write_code_msb(0, 1); /* end of block */
        let data = writer.finish();

        let mut decoded = Vec::new();
        {
            let mut input = DeflateSliceInput::new(&data);
            let mut output = DeflateWindowOutput::new(
                |chunk| {
                    decoded.extend_from_slice(chunk);
                    Ok(())
                },
                64,
            );
            deflate_decompress(&mut input, &mut output).unwrap();
            output.final_flush().unwrap();
        }
        assert_eq!(decoded, b"");
    }

    #[test]
    fn repeat_with_no_previous_length_is_malformed() {
        let mut writer = BitWriter::new();
        writer.write_bits_le(0, 5);
        writer.write_bits_le(0, 5);
        writer.write_bits_le(15, 4); /* all 19 precode entries */

        /* Symbols 1 and 16 get length 1; everything else 0. Permutation
         * position 0 is symbol 16, position 17 is symbol 1. */
        for position in 0..19u32 {
            let len = match position {
                0 | 17 => 1,
                _ => 0,
            };
            writer.write_bits_le(len, 3);
        }

        /* First decoded symbol is 16: repeat with nothing to repeat. */
        writer.write_code_msb(1, 1); /* 16 sorts after 1 canonically */
        writer.write_bits_le(0, 2);
        let data = writer.finish();

        let mut input = DeflateSliceInput::new(&data);
        let mut bits = BitStream::new(&mut input);
        assert!(matches!(
            BlockTrees::dynamic(&mut bits),
            Err(DecodeError::MalformedCode {
                reason: "repeat code with no previous length",
                ..
            })
        ));
    }

    #[test]
    fn overrunning_repeat_is_malformed() {
        let mut writer = BitWriter::new();
        writer.write_bits_le(0, 5); /* 257 litlen lens */
        writer.write_bits_le(0, 5); /* 1 distance len */
        writer.write_bits_le(14, 4);

        for position in 0..18u32 {
            let len = match position {
                2 | 17 => 1,
                _ => 0,
            };
            writer.write_bits_le(len, 3);
        }

        /* 2 * 138 + 11 zeros = 287 > 258 expected entries. */
        for _ in 0..3 {
            writer.write_code_msb(1, 1); /* 18 */
            writer.write_bits_le(127, 7);
        }
        let data = writer.finish();

        let mut input = DeflateSliceInput::new(&data);
        let mut bits = BitStream::new(&mut input);
        assert!(matches!(
            BlockTrees::dynamic(&mut bits),
            Err(DecodeError::MalformedCode {
                reason: "repeat count overruns the length vector",
                ..
            })
        ));
    }

    #[test]
    fn fixed_trees_match_the_static_code() {
        let trees = BlockTrees::fixed().unwrap();

        /* '0000000' is end-of-block, '00000' is distance symbol 0. */
        let data = [0u8];
        let mut input = DeflateSliceInput::new(&data);
        let mut bits = BitStream::new(&mut input);
        assert_eq!(trees.litlen.decode_symbol(&mut bits).unwrap(), 256);

        let data = [0u8];
        let mut input = DeflateSliceInput::new(&data);
        let mut bits = BitStream::new(&mut input);
        assert_eq!(trees.distance.decode_symbol(&mut bits).unwrap(), 0);
    }
}
