use crate::bitstream::BitStream;
use crate::decode_blocks::{decode_block_header, decode_stored_block, BlockTrees};
use crate::deflate_constants::{
    DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN, DEFLATE_BLOCKTYPE_STATIC_HUFFMAN,
    DEFLATE_BLOCKTYPE_UNCOMPRESSED, DEFLATE_END_OF_BLOCK, DEFLATE_MAX_MATCH_LEN,
    DEFLATE_WINDOW_SIZE, DISTANCE_BASES, DISTANCE_EXTRA_BITS, LENGTH_BASES, LENGTH_EXTRA_BITS,
};
use crate::huffman::HuffmanTree;
use crate::{DecodeError, DeflateInput, DeflateOutput};

/* Totals reported by the output stream once a stream has been decoded. */
#[derive(Debug, Clone, Copy)]
pub struct OutStreamResult {
    pub written: usize,
    pub crc32: u32,
}

/*
 * Decode a bare RFC 1951 stream, consuming blocks until one carries the
 * BFINAL flag. On return the input cursor rests on the first whole byte
 * after the final block; any remaining bytes belong to the caller.
 */
pub fn deflate_decompress<I: DeflateInput, O: DeflateOutput>(
    input: &mut I,
    output: &mut O,
) -> Result<(), DecodeError> {
    let mut bits = BitStream::new(input);

    loop {
        let header = decode_block_header(&mut bits)?;

        match header.block_type {
            DEFLATE_BLOCKTYPE_UNCOMPRESSED => decode_stored_block(&mut bits, output)?,
            DEFLATE_BLOCKTYPE_STATIC_HUFFMAN => {
                let trees = BlockTrees::fixed()?;
                decode_huffman_block(&mut bits, &trees, output)?;
            }
            DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN => {
                let trees = BlockTrees::dynamic(&mut bits)?;
                decode_huffman_block(&mut bits, &trees, output)?;
            }
            reserved => {
                return Err(DecodeError::UnsupportedBlockType {
                    btype: reserved,
                    offset: bits.byte_position(),
                })
            }
        }

        if header.is_final {
            break;
        }
    }

    /* Stop consuming bits; the rest of the current byte is padding. */
    bits.align_to_byte();
    Ok(())
}

/*
 * Emit literals and expand length/distance pairs until the end-of-block
 * symbol. The trees die with the block.
 */
fn decode_huffman_block<I: DeflateInput, O: DeflateOutput>(
    bits: &mut BitStream<'_, I>,
    trees: &BlockTrees,
    output: &mut O,
) -> Result<(), DecodeError> {
    loop {
        let symbol = trees.litlen.decode_symbol(bits)?;

        if symbol < DEFLATE_END_OF_BLOCK {
            output.write_byte(symbol as u8)?;
            continue;
        }
        if symbol == DEFLATE_END_OF_BLOCK {
            return Ok(());
        }

        let length = decode_match_length(bits, symbol)?;
        let distance = decode_match_distance(bits, &trees.distance)?;

        /* 1 <= distance <= min(32768, bytes emitted so far) */
        let available = output.bytes_written().min(DEFLATE_WINDOW_SIZE);
        if distance > available {
            return Err(DecodeError::DistanceTooFar {
                distance,
                available,
            });
        }

        output.copy_back_reference(distance, length)?;
    }
}

const_assert!(LENGTH_BASES[LENGTH_BASES.len() - 1] as usize == DEFLATE_MAX_MATCH_LEN);

fn decode_match_length<I: DeflateInput>(
    bits: &mut BitStream<'_, I>,
    symbol: u16,
) -> Result<usize, DecodeError> {
    /* 286 and 287 exist in the fixed code but are not valid lengths. */
    if symbol > 285 {
        return Err(DecodeError::MalformedCode {
            reason: "length symbol outside 257..=285",
            offset: bits.byte_position(),
        });
    }
    let index = usize::from(symbol - 257);
    let extra = bits.read_bits_le(u32::from(LENGTH_EXTRA_BITS[index]))?;
    Ok(usize::from(LENGTH_BASES[index]) + extra as usize)
}

fn decode_match_distance<I: DeflateInput>(
    bits: &mut BitStream<'_, I>,
    distance_tree: &HuffmanTree,
) -> Result<usize, DecodeError> {
    let symbol = distance_tree.decode_symbol(bits)?;
    /* 30 and 31 round out the fixed code but are not valid distances. */
    if symbol > 29 {
        return Err(DecodeError::MalformedCode {
            reason: "distance symbol outside 0..=29",
            offset: bits.byte_position(),
        });
    }
    let index = usize::from(symbol);
    let extra = bits.read_bits_le(u32::from(DISTANCE_EXTRA_BITS[index]))?;
    Ok(usize::from(DISTANCE_BASES[index]) + extra as usize)
}
