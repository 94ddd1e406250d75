pub mod bitstream;
pub mod decode_blocks;
pub mod decompress_deflate;
pub mod decompress_gzip;
mod deflate_constants;
mod gzip_constants;
pub mod huffman;
pub mod streams;

#[cfg(test)]
mod test_utils;

#[macro_use]
extern crate static_assertions;

use crate::decompress_deflate::OutStreamResult;
use crate::decompress_gzip::{decompress_gzip_body, read_gzip_header, GzipHeader};
use crate::streams::deflate_slice_input::DeflateSliceInput;
use crate::streams::deflate_window_output::DeflateWindowOutput;
use filebuffer::FileBuffer;
use std::fmt;
use std::path::Path;

/*
 * Result of decoding a gzip member. Every error aborts the current block
 * immediately; partial output already delivered to the sink is not revoked.
 */
#[derive(Debug)]
pub enum DecodeError {
    /* A bit or byte was demanded past the end of the input. */
    UnexpectedEof { offset: usize },

    /* An invalid field in the gzip wrapper or in a stored-block header. */
    MalformedHeader { reason: &'static str, offset: usize },

    /* The reserved block type (BTYPE = 11). */
    UnsupportedBlockType { btype: u32, offset: usize },

    /* A code-length vector or codeword that cannot belong to a canonical
     * prefix code, or a decoded symbol outside its legal range. */
    MalformedCode { reason: &'static str, offset: usize },

    /* A back-reference pointing before the start of the output. */
    DistanceTooFar { distance: usize, available: usize },

    /* Trailer CRC32 does not match the decoded output. */
    ChecksumMismatch { expected: u32, found: u32 },

    /* Trailer ISIZE does not match the decoded output length mod 2^32. */
    SizeMismatch { expected: u32, found: u32 },

    /* The byte source or the sink reported a failure. */
    Io(std::io::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof { offset } => {
                write!(f, "unexpected end of input at byte {offset}")
            }
            Self::MalformedHeader { reason, offset } => {
                write!(f, "malformed header at byte {offset}: {reason}")
            }
            Self::UnsupportedBlockType { btype, offset } => {
                write!(f, "unsupported block type {btype:#04b} at byte {offset}")
            }
            Self::MalformedCode { reason, offset } => {
                write!(f, "malformed prefix code at byte {offset}: {reason}")
            }
            Self::DistanceTooFar {
                distance,
                available,
            } => {
                write!(
                    f,
                    "back-reference distance {distance} exceeds the {available} bytes emitted"
                )
            }
            Self::ChecksumMismatch { expected, found } => {
                write!(
                    f,
                    "crc32 mismatch: trailer says {expected:#010x}, output hashes to {found:#010x}"
                )
            }
            Self::SizeMismatch { expected, found } => {
                write!(
                    f,
                    "length mismatch: trailer says {expected} bytes (mod 2^32), wrote {found}"
                )
            }
            Self::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/*
 * The byte source seam. The decoder only ever moves forward, one byte at a
 * time; implementations decide how bytes are buffered or mapped.
 */
pub trait DeflateInput {
    /* Advance by one byte; None once the source is exhausted. */
    fn next_byte(&mut self) -> std::io::Result<Option<u8>>;

    /* Number of bytes consumed from the source so far. */
    fn tell_stream_pos(&self) -> usize;

    #[inline(always)]
    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        match self.next_byte()? {
            Some(byte) => Ok(byte),
            None => Err(DecodeError::UnexpectedEof {
                offset: self.tell_stream_pos(),
            }),
        }
    }

    #[inline(always)]
    fn read_le_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = [self.read_byte()?, self.read_byte()?];
        Ok(u16::from_le_bytes(bytes))
    }

    #[inline(always)]
    fn read_le_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = [
            self.read_byte()?,
            self.read_byte()?,
            self.read_byte()?,
            self.read_byte()?,
        ];
        Ok(u32::from_le_bytes(bytes))
    }
}

/*
 * The byte sink seam. Implementations own the 32 KiB sliding history, so
 * every byte written becomes visible to later back-references.
 */
pub trait DeflateOutput {
    /* Append one byte to the sink and to the sliding history. */
    fn write_byte(&mut self, byte: u8) -> Result<(), DecodeError>;

    /* Copy `length` bytes starting `distance` bytes behind the output
     * cursor. The copy must proceed byte-by-byte: when `length > distance`
     * it re-reads bytes it has just written. Callers guarantee
     * `1 <= distance <= min(32768, bytes_written())`. */
    fn copy_back_reference(&mut self, distance: usize, length: usize) -> Result<(), DecodeError>;

    /* Total bytes emitted since the stream started. */
    fn bytes_written(&self) -> usize;

    /* Flush everything to the sink and report the stream totals. */
    fn final_flush(&mut self) -> Result<OutStreamResult, DecodeError>;
}

/* What decompress_gzip_file learned about the member it decoded. */
#[derive(Debug)]
pub struct GzipFileSummary {
    pub header: GzipHeader,
    pub written: usize,
    pub crc32: u32,
}

/*
 * Decompress a single-member gzip file, handing the output to `sink` in
 * chunks of at most `chunk_size` bytes. The file is memory-mapped; the
 * decoder itself still consumes it strictly forward.
 */
pub fn decompress_gzip_file<F: FnMut(&[u8]) -> std::io::Result<()>>(
    file: impl AsRef<Path>,
    sink: F,
    chunk_size: usize,
) -> Result<GzipFileSummary, DecodeError> {
    let buffer = FileBuffer::open(file)?;
    let mut input = DeflateSliceInput::new(&buffer);

    let header = read_gzip_header(&mut input)?;

    let mut output = DeflateWindowOutput::new(sink, chunk_size);
    let result = decompress_gzip_body(&mut input, &mut output)?;

    Ok(GzipFileSummary {
        header,
        written: result.written,
        crc32: result.crc32,
    })
}

#[cfg(test)]
mod tests {
    use crate::decompress_gzip_file;
    use flate2::{Compression, GzBuilder};
    use std::io::Write;

    #[test]
    fn decompress_file_round_trip() {
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i * 31 % 251) as u8).collect();

        let mut encoder = GzBuilder::new()
            .filename("payload.bin")
            .write(Vec::new(), Compression::default());
        encoder.write_all(&payload).unwrap();
        let member = encoder.finish().unwrap();

        let path = std::env::temp_dir().join(format!("rgunzip-test-{}.gz", std::process::id()));
        std::fs::write(&path, &member).unwrap();

        let mut decoded = Vec::new();
        let summary = decompress_gzip_file(
            &path,
            |chunk| {
                decoded.extend_from_slice(chunk);
                Ok(())
            },
            64 * 1024,
        )
        .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(decoded, payload);
        assert_eq!(summary.written, payload.len());
        assert_eq!(summary.header.file_name.as_deref(), Some("payload.bin"));
        assert_eq!(summary.crc32, crc32fast::hash(&payload));
    }
}
