use crate::decompress_deflate::{deflate_decompress, OutStreamResult};
use crate::gzip_constants::{
    GZIP_CM_DEFLATE, GZIP_FCOMMENT, GZIP_FEXTRA, GZIP_FHCRC, GZIP_FNAME, GZIP_FRESERVED,
    GZIP_FTEXT, GZIP_ID1, GZIP_ID2,
};
use crate::{DecodeError, DeflateInput, DeflateOutput};
use crc32fast::Hasher;

/* Parsed RFC 1952 member header. */
#[derive(Debug, Default, Clone)]
pub struct GzipHeader {
    /* FNAME: the original file name, NUL-terminated on the wire, with no
     * length cap. */
    pub file_name: Option<String>,
    /* FCOMMENT, same encoding as FNAME. */
    pub comment: Option<String>,
    /* Modification time of the original file; 0 means unavailable. */
    pub mtime: u32,
    /* FTEXT: the member claims to be text. */
    pub is_text: bool,
    pub extra_flags: u8,
    pub operating_system: u8,
}

/*
 * Header bytes feed a CRC32 as they are read, so FHCRC can be checked
 * against the low 16 bits without buffering arbitrarily long name or
 * comment fields.
 */
struct HeaderReader<'a, I: DeflateInput> {
    input: &'a mut I,
    crc: Hasher,
}

impl<'a, I: DeflateInput> HeaderReader<'a, I> {
    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = self.input.read_byte()?;
        self.crc.update(&[byte]);
        Ok(byte)
    }

    fn read_le_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = [self.read_byte()?, self.read_byte()?];
        Ok(u16::from_le_bytes(bytes))
    }

    fn read_le_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = [
            self.read_byte()?,
            self.read_byte()?,
            self.read_byte()?,
            self.read_byte()?,
        ];
        Ok(u32::from_le_bytes(bytes))
    }

    /* Stream a NUL-terminated field of arbitrary length. The fields are
     * nominally ISO 8859-1; non-UTF-8 bytes degrade to replacement chars. */
    fn read_nul_terminated(&mut self) -> Result<String, DecodeError> {
        let mut bytes = Vec::new();
        loop {
            let byte = self.read_byte()?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/* Walk the member header up to the first byte of the DEFLATE stream. */
pub fn read_gzip_header<I: DeflateInput>(input: &mut I) -> Result<GzipHeader, DecodeError> {
    let start = input.tell_stream_pos();
    let mut reader = HeaderReader {
        input,
        crc: Hasher::new(),
    };

    if reader.read_byte()? != GZIP_ID1 || reader.read_byte()? != GZIP_ID2 {
        return Err(DecodeError::MalformedHeader {
            reason: "missing gzip magic bytes",
            offset: start,
        });
    }
    if reader.read_byte()? != GZIP_CM_DEFLATE {
        return Err(DecodeError::MalformedHeader {
            reason: "compression method is not DEFLATE",
            offset: start + 2,
        });
    }

    let flags = reader.read_byte()?;
    if flags & GZIP_FRESERVED != 0 {
        return Err(DecodeError::MalformedHeader {
            reason: "reserved flag bits are set",
            offset: start + 3,
        });
    }

    let mut header = GzipHeader {
        is_text: flags & GZIP_FTEXT != 0,
        mtime: reader.read_le_u32()?,
        ..GzipHeader::default()
    };
    header.extra_flags = reader.read_byte()?;
    header.operating_system = reader.read_byte()?;

    if flags & GZIP_FEXTRA != 0 {
        let xlen = reader.read_le_u16()?;
        for _ in 0..xlen {
            reader.read_byte()?;
        }
    }

    if flags & GZIP_FNAME != 0 {
        header.file_name = Some(reader.read_nul_terminated()?);
    }

    if flags & GZIP_FCOMMENT != 0 {
        header.comment = Some(reader.read_nul_terminated()?);
    }

    if flags & GZIP_FHCRC != 0 {
        let computed = (reader.crc.clone().finalize() & 0xFFFF) as u16;
        let offset = reader.input.tell_stream_pos();
        let stored = reader.input.read_le_u16()?;
        if stored != computed {
            return Err(DecodeError::MalformedHeader {
                reason: "header crc16 mismatch",
                offset,
            });
        }
    }

    Ok(header)
}

/*
 * Decode the DEFLATE stream and verify the trailer: 4-byte little-endian
 * CRC32 of the output, then 4-byte little-endian ISIZE (length mod 2^32).
 */
pub fn decompress_gzip_body<I: DeflateInput, O: DeflateOutput>(
    input: &mut I,
    output: &mut O,
) -> Result<OutStreamResult, DecodeError> {
    deflate_decompress(input, output)?;
    let result = output.final_flush()?;

    let stored_crc = input.read_le_u32()?;
    if stored_crc != result.crc32 {
        return Err(DecodeError::ChecksumMismatch {
            expected: stored_crc,
            found: result.crc32,
        });
    }

    let stored_size = input.read_le_u32()?;
    if stored_size != result.written as u32 {
        return Err(DecodeError::SizeMismatch {
            expected: stored_size,
            found: result.written as u32,
        });
    }

    Ok(result)
}

/* Header and body in one call; decodes exactly one member. */
pub fn gzip_decompress<I: DeflateInput, O: DeflateOutput>(
    input: &mut I,
    output: &mut O,
) -> Result<(GzipHeader, OutStreamResult), DecodeError> {
    let header = read_gzip_header(input)?;
    let result = decompress_gzip_body(input, output)?;
    Ok((header, result))
}
