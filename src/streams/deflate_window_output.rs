use crate::decompress_deflate::OutStreamResult;
use crate::deflate_constants::DEFLATE_WINDOW_SIZE;
use crate::{DecodeError, DeflateOutput};
use crc32fast::Hasher;

const WINDOW_MASK: usize = DEFLATE_WINDOW_SIZE - 1;

/*
 * Output stream carrying the 32 KiB sliding history as a ring, a running
 * CRC32 of everything emitted, and a chunk buffer that is handed to the
 * sink closure whenever it fills. The ring always holds the last
 * min(total_output, 32768) bytes, which is exactly what back-references
 * are allowed to address.
 */
pub struct DeflateWindowOutput<'a> {
    window: Box<[u8]>,
    head: usize,
    written: usize,
    pending: Vec<u8>,
    chunk_size: usize,
    crc32: Hasher,
    sink: Box<dyn FnMut(&[u8]) -> std::io::Result<()> + 'a>,
}

impl<'a> DeflateWindowOutput<'a> {
    pub fn new<F: FnMut(&[u8]) -> std::io::Result<()> + 'a>(sink: F, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            window: vec![0u8; DEFLATE_WINDOW_SIZE].into_boxed_slice(),
            head: 0,
            written: 0,
            pending: Vec::with_capacity(chunk_size),
            chunk_size,
            crc32: Hasher::new(),
            sink: Box::new(sink),
        }
    }

    fn flush_pending(&mut self) -> Result<(), DecodeError> {
        if !self.pending.is_empty() {
            self.crc32.update(&self.pending);
            (self.sink)(&self.pending)?;
            self.pending.clear();
        }
        Ok(())
    }
}

impl<'a> DeflateOutput for DeflateWindowOutput<'a> {
    #[inline(always)]
    fn write_byte(&mut self, byte: u8) -> Result<(), DecodeError> {
        self.window[self.head] = byte;
        self.head = (self.head + 1) & WINDOW_MASK;
        self.written += 1;
        self.pending.push(byte);
        if self.pending.len() >= self.chunk_size {
            self.flush_pending()?;
        }
        Ok(())
    }

    fn copy_back_reference(&mut self, distance: usize, length: usize) -> Result<(), DecodeError> {
        debug_assert!(distance >= 1);
        debug_assert!(distance <= self.written.min(DEFLATE_WINDOW_SIZE));

        /* Byte-by-byte on purpose: a distance shorter than the length must
         * re-read bytes this same copy has just produced. */
        for _ in 0..length {
            let byte = self.window[self.head.wrapping_sub(distance) & WINDOW_MASK];
            self.write_byte(byte)?;
        }
        Ok(())
    }

    fn bytes_written(&self) -> usize {
        self.written
    }

    fn final_flush(&mut self) -> Result<OutStreamResult, DecodeError> {
        self.flush_pending()?;
        Ok(OutStreamResult {
            written: self.written,
            crc32: self.crc32.clone().finalize(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::streams::deflate_window_output::DeflateWindowOutput;
    use crate::DeflateOutput;

    #[test]
    fn overlapping_copy_replicates_the_last_byte() {
        let mut collected = Vec::new();
        {
            let mut output = DeflateWindowOutput::new(
                |chunk| {
                    collected.extend_from_slice(chunk);
                    Ok(())
                },
                16,
            );
            output.write_byte(b'z').unwrap();
            output.copy_back_reference(1, 258).unwrap();
            let result = output.final_flush().unwrap();
            assert_eq!(result.written, 259);
        }
        assert_eq!(collected.len(), 259);
        assert!(collected.iter().all(|&byte| byte == b'z'));
    }

    #[test]
    fn copies_survive_the_ring_wrapping_around() {
        let payload: Vec<u8> = (0..40_000u32).map(|i| (i % 256) as u8).collect();

        let mut collected = Vec::new();
        {
            let mut output = DeflateWindowOutput::new(
                |chunk| {
                    collected.extend_from_slice(chunk);
                    Ok(())
                },
                8192,
            );
            for &byte in &payload {
                output.write_byte(byte).unwrap();
            }
            output.copy_back_reference(32_768, 4).unwrap();
            output.final_flush().unwrap();
        }

        let start = 40_000 - 32_768;
        assert_eq!(&collected[40_000..], &payload[start..start + 4]);
    }

    #[test]
    fn crc_and_count_match_the_emitted_stream() {
        let payload = b"crc this exact sequence of bytes";

        let mut collected = Vec::new();
        let result = {
            let mut output = DeflateWindowOutput::new(
                |chunk| {
                    collected.extend_from_slice(chunk);
                    Ok(())
                },
                5, /* force mid-stream flushes */
            );
            for &byte in payload {
                output.write_byte(byte).unwrap();
            }
            output.final_flush().unwrap()
        };

        assert_eq!(collected, payload);
        assert_eq!(result.written, payload.len());
        assert_eq!(result.crc32, crc32fast::hash(payload));
    }

    #[test]
    fn sink_errors_surface_as_io() {
        let mut output = DeflateWindowOutput::new(
            |_| Err(std::io::Error::new(std::io::ErrorKind::Other, "full")),
            1,
        );
        assert!(matches!(
            output.write_byte(0),
            Err(crate::DecodeError::Io(_))
        ));
    }
}
