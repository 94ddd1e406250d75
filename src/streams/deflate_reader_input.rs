use crate::DeflateInput;
use std::io::Read;

/* Buffered forward cursor over any Read source. */
pub struct DeflateReaderInput<R: Read> {
    reader: R,
    buffer: Box<[u8]>,
    start: usize,
    end: usize,
    consumed: usize,
    reached_eof: bool,
}

impl<R: Read> DeflateReaderInput<R> {
    pub fn new(reader: R, buf_size: usize) -> Self {
        Self {
            reader,
            buffer: vec![0u8; buf_size.max(1)].into_boxed_slice(),
            start: 0,
            end: 0,
            consumed: 0,
            reached_eof: false,
        }
    }

    #[cold]
    fn refill(&mut self) -> std::io::Result<()> {
        self.start = 0;
        self.end = 0;
        loop {
            match self.reader.read(&mut self.buffer) {
                Ok(0) => {
                    self.reached_eof = true;
                    return Ok(());
                }
                Ok(count) => {
                    self.end = count;
                    return Ok(());
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

impl<R: Read> DeflateInput for DeflateReaderInput<R> {
    #[inline(always)]
    fn next_byte(&mut self) -> std::io::Result<Option<u8>> {
        if self.start == self.end {
            if self.reached_eof {
                return Ok(None);
            }
            self.refill()?;
            if self.start == self.end {
                return Ok(None);
            }
        }
        let byte = self.buffer[self.start];
        self.start += 1;
        self.consumed += 1;
        Ok(Some(byte))
    }

    #[inline(always)]
    fn tell_stream_pos(&self) -> usize {
        self.consumed
    }
}

#[cfg(test)]
mod tests {
    use crate::streams::deflate_reader_input::DeflateReaderInput;
    use crate::DeflateInput;
    use std::io::Cursor;

    #[test]
    fn refills_across_small_buffers() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut input = DeflateReaderInput::new(Cursor::new(data.clone()), 3);

        let mut seen = Vec::new();
        while let Some(byte) = input.next_byte().unwrap() {
            seen.push(byte);
        }
        assert_eq!(seen, data);
        assert_eq!(input.tell_stream_pos(), 100);
        assert_eq!(input.next_byte().unwrap(), None);
    }
}
