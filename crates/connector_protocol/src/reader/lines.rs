use std::io::{self, BufRead, Read};

use crate::error::ProtocolError;

/// Yields numbered UTF-8 lines from a protocol stream, one at a time.
///
/// Every `\n`-terminated line is yielded, including empty ones; only end of input without a
/// pending line ends iteration. A single trailing `\r` is dropped. At most `max_line_bytes`
/// of a line (excluding its terminator) are ever buffered. The first failure ends iteration.
pub(crate) struct MessageLines<R> {
    reader: R,
    max_line_bytes: usize,
    line_number: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> MessageLines<R> {
    pub(crate) fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            max_line_bytes,
            line_number: 0,
            buf: Vec::new(),
            done: false,
        }
    }

    fn read_line(&mut self) -> Result<Option<(usize, String)>, ProtocolError> {
        let line_number = self.line_number + 1;
        let io_failure = |source| ProtocolError::Io {
            line_number,
            source,
        };

        self.buf.clear();
        // Room for a full line, its `\n`, and one byte to detect overflow.
        let window = u64::try_from(self.max_line_bytes.saturating_add(2)).unwrap_or(u64::MAX);
        let read = (&mut self.reader)
            .take(window)
            .read_until(b'\n', &mut self.buf)
            .map_err(io_failure)?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number = line_number;

        let terminated = self.buf.last() == Some(&b'\n');
        if terminated {
            self.buf.pop();
        }
        if self.buf.len() > self.max_line_bytes {
            let rest = if terminated {
                0
            } else {
                self.discard_rest_of_line().map_err(io_failure)?
            };
            return Err(ProtocolError::LineTooLong {
                line_number,
                observed_bytes: self.buf.len().saturating_add(rest),
                max_line_bytes: self.max_line_bytes,
            });
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }

        let line = String::from_utf8(std::mem::take(&mut self.buf))
            .map_err(|_| ProtocolError::InvalidUtf8 { line_number })?;
        Ok(Some((line_number, line)))
    }

    /// Consumes input up to and including the next `\n`, returning the bytes skipped before it.
    fn discard_rest_of_line(&mut self) -> io::Result<usize> {
        let mut discarded = 0usize;
        loop {
            let (consumed, found_newline) = match self.reader.fill_buf() {
                Ok([]) => return Ok(discarded),
                Ok(available) => match available.iter().position(|b| *b == b'\n') {
                    Some(idx) => (idx, true),
                    None => (available.len(), false),
                },
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            discarded = discarded.saturating_add(consumed);
            if found_newline {
                self.reader.consume(consumed + 1);
                return Ok(discarded);
            }
            self.reader.consume(consumed);
        }
    }
}

impl<R: BufRead> Iterator for MessageLines<R> {
    type Item = Result<(usize, String), ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.read_line().transpose();
        if !matches!(next, Some(Ok(_))) {
            self.done = true;
        }
        next
    }
}
