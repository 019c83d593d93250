use std::io::{self, BufRead, BufReader, Read};

/// Lazily reads a delimiter-separated path list from a byte stream, typically
/// standard input.
///
/// Entries are decoded as UTF-8; a chunk that isn't valid UTF-8 fails that
/// one entry with [`io::ErrorKind::InvalidData`] rather than poisoning the
/// rest of the stream.
pub struct StreamReader<R> {
    reader: BufReader<R>,
    delimiter: u8,
    buf: Vec<u8>,
}

impl<R: Read> StreamReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_delimiter(reader, b'\n')
    }

    pub fn with_delimiter(reader: R, delimiter: u8) -> Self {
        Self {
            reader: BufReader::new(reader),
            delimiter,
            buf: Vec::new(),
        }
    }

    /// Return the next delimited entry, or `None` at end of input. Empty
    /// entries (two delimiters in a row, or a leading delimiter) are
    /// skipped; a trailing entry with no terminating delimiter is accepted.
    pub fn read_entry(&mut self) -> io::Result<Option<String>> {
        loop {
            self.buf.clear();
            let read = self.reader.read_until(self.delimiter, &mut self.buf)?;
            if read == 0 {
                return Ok(None);
            }
            if self.buf.last() == Some(&self.delimiter) {
                self.buf.pop();
            }
            if self.buf.is_empty() {
                continue;
            }
            let entry = String::from_utf8(self.buf.clone())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            return Ok(Some(entry));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_newline_separated_entries() {
        let mut reader = StreamReader::new(Cursor::new(b"a.php\nb.php\nc.php\n".to_vec()));
        assert_eq!(reader.read_entry().unwrap(), Some("a.php".to_string()));
        assert_eq!(reader.read_entry().unwrap(), Some("b.php".to_string()));
        assert_eq!(reader.read_entry().unwrap(), Some("c.php".to_string()));
        assert_eq!(reader.read_entry().unwrap(), None);
    }

    #[test]
    fn accepts_trailing_entry_without_delimiter() {
        let mut reader = StreamReader::new(Cursor::new(b"a.php\nb.php".to_vec()));
        assert_eq!(reader.read_entry().unwrap(), Some("a.php".to_string()));
        assert_eq!(reader.read_entry().unwrap(), Some("b.php".to_string()));
        assert_eq!(reader.read_entry().unwrap(), None);
    }

    #[test]
    fn skips_empty_entries() {
        let mut reader = StreamReader::new(Cursor::new(b"a.php\n\n\nb.php\n".to_vec()));
        assert_eq!(reader.read_entry().unwrap(), Some("a.php".to_string()));
        assert_eq!(reader.read_entry().unwrap(), Some("b.php".to_string()));
        assert_eq!(reader.read_entry().unwrap(), None);
    }

    #[test]
    fn custom_delimiter() {
        let mut reader = StreamReader::with_delimiter(Cursor::new(b"a.php\0b.php\0".to_vec()), 0);
        assert_eq!(reader.read_entry().unwrap(), Some("a.php".to_string()));
        assert_eq!(reader.read_entry().unwrap(), Some("b.php".to_string()));
        assert_eq!(reader.read_entry().unwrap(), None);
    }

    #[test]
    fn invalid_utf8_fails_that_entry() {
        let mut reader = StreamReader::new(Cursor::new(vec![0xff, 0xfe, b'\n']));
        assert!(reader.read_entry().is_err());
    }
}
