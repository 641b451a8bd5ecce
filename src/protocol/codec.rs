//! Line framing over a raw byte stream
//!
//! Raw stream reads do not guarantee message boundaries, so the relay fixes a
//! convention: one message per `\n`-terminated line, with an optional
//! trailing `\r` stripped (telnet-style clients send CRLF). Lines are UTF-8;
//! anything else is a protocol error for that connection.

use bytes::{BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Maximum accepted line length in bytes, terminator excluded
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Codec for `\n`-delimited UTF-8 text lines
#[derive(Debug, Clone, Default)]
pub struct LineCodec {
    /// Scan position into the buffer, so repeated partial reads don't rescan
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self { next_index: 0 }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> io::Result<Option<String>> {
        let newline = buf[self.next_index..].iter().position(|b| *b == b'\n');

        match newline {
            Some(offset) => {
                let end = self.next_index + offset;
                let line = buf.split_to(end + 1);
                self.next_index = 0;

                let mut line = &line[..line.len() - 1];
                if line.ends_with(b"\r") {
                    line = &line[..line.len() - 1];
                }

                let line = std::str::from_utf8(line).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, "line is not valid UTF-8")
                })?;
                Ok(Some(line.to_string()))
            }
            None if buf.len() > MAX_LINE_LENGTH => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line exceeds {} bytes", MAX_LINE_LENGTH),
            )),
            None => {
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> io::Result<Option<String>> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }

        // Peer closed mid-line: deliver the unterminated remainder
        if buf.is_empty() {
            return Ok(None);
        }
        let line = buf.split_to(buf.len());
        self.next_index = 0;
        let line = std::str::from_utf8(&line).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "line is not valid UTF-8")
        })?;
        Ok(Some(line.to_string()))
    }
}

impl Encoder<String> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> io::Result<()> {
        buf.reserve(line.len() + 1);
        buf.put_slice(line.as_bytes());
        buf.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("hello world\n");

        let line = codec.decode(&mut buf).unwrap();
        assert_eq!(line, Some("hello world".to_string()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_strips_carriage_return() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("/join rust\r\n");

        let line = codec.decode(&mut buf).unwrap();
        assert_eq!(line, Some("/join rust".to_string()));
    }

    #[test]
    fn test_decode_partial_then_complete() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("hel");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"lo\nnext");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("hello".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"next");
    }

    #[test]
    fn test_decode_multiple_lines() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("one\ntwo\nthree\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("one".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("two".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("three".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_oversized_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&vec![b'a'; MAX_LINE_LENGTH + 1]);

        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&[0xff, 0xfe, b'\n'][..]);

        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn test_decode_eof_flushes_unterminated_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("no newline");

        let line = codec.decode_eof(&mut buf).unwrap();
        assert_eq!(line, Some("no newline".to_string()));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_encode_appends_newline() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();

        codec.encode("hello".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"hello\n");
    }
}
