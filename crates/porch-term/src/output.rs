//! Chunked, CRLF-normalizing output writer.
//!
//! Remote terminals need every line feed sent as `\r\n`, and some
//! clients misbehave when a single write is too large. The sink
//! normalizes line endings, splits oversized texts into bounded
//! chunks, and never splits an escape sequence across two chunks: a
//! recognized escape run travels with the visible character that
//! follows it.

use std::io;
use std::iter::Peekable;
use std::str::Chars;

use porch_text::TextSink;

use crate::channel::Channel;

/// Maximum characters per wire write.
pub const DEFAULT_MAX_CHUNK: usize = 1000;

/// Adapts a [`Channel`] into a chunked text writer.
pub struct OutputSink<'a> {
    channel: &'a mut dyn Channel,
    max_chunk: usize,
}

impl<'a> OutputSink<'a> {
    pub fn new(channel: &'a mut dyn Channel) -> Self {
        Self::with_max_chunk(channel, DEFAULT_MAX_CHUNK)
    }

    pub fn with_max_chunk(channel: &'a mut dyn Channel, max_chunk: usize) -> Self {
        Self { channel, max_chunk }
    }

    fn send_chunked_line(&mut self, line: &str) -> io::Result<()> {
        let mut chunk = String::new();
        let mut chunk_len = 0usize;
        // Escape run waiting for the visible character it belongs to.
        let mut pending_escape = String::new();
        let mut pending_len = 0usize;

        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                pending_len += take_escape_run(&mut chars, &mut pending_escape);
                continue;
            }

            if chunk_len + pending_len + 1 > self.max_chunk && !chunk.is_empty() {
                self.channel.send(chunk.as_bytes())?;
                chunk.clear();
                chunk_len = 0;
            }
            chunk.push_str(&pending_escape);
            chunk.push(c);
            chunk_len += pending_len + 1;
            pending_escape.clear();
            pending_len = 0;
        }

        // An escape run at end of line rides out with the final chunk.
        chunk.push_str(&pending_escape);
        if !chunk.is_empty() {
            self.channel.send(chunk.as_bytes())?;
        }
        Ok(())
    }
}

impl TextSink for OutputSink<'_> {
    /// Transmit `text`, expanding bare `\n` to `\r\n`.
    ///
    /// Texts that still fit the chunk limit after CRLF expansion go
    /// out in one write. Longer texts are split per line, then within
    /// a line at escape-safe points.
    fn write(&mut self, text: &str) -> io::Result<()> {
        // Each '\n' grows by one character on the wire; size the fast
        // path against the expanded form.
        let newlines = text.matches('\n').count();
        if text.chars().count() + newlines < self.max_chunk {
            return self.channel.send(text.replace('\n', "\r\n").as_bytes());
        }

        let lines: Vec<&str> = text.split('\n').collect();
        let last = lines.len() - 1;
        for (i, line) in lines.iter().enumerate() {
            self.send_chunked_line(line)?;
            if i < last {
                self.channel.send(b"\r\n")?;
            }
        }
        Ok(())
    }
}

/// Consume one escape sequence following an already-consumed ESC.
///
/// Grammar: `ESC [` parameter bytes (0x30..=0x3F), intermediate bytes
/// (0x20..=0x2F), and a final byte (0x40..=0x7E); or ESC plus a single
/// byte in 0x40..=0x5F. The full run (including the ESC) is appended
/// to `out`; returns the number of characters appended.
fn take_escape_run(chars: &mut Peekable<Chars<'_>>, out: &mut String) -> usize {
    out.push('\x1b');
    let mut len = 1;

    match chars.peek() {
        Some('[') => {
            out.push('[');
            len += 1;
            chars.next();
            while let Some(&c) = chars.peek() {
                if ('\x30'..='\x3f').contains(&c) || ('\x20'..='\x2f').contains(&c) {
                    out.push(c);
                    len += 1;
                    chars.next();
                } else {
                    break;
                }
            }
            if let Some(&c) = chars.peek() {
                if ('\x40'..='\x7e').contains(&c) {
                    out.push(c);
                    len += 1;
                    chars.next();
                }
            }
        }
        Some(&c) if ('\x40'..='\x5f').contains(&c) => {
            out.push(c);
            len += 1;
            chars.next();
        }
        // A lone ESC is not a sequence; pass it through by itself.
        _ => {}
    }

    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannel;

    fn write_with(max_chunk: usize, text: &str) -> (Vec<String>, String) {
        // MockChannel accumulates everything; to observe chunk
        // boundaries we wrap it with a recorder.
        struct Recorder {
            inner: MockChannel,
            writes: Vec<String>,
        }
        impl crate::channel::Channel for Recorder {
            fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.inner.recv(buf)
            }
            fn send(&mut self, data: &[u8]) -> io::Result<()> {
                self.writes.push(String::from_utf8_lossy(data).into_owned());
                self.inner.send(data)
            }
            fn close(&mut self) {
                self.inner.close()
            }
            fn peer_addr(&self) -> Option<std::net::SocketAddr> {
                self.inner.peer_addr()
            }
        }

        let (inner, transcript) = MockChannel::new(b"");
        let mut recorder = Recorder {
            inner,
            writes: Vec::new(),
        };
        {
            let mut sink = OutputSink::with_max_chunk(&mut recorder, max_chunk);
            sink.write(text).unwrap();
        }
        (recorder.writes, transcript.string())
    }

    fn round_trip(sent: &str) -> String {
        sent.replace("\r\n", "\n")
    }

    #[test]
    fn test_short_text_single_write_crlf() {
        let (writes, sent) = write_with(1000, "hello\nworld\n");
        assert_eq!(writes, vec!["hello\r\nworld\r\n"]);
        assert_eq!(round_trip(&sent), "hello\nworld\n");
    }

    #[test]
    fn test_long_text_round_trips() {
        let text = "a".repeat(2500);
        let (writes, sent) = write_with(1000, &text);
        assert_eq!(round_trip(&sent), text);
        assert!(writes.iter().all(|w| w.chars().count() <= 1000));
        assert_eq!(writes.len(), 3);
    }

    #[test]
    fn test_long_multiline_round_trips() {
        let text = format!("{}\n{}\nshort", "x".repeat(1200), "y".repeat(800));
        let (writes, sent) = write_with(1000, &text);
        assert_eq!(round_trip(&sent), text);
        assert!(writes.iter().all(|w| w.chars().count() <= 1000));
    }

    #[test]
    fn test_no_trailing_newline_added() {
        let text = format!("{}end", "z".repeat(1500));
        let (_, sent) = write_with(1000, &text);
        assert!(!sent.ends_with("\r\n"));
        assert_eq!(round_trip(&sent), text);
    }

    #[test]
    fn test_escape_sequence_never_split() {
        // Pack styled runs so a naive splitter would cut mid-sequence.
        let mut text = String::new();
        for _ in 0..300 {
            text.push_str("\x1b[1;34mAB\x1b[0m");
        }
        let (writes, sent) = write_with(100, &text);
        assert_eq!(round_trip(&sent), text);
        for w in &writes {
            // Every ESC in a chunk starts a complete sequence ending in 'm'.
            let mut rest = w.as_str();
            while let Some(pos) = rest.find('\x1b') {
                let tail = &rest[pos..];
                let end = tail.find('m').expect("sequence split across chunks");
                rest = &tail[end + 1..];
            }
        }
    }

    #[test]
    fn test_escape_prepended_to_following_chunk() {
        // One visible char fits per chunk; its color code must come along.
        let text = format!("{}\x1b[31mR", "a".repeat(10));
        let (writes, sent) = write_with(3, &text);
        assert_eq!(round_trip(&sent), text);
        let last = writes.last().unwrap();
        assert!(last.contains("\x1b[31mR"));
    }

    #[test]
    fn test_trailing_escape_kept() {
        let text = format!("{}\x1b[0m", "b".repeat(1200));
        let (_, sent) = write_with(1000, &text);
        assert_eq!(round_trip(&sent), text);
    }

    #[test]
    fn test_two_char_escape_form() {
        // ESC M (reverse index) is the two-character form.
        let text = format!("{}\x1bMx", "c".repeat(1100));
        let (writes, sent) = write_with(1000, &text);
        assert_eq!(round_trip(&sent), text);
        let holding = writes.iter().find(|w| w.contains('\x1b')).unwrap();
        assert!(holding.contains("\x1bMx"));
    }

    #[test]
    fn test_oversized_atomic_run_accepted() {
        // A single escape+char run larger than the limit still goes out whole.
        let text = format!("{}\x1b[38;2;1;2;3mZ", "d".repeat(50));
        let (writes, sent) = write_with(4, &text);
        assert_eq!(round_trip(&sent), text);
        assert!(writes.iter().any(|w| w.contains("\x1b[38;2;1;2;3mZ")));
    }

    #[test]
    fn test_newline_dense_text_stays_bounded() {
        // 999 chars, but 1498 once every '\n' becomes "\r\n"; the
        // expansion must not ride the single-write path past the limit.
        let mut text = "a\n".repeat(499);
        text.push('a');
        let (writes, sent) = write_with(1000, &text);
        assert_eq!(round_trip(&sent), text);
        assert!(writes.iter().all(|w| w.chars().count() <= 1000));
    }

    #[test]
    fn test_expanded_text_at_limit_single_write() {
        // 997 chars + 2 newlines expands to 999, still one write.
        let text = format!("{}\nmid\nend", "f".repeat(989));
        let (writes, sent) = write_with(1000, &text);
        assert_eq!(writes.len(), 1);
        assert_eq!(round_trip(&sent), text);
    }

    #[test]
    fn test_empty_lines_preserved() {
        let text = format!("{}\n\n\ntail", "e".repeat(1200));
        let (_, sent) = write_with(1000, &text);
        assert_eq!(round_trip(&sent), text);
    }
}
