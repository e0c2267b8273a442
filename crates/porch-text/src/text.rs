use std::io;

use crate::style::Style;

/// One run of text rendered with a single style.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub content: String,
    pub style: Style,
}

impl Span {
    pub fn new(content: impl Into<String>, style: Style) -> Self {
        Self {
            content: content.into(),
            style,
        }
    }
}

/// Styled text: an ordered sequence of spans.
///
/// This is the renderable that commands return and the session engine
/// transmits. Plain spans render byte-for-byte, so a `Text` built from
/// a file that already contains escape sequences survives rendering
/// unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Text {
    spans: Vec<Span>,
}

impl Text {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single unstyled span.
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            spans: vec![Span::new(content, Style::default())],
        }
    }

    /// A single styled span.
    pub fn styled(content: impl Into<String>, style: Style) -> Self {
        Self {
            spans: vec![Span::new(content, style)],
        }
    }

    /// Append a styled span, builder-style.
    pub fn push(mut self, content: impl Into<String>, style: Style) -> Self {
        self.spans.push(Span::new(content, style));
        self
    }

    /// Append an unstyled span, builder-style.
    pub fn push_plain(self, content: impl Into<String>) -> Self {
        self.push(content, Style::default())
    }

    /// Append an unstyled line break.
    pub fn newline(self) -> Self {
        self.push_plain("\n")
    }

    /// Append all spans of another text.
    pub fn append(&mut self, other: Text) {
        self.spans.extend(other.spans);
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|s| s.content.is_empty())
    }

    /// The unstyled character content, with all styling dropped.
    pub fn to_plain_string(&self) -> String {
        self.spans.iter().map(|s| s.content.as_str()).collect()
    }

    /// Render to a string with ANSI SGR escape sequences.
    ///
    /// Each styled span is wrapped in its SGR parameters and a reset;
    /// plain spans are emitted verbatim.
    pub fn render_ansi(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            if span.style.is_plain() {
                out.push_str(&span.content);
            } else {
                out.push_str("\x1b[");
                out.push_str(&span.style.sgr_params());
                out.push('m');
                out.push_str(&span.content);
                out.push_str("\x1b[0m");
            }
        }
        out
    }

    /// Render and write to a sink in one call.
    pub fn render_to(&self, sink: &mut dyn TextSink) -> io::Result<()> {
        sink.write(&self.render_ansi())
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Text::plain(s)
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::plain(s)
    }
}

/// Destination for rendered text.
///
/// The styled-text layer depends only on this trait; the terminal
/// layer's chunking output sink implements it.
pub trait TextSink {
    fn write(&mut self, text: &str) -> io::Result<()>;
}

/// Any `String` is a sink; rendered text is simply appended.
impl TextSink for String {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.push_str(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    #[test]
    fn test_plain_text_renders_verbatim() {
        let text = Text::plain("hello\nworld");
        assert_eq!(text.render_ansi(), "hello\nworld");
    }

    #[test]
    fn test_styled_span_wrapped_in_sgr() {
        let text = Text::styled("hi", Style::new().fg(Color::Blue).bold());
        assert_eq!(text.render_ansi(), "\x1b[1;34mhi\x1b[0m");
    }

    #[test]
    fn test_assembled_spans_in_order() {
        let text = Text::new()
            .push("exit", Style::new().fg(Color::Blue).bold())
            .push_plain("\tExit the terminal")
            .newline();
        let rendered = text.render_ansi();
        assert_eq!(rendered, "\x1b[1;34mexit\x1b[0m\tExit the terminal\n");
        assert_eq!(text.to_plain_string(), "exit\tExit the terminal\n");
    }

    #[test]
    fn test_embedded_escapes_pass_through() {
        // A welcome file may already carry its own escape sequences.
        let raw = "\x1b[35mbanner\x1b[0m\n";
        assert_eq!(Text::plain(raw).render_ansi(), raw);
    }

    #[test]
    fn test_append_and_emptiness() {
        let mut text = Text::new();
        assert!(text.is_empty());
        text.append(Text::plain("a"));
        text.append(Text::styled("b", Style::new().dim()));
        assert!(!text.is_empty());
        assert_eq!(text.to_plain_string(), "ab");
        assert_eq!(text.spans().len(), 2);
    }

    #[test]
    fn test_string_sink_collects() {
        let mut sink = String::new();
        Text::plain("abc").render_to(&mut sink).unwrap();
        assert_eq!(sink, "abc");
    }
}
