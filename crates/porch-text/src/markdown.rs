//! Markdown source to styled [`Text`].
//!
//! Drives `pulldown-cmark`'s event stream into the span builder. The
//! output targets a line terminal, not a full layout engine: headings
//! are bold cyan, inline code is yellow, fenced code blocks are
//! indented and dimmed, list items get a bullet glyph.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::style::{Color, Style};
use crate::text::Text;

const HEADING: Style = Style::new().fg(Color::Cyan).bold();
const CODE: Style = Style::new().fg(Color::Yellow);
const CODE_BLOCK: Style = Style::new().dim();
const LINK: Style = Style::new().fg(Color::Blue).underline();

/// Render markdown source into styled text.
pub fn render(source: &str) -> Text {
    let parser = Parser::new(source);

    let mut text = Text::new();
    // Style stack: innermost span style wins.
    let mut styles: Vec<Style> = Vec::new();
    let mut in_code_block = false;
    let mut list_depth: usize = 0;

    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { .. } => styles.push(HEADING),
                Tag::Emphasis => styles.push(current(&styles).italic()),
                Tag::Strong => styles.push(current(&styles).bold()),
                Tag::Link { .. } => styles.push(LINK),
                Tag::CodeBlock(_) => {
                    in_code_block = true;
                    styles.push(CODE_BLOCK);
                }
                Tag::List(_) => list_depth += 1,
                Tag::Item => {
                    let indent = "  ".repeat(list_depth.saturating_sub(1));
                    text = text.push_plain(format!("{indent}• "));
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Heading(_) => {
                    styles.pop();
                    text = text.newline().newline();
                }
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Link => {
                    styles.pop();
                }
                TagEnd::CodeBlock => {
                    in_code_block = false;
                    styles.pop();
                    text = text.newline();
                }
                TagEnd::Paragraph => text = text.newline().newline(),
                TagEnd::Item => text = text.newline(),
                TagEnd::List(_) => {
                    list_depth = list_depth.saturating_sub(1);
                    if list_depth == 0 {
                        text = text.newline();
                    }
                }
                _ => {}
            },
            Event::Text(content) => {
                if in_code_block {
                    // Indent every line of the block.
                    for line in content.lines() {
                        text = text.push(format!("    {line}"), current(&styles)).newline();
                    }
                } else {
                    text = text.push(content.into_string(), current(&styles));
                }
            }
            Event::Code(content) => {
                text = text.push(content.into_string(), CODE);
            }
            Event::SoftBreak => text = text.push_plain(" "),
            Event::HardBreak => text = text.newline(),
            Event::Rule => text = text.push("────────\n", Style::new().dim()),
            _ => {}
        }
    }

    text
}

fn current(styles: &[Style]) -> Style {
    styles.last().copied().unwrap_or_default()
}
