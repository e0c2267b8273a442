use bitflags::bitflags;

/// A terminal color: the sixteen named ANSI colors or a truecolor value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
    Rgb(u8, u8, u8),
}

impl Color {
    /// SGR parameters selecting this color as foreground.
    fn sgr(self, base: u8, bright_base: u8, out: &mut String) {
        use std::fmt::Write;
        match self {
            Color::Black => push_code(out, base),
            Color::Red => push_code(out, base + 1),
            Color::Green => push_code(out, base + 2),
            Color::Yellow => push_code(out, base + 3),
            Color::Blue => push_code(out, base + 4),
            Color::Magenta => push_code(out, base + 5),
            Color::Cyan => push_code(out, base + 6),
            Color::White => push_code(out, base + 7),
            Color::BrightBlack => push_code(out, bright_base),
            Color::BrightRed => push_code(out, bright_base + 1),
            Color::BrightGreen => push_code(out, bright_base + 2),
            Color::BrightYellow => push_code(out, bright_base + 3),
            Color::BrightBlue => push_code(out, bright_base + 4),
            Color::BrightMagenta => push_code(out, bright_base + 5),
            Color::BrightCyan => push_code(out, bright_base + 6),
            Color::BrightWhite => push_code(out, bright_base + 7),
            Color::Rgb(r, g, b) => {
                if !out.is_empty() {
                    out.push(';');
                }
                // 38/48;2;r;g;b truecolor form.
                let _ = write!(out, "{};2;{r};{g};{b}", base + 8);
            }
        }
    }

    pub(crate) fn fg_sgr(self, out: &mut String) {
        self.sgr(30, 90, out);
    }

    pub(crate) fn bg_sgr(self, out: &mut String) {
        self.sgr(40, 100, out);
    }
}

fn push_code(out: &mut String, code: u8) {
    use std::fmt::Write;
    if !out.is_empty() {
        out.push(';');
    }
    let _ = write!(out, "{code}");
}

bitflags! {
    /// Text attribute flags, packed into a single byte.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StyleFlags: u8 {
        const BOLD      = 0b0000_0001;
        const DIM       = 0b0000_0010;
        const ITALIC    = 0b0000_0100;
        const UNDERLINE = 0b0000_1000;
    }
}

/// Rendering attributes for one span of text.
///
/// The default style carries no attributes and renders without any
/// escape sequences, so plain spans pass through the renderer verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Style {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub flags: StyleFlags,
}

impl Default for Style {
    fn default() -> Self {
        Self::new()
    }
}

impl Style {
    pub const fn new() -> Self {
        Self {
            fg: None,
            bg: None,
            flags: StyleFlags::empty(),
        }
    }

    pub const fn fg(mut self, color: Color) -> Self {
        self.fg = Some(color);
        self
    }

    pub const fn bg(mut self, color: Color) -> Self {
        self.bg = Some(color);
        self
    }

    pub const fn bold(mut self) -> Self {
        self.flags = self.flags.union(StyleFlags::BOLD);
        self
    }

    pub const fn dim(mut self) -> Self {
        self.flags = self.flags.union(StyleFlags::DIM);
        self
    }

    pub const fn italic(mut self) -> Self {
        self.flags = self.flags.union(StyleFlags::ITALIC);
        self
    }

    pub const fn underline(mut self) -> Self {
        self.flags = self.flags.union(StyleFlags::UNDERLINE);
        self
    }

    /// True if this style renders no escape sequences at all.
    pub fn is_plain(&self) -> bool {
        self.fg.is_none() && self.bg.is_none() && self.flags.is_empty()
    }

    /// The SGR parameter list for this style, without the CSI framing.
    ///
    /// Returns an empty string for the plain style.
    pub(crate) fn sgr_params(&self) -> String {
        let mut params = String::new();
        if self.flags.contains(StyleFlags::BOLD) {
            push_code(&mut params, 1);
        }
        if self.flags.contains(StyleFlags::DIM) {
            push_code(&mut params, 2);
        }
        if self.flags.contains(StyleFlags::ITALIC) {
            push_code(&mut params, 3);
        }
        if self.flags.contains(StyleFlags::UNDERLINE) {
            push_code(&mut params, 4);
        }
        if let Some(fg) = self.fg {
            fg.fg_sgr(&mut params);
        }
        if let Some(bg) = self.bg {
            bg.bg_sgr(&mut params);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_style_is_plain() {
        assert!(Style::default().is_plain());
        assert_eq!(Style::default().sgr_params(), "");
    }

    #[test]
    fn test_bold_green_params() {
        let style = Style::new().fg(Color::Green).bold();
        assert_eq!(style.sgr_params(), "1;32");
    }

    #[test]
    fn test_bright_and_bg_params() {
        let style = Style::new().fg(Color::BrightBlue).bg(Color::Black);
        assert_eq!(style.sgr_params(), "94;40");
    }

    #[test]
    fn test_rgb_params() {
        let style = Style::new().fg(Color::Rgb(10, 20, 30));
        assert_eq!(style.sgr_params(), "38;2;10;20;30");
    }

    #[test]
    fn test_builder_accumulates_flags() {
        let style = Style::new().bold().underline();
        assert!(style.flags.contains(StyleFlags::BOLD));
        assert!(style.flags.contains(StyleFlags::UNDERLINE));
        assert!(!style.flags.contains(StyleFlags::ITALIC));
    }
}
