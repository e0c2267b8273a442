//! porch-text: Styled-text model and renderers for Porch.
//!
//! Provides the `Text` type that commands and the session engine hand
//! around, and the renderers that turn files into it. `Text` knows how
//! to serialize itself to ANSI SGR escape sequences; it is the only
//! thing the terminal layer ever transmits.
//!
//! # Architecture
//!
//! - [`Style`] / [`StyleFlags`] / [`Color`] — Per-span attributes.
//! - [`Text`] — Ordered styled spans, the engine's renderable.
//! - [`TextSink`] — The seam between rendered text and the wire.
//! - [`markdown`] — Markdown source to styled `Text`.
//! - [`pixels`] — Image file to ANSI half-block `Text`.

pub mod markdown;
pub mod pixels;
pub mod style;
pub mod text;

pub use pixels::PixelError;
pub use style::{Color, Style, StyleFlags};
pub use text::{Span, Text, TextSink};
