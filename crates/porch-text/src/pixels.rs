//! Image file to ANSI half-block [`Text`].
//!
//! Each output cell is a `▀` glyph whose foreground carries the upper
//! pixel and background the lower pixel, so a `w`×`h` pixel image
//! renders in `h / 2` terminal rows.

use std::path::Path;

use image::imageops::FilterType;

use crate::style::{Color, Style};
use crate::text::Text;

const UPPER_HALF_BLOCK: &str = "\u{2580}";

/// Errors from image rendering.
#[derive(Debug)]
pub enum PixelError {
    Decode(image::ImageError),
}

impl std::fmt::Display for PixelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelError::Decode(err) => write!(f, "image decode failed: {err}"),
        }
    }
}

impl std::error::Error for PixelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PixelError::Decode(err) => Some(err),
        }
    }
}

impl From<image::ImageError> for PixelError {
    fn from(err: image::ImageError) -> Self {
        PixelError::Decode(err)
    }
}

/// Render an image file as half-block pixels at the given pixel size.
pub fn render(path: &Path, width: u32, height: u32) -> Result<Text, PixelError> {
    let img = image::open(path)?;
    render_image(&img, width, height)
}

fn render_image(
    img: &image::DynamicImage,
    width: u32,
    height: u32,
) -> Result<Text, PixelError> {
    // Height must be even so every cell has an upper and lower pixel.
    let height = height.max(2) & !1;
    let width = width.max(1);
    let img = img.resize_exact(width, height, FilterType::Nearest).to_rgba8();

    let mut text = Text::new();
    for cell_row in 0..height / 2 {
        for x in 0..width {
            let top = pixel_color(&img, x, cell_row * 2);
            let bottom = pixel_color(&img, x, cell_row * 2 + 1);
            text = text.push(
                UPPER_HALF_BLOCK,
                Style::new().fg(top).bg(bottom),
            );
        }
        text = text.newline();
    }
    Ok(text)
}

fn pixel_color(img: &image::RgbaImage, x: u32, y: u32) -> Color {
    let p = img.get_pixel(x, y);
    // Mostly-transparent pixels render as black.
    if p[3] < 128 {
        Color::Rgb(0, 0, 0)
    } else {
        Color::Rgb(p[0], p[1], p[2])
    }
}
