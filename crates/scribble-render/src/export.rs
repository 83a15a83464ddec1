//! PNG export of a whole board.
//!
//! Elements are drawn at their raw world coordinates (identity transform),
//! independent of the current pan and zoom. Anything outside the image is
//! clipped.

use crate::paint::Painter;
use ab_glyph::FontArc;
use kurbo::Affine;
use scribble_core::canvas::Board;
use scribble_core::element::Color;
use thiserror::Error;
use tiny_skia::Pixmap;

pub const EXPORT_WIDTH: u32 = 1920;
pub const EXPORT_HEIGHT: u32 = 1080;

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid export size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("Invalid font data: {0}")]
    Font(#[from] ab_glyph::InvalidFont),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
}

/// Export settings.
#[derive(Clone)]
pub struct ExportOptions {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    /// Font for text, sticky note and rich note bodies. Text is skipped
    /// without one.
    pub font: Option<FontArc>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            width: EXPORT_WIDTH,
            height: EXPORT_HEIGHT,
            background: Color::WHITE,
            font: None,
        }
    }
}

impl ExportOptions {
    /// Load a TrueType/OpenType font from raw bytes.
    pub fn with_font_bytes(mut self, bytes: Vec<u8>) -> Result<Self, ExportError> {
        self.font = Some(FontArc::try_from_vec(bytes)?);
        Ok(self)
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }
}

/// Rasterize every element of `board` in storage order.
pub fn render_board(board: &Board, options: &ExportOptions) -> Result<Pixmap, ExportError> {
    let mut pixmap = Pixmap::new(options.width, options.height).ok_or(ExportError::InvalidSize {
        width: options.width,
        height: options.height,
    })?;

    let mut painter = Painter::new(&mut pixmap, Affine::IDENTITY, options.font.as_ref());
    painter.clear(options.background);
    for element in board.iter() {
        painter.draw_element(element);
    }
    Ok(pixmap)
}

/// Render `board` and encode it as PNG bytes.
pub fn export_png(board: &Board, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    let pixmap = render_board(board, options)?;
    let bytes = encode_png(&pixmap)?;
    log::info!(
        "Exported {} element(s) to a {}x{} PNG ({} bytes)",
        board.len(),
        pixmap.width(),
        pixmap.height(),
        bytes.len()
    );
    Ok(bytes)
}

/// Encode a pixmap as 8-bit RGBA PNG.
pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, ExportError> {
    // tiny-skia stores premultiplied alpha; PNG wants straight alpha
    let rgba: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, pixmap.width(), pixmap.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&rgba)?;
    }
    Ok(png_data)
}
