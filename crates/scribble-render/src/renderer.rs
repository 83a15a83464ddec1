//! Renderer trait abstraction.

use kurbo::Size;
use scribble_core::canvas::Canvas;
use scribble_core::element::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("Render failed: {0}")]
    RenderFailed(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Grid display style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridStyle {
    /// Plain background.
    None,
    #[default]
    Lines,
    Dots,
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The canvas to render.
    pub canvas: &'a Canvas,
    /// Viewport size in physical pixels.
    pub viewport_size: Size,
    pub background_color: Color,
    pub grid_style: GridStyle,
    /// Selection highlight color.
    pub selection_color: Color,
    /// Draw other users' cursors.
    pub show_cursors: bool,
}

impl<'a> RenderContext<'a> {
    pub fn new(canvas: &'a Canvas, viewport_size: Size) -> Self {
        Self {
            canvas,
            viewport_size,
            background_color: Color::rgb(250, 250, 250),
            grid_style: GridStyle::Lines,
            selection_color: Color::rgb(59, 130, 246),
            show_cursors: true,
        }
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_grid(mut self, style: GridStyle) -> Self {
        self.grid_style = style;
        self
    }

    pub fn with_cursors(mut self, show: bool) -> Self {
        self.show_cursors = show;
        self
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Draw a complete frame for `ctx`.
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
