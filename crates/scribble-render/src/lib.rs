//! Scribble Render Library
//!
//! Software rendering for Scribble boards: on-screen frames driven by a
//! revision-based render loop, and PNG export of the whole board. Both go
//! through the same per-kind drawing routine in [`Painter`].

mod export;
mod paint;
mod render_loop;
mod renderer;
mod software;
mod text;

pub use export::{EXPORT_HEIGHT, EXPORT_WIDTH, ExportError, ExportOptions, encode_png, export_png, render_board};
pub use paint::{NOTE_FONT_SIZE, Painter, TEXT_FONT_SIZE};
pub use render_loop::RenderLoop;
pub use renderer::{GridStyle, RenderContext, RenderResult, Renderer, RendererError};
pub use software::SoftwareRenderer;
pub use text::plain_text;
