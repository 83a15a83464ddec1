//! Frame scheduling: redraw whenever the canvas changes.

use crate::renderer::{RenderContext, RenderResult, Renderer};
use kurbo::Size;
use scribble_core::canvas::Canvas;

/// Tracks what the last frame showed and decides when a new one is due.
///
/// Every state change on the canvas (elements, viewport, selection, draw
/// preview, remote cursors, presence) bumps its revision, so comparing
/// revisions is enough to know a redraw is needed.
#[derive(Debug, Clone, Default)]
pub struct RenderLoop {
    last_revision: Option<u64>,
    last_size: Option<Size>,
    frames: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needs_redraw(&self, canvas: &Canvas, size: Size) -> bool {
        self.last_revision != Some(canvas.revision()) || self.last_size != Some(size)
    }

    /// Force the next [`frame`](Self::frame) to draw.
    pub fn invalidate(&mut self) {
        self.last_revision = None;
    }

    /// Draw a frame if anything changed. Returns whether one was drawn.
    pub fn frame<R: Renderer + ?Sized>(&mut self, renderer: &mut R, ctx: &RenderContext) -> RenderResult<bool> {
        if !self.needs_redraw(ctx.canvas, ctx.viewport_size) {
            return Ok(false);
        }
        renderer.build_scene(ctx)?;
        self.last_revision = Some(ctx.canvas.revision());
        self.last_size = Some(ctx.viewport_size);
        self.frames += 1;
        Ok(true)
    }

    /// Number of frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
