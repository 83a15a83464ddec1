//! CPU renderer producing frames into a tiny-skia pixmap.

use crate::export::ExportError;
use crate::paint::Painter;
use crate::renderer::{GridStyle, RenderContext, RenderResult, Renderer, RendererError};
use ab_glyph::FontArc;
use scribble_core::element::Color;
use tiny_skia::Pixmap;

/// Grid spacing in world units.
const GRID_SIZE: f64 = 20.0;
const GRID_COLOR: Color = Color::rgb(229, 231, 235);
const CURSOR_FALLBACK: Color = Color::rgb(107, 114, 128);

/// Software renderer. The last frame stays in [`pixmap`](Self::pixmap) for
/// the host to present.
pub struct SoftwareRenderer {
    pixmap: Option<Pixmap>,
    font: Option<FontArc>,
}

impl Default for SoftwareRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self { pixmap: None, font: None }
    }

    pub fn with_font_bytes(mut self, bytes: Vec<u8>) -> Result<Self, ExportError> {
        self.font = Some(FontArc::try_from_vec(bytes)?);
        Ok(self)
    }

    /// The most recent frame, if one was rendered.
    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    fn surface(&mut self, width: u32, height: u32) -> RenderResult<&mut Pixmap> {
        let reuse = self
            .pixmap
            .as_ref()
            .is_some_and(|p| p.width() == width && p.height() == height);
        if !reuse {
            let pixmap = Pixmap::new(width, height).ok_or(RendererError::InvalidSize { width, height })?;
            log::debug!("Allocated {width}x{height} frame");
            self.pixmap = Some(pixmap);
        }
        self.pixmap
            .as_mut()
            .ok_or_else(|| RendererError::RenderFailed("frame buffer missing".to_string()))
    }
}

impl Renderer for SoftwareRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        let width = ctx.viewport_size.width.round().max(0.0) as u32;
        let height = ctx.viewport_size.height.round().max(0.0) as u32;
        let background = self.background_color(ctx);
        let font = self.font.clone();
        let pixmap = self.surface(width, height)?;

        let canvas = ctx.canvas;
        let viewport = canvas.viewport;
        let mut painter = Painter::new(pixmap, viewport.transform(), font.as_ref());
        painter.clear(background);

        match ctx.grid_style {
            GridStyle::None => {}
            GridStyle::Lines | GridStyle::Dots => painter.draw_grid(
                viewport.visible_world_rect(ctx.viewport_size),
                GRID_SIZE,
                ctx.grid_style == GridStyle::Dots,
                GRID_COLOR,
            ),
        }

        for element in canvas.elements() {
            painter.draw_element(element);
            if element.selected {
                painter.draw_selection(element, ctx.selection_color);
            }
        }

        if let Some(preview) = canvas.preview() {
            painter.draw_element(preview);
        }

        if ctx.show_cursors {
            if let Some(collab) = canvas.collaboration() {
                let state = collab.state();
                // Cursors of members still present
                for (user_id, cursor) in state.cursors() {
                    let Some(member) = state.user(user_id) else {
                        continue;
                    };
                    let color = member.color.parse::<Color>().unwrap_or(CURSOR_FALLBACK);
                    painter.draw_cursor(viewport.world_to_screen(cursor.position), color, Some(&member.name));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Size};
    use scribble_core::collaboration::{CollaborationConfig, UserIdentity};
    use scribble_core::sync::{ChannelEvent, Member, ServerMessage, SyncEvent};
    use scribble_core::tools::ToolKind;
    use scribble_core::{Canvas, Viewport};

    fn pixel(renderer: &SoftwareRenderer, x: u32, y: u32) -> (u8, u8, u8) {
        let c = renderer.pixmap().unwrap().pixel(x, y).unwrap().demultiply();
        (c.red(), c.green(), c.blue())
    }

    #[test]
    fn test_empty_frame_is_background() {
        let canvas = Canvas::new(UserIdentity::new("me", "Me"));
        let ctx = RenderContext::new(&canvas, Size::new(64.0, 48.0)).with_grid(GridStyle::None);
        let mut renderer = SoftwareRenderer::new();
        renderer.build_scene(&ctx).unwrap();
        assert_eq!(renderer.pixmap().map(|p| (p.width(), p.height())), Some((64, 48)));
        assert_eq!(pixel(&renderer, 10, 10), (250, 250, 250));
    }

    #[test]
    fn test_frame_follows_viewport() {
        let mut canvas = Canvas::new(UserIdentity::new("me", "Me"));
        canvas.set_tool(ToolKind::StickyNote);
        canvas.pointer_down(Point::new(0.0, 0.0));
        canvas.pointer_up();
        canvas.viewport = Viewport::with_values(100.0, 100.0, 0.5);

        let ctx = RenderContext::new(&canvas, Size::new(300.0, 300.0)).with_grid(GridStyle::None);
        let mut renderer = SoftwareRenderer::new();
        renderer.build_scene(&ctx).unwrap();
        // 100x100 note at zoom 0.5 covers screen 100..150
        assert_eq!(pixel(&renderer, 125, 125), (0xfe, 0xf0, 0x8a));
        assert_eq!(pixel(&renderer, 175, 175), (250, 250, 250));
    }

    #[test]
    fn test_remote_cursor_drawn_in_member_color() {
        let mut canvas = Canvas::with_collaboration(CollaborationConfig::new("board", UserIdentity::new("me", "Me")));
        canvas.join();
        canvas.handle_sync_event(SyncEvent::Received(ServerMessage::Presence {
            members: vec![Member {
                id: "bob".into(),
                name: "Bob".into(),
                color: "#ff0000".into(),
            }],
        }));
        canvas.handle_sync_event(SyncEvent::Received(ServerMessage::Message {
            from: "bob".into(),
            event: ChannelEvent::CursorMove {
                user_id: "bob".into(),
                x: 20.0,
                y: 20.0,
                timestamp: 1,
            },
        }));

        let ctx = RenderContext::new(&canvas, Size::new(100.0, 100.0)).with_grid(GridStyle::None);
        let mut renderer = SoftwareRenderer::new();
        renderer.build_scene(&ctx).unwrap();
        assert_eq!(pixel(&renderer, 23, 30), (255, 0, 0));
    }

    #[test]
    fn test_cursor_of_departed_member_not_drawn() {
        let mut canvas = Canvas::with_collaboration(CollaborationConfig::new("board", UserIdentity::new("me", "Me")));
        canvas.join();
        let bob = Member {
            id: "bob".into(),
            name: "Bob".into(),
            color: "#ff0000".into(),
        };
        canvas.handle_sync_event(SyncEvent::Received(ServerMessage::Presence { members: vec![bob] }));
        canvas.handle_sync_event(SyncEvent::Received(ServerMessage::Message {
            from: "bob".into(),
            event: ChannelEvent::CursorMove {
                user_id: "bob".into(),
                x: 20.0,
                y: 20.0,
                timestamp: 1,
            },
        }));
        canvas.handle_sync_event(SyncEvent::Received(ServerMessage::Presence { members: vec![] }));

        let ctx = RenderContext::new(&canvas, Size::new(100.0, 100.0)).with_grid(GridStyle::None);
        let mut renderer = SoftwareRenderer::new();
        renderer.build_scene(&ctx).unwrap();
        assert_eq!(pixel(&renderer, 23, 30), (250, 250, 250));
    }

    #[test]
    fn test_zero_viewport_is_an_error() {
        let canvas = Canvas::new(UserIdentity::new("me", "Me"));
        let ctx = RenderContext::new(&canvas, Size::new(0.0, 10.0));
        assert!(SoftwareRenderer::new().build_scene(&ctx).is_err());
    }
}
