//! Viewport module for pan/zoom transforms.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest zoom factor the viewport accepts.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom factor the viewport accepts.
pub const MAX_ZOOM: f64 = 5.0;

/// Zoom multiplier applied for one wheel notch scrolling down (zoom out).
pub const WHEEL_ZOOM_OUT: f64 = 0.9;
/// Zoom multiplier applied for one wheel notch scrolling up (zoom in).
pub const WHEEL_ZOOM_IN: f64 = 1.1;

/// Viewport manages the view transform for the canvas.
///
/// `offset` is the world-to-screen translation in screen pixels and `zoom`
/// the scale factor, so a world point `w` lands on screen at
/// `w * zoom + offset`. Zoom is kept inside `[MIN_ZOOM, MAX_ZOOM]` by every
/// mutating method, which also guarantees it never reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Current translation offset (pan), in screen pixels.
    pub offset: Vec2,
    /// Current zoom level.
    zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Create a new viewport at the origin with zoom 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a viewport from explicit values, clamping the zoom.
    pub fn with_values(x: f64, y: f64, zoom: f64) -> Self {
        Self {
            offset: Vec2::new(x, y),
            zoom: clamp_zoom(zoom),
        }
    }

    /// Current zoom factor.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom factor directly (clamped), leaving the offset untouched.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = clamp_zoom(zoom);
    }

    /// Get the affine transform for rendering (world to screen).
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        Point::new(
            (screen_point.x - self.offset.x) / self.zoom,
            (screen_point.y - self.offset.y) / self.zoom,
        )
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        Point::new(
            world_point.x * self.zoom + self.offset.x,
            world_point.y * self.zoom + self.offset.y,
        )
    }

    /// Pan the viewport by a delta in screen coordinates.
    ///
    /// The delta is applied as-is; it is not divided by the zoom.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom the viewport, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = clamp_zoom(self.zoom * factor);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let world_point = self.screen_to_world(screen_point);
        self.zoom = new_zoom;

        // Re-anchor so world_point stays under screen_point
        let new_screen = self.world_to_screen(world_point);
        self.offset += Vec2::new(screen_point.x - new_screen.x, screen_point.y - new_screen.y);
    }

    /// Apply one wheel event at the cursor position.
    ///
    /// Positive `delta_y` (scrolling down) zooms out, anything else zooms in.
    pub fn wheel(&mut self, screen_point: Point, delta_y: f64) {
        let factor = if delta_y > 0.0 {
            WHEEL_ZOOM_OUT
        } else {
            WHEEL_ZOOM_IN
        };
        self.zoom_at(screen_point, factor);
    }

    /// Reset viewport to default position and zoom.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The world-space rectangle currently visible in a screen of `size`.
    pub fn visible_world_rect(&self, size: Size) -> Rect {
        let top_left = self.screen_to_world(Point::ZERO);
        let bottom_right = self.screen_to_world(Point::new(size.width, size.height));
        Rect::from_points(top_left, bottom_right)
    }

    /// Fit the viewport to show the given bounding box.
    pub fn fit_to_bounds(&mut self, bounds: Rect, screen: Size, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }

        let padded = Size::new(
            (screen.width - padding * 2.0).max(1.0),
            (screen.height - padding * 2.0).max(1.0),
        );

        let scale_x = padded.width / bounds.width();
        let scale_y = padded.height / bounds.height();
        self.zoom = clamp_zoom(scale_x.min(scale_y));

        let bounds_center = bounds.center();
        self.offset = Vec2::new(
            screen.width / 2.0 - bounds_center.x * self.zoom,
            screen.height / 2.0 - bounds_center.y * self.zoom,
        );
    }
}

fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return 1.0;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}
