//! Per-kind element drawing onto a tiny-skia pixmap.
//!
//! The same routine backs on-screen frames and PNG export; only the
//! transform differs (viewport transform vs. identity).

use crate::text;
use ab_glyph::FontArc;
use kurbo::{Affine, BezPath, Circle, PathEl, Point, Rect, Shape, Vec2};
use scribble_core::element::{BoxSize, Color, Element, ElementKind, ElementStyle};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Stroke, StrokeDash, Transform};

/// Flattening tolerance for curved shapes, in world units.
const TOLERANCE: f64 = 0.1;
/// Arrow head length, in world units.
const ARROW_HEAD_LENGTH: f64 = 14.0;
const ARROW_HEAD_ANGLE: f64 = std::f64::consts::PI / 7.0;
/// Font size for text elements, in world units.
pub const TEXT_FONT_SIZE: f64 = 20.0;
/// Font size for note bodies, in world units.
pub const NOTE_FONT_SIZE: f64 = 14.0;
const NOTE_PADDING: f64 = 8.0;
const SELECTION_OUTSET: f64 = 4.0;
const COMMENT_BADGE_RADIUS: f64 = 7.0;

pub(crate) fn skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

pub(crate) fn skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

/// Convert a kurbo path. Returns `None` for paths with no drawable segment.
pub(crate) fn skia_path(path: &BezPath) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => pb.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32),
            PathEl::CurveTo(p1, p2, p3) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

/// Draws elements and overlays onto a pixmap under one transform.
pub struct Painter<'a> {
    pixmap: &'a mut Pixmap,
    transform: Affine,
    font: Option<&'a FontArc>,
}

impl<'a> Painter<'a> {
    pub fn new(pixmap: &'a mut Pixmap, transform: Affine, font: Option<&'a FontArc>) -> Self {
        Self {
            pixmap,
            transform,
            font,
        }
    }

    pub fn clear(&mut self, color: Color) {
        self.pixmap.fill(skia_color(color));
    }

    /// Draw one element in world coordinates.
    pub fn draw_element(&mut self, element: &Element) {
        let style = &element.style;
        let origin = element.origin;
        match &element.kind {
            ElementKind::FreehandPath { points } => self.draw_freehand(points, style),
            // Zero-area boxes and zero-length segments draw nothing; a round
            // cap would otherwise leave a dot.
            ElementKind::Rectangle { size } => {
                let rect = size.raw_rect(origin).abs();
                if rect.area() > 0.0 {
                    self.draw_shape(&rect.to_path(TOLERANCE), style);
                }
            }
            ElementKind::Circle { size } => {
                let rect = size.raw_rect(origin).abs();
                let radius = rect.width().min(rect.height()) / 2.0;
                if radius > 0.0 {
                    self.draw_shape(&Circle::new(rect.center(), radius).to_path(TOLERANCE), style);
                }
            }
            ElementKind::Line { size } => {
                if let Some(end) = segment_end(origin, *size) {
                    self.stroke(&line_path(origin, end), style);
                }
            }
            ElementKind::Arrow { size } => {
                if let Some(end) = segment_end(origin, *size) {
                    self.stroke(&arrow_path(origin, end), style);
                }
            }
            ElementKind::Text { text, .. } => {
                self.draw_text(text, origin, TEXT_FONT_SIZE, style.stroke_color);
            }
            ElementKind::StickyNote { text, size } => {
                let rect = size.raw_rect(origin).abs();
                self.draw_shape(&rect.to_path(TOLERANCE), style);
                self.draw_text(text, padded(rect), NOTE_FONT_SIZE, style.stroke_color);
            }
            ElementKind::RichNote { size, note } => {
                let rect = size.raw_rect(origin).abs();
                self.draw_shape(&rect.to_path(TOLERANCE), style);
                self.draw_text(&text::plain_text(&note.content), padded(rect), NOTE_FONT_SIZE, style.stroke_color);
                if note.open_comments() > 0 {
                    let badge = Circle::new(Point::new(rect.x1, rect.y0), COMMENT_BADGE_RADIUS);
                    self.fill(&badge.to_path(TOLERANCE), Color::rgb(239, 68, 68));
                }
            }
        }
    }

    /// Dashed outline around an element's bounds.
    pub fn draw_selection(&mut self, element: &Element, color: Color) {
        let Some(path) = skia_path(&element.bounds().inflate(SELECTION_OUTSET, SELECTION_OUTSET).to_path(TOLERANCE))
        else {
            return;
        };
        let stroke = Stroke {
            width: (1.5 / self.scale()) as f32,
            dash: StrokeDash::new(vec![4.0, 4.0], 0.0),
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &solid(color), &stroke, skia_transform(self.transform), None);
    }

    /// Remote cursor arrow at a screen position, with an optional name label.
    /// Always drawn in screen space regardless of the painter transform.
    pub fn draw_cursor(&mut self, screen: Point, color: Color, label: Option<&str>) {
        let mut path = BezPath::new();
        path.move_to(screen);
        path.line_to(Point::new(screen.x, screen.y + 18.0));
        path.line_to(Point::new(screen.x + 14.0, screen.y + 14.0));
        path.close_path();
        let Some(path) = skia_path(&path) else { return };

        self.pixmap
            .fill_path(&path, &solid(color), FillRule::Winding, Transform::identity(), None);
        let outline = Stroke {
            width: 1.5,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &solid(Color::WHITE), &outline, Transform::identity(), None);

        if let (Some(label), Some(font)) = (label, self.font) {
            text::draw_text(self.pixmap, font, label, screen + Vec2::new(16.0, 18.0), 12.0, color, Transform::identity());
        }
    }

    /// Grid lines or dots covering the visible area.
    pub fn draw_grid(&mut self, visible: Rect, spacing: f64, dots: bool, color: Color) {
        if spacing <= 0.0 {
            return;
        }
        let x0 = (visible.x0 / spacing).floor() as i64;
        let x1 = (visible.x1 / spacing).ceil() as i64;
        let y0 = (visible.y0 / spacing).floor() as i64;
        let y1 = (visible.y1 / spacing).ceil() as i64;
        // Dense grids at low zoom are noise
        if (x1 - x0) * (y1 - y0) > 40_000 {
            return;
        }

        let mut path = BezPath::new();
        if dots {
            for i in x0..=x1 {
                for j in y0..=y1 {
                    let c = Circle::new(Point::new(i as f64 * spacing, j as f64 * spacing), 1.0);
                    path.extend(c.path_elements(TOLERANCE));
                }
            }
            if let Some(path) = skia_path(&path) {
                self.pixmap
                    .fill_path(&path, &solid(color), FillRule::Winding, skia_transform(self.transform), None);
            }
        } else {
            for i in x0..=x1 {
                let x = i as f64 * spacing;
                path.move_to(Point::new(x, visible.y0));
                path.line_to(Point::new(x, visible.y1));
            }
            for j in y0..=y1 {
                let y = j as f64 * spacing;
                path.move_to(Point::new(visible.x0, y));
                path.line_to(Point::new(visible.x1, y));
            }
            let style = ElementStyle::stroke(color, 1.0 / self.scale());
            self.stroke(&path, &style);
        }
    }

    /// Uniform scale of the painter transform.
    fn scale(&self) -> f64 {
        self.transform.as_coeffs()[0].abs().max(f64::EPSILON)
    }

    fn draw_freehand(&mut self, points: &[Point], style: &ElementStyle) {
        match points {
            [] => {}
            [single] => {
                let dot = Circle::new(*single, style.stroke_width / 2.0);
                self.fill(&dot.to_path(TOLERANCE), style.stroke_color);
            }
            [first, rest @ ..] => {
                let mut path = BezPath::new();
                path.move_to(*first);
                for p in rest {
                    path.line_to(*p);
                }
                self.stroke(&path, style);
            }
        }
    }

    fn draw_shape(&mut self, path: &BezPath, style: &ElementStyle) {
        if let Some(fill) = style.fill_color {
            self.fill(path, fill);
        }
        self.stroke(path, style);
    }

    fn fill(&mut self, path: &BezPath, color: Color) {
        if let Some(path) = skia_path(path) {
            self.pixmap
                .fill_path(&path, &solid(color), FillRule::Winding, skia_transform(self.transform), None);
        }
    }

    fn stroke(&mut self, path: &BezPath, style: &ElementStyle) {
        let Some(path) = skia_path(path) else { return };
        let stroke = Stroke {
            width: style.stroke_width as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &path,
            &solid(style.stroke_color),
            &stroke,
            skia_transform(self.transform),
            None,
        );
    }

    fn draw_text(&mut self, content: &str, at: Point, size: f64, color: Color) {
        match self.font {
            Some(font) => text::draw_text(self.pixmap, font, content, at, size, color, skia_transform(self.transform)),
            None => text::warn_missing_font(),
        }
    }
}

fn padded(rect: Rect) -> Point {
    Point::new(rect.x0 + NOTE_PADDING, rect.y0 + NOTE_PADDING)
}

/// End point of a line or arrow, `None` when it has no length.
fn segment_end(origin: Point, size: BoxSize) -> Option<Point> {
    let delta = Vec2::new(size.width, size.height);
    (delta.hypot() > f64::EPSILON).then(|| origin + delta)
}

fn line_path(start: Point, end: Point) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(start);
    path.line_to(end);
    path
}

fn arrow_path(start: Point, end: Point) -> BezPath {
    let mut path = line_path(start, end);
    let dir = end - start;
    if dir.hypot() < f64::EPSILON {
        return path;
    }
    let back = -dir.normalize() * ARROW_HEAD_LENGTH;
    for angle in [ARROW_HEAD_ANGLE, -ARROW_HEAD_ANGLE] {
        path.move_to(end);
        let (sin, cos) = angle.sin_cos();
        path.line_to(end + Vec2::new(back.x * cos - back.y * sin, back.x * sin + back.y * cos));
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribble_core::element::{BoxSize, ElementType};

    fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> (u8, u8, u8, u8) {
        let c = pixmap.pixel(x, y).unwrap().demultiply();
        (c.red(), c.green(), c.blue(), c.alpha())
    }

    fn white_pixmap() -> Pixmap {
        let mut pixmap = Pixmap::new(200, 200).unwrap();
        Painter::new(&mut pixmap, Affine::IDENTITY, None).clear(Color::WHITE);
        pixmap
    }

    #[test]
    fn test_transform_conversion() {
        let t = skia_transform(Affine::translate((5.0, 6.0)) * Affine::scale(2.0));
        assert_eq!((t.sx, t.sy, t.tx, t.ty), (2.0, 2.0, 5.0, 6.0));
    }

    #[test]
    fn test_degenerate_path_is_none() {
        assert!(skia_path(&BezPath::new()).is_none());
    }

    #[test]
    fn test_filled_sticky_note() {
        let mut pixmap = white_pixmap();
        let note = Element::create(ElementType::StickyNote, Point::new(10.0, 10.0), ElementStyle::default(), "me");
        Painter::new(&mut pixmap, Affine::IDENTITY, None).draw_element(&note);
        assert_eq!(pixel(&pixmap, 60, 60), (0xfe, 0xf0, 0x8a, 255));
        assert_eq!(pixel(&pixmap, 150, 150), (255, 255, 255, 255));
    }

    #[test]
    fn test_circle_uses_min_side() {
        let mut pixmap = white_pixmap();
        let circle = Element::new(
            Point::new(0.0, 0.0),
            ElementKind::Circle { size: BoxSize::new(100.0, 40.0) },
            ElementStyle::default().with_fill(Color::BLACK),
        );
        Painter::new(&mut pixmap, Affine::IDENTITY, None).draw_element(&circle);
        assert_eq!(pixel(&pixmap, 50, 20), (0, 0, 0, 255));
        // Inside the box but outside the 20px radius
        assert_eq!(pixel(&pixmap, 10, 20), (255, 255, 255, 255));
    }

    #[test]
    fn test_viewport_transform_applies() {
        let mut pixmap = white_pixmap();
        let rect = Element::new(
            Point::new(0.0, 0.0),
            ElementKind::Rectangle { size: BoxSize::new(10.0, 10.0) },
            ElementStyle::default().with_fill(Color::BLACK),
        );
        let transform = Affine::translate((100.0, 100.0)) * Affine::scale(2.0);
        Painter::new(&mut pixmap, transform, None).draw_element(&rect);
        assert_eq!(pixel(&pixmap, 110, 110), (0, 0, 0, 255));
        assert_eq!(pixel(&pixmap, 5, 5), (255, 255, 255, 255));
    }

    #[test]
    fn test_click_without_drag_leaves_no_mark() {
        let mut pixmap = white_pixmap();
        let mut painter = Painter::new(&mut pixmap, Affine::IDENTITY, None);
        let tools = [ElementType::Rectangle, ElementType::Circle, ElementType::Line, ElementType::Arrow];
        for (i, ty) in tools.into_iter().enumerate() {
            let at = Point::new(20.0 + 40.0 * i as f64, 50.0);
            painter.draw_element(&Element::create(ty, at, ElementStyle::stroke(Color::BLACK, 6.0), "me"));
        }
        for i in 0..4 {
            assert_eq!(pixel(&pixmap, 20 + 40 * i, 50), (255, 255, 255, 255));
        }
    }

    #[test]
    fn test_flat_rectangle_draws_nothing() {
        let mut pixmap = white_pixmap();
        let flat = Element::new(
            Point::new(10.0, 100.0),
            ElementKind::Rectangle { size: BoxSize::new(150.0, 0.0) },
            ElementStyle::stroke(Color::BLACK, 4.0),
        );
        Painter::new(&mut pixmap, Affine::IDENTITY, None).draw_element(&flat);
        assert_eq!(pixel(&pixmap, 80, 100), (255, 255, 255, 255));
    }

    #[test]
    fn test_line_with_length_is_drawn() {
        let mut pixmap = white_pixmap();
        let line = Element::new(
            Point::new(10.0, 100.0),
            ElementKind::Line { size: BoxSize::new(150.0, 0.0) },
            ElementStyle::stroke(Color::BLACK, 4.0),
        );
        Painter::new(&mut pixmap, Affine::IDENTITY, None).draw_element(&line);
        assert_eq!(pixel(&pixmap, 80, 100), (0, 0, 0, 255));
    }

    #[test]
    fn test_arrow_head_skipped_when_degenerate() {
        let path = arrow_path(Point::ZERO, Point::ZERO);
        assert_eq!(path.elements().len(), 2);
        let path = arrow_path(Point::ZERO, Point::new(50.0, 0.0));
        assert_eq!(path.elements().len(), 6);
    }
}
