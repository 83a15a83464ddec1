//! Element definitions for the whiteboard.
//!
//! Every drawable unit is an [`Element`]: an immutable id, an origin in world
//! space, a style, and an [`ElementKind`] carrying the payload specific to its
//! kind. Kind-specific behavior is always an exhaustive `match` on
//! `ElementKind`, so adding a kind is a compile error everywhere it matters.

pub mod hit;
mod path;
mod rich_note;
mod style;

pub use path::simplify_path;
pub use rich_note::{Comment, CommentError, CommentId, RichNote};
pub use style::{Color, ColorParseError, ElementStyle};

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for elements.
pub type ElementId = Uuid;

/// Placeholder text for new text elements.
pub const TEXT_PLACEHOLDER: &str = "Text";
/// Placeholder text for new sticky notes.
pub const STICKY_NOTE_PLACEHOLDER: &str = "Note";
/// Edge length of a new sticky note.
pub const STICKY_NOTE_SIZE: f64 = 100.0;
/// Size of a new rich note.
pub const RICH_NOTE_SIZE: Size = Size::new(200.0, 150.0);

/// Bounding box extent. Either side may be negative while a drag is in
/// progress (the box grows up or left of its origin).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxSize {
    pub width: f64,
    pub height: f64,
}

impl BoxSize {
    pub const ZERO: BoxSize = BoxSize::new(0.0, 0.0);

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Box spanning from `origin` to `corner`, keeping the sign of each side.
    pub fn spanning(origin: Point, corner: Point) -> Self {
        Self::new(corner.x - origin.x, corner.y - origin.y)
    }

    /// Rectangle anchored at `origin`. Inverted sides are kept as-is, so the
    /// result may have `x1 < x0` or `y1 < y0`.
    pub fn raw_rect(&self, origin: Point) -> Rect {
        Rect::new(origin.x, origin.y, origin.x + self.width, origin.y + self.height)
    }
}

/// Fieldless tag for each element kind, used by tools and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementType {
    FreehandPath,
    Rectangle,
    Circle,
    Arrow,
    Line,
    Text,
    StickyNote,
    RichNote,
}

impl ElementType {
    /// All element types, in toolbar order.
    pub const ALL: [ElementType; 8] = [
        ElementType::FreehandPath,
        ElementType::Rectangle,
        ElementType::Circle,
        ElementType::Arrow,
        ElementType::Line,
        ElementType::Text,
        ElementType::StickyNote,
        ElementType::RichNote,
    ];

    /// Wire name of this type.
    pub fn name(self) -> &'static str {
        match self {
            ElementType::FreehandPath => "freehand-path",
            ElementType::Rectangle => "rectangle",
            ElementType::Circle => "circle",
            ElementType::Arrow => "arrow",
            ElementType::Line => "line",
            ElementType::Text => "text",
            ElementType::StickyNote => "sticky-note",
            ElementType::RichNote => "rich-note",
        }
    }
}

/// Kind-specific payload of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ElementKind {
    /// Freehand stroke; points are absolute world coordinates.
    FreehandPath { points: Vec<Point> },
    Rectangle { size: BoxSize },
    /// Circle inscribed in its box: radius is `min(|w|, |h|) / 2`.
    Circle { size: BoxSize },
    /// Arrow from the origin to `origin + size`.
    Arrow { size: BoxSize },
    /// Line from the origin to `origin + size`.
    Line { size: BoxSize },
    Text { text: String, size: BoxSize },
    StickyNote { text: String, size: BoxSize },
    RichNote { size: BoxSize, note: RichNote },
}

impl ElementKind {
    /// The fieldless tag for this kind.
    pub fn element_type(&self) -> ElementType {
        match self {
            ElementKind::FreehandPath { .. } => ElementType::FreehandPath,
            ElementKind::Rectangle { .. } => ElementType::Rectangle,
            ElementKind::Circle { .. } => ElementType::Circle,
            ElementKind::Arrow { .. } => ElementType::Arrow,
            ElementKind::Line { .. } => ElementType::Line,
            ElementKind::Text { .. } => ElementType::Text,
            ElementKind::StickyNote { .. } => ElementType::StickyNote,
            ElementKind::RichNote { .. } => ElementType::RichNote,
        }
    }

    /// Bounding box extent, `None` for freehand paths.
    pub fn size(&self) -> Option<BoxSize> {
        match self {
            ElementKind::FreehandPath { .. } => None,
            ElementKind::Rectangle { size }
            | ElementKind::Circle { size }
            | ElementKind::Arrow { size }
            | ElementKind::Line { size }
            | ElementKind::Text { size, .. }
            | ElementKind::StickyNote { size, .. }
            | ElementKind::RichNote { size, .. } => Some(*size),
        }
    }

    /// Mutable bounding box extent, `None` for freehand paths.
    pub fn size_mut(&mut self) -> Option<&mut BoxSize> {
        match self {
            ElementKind::FreehandPath { .. } => None,
            ElementKind::Rectangle { size }
            | ElementKind::Circle { size }
            | ElementKind::Arrow { size }
            | ElementKind::Line { size }
            | ElementKind::Text { size, .. }
            | ElementKind::StickyNote { size, .. }
            | ElementKind::RichNote { size, .. } => Some(size),
        }
    }

    /// Text content, for kinds that carry any.
    pub fn text(&self) -> Option<&str> {
        match self {
            ElementKind::Text { text, .. } | ElementKind::StickyNote { text, .. } => Some(text),
            ElementKind::RichNote { note, .. } => Some(&note.content),
            ElementKind::FreehandPath { .. }
            | ElementKind::Rectangle { .. }
            | ElementKind::Circle { .. }
            | ElementKind::Arrow { .. }
            | ElementKind::Line { .. } => None,
        }
    }

    /// Freehand points, `None` for other kinds.
    pub fn points(&self) -> Option<&[Point]> {
        match self {
            ElementKind::FreehandPath { points } => Some(points),
            _ => None,
        }
    }
}

/// A drawable unit on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    id: ElementId,
    /// Anchor point in world coordinates.
    pub origin: Point,
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(flatten)]
    pub style: ElementStyle,
    /// Transient UI flag; never serialized.
    #[serde(skip)]
    pub selected: bool,
}

impl Element {
    /// Create an element with a fresh id.
    pub fn new(origin: Point, kind: ElementKind, style: ElementStyle) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            kind,
            style,
            selected: false,
        }
    }

    /// Reconstruct an element with a known id (storage, tests).
    pub fn with_id(id: ElementId, origin: Point, kind: ElementKind, style: ElementStyle) -> Self {
        Self {
            id,
            origin,
            kind,
            style,
            selected: false,
        }
    }

    /// Create the initial element a tool produces at `origin`.
    ///
    /// Freehand paths start with the origin as their only point; text starts
    /// with placeholder text and a zero box; sticky notes are 100×100 with a
    /// fixed fill; rich notes get an empty note last edited by `author_id`;
    /// everything else is a zero-size box without fill.
    pub fn create(
        element_type: ElementType,
        origin: Point,
        style: ElementStyle,
        author_id: &str,
    ) -> Self {
        let (kind, style) = match element_type {
            ElementType::FreehandPath => (ElementKind::FreehandPath { points: vec![origin] }, style),
            ElementType::Rectangle => (ElementKind::Rectangle { size: BoxSize::ZERO }, style),
            ElementType::Circle => (ElementKind::Circle { size: BoxSize::ZERO }, style),
            ElementType::Arrow => (ElementKind::Arrow { size: BoxSize::ZERO }, style),
            ElementType::Line => (ElementKind::Line { size: BoxSize::ZERO }, style),
            ElementType::Text => (
                ElementKind::Text {
                    text: TEXT_PLACEHOLDER.to_string(),
                    size: BoxSize::ZERO,
                },
                style,
            ),
            ElementType::StickyNote => (
                ElementKind::StickyNote {
                    text: STICKY_NOTE_PLACEHOLDER.to_string(),
                    size: BoxSize::new(STICKY_NOTE_SIZE, STICKY_NOTE_SIZE),
                },
                style.with_fill(Color::STICKY_YELLOW),
            ),
            ElementType::RichNote => (
                ElementKind::RichNote {
                    size: BoxSize::new(RICH_NOTE_SIZE.width, RICH_NOTE_SIZE.height),
                    note: RichNote::new(author_id),
                },
                style.with_fill(Color::NOTE_PAPER),
            ),
        };
        Self::new(origin, kind, style)
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn element_type(&self) -> ElementType {
        self.kind.element_type()
    }

    /// Apply a drag to `point` during an in-progress draw.
    ///
    /// Freehand paths append the point; rectangles, circles and lines take
    /// `point - origin` as their (signed) extent. Other kinds keep the size
    /// they were created with. Returns whether the element changed.
    pub fn drag_to(&mut self, point: Point) -> bool {
        match &mut self.kind {
            ElementKind::FreehandPath { points } => {
                points.push(point);
                true
            }
            ElementKind::Rectangle { size } | ElementKind::Circle { size } | ElementKind::Line { size } => {
                *size = BoxSize::spanning(self.origin, point);
                true
            }
            ElementKind::Arrow { .. }
            | ElementKind::Text { .. }
            | ElementKind::StickyNote { .. }
            | ElementKind::RichNote { .. } => false,
        }
    }

    /// Thin out a freehand path's points with [`simplify_path`]. Returns
    /// how many points were dropped; other kinds are left alone.
    pub fn simplify(&mut self, tolerance: f64) -> usize {
        let ElementKind::FreehandPath { points } = &mut self.kind else {
            return 0;
        };
        let before = points.len();
        *points = simplify_path(points, tolerance);
        before - points.len()
    }

    /// Flip inverted boxes so width and height are non-negative, moving the
    /// origin to the top-left corner. Lines and arrows are left alone since
    /// their origin is a meaningful endpoint.
    pub fn normalize(&mut self) {
        let flip = matches!(
            self.kind,
            ElementKind::Rectangle { .. }
                | ElementKind::Circle { .. }
                | ElementKind::Text { .. }
                | ElementKind::StickyNote { .. }
                | ElementKind::RichNote { .. }
        );
        if !flip {
            return;
        }
        if let Some(size) = self.kind.size_mut() {
            if size.width < 0.0 {
                self.origin.x += size.width;
                size.width = -size.width;
            }
            if size.height < 0.0 {
                self.origin.y += size.height;
                size.height = -size.height;
            }
        }
    }

    /// Normalized bounding box in world coordinates.
    pub fn bounds(&self) -> Rect {
        match &self.kind {
            ElementKind::FreehandPath { points } => {
                let mut iter = points.iter();
                let Some(first) = iter.next() else {
                    return Rect::from_origin_size(self.origin, (0.0, 0.0));
                };
                iter.fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
            }
            ElementKind::Rectangle { size }
            | ElementKind::Circle { size }
            | ElementKind::Arrow { size }
            | ElementKind::Line { size }
            | ElementKind::Text { size, .. }
            | ElementKind::StickyNote { size, .. }
            | ElementKind::RichNote { size, .. } => size.raw_rect(self.origin).abs(),
        }
    }

    /// The rich note payload, if this is a rich note.
    pub fn rich_note(&self) -> Option<&RichNote> {
        match &self.kind {
            ElementKind::RichNote { note, .. } => Some(note),
            _ => None,
        }
    }

    /// Mutable rich note payload, if this is a rich note.
    pub fn rich_note_mut(&mut self) -> Option<&mut RichNote> {
        match &mut self.kind {
            ElementKind::RichNote { note, .. } => Some(note),
            _ => None,
        }
    }
}
