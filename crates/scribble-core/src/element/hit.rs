//! Point-in-element tests used for selection.
//!
//! Only boxed shapes are selectable. Freehand paths, lines, arrows and plain
//! text never report a hit, so clicking on them with the select tool starts a
//! pan instead.

use super::{BoxSize, Element, ElementKind};
use kurbo::Point;

/// Whether `point` (world coordinates) lies inside `element`.
///
/// Rectangles and notes use inclusive axis-aligned containment on the raw
/// box. A box with negative width or height contains nothing; normalize the
/// element first if that matters. Circles use the distance from the box
/// center against `min(width, height) / 2`.
pub fn point_in_element(point: Point, element: &Element) -> bool {
    match &element.kind {
        ElementKind::Rectangle { size }
        | ElementKind::StickyNote { size, .. }
        | ElementKind::RichNote { size, .. } => point_in_box(point, element.origin, *size),
        ElementKind::Circle { size } => point_in_circle(point, element.origin, *size),
        ElementKind::FreehandPath { .. }
        | ElementKind::Line { .. }
        | ElementKind::Arrow { .. }
        | ElementKind::Text { .. } => false,
    }
}

fn point_in_box(point: Point, origin: Point, size: BoxSize) -> bool {
    origin.x <= point.x
        && point.x <= origin.x + size.width
        && origin.y <= point.y
        && point.y <= origin.y + size.height
}

fn point_in_circle(point: Point, origin: Point, size: BoxSize) -> bool {
    let center = Point::new(origin.x + size.width / 2.0, origin.y + size.height / 2.0);
    let radius = size.width.min(size.height) / 2.0;
    point.distance(center) <= radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Color, ElementStyle};

    fn element(origin: Point, kind: ElementKind) -> Element {
        Element::new(origin, kind, ElementStyle::stroke(Color::BLACK, 2.0))
    }

    #[test]
    fn test_rectangle_containment() {
        let rect = element(Point::new(10.0, 10.0), ElementKind::Rectangle { size: BoxSize::new(100.0, 50.0) });
        assert!(point_in_element(Point::new(50.0, 30.0), &rect));
        assert!(point_in_element(Point::new(10.0, 10.0), &rect));
        assert!(point_in_element(Point::new(110.0, 60.0), &rect));
        assert!(!point_in_element(Point::new(111.0, 30.0), &rect));
        assert!(!point_in_element(Point::new(50.0, 9.0), &rect));
    }

    #[test]
    fn test_inverted_box_never_contains() {
        let rect = element(Point::new(100.0, 100.0), ElementKind::Rectangle { size: BoxSize::new(-50.0, -50.0) });
        assert!(!point_in_element(Point::new(75.0, 75.0), &rect));

        let mut normalized = rect.clone();
        normalized.normalize();
        assert!(point_in_element(Point::new(75.0, 75.0), &normalized));
    }

    #[test]
    fn test_circle_radius_boundary() {
        let circle = element(Point::new(40.0, 40.0), ElementKind::Circle { size: BoxSize::new(20.0, 20.0) });
        assert!(point_in_element(Point::new(50.0, 59.0), &circle));
        assert!(point_in_element(Point::new(50.0, 50.0), &circle));
        assert!(!point_in_element(Point::new(50.0, 61.0), &circle));
    }

    #[test]
    fn test_circle_uses_smaller_side() {
        let circle = element(Point::ZERO, ElementKind::Circle { size: BoxSize::new(100.0, 20.0) });
        assert!(point_in_element(Point::new(50.0, 10.0), &circle));
        assert!(!point_in_element(Point::new(75.0, 10.0), &circle));
    }

    #[test]
    fn test_sticky_note_is_boxed() {
        let note = Element::create(
            crate::element::ElementType::StickyNote,
            Point::new(0.0, 0.0),
            ElementStyle::default(),
            "u",
        );
        assert!(point_in_element(Point::new(99.0, 99.0), &note));
        assert!(!point_in_element(Point::new(101.0, 50.0), &note));
    }

    #[test]
    fn test_unselectable_kinds() {
        let origin = Point::new(0.0, 0.0);
        let on_it = Point::new(5.0, 5.0);
        let kinds = [
            ElementKind::FreehandPath { points: vec![origin, Point::new(10.0, 10.0)] },
            ElementKind::Line { size: BoxSize::new(10.0, 10.0) },
            ElementKind::Arrow { size: BoxSize::new(10.0, 10.0) },
            ElementKind::Text { text: "Text".into(), size: BoxSize::new(10.0, 10.0) },
        ];
        for kind in kinds {
            assert!(!point_in_element(on_it, &element(origin, kind)));
        }
    }
}
