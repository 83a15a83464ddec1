//! Tool system for the whiteboard.

use crate::element::{Color, ElementStyle, ElementType};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    /// Select elements; dragging on empty canvas pans.
    #[default]
    Select,
    Pen,
    Rectangle,
    Circle,
    Arrow,
    Line,
    Text,
    StickyNote,
    RichNote,
}

impl ToolKind {
    /// The element type this tool draws, `None` for the select tool.
    pub fn element_type(self) -> Option<ElementType> {
        match self {
            ToolKind::Select => None,
            ToolKind::Pen => Some(ElementType::FreehandPath),
            ToolKind::Rectangle => Some(ElementType::Rectangle),
            ToolKind::Circle => Some(ElementType::Circle),
            ToolKind::Arrow => Some(ElementType::Arrow),
            ToolKind::Line => Some(ElementType::Line),
            ToolKind::Text => Some(ElementType::Text),
            ToolKind::StickyNote => Some(ElementType::StickyNote),
            ToolKind::RichNote => Some(ElementType::RichNote),
        }
    }
}

/// Manages the current tool and the style applied to new elements.
#[derive(Debug, Clone)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Stroke color and width for new elements. Fill is chosen per kind.
    stroke_color: Color,
    stroke_width: f64,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolManager {
    /// Create a tool manager with the select tool and a 2px black stroke.
    pub fn new() -> Self {
        Self {
            current_tool: ToolKind::Select,
            stroke_color: Color::BLACK,
            stroke_width: ElementStyle::DEFAULT_STROKE_WIDTH,
        }
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.current_tool = tool;
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.stroke_color = color;
    }

    /// Set the stroke width for new elements. Non-positive widths are ignored.
    pub fn set_stroke_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.stroke_width = width;
        } else {
            log::debug!("Ignoring invalid stroke width {width}");
        }
    }

    pub fn stroke_color(&self) -> Color {
        self.stroke_color
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    /// Style for the next element drawn.
    pub fn active_style(&self) -> ElementStyle {
        ElementStyle::stroke(self.stroke_color, self.stroke_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_selection() {
        let mut tm = ToolManager::new();
        assert_eq!(tm.current_tool, ToolKind::Select);
        assert_eq!(tm.current_tool.element_type(), None);

        tm.set_tool(ToolKind::Rectangle);
        assert_eq!(tm.current_tool.element_type(), Some(ElementType::Rectangle));
    }

    #[test]
    fn test_every_drawing_tool_maps_to_a_type() {
        let drawing = [
            ToolKind::Pen,
            ToolKind::Rectangle,
            ToolKind::Circle,
            ToolKind::Arrow,
            ToolKind::Line,
            ToolKind::Text,
            ToolKind::StickyNote,
            ToolKind::RichNote,
        ];
        let types: Vec<_> = drawing.iter().filter_map(|t| t.element_type()).collect();
        assert_eq!(types, ElementType::ALL.to_vec());
    }

    #[test]
    fn test_active_style() {
        let mut tm = ToolManager::new();
        tm.set_stroke_color("#ff0000".parse().unwrap());
        tm.set_stroke_width(4.0);
        tm.set_stroke_width(-1.0);
        let style = tm.active_style();
        assert_eq!(style.stroke_color, Color::rgb(255, 0, 0));
        assert!((style.stroke_width - 4.0).abs() < f64::EPSILON);
        assert_eq!(style.fill_color, None);
    }
}
