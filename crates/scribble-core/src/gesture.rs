//! Pointer gesture state machine.
//!
//! A gesture runs from pointer-down to pointer-up. With the select tool a
//! press either selects the element under the pointer or starts panning the
//! viewport; with any other tool it starts drawing a new element that is
//! committed on release. The machine itself only tracks transient state and
//! reports what happened as a [`GestureEffect`]; the canvas applies effects
//! to the board, viewport, history and collaborators.

use crate::element::{Element, ElementId, ElementStyle, ElementType};
use kurbo::{Point, Vec2};

/// Transient state of an in-progress draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingState {
    /// Every world point seen during the gesture, starting with the press.
    pub current_path: Vec<Point>,
    /// The element being drawn, not yet part of the board.
    pub current_element: Element,
}

/// Gesture states.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum GestureState {
    #[default]
    Idle,
    /// Dragging the viewport; holds the screen position of the last event.
    Panning { last_screen: Point },
    Drawing(DrawingState),
}

/// What a pointer event did, for the owner of the board to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEffect {
    /// Nothing happened.
    None,
    /// Deselect everything, then select this element.
    Select(ElementId),
    /// Deselect everything; panning has begun.
    PanStarted,
    /// Pan the viewport by this screen-space delta.
    Pan(Vec2),
    /// A new element is being drawn.
    DrawStarted,
    /// The in-progress element changed.
    DrawUpdated,
    /// The gesture finished and this element should be committed.
    Commit(Element),
    /// The gesture was abandoned; this element is dropped.
    Discard(Element),
    /// A pan gesture finished.
    PanEnded,
}

/// Input to a pointer-down transition.
#[derive(Debug, Clone, Copy)]
pub struct PressContext<'a> {
    pub screen: Point,
    pub world: Point,
    /// Element type for the active tool, `None` for the select tool.
    pub tool: Option<ElementType>,
    /// First element in storage order under the pointer, when the select
    /// tool is active.
    pub hit: Option<ElementId>,
    pub style: &'a ElementStyle,
    /// Local user id, stamped on new rich notes.
    pub author_id: &'a str,
}

/// Drives [`GestureState`] transitions.
#[derive(Debug, Clone, Default)]
pub struct GestureMachine {
    state: GestureState,
}

impl GestureMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, GestureState::Idle)
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.state, GestureState::Panning { .. })
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, GestureState::Drawing(_))
    }

    /// The in-progress draw, if any.
    pub fn drawing_state(&self) -> Option<&DrawingState> {
        match &self.state {
            GestureState::Drawing(drawing) => Some(drawing),
            _ => None,
        }
    }

    /// The element being drawn, if any.
    pub fn preview(&self) -> Option<&Element> {
        self.drawing_state().map(|d| &d.current_element)
    }

    /// Pointer pressed. Ignored unless idle.
    pub fn pointer_down(&mut self, press: PressContext<'_>) -> GestureEffect {
        if !self.is_idle() {
            log::debug!("Ignoring pointer down during {:?}", self.state_name());
            return GestureEffect::None;
        }

        match press.tool {
            None => match press.hit {
                Some(id) => GestureEffect::Select(id),
                None => {
                    self.state = GestureState::Panning { last_screen: press.screen };
                    GestureEffect::PanStarted
                }
            },
            Some(element_type) => {
                let element = Element::create(element_type, press.world, press.style.clone(), press.author_id);
                self.state = GestureState::Drawing(DrawingState {
                    current_path: vec![press.world],
                    current_element: element,
                });
                GestureEffect::DrawStarted
            }
        }
    }

    /// Pointer moved.
    pub fn pointer_move(&mut self, screen: Point, world: Point) -> GestureEffect {
        match &mut self.state {
            GestureState::Idle => GestureEffect::None,
            GestureState::Panning { last_screen } => {
                let delta = screen - *last_screen;
                *last_screen = screen;
                GestureEffect::Pan(delta)
            }
            GestureState::Drawing(drawing) => {
                if drawing.current_element.element_type() == ElementType::FreehandPath {
                    drawing.current_path.push(world);
                }
                if drawing.current_element.drag_to(world) {
                    GestureEffect::DrawUpdated
                } else {
                    GestureEffect::None
                }
            }
        }
    }

    /// Pointer released: finishes whatever gesture is running.
    pub fn pointer_up(&mut self) -> GestureEffect {
        match std::mem::take(&mut self.state) {
            GestureState::Idle => GestureEffect::None,
            GestureState::Panning { .. } => GestureEffect::PanEnded,
            GestureState::Drawing(drawing) => GestureEffect::Commit(drawing.current_element),
        }
    }

    /// Pointer capture lost (left the canvas, window blurred).
    ///
    /// An in-progress draw is discarded rather than committed.
    pub fn cancel(&mut self) -> GestureEffect {
        match std::mem::take(&mut self.state) {
            GestureState::Idle => GestureEffect::None,
            GestureState::Panning { .. } => GestureEffect::PanEnded,
            GestureState::Drawing(drawing) => GestureEffect::Discard(drawing.current_element),
        }
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            GestureState::Idle => "idle",
            GestureState::Panning { .. } => "panning",
            GestureState::Drawing(_) => "drawing",
        }
    }
}
