//! Board contents and interactive canvas state.

use crate::collaboration::{CollaborationConfig, Reconciler, RemoteChange, UserIdentity};
use crate::debounce::{Debouncer, RICH_NOTE_DEBOUNCE};
use crate::element::{CommentError, CommentId, Element, ElementId, hit};
use crate::gesture::{GestureEffect, GestureMachine, PressContext};
use crate::history::History;
use crate::input::{MouseButton, PointerEvent};
use crate::storage::StorageError;
use crate::sync::{ClientMessage, SyncEvent, Transport};
use crate::tools::{ToolKind, ToolManager};
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

/// Padding used by [`Canvas::fit_to_content`], in screen pixels.
const FIT_PADDING: f64 = 50.0;

/// The ordered element collection. Storage order is paint order and
/// hit-test priority.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    elements: Vec<Element>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    /// Append an element (painted on top).
    pub fn add(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        let pos = self.elements.iter().position(|e| e.id() == id)?;
        Some(self.elements.remove(pos))
    }

    /// Replace the whole collection.
    pub fn replace_all(&mut self, elements: Vec<Element>) {
        self.elements = elements;
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// The first element in storage order containing `point`.
    ///
    /// Storage order, not paint order from the top, decides overlaps: the
    /// oldest element under the pointer wins.
    pub fn hit_test(&self, point: Point) -> Option<ElementId> {
        self.elements
            .iter()
            .find(|e| hit::point_in_element(point, e))
            .map(Element::id)
    }

    /// Deselect everything, then select `id`. Returns false if `id` is unknown.
    pub fn select(&mut self, id: ElementId) -> bool {
        self.deselect_all();
        match self.get_mut(id) {
            Some(element) => {
                element.selected = true;
                true
            }
            None => false,
        }
    }

    pub fn deselect_all(&mut self) {
        for element in &mut self.elements {
            element.selected = false;
        }
    }

    pub fn selected_ids(&self) -> Vec<ElementId> {
        self.elements.iter().filter(|e| e.selected).map(Element::id).collect()
    }

    /// Remove every selected element and return them.
    pub fn remove_selected(&mut self) -> Vec<Element> {
        let (removed, kept): (Vec<Element>, Vec<Element>) = std::mem::take(&mut self.elements).into_iter().partition(|e| e.selected);
        self.elements = kept;
        removed
    }

    /// Union of all element bounds, `None` for an empty board.
    pub fn bounds(&self) -> Option<Rect> {
        let mut iter = self.elements.iter().map(Element::bounds);
        let first = iter.next()?;
        Some(iter.fold(first, |acc, r| acc.union(r)))
    }
}

/// Persisted form of a board: what storage backends save and load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub name: String,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl SessionSnapshot {
    /// An empty, untitled session with a fresh id.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            elements: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// A transient user-facing message, e.g. a failed save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

/// Interactive canvas: the board plus everything needed to edit it.
///
/// All mutation goes through methods so that history, broadcasting and the
/// redraw counter stay consistent.
pub struct Canvas {
    pub session_id: String,
    pub name: String,
    board: Board,
    pub viewport: Viewport,
    /// Screen size of the canvas, used for fitting.
    pub viewport_size: Size,
    pub tool_manager: ToolManager,
    /// Simplify freehand strokes on commit with this tolerance (world
    /// units). Off by default, so committed points equal drawn points.
    pub freehand_tolerance: Option<f64>,
    gesture: GestureMachine,
    history: History,
    user: UserIdentity,
    collab: Option<Reconciler>,
    note_debounce: Debouncer,
    notices: Vec<Notice>,
    /// Bumped on every change that needs a redraw.
    revision: u64,
    /// Bumped on every change to the element collection.
    content_revision: u64,
}

impl Canvas {
    /// A standalone canvas for `user`, without collaboration.
    pub fn new(user: UserIdentity) -> Self {
        let session = SessionSnapshot::new();
        Self {
            session_id: session.session_id,
            name: session.name,
            board: Board::new(),
            viewport: Viewport::new(),
            viewport_size: Size::new(800.0, 600.0),
            tool_manager: ToolManager::new(),
            freehand_tolerance: None,
            gesture: GestureMachine::new(),
            history: History::new(),
            user,
            collab: None,
            note_debounce: Debouncer::new(RICH_NOTE_DEBOUNCE),
            notices: Vec::new(),
            revision: 0,
            content_revision: 0,
        }
    }

    /// A canvas attached to a collaboration channel. Call
    /// [`join`](Self::join) to subscribe.
    pub fn with_collaboration(config: CollaborationConfig) -> Self {
        let mut canvas = Self::new(config.user.clone());
        canvas.collab = Some(Reconciler::new(config));
        canvas
    }

    // --- Accessors ---

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn elements(&self) -> &[Element] {
        self.board.elements()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn gesture(&self) -> &GestureMachine {
        &self.gesture
    }

    /// The element currently being drawn, not yet on the board.
    pub fn preview(&self) -> Option<&Element> {
        self.gesture.preview()
    }

    pub fn user(&self) -> &UserIdentity {
        &self.user
    }

    pub fn collaboration(&self) -> Option<&Reconciler> {
        self.collab.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn content_revision(&self) -> u64 {
        self.content_revision
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool_manager.set_tool(tool);
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_size = Size::new(width, height);
        self.touch();
    }

    // --- Pointer input ---

    /// Dispatch a pointer event. Only the primary button draws, selects or pans.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { position, button: MouseButton::Left } => self.pointer_down(position),
            PointerEvent::Up { button: MouseButton::Left, .. } => self.pointer_up(),
            PointerEvent::Down { .. } | PointerEvent::Up { .. } => {}
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Scroll { position, delta } => self.wheel(position, delta.y),
            PointerEvent::Leave => self.pointer_leave(),
        }
    }

    pub fn pointer_down(&mut self, screen: Point) {
        let world = self.viewport.screen_to_world(screen);
        let tool = self.tool_manager.current_tool.element_type();
        let hit = match tool {
            None => self.board.hit_test(world),
            Some(_) => None,
        };
        let style = self.tool_manager.active_style();
        let effect = self.gesture.pointer_down(PressContext {
            screen,
            world,
            tool,
            hit,
            style: &style,
            author_id: &self.user.id,
        });
        self.apply_effect(effect);
    }

    /// Pointer moved. The world position is always broadcast as the local
    /// cursor, whatever the gesture state.
    pub fn pointer_move(&mut self, screen: Point) {
        let world = self.viewport.screen_to_world(screen);
        if let Some(collab) = &mut self.collab {
            collab.broadcast_cursor(world);
        }
        let effect = self.gesture.pointer_move(screen, world);
        self.apply_effect(effect);
    }

    pub fn pointer_up(&mut self) {
        let effect = self.gesture.pointer_up();
        self.apply_effect(effect);
    }

    /// Pointer left the canvas: an in-progress draw is discarded.
    pub fn pointer_leave(&mut self) {
        let effect = self.gesture.cancel();
        self.apply_effect(effect);
    }

    /// Wheel zoom around the cursor.
    pub fn wheel(&mut self, screen: Point, delta_y: f64) {
        self.viewport.wheel(screen, delta_y);
        self.touch();
    }

    fn apply_effect(&mut self, effect: GestureEffect) {
        match effect {
            GestureEffect::None => {}
            GestureEffect::Select(id) => {
                self.board.select(id);
                self.touch();
            }
            GestureEffect::PanStarted => {
                self.board.deselect_all();
                self.touch();
            }
            GestureEffect::Pan(delta) => {
                self.viewport.pan(delta);
                self.touch();
            }
            GestureEffect::DrawStarted | GestureEffect::DrawUpdated | GestureEffect::PanEnded => self.touch(),
            GestureEffect::Commit(mut element) => {
                if let Some(tolerance) = self.freehand_tolerance {
                    let dropped = element.simplify(tolerance);
                    if dropped > 0 {
                        log::debug!("Simplified stroke, dropped {dropped} point(s)");
                    }
                }
                log::debug!("Committing {} {}", element.element_type().name(), element.id());
                self.board.add(element);
                self.commit();
            }
            GestureEffect::Discard(element) => {
                log::debug!("Discarding unfinished {}", element.element_type().name());
                self.touch();
            }
        }
    }

    // --- Local edits ---

    /// Record the current collection in history and broadcast it.
    fn commit(&mut self) {
        self.note_debounce.cancel();
        self.history.record(self.board.elements().to_vec());
        self.broadcast_elements();
        self.content_changed();
    }

    fn broadcast_elements(&mut self) {
        if let Some(collab) = &mut self.collab {
            collab.broadcast_elements(self.board.elements());
        }
    }

    /// Delete all selected elements as one undoable step.
    /// Returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        let removed = self.board.remove_selected();
        if !removed.is_empty() {
            self.commit();
        }
        removed.len()
    }

    /// Select one element. Selection is local and not recorded.
    pub fn select(&mut self, id: ElementId) -> bool {
        let found = self.board.select(id);
        self.touch();
        found
    }

    pub fn deselect_all(&mut self) {
        self.board.deselect_all();
        self.touch();
    }

    pub fn selected_ids(&self) -> Vec<ElementId> {
        self.board.selected_ids()
    }

    /// Step back to the previous local commit. A rich note edit still
    /// waiting on its debounce is committed first, so it is the step undone.
    pub fn undo(&mut self) -> bool {
        self.flush_pending_edit();
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        let restored = snapshot.clone();
        self.restore(restored);
        true
    }

    /// Re-apply the next local commit. A pending rich note edit is committed
    /// first, which discards the redo states.
    pub fn redo(&mut self) -> bool {
        self.flush_pending_edit();
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        let restored = snapshot.clone();
        self.restore(restored);
        true
    }

    fn restore(&mut self, elements: Vec<Element>) {
        self.note_debounce.cancel();
        self.board.replace_all(elements);
        self.board.deselect_all();
        self.broadcast_elements();
        self.content_changed();
    }

    // --- Rich notes ---

    /// Replace a rich note's content. Applied locally at once; the history
    /// entry and broadcast happen on [`tick`](Self::tick) after one second
    /// without further edits.
    pub fn edit_rich_note(&mut self, id: ElementId, content: impl Into<String>, now: Instant) -> Result<(), CommentError> {
        let editor = self.user.id.clone();
        self.rich_note_mut(id)?.set_content(content, &editor);
        self.note_debounce.arm(now);
        self.content_changed();
        Ok(())
    }

    /// Add a comment by the local user and commit.
    pub fn add_comment(&mut self, id: ElementId, text: impl Into<String>) -> Result<CommentId, CommentError> {
        let UserIdentity { id: author_id, name } = self.user.clone();
        let comment_id = self.rich_note_mut(id)?.add_comment(text, &name, &author_id);
        self.commit();
        Ok(comment_id)
    }

    /// Flip a comment's resolved flag and commit. Any user may do this.
    pub fn toggle_comment_resolved(&mut self, id: ElementId, comment: CommentId) -> Result<bool, CommentError> {
        let resolved = self.rich_note_mut(id)?.toggle_resolved(comment)?;
        self.commit();
        Ok(resolved)
    }

    /// Delete a comment written by the local user and commit.
    pub fn delete_comment(&mut self, id: ElementId, comment: CommentId) -> Result<(), CommentError> {
        let user_id = self.user.id.clone();
        self.rich_note_mut(id)?.delete_comment(comment, &user_id)?;
        self.commit();
        Ok(())
    }

    fn rich_note_mut(&mut self, id: ElementId) -> Result<&mut crate::element::RichNote, CommentError> {
        self.board
            .get_mut(id)
            .and_then(Element::rich_note_mut)
            .ok_or(CommentError::NoteNotFound(id))
    }

    /// Drive time-based work. Commits a pending rich note edit once it has
    /// been quiet for the debounce period. Returns true if it committed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.note_debounce.poll(now) {
            self.commit();
            true
        } else {
            false
        }
    }

    pub fn has_pending_edit(&self) -> bool {
        self.note_debounce.is_pending()
    }

    fn flush_pending_edit(&mut self) {
        if self.note_debounce.is_pending() {
            self.commit();
        }
    }

    // --- Collaboration ---

    /// Subscribe to the collaboration channel, if configured.
    pub fn join(&mut self) {
        if let Some(collab) = &mut self.collab {
            collab.join();
        }
    }

    /// Unsubscribe and drop presence. Local elements are kept.
    pub fn leave(&mut self) {
        if let Some(collab) = &mut self.collab {
            collab.leave();
            self.touch();
        }
    }

    /// Feed one transport event through the reconciler.
    pub fn handle_sync_event(&mut self, event: SyncEvent) {
        let Some(collab) = &mut self.collab else {
            return;
        };
        let change = collab.handle_sync_event(event);
        self.apply_remote(change);
    }

    /// Apply a change reported by the reconciler.
    ///
    /// A remote element update replaces the whole collection and is not
    /// recorded, so undo keeps stepping through local commits only.
    pub fn apply_remote(&mut self, change: RemoteChange) {
        match change {
            RemoteChange::None => {}
            RemoteChange::CursorMoved { .. } | RemoteChange::PresenceChanged => self.touch(),
            RemoteChange::ReplaceElements { from, elements } => {
                log::debug!("Applying {} element(s) from {from}", elements.len());
                self.note_debounce.cancel();
                self.board.replace_all(elements);
                self.content_changed();
            }
        }
    }

    /// Drain queued outgoing messages.
    pub fn take_outgoing(&mut self) -> Vec<ClientMessage> {
        self.collab.as_mut().map(Reconciler::take_outgoing).unwrap_or_default()
    }

    /// Send queued messages over `transport`.
    pub fn flush<T: Transport + ?Sized>(&mut self, transport: &T) -> usize {
        self.collab.as_mut().map_or(0, |collab| collab.flush(transport))
    }

    // --- Viewport ---

    pub fn fit_to_content(&mut self) {
        if let Some(bounds) = self.board.bounds() {
            self.viewport.fit_to_bounds(bounds, self.viewport_size, FIT_PADDING);
            self.touch();
        }
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
        self.touch();
    }

    // --- Persistence ---

    pub fn session_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            name: self.name.clone(),
            elements: self.board.elements().to_vec(),
        }
    }

    /// Replace the canvas contents with a loaded session. History restarts
    /// at the loaded state.
    pub fn load_session(&mut self, snapshot: SessionSnapshot) {
        self.session_id = snapshot.session_id;
        self.name = snapshot.name;
        self.note_debounce.cancel();
        self.history.reset(snapshot.elements.clone());
        self.board.replace_all(snapshot.elements);
        self.content_changed();
    }

    /// Surface a storage failure to the user. The in-memory board is untouched.
    pub fn report_storage_error(&mut self, action: &str, err: &StorageError) {
        log::error!("Failed to {action} session {}: {err}", self.session_id);
        self.notices.push(Notice {
            message: format!("Could not {action} the board: {err}"),
        });
        self.touch();
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn content_changed(&mut self) {
        self.content_revision = self.content_revision.wrapping_add(1);
        self.touch();
    }
}
