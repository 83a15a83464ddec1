//! Scribble Core Library
//!
//! Platform-agnostic core of the Scribble collaborative whiteboard: the
//! element model, viewport math, the drawing gesture machine, undo history,
//! the collaboration reconciler and its wire protocol, and session storage.

pub mod canvas;
pub mod collaboration;
pub mod debounce;
pub mod element;
pub mod gesture;
pub mod history;
pub mod input;
pub mod storage;
pub mod sync;
pub mod tools;
pub mod viewport;

pub use canvas::{Board, Canvas, Notice, SessionSnapshot};
pub use collaboration::{CollaborationConfig, CollaborationState, Reconciler, RemoteChange, UserCursor, UserIdentity};
pub use debounce::{Debouncer, RICH_NOTE_DEBOUNCE};
pub use element::{Color, Element, ElementId, ElementKind, ElementStyle, ElementType};
pub use gesture::{GestureEffect, GestureMachine, GestureState};
pub use history::History;
pub use input::{MouseButton, PointerEvent};
pub use sync::{ConnectionState, NativeWebSocket, SyncEvent, Transport};
pub use tools::{ToolKind, ToolManager};
pub use viewport::Viewport;
