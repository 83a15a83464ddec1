//! Collaboration management for real-time multi-user editing.
//!
//! The [`Reconciler`] sits between the local canvas and a relay channel. It
//! queues outgoing broadcasts (element snapshots on commit, cursor positions
//! on every pointer move) and turns incoming relay messages into
//! [`RemoteChange`]s for the canvas to apply.
//!
//! The conflict policy is last-writer-wins at whole-document granularity: an
//! elements update from another user replaces the local collection outright,
//! with no per-element merge and no causality check. Whichever broadcast is
//! processed last wins. Cursor updates follow the same rule per user.

use crate::element::Element;
use crate::sync::{ChannelEvent, ClientMessage, Member, ServerMessage, SyncEvent, Transport, now_millis};
use kurbo::Point;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Identity of the local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    /// Display name shown to other users.
    pub name: String,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Reconciler configuration.
#[derive(Debug, Clone)]
pub struct CollaborationConfig {
    /// Name of the relay channel (one per board/session).
    pub channel: String,
    pub user: UserIdentity,
    /// Minimum spacing between cursor broadcasts (None = send every move).
    pub cursor_throttle: Option<Duration>,
}

impl CollaborationConfig {
    pub fn new(channel: impl Into<String>, user: UserIdentity) -> Self {
        Self {
            channel: channel.into(),
            user,
            cursor_throttle: None,
        }
    }

    pub fn with_cursor_throttle(mut self, interval: Duration) -> Self {
        self.cursor_throttle = Some(interval);
        self
    }
}

/// Latest known cursor of a remote user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserCursor {
    /// World coordinates.
    pub position: Point,
    /// Sender's timestamp, informational only.
    pub timestamp: u64,
}

/// Presence and cursor view of the channel. Read by rendering.
#[derive(Debug, Clone, Default)]
pub struct CollaborationState {
    users: Vec<Member>,
    cursors: HashMap<String, UserCursor>,
    is_connected: bool,
}

impl CollaborationState {
    /// Connected users, unique by id, in relay order.
    pub fn users(&self) -> &[Member] {
        &self.users
    }

    pub fn user(&self, id: &str) -> Option<&Member> {
        self.users.iter().find(|m| m.id == id)
    }

    pub fn cursors(&self) -> &HashMap<String, UserCursor> {
        &self.cursors
    }

    pub fn cursor(&self, user_id: &str) -> Option<&UserCursor> {
        self.cursors.get(user_id)
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    fn set_members(&mut self, members: Vec<Member>) {
        let mut unique: Vec<Member> = Vec::with_capacity(members.len());
        for member in members {
            match unique.iter_mut().find(|m| m.id == member.id) {
                Some(existing) => *existing = member,
                None => unique.push(member),
            }
        }
        self.users = unique;
    }
}

/// A remote change for the canvas to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteChange {
    /// Nothing visible changed.
    None,
    /// A remote cursor moved.
    CursorMoved { user_id: String },
    /// Replace the whole element collection. Must not be recorded in history.
    ReplaceElements { from: String, elements: Vec<Element> },
    /// Member list or connection flag changed.
    PresenceChanged,
}

/// Bridges local changes to the relay and merges remote ones.
pub struct Reconciler {
    config: CollaborationConfig,
    state: CollaborationState,
    /// Whether `join` was requested and `leave` not yet called.
    subscribed: bool,
    outgoing: Vec<ClientMessage>,
    last_cursor_sent: Option<Instant>,
}

impl Reconciler {
    pub fn new(config: CollaborationConfig) -> Self {
        Self {
            config,
            state: CollaborationState::default(),
            subscribed: false,
            outgoing: Vec::new(),
            last_cursor_sent: None,
        }
    }

    pub fn config(&self) -> &CollaborationConfig {
        &self.config
    }

    pub fn user(&self) -> &UserIdentity {
        &self.config.user
    }

    pub fn channel(&self) -> &str {
        &self.config.channel
    }

    pub fn state(&self) -> &CollaborationState {
        &self.state
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    // --- Channel lifecycle ---

    /// Subscribe to the configured channel. Queues the join message.
    pub fn join(&mut self) {
        self.subscribed = true;
        self.outgoing.push(ClientMessage::Join {
            channel: self.config.channel.clone(),
            user_id: self.config.user.id.clone(),
            name: self.config.user.name.clone(),
        });
    }

    /// Unsubscribe and drop all presence state. Queues the leave message.
    pub fn leave(&mut self) {
        if !self.subscribed {
            return;
        }
        self.subscribed = false;
        self.outgoing.push(ClientMessage::Leave);
        self.state = CollaborationState::default();
        self.last_cursor_sent = None;
    }

    // --- Outbound ---

    /// Queue a full snapshot broadcast after a local commit.
    pub fn broadcast_elements(&mut self, elements: &[Element]) {
        if !self.subscribed {
            return;
        }
        self.outgoing.push(ClientMessage::Publish {
            event: ChannelEvent::ElementsUpdate {
                user_id: self.config.user.id.clone(),
                elements: elements.to_vec(),
                timestamp: now_millis(),
            },
        });
    }

    /// Queue a cursor broadcast, subject to the configured throttle.
    pub fn broadcast_cursor(&mut self, world: Point) {
        self.broadcast_cursor_at(world, Instant::now());
    }

    /// Like [`broadcast_cursor`](Self::broadcast_cursor) with an explicit clock.
    pub fn broadcast_cursor_at(&mut self, world: Point, now: Instant) {
        if !self.subscribed {
            return;
        }
        if let (Some(interval), Some(last)) = (self.config.cursor_throttle, self.last_cursor_sent) {
            if now.saturating_duration_since(last) < interval {
                return;
            }
        }
        self.last_cursor_sent = Some(now);
        self.outgoing.push(ClientMessage::Publish {
            event: ChannelEvent::CursorMove {
                user_id: self.config.user.id.clone(),
                x: world.x,
                y: world.y,
                timestamp: now_millis(),
            },
        });
    }

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Send every queued message. Failures are logged and the message is
    /// dropped; nothing is retried. Returns how many were handed off.
    pub fn flush<T: Transport + ?Sized>(&mut self, transport: &T) -> usize {
        let mut sent = 0;
        for msg in self.take_outgoing() {
            let json = match msg.to_json() {
                Ok(json) => json,
                Err(e) => {
                    log::warn!("Dropping unencodable message: {e}");
                    continue;
                }
            };
            match transport.send(&json) {
                Ok(()) => sent += 1,
                Err(e) => log::warn!("Broadcast to {} failed: {e}", self.config.channel),
            }
        }
        sent
    }

    // --- Inbound ---

    /// Handle a transport event.
    pub fn handle_sync_event(&mut self, event: SyncEvent) -> RemoteChange {
        match event {
            SyncEvent::Connected => {
                if self.subscribed {
                    // Relay forgets us across reconnects
                    self.join();
                }
                RemoteChange::None
            }
            SyncEvent::Disconnected => {
                let was_connected = self.state.is_connected;
                self.state.is_connected = false;
                self.state.users.clear();
                if was_connected {
                    RemoteChange::PresenceChanged
                } else {
                    RemoteChange::None
                }
            }
            SyncEvent::Received(msg) => self.handle_message(msg),
            SyncEvent::Error { message } => {
                log::warn!("Collaboration transport error: {message}");
                RemoteChange::None
            }
        }
    }

    /// Handle a message from the relay.
    pub fn handle_message(&mut self, msg: ServerMessage) -> RemoteChange {
        match msg {
            ServerMessage::Joined {
                channel,
                members,
                replay,
            } => {
                log::info!("Joined channel {channel} with {} member(s)", members.len());
                self.state.set_members(members);
                self.state.is_connected = true;
                match replay {
                    Some(event) => self.handle_event(event.user_id().to_string(), event),
                    None => RemoteChange::PresenceChanged,
                }
            }
            ServerMessage::Presence { members } => {
                self.state.set_members(members);
                self.state.is_connected = self.state.user(&self.config.user.id).is_some();
                RemoteChange::PresenceChanged
            }
            ServerMessage::Message { from, event } => self.handle_event(from, event),
            ServerMessage::Error { message } => {
                log::warn!("Relay error: {message}");
                RemoteChange::None
            }
        }
    }

    /// Apply one channel event. Events from the local user are echoes and are
    /// ignored.
    pub fn handle_event(&mut self, from: String, event: ChannelEvent) -> RemoteChange {
        if from == self.config.user.id || event.user_id() == self.config.user.id {
            return RemoteChange::None;
        }
        match event {
            ChannelEvent::CursorMove { user_id, x, y, timestamp } => {
                self.state.cursors.insert(
                    user_id.clone(),
                    UserCursor {
                        position: Point::new(x, y),
                        timestamp,
                    },
                );
                RemoteChange::CursorMoved { user_id }
            }
            ChannelEvent::ElementsUpdate { user_id, elements, .. } => {
                log::debug!("Replacing {} element(s) from {user_id}", elements.len());
                RemoteChange::ReplaceElements { from: user_id, elements }
            }
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        if self.subscribed {
            log::debug!("Reconciler for {} dropped while subscribed", self.config.channel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::TransportError;
    use std::cell::RefCell;

    fn reconciler() -> Reconciler {
        let mut r = Reconciler::new(CollaborationConfig::new("board", UserIdentity::new("me", "Me")));
        r.join();
        r.take_outgoing();
        r
    }

    fn cursor(user: &str, x: f64, timestamp: u64) -> ChannelEvent {
        ChannelEvent::CursorMove {
            user_id: user.to_string(),
            x,
            y: 0.0,
            timestamp,
        }
    }

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            name: id.to_uppercase(),
            color: "#3b82f6".to_string(),
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: RefCell<Vec<String>>,
        fail: bool,
    }

    impl Transport for RecordingTransport {
        fn send(&self, msg: &str) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::NotConnected);
            }
            self.sent.borrow_mut().push(msg.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_join_and_leave_queue_messages() {
        let mut r = Reconciler::new(CollaborationConfig::new("board", UserIdentity::new("me", "Me")));
        r.join();
        r.leave();
        let out = r.take_outgoing();
        assert!(matches!(out[0], ClientMessage::Join { ref channel, .. } if channel == "board"));
        assert_eq!(out[1], ClientMessage::Leave);
        assert!(!r.is_subscribed());
    }

    #[test]
    fn test_nothing_broadcast_before_join() {
        let mut r = Reconciler::new(CollaborationConfig::new("board", UserIdentity::new("me", "Me")));
        r.broadcast_cursor(Point::ZERO);
        r.broadcast_elements(&[]);
        assert!(!r.has_outgoing());
    }

    #[test]
    fn test_cursor_last_received_wins() {
        let mut r = reconciler();
        r.handle_event("bob".into(), cursor("bob", 20.0, 200));
        r.handle_event("bob".into(), cursor("bob", 10.0, 100));
        let c = r.state().cursor("bob").unwrap();
        assert_eq!(c.position, Point::new(10.0, 0.0));
        assert_eq!(c.timestamp, 100);
        assert_eq!(r.state().cursors().len(), 1);
    }

    #[test]
    fn test_own_echo_ignored() {
        let mut r = reconciler();
        assert_eq!(r.handle_event("me".into(), cursor("me", 1.0, 1)), RemoteChange::None);
        let update = ChannelEvent::ElementsUpdate {
            user_id: "me".into(),
            elements: vec![],
            timestamp: 1,
        };
        assert_eq!(r.handle_event("relay".into(), update), RemoteChange::None);
        assert!(r.state().cursors().is_empty());
    }

    #[test]
    fn test_remote_update_requests_replacement() {
        let mut r = reconciler();
        let update = ChannelEvent::ElementsUpdate {
            user_id: "bob".into(),
            elements: vec![],
            timestamp: 1,
        };
        assert_eq!(
            r.handle_event("bob".into(), update),
            RemoteChange::ReplaceElements {
                from: "bob".into(),
                elements: vec![]
            }
        );
    }

    #[test]
    fn test_presence_does_not_touch_cursors() {
        let mut r = reconciler();
        r.handle_event("bob".into(), cursor("bob", 5.0, 1));
        let change = r.handle_message(ServerMessage::Presence {
            members: vec![member("me"), member("bob"), member("bob")],
        });
        assert_eq!(change, RemoteChange::PresenceChanged);
        assert_eq!(r.state().users().len(), 2);
        assert!(r.state().is_connected());

        r.handle_message(ServerMessage::Presence { members: vec![member("me")] });
        assert_eq!(r.state().users().len(), 1);
        assert!(r.state().cursor("bob").is_some());
    }

    #[test]
    fn test_joined_replays_last_update() {
        let mut r = reconciler();
        let change = r.handle_message(ServerMessage::Joined {
            channel: "board".into(),
            members: vec![member("me"), member("bob")],
            replay: Some(ChannelEvent::ElementsUpdate {
                user_id: "bob".into(),
                elements: vec![],
                timestamp: 3,
            }),
        });
        assert!(matches!(change, RemoteChange::ReplaceElements { .. }));
        assert!(r.state().is_connected());
    }

    #[test]
    fn test_cursor_throttle() {
        let config = CollaborationConfig::new("board", UserIdentity::new("me", "Me"))
            .with_cursor_throttle(Duration::from_millis(50));
        let mut r = Reconciler::new(config);
        r.join();
        r.take_outgoing();
        let t0 = Instant::now();
        r.broadcast_cursor_at(Point::new(1.0, 1.0), t0);
        r.broadcast_cursor_at(Point::new(2.0, 2.0), t0 + Duration::from_millis(10));
        r.broadcast_cursor_at(Point::new(3.0, 3.0), t0 + Duration::from_millis(60));
        assert_eq!(r.take_outgoing().len(), 2);
    }

    #[test]
    fn test_flush_is_fire_and_forget() {
        let mut r = reconciler();
        r.broadcast_cursor(Point::new(1.0, 2.0));
        r.broadcast_elements(&[]);

        let failing = RecordingTransport {
            fail: true,
            ..Default::default()
        };
        assert_eq!(r.flush(&failing), 0);
        assert!(!r.has_outgoing());

        r.broadcast_cursor(Point::new(3.0, 4.0));
        let ok = RecordingTransport::default();
        assert_eq!(r.flush(&ok), 1);
        assert!(ok.sent.borrow()[0].contains("cursor-move"));
    }

    #[test]
    fn test_disconnect_clears_presence_and_reconnect_rejoins() {
        let mut r = reconciler();
        r.handle_message(ServerMessage::Presence { members: vec![member("me")] });
        assert_eq!(r.handle_sync_event(SyncEvent::Disconnected), RemoteChange::PresenceChanged);
        assert!(!r.state().is_connected());
        assert!(r.state().users().is_empty());

        r.handle_sync_event(SyncEvent::Connected);
        assert!(matches!(r.take_outgoing().as_slice(), [ClientMessage::Join { .. }]));
    }
}
