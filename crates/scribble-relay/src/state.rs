//! Channel bookkeeping shared by every connection.

use dashmap::DashMap;
use scribble_core::sync::{ChannelEvent, Member, ServerMessage};
use tokio::sync::broadcast;
use tracing::{debug, trace};

const CHANNEL_CAPACITY: usize = 256;

/// Member colors, handed out round-robin per channel.
const PALETTE: [&str; 8] = [
    "#ef4444", "#3b82f6", "#22c55e", "#f59e0b", "#a855f7", "#ec4899", "#14b8a6", "#f97316",
];

/// A message fanned out to a channel, tagged with the connection that
/// caused it so that connection can skip its own echo.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub origin: String,
    pub message: ServerMessage,
}

impl Envelope {
    /// The message to forward to `connection`, or `None` for its own echo.
    pub fn for_connection(self, connection: &str) -> Option<ServerMessage> {
        (self.origin != connection).then_some(self.message)
    }
}

struct Subscriber {
    connection: String,
    member: Member,
}

struct Channel {
    tx: broadcast::Sender<Envelope>,
    /// In join order.
    subscribers: Vec<Subscriber>,
    last_elements: Option<ChannelEvent>,
    next_color: usize,
}

impl Channel {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            subscribers: Vec::new(),
            last_elements: None,
            next_color: 0,
        }
    }

    fn members(&self) -> Vec<Member> {
        self.subscribers.iter().map(|s| s.member.clone()).collect()
    }

    fn send(&self, origin: &str, message: ServerMessage) {
        let envelope = Envelope {
            origin: origin.to_string(),
            message,
        };
        if self.tx.send(envelope).is_err() {
            trace!("No receivers left for broadcast from {origin}");
        }
    }
}

/// Result of joining a channel.
pub struct Joined {
    pub rx: broadcast::Receiver<Envelope>,
    /// The `joined` reply for the new subscriber.
    pub reply: ServerMessage,
}

/// All live channels, keyed by name.
pub struct AppState {
    channels: DashMap<String, Channel>,
    replay_history: bool,
}

impl AppState {
    pub fn new(replay_history: bool) -> Self {
        Self {
            channels: DashMap::new(),
            replay_history,
        }
    }

    /// Subscribe `connection` to `channel` as the given user. The other
    /// subscribers receive the updated presence list.
    pub fn join(&self, channel: &str, connection: &str, user_id: &str, name: &str) -> Joined {
        let mut entry = self.channels.entry(channel.to_string()).or_insert_with(Channel::new);
        let color = PALETTE[entry.next_color % PALETTE.len()].to_string();
        entry.next_color += 1;
        entry.subscribers.push(Subscriber {
            connection: connection.to_string(),
            member: Member {
                id: user_id.to_string(),
                name: name.to_string(),
                color,
            },
        });

        let members = entry.members();
        let replay = if self.replay_history {
            entry.last_elements.clone()
        } else {
            None
        };
        entry.send(
            connection,
            ServerMessage::Presence {
                members: members.clone(),
            },
        );
        // Subscribe after announcing so the joiner does not see its own presence
        let rx = entry.tx.subscribe();
        debug!("{user_id} joined {channel} ({} member(s))", members.len());

        Joined {
            rx,
            reply: ServerMessage::Joined {
                channel: channel.to_string(),
                members,
                replay,
            },
        }
    }

    /// Unsubscribe `connection`. Remaining subscribers get the new presence
    /// list; an emptied channel is dropped along with its history.
    pub fn leave(&self, channel: &str, connection: &str) {
        let Some(mut entry) = self.channels.get_mut(channel) else {
            return;
        };
        entry.subscribers.retain(|s| s.connection != connection);
        if entry.subscribers.is_empty() {
            drop(entry);
            self.channels.remove_if(channel, |_, c| c.subscribers.is_empty());
            debug!("Channel {channel} closed");
            return;
        }
        let members = entry.members();
        entry.send(connection, ServerMessage::Presence { members });
    }

    /// Fan `event` out to everyone else on the channel. Returns false when
    /// `connection` is not subscribed there.
    pub fn publish(&self, channel: &str, connection: &str, event: ChannelEvent) -> bool {
        let Some(mut entry) = self.channels.get_mut(channel) else {
            return false;
        };
        let Some(from) = entry
            .subscribers
            .iter()
            .find(|s| s.connection == connection)
            .map(|s| s.member.id.clone())
        else {
            return false;
        };

        if self.replay_history && matches!(event, ChannelEvent::ElementsUpdate { .. }) {
            entry.last_elements = Some(event.clone());
        }
        entry.send(connection, ServerMessage::Message { from, event });
        true
    }

    pub fn members(&self, channel: &str) -> Vec<Member> {
        self.channels.get(channel).map(|c| c.members()).unwrap_or_default()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
