//! Push-channel contract and an in-process implementation.
//!
//! A channel is session-scoped: each game session constructs its own and
//! tears it down when the session closes. Lifecycle callbacks and inbound
//! frames arrive as [`ChannelEvent`]s on a single queue, so they are
//! handled one at a time and in arrival order.

use crate::error::{SyncError, SyncErrorKind};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Handle for one topic subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Something the channel reports to its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Handshake confirmed.
    Connected,
    /// The underlying connection failed.
    ConnectionError(String),
    /// The broker reported a protocol-level error.
    ProtocolError(String),
    /// A frame arrived on a subscription.
    Message {
        /// Subscription the frame belongs to.
        subscription: SubscriptionId,
        /// Raw frame body.
        body: String,
    },
}

/// Bidirectional publish/subscribe connection.
///
/// Reconnection, heartbeats and framing live below this trait.
pub trait TransportChannel {
    /// Starts connecting. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the connection cannot be started.
    fn connect(&mut self) -> Result<(), SyncError>;

    /// Closes the connection. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns a transport error when shutdown fails.
    fn disconnect(&mut self) -> Result<(), SyncError>;

    /// Subscribes to a topic.
    ///
    /// # Errors
    ///
    /// Returns a transport error when not connected.
    fn subscribe(&mut self, topic: &str) -> Result<SubscriptionId, SyncError>;

    /// Drops a subscription.
    ///
    /// # Errors
    ///
    /// Returns a transport error for unknown subscriptions.
    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<(), SyncError>;

    /// Best-effort send of `body` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the frame could not be queued.
    fn publish(&mut self, destination: &str, body: String) -> Result<(), SyncError>;
}

/// A frame published through a [`LoopbackChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFrame {
    /// Destination it was sent to.
    pub destination: String,
    /// Frame body.
    pub body: String,
}

/// Calls made on a [`LoopbackChannel`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    /// `connect()`.
    Connect,
    /// `disconnect()`.
    Disconnect,
    /// `subscribe(topic)`.
    Subscribe(String),
    /// `unsubscribe(id)`.
    Unsubscribe(SubscriptionId),
    /// `publish(destination, ..)`.
    Publish(String),
}

#[derive(Debug, Default)]
struct Topics {
    by_topic: BTreeMap<String, SubscriptionId>,
}

/// In-process channel with a scriptable server side.
///
/// `connect()` confirms the handshake immediately by queueing
/// [`ChannelEvent::Connected`]. Server traffic is injected through the
/// paired [`LoopbackInjector`].
#[derive(Debug)]
pub struct LoopbackChannel {
    events: mpsc::UnboundedSender<ChannelEvent>,
    topics: Arc<Mutex<Topics>>,
    connected: bool,
    next_id: u64,
    published: Vec<PublishedFrame>,
    calls: Vec<ChannelCall>,
}

/// Server side of a [`LoopbackChannel`].
#[derive(Debug, Clone)]
pub struct LoopbackInjector {
    events: mpsc::UnboundedSender<ChannelEvent>,
    topics: Arc<Mutex<Topics>>,
}

fn lock(topics: &Mutex<Topics>) -> MutexGuard<'_, Topics> {
    topics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn closed_queue() -> SyncError {
    SyncError::new(SyncErrorKind::Transport("event queue closed".to_string()))
}

impl LoopbackChannel {
    /// Creates a channel, its injector and the event queue the session drains.
    #[instrument]
    pub fn new() -> (
        Self,
        LoopbackInjector,
        mpsc::UnboundedReceiver<ChannelEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let topics = Arc::new(Mutex::new(Topics::default()));
        let channel = Self {
            events: tx.clone(),
            topics: Arc::clone(&topics),
            connected: false,
            next_id: 0,
            published: Vec::new(),
            calls: Vec::new(),
        };
        let injector = LoopbackInjector { events: tx, topics };
        (channel, injector, rx)
    }

    /// Whether the channel is connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Frames published so far.
    pub fn published(&self) -> &[PublishedFrame] {
        &self.published
    }

    /// Every call made on the channel.
    pub fn calls(&self) -> &[ChannelCall] {
        &self.calls
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        lock(&self.topics).by_topic.len()
    }
}

impl TransportChannel for LoopbackChannel {
    #[instrument(skip(self))]
    fn connect(&mut self) -> Result<(), SyncError> {
        self.calls.push(ChannelCall::Connect);
        if self.connected {
            debug!("Already connected");
            return Ok(());
        }
        self.events
            .send(ChannelEvent::Connected)
            .map_err(|_| closed_queue())?;
        self.connected = true;
        info!("Loopback channel connected");
        Ok(())
    }

    #[instrument(skip(self))]
    fn disconnect(&mut self) -> Result<(), SyncError> {
        self.calls.push(ChannelCall::Disconnect);
        if self.connected {
            self.connected = false;
            lock(&self.topics).by_topic.clear();
            info!("Loopback channel disconnected");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn subscribe(&mut self, topic: &str) -> Result<SubscriptionId, SyncError> {
        self.calls.push(ChannelCall::Subscribe(topic.to_string()));
        if !self.connected {
            warn!(topic, "Subscribe while disconnected");
            return Err(SyncError::new(SyncErrorKind::Transport(
                "subscribe while disconnected".to_string(),
            )));
        }
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        lock(&self.topics).by_topic.insert(topic.to_string(), id);
        debug!(topic, id = id.0, "Subscribed");
        Ok(id)
    }

    #[instrument(skip(self))]
    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<(), SyncError> {
        self.calls.push(ChannelCall::Unsubscribe(id));
        let mut topics = lock(&self.topics);
        let before = topics.by_topic.len();
        topics.by_topic.retain(|_, sub| *sub != id);
        if topics.by_topic.len() == before {
            return Err(SyncError::new(SyncErrorKind::Transport(format!(
                "unknown subscription {}",
                id.0
            ))));
        }
        debug!(id = id.0, "Unsubscribed");
        Ok(())
    }

    #[instrument(skip(self, body))]
    fn publish(&mut self, destination: &str, body: String) -> Result<(), SyncError> {
        self.calls.push(ChannelCall::Publish(destination.to_string()));
        if !self.connected {
            return Err(SyncError::new(SyncErrorKind::Transport(
                "publish while disconnected".to_string(),
            )));
        }
        debug!(destination, body = %body, "Published frame");
        self.published.push(PublishedFrame {
            destination: destination.to_string(),
            body,
        });
        Ok(())
    }
}

impl LoopbackInjector {
    /// Delivers a frame to whoever subscribed to `topic`.
    ///
    /// Returns `false` when nobody is subscribed; the frame is dropped,
    /// as a broker would.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the session's queue is gone.
    #[instrument(skip(self, body))]
    pub fn deliver(&self, topic: &str, body: impl Into<String>) -> Result<bool, SyncError> {
        let Some(subscription) = lock(&self.topics).by_topic.get(topic).copied() else {
            debug!(topic, "No subscriber, frame dropped");
            return Ok(false);
        };
        self.send(ChannelEvent::Message {
            subscription,
            body: body.into(),
        })?;
        Ok(true)
    }

    /// Reports a connection failure.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the session's queue is gone.
    pub fn connection_error(&self, message: impl Into<String>) -> Result<(), SyncError> {
        self.send(ChannelEvent::ConnectionError(message.into()))
    }

    /// Reports a broker protocol error.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the session's queue is gone.
    pub fn protocol_error(&self, message: impl Into<String>) -> Result<(), SyncError> {
        self.send(ChannelEvent::ProtocolError(message.into()))
    }

    /// Confirms a (re)established connection.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the session's queue is gone.
    pub fn reconnected(&self) -> Result<(), SyncError> {
        self.send(ChannelEvent::Connected)
    }

    fn send(&self, event: ChannelEvent) -> Result<(), SyncError> {
        self.events.send(event).map_err(|_| closed_queue())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_is_idempotent() {
        let (mut channel, _injector, mut rx) = LoopbackChannel::new();
        channel.connect().unwrap();
        channel.connect().unwrap();
        assert_eq!(rx.try_recv().unwrap(), ChannelEvent::Connected);
        assert!(rx.try_recv().is_err());
        channel.disconnect().unwrap();
        channel.disconnect().unwrap();
        assert!(!channel.is_connected());
    }

    #[test]
    fn test_failed_connect_stays_disconnected() {
        let (mut channel, _injector, rx) = LoopbackChannel::new();
        drop(rx);
        assert!(channel.connect().is_err());
        assert!(!channel.is_connected());
        assert!(channel.publish("/app/move", "{}".to_string()).is_err());
    }

    #[test]
    fn test_deliver_requires_subscription() {
        let (mut channel, injector, mut rx) = LoopbackChannel::new();
        assert!(!injector.deliver("/topic/game/1", "{}").unwrap());

        channel.connect().unwrap();
        let id = channel.subscribe("/topic/game/1").unwrap();
        assert!(injector.deliver("/topic/game/1", "{}").unwrap());

        assert_eq!(rx.try_recv().unwrap(), ChannelEvent::Connected);
        assert_eq!(
            rx.try_recv().unwrap(),
            ChannelEvent::Message {
                subscription: id,
                body: "{}".to_string()
            }
        );
    }

    #[test]
    fn test_publish_requires_connection() {
        let (mut channel, _injector, _rx) = LoopbackChannel::new();
        assert!(channel.publish("/app/move", "{}".to_string()).is_err());
        assert!(channel.published().is_empty());
        assert!(channel.subscribe("/topic/game/1").is_err());
    }

    #[test]
    fn test_unsubscribe_unknown() {
        let (mut channel, _injector, _rx) = LoopbackChannel::new();
        channel.connect().unwrap();
        let id = channel.subscribe("/topic/game/1").unwrap();
        channel.unsubscribe(id).unwrap();
        assert_eq!(channel.subscription_count(), 0);
        assert!(channel.unsubscribe(id).is_err());
    }
}
