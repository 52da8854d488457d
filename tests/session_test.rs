//! Tests for session lifecycle: subscribe once, process in order, tear down.

use std::sync::Mutex;
use std::time::Duration;
use strictly_chess::{
    ChannelCall, ChannelEvent, ConnectionState, GameControl, GameId, GameSession,
    LoopbackChannel, MoveAttempt, StandardRules, SubscriptionId, SyncError, SyncErrorKind,
    TimeControl, TransportChannel,
};

const E4_E5: &str = r#"{"type":"MOVE","pgn":"e2e4 e7e5","whiteTimeLeft":595,"blackTimeLeft":598}"#;

#[derive(Default)]
struct RecordingControl {
    calls: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl GameControl for RecordingControl {
    async fn resign(&self, game_id: &GameId) -> Result<(), SyncError> {
        self.calls.lock().unwrap().push(format!("resign {game_id}"));
        Ok(())
    }

    async fn undo(&self, game_id: &GameId) -> Result<(), SyncError> {
        self.calls.lock().unwrap().push(format!("undo {game_id}"));
        Ok(())
    }
}

/// Loopback channel whose broker refuses to drop subscriptions.
#[derive(Debug)]
struct StickyChannel(LoopbackChannel);

impl TransportChannel for StickyChannel {
    fn connect(&mut self) -> Result<(), SyncError> {
        self.0.connect()
    }

    fn disconnect(&mut self) -> Result<(), SyncError> {
        self.0.disconnect()
    }

    fn subscribe(&mut self, topic: &str) -> Result<SubscriptionId, SyncError> {
        self.0.subscribe(topic)
    }

    fn unsubscribe(&mut self, _id: SubscriptionId) -> Result<(), SyncError> {
        Err(SyncError::new(SyncErrorKind::Transport(
            "broker refused unsubscribe".to_string(),
        )))
    }

    fn publish(&mut self, destination: &str, body: String) -> Result<(), SyncError> {
        self.0.publish(destination, body)
    }
}

fn session() -> (
    GameSession<StandardRules, LoopbackChannel>,
    strictly_chess::LoopbackInjector,
    tokio::sync::mpsc::UnboundedReceiver<ChannelEvent>,
) {
    let (channel, injector, events) = LoopbackChannel::new();
    let session = GameSession::new(GameId::Number(5), StandardRules::new(), channel, TimeControl::Rapid);
    (session, injector, events)
}

fn subscribe_calls(session: &GameSession<StandardRules, LoopbackChannel>) -> usize {
    session
        .channel()
        .calls()
        .iter()
        .filter(|c| matches!(c, ChannelCall::Subscribe(_)))
        .count()
}

#[test]
fn test_subscribes_once_across_reconnects() {
    let (mut session, injector, mut events) = session();
    session.start().unwrap();
    session.start().unwrap();
    assert_eq!(session.sync().connection(), ConnectionState::Connecting);

    session.pump(&mut events);
    assert_eq!(session.sync().connection(), ConnectionState::Connected);
    assert_eq!(session.sync().status_line(), "Connected to Game Server");

    injector.connection_error("socket reset").unwrap();
    injector.reconnected().unwrap();
    session.pump(&mut events);

    assert_eq!(subscribe_calls(&session), 1);
    assert_eq!(
        session.channel().calls()[1],
        ChannelCall::Subscribe("/topic/game/5".to_string())
    );
}

#[test]
fn test_broadcasts_reconcile_in_order() {
    let (mut session, injector, mut events) = session();
    session.start().unwrap();
    session.pump(&mut events);

    let topic = session.topic();
    injector
        .deliver(&topic, r#"{"type":"MOVE","pgn":"e2e4","whiteTimeLeft":598,"blackTimeLeft":600}"#)
        .unwrap();
    injector.deliver(&topic, E4_E5).unwrap();
    assert_eq!(session.pump(&mut events), 2);

    let history = session.sync().history();
    assert_eq!(history.len(), 1);
    assert_eq!(history.turns()[0].black().as_ref().unwrap().label(), "e7e5");
    assert_eq!(session.sync().clocks().white, 595);
}

#[test]
fn test_stale_subscription_frames_ignored() {
    let (mut session, _injector, mut events) = session();
    session.start().unwrap();
    session.pump(&mut events);

    let result = session
        .handle_event(ChannelEvent::Message {
            subscription: SubscriptionId(999),
            body: E4_E5.to_string(),
        })
        .unwrap();
    assert!(result.is_none());
    assert!(session.sync().history().is_empty());
}

#[test]
fn test_transport_error_keeps_game_state() {
    let (mut session, injector, mut events) = session();
    session.start().unwrap();
    session.pump(&mut events);
    injector.deliver(&session.topic(), E4_E5).unwrap();
    injector.connection_error("timeout").unwrap();
    session.pump(&mut events);

    assert_eq!(session.sync().connection(), ConnectionState::Disconnected);
    assert_eq!(session.sync().status_line(), "Connection Error");
    assert_eq!(session.sync().history().ply_count(), 2);

    let attempt = session
        .drop_piece("g1".parse().unwrap(), "f3".parse().unwrap())
        .unwrap();
    assert_eq!(attempt, MoveAttempt::NotConnected);
    assert!(session.channel().published().is_empty());
}

#[test]
fn test_close_unsubscribes_and_disconnects() {
    let (mut session, injector, mut events) = session();
    session.start().unwrap();
    session.pump(&mut events);
    let id = session.subscription().unwrap();

    session.close().unwrap();
    session.close().unwrap();
    assert!(session.is_closed());
    assert_eq!(session.subscription(), None);
    assert_eq!(session.sync().connection(), ConnectionState::Disconnected);

    let channel = session.channel();
    assert!(!channel.is_connected());
    assert_eq!(channel.subscription_count(), 0);
    let calls = channel.calls();
    assert_eq!(calls[calls.len() - 2], ChannelCall::Unsubscribe(id));
    assert_eq!(calls[calls.len() - 1], ChannelCall::Disconnect);

    // Nothing routes to the closed session any more.
    assert!(!injector.deliver("/topic/game/5", E4_E5).unwrap());
}

#[test]
fn test_closed_session_ignores_events() {
    let (mut session, injector, mut events) = session();
    session.start().unwrap();
    session.pump(&mut events);
    session.close().unwrap();

    injector.reconnected().unwrap();
    session.pump(&mut events);
    assert_eq!(subscribe_calls(&session), 1);
    assert_eq!(session.subscription(), None);

    let err = session.start().unwrap_err();
    assert_eq!(err.kind, SyncErrorKind::NotConnected);
}

#[test]
fn test_drop_tears_down_subscription() {
    let (mut session, injector, mut events) = session();
    session.start().unwrap();
    session.pump(&mut events);
    assert!(injector.deliver("/topic/game/5", E4_E5).unwrap());

    drop(session);

    assert!(!injector.deliver("/topic/game/5", E4_E5).unwrap());
}

#[test]
fn test_failed_unsubscribe_still_disconnects() {
    let (channel, injector, mut events) = LoopbackChannel::new();
    let mut session = GameSession::new(
        GameId::Number(5),
        StandardRules::new(),
        StickyChannel(channel),
        TimeControl::Rapid,
    );
    session.start().unwrap();
    session.pump(&mut events);

    let err = session.close().unwrap_err();
    assert!(matches!(err.kind, SyncErrorKind::Transport(_)));

    // The channel stays with the session and was still disconnected.
    assert!(session.is_closed());
    assert!(!session.channel().0.is_connected());
    assert_eq!(session.channel().0.calls().last(), Some(&ChannelCall::Disconnect));
    assert!(!injector.deliver("/topic/game/5", E4_E5).unwrap());
}

#[test]
fn test_reset_refused_after_completion() {
    let (mut session, injector, mut events) = session();
    session.start().unwrap();
    session.pump(&mut events);
    injector.deliver(&session.topic(), E4_E5).unwrap();
    session.pump(&mut events);

    session.reset().unwrap();
    assert!(session.sync().history().is_empty());

    injector
        .deliver(&session.topic(), r#"{"type":"GAME_OVER","message":"Draw agreed"}"#)
        .unwrap();
    session.pump(&mut events);
    let err = session.reset().unwrap_err();
    assert_eq!(err.kind, SyncErrorKind::GameCompleted);
    assert_eq!(session.sync().outcome().message(), Some("Draw agreed"));
}

#[tokio::test]
async fn test_control_requires_connection() {
    let (mut session, _injector, mut events) = session();
    let control = RecordingControl::default();

    let err = session.resign(&control).await.unwrap_err();
    assert_eq!(err.kind, SyncErrorKind::NotConnected);

    session.start().unwrap();
    session.pump(&mut events);
    session.resign(&control).await.unwrap();
    session.undo(&control).await.unwrap();
    assert_eq!(*control.calls.lock().unwrap(), ["resign 5", "undo 5"]);
}

#[tokio::test]
async fn test_run_handles_queued_and_later_events() {
    let (mut session, injector, events) = session();
    session.start().unwrap();
    let topic = session.topic();

    let feeder = tokio::spawn(async move {
        // Wait for the subscription before delivering.
        for _ in 0..100 {
            if injector.deliver(&topic, E4_E5).unwrap() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session never subscribed");
    });

    // The channel keeps a sender of its own queue, so run() only ends
    // here by timing out.
    let _ = tokio::time::timeout(Duration::from_millis(200), session.run(events)).await;
    feeder.await.unwrap();

    assert_eq!(session.subscription(), Some(SubscriptionId(1)));
    assert_eq!(session.sync().history().ply_count(), 2);
}
