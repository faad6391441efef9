//! Session manager and publisher behavior against a scripted transport.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use herald_core::{EventBus, Publisher, SessionError, SessionState};
use herald_session::{
    Chat, OutgoingMessage, ReconnectPolicy, SessionEvent, SessionManager, SessionPublisher,
    SessionTransport, TransportEvent,
};
use tokio::sync::{broadcast, mpsc, watch};

/// Transport that replays a script on every connect and records sends.
#[derive(Default)]
struct FakeTransport {
    script: Vec<TransportEvent>,
    chats: Vec<Chat>,
    connects: AtomicUsize,
    current: StdMutex<Option<mpsc::Sender<TransportEvent>>>,
    sent: StdMutex<Vec<(String, OutgoingMessage)>>,
}

impl FakeTransport {
    fn scripted(script: Vec<TransportEvent>) -> Self {
        Self {
            script,
            chats: vec![
                Chat {
                    id: "111@g.us".into(),
                    name: "Weekend Sales Team".into(),
                    is_group: true,
                },
                Chat {
                    id: "1@c.us".into(),
                    name: "Alice".into(),
                    is_group: false,
                },
            ],
            ..Default::default()
        }
    }

    async fn emit(&self, event: TransportEvent) {
        let tx = self.current.lock().unwrap().clone().expect("not connected");
        tx.send(event).await.unwrap();
    }

    fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionTransport for FakeTransport {
    async fn connect(&self) -> Result<mpsc::Receiver<TransportEvent>, SessionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(16);
        for event in &self.script {
            tx.send(event.clone()).await.unwrap();
        }
        *self.current.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn chats(&self) -> Result<Vec<Chat>, SessionError> {
        Ok(self.chats.clone())
    }

    async fn send(&self, chat_id: &str, message: OutgoingMessage) -> Result<(), SessionError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), message));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        self.current.lock().unwrap().take();
        Ok(())
    }
}

async fn next_event(rx: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("session event channel closed")
}

#[tokio::test]
async fn test_pairing_flow_reaches_ready_in_order() {
    let transport = Arc::new(FakeTransport::scripted(vec![]));
    let bus = EventBus::new();
    let mut dashboard = bus.subscribe();
    let session = SessionManager::new(transport.clone(), bus);
    let mut events = session.subscribe();

    assert_eq!(session.current_state(), SessionState::Disconnected);
    assert!(session.start().await);
    assert!(!session.start().await, "second start must be a no-op");

    // Give the lifecycle task a chance to connect.
    while transport.connects.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    while transport.current.lock().unwrap().is_none() {
        tokio::task::yield_now().await;
    }

    transport.emit(TransportEvent::PairingCode("qr-payload".into())).await;
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::PairingChallenge("qr-payload".into())
    );
    assert_eq!(session.current_state(), SessionState::PairingRequested);
    assert!(!session.is_ready());

    transport.emit(TransportEvent::Authenticated).await;
    transport.emit(TransportEvent::Ready).await;
    assert_eq!(next_event(&mut events).await, SessionEvent::Authenticated);
    assert_eq!(next_event(&mut events).await, SessionEvent::Ready);
    assert!(session.is_ready());

    let first = dashboard.recv().await.unwrap();
    assert_eq!(first.event, "qr");
    assert_eq!(first.data, Some(serde_json::json!("qr-payload")));

    assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_auth_failure_reports_disconnect_and_allows_restart() {
    let transport = Arc::new(FakeTransport::scripted(vec![
        TransportEvent::PairingCode("qr".into()),
        TransportEvent::AuthFailure("scan expired".into()),
    ]));
    let session = SessionManager::new(transport.clone(), EventBus::new());
    let mut events = session.subscribe();

    assert!(session.start().await);
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::PairingChallenge("qr".into())
    );
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Disconnected("authentication failed: scan expired".into())
    );
    assert_eq!(session.current_state(), SessionState::Disconnected);

    // The attempt is over; a new start begins a fresh one.
    let mut restarted = false;
    for _ in 0..100 {
        if session.start().await {
            restarted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(restarted);
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::PairingChallenge("qr".into())
    );
    assert_eq!(transport.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_wait_until_ready_completes_on_ready() {
    let transport = Arc::new(FakeTransport::scripted(vec![
        TransportEvent::Authenticated,
        TransportEvent::Ready,
    ]));
    let session = SessionManager::new(transport, EventBus::new());
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let waiter = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.wait_until_ready(shutdown_rx).await })
    };
    session.start().await;

    assert!(waiter.await.unwrap());
}

#[tokio::test]
async fn test_wait_until_ready_cancelled_by_shutdown() {
    let transport = Arc::new(FakeTransport::scripted(vec![]));
    let session = SessionManager::new(transport, EventBus::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let waiter = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.wait_until_ready(shutdown_rx).await })
    };
    shutdown_tx.send(true).unwrap();

    assert!(!waiter.await.unwrap());
}

#[tokio::test]
async fn test_shutdown_disconnects_and_blocks_restart() {
    let transport = Arc::new(FakeTransport::scripted(vec![TransportEvent::Ready]));
    let session = SessionManager::new(transport.clone(), EventBus::new());
    let mut events = session.subscribe();

    session.start().await;
    assert_eq!(next_event(&mut events).await, SessionEvent::Authenticated);
    assert_eq!(next_event(&mut events).await, SessionEvent::Ready);

    session.shutdown().await;
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Disconnected("shutdown".into())
    );
    assert_eq!(session.current_state(), SessionState::Disconnected);
    assert!(!session.start().await);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_reconnect_gives_up() {
    let transport = Arc::new(FakeTransport::scripted(vec![TransportEvent::Disconnected(
        "boom".into(),
    )]));
    let session = SessionManager::with_reconnect(
        transport.clone(),
        EventBus::new(),
        ReconnectPolicy::bounded(2),
    );

    session.start().await;
    // Paused time auto-advances through the backoff sleeps.
    tokio::time::sleep(Duration::from_secs(3600)).await;

    assert_eq!(transport.connects.load(Ordering::SeqCst), 3);
    assert_eq!(session.current_state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_publisher_refuses_when_not_ready() {
    let transport = Arc::new(FakeTransport::scripted(vec![]));
    let session = SessionManager::new(transport.clone(), EventBus::new());
    let publisher = SessionPublisher::new(session);

    assert!(!publisher.is_ready());
    assert_eq!(
        publisher.send_text("Sales", "hi").await,
        Err(SessionError::NotReady)
    );
    assert_eq!(
        publisher.send_image("Sales", b"img", "cap", "image/png").await,
        Err(SessionError::NotReady)
    );
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_publisher_resolves_and_sends_when_ready() {
    let transport = Arc::new(FakeTransport::scripted(vec![TransportEvent::Ready]));
    let session = SessionManager::new(transport.clone(), EventBus::new());
    let mut events = session.subscribe();
    session.start().await;
    next_event(&mut events).await;
    next_event(&mut events).await;

    let publisher = SessionPublisher::new(Arc::clone(&session));
    publisher.send_text("sales team", "Good morning").await.unwrap();
    publisher
        .send_image("111@g.us", &[7, 7], "Nice house", "image/jpeg")
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "111@g.us");
    assert_eq!(
        sent[0].1,
        OutgoingMessage::Text {
            text: "Good morning".into()
        }
    );
    assert_eq!(
        sent[1].1,
        OutgoingMessage::Media {
            mime_type: "image/jpeg".into(),
            data: vec![7, 7],
            caption: "Nice house".into(),
        }
    );

    assert_eq!(
        publisher.send_text("Nonexistent", "hi").await,
        Err(SessionError::DestinationNotFound("Nonexistent".into()))
    );

    let groups = publisher.list_groups().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Weekend Sales Team");
}
