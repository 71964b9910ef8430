use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bladelink_frame::{build_frame, ensure_encodable, Command};
use futures_util::Stream;
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::SessionConfig;
use crate::driver::{Driver, Request};
use crate::error::{Result, SessionError};
use crate::state::{ConnectionState, Notification};

const REQUEST_QUEUE: usize = 64;

/// Handle to one device session.
///
/// Cheap to clone; all clones drive the same session. The session stops when
/// [`shutdown`](Self::shutdown) is called or the last handle is dropped.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    requests: mpsc::Sender<Request>,
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionManager {
    /// Spawn the session driver on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new() -> (Self, Notifications) {
        let (requests, request_rx) = mpsc::channel(REQUEST_QUEUE);
        let (notify, notifications) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        tokio::spawn(Driver::new(request_rx, notify, state_tx).run());
        (
            Self { requests, state },
            Notifications {
                inner: notifications,
            },
        )
    }

    /// Connect to `host:port` with default timings.
    ///
    /// `heartbeat_interval_ms == 0` disables heartbeats and silence detection.
    pub async fn connect(&self, host: &str, port: u16, heartbeat_interval_ms: u32) -> Result<()> {
        let config = SessionConfig::new(host, port)
            .with_heartbeat_interval(Duration::from_millis(u64::from(heartbeat_interval_ms)));
        self.connect_with_config(config).await
    }

    /// Start a session. Returns once the manager is `Connecting`; progress is
    /// reported through [`Notifications`].
    ///
    /// An existing session is torn down first.
    pub async fn connect_with_config(&self, config: SessionConfig) -> Result<()> {
        config.validate()?;
        let (done, ack) = oneshot::channel();
        self.request(Request::Connect { config, done }).await?;
        ack.await.map_err(|_| SessionError::Closed)
    }

    /// Apply new settings: tear down the current session and reconnect.
    pub async fn reconfigure(&self, config: SessionConfig) -> Result<()> {
        self.connect_with_config(config).await
    }

    /// Encode and write `command`. Resolves once the bytes are written.
    ///
    /// Fails with [`SessionError::NotConnected`] outside `Connected`; nothing
    /// is queued in that case.
    pub async fn send(&self, command: &Command) -> Result<()> {
        let frame = command.encode()?;
        self.send_raw(&frame).await
    }

    /// Build and write `<TARGET[:SUBADDR]|K:V,...>`.
    pub async fn send_frame<K, V>(
        &self,
        target: &str,
        subaddr: Option<&str>,
        params: &[(K, V)],
    ) -> Result<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let frame = build_frame(target, subaddr, params)?;
        self.send_raw(&frame).await
    }

    /// Write a pre-formatted frame line. The line terminator is added here.
    pub async fn send_raw(&self, frame: &str) -> Result<()> {
        ensure_encodable(frame)?;
        if !self.state().is_connected() {
            return Err(SessionError::NotConnected);
        }
        let (reply, result) = oneshot::channel();
        self.request(Request::Send {
            frame: frame.to_string(),
            reply,
        })
        .await?;
        // A dropped reply means the session went down before the write ran.
        result.await.unwrap_or(Err(SessionError::NotConnected))
    }

    /// Close the session and cancel every timer and pending reconnect.
    /// Idempotent.
    pub async fn disconnect(&self) -> Result<()> {
        let (done, ack) = oneshot::channel();
        self.request(Request::Disconnect { done }).await?;
        ack.await.map_err(|_| SessionError::Closed)
    }

    /// Disconnect and stop the background task. Later calls fail with
    /// [`SessionError::Closed`].
    pub async fn shutdown(&self) -> Result<()> {
        let (done, ack) = oneshot::channel();
        self.request(Request::Shutdown { done }).await?;
        ack.await.map_err(|_| SessionError::Closed)
    }

    /// Latest lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Wait until the session reaches `target`.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<()> {
        let mut state = self.state.clone();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| SessionError::Closed)
    }

    async fn request(&self, request: Request) -> Result<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

/// Status changes and inbound events, in the order they happened.
///
/// Also usable as a [`Stream`].
#[derive(Debug)]
pub struct Notifications {
    inner: mpsc::UnboundedReceiver<Notification>,
}

impl Notifications {
    /// Next notification, or `None` once the session has stopped.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.inner.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Notification> {
        self.inner.try_recv().ok()
    }
}

impl Stream for Notifications {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Notification>> {
        self.inner.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use bladelink_frame::catalog;

    use super::*;

    #[tokio::test]
    async fn starts_disconnected() {
        let (manager, mut notifications) = ConnectionManager::new();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(notifications.try_recv().is_none());
    }

    #[tokio::test]
    async fn send_while_disconnected_fails_fast() {
        let (manager, _notifications) = ConnectionManager::new();
        let err = manager
            .send(&catalog::umix_input_on(1, 2, true))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
    }

    #[tokio::test]
    async fn invalid_command_rejected_before_state_check() {
        let (manager, _notifications) = ConnectionManager::new();
        let err = manager.send(&Command::new("BAD<")).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidCommand(_)));

        let err = manager.send_raw("<A>\r\n<B>").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidCommand(_)));
    }

    #[tokio::test]
    async fn connect_rejects_invalid_config() {
        let (manager, _notifications) = ConnectionManager::new();
        let err = manager.connect("", 93, 1000).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfig(_)));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_when_idle_is_silent() {
        let (manager, mut notifications) = ConnectionManager::new();
        manager.disconnect().await.unwrap();
        manager.disconnect().await.unwrap();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(notifications.try_recv().is_none());
    }

    #[tokio::test]
    async fn shutdown_closes_manager() {
        let (manager, mut notifications) = ConnectionManager::new();
        manager.shutdown().await.unwrap();
        assert!(notifications.recv().await.is_none());
        assert!(matches!(
            manager.disconnect().await,
            Err(SessionError::Closed)
        ));
    }
}
