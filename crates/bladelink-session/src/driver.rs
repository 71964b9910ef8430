//! The task that owns the session.
//!
//! Every piece of mutable session state lives here: the socket, the read
//! buffer, the heartbeat timers and the reconnect sleep. Each phase of the
//! lifecycle is one async method that returns the next [`Step`]; leaving a
//! phase drops whatever it owned, so teardown is just scope exit.

use std::future;
use std::pin::Pin;
use std::time::Duration;

use bladelink_frame::{catalog, parse_frame, Command, EventKind, HEARTBEAT};
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};
use tokio_util::codec::Decoder;
use tracing::{debug, info, trace, warn};

use crate::clock::HeartbeatClock;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::state::{ConnectionState, Notification, Status};
use crate::transport::{self, Link, WriteRequest};

/// Messages from [`ConnectionManager`](crate::ConnectionManager) handles.
pub(crate) enum Request {
    /// Start (or restart) a session with `config`. Acked once the state is
    /// `Connecting`.
    Connect {
        config: SessionConfig,
        done: oneshot::Sender<()>,
    },
    /// Write one already-encoded frame.
    Send {
        frame: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        done: oneshot::Sender<()>,
    },
    /// Disconnect and stop the driver.
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

enum Step {
    Idle,
    Connect,
    Online(Link),
    Backoff,
    Exit,
}

enum Beat {
    Due,
    Expired,
}

/// Heartbeat timers for one connected session.
struct Heartbeat {
    clock: HeartbeatClock,
    ticker: Interval,
    expiry: Pin<Box<Sleep>>,
}

impl Heartbeat {
    fn start(config: &SessionConfig) -> Self {
        let now = Instant::now();
        let clock = HeartbeatClock::start(config.heartbeat_interval, config.heartbeat_timeout, now);
        let mut ticker = time::interval_at(now + config.heartbeat_interval, config.heartbeat_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let expiry = Box::pin(time::sleep_until(clock.deadline()));
        Self {
            clock,
            ticker,
            expiry,
        }
    }

    fn record_inbound(&mut self) {
        self.clock.record_inbound(Instant::now());
        self.expiry.as_mut().reset(self.clock.deadline());
    }

    fn record_sent(&mut self) {
        self.clock.record_heartbeat_sent(Instant::now());
    }
}

/// Resolves when a heartbeat is due or the peer has gone silent. Never
/// resolves when heartbeats are disabled.
async fn next_beat(heartbeat: &mut Option<Heartbeat>) -> Beat {
    let Some(heartbeat) = heartbeat else {
        return future::pending().await;
    };
    tokio::select! {
        biased;
        () = &mut heartbeat.expiry => Beat::Expired,
        _ = heartbeat.ticker.tick() => Beat::Due,
    }
}

pub(crate) struct Driver {
    requests: mpsc::Receiver<Request>,
    notify: mpsc::UnboundedSender<Notification>,
    state: watch::Sender<ConnectionState>,
    config: Option<SessionConfig>,
    failed_attempts: u32,
}

impl Driver {
    pub fn new(
        requests: mpsc::Receiver<Request>,
        notify: mpsc::UnboundedSender<Notification>,
        state: watch::Sender<ConnectionState>,
    ) -> Self {
        Self {
            requests,
            notify,
            state,
            config: None,
            failed_attempts: 0,
        }
    }

    pub async fn run(mut self) {
        let mut step = Step::Idle;
        loop {
            step = match step {
                Step::Idle => self.idle().await,
                Step::Connect => self.connecting().await,
                Step::Online(link) => self.online(link).await,
                Step::Backoff => self.backoff().await,
                Step::Exit => break,
            };
        }
        debug!("connection driver stopped");
    }

    async fn idle(&mut self) -> Step {
        loop {
            let request = self.requests.recv().await;
            if let Some(step) = self.handle_request(request, None) {
                return step;
            }
        }
    }

    async fn connecting(&mut self) -> Step {
        let Some(config) = self.config.clone() else {
            self.settle_disconnected();
            return Step::Idle;
        };
        debug!(addr = %config.address(), attempt = self.failed_attempts + 1, "connecting");

        let attempt = transport::connect(&config.host, config.port, config.connect_timeout);
        tokio::pin!(attempt);
        loop {
            tokio::select! {
                biased;
                request = self.requests.recv() => {
                    if let Some(step) = self.handle_request(request, None) {
                        return step;
                    }
                }
                result = &mut attempt => {
                    return match result {
                        Ok(stream) => {
                            self.failed_attempts = 0;
                            Step::Online(Link::open(stream))
                        }
                        Err(err) => {
                            self.failed_attempts += 1;
                            self.fail(format!("connect to {} failed: {err}", config.address()))
                        }
                    };
                }
            }
        }
    }

    async fn online(&mut self, mut link: Link) -> Step {
        let Some(config) = self.config.clone() else {
            self.settle_disconnected();
            return Step::Idle;
        };
        self.transition(ConnectionState::Connected, Status::Ok, None);
        greet(&config, &link);

        let mut heartbeat = config.heartbeat_enabled().then(|| Heartbeat::start(&config));
        loop {
            link.reserve();
            tokio::select! {
                biased;
                request = self.requests.recv() => {
                    if let Some(step) = self.handle_request(request, Some(&link)) {
                        return step;
                    }
                }
                failure = &mut link.write_failed => {
                    let message = match failure {
                        Ok(err) => format!("write failed: {err}"),
                        Err(_) => "writer stopped".to_string(),
                    };
                    return self.fail(message);
                }
                read = link.reader.read_buf(&mut link.buffer) => match read {
                    Ok(0) => return self.fail("connection closed by peer".to_string()),
                    Ok(n) => {
                        trace!(bytes = n, "inbound");
                        if let Some(heartbeat) = heartbeat.as_mut() {
                            heartbeat.record_inbound();
                        }
                        self.drain_frames(&mut link);
                    }
                    Err(err) => return self.fail(format!("read failed: {err}")),
                },
                beat = next_beat(&mut heartbeat) => match beat {
                    Beat::Due => {
                        trace!("heartbeat");
                        let frame = HEARTBEAT.to_string();
                        if link.write(WriteRequest { frame, reply: None }).is_err() {
                            debug!("writer gone before heartbeat");
                        }
                        if let Some(heartbeat) = heartbeat.as_mut() {
                            heartbeat.record_sent();
                        }
                    }
                    Beat::Expired => {
                        self.transition(
                            ConnectionState::Reconnecting,
                            Status::ConnectionFailure,
                            Some("heartbeat lost".to_string()),
                        );
                        return Step::Backoff;
                    }
                },
            }
        }
    }

    async fn backoff(&mut self) -> Step {
        let delay = self
            .config
            .as_ref()
            .map_or(Duration::ZERO, |config| config.reconnect_delay);
        debug!(?delay, "reconnect scheduled");

        let sleep = time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;
                request = self.requests.recv() => {
                    if let Some(step) = self.handle_request(request, None) {
                        return step;
                    }
                }
                () = &mut sleep => {
                    self.transition(ConnectionState::Connecting, Status::Connecting, None);
                    return Step::Connect;
                }
            }
        }
    }

    /// Apply one request. `Some` means leave the current phase.
    fn handle_request(&mut self, request: Option<Request>, link: Option<&Link>) -> Option<Step> {
        let Some(request) = request else {
            // Every manager handle is gone.
            self.settle_disconnected();
            return Some(Step::Exit);
        };

        match request {
            Request::Connect { config, done } => {
                info!(addr = %config.address(), "connect requested");
                self.config = Some(config);
                self.failed_attempts = 0;
                self.transition(ConnectionState::Connecting, Status::Connecting, None);
                let _ = done.send(());
                Some(Step::Connect)
            }
            Request::Send { frame, reply } => {
                let Some(link) = link else {
                    let _ = reply.send(Err(SessionError::NotConnected));
                    return None;
                };
                let request = WriteRequest {
                    frame,
                    reply: Some(reply),
                };
                if let Err(rejected) = link.write(request) {
                    if let Some(reply) = rejected.reply {
                        let _ = reply.send(Err(SessionError::NotConnected));
                    }
                }
                None
            }
            Request::Disconnect { done } => {
                self.settle_disconnected();
                let _ = done.send(());
                Some(Step::Idle)
            }
            Request::Shutdown { done } => {
                self.settle_disconnected();
                let _ = done.send(());
                Some(Step::Exit)
            }
        }
    }

    /// Hand every complete line in the read buffer to the caller, in order.
    fn drain_frames(&self, link: &mut Link) {
        loop {
            match link.codec.decode(&mut link.buffer) {
                Ok(Some(line)) => {
                    let event = parse_frame(&line);
                    if event.kind == EventKind::Unrecognized {
                        debug!(frame = %line, "unrecognized frame");
                    } else {
                        trace!(frame = %line, kind = %event.kind, "frame");
                    }
                    let _ = self.notify.send(Notification::Event(event));
                }
                Ok(None) => break,
                Err(err) => warn!(error = %err, "discarding inbound line"),
            }
        }
    }

    /// Socket-level failure: retry or give up depending on configuration.
    fn fail(&mut self, message: String) -> Step {
        let retry = self.config.as_ref().is_some_and(|config| {
            config.retry_on_error
                && config
                    .max_reconnect_attempts
                    .map_or(true, |max| self.failed_attempts < max)
        });
        if retry {
            self.transition(
                ConnectionState::Reconnecting,
                Status::ConnectionFailure,
                Some(message),
            );
            Step::Backoff
        } else {
            self.transition(
                ConnectionState::Disconnected,
                Status::ConnectionFailure,
                Some(message),
            );
            Step::Idle
        }
    }

    /// Move to `Disconnected` unless already there.
    fn settle_disconnected(&mut self) {
        if *self.state.borrow() != ConnectionState::Disconnected {
            self.transition(ConnectionState::Disconnected, Status::Disconnected, None);
        }
    }

    fn transition(&mut self, state: ConnectionState, status: Status, message: Option<String>) {
        self.state.send_replace(state);
        let addr = self
            .config
            .as_ref()
            .map(SessionConfig::address)
            .unwrap_or_default();
        match &message {
            Some(reason) => warn!(%addr, %state, %status, %reason, "connection state changed"),
            None => info!(%addr, %state, %status, "connection state changed"),
        }
        let _ = self.notify.send(Notification::StatusChanged {
            state,
            status,
            message,
        });
    }
}

/// Frames sent as soon as a session comes up.
fn greet(config: &SessionConfig, link: &Link) {
    if let Some(name) = &config.client_name {
        queue_command(link, &catalog::set_interface_id(name));
    }
    if config.identify_on_connect {
        queue_command(link, &catalog::system_info());
    }
}

fn queue_command(link: &Link, command: &Command) {
    match command.encode() {
        Ok(frame) => {
            if link.write(WriteRequest { frame, reply: None }).is_err() {
                debug!(%command, "writer gone before greeting");
            }
        }
        Err(err) => warn!(error = %err, frame_target = command.target(), "skipping greeting frame"),
    }
}
