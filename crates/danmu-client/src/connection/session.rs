//! Room session
//!
//! One [`Session`] watches one room. `start` resolves the room through the
//! [`RoomApi`], connects, sends the enter frame and hands the connection to a
//! supervisor task. The supervisor owns the read half and runs the read loop;
//! a heartbeat task per connection generation shares the write half with it.
//! When a read fails, the generation is cancelled, its heartbeat task is
//! awaited, and a new connection is made with the next host in rotation.

use super::config::SessionConfig;
use super::credentials::Credentials;
use super::error::{SessionError, SessionResult, TransportError};
use super::hosts::HostRotation;
use super::state::{SessionState, StateCell};
use super::transport::{Connector, Frame, FrameSink, FrameStream, WsConnector};
use crate::dispatch::{EventDispatcher, EventDispatcherConfig};
use crate::handlers::HandlerRegistry;
use crate::protocol::codec;
use bytes::Bytes;
use danmu_api::{HttpRoomApi, RoomApi};
use danmu_common::{ApiSettings, AppConfig};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Who the session is in the room
#[derive(Debug, Clone, Default)]
struct Identity {
    /// Real room id; the requested id until discovery resolves it
    room_id: u64,
    /// 0 when anonymous or the lookup failed
    uid: u64,
    buvid: String,
    /// One-time key from discovery, may be empty
    token: String,
}

struct SessionInner {
    id: String,
    requested_room_id: u64,
    config: SessionConfig,
    api: Arc<dyn RoomApi>,
    connector: Arc<dyn Connector>,
    dispatcher: EventDispatcher,
    state: StateCell,
    cookie: Mutex<String>,
    identity: RwLock<Identity>,
    hosts: Mutex<HostRotation>,
    current_host: RwLock<Option<String>>,
    /// Every outbound frame goes through this lock
    writer: AsyncMutex<Option<Box<dyn FrameSink>>>,
    /// Cancelled by `stop`; parent of every connection generation
    root: Mutex<Option<CancellationToken>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    span: tracing::Span,
}

/// A live connection to one room's chat feed
///
/// Cloning is cheap and every clone controls the same session. The session
/// keeps running until [`Session::stop`] is called, even if all handles are
/// dropped.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

/// Builder for [`Session`]
pub struct SessionBuilder {
    room_id: u64,
    cookie: String,
    host: Option<String>,
    config: SessionConfig,
    api: Option<Arc<dyn RoomApi>>,
    api_settings: ApiSettings,
    connector: Option<Arc<dyn Connector>>,
    handlers: HandlerRegistry,
}

impl SessionBuilder {
    pub fn new(room_id: u64) -> Self {
        Self {
            room_id,
            cookie: String::new(),
            host: None,
            config: SessionConfig::default(),
            api: None,
            api_settings: ApiSettings::default(),
            connector: None,
            handlers: HandlerRegistry::new(),
        }
    }

    #[must_use]
    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = cookie.into();
        self
    }

    /// Pin a chat host instead of using the discovered list
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Room discovery implementation; defaults to [`HttpRoomApi`]
    #[must_use]
    pub fn room_api(mut self, api: Arc<dyn RoomApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Settings for the default [`HttpRoomApi`]
    #[must_use]
    pub fn api_settings(mut self, settings: ApiSettings) -> Self {
        self.api_settings = settings;
        self
    }

    /// Transport; defaults to [`WsConnector`]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Share a handler registry with the session
    #[must_use]
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn build(self) -> SessionResult<Session> {
        if self.config.heartbeat_interval.is_zero() {
            return Err(SessionError::Configuration(
                "heartbeat interval must be non-zero".to_string(),
            ));
        }

        let api: Arc<dyn RoomApi> = match self.api {
            Some(api) => api,
            None => Arc::new(HttpRoomApi::new(&self.api_settings)?),
        };
        let connector: Arc<dyn Connector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(WsConnector::new()),
        };

        let mut hosts = HostRotation::new();
        if let Some(host) = self.host {
            hosts.pin(host);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("session", session_id = %id, room_id = self.room_id);
        let dispatcher = EventDispatcher::new(
            EventDispatcherConfig {
                max_in_flight: self.config.max_in_flight_handlers,
            },
            self.handlers,
        );

        Ok(Session {
            inner: Arc::new(SessionInner {
                id,
                requested_room_id: self.room_id,
                config: self.config,
                api,
                connector,
                dispatcher,
                state: StateCell::new(),
                cookie: Mutex::new(self.cookie),
                identity: RwLock::new(Identity {
                    room_id: self.room_id,
                    ..Identity::default()
                }),
                hosts: Mutex::new(hosts),
                current_host: RwLock::new(None),
                writer: AsyncMutex::new(None),
                root: Mutex::new(None),
                supervisor: Mutex::new(None),
                span,
            }),
        })
    }
}

impl Session {
    pub fn builder(room_id: u64) -> SessionBuilder {
        SessionBuilder::new(room_id)
    }

    /// Build a session from loaded application config
    pub fn from_config(config: &AppConfig) -> SessionResult<Self> {
        let mut builder = SessionBuilder::new(config.room.room_id)
            .cookie(config.room.cookie.clone())
            .config(SessionConfig::from(&config.connection))
            .api_settings(config.api.clone());
        if let Some(host) = &config.room.host {
            builder = builder.host(host.clone());
        }
        builder.build()
    }

    /// Discover, connect and start the background loops.
    ///
    /// Returns once the first connection is up and the enter frame has been
    /// sent. Connect failures are retried until the configured attempt limit,
    /// forever by default. Calling [`Session::stop`] meanwhile makes this
    /// return [`SessionError::Stopped`].
    pub async fn start(&self) -> SessionResult<()> {
        let inner = &self.inner;
        let root = {
            let mut slot = inner.root.lock();
            if !inner.state.advance(SessionState::Discovering) {
                return Err(match inner.state.get() {
                    SessionState::Closed => SessionError::Stopped,
                    _ => SessionError::AlreadyStarted,
                });
            }
            let root = CancellationToken::new();
            *slot = Some(root.clone());
            root
        };

        let startup = async {
            let credentials = Credentials::parse(&inner.cookie.lock())?;
            tokio::select! {
                () = root.cancelled() => return Err(SessionError::Stopped),
                discovered = inner.discover(&credentials) => discovered?,
            }

            inner.state.advance(SessionState::Connecting);
            inner.connect(&root).await
        }
        .instrument(inner.span.clone());

        match startup.await {
            Ok(stream) => {
                inner.state.advance(SessionState::Connected);
                let supervisor = tokio::spawn(
                    inner
                        .clone()
                        .supervise(root, stream)
                        .instrument(inner.span.clone()),
                );
                *inner.supervisor.lock() = Some(supervisor);
                Ok(())
            }
            Err(e) => {
                root.cancel();
                inner.root.lock().take();
                inner.state.advance(SessionState::Uninitialized);
                inner.span.in_scope(|| tracing::warn!(error = %e, "Session failed to start"));
                Err(e)
            }
        }
    }

    /// Signal every loop to exit. Idempotent.
    ///
    /// Returns without waiting; handler tasks already started keep running.
    pub fn stop(&self) {
        // Held across the transition so a concurrent `start` either sees
        // `Closed` or has its token cancelled here.
        let root = self.inner.root.lock();
        if let Some(root) = root.as_ref() {
            root.cancel();
        }
        if self.inner.state.advance(SessionState::Closed) {
            self.inner.span.in_scope(|| tracing::info!("Session stopped"));
        }
    }

    /// Stop and wait for the supervisor to close the connection
    pub async fn shutdown(&self) {
        self.stop();
        let supervisor = self.inner.supervisor.lock().take();
        if let Some(supervisor) = supervisor {
            if let Err(e) = supervisor.await {
                tracing::error!(error = %e, "Session supervisor failed");
            }
        }
    }

    /// Replace the login cookie. Only allowed before `start`.
    pub fn set_cookie(&self, cookie: impl Into<String>) -> SessionResult<()> {
        if self.inner.state.get() != SessionState::Uninitialized {
            return Err(SessionError::AlreadyStarted);
        }
        *self.inner.cookie.lock() = cookie.into();
        Ok(())
    }

    /// Pin a chat host; used from the next connect attempt on
    pub fn set_host(&self, host: impl Into<String>) {
        self.inner.hosts.lock().pin(host);
    }

    /// Pin the default chat host
    pub fn use_default_host(&self) {
        self.inner.hosts.lock().use_default();
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Resolved room id
    pub fn room_id(&self) -> u64 {
        self.inner.identity.read().room_id
    }

    pub fn uid(&self) -> u64 {
        self.inner.identity.read().uid
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.get()
    }

    /// Watch state changes, e.g. to notice reconnects
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Host of the current or most recent connection
    pub fn current_host(&self) -> Option<String> {
        self.inner.current_host.read().clone()
    }

    /// Candidate hosts in rotation order
    pub fn hosts(&self) -> Vec<String> {
        self.inner.hosts.lock().hosts().to_vec()
    }

    /// Connect attempts made so far
    pub fn connect_attempts(&self) -> u64 {
        self.inner.hosts.lock().attempts()
    }

    /// Registry for adding handlers, before or after `start`
    pub fn handlers(&self) -> &HandlerRegistry {
        self.inner.dispatcher.registry()
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.inner.dispatcher
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("room_id", &self.room_id())
            .field("state", &self.state())
            .field("host", &self.current_host())
            .field("pinned_host", &self.inner.hosts.lock().is_pinned())
            .finish()
    }
}

impl SessionInner {
    /// Resolve room id, hosts, token and uid. Only a missing room id is fatal.
    async fn discover(&self, credentials: &Credentials) -> SessionResult<()> {
        let requested = self.requested_room_id;

        let room_id = match self.api.room_info(requested).await {
            Ok(info) if info.room_id != 0 => info.room_id,
            Ok(_) if requested != 0 => requested,
            Ok(_) => {
                return Err(SessionError::Configuration(
                    "room id 0 does not resolve to a room".to_string(),
                ));
            }
            Err(e) if requested != 0 => {
                tracing::warn!(error = %e, "Room lookup failed, using requested id");
                requested
            }
            Err(e) => return Err(e.into()),
        };

        let token = match self.api.danmu_info(room_id, credentials.cookie()).await {
            Ok(info) => {
                let applied = self.hosts.lock().apply_discovered(info.hosts());
                tracing::debug!(hosts = info.host_list.len(), applied, "Chat hosts discovered");
                info.token
            }
            Err(e) => {
                tracing::warn!(error = %e, "Host discovery failed, using default host");
                self.hosts.lock().reset_to_default();
                String::new()
            }
        };

        let uid = match credentials.cookie() {
            Some(cookie) => self.api.user_id(cookie).await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "User lookup failed, entering anonymously");
                0
            }),
            None => 0,
        };

        tracing::info!(room_id, uid, "Room resolved");
        *self.identity.write() = Identity {
            room_id,
            uid,
            buvid: credentials.buvid().to_string(),
            token,
        };
        Ok(())
    }

    fn enter_frame(&self) -> SessionResult<Bytes> {
        let identity = self.identity.read();
        Ok(codec::encode_enter(
            identity.uid,
            &identity.buvid,
            identity.room_id,
            &identity.token,
        )?)
    }

    /// Connect to the next host until one accepts the enter frame
    async fn connect(&self, root: &CancellationToken) -> SessionResult<Box<dyn FrameStream>> {
        let enter = self.enter_frame()?;
        let mut attempts: u32 = 0;

        loop {
            let host = self.hosts.lock().next_host();
            attempts += 1;

            let opened = tokio::select! {
                () = root.cancelled() => return Err(SessionError::Stopped),
                opened = self.open(&host, enter.clone()) => opened,
            };

            match opened {
                Ok(stream) => {
                    tracing::info!(host = %host, attempt = attempts, "Connected");
                    *self.current_host.write() = Some(host);
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::warn!(host = %host, attempt = attempts, error = %e, "Connect failed");
                    if self
                        .config
                        .max_connect_attempts
                        .is_some_and(|max| attempts >= max)
                    {
                        return Err(SessionError::Connect {
                            host,
                            attempts,
                            source: e,
                        });
                    }
                }
            }

            tokio::select! {
                () = root.cancelled() => return Err(SessionError::Stopped),
                () = time::sleep(self.config.connect_retry_delay) => {}
            }
        }
    }

    /// Handshake with `host` and send the enter frame
    async fn open(&self, host: &str, enter: Bytes) -> Result<Box<dyn FrameStream>, TransportError> {
        let (mut sink, stream) = self.connector.connect(host).await?;

        let mut writer = self.writer.lock().await;
        writer.take();
        sink.send(enter).await?;
        tracing::debug!(host = %host, "Enter frame sent");
        *writer = Some(sink);
        Ok(stream)
    }

    async fn send_frame(&self, frame: Bytes) -> Result<(), TransportError> {
        match self.writer.lock().await.as_mut() {
            Some(sink) => sink.send(frame).await,
            None => Err(TransportError::Closed("not connected".to_string())),
        }
    }

    async fn close_writer(&self) {
        if let Some(mut sink) = self.writer.lock().await.take() {
            if let Err(e) = sink.close().await {
                tracing::debug!(error = %e, "Error closing connection");
            }
        }
    }

    /// Own the connection until `stop`, reconnecting after read failures
    async fn supervise(self: Arc<Self>, root: CancellationToken, mut stream: Box<dyn FrameStream>) {
        loop {
            let generation = root.child_token();
            let heartbeat = tokio::spawn(
                self.clone()
                    .heartbeat_loop(generation.clone())
                    .instrument(tracing::Span::current()),
            );

            let failure = self.read_loop(&generation, &mut stream).await;
            generation.cancel();
            if let Err(e) = heartbeat.await {
                tracing::error!(error = %e, "Heartbeat task failed");
            }

            let Some(error) = failure else { break };
            tracing::warn!(error = %error, "Read failed, reconnecting");
            self.state.advance(SessionState::Reconnecting);
            self.close_writer().await;

            tokio::select! {
                () = root.cancelled() => break,
                () = time::sleep(self.config.read_retry_delay) => {}
            }

            self.state.advance(SessionState::Connecting);
            match self.connect(&root).await {
                Ok(next) => {
                    stream = next;
                    self.state.advance(SessionState::Connected);
                }
                Err(SessionError::Stopped) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Giving up on reconnecting");
                    self.state.advance(SessionState::Closed);
                    root.cancel();
                    break;
                }
            }
        }

        self.close_writer().await;
        tracing::debug!("Session supervisor exited");
    }

    /// Read and dispatch until cancelled (`None`) or the transport fails
    async fn read_loop(
        &self,
        generation: &CancellationToken,
        stream: &mut Box<dyn FrameStream>,
    ) -> Option<TransportError> {
        loop {
            let frame = tokio::select! {
                biased;
                () = generation.cancelled() => return None,
                frame = stream.next_frame() => frame,
            };

            match frame {
                Ok(Frame::Binary(data)) => {
                    for packet in codec::decode(&data) {
                        tracing::trace!(packet = %packet, "Packet received");
                        // Dispatch waits for a handler slot when bounded.
                        tokio::select! {
                            biased;
                            () = generation.cancelled() => return None,
                            _ = self.dispatcher.dispatch(&packet) => {}
                        }
                    }
                }
                Ok(Frame::Text(text)) => {
                    tracing::warn!(len = text.len(), "Discarding non-binary frame");
                }
                Err(e) => return Some(e),
            }
        }
    }

    /// Send a heartbeat every interval until the generation is cancelled
    async fn heartbeat_loop(self: Arc<Self>, generation: CancellationToken) {
        let period = self.config.heartbeat_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let frame = codec::encode_heartbeat();

        loop {
            tokio::select! {
                biased;
                () = generation.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.send_frame(frame.clone()).await {
                Ok(()) => tracing::debug!("Heartbeat sent"),
                Err(e) => tracing::warn!(error = %e, "Heartbeat failed"),
            }
        }
    }
}
