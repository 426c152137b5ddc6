//! Event dispatcher
//!
//! Each leaf packet is routed by op code. Notifications go to the custom
//! handlers registered for their exact `cmd` and to the built-in handlers of
//! their [`EventKind`]. Handlers are plain closures, so every invocation runs
//! on tokio's blocking pool; a slow, blocking or panicking handler never holds
//! up the read loop or an async worker.

use crate::events::{CommandEvent, Event, EventKind, EventResult};
use crate::handlers::{Handler, HandlerKey, HandlerRegistry};
use crate::protocol::{AuthReplyPayload, OpCode, Packet};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Configuration for the event dispatcher
#[derive(Debug, Clone, Default)]
pub struct EventDispatcherConfig {
    /// Upper bound on concurrently running handlers; `None` is unbounded
    pub max_in_flight: Option<usize>,
}

/// Routes packets to registered handlers
pub struct EventDispatcher {
    registry: HandlerRegistry,
    limiter: Option<Arc<Semaphore>>,
    /// Handler tasks started
    spawned: AtomicU64,
    /// Handler invocations that panicked
    panicked: Arc<AtomicU64>,
}

impl EventDispatcher {
    pub fn new(config: EventDispatcherConfig, registry: HandlerRegistry) -> Self {
        let limiter = config
            .max_in_flight
            .filter(|limit| *limit > 0)
            .map(|limit| Arc::new(Semaphore::new(limit)));

        Self {
            registry,
            limiter,
            spawned: AtomicU64::new(0),
            panicked: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Dispatch one leaf packet. Returns the number of handler tasks started.
    ///
    /// Only waits when a handler bound is configured and reached.
    pub async fn dispatch(&self, packet: &Packet) -> usize {
        let targets = match self.route(packet) {
            Ok(targets) => targets,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    operation = packet.operation(),
                    "Dropping undecodable packet"
                );
                return 0;
            }
        };

        let mut started = 0;
        for (key, event) in targets {
            for handler in self.registry.handlers(&key) {
                if self.spawn(key.clone(), handler, event.clone()).await {
                    started += 1;
                }
            }
        }
        started
    }

    /// Work out which keys receive which event
    fn route(&self, packet: &Packet) -> EventResult<Vec<(HandlerKey, Event)>> {
        match packet.op() {
            Some(OpCode::HeartbeatReply) => {
                let count = packet.online_count()?;
                tracing::trace!(online = count, "Heartbeat reply");
                Ok(vec![(
                    HandlerKey::Builtin(EventKind::OnlineCount),
                    Event::OnlineCount(count),
                )])
            }
            Some(OpCode::AuthenticationReply) => {
                let reply: AuthReplyPayload = packet.json()?;
                if reply.is_success() {
                    tracing::debug!("Room entered");
                } else {
                    tracing::warn!(code = reply.code, "Room entry rejected");
                }
                Ok(vec![(
                    HandlerKey::Builtin(EventKind::AuthReply),
                    Event::AuthReply(reply),
                )])
            }
            Some(OpCode::Notification) => {
                let command = CommandEvent::from_value(packet.json()?)?;
                Ok(self.route_command(command))
            }
            Some(op) if op.is_client_op() => {
                tracing::debug!(op = %op, "Ignoring client op code from server");
                Ok(Vec::new())
            }
            _ => {
                tracing::debug!(packet = %packet, "Ignoring packet with no handlers");
                Ok(Vec::new())
            }
        }
    }

    fn route_command(&self, command: CommandEvent) -> Vec<(HandlerKey, Event)> {
        tracing::trace!(cmd = %command.cmd, "Notification");
        let mut targets = Vec::with_capacity(2);

        let builtin = EventKind::from_cmd(&command.cmd)
            .filter(|kind| self.registry.contains(&HandlerKey::Builtin(*kind)));

        let custom = HandlerKey::Custom(command.cmd.clone());
        if self.registry.contains(&custom) {
            targets.push((custom, Event::Command(command.clone())));
        }

        if let Some(kind) = builtin {
            let cmd = command.cmd.clone();
            match Event::from_command(kind, command) {
                Ok(event) => targets.push((HandlerKey::Builtin(kind), event)),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        cmd = %cmd,
                        "Skipping built-in handlers for malformed payload"
                    );
                }
            }
        }

        targets
    }

    /// Start one handler invocation. Returns `false` if the limiter was closed.
    async fn spawn(&self, key: HandlerKey, handler: Handler, event: Event) -> bool {
        let permit = match &self.limiter {
            Some(limiter) => match limiter.clone().acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => return false,
            },
            None => None,
        };

        self.spawned.fetch_add(1, Ordering::Relaxed);
        let panicked = self.panicked.clone();

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                panicked.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    key = %key,
                    panic = panic_message(panic.as_ref()),
                    "Event handler panicked"
                );
            }
        });
        true
    }

    /// Number of handler tasks started so far
    pub fn spawned(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }

    /// Number of handler invocations that panicked so far
    pub fn panicked(&self) -> u64 {
        self.panicked.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("registry", &self.registry)
            .field("bounded", &self.limiter.is_some())
            .field("spawned", &self.spawned())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
