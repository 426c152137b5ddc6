//! Handler registry
//!
//! Handlers are keyed either by a built-in [`EventKind`] or by the exact
//! command name of a notification. Registration is allowed at any time,
//! including while a session is running.

use crate::events::{DanmakuEvent, Event, EventKind, GiftEvent, GuardBuyEvent, SuperChatEvent};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// A registered callback. Called on tokio's blocking pool, so it may block.
pub type Handler = Arc<dyn Fn(Event) + Send + Sync>;

/// Registration key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandlerKey {
    Builtin(EventKind),
    /// Exact `cmd`, suffix included
    Custom(String),
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(kind) => write!(f, "builtin:{kind}"),
            Self::Custom(cmd) => write!(f, "custom:{cmd}"),
        }
    }
}

/// Shared, concurrently writable set of handlers
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<DashMap<HandlerKey, Vec<Handler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler under `key`. Handlers under one key accumulate.
    pub fn register<F>(&self, key: HandlerKey, handler: F)
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        tracing::debug!(key = %key, "Registering handler");
        self.handlers.entry(key).or_default().push(Arc::new(handler));
    }

    /// Handle a built-in event kind
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        self.register(HandlerKey::Builtin(kind), handler);
    }

    /// Handle a notification by its exact command name
    pub fn on_command<F>(&self, cmd: impl Into<String>, handler: F)
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        self.register(HandlerKey::Custom(cmd.into()), handler);
    }

    pub fn on_danmaku<F>(&self, handler: F)
    where
        F: Fn(DanmakuEvent) + Send + Sync + 'static,
    {
        self.on(EventKind::Danmaku, move |event| {
            if let Event::Danmaku(danmaku) = event {
                handler(danmaku);
            }
        });
    }

    pub fn on_gift<F>(&self, handler: F)
    where
        F: Fn(GiftEvent) + Send + Sync + 'static,
    {
        self.on(EventKind::Gift, move |event| {
            if let Event::Gift(gift) = event {
                handler(gift);
            }
        });
    }

    pub fn on_super_chat<F>(&self, handler: F)
    where
        F: Fn(SuperChatEvent) + Send + Sync + 'static,
    {
        self.on(EventKind::SuperChat, move |event| {
            if let Event::SuperChat(super_chat) = event {
                handler(super_chat);
            }
        });
    }

    pub fn on_guard_buy<F>(&self, handler: F)
    where
        F: Fn(GuardBuyEvent) + Send + Sync + 'static,
    {
        self.on(EventKind::GuardBuy, move |event| {
            if let Event::GuardBuy(guard) = event {
                handler(guard);
            }
        });
    }

    pub fn on_online_count<F>(&self, handler: F)
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.on(EventKind::OnlineCount, move |event| {
            if let Event::OnlineCount(count) = event {
                handler(count);
            }
        });
    }

    /// Snapshot of the handlers under `key`
    pub fn handlers(&self, key: &HandlerKey) -> Vec<Handler> {
        self.handlers
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Whether anything is registered under `key`
    pub fn contains(&self, key: &HandlerKey) -> bool {
        self.handlers.get(key).is_some_and(|entry| !entry.is_empty())
    }

    /// Drop every handler under `key`
    pub fn remove(&self, key: &HandlerKey) -> usize {
        self.handlers.remove(key).map_or(0, |(_, handlers)| handlers.len())
    }

    /// Total number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("keys", &self.handlers.len())
            .field("handlers", &self.len())
            .finish()
    }
}
