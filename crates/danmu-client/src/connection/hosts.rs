//! Chat host selection
//!
//! Hosts are tried round-robin: attempt `n` uses `hosts[n % len]`. The
//! attempt counter is never reset, so a reconnect continues the rotation
//! where the last connect left off.

/// Fallback chat host
pub const DEFAULT_HOST: &str = "broadcastlv.chat.bilibili.com";

/// Ordered candidate hosts plus the rotation counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRotation {
    hosts: Vec<String>,
    attempts: u64,
    /// Set by the caller; discovery results do not replace it
    pinned: bool,
}

impl Default for HostRotation {
    fn default() -> Self {
        Self {
            hosts: vec![DEFAULT_HOST.to_string()],
            attempts: 0,
            pinned: false,
        }
    }
}

impl HostRotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a single host
    pub fn pin(&mut self, host: impl Into<String>) {
        self.hosts = vec![host.into()];
        self.pinned = true;
    }

    /// Pin the default host
    pub fn use_default(&mut self) {
        self.pin(DEFAULT_HOST);
    }

    /// Replace the candidates with a discovered list.
    ///
    /// Ignored when the caller pinned a host or the list is empty. Returns
    /// whether the list was applied.
    pub fn apply_discovered<I, S>(&mut self, hosts: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.pinned {
            return false;
        }
        let hosts: Vec<String> = hosts
            .into_iter()
            .map(Into::into)
            .filter(|h| !h.is_empty())
            .collect();
        if hosts.is_empty() {
            return false;
        }
        self.hosts = hosts;
        true
    }

    /// Drop discovered hosts and go back to the default
    pub fn reset_to_default(&mut self) {
        if !self.pinned {
            self.hosts = vec![DEFAULT_HOST.to_string()];
        }
    }

    /// Host for the next attempt; advances the counter
    pub fn next_host(&mut self) -> String {
        let index = (self.attempts % self.hosts.len() as u64) as usize;
        self.attempts += 1;
        self.hosts[index].clone()
    }

    /// Attempts made so far across the session's lifetime
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }
}
