//! Login cookie checks
//!
//! Only two things are read from the cookie: that both login markers are
//! present, and the device id in `_uuid`. The cookie is otherwise passed to
//! the room API untouched.

use super::error::{SessionError, SessionResult};
use regex::Regex;
use std::sync::OnceLock;

const REQUIRED_MARKERS: [&str; 2] = ["bili_jct", "SESSDATA"];

fn uuid_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_uuid=(.+?);").ok()).as_ref()
}

/// What a session learns from its cookie
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    cookie: String,
    buvid: String,
}

impl Credentials {
    /// Validate a cookie. An empty cookie means an anonymous session.
    pub fn parse(cookie: &str) -> SessionResult<Self> {
        let cookie = cookie.trim();
        if cookie.is_empty() {
            return Ok(Self::default());
        }

        if let Some(missing) = REQUIRED_MARKERS.iter().find(|m| !cookie.contains(*m)) {
            return Err(SessionError::Configuration(format!(
                "cookie is missing {missing}; log in or leave it empty"
            )));
        }

        let buvid = uuid_regex()
            .and_then(|re| re.captures(cookie))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        Ok(Self {
            cookie: cookie.to_string(),
            buvid,
        })
    }

    pub fn is_anonymous(&self) -> bool {
        self.cookie.is_empty()
    }

    /// Cookie for the room API, `None` when anonymous
    pub fn cookie(&self) -> Option<&str> {
        (!self.cookie.is_empty()).then_some(self.cookie.as_str())
    }

    /// Device id, empty when the cookie has none
    pub fn buvid(&self) -> &str {
        &self.buvid
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("anonymous", &self.is_anonymous())
            .field("buvid", &self.buvid)
            .finish()
    }
}
