use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use accredited_programmes::config::SessionConfig;
use accredited_programmes::session::{Flash, SessionData};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};
use uuid::Uuid;

type Sessions = Arc<Mutex<HashMap<Uuid, StoredSession>>>;

struct StoredSession {
    data: SessionData,
    last_seen: Instant,
}

/// Server-side session storage keyed by the id in the session cookie.
#[derive(Clone)]
pub(crate) struct SessionStore {
    cookie_name: Arc<str>,
    secure: bool,
    idle_timeout: Duration,
    sessions: Sessions,
}

impl SessionStore {
    pub(crate) fn new(config: &SessionConfig) -> Self {
        Self {
            cookie_name: Arc::from(config.cookie_name.as_str()),
            secure: config.secure,
            idle_timeout: config.idle_timeout,
            sessions: Arc::default(),
        }
    }

    /// Drops sessions idle for longer than the configured timeout.
    fn prune(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, stored| {
            now.saturating_duration_since(stored.last_seen) <= self.idle_timeout
        });
        before - sessions.len()
    }

    fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn cookie_id(&self, headers: &HeaderMap) -> Option<Uuid> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == &*self.cookie_name)
            .and_then(|(_, value)| Uuid::parse_str(value).ok())
    }

    fn set_cookie(&self, id: Uuid) -> Option<HeaderValue> {
        let secure = if self.secure { "; Secure" } else { "" };
        let cookie = format!(
            "{}={id}; Path=/; HttpOnly; SameSite=Lax{secure}",
            self.cookie_name
        );
        HeaderValue::from_str(&cookie).ok()
    }

    fn handle(&self, id: Uuid) -> Session {
        Session {
            id,
            sessions: self.sessions.clone(),
        }
    }
}

/// The current request's session, inserted by [`session_layer`].
#[derive(Clone)]
pub(crate) struct Session {
    id: Uuid,
    sessions: Sessions,
}

impl Session {
    /// Writes to the session, creating it on first use.
    pub(crate) fn with<T>(&self, f: impl FnOnce(&mut SessionData) -> T) -> T {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = sessions.entry(self.id).or_insert_with(|| StoredSession {
            data: SessionData::default(),
            last_seen: Instant::now(),
        });
        stored.last_seen = Instant::now();
        f(&mut stored.data)
    }

    /// Reads the session without storing anything for an unknown id.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&mut SessionData) -> T) -> T {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        match sessions.get_mut(&self.id) {
            Some(stored) => {
                stored.last_seen = Instant::now();
                f(&mut stored.data)
            }
            None => f(&mut SessionData::default()),
        }
    }

    pub(crate) fn take_flash(&self) -> Flash {
        self.read(SessionData::take_flash)
    }

    pub(crate) fn flash_error(
        &self,
        field: &str,
        message: impl Into<String>,
        values: &[(&str, &str)],
    ) {
        let message = message.into();
        self.with(|data| {
            data.flash.error(field, message);
            for (name, value) in values {
                data.flash.value(name, *value);
            }
        });
    }

    pub(crate) fn flash_success(&self, message: impl Into<String>) {
        let message = message.into();
        self.with(|data| data.flash.success = Some(message));
    }
}

pub(crate) async fn session_layer(
    State(store): State<SessionStore>,
    mut request: Request,
    next: Next,
) -> Response {
    let pruned = store.prune(Instant::now());
    if pruned > 0 {
        debug!(pruned, remaining = store.len(), "idle sessions dropped");
    }

    let existing = store.cookie_id(request.headers());
    let id = existing.unwrap_or_else(Uuid::new_v4);
    request.extensions_mut().insert(store.handle(id));

    let mut response = next.run(request).await;
    if existing.is_none() {
        match store.set_cookie(id) {
            Some(cookie) => {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            None => warn!(cookie = %store.cookie_name, "session cookie could not be encoded"),
        }
    }
    response
}
