use crate::auth::{Credential, UserInfo};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Name of the cookie carrying the session ID
pub const SESSION_COOKIE: &str = "session";

const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// Everything a remote sheet operation needs about the caller
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub credential: Credential,
    pub user: UserInfo,
}

impl SessionContext {
    /// Actor name written into audit notes
    pub fn actor(&self) -> String {
        self.user.display_name()
    }
}

/// Login state of one browser session
#[derive(Debug, Clone, Default)]
pub enum AuthState {
    #[default]
    LoggedOut,
    /// Sent to the provider, waiting for the callback with this `state`
    Authenticating { csrf_state: String },
    LoggedIn(SessionContext),
}

/// One-shot message shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl Flash {
    pub fn success(text: impl Into<String>) -> Self {
        Flash {
            kind: FlashKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Flash {
            kind: FlashKind::Error,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Flash {
            kind: FlashKind::Info,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    auth: AuthState,
    flash: Option<Flash>,
    expires_at: SystemTime,
}

/// In-memory store of browser sessions, owned by the application state
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new logged-out session and return its ID
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let entry = SessionEntry {
            auth: AuthState::LoggedOut,
            flash: None,
            expires_at: SystemTime::now() + Duration::from_secs(SESSION_DURATION),
        };
        self.write().insert(id.clone(), entry);
        id
    }

    /// Auth state of a live session, `None` if unknown or expired
    pub fn auth_state(&self, id: &str) -> Option<AuthState> {
        let sessions = self.read();
        sessions
            .get(id)
            .filter(|entry| entry.expires_at > SystemTime::now())
            .map(|entry| entry.auth.clone())
    }

    /// Context of a logged-in session
    pub fn context(&self, id: &str) -> Option<SessionContext> {
        match self.auth_state(id)? {
            AuthState::LoggedIn(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn set_auth(&self, id: &str, auth: AuthState) {
        if let Some(entry) = self.write().get_mut(id) {
            entry.auth = auth;
        }
    }

    pub fn set_flash(&self, id: &str, flash: Flash) {
        if let Some(entry) = self.write().get_mut(id) {
            entry.flash = Some(flash);
        }
    }

    /// Remove and return the pending flash message
    pub fn take_flash(&self, id: &str) -> Option<Flash> {
        self.write().get_mut(id).and_then(|entry| entry.flash.take())
    }

    /// Drop a session and its credential
    pub fn remove(&self, id: &str) {
        self.write().remove(id);
    }

    /// Drop every expired session
    pub fn purge_expired(&self) -> usize {
        let now = SystemTime::now();
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
