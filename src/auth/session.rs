//! Authenticated session state.
//!
//! The session owns the token state. Everything else (the refresh
//! scheduler, the JSON:API store) reads it through the session and learns
//! about changes from [`SessionEvent`]s.

use crate::i18n::Translator;
use crate::notify::{Notification, Notifier};
use crate::router::{Router, Transition};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 16;

/// OAuth token data held by an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds as reported by the token endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Absolute expiry in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenState {
    /// Whether the access token has expired at `now_ms`. Tokens without a
    /// known expiry never expire.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now_ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Authenticated(TokenState),
    /// Tokens were renewed in the background.
    DataUpdated(TokenState),
    Invalidated,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    tokens: RwLock<Option<TokenState>>,
    expired: AtomicBool,
    attempted: Mutex<Option<Transition>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            id: Uuid::new_v4(),
            tokens: RwLock::new(None),
            expired: AtomicBool::new(false),
            attempted: Mutex::new(None),
            events,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_tokens().is_some()
    }

    pub fn tokens(&self) -> Option<TokenState> {
        self.read_tokens().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_tokens().as_ref().map(|t| t.access_token.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Store freshly granted tokens.
    pub fn authenticate(&self, tokens: TokenState) {
        *self.write_tokens() = Some(tokens.clone());
        self.expired.store(false, Ordering::Release);
        tracing::info!(session = %self.id, "session authenticated");
        self.emit(SessionEvent::Authenticated(tokens));
    }

    /// Replace the tokens of an authenticated session after a renewal.
    ///
    /// Ignored when the session was invalidated in the meantime.
    pub fn update(&self, tokens: TokenState) -> bool {
        {
            let mut current = self.write_tokens();
            if current.is_none() {
                return false;
            }
            *current = Some(tokens.clone());
        }
        tracing::debug!(session = %self.id, "session data updated");
        self.emit(SessionEvent::DataUpdated(tokens));
        true
    }

    /// Drop the tokens. Returns `false` if the session was not authenticated.
    pub fn invalidate(&self) -> bool {
        if self.write_tokens().take().is_none() {
            return false;
        }
        tracing::info!(session = %self.id, "session invalidated");
        self.emit(SessionEvent::Invalidated);
        true
    }

    /// Remember that the session ended because its tokens could not be renewed.
    pub fn mark_expired(&self) {
        self.expired.store(true, Ordering::Release);
    }

    /// Whether the session expired since the last call. Reported once.
    pub fn take_expired_notice(&self) -> bool {
        self.expired.swap(false, Ordering::AcqRel)
    }

    /// Remember where an unauthenticated user was headed.
    pub fn remember_attempted(&self, transition: Transition) {
        *self.attempted.lock().unwrap_or_else(|e| e.into_inner()) = Some(transition);
    }

    pub fn take_attempted_route(&self) -> Option<Transition> {
        self.attempted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Route a freshly signed-in user to where they were headed, or to
    /// `fallback` when nothing was remembered.
    pub fn handle_authentication(&self, router: &dyn Router, fallback: &str) -> Transition {
        let target = self
            .take_attempted_route()
            .filter(|t| !t.to.is_empty() && t.to != "/")
            .unwrap_or_else(|| Transition::new(fallback));
        router.transition_to(target)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn read_tokens(&self) -> std::sync::RwLockReadGuard<'_, Option<TokenState>> {
        self.tokens.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_tokens(&self) -> std::sync::RwLockWriteGuard<'_, Option<TokenState>> {
        self.tokens.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Show the "session expired" error once on the sign-in screen.
pub fn notify_session_expired(
    session: &Session,
    notifier: &dyn Notifier,
    translator: &dyn Translator,
) -> bool {
    if !session.take_expired_notice() {
        return false;
    }
    notifier.post(Notification::error(
        translator.translate("views.signin.sessionExpired", &[]),
    ));
    true
}
