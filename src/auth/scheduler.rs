//! Access token refresh scheduler.
//!
//! Keeps at most one pending renewal timer per session. The timer fires
//! `offset` before the access token expires, exchanges the refresh token
//! for a new one and re-arms itself with the new expiry. A failed renewal
//! ends the session and flags it as expired for the sign-in screen.
//!
//! The scheduler never owns the session: it holds a `Weak` reference, and a
//! timer firing after the session is gone (or signed out) does nothing.

use crate::auth::{expiry_ms, now_ms};
use crate::auth::oauth::{TokenRenewer, TokenResponse};
use crate::auth::session::{Session, TokenState};
use crate::config::AuthConfig;
use crate::errors::AuthError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Result of a [`RefreshScheduler::schedule`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    /// A timer was armed to fire after `delay`.
    Armed { delay: Duration },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Token refresh is turned off in the configuration.
    Disabled,
    NoRefreshToken,
    NoExpiry,
    /// The token expired longer than the refresh offset ago.
    Expired,
}

struct Pending {
    generation: u64,
    fire_at_ms: i64,
    handle: JoinHandle<()>,
}

pub struct RefreshScheduler {
    me: Weak<RefreshScheduler>,
    session: Weak<Session>,
    renewer: Arc<dyn TokenRenewer>,
    settings: AuthConfig,
    generation: AtomicU64,
    pending: Mutex<Option<Pending>>,
}

impl RefreshScheduler {
    pub fn new(session: &Arc<Session>, renewer: Arc<dyn TokenRenewer>, settings: AuthConfig) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            session: Arc::downgrade(session),
            renewer,
            settings,
            generation: AtomicU64::new(0),
            pending: Mutex::new(None),
        })
    }

    /// Arm the renewal timer for a token.
    ///
    /// `expires_at` (ms since the epoch) is derived from `expires_in`
    /// (seconds) when absent. Any pending timer is aborted before the new
    /// one is stored. Must be called from within a Tokio runtime.
    pub fn schedule(
        &self,
        expires_in: Option<u64>,
        expires_at: Option<i64>,
        refresh_token: Option<&str>,
    ) -> Scheduled {
        if !self.settings.refresh_access_tokens {
            return Scheduled::Skipped(SkipReason::Disabled);
        }
        let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) else {
            tracing::debug!("no refresh token; session will not be renewed");
            return Scheduled::Skipped(SkipReason::NoRefreshToken);
        };

        let now = now_ms();
        let Some(expires_at) = expires_at.or_else(|| expires_in.and_then(|secs| expiry_ms(now, secs))) else {
            return Scheduled::Skipped(SkipReason::NoExpiry);
        };
        let offset = i64::try_from(self.settings.token_refresh_offset_ms).unwrap_or(i64::MAX);
        if expires_at <= now.saturating_sub(offset) {
            tracing::debug!(expires_at, "token already expired; not scheduling refresh");
            return Scheduled::Skipped(SkipReason::Expired);
        }

        let delay = Duration::from_millis(expires_at.saturating_sub(now).saturating_sub(offset).max(0) as u64);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let mut pending = self.lock_pending();
        if let Some(previous) = pending.take() {
            previous.handle.abort();
        }

        let me = self.me.clone();
        let refresh_token = refresh_token.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(scheduler) = me.upgrade() {
                scheduler.fire(generation, expires_in, refresh_token).await;
            }
        });
        *pending = Some(Pending {
            generation,
            fire_at_ms: now.saturating_add(i64::try_from(delay.as_millis()).unwrap_or(i64::MAX)),
            handle,
        });

        tracing::debug!(delay_ms = delay.as_millis() as u64, "token refresh scheduled");
        Scheduled::Armed { delay }
    }

    /// Abort the pending timer. Returns `false` when none was pending.
    pub fn cancel(&self) -> bool {
        match self.lock_pending().take() {
            Some(pending) => {
                pending.handle.abort();
                tracing::debug!("token refresh cancelled");
                true
            }
            None => false,
        }
    }

    /// Number of live timers: 0 or 1.
    pub fn pending_count(&self) -> usize {
        usize::from(self.lock_pending().is_some())
    }

    /// When the pending timer fires, in ms since the epoch.
    pub fn next_fire_at(&self) -> Option<i64> {
        self.lock_pending().as_ref().map(|p| p.fire_at_ms)
    }

    /// Exchange a refresh token right away, without touching the timer.
    pub async fn renew_now(
        &self,
        expires_in: Option<u64>,
        refresh_token: &str,
        scope: Option<String>,
    ) -> Result<TokenState, AuthError> {
        let request_scope = scope.as_deref().filter(|_| self.settings.refresh_with_scope);
        let response = self.renewer.refresh(refresh_token, request_scope).await?;
        Ok(renewed_state(response, expires_in, refresh_token, scope, now_ms()))
    }

    async fn fire(&self, generation: u64, expires_in: Option<u64>, refresh_token: String) {
        {
            let mut pending = self.lock_pending();
            if pending.as_ref().map(|p| p.generation) != Some(generation) {
                return;
            }
            pending.take();
        }

        let Some(session) = self.session.upgrade() else {
            tracing::debug!("session dropped; refresh timer exiting");
            return;
        };
        if !session.is_authenticated() {
            tracing::debug!("session signed out; refresh timer exiting");
            return;
        }

        let scope = session.tokens().and_then(|t| t.scope);
        match self.renew_now(expires_in, &refresh_token, scope).await {
            Ok(tokens) => {
                self.schedule(tokens.expires_in, None, tokens.refresh_token.as_deref());
                if !session.update(tokens) {
                    self.cancel();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Access token could not be refreshed");
                session.mark_expired();
                session.invalidate();
            }
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<Pending>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            pending.handle.abort();
        }
    }
}

/// Token state after a renewal. Values missing from the response fall back
/// to the previous ones and the expiry is recomputed from `now_ms`.
pub(crate) fn renewed_state(
    response: TokenResponse,
    expires_in: Option<u64>,
    refresh_token: &str,
    scope: Option<String>,
    now_ms: i64,
) -> TokenState {
    let expires_in = response.expires_in.or(expires_in);
    let refresh_token = response
        .refresh_token
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| refresh_token.to_string());
    TokenState {
        access_token: response.access_token,
        refresh_token: Some(refresh_token),
        expires_in,
        expires_at: expires_in.and_then(|secs| expiry_ms(now_ms, secs)),
        scope: response.scope.or(scope),
    }
}
