use crate::auth::{expiry_ms, now_ms};
use crate::auth::oauth::{OAuthClient, TokenRenewer};
use crate::auth::scheduler::{RefreshScheduler, Scheduled};
use crate::auth::session::{Session, TokenState};
use crate::config::{ApiConfig, AuthConfig};
use crate::errors::AuthError;
use std::sync::Arc;

/// OAuth2 password-grant authenticator with automatic token renewal.
pub struct Authenticator {
    client: Arc<OAuthClient>,
    session: Arc<Session>,
    scheduler: Arc<RefreshScheduler>,
}

impl Authenticator {
    pub fn new(api: &ApiConfig, auth: &AuthConfig, session: Arc<Session>) -> Self {
        Self::with_client(Arc::new(OAuthClient::new(api)), auth, session)
    }

    pub fn with_client(client: Arc<OAuthClient>, auth: &AuthConfig, session: Arc<Session>) -> Self {
        let renewer: Arc<dyn TokenRenewer> = client.clone();
        let scheduler = RefreshScheduler::new(&session, renewer, auth.clone());
        Self {
            client,
            session,
            scheduler,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn scheduler(&self) -> &Arc<RefreshScheduler> {
        &self.scheduler
    }

    /// Sign in with a username and password.
    pub async fn authenticate(
        &self,
        identification: &str,
        password: &str,
        remember_me: bool,
        scope: &[String],
    ) -> Result<TokenState, AuthError> {
        let response = self
            .client
            .password_grant(identification, password, remember_me, scope)
            .await?;

        let expires_at = response.expires_in.and_then(|secs| expiry_ms(now_ms(), secs));
        let scheduled = self.scheduler.schedule(
            response.expires_in,
            expires_at,
            response.refresh_token.as_deref(),
        );
        if let Scheduled::Skipped(reason) = scheduled {
            tracing::debug!(?reason, "token refresh not scheduled");
        }

        let tokens = TokenState {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
            expires_at,
            scope: response.scope,
        };
        self.session.authenticate(tokens.clone());
        Ok(tokens)
    }

    /// Resume a session from previously stored tokens.
    ///
    /// Expired tokens are renewed right away when a refresh token is
    /// available; otherwise the restore fails.
    pub async fn restore(&self, tokens: TokenState) -> Result<TokenState, AuthError> {
        if tokens.access_token.is_empty() {
            return Err(AuthError::MissingAccessToken);
        }

        let tokens = if tokens.is_expired_at(now_ms()) {
            let Some(refresh_token) = tokens.refresh_token.as_deref().filter(|t| !t.is_empty()) else {
                return Err(AuthError::NotAuthenticated);
            };
            tracing::debug!("stored access token expired; renewing");
            self.scheduler
                .renew_now(tokens.expires_in, refresh_token, tokens.scope.clone())
                .await?
        } else {
            tokens
        };

        self.scheduler
            .schedule(tokens.expires_in, tokens.expires_at, tokens.refresh_token.as_deref());
        self.session.authenticate(tokens.clone());
        Ok(tokens)
    }

    /// Sign out: stop renewing and drop the tokens.
    pub fn invalidate(&self) -> bool {
        self.scheduler.cancel();
        self.session.invalidate()
    }
}
