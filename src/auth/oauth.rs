use crate::config::ApiConfig;
use crate::errors::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Successful response from the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

impl TryFrom<RawTokenResponse> for TokenResponse {
    type Error = AuthError;

    fn try_from(raw: RawTokenResponse) -> Result<Self, Self::Error> {
        match raw.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(TokenResponse {
                access_token,
                token_type: raw.token_type,
                expires_in: raw.expires_in,
                refresh_token: raw.refresh_token,
                scope: raw.scope,
            }),
            _ => Err(AuthError::MissingAccessToken),
        }
    }
}

/// OAuth error body, e.g. `{"error": "invalid_grant"}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Exchanges a refresh token for new tokens.
#[async_trait]
pub trait TokenRenewer: Send + Sync {
    async fn refresh(&self, refresh_token: &str, scope: Option<&str>) -> Result<TokenResponse, AuthError>;
}

/// Password and refresh grants against `<host>/api/v<version>/token`.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
}

impl OAuthClient {
    pub fn new(api: &ApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: api.token_endpoint(),
            client_id: api.client_id.clone(),
            client_secret: api.client_secret.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Resource owner password grant.
    pub async fn password_grant(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
        scope: &[String],
    ) -> Result<TokenResponse, AuthError> {
        let remember_me = remember_me.to_string();
        let scope = scope.join(" ");
        let mut form = vec![
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("remember_me", remember_me.as_str()),
        ];
        if !scope.is_empty() {
            form.push(("scope", scope.as_str()));
        }
        tracing::debug!(endpoint = %self.endpoint, username, "requesting password grant");
        self.request(&form).await
    }

    async fn request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(AuthError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown_error").to_string());
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                error,
            });
        }

        let raw = response
            .json::<RawTokenResponse>()
            .await
            .map_err(AuthError::Request)?;
        TokenResponse::try_from(raw)
    }
}

#[async_trait]
impl TokenRenewer for OAuthClient {
    async fn refresh(&self, refresh_token: &str, scope: Option<&str>) -> Result<TokenResponse, AuthError> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(scope) = scope.filter(|s| !s.is_empty()) {
            form.push(("scope", scope));
        }
        tracing::debug!(endpoint = %self.endpoint, "requesting refresh grant");
        self.request(&form).await
    }
}
