use crate::config::OAuthConfig;
use crate::error::AuthError;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

/// Scopes requested at login: basic identity plus spreadsheet read/write
pub const SCOPES: [&str; 4] = [
    "openid",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/spreadsheets",
];

// refresh this long before the provider's stated expiry
const EXPIRY_SKEW_SECS: i64 = 60;

/// Tokens for one logged-in account
///
/// Owned by a single browser session and dropped on logout.
#[derive(Debug, Clone)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub token_uri: String,
    pub client_id: String,
}

impl Credential {
    /// Whether the access token should be refreshed before use
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now + Duration::seconds(EXPIRY_SKEW_SECS),
            None => false,
        }
    }
}

/// Identity of the logged-in account, used in audit notes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserInfo {
    /// Name recorded as the actor: display name, else email, else "Unknown"
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.email.as_deref().filter(|e| !e.is_empty()))
            .unwrap_or("Unknown")
            .to_string()
    }

    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Client for the authorization-code flow against the identity provider
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(http: Client, config: OAuthConfig) -> Self {
        OAuthClient { http, config }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Provider URL the browser is sent to, carrying `state` for CSRF protection
    pub fn authorization_url(&self, state: &str) -> Result<String, AuthError> {
        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            &self.config.auth_uri,
            [
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
        Ok(url.to_string())
    }

    /// Exchange an authorization code for a credential
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, AuthError> {
        let resp = self
            .http
            .post(&self.config.token_uri)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange(format_oauth_error(status, &body)));
        }

        let token: TokenResponse = resp.json().await?;
        Ok(self.credential_from(token, None))
    }

    /// Obtain a fresh access token using the credential's refresh token
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
        let Some(refresh_token) = credential.refresh_token.as_deref() else {
            return Err(AuthError::Refresh("no refresh token was granted".to_string()));
        };

        let resp = self
            .http
            .post(&credential.token_uri)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Refresh(format_oauth_error(status, &body)));
        }

        let token: TokenResponse = resp.json().await?;
        Ok(self.credential_from(token, Some(refresh_token)))
    }

    /// Resolve the account's display name and email
    pub async fn fetch_user_info(&self, credential: &Credential) -> Result<UserInfo, AuthError> {
        let resp = self
            .http
            .get(&self.config.userinfo_uri)
            .bearer_auth(&credential.access_token)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::UserInfo(format_oauth_error(status, &body)));
        }

        Ok(resp.json().await?)
    }

    fn credential_from(&self, token: TokenResponse, previous_refresh: Option<&str>) -> Credential {
        Credential {
            access_token: token.access_token,
            refresh_token: token
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
            token_uri: self.config.token_uri.clone(),
            client_id: self.config.client_id.clone(),
        }
    }
}

/// Random value for the OAuth `state` parameter
pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn format_oauth_error(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("HTTP {}", status);
    }

    let summary = match serde_json::from_str::<TokenErrorResponse>(trimmed) {
        Ok(err) => match err.error_description {
            Some(desc) => format!("{} ({})", desc, err.error),
            None => err.error,
        },
        Err(_) => truncate_error(trimmed),
    };
    format!("HTTP {}: {}", status, summary)
}

fn truncate_error(message: &str) -> String {
    let mut out = message.replace(['\n', '\r'], " ");
    if out.len() > 240 {
        let mut cut = 240;
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
        out.push_str("...");
    }
    out
}
