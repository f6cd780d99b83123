//! App-only access tokens for Microsoft Graph.
//!
//! trustlink signs in as its own app registration (client-credentials grant)
//! and reuses the token until it is close to expiry.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::{EntraError, EntraResult};

/// Refresh this long before the login endpoint's stated expiry.
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Client credentials of the app registration that calls Graph.
#[derive(Debug)]
pub struct EntraCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn usable_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}

/// Holds the current Graph token for one tenant and renews it on demand.
#[derive(Debug)]
pub struct TokenCache {
    credentials: EntraCredentials,
    tenant_id: String,
    token_url: String,
    scope: String,
    http_client: reqwest::Client,
    current: RwLock<Option<AccessToken>>,
    margin: Duration,
}

impl TokenCache {
    /// Tokens are requested from `{login_endpoint}/{tenant_id}/oauth2/v2.0/token`
    /// for the `{graph_endpoint}/.default` scope.
    pub fn new(
        credentials: EntraCredentials,
        login_endpoint: impl Into<String>,
        graph_endpoint: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        let tenant_id = tenant_id.into();
        let token_url = format!("{}/{}/oauth2/v2.0/token", login_endpoint.into(), tenant_id);
        let scope = format!("{}/.default", graph_endpoint.into());

        Self {
            credentials,
            tenant_id,
            token_url,
            scope,
            http_client: reqwest::Client::new(),
            current: RwLock::new(None),
            margin: Duration::minutes(REFRESH_MARGIN_MINUTES),
        }
    }

    /// Returns a token valid for at least the refresh margin.
    #[instrument(skip(self), fields(tenant_id = %self.tenant_id))]
    pub async fn get_token(&self) -> EntraResult<String> {
        if let Some(token) = self.current.read().await.as_ref() {
            if token.usable_at(Utc::now(), self.margin) {
                return Ok(token.value.clone());
            }
        }

        let mut current = self.current.write().await;
        // Another caller may have renewed while we waited for the write lock.
        if let Some(token) = current.as_ref() {
            if token.usable_at(Utc::now(), self.margin) {
                return Ok(token.value.clone());
            }
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *current = Some(token);
        Ok(value)
    }

    /// Drops the current token; the next call signs in again.
    pub async fn invalidate(&self) {
        self.current.write().await.take();
    }

    async fn request_token(&self) -> EntraResult<AccessToken> {
        debug!(client_id = %self.credentials.client_id, "Requesting Graph access token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose_secret()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| EntraError::Auth(format!("token endpoint unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EntraError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let issued: TokenResponse = response
            .json()
            .await
            .map_err(|e| EntraError::Auth(format!("malformed token response: {e}")))?;

        let expires_at = Utc::now() + Duration::seconds(issued.expires_in);
        debug!(%expires_at, "Graph access token issued");

        Ok(AccessToken {
            value: issued.access_token,
            expires_at,
        })
    }
}
