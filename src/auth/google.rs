//! Google sign-in over OAuth 2.0 authorization code flow.

use oauth2::{
    basic::BasicClient, url::Url, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;

use crate::config::GoogleOAuthConfig;
use crate::errors::AppError;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

pub type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Profile returned by Google's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Clone)]
pub struct GoogleAuth {
    client: GoogleClient,
    http: reqwest::Client,
    hosted_domain: Option<String>,
}

impl GoogleAuth {
    pub fn new(
        config: &GoogleOAuthConfig,
        hosted_domain: Option<String>,
    ) -> Result<Self, AppError> {
        let auth_url = AuthUrl::new(AUTH_URL.to_string())
            .map_err(|e| AppError::Internal(format!("Invalid Google auth URL: {}", e)))?;
        let token_url = TokenUrl::new(TOKEN_URL.to_string())
            .map_err(|e| AppError::Internal(format!("Invalid Google token URL: {}", e)))?;
        let redirect_url = RedirectUrl::new(config.redirect_url.clone())
            .map_err(|e| AppError::Internal(format!("Invalid Google redirect URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            http,
            hosted_domain,
        })
    }

    /// URL to send the browser to, plus the CSRF state to remember.
    pub fn authorize_url(&self) -> (Url, CsrfToken) {
        let mut request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .add_extra_param("prompt", "select_account");

        if let Some(domain) = &self.hosted_domain {
            request = request.add_extra_param("hd", domain.clone());
        }

        request.url()
    }

    /// Trade an authorization code for the caller's Google profile.
    pub async fn exchange(&self, code: String) -> Result<GoogleProfile, AppError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&self.http)
            .await
            .map_err(|e| AppError::Unauthorized(format!("Google code exchange failed: {}", e)))?;

        let profile = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::Unauthorized(format!("Google userinfo request failed: {}", e)))?
            .json::<GoogleProfile>()
            .await
            .map_err(|e| AppError::Unauthorized(format!("Google userinfo was malformed: {}", e)))?;

        Ok(profile)
    }
}
