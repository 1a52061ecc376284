//! OAuth2 token lifecycle management.
//!
//! The token manager owns the access/refresh token pair stored in the config
//! file and produces one valid access token per run. With no refresh token
//! on record it runs the manual authorization flow (fatal on failure). With
//! an expiry more than [`REFRESH_MARGIN`] away and an access token present
//! it reuses the stored token with no network call (the common case).
//! Otherwise it refreshes, falling back to manual authorization if the
//! refresh token has been revoked.
//!
//! Every successful acquisition is written back through the settings store
//! before the token is handed out. A failed write is logged and the run
//! continues on the in-memory token.

use oauth2::basic::{
    BasicClient, BasicErrorResponse, BasicRevocationErrorResponse,
    BasicTokenIntrospectionResponse, BasicTokenResponse,
};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, RefreshToken, Scope, StandardRevocableToken, TokenResponse, TokenUrl,
};
use time::OffsetDateTime;
use url::Url;

use crate::config::{SettingsStore, XeroSettings};
use crate::error::{Error, Result};

pub const TOKEN_URL: &str = "https://identity.xero.com/connect/token";

/// Tokens expiring within this window are refreshed eagerly rather than
/// risked mid-run.
pub const REFRESH_MARGIN: time::Duration = time::Duration::seconds(300);

/// Scope required for the identity provider to issue a refresh token.
const OFFLINE_ACCESS_SCOPE: &str = "offline_access";

type OAuthClient = oauth2::Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Where the token manager sits in its lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPhase {
    /// No refresh token on record; only manual authorization can proceed.
    NoToken,
    /// Stored access token is good for longer than the refresh margin.
    Valid,
    /// Expiry falls within the refresh margin.
    ExpiringSoon,
    /// Past expiry, or no expiry on record.
    Expired,
}

/// Classifies the stored token state. Pure with respect to its inputs so the
/// decision table is testable without a clock or network.
#[must_use]
pub fn phase_of(xero: &XeroSettings, now: OffsetDateTime) -> TokenPhase {
    if xero.refresh_token.is_empty() {
        return TokenPhase::NoToken;
    }
    match xero.token_expires_at() {
        Some(expires_at) => {
            let remaining = expires_at - now;
            if remaining > REFRESH_MARGIN && !xero.access_token.is_empty() {
                TokenPhase::Valid
            } else if remaining > time::Duration::ZERO {
                TokenPhase::ExpiringSoon
            } else {
                TokenPhase::Expired
            }
        }
        None => TokenPhase::Expired,
    }
}

/// Supplies the one-time authorization code during the manual flow. The
/// production implementation prompts the operator; tests return a canned
/// code.
pub trait CodeProvider {
    fn authorization_code(&self, authorize_url: &Url) -> Result<String>;
}

/// Prints the authorization URL and reads the code from stdin.
#[derive(Debug, Default)]
pub struct StdinCodeProvider;

impl CodeProvider for StdinCodeProvider {
    fn authorization_code(&self, authorize_url: &Url) -> Result<String> {
        println!("Open the following URL in a browser and authorize the application:");
        println!("\n  {authorize_url}\n");
        println!("Paste the authorization code from the redirect and press enter:");

        let mut code = String::new();
        std::io::stdin()
            .read_line(&mut code)
            .map_err(|e| Error::Config(format!("failed to read authorization code: {e}")))?;
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(Error::Config("no authorization code entered".to_string()));
        }
        Ok(code)
    }
}

/// Owns the token state for one run.
pub struct TokenManager<'a, P> {
    store: &'a mut SettingsStore,
    provider: P,
    token_url: Url,
    http: reqwest::Client,
}

impl<'a, P: CodeProvider> TokenManager<'a, P> {
    pub fn new(store: &'a mut SettingsStore, provider: P) -> Self {
        let token_url = Url::parse(TOKEN_URL).expect("token endpoint constant is a valid URL");
        Self {
            store,
            provider,
            token_url,
            http: reqwest::Client::new(),
        }
    }

    /// Overrides the token endpoint. Used by tests to point the refresh and
    /// exchange calls at a mock server.
    #[must_use]
    pub fn with_token_url(mut self, token_url: Url) -> Self {
        self.token_url = token_url;
        self
    }

    /// Produces an access token valid for the rest of the run.
    pub async fn ensure_valid_token(&mut self) -> Result<String> {
        let now = OffsetDateTime::now_utc();
        match phase_of(&self.store.settings.xero, now) {
            TokenPhase::Valid => {
                debug!("stored access token still valid; reusing without refresh");
                Ok(self.store.settings.xero.access_token.clone())
            }
            TokenPhase::NoToken => {
                info!("no refresh token on record; starting manual authorization");
                self.authorize().await
            }
            phase @ (TokenPhase::ExpiringSoon | TokenPhase::Expired) => {
                debug!(?phase, "access token needs refresh");
                match self.refresh().await {
                    Ok(token) => Ok(token),
                    Err(err @ Error::Refresh(_)) => {
                        warn!(
                            error = %err,
                            "token refresh failed; discarding refresh token and falling back to manual authorization"
                        );
                        self.store.settings.xero.refresh_token.clear();
                        self.authorize().await
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    async fn refresh(&mut self) -> Result<String> {
        let refresh_token = RefreshToken::new(self.store.settings.xero.refresh_token.clone());
        let token = self
            .oauth_client()?
            .exchange_refresh_token(&refresh_token)
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Refresh(Box::new(e)))?;

        info!("access token refreshed");
        Ok(self.apply_token(&token))
    }

    async fn authorize(&mut self) -> Result<String> {
        // The operator completes the flow out-of-band, so the CSRF state in
        // the URL is never checked on a callback.
        let (authorize_url, _csrf_state) = self
            .oauth_client()?
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes())
            .url();

        let code = self.provider.authorization_code(&authorize_url)?;
        let token = self
            .oauth_client()?
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::AuthExchange(Box::new(e)))?;

        info!("authorization code exchanged for a new token pair");
        Ok(self.apply_token(&token))
    }

    /// Records the token response in the settings store and persists it.
    /// Persistence failure is deliberately non-fatal.
    fn apply_token(&mut self, token: &BasicTokenResponse) -> String {
        let access = token.access_token().secret().clone();
        let refresh = token.refresh_token().map(|t| t.secret().as_str());
        let expires_at = token.expires_in().map(|d| OffsetDateTime::now_utc() + d);

        self.store.update_tokens(&access, refresh, expires_at);
        if let Err(err) = self.store.save() {
            warn!(
                error = %err,
                "failed to persist token state; continuing with the in-memory token"
            );
        }
        access
    }

    fn oauth_client(&self) -> Result<OAuthClient> {
        let xero = &self.store.settings.xero;
        let auth_url = AuthUrl::new(xero.authorize_uri.clone())
            .map_err(|_| Error::Config(format!("invalid AuthorizeUri: {}", xero.authorize_uri)))?;
        let redirect_url = RedirectUrl::new(xero.redirect_uri.clone())
            .map_err(|_| Error::Config(format!("invalid RedirectUri: {}", xero.redirect_uri)))?;

        Ok(BasicClient::new(oauth2::ClientId::new(xero.client_id.clone()))
            .set_client_secret(ClientSecret::new(xero.secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(TokenUrl::from_url(self.token_url.clone()))
            .set_redirect_uri(redirect_url))
    }

    fn scopes(&self) -> Vec<Scope> {
        let configured = &self.store.settings.xero.scope;
        let mut scopes: Vec<Scope> = configured
            .split_whitespace()
            .map(|s| Scope::new(s.to_string()))
            .collect();
        if !configured.split_whitespace().any(|s| s == OFFLINE_ACCESS_SCOPE) {
            scopes.push(Scope::new(OFFLINE_ACCESS_SCOPE.to_string()));
        }
        scopes
    }
}
