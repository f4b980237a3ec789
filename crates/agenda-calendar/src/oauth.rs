//! Google OAuth2 credentials for installed applications
//!
//! Credentials are kept per user in a [`KeyValueStore`] as the JSON string
//! Google's client libraries write for "authorized user" files, so existing
//! token stores stay readable.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agenda_core::KeyValueStore;
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::{CalendarError, Result};

/// Full read/write access to the user's calendars
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Tokens expiring within this margin are treated as expired
const EXPIRY_MARGIN_SECS: i64 = 60;

/// OAuth client registration (`credentials.json` from the cloud console)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse a client secrets document (`installed` or `web` application)
    pub fn from_json(content: &str) -> Result<Self> {
        let file: ClientSecretsFile = serde_json::from_str(content)
            .map_err(|e| CalendarError::Configuration(format!("invalid client secrets: {}", e)))?;
        file.installed.or(file.web).ok_or_else(|| {
            CalendarError::Configuration(
                "client secrets must contain an 'installed' or 'web' section".to_string(),
            )
        })
    }

    /// Load a client secrets file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CalendarError::Configuration(format!(
                "failed to read client secrets {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }
}

/// Authorized-user credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Access token
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// Parse the stored JSON string
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| CalendarError::ParseError(format!("invalid stored credential: {}", e)))
    }

    /// JSON string written to the store
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CalendarError::ParseError(e.to_string()))
    }

    /// Expired, or expiring within the clock-skew margin
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - TimeDelta::seconds(EXPIRY_MARGIN_SECS) <= now,
            None => false,
        }
    }

    /// Has an access token that has not expired
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty()) && !self.is_expired(now)
    }

    /// Current access token
    pub fn access_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| CalendarError::Authentication("credential has no access token".to_string()))
    }

    /// Credential after a successful token response
    pub fn apply(&self, response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            token: Some(response.access_token),
            // refresh responses usually omit the refresh token
            refresh_token: response.refresh_token.or_else(|| self.refresh_token.clone()),
            expiry: response.expires_in.map(|secs| now + TimeDelta::seconds(secs)),
            scopes: response
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|| self.scopes.clone()),
            ..self.clone()
        }
    }

    fn from_secrets(secrets: &ClientSecrets, scopes: &[String]) -> Self {
        Self {
            token: None,
            refresh_token: None,
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes: scopes.to_vec(),
            expiry: None,
        }
    }
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// OAuth token endpoint
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange a refresh token for a new access token
    async fn refresh(&self, credential: &Credential) -> Result<TokenResponse>;

    /// Exchange an authorization code obtained through consent
    async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse>;
}

/// Google's token endpoint over HTTPS
pub struct GoogleTokenEndpoint {
    client: Client,
}

impl GoogleTokenEndpoint {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CalendarError::Configuration(e.to_string()))?;
        Ok(Self { client })
    }

    async fn post_form(&self, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
        debug!("POST {}", token_uri);
        let response = self
            .client
            .post(token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| CalendarError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CalendarError::HttpError(e.to_string()))?;

        if !status.is_success() {
            warn!("Token request failed: {} - {}", status, body);
            return Err(CalendarError::Authentication(format!("{}: {}", status, body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| CalendarError::ParseError(format!("invalid token response: {}", e)))
    }
}

#[async_trait]
impl TokenEndpoint for GoogleTokenEndpoint {
    async fn refresh(&self, credential: &Credential) -> Result<TokenResponse> {
        let refresh_token = credential.refresh_token.as_deref().ok_or_else(|| {
            CalendarError::Authentication("credential has no refresh token".to_string())
        })?;

        self.post_form(
            &credential.token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &credential.client_id),
                ("client_secret", &credential.client_secret),
            ],
        )
        .await
    }

    async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        self.post_form(
            &secrets.token_uri,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", &secrets.client_id),
                ("client_secret", &secrets.client_secret),
            ],
        )
        .await
    }
}

/// Interactive user consent producing a fresh credential
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn authorize(&self, secrets: &ClientSecrets, scopes: &[String]) -> Result<Credential>;
}

/// Installed-app flow with a loopback redirect on an ephemeral port
pub struct LoopbackConsentFlow {
    token_endpoint: Arc<dyn TokenEndpoint>,
    timeout: Duration,
}

impl LoopbackConsentFlow {
    pub fn new(token_endpoint: Arc<dyn TokenEndpoint>) -> Self {
        Self {
            token_endpoint,
            timeout: Duration::from_secs(300),
        }
    }

    /// How long to wait for the browser redirect
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ConsentFlow for LoopbackConsentFlow {
    async fn authorize(&self, secrets: &ClientSecrets, scopes: &[String]) -> Result<Credential> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| CalendarError::Connection(e.to_string()))?;
        let port = listener
            .local_addr()
            .map_err(|e| CalendarError::Connection(e.to_string()))?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{}/", port);
        let state = uuid::Uuid::new_v4().simple().to_string();

        let url = authorization_url(secrets, scopes, &redirect_uri, &state)?;
        println!("Please visit this URL to authorize this application: {}", url);

        let callback = tokio::time::timeout(self.timeout, receive_callback(listener))
            .await
            .map_err(|_| {
                CalendarError::Authentication("timed out waiting for user consent".to_string())
            })??;
        if callback.state.as_deref() != Some(state.as_str()) {
            return Err(CalendarError::Authentication(
                "OAuth state mismatch in redirect".to_string(),
            ));
        }

        let response = self
            .token_endpoint
            .exchange_code(secrets, &callback.code, &redirect_uri)
            .await?;
        info!("OAuth consent completed");

        Ok(Credential::from_secrets(secrets, scopes).apply(response, Utc::now()))
    }
}

/// Consent URL the user opens in a browser
pub fn authorization_url(
    secrets: &ClientSecrets,
    scopes: &[String],
    redirect_uri: &str,
    state: &str,
) -> Result<Url> {
    let scope = scopes.join(" ");
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| CalendarError::Configuration(format!("invalid auth_uri: {}", e)))
}

/// Authorization code delivered to the loopback redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    pub code: String,
    pub state: Option<String>,
}

/// Query of a request hitting the loopback server
#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl CallbackParams {
    /// `None` for requests that are not the consent redirect
    fn into_outcome(self) -> Option<Result<Callback>> {
        if let Some(error) = self.error {
            return Some(Err(CalendarError::Authentication(format!(
                "consent denied: {}",
                error
            ))));
        }
        let code = self.code?;
        Some(Ok(Callback {
            code,
            state: self.state,
        }))
    }
}

type CallbackSender = oneshot::Sender<Result<Callback>>;

struct CallbackState {
    sender: Mutex<Option<CallbackSender>>,
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, &'static str) {
    let Some(outcome) = params.into_outcome() else {
        return (StatusCode::NOT_FOUND, "Waiting for the authorization redirect");
    };

    let sender = state.sender.lock().ok().and_then(|mut slot| slot.take());
    match sender {
        Some(tx) => {
            debug!("Received OAuth redirect");
            let _ = tx.send(outcome);
            (
                StatusCode::OK,
                "The authentication flow has completed. You may close this window.",
            )
        }
        None => (StatusCode::GONE, "The authentication flow has already completed."),
    }
}

/// Serve the redirect target on `listener` until the first callback arrives
///
/// Requests without `code` or `error` (favicon, browser preconnects) are
/// answered and ignored.
pub async fn receive_callback(listener: TcpListener) -> Result<Callback> {
    let (tx, rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = Router::new()
        .route("/", get(handle_callback))
        .with_state(Arc::new(CallbackState {
            sender: Mutex::new(Some(tx)),
        }));

    tokio::spawn(async move {
        let shutdown = async move {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            warn!("OAuth redirect server error: {}", e);
        }
    });

    let outcome = rx.await.map_err(|_| {
        CalendarError::Connection("OAuth redirect server stopped".to_string())
    });
    let _ = shutdown_tx.send(());
    outcome?
}

/// Loads, refreshes and persists per-user credentials
pub struct CredentialManager {
    store: Arc<dyn KeyValueStore>,
    client_secrets_path: PathBuf,
    scopes: Vec<String>,
    token_endpoint: Arc<dyn TokenEndpoint>,
    consent: Arc<dyn ConsentFlow>,
}

impl CredentialManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        client_secrets_path: impl Into<PathBuf>,
        token_endpoint: Arc<dyn TokenEndpoint>,
        consent: Arc<dyn ConsentFlow>,
    ) -> Self {
        Self {
            store,
            client_secrets_path: client_secrets_path.into(),
            scopes: vec![CALENDAR_SCOPE.to_string()],
            token_endpoint,
            consent,
        }
    }

    /// Google endpoints with the loopback consent flow
    pub fn google(store: Arc<dyn KeyValueStore>, client_secrets_path: impl Into<PathBuf>) -> Result<Self> {
        let endpoint: Arc<dyn TokenEndpoint> = Arc::new(GoogleTokenEndpoint::new()?);
        let consent = Arc::new(LoopbackConsentFlow::new(endpoint.clone()));
        Ok(Self::new(store, client_secrets_path, endpoint, consent))
    }

    /// Valid credential for `user_id`
    ///
    /// A stored valid credential is reused as is. An expired one with a
    /// refresh token is refreshed. Anything else goes through consent. New
    /// or refreshed credentials are written back to the store.
    pub async fn acquire_credentials(&self, user_id: &str) -> Result<Credential> {
        let now = Utc::now();

        if let Some(stored) = self.load(user_id)? {
            if stored.is_valid(now) {
                debug!(user_id, "Using stored credential");
                return Ok(stored);
            }

            if stored.refresh_token.is_some() {
                match self.token_endpoint.refresh(&stored).await {
                    Ok(response) => {
                        let refreshed = stored.apply(response, Utc::now());
                        self.save(user_id, &refreshed)?;
                        info!(user_id, "Refreshed credential");
                        return Ok(refreshed);
                    }
                    Err(e) => warn!(user_id, error = %e, "Credential refresh failed"),
                }
            }
        }

        info!(user_id, "Requesting user consent");
        let secrets = ClientSecrets::from_file(&self.client_secrets_path)?;
        let credential = self.consent.authorize(&secrets, &self.scopes).await?;
        self.save(user_id, &credential)?;
        Ok(credential)
    }

    fn load(&self, user_id: &str) -> Result<Option<Credential>> {
        let Some(raw) = self.store.get(user_id)? else {
            return Ok(None);
        };
        match Credential::from_json_str(&raw) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                warn!(user_id, error = %e, "Ignoring unreadable stored credential");
                Ok(None)
            }
        }
    }

    fn save(&self, user_id: &str, credential: &Credential) -> Result<()> {
        self.store.put(user_id, &credential.to_json_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::MemoryKeyValueStore;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    struct FakeEndpoint {
        refreshes: AtomicU32,
        fail_refresh: bool,
    }

    impl FakeEndpoint {
        fn new(fail_refresh: bool) -> Self {
            Self {
                refreshes: AtomicU32::new(0),
                fail_refresh,
            }
        }
    }

    #[async_trait]
    impl TokenEndpoint for FakeEndpoint {
        async fn refresh(&self, _credential: &Credential) -> Result<TokenResponse> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail_refresh {
                return Err(CalendarError::Authentication("invalid_grant".to_string()));
            }
            Ok(TokenResponse {
                access_token: "refreshed".to_string(),
                expires_in: Some(3600),
                refresh_token: None,
                scope: None,
                token_type: Some("Bearer".to_string()),
            })
        }

        async fn exchange_code(
            &self,
            _secrets: &ClientSecrets,
            _code: &str,
            _redirect_uri: &str,
        ) -> Result<TokenResponse> {
            Err(CalendarError::Authentication("not expected".to_string()))
        }
    }

    struct FakeConsent {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ConsentFlow for FakeConsent {
        async fn authorize(&self, secrets: &ClientSecrets, scopes: &[String]) -> Result<Credential> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Credential {
                token: Some("consented".to_string()),
                refresh_token: Some("refresh-1".to_string()),
                ..Credential::from_secrets(secrets, scopes)
            })
        }
    }

    const SECRETS: &str = r#"{"installed": {"client_id": "cid", "client_secret": "secret",
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token",
        "redirect_uris": ["http://localhost"]}}"#;

    fn credential(token: &str, expiry: Option<DateTime<Utc>>, refresh: Option<&str>) -> Credential {
        Credential {
            token: Some(token.to_string()),
            refresh_token: refresh.map(str::to_string),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            scopes: vec![CALENDAR_SCOPE.to_string()],
            expiry,
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: Arc<MemoryKeyValueStore>,
        endpoint: Arc<FakeEndpoint>,
        consent: Arc<FakeConsent>,
        manager: CredentialManager,
    }

    fn fixture(fail_refresh: bool) -> Fixture {
        let dir = TempDir::new().unwrap();
        let secrets_path = dir.path().join("credentials.json");
        std::fs::write(&secrets_path, SECRETS).unwrap();

        let store = Arc::new(MemoryKeyValueStore::new());
        let endpoint = Arc::new(FakeEndpoint::new(fail_refresh));
        let consent = Arc::new(FakeConsent {
            calls: AtomicU32::new(0),
        });
        let manager = CredentialManager::new(
            store.clone(),
            secrets_path,
            endpoint.clone(),
            consent.clone(),
        );

        Fixture {
            _dir: dir,
            store,
            endpoint,
            consent,
            manager,
        }
    }

    #[tokio::test]
    async fn test_valid_stored_credential_skips_consent() {
        let f = fixture(false);
        let stored = credential("stored", Some(Utc::now() + TimeDelta::hours(1)), None);
        f.store
            .put("11996046537", &stored.to_json_string().unwrap())
            .unwrap();

        let acquired = f.manager.acquire_credentials("11996046537").await.unwrap();

        assert_eq!(acquired.token.as_deref(), Some("stored"));
        assert_eq!(f.consent.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.endpoint.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_credential_is_refreshed_and_saved() {
        let f = fixture(false);
        let stored = credential("old", Some(Utc::now() - TimeDelta::minutes(5)), Some("refresh-1"));
        f.store.put("user", &stored.to_json_string().unwrap()).unwrap();

        let acquired = f.manager.acquire_credentials("user").await.unwrap();

        assert_eq!(acquired.token.as_deref(), Some("refreshed"));
        assert_eq!(acquired.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(f.consent.calls.load(Ordering::SeqCst), 0);

        let saved = Credential::from_json_str(&f.store.get("user").unwrap().unwrap()).unwrap();
        assert_eq!(saved.token.as_deref(), Some("refreshed"));
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_consent() {
        let f = fixture(true);
        let stored = credential("old", Some(Utc::now() - TimeDelta::minutes(5)), Some("refresh-1"));
        f.store.put("user", &stored.to_json_string().unwrap()).unwrap();

        let acquired = f.manager.acquire_credentials("user").await.unwrap();

        assert_eq!(acquired.token.as_deref(), Some("consented"));
        assert_eq!(f.endpoint.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(f.consent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_credential_runs_consent_and_persists() {
        let f = fixture(false);

        let acquired = f.manager.acquire_credentials("new-user").await.unwrap();

        assert_eq!(acquired.client_id, "cid");
        assert_eq!(acquired.scopes, vec![CALENDAR_SCOPE.to_string()]);
        assert_eq!(f.consent.calls.load(Ordering::SeqCst), 1);
        assert!(f.store.get("new-user").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreadable_credential_runs_consent() {
        let f = fixture(false);
        f.store.put("user", "not json").unwrap();

        let acquired = f.manager.acquire_credentials("user").await.unwrap();
        assert_eq!(acquired.token.as_deref(), Some("consented"));
    }

    #[test]
    fn test_expiry_margin() {
        let now = Utc::now();
        assert!(credential("t", Some(now + TimeDelta::seconds(30)), None).is_expired(now));
        assert!(!credential("t", Some(now + TimeDelta::seconds(120)), None).is_expired(now));
        assert!(credential("t", None, None).is_valid(now));
    }

    #[test]
    fn test_reads_google_authorized_user_json() {
        let raw = r#"{"token": "ya29.a0", "refresh_token": "1//0g", "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "cid", "client_secret": "secret", "scopes": ["https://www.googleapis.com/auth/calendar"],
            "universe_domain": "googleapis.com", "account": "", "expiry": "2024-03-15T12:00:00.123456Z"}"#;
        let credential = Credential::from_json_str(raw).unwrap();
        assert_eq!(credential.refresh_token.as_deref(), Some("1//0g"));
        assert!(credential.expiry.is_some());
    }

    #[test]
    fn test_client_secrets_web_section() {
        let secrets = ClientSecrets::from_json(r#"{"web": {"client_id": "w", "client_secret": "s"}}"#).unwrap();
        assert_eq!(secrets.client_id, "w");
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
        assert!(ClientSecrets::from_json("{}").is_err());
    }

    #[test]
    fn test_authorization_url() {
        let secrets = ClientSecrets::from_json(SECRETS).unwrap();
        let url = authorization_url(
            &secrets,
            &[CALENDAR_SCOPE.to_string()],
            "http://localhost:5555/",
            "abc",
        )
        .unwrap();

        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "cid");
        assert_eq!(pairs["redirect_uri"], "http://localhost:5555/");
        assert_eq!(pairs["scope"], CALENDAR_SCOPE);
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["state"], "abc");
    }

    async fn bind_loopback() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        (listener, base)
    }

    #[tokio::test]
    async fn test_receive_callback_ignores_unrelated_requests() {
        let (listener, base) = bind_loopback().await;
        let pending = tokio::spawn(receive_callback(listener));
        let http = Client::new();

        let favicon = http.get(format!("{}/favicon.ico", base)).send().await.unwrap();
        assert_eq!(favicon.status(), 404);
        let bare = http.get(format!("{}/", base)).send().await.unwrap();
        assert_eq!(bare.status(), 404);
        assert!(!pending.is_finished());

        let redirect = http
            .get(format!("{}/?state=abc&code=4%2F0Ae&scope=x", base))
            .send()
            .await
            .unwrap();
        assert_eq!(redirect.status(), 200);

        let callback = pending.await.unwrap().unwrap();
        assert_eq!(callback.code, "4/0Ae");
        assert_eq!(callback.state.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_receive_callback_consent_denied() {
        let (listener, base) = bind_loopback().await;
        let pending = tokio::spawn(receive_callback(listener));

        Client::new()
            .get(format!("{}/?error=access_denied", base))
            .send()
            .await
            .unwrap();

        let err = pending.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }
}
