//! Bearer token credentials and the fallback chain
//!
//! The default chain goes from the most automated source to the most
//! interactive one: managed identity, then client-secret variables in the
//! environment, then a logged-in Azure CLI.

use crate::error::CredentialError;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type Result<T> = std::result::Result<T, CredentialError>;

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";
const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const IMDS_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const CLI_TIMEOUT: Duration = Duration::from_secs(10);

/// Access token with its expiry
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// Whether the token is still usable for at least `margin`
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: ChronoDuration) -> bool {
        now + margin < self.expires_on
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Source of bearer tokens
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Acquire a token for `scope` (e.g. `https://example.azconfig.io/.default`)
    async fn acquire_token(&self, scope: &str) -> Result<AccessToken>;
}

/// Tries each credential in order until one yields a token.
///
/// Credentials reporting [`CredentialError::Unavailable`] are skipped. Any
/// other failure stops the chain, since the credential did apply and the
/// identity provider rejected it.
pub struct ChainedTokenCredential {
    sources: Vec<Arc<dyn TokenCredential>>,
}

impl ChainedTokenCredential {
    pub fn new(sources: Vec<Arc<dyn TokenCredential>>) -> Self {
        Self { sources }
    }

    /// Managed identity → environment → Azure CLI
    pub fn default_chain(http: reqwest::Client) -> Self {
        Self::new(vec![
            Arc::new(ManagedIdentityCredential::from_env(http.clone())),
            Arc::new(EnvironmentCredential::from_env(http)),
            Arc::new(AzureCliCredential::new()),
        ])
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl TokenCredential for ChainedTokenCredential {
    fn name(&self) -> &'static str {
        "ChainedTokenCredential"
    }

    async fn acquire_token(&self, scope: &str) -> Result<AccessToken> {
        let mut attempts = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match source.acquire_token(scope).await {
                Ok(token) => {
                    info!("Acquired access token via {}", source.name());
                    return Ok(token);
                }
                Err(err) if err.is_unavailable() => {
                    debug!("Skipping {}: {}", source.name(), err);
                    attempts.push(err.to_string());
                }
                Err(err) => {
                    warn!("{} failed, stopping credential chain: {}", source.name(), err);
                    return Err(err);
                }
            }
        }

        Err(CredentialError::ChainExhausted(attempts))
    }
}

/// Managed identity: App Service identity endpoint when present, else IMDS
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    app_service: Option<(String, String)>,
    imds_endpoint: String,
}

impl ManagedIdentityCredential {
    const NAME: &'static str = "ManagedIdentityCredential";

    pub fn from_env(http: reqwest::Client) -> Self {
        let app_service = match (
            std::env::var("IDENTITY_ENDPOINT"),
            std::env::var("IDENTITY_HEADER"),
        ) {
            (Ok(endpoint), Ok(header)) if !endpoint.is_empty() && !header.is_empty() => {
                Some((endpoint, header))
            }
            _ => None,
        };

        Self {
            http,
            app_service,
            imds_endpoint: IMDS_ENDPOINT.to_string(),
        }
    }

    async fn request(&self, resource: &str) -> Result<reqwest::Response> {
        let request = match &self.app_service {
            Some((endpoint, header)) => self
                .http
                .get(endpoint)
                .query(&[("api-version", APP_SERVICE_API_VERSION), ("resource", resource)])
                .header("X-IDENTITY-HEADER", header),
            None => self
                .http
                .get(&self.imds_endpoint)
                .query(&[("api-version", IMDS_API_VERSION), ("resource", resource)])
                .header("Metadata", "true")
                .timeout(IMDS_PROBE_TIMEOUT),
        };

        request
            .send()
            .await
            .map_err(|e| CredentialError::unavailable(Self::NAME, format!("identity endpoint unreachable: {}", e)))
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn acquire_token(&self, scope: &str) -> Result<AccessToken> {
        let response = self.request(&scope_to_resource(scope)).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            200 => parse_token_response(Self::NAME, &body),
            // IMDS answers 400 when no identity is assigned to the host
            400 | 404 => Err(CredentialError::unavailable(
                Self::NAME,
                format!("no managed identity assigned ({}): {}", status, body),
            )),
            _ => Err(CredentialError::authentication(
                Self::NAME,
                format!("{}: {}", status, body),
            )),
        }
    }
}

/// Client-secret credential from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and
/// `AZURE_CLIENT_SECRET`
pub struct EnvironmentCredential {
    http: reqwest::Client,
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    authority_host: String,
}

impl EnvironmentCredential {
    const NAME: &'static str = "EnvironmentCredential";

    pub fn from_env(http: reqwest::Client) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            http,
            tenant_id: var("AZURE_TENANT_ID"),
            client_id: var("AZURE_CLIENT_ID"),
            client_secret: var("AZURE_CLIENT_SECRET"),
            authority_host: var("AZURE_AUTHORITY_HOST")
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
        }
    }

    pub fn new(
        http: reqwest::Client,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            tenant_id: Some(tenant_id.into()),
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.tenant_id.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn acquire_token(&self, scope: &str) -> Result<AccessToken> {
        let (Some(tenant_id), Some(client_id), Some(client_secret)) =
            (&self.tenant_id, &self.client_id, &self.client_secret)
        else {
            return Err(CredentialError::unavailable(
                Self::NAME,
                "AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET are not all set",
            ));
        };

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            tenant_id
        );
        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("scope", scope),
            ])
            .send()
            .await
            .map_err(|e| CredentialError::authentication(Self::NAME, format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(CredentialError::authentication(
                Self::NAME,
                format!("{}: {}", status, body),
            ));
        }
        parse_token_response(Self::NAME, &body)
    }
}

/// Token from a logged-in Azure CLI (`az account get-access-token`)
#[derive(Debug, Clone)]
pub struct AzureCliCredential {
    program: String,
}

impl AzureCliCredential {
    const NAME: &'static str = "AzureCliCredential";

    pub fn new() -> Self {
        Self {
            program: "az".to_string(),
        }
    }

    /// Use a different executable (mainly for tests)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn acquire_token(&self, scope: &str) -> Result<AccessToken> {
        let resource = scope_to_resource(scope);
        let command = tokio::process::Command::new(&self.program)
            .args(["account", "get-access-token", "--output", "json", "--resource"])
            .arg(&resource)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(CLI_TIMEOUT, command).await {
            Err(_) => {
                return Err(CredentialError::unavailable(Self::NAME, "Azure CLI timed out"));
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialError::unavailable(Self::NAME, "Azure CLI not found on PATH"));
            }
            Ok(Err(e)) => {
                return Err(CredentialError::unavailable(
                    Self::NAME,
                    format!("failed to run Azure CLI: {}", e),
                ));
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("az login") || stderr.contains("az account set") {
                return Err(CredentialError::unavailable(
                    Self::NAME,
                    "not logged in, run 'az login'",
                ));
            }
            return Err(CredentialError::authentication(Self::NAME, stderr.trim().to_string()));
        }

        parse_token_response(Self::NAME, &String::from_utf8_lossy(&output.stdout))
    }
}

/// `https://host/.default` → `https://host`
pub fn scope_to_resource(scope: &str) -> String {
    scope.trim_end_matches("/.default").to_string()
}

/// Parse token JSON from IMDS, App Service, AAD or the Azure CLI
pub(crate) fn parse_token_response(credential: &'static str, body: &str) -> Result<AccessToken> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        CredentialError::authentication(credential, format!("invalid token response: {}", e))
    })?;

    let token = value
        .get("access_token")
        .or_else(|| value.get("accessToken"))
        .and_then(Value::as_str)
        .ok_or_else(|| CredentialError::authentication(credential, "token response has no access token"))?;

    let expires_on = expiry_from(&value).unwrap_or_else(|| Utc::now() + ChronoDuration::hours(1));
    Ok(AccessToken::new(token, expires_on))
}

fn expiry_from(value: &Value) -> Option<DateTime<Utc>> {
    let as_i64 = |v: &Value| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok()));

    if let Some(epoch) = value.get("expires_on").and_then(as_i64) {
        return Utc.timestamp_opt(epoch, 0).single();
    }
    if let Some(secs) = value.get("expires_in").and_then(as_i64) {
        return Some(Utc::now() + ChronoDuration::seconds(secs));
    }
    // Older Azure CLI versions report local time without an offset
    let local = value.get("expiresOn").and_then(Value::as_str)?;
    let naive = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<&'static str>>);

    impl Recorder {
        fn push(&self, name: &'static str) {
            self.0.lock().push(name);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.0.lock().clone()
        }
    }

    enum Outcome {
        Token,
        Unavailable,
        Rejected,
    }

    struct FakeCredential {
        name: &'static str,
        outcome: Outcome,
        recorder: Arc<Recorder>,
    }

    #[async_trait]
    impl TokenCredential for FakeCredential {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn acquire_token(&self, _scope: &str) -> Result<AccessToken> {
            self.recorder.push(self.name);
            match self.outcome {
                Outcome::Token => Ok(AccessToken::new(
                    format!("token-from-{}", self.name),
                    Utc::now() + ChronoDuration::hours(1),
                )),
                Outcome::Unavailable => Err(CredentialError::unavailable(self.name, "not here")),
                Outcome::Rejected => Err(CredentialError::authentication(self.name, "denied")),
            }
        }
    }

    fn chain(outcomes: Vec<(&'static str, Outcome)>, recorder: &Arc<Recorder>) -> ChainedTokenCredential {
        ChainedTokenCredential::new(
            outcomes
                .into_iter()
                .map(|(name, outcome)| {
                    Arc::new(FakeCredential {
                        name,
                        outcome,
                        recorder: recorder.clone(),
                    }) as Arc<dyn TokenCredential>
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_chain_falls_through_unavailable() {
        let recorder = Arc::new(Recorder::default());
        let chain = chain(
            vec![
                ("managed", Outcome::Unavailable),
                ("environment", Outcome::Unavailable),
                ("cli", Outcome::Token),
            ],
            &recorder,
        );

        let token = chain.acquire_token("https://example.azconfig.io/.default").await.unwrap();
        assert_eq!(token.token, "token-from-cli");
        assert_eq!(recorder.calls(), vec!["managed", "environment", "cli"]);
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_token() {
        let recorder = Arc::new(Recorder::default());
        let chain = chain(
            vec![("managed", Outcome::Token), ("cli", Outcome::Token)],
            &recorder,
        );

        let token = chain.acquire_token("scope").await.unwrap();
        assert_eq!(token.token, "token-from-managed");
        assert_eq!(recorder.calls(), vec!["managed"]);
    }

    #[tokio::test]
    async fn test_chain_stops_on_rejection() {
        let recorder = Arc::new(Recorder::default());
        let chain = chain(
            vec![
                ("managed", Outcome::Unavailable),
                ("environment", Outcome::Rejected),
                ("cli", Outcome::Token),
            ],
            &recorder,
        );

        let err = chain.acquire_token("scope").await.unwrap_err();
        assert!(matches!(err, CredentialError::Authentication { credential: "environment", .. }));
        assert_eq!(recorder.calls(), vec!["managed", "environment"]);
    }

    #[tokio::test]
    async fn test_chain_exhausted() {
        let recorder = Arc::new(Recorder::default());
        let chain = chain(
            vec![("managed", Outcome::Unavailable), ("cli", Outcome::Unavailable)],
            &recorder,
        );

        match chain.acquire_token("scope").await.unwrap_err() {
            CredentialError::ChainExhausted(attempts) => assert_eq!(attempts.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_environment_credential_unconfigured_is_unavailable() {
        let credential = EnvironmentCredential {
            http: reqwest::Client::new(),
            tenant_id: Some("tenant".to_string()),
            client_id: None,
            client_secret: None,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
        };
        assert!(!credential.is_configured());

        let err = credential.acquire_token("scope").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_missing_cli_is_unavailable() {
        let credential = AzureCliCredential::with_program("rolegate-test-no-such-az-binary");
        let err = credential.acquire_token("https://example.azconfig.io/.default").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_parse_imds_response() {
        let body = r#"{"access_token":"abc","expires_on":"1900000000","resource":"https://x"}"#;
        let token = parse_token_response("test", body).unwrap();
        assert_eq!(token.token, "abc");
        assert_eq!(token.expires_on.timestamp(), 1_900_000_000);
    }

    #[test]
    fn test_parse_aad_response() {
        let body = r#"{"token_type":"Bearer","expires_in":3599,"access_token":"def"}"#;
        let token = parse_token_response("test", body).unwrap();
        assert_eq!(token.token, "def");
        assert!(token.expires_on > Utc::now() + ChronoDuration::minutes(59));
    }

    #[test]
    fn test_parse_cli_response() {
        let body = r#"{"accessToken":"ghi","expiresOn":"2030-01-01 10:00:00.000000","tokenType":"Bearer"}"#;
        let token = parse_token_response("test", body).unwrap();
        assert_eq!(token.token, "ghi");
        assert!(token.expires_on > Utc::now());
    }

    #[test]
    fn test_parse_rejects_missing_token() {
        assert!(parse_token_response("test", r#"{"expires_in":10}"#).is_err());
        assert!(parse_token_response("test", "not json").is_err());
    }

    #[test]
    fn test_token_freshness() {
        let now = Utc::now();
        let token = AccessToken::new("t", now + ChronoDuration::minutes(10));
        assert!(token.is_fresh(now, ChronoDuration::minutes(5)));
        assert!(!token.is_fresh(now, ChronoDuration::minutes(10)));
    }

    #[test]
    fn test_scope_to_resource() {
        assert_eq!(
            scope_to_resource("https://example.azconfig.io/.default"),
            "https://example.azconfig.io"
        );
    }
}
