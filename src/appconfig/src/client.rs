//! App Configuration REST client

use crate::connection::ConnectionString;
use crate::credential::{AccessToken, TokenCredential};
use crate::signing::HmacSigner;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Method, Response, Url};
use rolegate_core::{Result, RoleStore, StoreError, StoredValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

const KV_CONTENT_TYPE: &str = "application/vnd.microsoft.appconfig.kv+json";
const KV_ACCEPT: &str = "application/vnd.microsoft.appconfig.kv+json, application/json, application/problem+json";
const KVSET_ACCEPT: &str =
    "application/vnd.microsoft.appconfig.kvset+json, application/json, application/problem+json";

/// Refresh bearer tokens this long before they expire
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout
    pub timeout: Duration,

    /// REST API version sent with every request
    pub api_version: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            api_version: "1.0".to_string(),
        }
    }
}

enum Auth {
    Hmac(HmacSigner),
    Bearer {
        credential: Arc<dyn TokenCredential>,
        scope: String,
        cached: Mutex<Option<AccessToken>>,
    },
}

#[derive(Deserialize)]
struct KeyValue {
    key: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Deserialize)]
struct KeyValuePage {
    #[serde(default)]
    items: Vec<KeyValue>,
    #[serde(rename = "@nextLink", default)]
    next_link: Option<String>,
}

#[derive(Serialize)]
struct KeyValueBody<'a> {
    value: &'a str,
    content_type: &'a str,
}

/// Role store backed by an App Configuration instance
pub struct AppConfigClient {
    http: reqwest::Client,
    endpoint: Url,
    auth: Auth,
    options: ClientOptions,
}

impl AppConfigClient {
    /// Client authenticating with the HMAC access key from a connection string
    pub fn from_connection_string(connection_string: &str, options: ClientOptions) -> Result<Self> {
        let connection = ConnectionString::parse(connection_string)?;
        let endpoint = parse_endpoint(&connection.endpoint)?;
        Ok(Self {
            http: build_http(&options)?,
            endpoint,
            auth: Auth::Hmac(HmacSigner::new(&connection)),
            options,
        })
    }

    /// Client authenticating with bearer tokens from `credential`
    pub fn with_credential(
        endpoint: &str,
        credential: Arc<dyn TokenCredential>,
        options: ClientOptions,
    ) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        let scope = format!("{}/.default", endpoint.as_str().trim_end_matches('/'));
        Ok(Self {
            http: build_http(&options)?,
            endpoint,
            auth: Auth::Bearer {
                credential,
                scope,
                cached: Mutex::new(None),
            },
            options,
        })
    }

    /// Store endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch the first page of all keys, surfacing authentication problems early
    pub async fn probe(&self) -> Result<()> {
        let url = self.list_url("*")?;
        let response = self.send(Method::GET, url, None, KVSET_ACCEPT, &[]).await?;
        check(response, "probe").await?;
        Ok(())
    }

    fn kv_url(&self, key: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::configuration("Endpoint cannot be a base URL"))?
            .pop_if_empty()
            .push("kv")
            .push(key);
        url.query_pairs_mut()
            .append_pair("api-version", &self.options.api_version);
        Ok(url)
    }

    fn list_url(&self, key_filter: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::configuration("Endpoint cannot be a base URL"))?
            .pop_if_empty()
            .push("kv");
        url.query_pairs_mut()
            .append_pair("key", key_filter)
            .append_pair("api-version", &self.options.api_version);
        Ok(url)
    }

    async fn bearer_token(
        credential: &Arc<dyn TokenCredential>,
        scope: &str,
        cached: &Mutex<Option<AccessToken>>,
    ) -> Result<String> {
        let mut cached = cached.lock().await;
        let margin = ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now(), margin)) {
            return Ok(token.token.clone());
        }

        let token = credential.acquire_token(scope).await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
        accept: &str,
        extra_headers: &[(&str, &str)],
    ) -> Result<Response> {
        debug!("{} {}", method, url.path());

        let payload = body.unwrap_or_default();
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header("Accept", accept);

        match &self.auth {
            Auth::Hmac(signer) => {
                let signed = signer.sign(method.as_str(), &url, &payload, Utc::now());
                request = request
                    .header("x-ms-date", signed.date)
                    .header("x-ms-content-sha256", signed.content_sha256)
                    .header("Authorization", signed.authorization);
            }
            Auth::Bearer {
                credential,
                scope,
                cached,
            } => {
                let token = Self::bearer_token(credential, scope, cached).await?;
                request = request.bearer_auth(token);
            }
        }

        for (name, value) in extra_headers {
            request = request.header(*name, *value);
        }
        if !payload.is_empty() {
            request = request.header("Content-Type", KV_CONTENT_TYPE).body(payload);
        }

        request.send().await.map_err(map_transport_error)
    }

    async fn put(&self, key: &str, value: &str, content_type: &str, create_only: bool) -> Result<()> {
        let body = serde_json::to_vec(&KeyValueBody { value, content_type })
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let headers: &[(&str, &str)] = if create_only {
            &[("If-None-Match", "*")]
        } else {
            &[]
        };

        let response = self
            .send(Method::PUT, self.kv_url(key)?, Some(body), KV_ACCEPT, headers)
            .await?;
        check(response, key).await?;
        Ok(())
    }
}

#[async_trait]
impl RoleStore for AppConfigClient {
    async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        let response = self
            .send(Method::GET, self.kv_url(key)?, None, KV_ACCEPT, &[])
            .await?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        let kv: KeyValue = check(response, key)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("{}: {}", key, e)))?;

        Ok(Some(StoredValue {
            value: kv.value.unwrap_or_default(),
            content_type: kv.content_type,
        }))
    }

    async fn set(&self, key: &str, value: &str, content_type: &str) -> Result<()> {
        self.put(key, value, content_type, false).await
    }

    async fn add(&self, key: &str, value: &str, content_type: &str) -> Result<()> {
        self.put(key, value, content_type, true).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let response = self
            .send(Method::DELETE, self.kv_url(key)?, None, KV_ACCEPT, &[])
            .await?;

        // 204 means there was nothing to delete
        match response.status().as_u16() {
            204 | 404 => Ok(false),
            _ => {
                check(response, key).await?;
                Ok(true)
            }
        }
    }

    async fn list(&self, key_filter: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut url = self.list_url(key_filter)?;

        loop {
            let response = self.send(Method::GET, url, None, KVSET_ACCEPT, &[]).await?;
            let page: KeyValuePage = check(response, key_filter)
                .await?
                .json()
                .await
                .map_err(|e| StoreError::Decode(format!("{}: {}", key_filter, e)))?;

            keys.extend(page.items.into_iter().map(|kv| kv.key));

            match page.next_link {
                Some(next) => {
                    url = self
                        .endpoint
                        .join(&next)
                        .map_err(|e| StoreError::Decode(format!("Invalid next link '{}': {}", next, e)))?;
                }
                None => break,
            }
        }

        Ok(keys)
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint.trim())
        .map_err(|e| StoreError::configuration(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
    if url.host_str().is_none() {
        return Err(StoreError::configuration(format!(
            "Endpoint '{}' has no host",
            endpoint
        )));
    }
    Ok(url)
}

fn build_http(options: &ClientOptions) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(options.timeout)
        .build()
        .map_err(|e| StoreError::configuration(format!("Failed to build HTTP client: {}", e)))
}

fn map_transport_error(err: reqwest::Error) -> StoreError {
    if err.is_builder() {
        StoreError::configuration(err.to_string())
    } else {
        StoreError::transient(err.to_string())
    }
}

/// Turn a non-success response into a classified error
async fn check(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::from_status(
        status.as_u16(),
        format!("{}: {}", context, body.trim()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AppConfigClient {
        AppConfigClient::from_connection_string(
            "Endpoint=https://example.azconfig.io;Id=abc-id;Secret=c3VwZXItc2VjcmV0LWtleQ==",
            ClientOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_kv_url_keeps_key_readable() {
        let url = client().kv_url("users:a@x.com:roles").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.azconfig.io/kv/users:a@x.com:roles?api-version=1.0"
        );
    }

    #[test]
    fn test_list_url_encodes_filter() {
        let url = client().list_url("users:*").unwrap();
        assert_eq!(url.path(), "/kv");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("key".to_string(), "users:*".to_string()),
                ("api-version".to_string(), "1.0".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_endpoint_is_configuration_error() {
        let err = AppConfigClient::from_connection_string(
            "Endpoint=not a url;Id=abc-id;Secret=c3VwZXItc2VjcmV0LWtleQ==",
            ClientOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[test]
    fn test_page_decoding() {
        let page: KeyValuePage = serde_json::from_str(
            r#"{"items":[{"key":"users:a@x.com:roles","value":"[\"Admin\"]","content_type":"application/json"}],
                "@nextLink":"/kv?key=users%3A*&api-version=1.0&after=abc"}"#,
        )
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].key, "users:a@x.com:roles");
        assert!(page.next_link.is_some());

        let last: KeyValuePage = serde_json::from_str(r#"{"items":[]}"#).unwrap();
        assert!(last.next_link.is_none());
    }
}
