//! Authentication gate
//!
//! Login itself happens upstream, in an authenticating reverse proxy (App
//! Service authentication or an equivalent OIDC proxy). The gate only reads
//! the identity the proxy vouches for.

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Identity of an authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Human readable name
    pub display_name: String,

    /// Stable username (preferred username / e-mail); the role lookup key
    pub stable_username: String,
}

/// Answers "is the caller authenticated, and who are they"
pub trait AuthGate: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    fn is_authenticated(&self) -> bool {
        self.current_identity().is_some()
    }

    /// Where to send the caller to log in
    fn login_url(&self) -> String;

    /// Where to send the caller to log out
    fn logout_url(&self) -> String;
}

/// Header names and redirect paths used by [`ProxyHeaderGate`]
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub username_header: String,
    pub principal_header: String,
    pub login_path: String,
    pub logout_path: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            username_header: "x-ms-client-principal-name".to_string(),
            principal_header: "x-ms-client-principal".to_string(),
            login_path: "/.auth/login/aad".to_string(),
            logout_path: "/.auth/logout".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ClientPrincipal {
    #[serde(default)]
    claims: Vec<Claim>,
}

#[derive(Deserialize)]
struct Claim {
    typ: String,
    val: String,
}

/// Gate reading the identity forwarded by the authenticating proxy
#[derive(Debug, Clone)]
pub struct ProxyHeaderGate {
    identity: Option<Identity>,
    login_path: String,
    logout_path: String,
}

impl ProxyHeaderGate {
    pub fn from_headers(headers: &HeaderMap, config: &GateConfig) -> Self {
        let username = header_str(headers, &config.username_header)
            .map(str::trim)
            .filter(|u| !u.is_empty());

        let identity = username.map(|username| Identity {
            display_name: header_str(headers, &config.principal_header)
                .and_then(display_name_from_principal)
                .unwrap_or_else(|| username.to_string()),
            stable_username: username.to_string(),
        });

        Self {
            identity,
            login_path: config.login_path.clone(),
            logout_path: config.logout_path.clone(),
        }
    }
}

impl AuthGate for ProxyHeaderGate {
    fn current_identity(&self) -> Option<Identity> {
        self.identity.clone()
    }

    fn login_url(&self) -> String {
        self.login_path.clone()
    }

    fn logout_url(&self) -> String {
        self.logout_path.clone()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `name` claim from the base64 JSON client principal header
fn display_name_from_principal(encoded: &str) -> Option<String> {
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let principal: ClientPrincipal = serde_json::from_slice(&decoded).ok()?;
    principal
        .claims
        .into_iter()
        .find(|c| c.typ == "name")
        .map(|c| c.val)
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn principal_header(name: &str) -> HeaderValue {
        let json = format!(
            r#"{{"auth_typ":"aad","claims":[{{"typ":"preferred_username","val":"alice@example.com"}},{{"typ":"name","val":"{}"}}]}}"#,
            name
        );
        HeaderValue::from_str(&STANDARD.encode(json)).unwrap()
    }

    #[test]
    fn test_no_headers_is_unauthenticated() {
        let gate = ProxyHeaderGate::from_headers(&HeaderMap::new(), &GateConfig::default());
        assert!(!gate.is_authenticated());
        assert!(gate.current_identity().is_none());
        assert_eq!(gate.login_url(), "/.auth/login/aad");
    }

    #[test]
    fn test_username_header_authenticates() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-client-principal-name", HeaderValue::from_static("Alice@Example.com"));

        let gate = ProxyHeaderGate::from_headers(&headers, &GateConfig::default());
        let identity = gate.current_identity().unwrap();
        assert_eq!(identity.stable_username, "Alice@Example.com");
        assert_eq!(identity.display_name, "Alice@Example.com");
    }

    #[test]
    fn test_display_name_from_principal_claims() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-client-principal-name", HeaderValue::from_static("alice@example.com"));
        headers.insert("x-ms-client-principal", principal_header("Alice Liddell"));

        let gate = ProxyHeaderGate::from_headers(&headers, &GateConfig::default());
        assert_eq!(gate.current_identity().unwrap().display_name, "Alice Liddell");
    }

    #[test]
    fn test_garbled_principal_falls_back_to_username() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-client-principal-name", HeaderValue::from_static("alice@example.com"));
        headers.insert("x-ms-client-principal", HeaderValue::from_static("%%%not-base64"));

        let gate = ProxyHeaderGate::from_headers(&headers, &GateConfig::default());
        assert_eq!(gate.current_identity().unwrap().display_name, "alice@example.com");
    }

    #[test]
    fn test_blank_username_is_unauthenticated() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-client-principal-name", HeaderValue::from_static("  "));
        let gate = ProxyHeaderGate::from_headers(&headers, &GateConfig::default());
        assert!(!gate.is_authenticated());
    }
}
