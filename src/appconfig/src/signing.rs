//! HMAC-SHA256 request signing for connection-string authentication

use crate::connection::ConnectionString;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::Url;
use ring::{digest, hmac};

const SIGNED_HEADERS: &str = "x-ms-date;host;x-ms-content-sha256";

/// Headers to attach to a signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub date: String,
    pub content_sha256: String,
    pub authorization: String,
}

/// Signs requests with the access key from a connection string
pub struct HmacSigner {
    credential_id: String,
    key: hmac::Key,
}

impl HmacSigner {
    pub fn new(connection: &ConnectionString) -> Self {
        Self {
            credential_id: connection.id.clone(),
            key: hmac::Key::new(hmac::HMAC_SHA256, connection.secret()),
        }
    }

    /// Produce the signature headers for one request
    pub fn sign(&self, method: &str, url: &Url, body: &[u8], now: DateTime<Utc>) -> SignedHeaders {
        let date = http_date(now);
        let content_sha256 = content_hash(body);
        let to_sign = string_to_sign(method, &path_and_query(url), &date, &host_of(url), &content_sha256);
        let signature = STANDARD.encode(hmac::sign(&self.key, to_sign.as_bytes()).as_ref());

        SignedHeaders {
            authorization: format!(
                "HMAC-SHA256 Credential={}&SignedHeaders={}&Signature={}",
                self.credential_id, SIGNED_HEADERS, signature
            ),
            date,
            content_sha256,
        }
    }
}

/// RFC 1123 date as expected in `x-ms-date`
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Base64 SHA-256 of the request body
pub fn content_hash(body: &[u8]) -> String {
    STANDARD.encode(digest::digest(&digest::SHA256, body).as_ref())
}

pub fn string_to_sign(
    method: &str,
    path_and_query: &str,
    date: &str,
    host: &str,
    content_hash: &str,
) -> String {
    format!(
        "{}\n{}\n{};{};{}",
        method.to_ascii_uppercase(),
        path_and_query,
        date,
        host,
        content_hash
    )
}

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn host_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
