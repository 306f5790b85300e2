//! App Configuration connection strings

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rolegate_core::StoreError;
use std::fmt;

/// Parsed `Endpoint=...;Id=...;Secret=...` connection string
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub endpoint: String,
    pub id: String,
    secret: Vec<u8>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let mut endpoint = None;
        let mut id = None;
        let mut secret = None;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // The secret is base64 and may itself end in '='
            let Some((name, value)) = part.split_once('=') else {
                return Err(StoreError::configuration(
                    "Malformed connection string: expected Name=Value segments",
                ));
            };
            match name.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim().trim_end_matches('/').to_string()),
                "id" => id = Some(value.trim().to_string()),
                "secret" => secret = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let endpoint = endpoint
            .filter(|e| !e.is_empty())
            .ok_or_else(|| StoreError::configuration("Connection string is missing Endpoint"))?;
        let id = id
            .filter(|i| !i.is_empty())
            .ok_or_else(|| StoreError::configuration("Connection string is missing Id"))?;
        let secret = secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| StoreError::configuration("Connection string is missing Secret"))?;
        let secret = STANDARD
            .decode(secret.as_bytes())
            .map_err(|e| StoreError::configuration(format!("Connection string Secret is not base64: {}", e)))?;

        Ok(Self { endpoint, id, secret })
    }

    /// Decoded access key
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

// Never print the secret
impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint)
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
