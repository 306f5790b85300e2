//! Store connection settings and client construction

use crate::client::{AppConfigClient, ClientOptions};
use crate::credential::ChainedTokenCredential;
use rolegate_core::{Result, StoreError};
use std::sync::Arc;
use tracing::{info, warn};

pub const CONNECTION_STRING_ENV: &str = "AZURE_APPCONFIG_CONNECTION_STRING";
pub const ENDPOINT_ENV: &str = "AZURE_APPCONFIG_ENDPOINT";

/// How to reach the store
#[derive(Debug, Clone, Default)]
pub struct StoreSettings {
    pub connection_string: Option<String>,
    pub endpoint: Option<String>,
}

/// Authentication path chosen from [`StoreSettings`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAuth {
    ConnectionString(String),
    Endpoint(String),
}

impl StoreSettings {
    pub fn new(connection_string: Option<String>, endpoint: Option<String>) -> Self {
        Self {
            connection_string,
            endpoint,
        }
    }

    /// Read `AZURE_APPCONFIG_CONNECTION_STRING` and `AZURE_APPCONFIG_ENDPOINT`
    pub fn from_env() -> Self {
        Self::new(
            std::env::var(CONNECTION_STRING_ENV).ok(),
            std::env::var(ENDPOINT_ENV).ok(),
        )
    }

    /// Pick the authentication path. A connection string wins over an endpoint.
    pub fn auth(&self) -> Result<StoreAuth> {
        let connection_string = non_blank(&self.connection_string);
        let endpoint = non_blank(&self.endpoint);

        match (connection_string, endpoint) {
            (Some(cs), Some(_)) => {
                warn!("Both a connection string and an endpoint were supplied; using the connection string");
                Ok(StoreAuth::ConnectionString(cs))
            }
            (Some(cs), None) => Ok(StoreAuth::ConnectionString(cs)),
            (None, Some(endpoint)) => Ok(StoreAuth::Endpoint(endpoint)),
            (None, None) => Err(StoreError::configuration(
                "Either a connection string or an endpoint must be provided",
            )),
        }
    }

    /// Build a client without contacting the store
    pub fn build(&self, options: ClientOptions) -> Result<AppConfigClient> {
        client_for(&self.auth()?, options)
    }

    /// Build a client. Endpoint clients are probed once so that credential
    /// problems surface here rather than on the first real request.
    pub async fn connect(&self, options: ClientOptions) -> Result<AppConfigClient> {
        let auth = self.auth()?;
        let client = client_for(&auth, options)?;
        if let StoreAuth::Endpoint(endpoint) = &auth {
            client.probe().await.map_err(|e| {
                warn!("Connection test failed: {}", e);
                match e {
                    StoreError::Unauthorized(msg) => StoreError::Unauthorized(format!(
                        "Failed to authenticate to {}: {}",
                        endpoint, msg
                    )),
                    other => other,
                }
            })?;
            info!("Connection test successful");
        }
        Ok(client)
    }
}

fn client_for(auth: &StoreAuth, options: ClientOptions) -> Result<AppConfigClient> {
    match auth {
        StoreAuth::ConnectionString(cs) => {
            info!("Connecting with connection string");
            AppConfigClient::from_connection_string(cs, options)
        }
        StoreAuth::Endpoint(endpoint) => {
            info!("Connecting to endpoint {}", endpoint);
            let http = reqwest::Client::builder()
                .timeout(options.timeout)
                .build()
                .map_err(|e| StoreError::configuration(format!("Failed to build HTTP client: {}", e)))?;
            let credential = Arc::new(ChainedTokenCredential::default_chain(http));
            AppConfigClient::with_credential(endpoint, credential, options)
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
