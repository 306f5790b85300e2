//! # Rolegate App Configuration
//!
//! [`RoleStore`](rolegate_core::RoleStore) implementation backed by the Azure
//! App Configuration REST API.
//!
//! Two ways to authenticate:
//!
//! - **Connection string** (`Endpoint=...;Id=...;Secret=...`): every request
//!   is HMAC-SHA256 signed with the access key.
//! - **Endpoint + credential chain**: bearer tokens from managed identity,
//!   then environment client-secret credentials, then the Azure CLI.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rolegate_appconfig::{ClientOptions, StoreSettings};
//! use rolegate_core::RoleStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = StoreSettings::from_env();
//! let client = settings.connect(ClientOptions::default()).await?;
//! let keys = client.list("users:*").await?;
//! println!("{} role assignments", keys.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod credential;
pub mod error;
pub mod settings;
pub mod signing;

pub use client::{AppConfigClient, ClientOptions};
pub use connection::ConnectionString;
pub use credential::{
    AccessToken, AzureCliCredential, ChainedTokenCredential, EnvironmentCredential,
    ManagedIdentityCredential, TokenCredential,
};
pub use error::CredentialError;
pub use settings::{StoreAuth, StoreSettings};
