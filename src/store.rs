//! Mode-aware convenience layer over [`Client`]

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::Client;
use crate::codec::{Codec, Mode};
use crate::config::ClientConfig;
use crate::error::Result;

/// Key-value access with values encoded according to a [`Mode`].
///
/// In [`Mode::Json`] values are serialized on write and parsed on read; in
/// [`Mode::Raw`] they are stored as plain strings.
///
/// # Example
/// ```rust,no_run
/// use repldb_client::{Mode, Store};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), repldb_client::Error> {
///     let store = Store::new("http://localhost:8080", Mode::Json)?;
///
///     store.set("settings", &json!({"theme": "dark"})).await?;
///     let settings = store.get("settings").await?;
///     assert_eq!(settings, Some(json!({"theme": "dark"})));
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Store {
    client: Client,
    mode: Mode,
    codec: Codec,
}

impl Store {
    pub fn new(endpoint: &str, mode: Mode) -> Result<Self> {
        Self::with_config(ClientConfig::new(endpoint).with_mode(mode))
    }

    /// Build from `REPLIT_DB_URL` and `REPLIT_DB_MODE`
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Ok(Self::from_client(Client::with_config(config)?))
    }

    /// Wrap an existing client, using the mode it was configured with
    pub fn from_client(client: Client) -> Self {
        let mode = client.mode();
        Self {
            client,
            mode,
            codec: mode.codec(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Retrieve and decode the value under `key`
    ///
    /// Missing keys and empty values both yield `None`. In json mode a stored
    /// value that is not valid JSON is an [`Error::Json`](crate::Error::Json).
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.client.get(key).await? {
            Some(text) if !text.is_empty() => Ok(Some(self.codec.decode(&text)?)),
            _ => Ok(None),
        }
    }

    /// Retrieve the value under `key` as a concrete type
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Encode and store `value` under `key`
    ///
    /// Whether the database accepted the write is not reported; a rejected
    /// write is only logged. Use [`Client::try_set`] when that matters.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let text = self.codec.encode(&serde_json::to_value(value)?)?;
        self.client.set(key, &text).await?;
        Ok(())
    }

    /// List keys under `prefix` (empty for all keys)
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.client.list_prefix(prefix).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.client.delete(key).await
    }

    /// Delete every key under a non-empty `prefix`
    pub async fn delete_prefix(&self, prefix: &str) -> Result<bool> {
        self.client.delete_prefix(prefix).await
    }

    pub async fn delete_everything(&self) -> bool {
        self.client.delete_everything().await
    }
}
