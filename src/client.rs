//! HTTP client implementation for Replit DB

use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Method, Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HttpClient;
use hyper_util::rt::TokioExecutor;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};
use url::Url;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::codec::Mode;
use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Characters allowed unencoded in URI path segments per RFC 3986.
/// `/` is kept so that keys like `users/42` stay readable on the wire.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@')
    .remove(b'/');

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Percent-encode a key for use in a URI path.
fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, PATH_SEGMENT).to_string()
}

/// Query string for a prefix listing, encoded the way HTML forms are.
fn prefix_query(prefix: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("prefix", prefix)
        .finish()
}

/// Body of a `set` request.
///
/// Unless `encode` is set, this is the literal `key=value` text the database
/// has always received; neither half is escaped.
fn form_body(key: &str, value: &str, encode: bool) -> String {
    if encode {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair(key, value)
            .finish()
    } else {
        format!("{}={}", key, value)
    }
}

/// Split a newline-delimited listing, dropping blank lines.
fn parse_key_list(body: &str) -> Vec<String> {
    body.split('\n')
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument(
            "`key` must be a non-empty string".to_string(),
        ));
    }
    Ok(())
}

/// Build a rustls ClientConfig backed by the webpki root store.
fn build_tls_config() -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    Ok(rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth())
}

type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;

/// Low-level client speaking the Replit DB wire protocol with raw string values.
///
/// Cheap to clone; clones share the underlying connection pool. Use
/// [`Store`](crate::Store) for mode-aware (JSON) access.
///
/// # Example
/// ```rust,no_run
/// use repldb_client::Client;
///
/// #[tokio::main]
/// async fn main() -> Result<(), repldb_client::Error> {
///     // Reads REPLIT_DB_URL
///     let client = Client::from_env()?;
///
///     if client.set("greeting", "hello").await? {
///         let value = client.get("greeting").await?;
///         assert_eq!(value.as_deref(), Some("hello"));
///     }
///
///     let keys = client.list_prefix("greet").await?;
///     println!("{:?}", keys);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    http_client: HttpClient<HttpsConnector, Full<Bytes>>,
}

impl Client {
    /// Create a client for the given database URL
    ///
    /// # Errors
    /// Returns an error if the URL is empty or not an absolute http(s) URL
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_config(ClientConfig::new(endpoint))
    }

    /// Create a client from `REPLIT_DB_URL` (and optionally `REPLIT_DB_MODE`)
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `REPLIT_DB_URL` is not defined
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Create a new client with custom configuration
    pub fn with_config(mut config: ClientConfig) -> Result<Self> {
        let endpoint = config.endpoint.trim().trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(Error::Config("database URL must not be empty".to_string()));
        }

        let parsed = Url::parse(&endpoint)
            .map_err(|e| Error::InvalidUrl(format!("Invalid endpoint URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "Unsupported scheme '{}' (expected http or https)",
                parsed.scheme()
            )));
        }
        config.endpoint = endpoint;

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(build_tls_config()?)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let http_client = HttpClient::builder(TokioExecutor::new()).build(https_connector);

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }

    /// Get the endpoint URL (without trailing slash)
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Get the mode this client was configured with
    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve a path or query suffix against the endpoint.
    fn url_for(&self, suffix: &str) -> Result<Uri> {
        let url = Url::parse(&format!("{}{}", self.config.endpoint, suffix))
            .map_err(|e| Error::InvalidUrl(format!("Invalid request URL: {}", e)))?;
        url.as_str()
            .parse()
            .map_err(|e| Error::InvalidUrl(format!("Invalid request URL: {}", e)))
    }

    /// Internal request method. Status codes are left to the caller.
    async fn request(
        &self,
        suffix: &str,
        method: &Method,
        body: Option<Bytes>,
        content_type: Option<&str>,
    ) -> Result<Response<Incoming>> {
        let uri = self.url_for(suffix)?;

        let mut builder = Request::builder().method(method.clone()).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }

        let req = builder
            .body(Full::new(body.unwrap_or_default()))
            .map_err(|e| Error::InvalidArgument(format!("Failed to build request: {}", e)))?;

        debug!("Sending request: {} {}", method, suffix);

        self.http_client
            .request(req)
            .await
            .map_err(|e| Error::Connection(format!("Request failed: {}", e)))
    }

    /// Read response body as text, replacing invalid UTF-8
    async fn read_body_to_string(body: Incoming) -> Result<String> {
        let collected = body
            .collect()
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        Ok(String::from_utf8_lossy(&collected.to_bytes()).into_owned())
    }

    /// Retrieve the value stored under `key`
    ///
    /// # Returns
    /// The value text, or None if the database answers 404
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for an empty key, [`Error::Status`] for any
    /// other non-success status and [`Error::Connection`] on transport failure
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;

        let path = format!("/{}", encode_key(key));
        let response = self.request(&path, &Method::GET, None, None).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = Self::read_body_to_string(response.into_body()).await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(Some(text))
    }

    /// Store `value` under `key`
    ///
    /// Failures of the request itself never propagate: they are logged and
    /// reported as `false`. Use [`Client::try_set`] to see the cause.
    ///
    /// # Errors
    /// Only [`Error::InvalidArgument`] for an empty key
    ///
    /// # Example
    /// ```rust,no_run
    /// # use repldb_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), repldb_client::Error> {
    /// # let client = Client::new("http://localhost:8080")?;
    /// if !client.set("user:123", "alice").await? {
    ///     eprintln!("write was rejected");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn set(&self, key: &str, value: &str) -> Result<bool> {
        validate_key(key)?;

        match self.post_form(key, value).await {
            Ok(()) => Ok(true),
            Err(e) => {
                error!("Failed to set key '{}': {}", key, e);
                Ok(false)
            }
        }
    }

    /// Store `value` under `key`, surfacing why a write failed
    pub async fn try_set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.post_form(key, value).await
    }

    async fn post_form(&self, key: &str, value: &str) -> Result<()> {
        let body = form_body(key, value, self.config.encode_form_values);
        let response = self
            .request("", &Method::POST, Some(Bytes::from(body)), Some(FORM_CONTENT_TYPE))
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = Self::read_body_to_string(response.into_body()).await?;
        Err(Error::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// List keys starting with `prefix`; an empty prefix lists every key
    ///
    /// A non-success status yields an empty list.
    ///
    /// # Errors
    /// [`Error::Connection`] if the database cannot be reached
    pub async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let query = format!("?{}", prefix_query(prefix));
        let response = self.request(&query, &Method::GET, None, None).await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Listing prefix '{}' returned {}, treating as empty", prefix, status);
            return Ok(Vec::new());
        }

        let body = Self::read_body_to_string(response.into_body()).await?;
        Ok(parse_key_list(&body))
    }

    /// List every key in the database
    pub async fn list_all(&self) -> Result<Vec<String>> {
        self.list_prefix("").await
    }

    /// Delete a key
    ///
    /// # Returns
    /// true if the database acknowledged the delete. Transport failures are
    /// logged and reported as false.
    ///
    /// # Errors
    /// Only [`Error::InvalidArgument`] for an empty key
    pub async fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.delete_unchecked(key).await)
    }

    async fn delete_unchecked(&self, key: &str) -> bool {
        let path = format!("/{}", encode_key(key));
        match self.request(&path, &Method::DELETE, None, None).await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                error!("Failed to delete key '{}': {}", key, e);
                false
            }
        }
    }

    /// Delete every key starting with `prefix`
    ///
    /// Deletes are issued concurrently and are not rolled back: on `false`
    /// some keys may already be gone.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for an empty prefix. Clearing the whole
    /// database requires [`Client::delete_everything`].
    pub async fn delete_prefix(&self, prefix: &str) -> Result<bool> {
        if prefix.is_empty() {
            return Err(Error::InvalidArgument(
                "`prefix` not provided. To delete all keys, use `delete_everything()` explicitly"
                    .to_string(),
            ));
        }
        Ok(self.delete_matching(prefix).await)
    }

    /// Delete every key in the database
    pub async fn delete_everything(&self) -> bool {
        self.delete_matching("").await
    }

    /// List keys under `prefix`, then delete them all at once.
    ///
    /// true only if every delete completed and succeeded.
    async fn delete_matching(&self, prefix: &str) -> bool {
        let keys = match self.list_prefix(prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                error!("Failed to list keys under prefix '{}': {}", prefix, e);
                return false;
            }
        };

        debug!("Deleting {} keys under prefix '{}'", keys.len(), prefix);

        let mut tasks = JoinSet::new();
        for key in keys {
            let client = self.clone();
            tasks.spawn(async move { client.delete_unchecked(&key).await });
        }

        let mut all_deleted = true;
        while let Some(outcome) = tasks.join_next().await {
            match outcome {
                Ok(true) => {}
                Ok(false) => all_deleted = false,
                Err(e) => {
                    error!("Delete task did not complete: {}", e);
                    all_deleted = false;
                }
            }
        }
        all_deleted
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.config.endpoint)
            .field("mode", &self.config.mode)
            .finish()
    }
}
