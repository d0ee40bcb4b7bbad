use std::env;

use crate::codec::Mode;
use crate::error::{Error, Result};

/// Environment variable holding the database URL.
pub const DB_URL_VAR: &str = "REPLIT_DB_URL";

/// Optional environment variable selecting the value mode (`raw` or `json`).
pub const DB_MODE_VAR: &str = "REPLIT_DB_MODE";

/// Configuration options for the Replit DB client
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Base URL of the database. Every request is built relative to it.
    pub endpoint: String,
    /// How [`Store`](crate::Store) encodes values (default: raw)
    pub mode: Mode,
    /// Form-encode the key and value of `set` requests.
    ///
    /// Off by default: the body is sent as the literal text `key=value`, so a
    /// value containing `&` or `=` is split by the database's form parser.
    pub encode_form_values: bool,
}

impl ClientConfig {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_encoded_form_values(mut self, enabled: bool) -> Self {
        self.encode_form_values = enabled;
        self
    }

    /// Reads `REPLIT_DB_URL` (required) and `REPLIT_DB_MODE` (optional).
    pub fn from_env() -> Result<Self> {
        let endpoint = env::var(DB_URL_VAR)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{} is not defined", DB_URL_VAR)))?;

        let mode = match env::var(DB_MODE_VAR) {
            Ok(s) if !s.trim().is_empty() => s.parse()?,
            _ => Mode::Raw,
        };

        Ok(ClientConfig {
            endpoint,
            mode,
            encode_form_values: false,
        })
    }
}
