//! Value encoding strategies for the [`Store`](crate::Store) layer

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{Error, Result};

/// How stored values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Values are opaque strings
    #[default]
    Raw,
    /// Values are JSON text, encoded on write and decoded on read
    Json,
}

impl Mode {
    /// The encode/decode pair for this mode
    pub fn codec(self) -> Codec {
        match self {
            Mode::Raw => Codec {
                encode: encode_raw,
                decode: decode_raw,
            },
            Mode::Json => Codec {
                encode: encode_json,
                decode: decode_json,
            },
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Mode::Raw),
            "json" => Ok(Mode::Json),
            other => Err(Error::Config(format!(
                "Unknown mode '{}' (expected 'raw' or 'json')",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Raw => f.write_str("raw"),
            Mode::Json => f.write_str("json"),
        }
    }
}

/// A fixed pair of functions translating between values and stored text.
#[derive(Clone, Copy)]
pub struct Codec {
    encode: fn(&Value) -> Result<String>,
    decode: fn(&str) -> Result<Value>,
}

impl Codec {
    pub fn encode(&self, value: &Value) -> Result<String> {
        (self.encode)(value)
    }

    pub fn decode(&self, text: &str) -> Result<Value> {
        (self.decode)(text)
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

/// Strings are stored verbatim; other values use their plain textual form.
fn encode_raw(value: &Value) -> Result<String> {
    Ok(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn decode_raw(text: &str) -> Result<Value> {
    Ok(Value::String(text.to_string()))
}

fn encode_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode_json(text: &str) -> Result<Value> {
    Ok(serde_json::from_str(text)?)
}
