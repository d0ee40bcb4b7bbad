//! An async HTTP client for Replit-style key-value databases
//!
//! The database is a single URL speaking a tiny protocol: `GET /{key}`,
//! `POST /` with a `key=value` form body, `GET /?prefix=` returning
//! newline-separated keys, and `DELETE /{key}`.
//!
//! Two layers are provided:
//! - [`Client`] speaks the protocol with raw string values
//! - [`Store`] wraps a client and transparently encodes values as JSON in
//!   [`Mode::Json`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use repldb_client::{Client, Mode, Store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), repldb_client::Error> {
//!     let client = Client::new("http://localhost:8080")?;
//!
//!     // Store a value
//!     client.set("my-key", "Hello, World!").await?;
//!
//!     // Retrieve a value
//!     let value = client.get("my-key").await?;
//!     println!("Retrieved: {:?}", value);
//!
//!     // Structured values
//!     let store = Store::new("http://localhost:8080", Mode::Json)?;
//!     store.set("scores", &vec![1, 2, 3]).await?;
//!     let scores: Option<Vec<u32>> = store.get_as("scores").await?;
//!     println!("Scores: {:?}", scores);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod store;

pub use client::Client;
pub use codec::{Codec, Mode};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use store::Store;
