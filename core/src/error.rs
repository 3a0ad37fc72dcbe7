//! Error types for the wallet client.
//!
//! # Design
//! A received response is never an error, whatever its status; that includes
//! the service's `600` insufficient-balance answers and bodies that fail to
//! decode. Errors are reserved for requests that never produced a response
//! (bad host, unencodable body, transport failure) and for the opt-in typed
//! decoding helpers. Whether a transport failure is fatal is the caller's
//! decision.

use thiserror::Error;

/// Errors returned by `WalletClient`.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The configured host is not an absolute URL.
    #[error("invalid wallet host {host:?}: {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The request could not be sent or no response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response body did not match the requested typed view.
    #[error("deserialization failed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Failure reported by a `Transport` before any response was received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP transport error: {0}")]
    Request(String),
}
