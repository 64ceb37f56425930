//! Error types for the DHCP codec and server.
//!
//! All fallible operations in this crate return [`Result<T>`], which uses
//! the [`Error`] enum for error variants.

use std::net::SocketAddr;

/// Errors that can occur while decoding, replying to, or serving DHCP messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system or network I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (config file).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Datagram shorter than the fixed 240-byte header.
    ///
    /// The datagram is dropped without a reply and no partial message
    /// is produced.
    #[error("Truncated DHCP packet: {length} bytes (minimum {minimum})")]
    TruncatedPacket { length: usize, minimum: usize },

    /// A TLV entry declares a length that runs past the end of its buffer.
    ///
    /// Raised for the main option stream and for Option 82 sub-options.
    #[error("Malformed options: {0}")]
    MalformedOptions(String),

    /// The transport failed to send a reply.
    ///
    /// Sends are one-shot; the caller logs this and carries on.
    #[error("Failed to send reply to {destination}: {source}")]
    TransportSend {
        destination: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Invalid server configuration or route definition.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Socket creation or configuration error.
    ///
    /// Typically occurs when binding to port 67 without administrator privileges.
    #[error("Socket error: {0}")]
    Socket(String),
}

/// A specialized Result type for DHCP operations.
pub type Result<T> = std::result::Result<T, Error>;
