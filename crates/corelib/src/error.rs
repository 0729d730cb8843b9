//! Error types for the core library.

use thiserror::Error;

use crate::transport::TransportKind;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
///
/// Parse and translate misses (no codec applies) are not errors; they are
/// reported as `None` by the codec registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Configuration names a signaling transport that does not exist.
    #[error("signaling method not supported: {name}")]
    SignalingMethodNotSupported { name: String },

    /// Outbound envelope with an empty routing field.
    #[error("invalid envelope: `{field}` is empty")]
    InvalidEnvelope { field: &'static str },

    /// Outbound envelope whose target has no connection.
    #[error("no connection found for target `{identity}`")]
    UnknownTarget { identity: String },

    /// Inbound envelope addressed to a final recipient other than this node.
    #[error("routing inconsistency on {transport}: message for `{to}` reached node `{me}`")]
    RoutingInconsistency {
        to: String,
        me: String,
        transport: TransportKind,
    },

    /// A codec failed while processing a message.
    #[error("codec `{codec}` failed on {transport}: {reason}")]
    Codec {
        transport: TransportKind,
        codec: String,
        reason: String,
    },

    /// Configuration could not be read or decoded.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl Error {
    /// Convenience constructor for codec implementations.
    pub fn codec(
        transport: TransportKind,
        codec: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Error::Codec {
            transport,
            codec: codec.into(),
            reason: reason.to_string(),
        }
    }
}
