//! Core library for the signaling relay.
//!
//! This crate provides the transport-agnostic pieces of the relay:
//! - The canonical `Envelope` message model
//! - Transport kinds, wire messages and send capabilities
//! - Per-transport codec pipelines
//! - Identity to connection resolution
//! - The routing state machine tying them together

pub mod codec;
pub mod config;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod router;
pub mod transport;

pub use codec::{CodecRegistry, CodecResult, Parser, Translator};
pub use config::{RelayConfig, TransportSettings};
pub use connection::ConnectionRegistry;
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use router::{Deliver, Received, Router, Sent};
pub use transport::{Connection, Sink, TransportKind, TransportTable, WireMessage};
