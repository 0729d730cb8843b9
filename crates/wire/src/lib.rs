//! JSON wire format for the signaling relay.
//!
//! This crate provides a ready-made codec pair for transports that carry
//! JSON text frames:
//! - The `Frame` wire structure
//! - `JsonParser` / `JsonTranslator` implementing the core codec traits
//! - `install` to register both on every transport of a router

pub mod codec;
pub mod error;
pub mod protocol;

pub use codec::{install, JsonParser, JsonTranslator};
pub use error::WireError;
pub use protocol::Frame;
