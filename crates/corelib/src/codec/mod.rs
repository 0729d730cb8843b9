//! Codec pipelines between wire formats and envelopes.
//!
//! Each transport owns an ordered list of parsers (wire -> envelope) and an
//! ordered list of translators (envelope -> wire). The first codec that
//! produces a usable result wins.

pub mod registry;
pub mod traits;

pub use registry::CodecRegistry;
pub use traits::{CodecError, CodecResult, Parser, Translator};
