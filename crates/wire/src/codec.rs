//! JSON codec pair.
//!
//! The parser never fails: anything that is not a JSON frame for its
//! transport is declined so the next parser in the pipeline gets a chance.

use corelib::{CodecResult, Envelope, Parser, Router, TransportKind, Translator, WireMessage};
use tracing::trace;

use crate::protocol::Frame;

/// Parses JSON frames arriving on one transport.
#[derive(Copy, Clone, Debug)]
pub struct JsonParser {
    kind: TransportKind,
}

impl JsonParser {
    pub fn new(kind: TransportKind) -> Self {
        Self { kind }
    }
}

impl Parser for JsonParser {
    fn parse(&self, message: &WireMessage) -> CodecResult<Option<Envelope>> {
        let frame = match Frame::decode(message) {
            Ok(frame) => frame,
            Err(e) => {
                trace!(transport = %self.kind, error = %e, "Not a JSON frame");
                return Ok(None);
            }
        };

        // Frames tagged for another transport belong to another parser.
        if frame.kind.is_some_and(|kind| kind != self.kind) {
            return Ok(None);
        }

        Ok(Some(frame.into_envelope()))
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// Serializes envelopes as JSON frames tagged with their transport.
#[derive(Copy, Clone, Debug)]
pub struct JsonTranslator {
    kind: TransportKind,
}

impl JsonTranslator {
    pub fn new(kind: TransportKind) -> Self {
        Self { kind }
    }
}

impl Translator for JsonTranslator {
    fn translate(&self, envelope: &Envelope) -> CodecResult<Option<WireMessage>> {
        let message = Frame::from_envelope(envelope, Some(self.kind)).encode()?;
        Ok(Some(message))
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// Register the JSON parser and translator on every transport.
pub fn install(router: &Router) {
    for kind in TransportKind::ALL {
        router.add_parser(kind, JsonParser::new(kind));
        router.add_translator(kind, JsonTranslator::new(kind));
    }
}
