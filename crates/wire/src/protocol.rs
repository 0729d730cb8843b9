//! JSON frame layout.
//!
//! ```json
//! { "kind": "websocket", "from": "1", "to": "2", "target": "3", "data": {} }
//! ```
//!
//! `kind` is optional on input. Missing routing fields decode as empty
//! strings so that the codec pipeline, not the decoder, decides validity.

use corelib::{Envelope, TransportKind, WireMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WireError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransportKind>,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn decode(message: &WireMessage) -> Result<Self, WireError> {
        if message.is_empty() {
            return Err(WireError::Empty);
        }
        Ok(serde_json::from_slice(message.as_bytes())?)
    }

    pub fn encode(&self) -> Result<WireMessage, WireError> {
        Ok(WireMessage::from(serde_json::to_vec(self)?))
    }

    pub fn from_envelope(envelope: &Envelope, kind: Option<TransportKind>) -> Self {
        Self {
            kind,
            from: envelope.from.clone(),
            to: envelope.to.clone(),
            target: envelope.target.clone(),
            data: envelope.payload.clone(),
        }
    }

    pub fn into_envelope(self) -> Envelope {
        Envelope::new(self.from, self.to, self.target).with_payload(self.data)
    }
}
