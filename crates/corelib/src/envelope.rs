//! Canonical message representation.
//!
//! Every wire format is normalized into an `Envelope` before routing and
//! re-serialized from one after. Identities are opaque strings; the relay
//! never interprets them beyond equality.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Transport-independent signaling message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Originating peer.
    pub from: String,
    /// Final recipient.
    pub to: String,
    /// Next hop. Equal to `to` for direct delivery.
    pub target: String,
    /// Application data, carried untouched.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Construct an envelope with an empty (`null`) payload.
    pub fn new(from: impl Into<String>, to: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            target: target.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Check the routing fields, naming the first empty one.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("from", &self.from),
            ("to", &self.to),
            ("target", &self.target),
        ];
        match fields.iter().find(|(_, value)| value.is_empty()) {
            Some((field, _)) => Err(Error::InvalidEnvelope { field: *field }),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// True while the message still has to be forwarded to `target`.
    #[inline]
    pub fn in_transit(&self) -> bool {
        self.to != self.target
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {} via {}", self.from, self.to, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_names_missing_field() {
        assert!(Envelope::new("1", "2", "3").validate().is_ok());
        assert_eq!(
            Envelope::new("", "2", "3").validate(),
            Err(Error::InvalidEnvelope { field: "from" })
        );
        assert_eq!(
            Envelope::new("1", "", "3").validate(),
            Err(Error::InvalidEnvelope { field: "to" })
        );
        assert_eq!(
            Envelope::new("1", "2", "").validate(),
            Err(Error::InvalidEnvelope { field: "target" })
        );
    }

    #[test]
    fn test_in_transit() {
        assert!(Envelope::new("1", "2", "3").in_transit());
        assert!(!Envelope::new("1", "2", "2").in_transit());
    }

    #[test]
    fn test_payload_defaults_to_null() {
        let envelope: Envelope =
            serde_json::from_value(json!({"from": "1", "to": "2", "target": "2"})).unwrap();
        assert_eq!(envelope.payload, Value::Null);
        assert_eq!(envelope.to_string(), "1 -> 2 via 2");
    }
}
