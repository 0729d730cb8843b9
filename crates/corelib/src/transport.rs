//! Transport abstractions shared across the workspace.
//!
//! The relay never owns a transport connection. It only sees a transport
//! kind and a [`Sink`] that accepts outbound wire messages; everything about
//! connecting, framing and authenticating belongs to the transport itself.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Signaling transports the relay can speak.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Xmpp,
    WebSocket,
}

impl TransportKind {
    /// Every supported transport, in table order.
    pub const ALL: [TransportKind; 2] = [TransportKind::Xmpp, TransportKind::WebSocket];

    /// Number of supported transports.
    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            TransportKind::Xmpp => 0,
            TransportKind::WebSocket => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TransportKind::Xmpp => "xmpp",
            TransportKind::WebSocket => "websocket",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::SignalingMethodNotSupported {
                name: s.to_string(),
            })
    }
}

/// Fixed table with one slot per [`TransportKind`].
#[derive(Clone, Debug, Default)]
pub struct TransportTable<T> {
    slots: [T; TransportKind::COUNT],
}

impl<T> TransportTable<T> {
    pub fn from_fn(mut f: impl FnMut(TransportKind) -> T) -> Self {
        Self {
            slots: TransportKind::ALL.map(&mut f),
        }
    }

    #[inline]
    pub fn get(&self, kind: TransportKind) -> &T {
        &self.slots[kind.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, kind: TransportKind) -> &mut T {
        &mut self.slots[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (TransportKind, &T)> {
        TransportKind::ALL.into_iter().zip(self.slots.iter())
    }
}

/// A message in a transport's own wire format.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct WireMessage(pub Bytes);

impl WireMessage {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The message as UTF-8 text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&'static str> for WireMessage {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for WireMessage {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<Vec<u8>> for WireMessage {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

/// Outbound half of a transport connection.
///
/// Sending is a fire-and-forget handoff: the relay does not observe
/// delivery, failures, or retries.
pub trait Sink: Send + Sync + 'static {
    fn send(&self, message: WireMessage);
}

impl<F> Sink for F
where
    F: Fn(WireMessage) + Send + Sync + 'static,
{
    fn send(&self, message: WireMessage) {
        self(message)
    }
}

/// A live binding between a transport kind and its send capability.
#[derive(Clone)]
pub struct Connection {
    pub kind: TransportKind,
    pub sink: Arc<dyn Sink>,
}

impl Connection {
    pub fn new(kind: TransportKind, sink: Arc<dyn Sink>) -> Self {
        Self { kind, sink }
    }

    #[inline]
    pub fn send(&self, message: WireMessage) {
        self.sink.send(message)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("xmpp".parse::<TransportKind>().unwrap(), TransportKind::Xmpp);
        assert_eq!(
            "websocket".parse::<TransportKind>().unwrap(),
            TransportKind::WebSocket
        );
        assert_eq!(
            "sip".parse::<TransportKind>(),
            Err(Error::SignalingMethodNotSupported {
                name: "sip".to_string()
            })
        );
    }

    #[test]
    fn test_kind_serde_matches_display() {
        for kind in TransportKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_table_is_indexed_by_kind() {
        let mut table = TransportTable::from_fn(|kind| kind.as_str().len());
        assert_eq!(*table.get(TransportKind::Xmpp), 4);
        assert_eq!(*table.get(TransportKind::WebSocket), 9);

        *table.get_mut(TransportKind::Xmpp) = 0;
        let collected: Vec<_> = table.iter().map(|(k, v)| (k, *v)).collect();
        assert_eq!(
            collected,
            vec![(TransportKind::Xmpp, 0), (TransportKind::WebSocket, 9)]
        );
    }

    #[test]
    fn test_closure_sink() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&sent);
        let connection = Connection::new(
            TransportKind::WebSocket,
            Arc::new(move |msg: WireMessage| captured.lock().push(msg)),
        );

        connection.send(WireMessage::from("hello"));
        assert_eq!(sent.lock().len(), 1);
        assert_eq!(sent.lock()[0].as_str(), Some("hello"));
    }
}
