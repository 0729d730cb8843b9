//! Message routing.
//!
//! # Inbound state machine
//!
//! ```text
//! wire message ──parse──► none ─────────────────────► Discarded
//!                   │
//!                   ▼
//!               Envelope ──to != target──► send(target) ► Relayed
//!                   │
//!                   ├──to == target == me─► deliver ───► Delivered
//!                   │
//!                   └──to == target != me─► RoutingInconsistency
//! ```
//!
//! Relaying is single hop. The router never computes a path: the embedded
//! `target` names the next hop, and the forwarded envelope is re-addressed
//! to it. When `target` is this node, the node itself was the hop and the
//! message is forwarded on to `to`.
//!
//! # Outbound
//!
//! `send` validates, resolves `target`, translates for the resolved
//! transport and hands the result to its sink. A translator miss drops the
//! message without error.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::codec::{CodecRegistry, Parser, Translator};
use crate::config::RelayConfig;
use crate::connection::ConnectionRegistry;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::transport::{Connection, Sink, TransportKind, WireMessage};

/// Application-side receiver of envelopes addressed to this node.
pub trait Deliver: Send + Sync + 'static {
    fn deliver(&self, envelope: Envelope);
}

impl<F> Deliver for F
where
    F: Fn(Envelope) + Send + Sync + 'static,
{
    fn deliver(&self, envelope: Envelope) {
        self(envelope)
    }
}

/// Result of an outbound send.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    /// Handed to the transport's sink.
    Forwarded { transport: TransportKind },
    /// No translator accepted the envelope.
    Dropped { transport: TransportKind },
}

/// Result of handling an inbound wire message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Received {
    /// No parser recognized the message.
    Discarded,
    /// Forwarded to the next hop.
    Relayed(Sent),
    /// Handed to the local delivery handler.
    Delivered,
}

/// Signaling relay for one node.
pub struct Router {
    me: String,
    codecs: CodecRegistry,
    connections: ConnectionRegistry,
    delivery: Option<Arc<dyn Deliver>>,
}

impl Router {
    /// Create a router with empty codec pipelines and no connections.
    pub fn new(me: impl Into<String>) -> Self {
        Self {
            me: me.into(),
            codecs: CodecRegistry::new(),
            connections: ConnectionRegistry::new(),
            delivery: None,
        }
    }

    /// Build a router from configuration.
    ///
    /// `connect` is asked for a sink for every configured backend and every
    /// configured peer. Any unknown transport name aborts setup before
    /// `connect` is called.
    pub fn from_config<F>(config: &RelayConfig, mut connect: F) -> Result<Self>
    where
        F: FnMut(TransportKind, &str) -> Arc<dyn Sink>,
    {
        config.validate()?;
        let router = Self::new(config.me.clone());

        for (kind, settings) in config.transports()? {
            debug!(transport = %kind, "Initializing transport");
            if let Some(backend) = &settings.backend {
                router.connections.set_backend_identity(kind, backend.clone());
                router
                    .connections
                    .register(kind, backend.clone(), connect(kind, backend));
            }
        }

        for (identity, kind) in config.peers()? {
            router.connections.register(kind, identity, connect(kind, identity));
        }

        Ok(router)
    }

    /// Install the handler for envelopes addressed to this node.
    pub fn on_deliver(mut self, handler: impl Deliver) -> Self {
        self.delivery = Some(Arc::new(handler));
        self
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn add_parser(&self, kind: TransportKind, parser: impl Parser) {
        self.codecs.add_parser(kind, Arc::new(parser));
    }

    pub fn add_translator(&self, kind: TransportKind, translator: impl Translator) {
        self.codecs.add_translator(kind, Arc::new(translator));
    }

    pub fn add_xmpp_parser(&self, parser: impl Parser) {
        self.add_parser(TransportKind::Xmpp, parser);
    }

    pub fn add_xmpp_translator(&self, translator: impl Translator) {
        self.add_translator(TransportKind::Xmpp, translator);
    }

    pub fn add_websocket_parser(&self, parser: impl Parser) {
        self.add_parser(TransportKind::WebSocket, parser);
    }

    pub fn add_websocket_translator(&self, translator: impl Translator) {
        self.add_translator(TransportKind::WebSocket, translator);
    }

    /// Bind a peer (or a backend) identity to a transport sink.
    pub fn register_connection(
        &self,
        kind: TransportKind,
        identity: impl Into<String>,
        sink: impl Sink,
    ) -> Option<Connection> {
        self.connections.register(kind, identity, Arc::new(sink))
    }

    /// Forget a peer whose transport went away.
    pub fn disconnect(&self, identity: &str) -> Option<Connection> {
        self.connections.unregister(identity)
    }

    /// Send `envelope` to its `target`.
    pub fn send(&self, envelope: &Envelope) -> Result<Sent> {
        envelope.validate()?;

        let connection =
            self.connections
                .resolve(&envelope.target)
                .ok_or_else(|| Error::UnknownTarget {
                    identity: envelope.target.clone(),
                })?;
        let transport = connection.kind;

        match self.codecs.translate(envelope, transport)? {
            Some(message) => {
                debug!(transport = %transport, %envelope, bytes = message.len(), "Sending");
                connection.send(message);
                Ok(Sent::Forwarded { transport })
            }
            None => {
                warn!(transport = %transport, %envelope, "No translator accepted envelope, dropped");
                Ok(Sent::Dropped { transport })
            }
        }
    }

    /// Handle a wire message that arrived on `kind`.
    pub fn receive(&self, message: &WireMessage, kind: TransportKind) -> Result<Received> {
        let Some(mut envelope) = self.codecs.parse(message, kind)? else {
            debug!(transport = %kind, bytes = message.len(), "Unrecognized message discarded");
            return Ok(Received::Discarded);
        };

        if envelope.in_transit() {
            if envelope.target == self.me {
                envelope.target = envelope.to.clone();
            } else {
                envelope.to = envelope.target.clone();
            }
            debug!(transport = %kind, %envelope, "Relaying");
            return self.send(&envelope).map(Received::Relayed);
        }

        if envelope.to == self.me {
            debug!(transport = %kind, %envelope, "Delivering locally");
            match &self.delivery {
                Some(handler) => handler.deliver(envelope),
                None => debug!(transport = %kind, "No delivery handler installed"),
            }
            return Ok(Received::Delivered);
        }

        error!(
            transport = %kind,
            to = %envelope.to,
            me = %self.me,
            "Message addressed to another node arrived as final hop"
        );
        Err(Error::RoutingInconsistency {
            to: envelope.to,
            me: self.me.clone(),
            transport: kind,
        })
    }

    pub fn receive_from_xmpp(&self, message: &WireMessage) -> Result<Received> {
        self.receive(message, TransportKind::Xmpp)
    }

    pub fn receive_from_websocket(&self, message: &WireMessage) -> Result<Received> {
        self.receive(message, TransportKind::WebSocket)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("me", &self.me)
            .field("codecs", &self.codecs)
            .field("connections", &self.connections)
            .field("delivery", &self.delivery.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecResult;

    fn echo_parser(envelope: Envelope) -> impl Parser {
        move |_: &WireMessage| -> CodecResult<Option<Envelope>> { Ok(Some(envelope.clone())) }
    }

    #[test]
    fn test_router_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Router>();
    }

    #[test]
    fn test_send_rejects_invalid_before_resolving() {
        let router = Router::new("0");
        assert_eq!(
            router.send(&Envelope::new("1", "2", "")),
            Err(Error::InvalidEnvelope { field: "target" })
        );
    }

    #[test]
    fn test_send_unknown_target() {
        let router = Router::new("0");
        assert_eq!(
            router.send(&Envelope::new("0", "7", "7")),
            Err(Error::UnknownTarget {
                identity: "7".to_string()
            })
        );
    }

    #[test]
    fn test_send_without_translator_is_dropped() {
        let router = Router::new("0");
        router.register_connection(TransportKind::Xmpp, "1", |_: WireMessage| {
            panic!("nothing should reach the sink")
        });
        assert_eq!(
            router.send(&Envelope::new("0", "1", "1")),
            Ok(Sent::Dropped {
                transport: TransportKind::Xmpp
            })
        );
    }

    #[test]
    fn test_inconsistent_state_is_reported() {
        let router = Router::new("0");
        router.add_xmpp_parser(echo_parser(Envelope::new("1", "2", "2")));

        let err = router
            .receive_from_xmpp(&WireMessage::from("x"))
            .unwrap_err();
        assert_eq!(
            err,
            Error::RoutingInconsistency {
                to: "2".to_string(),
                me: "0".to_string(),
                transport: TransportKind::Xmpp,
            }
        );
    }

    #[test]
    fn test_delivery_without_handler() {
        let router = Router::new("0");
        router.add_websocket_parser(echo_parser(Envelope::new("1", "0", "0")));
        assert_eq!(
            router.receive_from_websocket(&WireMessage::from("x")),
            Ok(Received::Delivered)
        );
    }
}
