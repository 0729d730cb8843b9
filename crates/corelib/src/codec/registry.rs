//! Per-transport codec pipelines.
//!
//! # Pipeline semantics
//!
//! - Codecs run in registration order.
//! - A parser result only counts if the envelope is valid; invalid envelopes
//!   are dropped and the next parser is tried.
//! - The first translator returning a message wins.
//! - Codec errors are not recovered; they surface as [`Error::Codec`].
//!
//! Registration is append-only and may happen while traffic flows. Each
//! list is an immutable shared slice replaced wholesale on registration, so
//! a call snapshots its pipeline with one refcount bump and a codec can
//! safely register further codecs.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::codec::traits::{Parser, Translator};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::transport::{TransportKind, TransportTable, WireMessage};

#[derive(Clone)]
struct Pipeline {
    parsers: Arc<[Arc<dyn Parser>]>,
    translators: Arc<[Arc<dyn Translator>]>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            parsers: Arc::from(Vec::new()),
            translators: Arc::from(Vec::new()),
        }
    }
}

/// Copy of `list` with `item` at the end.
fn appended<T: ?Sized>(list: &[Arc<T>], item: Arc<T>) -> Arc<[Arc<T>]> {
    list.iter().cloned().chain(std::iter::once(item)).collect()
}

/// Ordered parser and translator lists for every transport kind.
#[derive(Default)]
pub struct CodecRegistry {
    pipelines: RwLock<TransportTable<Pipeline>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parser to the end of `kind`'s pipeline.
    pub fn add_parser(&self, kind: TransportKind, parser: Arc<dyn Parser>) {
        let mut pipelines = self.pipelines.write();
        let pipeline = pipelines.get_mut(kind);
        debug!(
            transport = %kind,
            parser = parser.name(),
            position = pipeline.parsers.len(),
            "Parser registered"
        );
        pipeline.parsers = appended(&pipeline.parsers, parser);
    }

    /// Append a translator to the end of `kind`'s pipeline.
    pub fn add_translator(&self, kind: TransportKind, translator: Arc<dyn Translator>) {
        let mut pipelines = self.pipelines.write();
        let pipeline = pipelines.get_mut(kind);
        debug!(
            transport = %kind,
            translator = translator.name(),
            position = pipeline.translators.len(),
            "Translator registered"
        );
        pipeline.translators = appended(&pipeline.translators, translator);
    }

    pub fn parser_count(&self, kind: TransportKind) -> usize {
        self.pipelines.read().get(kind).parsers.len()
    }

    pub fn translator_count(&self, kind: TransportKind) -> usize {
        self.pipelines.read().get(kind).translators.len()
    }

    /// Run `kind`'s parsers until one yields a valid envelope.
    ///
    /// Returns `Ok(None)` when every parser declines.
    pub fn parse(&self, message: &WireMessage, kind: TransportKind) -> Result<Option<Envelope>> {
        let parsers = Arc::clone(&self.pipelines.read().get(kind).parsers);

        for parser in parsers.iter() {
            let parsed = parser
                .parse(message)
                .map_err(|e| Error::codec(kind, parser.name(), e))?;

            match parsed {
                Some(envelope) if envelope.is_valid() => {
                    trace!(transport = %kind, parser = parser.name(), %envelope, "Parsed");
                    return Ok(Some(envelope));
                }
                Some(envelope) => {
                    trace!(
                        transport = %kind,
                        parser = parser.name(),
                        %envelope,
                        "Parser produced invalid envelope, trying next"
                    );
                }
                None => {}
            }
        }

        Ok(None)
    }

    /// Run `kind`'s translators until one yields a wire message.
    ///
    /// Returns `Ok(None)` when every translator declines.
    pub fn translate(&self, envelope: &Envelope, kind: TransportKind) -> Result<Option<WireMessage>> {
        let translators = Arc::clone(&self.pipelines.read().get(kind).translators);

        for translator in translators.iter() {
            let translated = translator
                .translate(envelope)
                .map_err(|e| Error::codec(kind, translator.name(), e))?;

            if let Some(message) = translated {
                trace!(
                    transport = %kind,
                    translator = translator.name(),
                    bytes = message.len(),
                    "Translated"
                );
                return Ok(Some(message));
            }
        }

        Ok(None)
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pipelines = self.pipelines.read();
        let mut dbg = f.debug_struct("CodecRegistry");
        for (kind, pipeline) in pipelines.iter() {
            dbg.field(
                kind.as_str(),
                &(pipeline.parsers.len(), pipeline.translators.len()),
            );
        }
        dbg.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::traits::CodecResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fixed(envelope: Envelope) -> Arc<dyn Parser> {
        Arc::new(move |_: &WireMessage| -> CodecResult<Option<Envelope>> {
            Ok(Some(envelope.clone()))
        })
    }

    fn declining() -> Arc<dyn Parser> {
        Arc::new(|_: &WireMessage| -> CodecResult<Option<Envelope>> { Ok(None) })
    }

    #[test]
    fn test_empty_pipeline_parses_nothing() {
        let registry = CodecRegistry::new();
        assert_eq!(
            registry.parse(&WireMessage::from("x"), TransportKind::Xmpp),
            Ok(None)
        );
        assert_eq!(
            registry.translate(&Envelope::new("1", "2", "2"), TransportKind::Xmpp),
            Ok(None)
        );
    }

    #[test]
    fn test_first_valid_parser_wins() {
        let registry = CodecRegistry::new();
        let third_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&third_calls);

        registry.add_parser(TransportKind::Xmpp, declining());
        registry.add_parser(TransportKind::Xmpp, fixed(Envelope::new("1", "2", "2")));
        registry.add_parser(
            TransportKind::Xmpp,
            Arc::new(move |_: &WireMessage| -> CodecResult<Option<Envelope>> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Some(Envelope::new("9", "9", "9")))
            }),
        );

        let parsed = registry
            .parse(&WireMessage::from("x"), TransportKind::Xmpp)
            .unwrap();
        assert_eq!(parsed, Some(Envelope::new("1", "2", "2")));
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_result_falls_through() {
        let registry = CodecRegistry::new();
        registry.add_parser(TransportKind::WebSocket, fixed(Envelope::new("1", "", "2")));
        registry.add_parser(TransportKind::WebSocket, fixed(Envelope::new("1", "2", "2")));

        let parsed = registry
            .parse(&WireMessage::from("x"), TransportKind::WebSocket)
            .unwrap();
        assert_eq!(parsed, Some(Envelope::new("1", "2", "2")));
    }

    #[test]
    fn test_only_invalid_results_is_none() {
        let registry = CodecRegistry::new();
        registry.add_parser(TransportKind::WebSocket, fixed(Envelope::new("", "", "")));
        assert_eq!(
            registry.parse(&WireMessage::from("x"), TransportKind::WebSocket),
            Ok(None)
        );
    }

    #[test]
    fn test_pipelines_are_per_transport() {
        let registry = CodecRegistry::new();
        registry.add_parser(TransportKind::Xmpp, fixed(Envelope::new("1", "2", "2")));

        assert_eq!(registry.parser_count(TransportKind::Xmpp), 1);
        assert_eq!(registry.parser_count(TransportKind::WebSocket), 0);
        assert_eq!(
            registry.parse(&WireMessage::from("x"), TransportKind::WebSocket),
            Ok(None)
        );
    }

    #[test]
    fn test_parser_error_propagates() {
        struct Broken;
        impl Parser for Broken {
            fn parse(&self, _: &WireMessage) -> CodecResult<Option<Envelope>> {
                Err("truncated stanza".into())
            }
            fn name(&self) -> &str {
                "broken"
            }
        }

        let registry = CodecRegistry::new();
        registry.add_parser(TransportKind::Xmpp, Arc::new(Broken));
        registry.add_parser(TransportKind::Xmpp, fixed(Envelope::new("1", "2", "2")));

        let err = registry
            .parse(&WireMessage::from("x"), TransportKind::Xmpp)
            .unwrap_err();
        assert_eq!(
            err,
            Error::Codec {
                transport: TransportKind::Xmpp,
                codec: "broken".to_string(),
                reason: "truncated stanza".to_string(),
            }
        );
    }

    #[test]
    fn test_first_translator_result_wins() {
        let registry = CodecRegistry::new();
        registry.add_translator(
            TransportKind::WebSocket,
            Arc::new(|_: &Envelope| -> CodecResult<Option<WireMessage>> { Ok(None) }),
        );
        registry.add_translator(
            TransportKind::WebSocket,
            Arc::new(|e: &Envelope| -> CodecResult<Option<WireMessage>> {
                Ok(Some(WireMessage::from(e.to_string())))
            }),
        );
        registry.add_translator(
            TransportKind::WebSocket,
            Arc::new(|_: &Envelope| -> CodecResult<Option<WireMessage>> {
                Ok(Some(WireMessage::from("late")))
            }),
        );

        let wire = registry
            .translate(&Envelope::new("1", "2", "2"), TransportKind::WebSocket)
            .unwrap()
            .unwrap();
        assert_eq!(wire.as_str(), Some("1 -> 2 via 2"));
        assert_eq!(registry.translator_count(TransportKind::WebSocket), 3);
    }

    #[test]
    fn test_registration_during_parse_applies_to_later_calls() {
        let registry = Arc::new(CodecRegistry::new());
        let late_calls = Arc::new(AtomicUsize::new(0));

        let inner = Arc::clone(&registry);
        let counter = Arc::clone(&late_calls);
        registry.add_parser(
            TransportKind::Xmpp,
            Arc::new(move |_: &WireMessage| -> CodecResult<Option<Envelope>> {
                let counter = Arc::clone(&counter);
                inner.add_parser(
                    TransportKind::Xmpp,
                    Arc::new(move |_: &WireMessage| -> CodecResult<Option<Envelope>> {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(None)
                    }),
                );
                Ok(None)
            }),
        );

        // The running call holds the one-parser snapshot.
        assert_eq!(registry.parse(&WireMessage::from("x"), TransportKind::Xmpp), Ok(None));
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        assert_eq!(registry.parser_count(TransportKind::Xmpp), 2);

        assert_eq!(registry.parse(&WireMessage::from("x"), TransportKind::Xmpp), Ok(None));
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.parser_count(TransportKind::Xmpp), 3);
    }
}
