//! Core codec trait definitions.

use crate::envelope::Envelope;
use crate::transport::WireMessage;

/// Failure raised by a codec, as opposed to declining a message.
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by parsers and translators.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Converts a transport's wire message into an [`Envelope`].
///
/// Parsers are shared across threads and must not touch routing state.
/// Returning `Ok(None)` means "not mine"; the pipeline moves on to the next
/// parser. Returning `Err` aborts the pipeline.
pub trait Parser: Send + Sync + 'static {
    fn parse(&self, message: &WireMessage) -> CodecResult<Option<Envelope>>;

    /// Name used in logs and codec errors.
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Converts an [`Envelope`] into a transport's wire message.
///
/// Same contract as [`Parser`]: `Ok(None)` declines, `Err` aborts.
pub trait Translator: Send + Sync + 'static {
    fn translate(&self, envelope: &Envelope) -> CodecResult<Option<WireMessage>>;

    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> Parser for F
where
    F: Fn(&WireMessage) -> CodecResult<Option<Envelope>> + Send + Sync + 'static,
{
    fn parse(&self, message: &WireMessage) -> CodecResult<Option<Envelope>> {
        self(message)
    }
}

impl<F> Translator for F
where
    F: Fn(&Envelope) -> CodecResult<Option<WireMessage>> + Send + Sync + 'static,
{
    fn translate(&self, envelope: &Envelope) -> CodecResult<Option<WireMessage>> {
        self(envelope)
    }
}
