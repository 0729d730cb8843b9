//! CLI commands.
//!
//! `replay` reads one inbound record per line:
//!
//! ```json
//! {"transport": "xmpp", "message": {"from": "1", "to": "2", "target": "3"}}
//! ```
//!
//! `message` is sent as-is when it is a JSON string and re-serialized
//! otherwise. Outbound sends and local deliveries are written to the output
//! as they happen; per-message failures are logged and counted, never fatal.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use corelib::{Envelope, Received, RelayConfig, Router, Sent, Sink, TransportKind, WireMessage};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// Shared destination for everything the relay emits.
pub type Output = Arc<Mutex<dyn Write + Send>>;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Validate the configuration and list transports and peers.
    Check,
    /// Feed recorded inbound messages through the relay.
    Replay {
        /// JSON-lines input; stdin when absent.
        #[arg(long, short)]
        input: Option<PathBuf>,
    },
}

/// Tally of what a command did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub transports: usize,
    pub peers: usize,
    pub discarded: usize,
    pub relayed: usize,
    pub dropped: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transports={} peers={} relayed={} delivered={} dropped={} discarded={} failed={}",
            self.transports,
            self.peers,
            self.relayed,
            self.delivered,
            self.dropped,
            self.discarded,
            self.failed
        )
    }
}

#[derive(Debug, Deserialize)]
struct InboundRecord {
    transport: String,
    message: Value,
}

impl Command {
    pub fn execute(&self, config: &RelayConfig) -> anyhow::Result<CommandResult> {
        let output: Output = Arc::new(Mutex::new(io::stdout()));
        match self {
            Command::Check => check(config, output),
            Command::Replay { input: Some(path) } => {
                let file =
                    File::open(path).with_context(|| format!("opening {}", path.display()))?;
                replay(config, BufReader::new(file), output)
            }
            Command::Replay { input: None } => replay(config, io::stdin().lock(), output),
        }
    }
}

/// Validate `config` and describe it.
pub fn check(config: &RelayConfig, output: Output) -> anyhow::Result<CommandResult> {
    config.validate()?;
    let transports = config.transports()?;
    let peers = config.peers()?;

    let mut out = output.lock();
    writeln!(out, "me: {}", config.me)?;
    for (kind, settings) in &transports {
        match &settings.backend {
            Some(backend) => writeln!(out, "transport {}: backend {}", kind, backend)?,
            None => writeln!(out, "transport {}", kind)?,
        }
    }
    for (identity, kind) in &peers {
        writeln!(out, "peer {} via {}", identity, kind)?;
    }

    Ok(CommandResult {
        transports: transports.len(),
        peers: peers.len(),
        ..CommandResult::default()
    })
}

/// Build a relay from `config` and push every record of `input` through it.
pub fn replay<R: BufRead>(
    config: &RelayConfig,
    input: R,
    output: Output,
) -> anyhow::Result<CommandResult> {
    let router = build_router(config, Arc::clone(&output))?;
    let mut result = CommandResult {
        transports: config.transports.len(),
        peers: router.connections().len(),
        ..CommandResult::default()
    };

    for (index, raw) in input.split(b'\n').enumerate() {
        let raw = raw?;
        let line_no = index + 1;
        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping non UTF-8 record");
                result.failed += 1;
                continue;
            }
        };
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (kind, message) = match decode_record(line) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping unreadable record");
                result.failed += 1;
                continue;
            }
        };

        match router.receive(&message, kind) {
            Ok(Received::Discarded) => result.discarded += 1,
            Ok(Received::Relayed(Sent::Forwarded { .. })) => result.relayed += 1,
            Ok(Received::Relayed(Sent::Dropped { .. })) => result.dropped += 1,
            Ok(Received::Delivered) => result.delivered += 1,
            Err(e) => {
                warn!(line = line_no, transport = %kind, error = %e, "Message not routed");
                result.failed += 1;
            }
        }
    }

    info!(%result, "Replay finished");
    Ok(result)
}

fn build_router(config: &RelayConfig, output: Output) -> anyhow::Result<Router> {
    let sinks = Arc::clone(&output);
    let router = Router::from_config(config, move |kind, identity| {
        print_sink(Arc::clone(&sinks), kind, identity.to_string())
    })?
    .on_deliver(move |envelope: Envelope| {
        let rendered = serde_json::to_string(&envelope).unwrap_or_else(|_| envelope.to_string());
        if let Err(e) = writeln!(output.lock(), "<= {}", rendered) {
            warn!(error = %e, "Failed to write delivered envelope");
        }
    });

    wire::install(&router);
    Ok(router)
}

fn print_sink(output: Output, kind: TransportKind, identity: String) -> Arc<dyn Sink> {
    Arc::new(move |message: WireMessage| {
        let written = writeln!(
            output.lock(),
            "-> {} {}: {}",
            kind,
            identity,
            String::from_utf8_lossy(message.as_bytes())
        );
        if let Err(e) = written {
            warn!(
                transport = %kind,
                peer = %identity,
                error = %e,
                "Failed to write outbound message"
            );
        }
    })
}

fn decode_record(line: &str) -> anyhow::Result<(TransportKind, WireMessage)> {
    let record: InboundRecord = serde_json::from_str(line)?;
    let kind: TransportKind = record.transport.parse()?;
    let message = match record.message {
        Value::String(text) => WireMessage::from(text),
        other => WireMessage::from(serde_json::to_vec(&other)?),
    };
    Ok((kind, message))
}
