//! Transcript inspection tool.
//!
//! Reads a JSON array of chat messages, decodes each one and prints the
//! decoded bodies, code segments and product cards as JSON.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::collections::HashSet;
use std::io::Read;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use serde::Serialize;
use tracing::info;

use chat_message_content::config::{Cli, DecoderConfig};
use chat_message_content::{DecodedMessage, Message, telemetry};

/// One entry of the printed report.
#[derive(Serialize)]
#[serde(untagged)]
enum ReportEntry {
    Decoded(DecodedMessage),
    Failed {
        #[serde(rename = "messageId")]
        message_id: String,
        error: String,
        code: &'static str,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let cli = Cli::parse();
    let config = DecoderConfig::from_cli(&cli).context("Failed to load configuration")?;
    telemetry::init(&config.logging);

    info!(
        name: "decoder.config.loaded",
        extensions = ?config.markdown.extensions,
        fallback = config.fallback_policy().name(),
        "Decoder configuration loaded"
    );

    let raw = match &cli.input {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let mut messages: Vec<Message> =
        serde_json::from_str(&raw).context("Input is not a JSON array of messages")?;
    assign_missing_ids(&mut messages);

    let pipeline = config.build_memoized();
    let report: Vec<ReportEntry> = messages
        .iter()
        .map(|msg| match pipeline.decode(msg) {
            Ok(decoded) => ReportEntry::Decoded((*decoded).clone()),
            Err(e) => ReportEntry::Failed {
                message_id: msg.id.clone(),
                code: e.code(),
                error: e.to_string(),
            },
        })
        .collect();

    info!(
        name: "decoder.transcript.decoded",
        message_count = messages.len(),
        "Transcript decoded"
    );

    let out = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{out}");
    Ok(())
}

/// Give every message without an id a `msg-<index>` id.
///
/// Ids already present in the transcript are never reused; a taken
/// `msg-<index>` gets a `-<n>` suffix instead.
fn assign_missing_ids(messages: &mut [Message]) {
    let mut taken: HashSet<String> = messages
        .iter()
        .filter(|m| !m.id.is_empty())
        .map(|m| m.id.clone())
        .collect();

    for (idx, msg) in messages.iter_mut().enumerate() {
        if !msg.id.is_empty() {
            continue;
        }
        let mut candidate = format!("msg-{idx}");
        let mut suffix = 1;
        while taken.contains(&candidate) {
            candidate = format!("msg-{idx}-{suffix}");
            suffix += 1;
        }
        taken.insert(candidate.clone());
        msg.id = candidate;
    }
}
