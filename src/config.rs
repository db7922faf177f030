use std::sync::Arc;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{ContentError, Result};
use crate::markdown::SyntaxExtension;
use crate::observe::TracingObserver;
use crate::pipeline::{
    DEFAULT_CACHE_CAPACITY, FallbackPolicy, MemoizedPipeline, MessageContentPipeline,
};

/// Prefix for environment overrides, e.g. `CHAT_CONTENT__CACHE__CAPACITY=64`.
const ENV_PREFIX: &str = "CHAT_CONTENT";

/// Config file looked up in the working directory when none is given.
const DEFAULT_CONFIG_NAME: &str = "chat-content";

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about = "Decode chat transcript messages", long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Transcript JSON file (array of messages); reads stdin when omitted
    #[arg(short, long)]
    pub input: Option<String>,

    /// Pretty-print the decoded output
    #[arg(long)]
    pub pretty: bool,

    /// Fallback policy for undecodable payloads (surface, raw_content, placeholder)
    #[arg(long)]
    pub fallback: Option<String>,

    /// Placeholder text used by the `placeholder` fallback policy
    #[arg(long)]
    pub placeholder: Option<String>,

    /// Comma-separated markdown extensions (gfm, math)
    #[arg(long, value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DecoderConfig {
    pub markdown: MarkdownConfig,
    pub fallback: FallbackConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarkdownConfig {
    pub extensions: Vec<SyntaxExtension>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    Surface,
    RawContent,
    Placeholder,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FallbackConfig {
    pub policy: FallbackKind,
    pub placeholder: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl DecoderConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|e| ContentError::Config(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Layer defaults, config file, environment and CLI flags.
    ///
    /// Priority: CLI flag > `CHAT_CONTENT__*` env var > config file > defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("markdown.extensions", vec!["gfm", "math"])?
            .set_default("fallback.policy", "raw_content")?
            .set_default("fallback.placeholder", "[unreadable message]")?
            .set_default("cache.capacity", DEFAULT_CACHE_CAPACITY as u64)?
            .set_default("logging.filter", "info")?
            .set_default("logging.json", false)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("markdown.extensions")
                .try_parsing(true),
        );

        if let Some(policy) = &cli.fallback {
            builder = builder.set_override("fallback.policy", policy.as_str())?;
        }
        if let Some(placeholder) = &cli.placeholder {
            builder = builder.set_override("fallback.placeholder", placeholder.as_str())?;
        }
        if let Some(extensions) = &cli.extensions {
            builder = builder.set_override("markdown.extensions", extensions.clone())?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        Ok(cfg)
    }

    /// Fallback policy described by this configuration.
    #[must_use]
    pub fn fallback_policy(&self) -> FallbackPolicy {
        match self.fallback.policy {
            FallbackKind::Surface => FallbackPolicy::Surface,
            FallbackKind::RawContent => FallbackPolicy::RawContent,
            FallbackKind::Placeholder => {
                FallbackPolicy::Placeholder(self.fallback.placeholder.clone())
            }
        }
    }

    /// Pipeline configured from these settings, reporting events to `tracing`.
    #[must_use]
    pub fn build_pipeline(&self) -> MessageContentPipeline {
        MessageContentPipeline::new()
            .with_extensions(self.markdown.extensions.clone())
            .with_fallback(self.fallback_policy())
            .with_observer(Arc::new(TracingObserver))
    }

    /// Memoizing pipeline sized by `cache.capacity`.
    #[must_use]
    pub fn build_memoized(&self) -> MemoizedPipeline {
        MemoizedPipeline::new(self.build_pipeline(), self.cache.capacity)
    }
}
