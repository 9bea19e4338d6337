//! Global tracing subscriber for the kubeseed binary

use clap::Args;
use thiserror::Error;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Filter used when neither `--log-level` nor `KUBESEED_LOG` is set
pub const DEFAULT_FILTER: &str = "kubeseed=info,warn";

type FmtLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

/// Logging settings shared by every command
#[derive(Debug, Args)]
pub struct LogArgs {
    /// Log format: plain or json
    #[arg(long, global = true, default_value = "plain")]
    pub log_format: LogFormat,

    /// Filter that determines which spans and events are enabled
    #[arg(long, global = true, env = "KUBESEED_LOG", default_value = DEFAULT_FILTER)]
    pub log_level: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    /// One JSON object per event, fields flattened into the top level
    Json,
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log format '{0}', expected 'plain' or 'json'")]
    Format(String),

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Init(#[from] TryInitError),
}

impl std::str::FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, LogError> {
        match s {
            "plain" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            other => Err(LogError::Format(other.to_string())),
        }
    }
}

impl LogArgs {
    /// Install the global subscriber
    ///
    /// Events go to stderr so `render` output on stdout stays a clean manifest stream.
    pub fn try_init(&self) -> Result<(), LogError> {
        let filter = EnvFilter::try_new(&self.log_level)?;
        tracing_subscriber::registry()
            .with(filter)
            .with(self.fmt_layer())
            .try_init()?;
        Ok(())
    }

    fn fmt_layer(&self) -> FmtLayer {
        let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        match self.log_format {
            LogFormat::Plain => layer.boxed(),
            LogFormat::Json => layer
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(true)
                .boxed(),
        }
    }
}
