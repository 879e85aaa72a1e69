//! Logging setup
//!
//! Installs a `tracing` subscriber writing to stderr, and optionally to a
//! daily-rotated file. Initialization happens at most once per process.
//!
//! ```rust,no_run
//! use sputnik_treasury::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! init_logging(&LoggingConfig::from_env().with_format(LogFormat::Compact));
//! tracing::info!(dao_id = "treasury.sputnik-dao.near", "loading proposals");
//! ```

pub mod format;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Once, OnceLock};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

pub use format::{CompactFormatter, TreasuryFormatter};

static INIT: Once = Once::new();

/// Keeps the background file writer alive for the life of the process
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "treasury.log";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `date time LEVEL target message`
    #[default]
    Text,
    /// Newline-delimited JSON
    Json,
    /// `level: message`
    Compact,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Compact => write!(f, "compact"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!(
                "Invalid log format '{}'. Valid options: text, json, compact",
                s
            )),
        }
    }
}

/// Logging options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub debug: bool,
    /// Overrides `debug`
    pub trace: bool,
    /// Also write to a daily-rotated file in `logging_dir`
    pub record_log: bool,
    /// Supports a leading `~/`
    pub logging_dir: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            trace: false,
            record_log: false,
            logging_dir: "~/.sputnik-treasury/logs".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_file_logging(mut self, enabled: bool) -> Self {
        self.record_log = enabled;
        self
    }

    pub fn with_logging_dir(mut self, dir: impl Into<String>) -> Self {
        self.logging_dir = dir.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Read overrides from the environment
    ///
    /// - `TREASURY_DEBUG`, `TREASURY_TRACE`: any value enables the level
    /// - `TREASURY_LOG_FORMAT`: `text`, `json` or `compact`
    /// - `TREASURY_LOG_DIR`: enables file logging into that directory
    ///
    /// `RUST_LOG`, when set, replaces the level filter entirely.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Apply environment overrides on top of `self`
    pub fn merge_env(mut self) -> Self {
        if std::env::var_os("TREASURY_TRACE").is_some() {
            self.trace = true;
            self.debug = true;
        } else if std::env::var_os("TREASURY_DEBUG").is_some() {
            self.debug = true;
        }
        if let Some(format) = std::env::var("TREASURY_LOG_FORMAT")
            .ok()
            .and_then(|f| f.parse().ok())
        {
            self.format = format;
        }
        if let Ok(dir) = std::env::var("TREASURY_LOG_DIR") {
            self.logging_dir = dir;
            self.record_log = true;
        }
        self
    }

    fn level(&self) -> Level {
        if self.trace {
            Level::TRACE
        } else if self.debug {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    fn log_dir(&self) -> PathBuf {
        match (self.logging_dir.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(&self.logging_dir),
        }
    }

    fn filter(&self) -> EnvFilter {
        if std::env::var_os("RUST_LOG").is_some() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(format!(
                "{},hyper=warn,hyper_util=warn,reqwest=warn,h2=warn",
                self.level()
            ))
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| install(config));
}

pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

pub fn is_initialized() -> bool {
    INIT.is_completed()
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer()
            .event_format(TreasuryFormatter)
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(writer)
            .with_ansi(false)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .event_format(CompactFormatter)
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed(),
    }
}

fn file_layer(config: &LoggingConfig) -> Option<BoxedLayer> {
    if !config.record_log {
        return None;
    }
    let dir = config.log_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("Warning: cannot create log directory {:?}: {}", dir, e);
        return None;
    }
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX));
    let _ = FILE_GUARD.set(guard);
    // Files never get colour; compact output loses timestamps, so use text
    let format = match config.format {
        LogFormat::Compact => LogFormat::Text,
        other => other,
    };
    Some(output_layer(format, writer, false))
}

fn install(config: &LoggingConfig) {
    let ansi = console::Term::stderr().features().colors_supported();
    let mut layers = vec![output_layer(config.format, std::io::stderr, ansi)];
    layers.extend(file_layer(config));

    let result = tracing_subscriber::registry()
        .with(layers)
        .with(config.filter())
        .try_init();
    if let Err(e) = result {
        eprintln!("Warning: logging already initialized: {}", e);
    }
}
