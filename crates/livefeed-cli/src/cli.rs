//! CLI argument parsing

use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use livefeed::{ReconnectPolicy, RequestScope, SessionConfig, WebSocketConfig};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::{CliError, CliResult};

/// Tail account and market topics from a livefeed server
#[derive(Parser, Debug)]
#[command(
    name = "livefeed",
    version,
    about = "Subscribe to livefeed account and market topics and print every update",
    long_about = "Connects to a livefeed server over WebSocket, subscribes to the requested \
                  account and market topics and prints each update as it arrives.\n\
                  The connection is re-established automatically with exponential backoff; \
                  all topics are re-subscribed after every reconnect."
)]
pub struct Cli {
    /// Server endpoint (ws:// or wss://)
    #[arg(long, env = "LIVEFEED_URL")]
    pub url: String,

    /// Account keys to follow (repeatable)
    #[arg(long = "account", short = 'a', value_name = "KEY")]
    pub accounts: Vec<String>,

    /// Instruments to follow on the depth and last-trade topics (repeatable)
    #[arg(long = "instrument", short = 'i', value_name = "KEY")]
    pub instruments: Vec<String>,

    /// Instruments to follow on the legacy combined market topic (repeatable)
    #[arg(long = "legacy-market", value_name = "KEY")]
    pub legacy_markets: Vec<String>,

    /// Snapshot requests sent once connected, as scope:key (repeatable)
    #[arg(long = "request", short = 'r', value_name = "SCOPE:KEY")]
    pub requests: Vec<RequestArg>,

    /// Automatic reconnect attempts before giving up
    #[arg(long, default_value_t = 5)]
    pub max_attempts: u32,

    /// Delay before the first reconnect, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub base_delay_ms: u64,

    /// Upper bound for a single reconnect delay, in milliseconds
    #[arg(long)]
    pub max_delay_ms: Option<u64>,

    /// Socket connect timeout, in seconds
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Exit after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One readable line per update
    Human,
    /// Pretty-printed JSON
    Json,
    /// One JSON object per line
    Compact,
}

/// A `scope:key` snapshot request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestArg {
    /// What to request
    pub scope: RequestScope,
    /// Account or instrument key
    pub key: String,
}

impl FromStr for RequestArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scope, key) = s
            .split_once(':')
            .ok_or_else(|| format!("expected SCOPE:KEY, got '{s}'"))?;
        let scope = scope.parse::<RequestScope>().map_err(|e| e.to_string())?;
        if key.trim().is_empty() {
            return Err("request key must not be empty".to_string());
        }
        Ok(Self {
            scope,
            key: key.to_string(),
        })
    }
}

impl Cli {
    /// Check argument combinations clap cannot express
    pub fn validate(&self) -> CliResult<()> {
        if self.accounts.is_empty()
            && self.instruments.is_empty()
            && self.legacy_markets.is_empty()
            && self.requests.is_empty()
        {
            return Err(CliError::InvalidArguments(
                "nothing to do: pass at least one --account, --instrument, --legacy-market or \
                 --request"
                    .to_string(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(CliError::InvalidArguments(
                "--connect-timeout-secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Session configuration from the reconnect flags
    pub fn session_config(&self) -> SessionConfig {
        let mut policy = ReconnectPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_base_delay(Duration::from_millis(self.base_delay_ms));
        if let Some(max) = self.max_delay_ms {
            policy = policy.with_max_delay(Duration::from_millis(max));
        }
        SessionConfig::default().with_reconnect(policy)
    }

    /// Transport configuration from the connection flags
    pub fn websocket_config(&self) -> WebSocketConfig {
        WebSocketConfig::new(self.url.clone())
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }

    /// Install the global tracing subscriber
    ///
    /// `RUST_LOG` wins over `-v`/`--quiet` when set.
    pub fn init_tracing(&self) {
        let level = if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,
                1 => Level::INFO,
                2 => Level::DEBUG,
                _ => Level::TRACE,
            }
        };

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .init();
    }
}
