//! # livefeed CLI
//!
//! Tails account and market topics from a livefeed server.
//!
//! ## Usage
//!
//! ```bash
//! # Follow one account and one instrument
//! livefeed --url wss://feed.example.com/ws --account ACC1 --instrument BTC-USD
//!
//! # Ask for a snapshot once connected, print JSON lines, stop after a minute
//! livefeed --url ws://localhost:8080/ws -a ACC1 --request balance:ACC1 -f compact --duration-secs 60
//! ```

pub mod cli;
pub mod error;
pub mod output;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use livefeed::{
    AccountUpdate, LastTrade, MarketDepth, Session, SessionState, WebSocketConnector,
};
use serde_json::Value;
use tracing::{info, warn};

pub use cli::{Cli, OutputFormat, RequestArg};
pub use error::{CliError, CliResult};
use output::Printer;

/// Parse arguments and run until interrupted
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    cli.init_tracing();
    execute(cli).await
}

/// Run with already-parsed arguments
pub async fn execute(cli: Cli) -> CliResult<()> {
    cli.validate()?;

    let connector = WebSocketConnector::new(cli.websocket_config())?;
    let session = Session::new(cli.session_config(), Arc::new(connector));
    let printer = Printer::new(cli.format);

    register(&session, &cli, printer);
    session.start();

    if !cli.requests.is_empty() {
        let wait = Duration::from_secs(cli.connect_timeout_secs);
        wait_until_connected(&session, wait).await?;
        for request in &cli.requests {
            session.send_request(&request.key, request.scope);
        }
    }

    match cli.duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                result = tokio::signal::ctrl_c() => result?,
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    info!("Shutting down");
    session.disconnect();
    Ok(())
}

fn register(session: &Session, cli: &Cli, printer: Printer) {
    for account in &cli.accounts {
        let key = account.clone();
        session.subscribe(
            account,
            Arc::new(move |update: &AccountUpdate| printer.account(&key, update)),
        );
    }

    for instrument in &cli.instruments {
        session.subscribe_to_market_data(
            instrument,
            Arc::new(move |depth: &MarketDepth| printer.depth(depth)),
            Arc::new(move |trade: &LastTrade| printer.last_trade(trade)),
        );
    }

    for instrument in &cli.legacy_markets {
        let key = instrument.clone();
        session.subscribe_market_legacy(
            instrument,
            Arc::new(move |value: &Value| printer.market(&key, value)),
        );
    }

    session.set_notification_handler(Some(Arc::new(move |value: &Value| {
        printer.notification(value);
    })));
}

async fn wait_until_connected(session: &Session, limit: Duration) -> CliResult<()> {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        match session.state() {
            SessionState::Connected => return Ok(()),
            SessionState::Disconnected if session.reconnect_attempts() == 0 => {
                warn!("Connection failed and reconnection is disabled");
                return Err(CliError::ConnectTimeout(limit));
            }
            _ => {}
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(CliError::ConnectTimeout(limit));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
