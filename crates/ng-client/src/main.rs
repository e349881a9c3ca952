//! ng: nailgun client
//!
//! Sends a command to a running nailgun server, relays stdin, streams the
//! command's output back and exits with the command's exit status.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ng_client::output::{self, print_error};
use ng_client::{Session, SessionOptions};
use ng_core::config::{self, ClientConfig, PORT_ENV, SERVER_ENV};
use ng_core::transport::{connect_with_retry, SocketConnector};
use ng_core::Invocation;

/// Exit code when no session could be started
const STARTUP_FAILURE_EXIT_CODE: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "ng")]
#[command(author, version, about = "Run a command on a nailgun server")]
struct Cli {
    /// Server host, or local:<path> for a Unix domain socket
    #[arg(long, env = SERVER_ENV)]
    server: Option<String>,

    /// Server port
    #[arg(long, env = PORT_ENV)]
    port: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Give up waiting for the command after this many seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Number of connection attempts before giving up
    #[arg(long, value_name = "N")]
    connect_attempts: Option<u32>,

    /// Hold stdin until the server asks for it
    #[arg(long)]
    wait_for_start_input: bool,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,

    /// Command (class name or alias) to run, followed by its arguments.
    /// Everything after the command is passed through unchanged.
    #[arg(
        value_name = "COMMAND",
        value_parser = clap::value_parser!(OsString),
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command_line: Vec<OsString>,
}

impl Cli {
    /// Layer file, environment and flags over the defaults
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = config::load_client_config(self.config.as_deref())
            .context("Failed to load configuration")?;

        config.apply_overrides(self.server.as_deref(), self.port.as_deref())?;
        if let Some(secs) = self.timeout {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(attempts) = self.connect_attempts {
            config.connect.attempts = attempts;
        }
        if self.wait_for_start_input {
            config.wait_for_start_input = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn log_level(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the command's output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| log_level(cli.quiet, cli.verbose).into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            print_error(&format!("{:#}", e));
            STARTUP_FAILURE_EXIT_CODE
        }
    };

    // Exit directly: a blocked stdin read would otherwise hold the runtime open
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let config = cli.client_config()?;
    let address = config.address()?;

    let mut words = cli.command_line.into_iter();
    let command = words.next().context("No command given")?;
    let invocation = Invocation::capture(command, words.collect())
        .context("Failed to determine working directory")?;

    tracing::debug!(%address, command = %invocation.command_name(), "Connecting");
    let stream = connect_with_retry(&SocketConnector, &address, &config.connect).await?;

    let result = Session::new(stream)
        .with_options(SessionOptions::from(&config))
        .run(&invocation, tokio::io::stdin())
        .await;

    output::report(&result);
    Ok(result.process_exit_code())
}
