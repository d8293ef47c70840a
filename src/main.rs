//! Command line client keeping a message stream open.
//!
//! Prints every inbound message and sends each stdin line as text until
//! stdin closes, Ctrl-C is pressed, or reconnection gives up.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, TransportKind};
use tether::{
    Client,
    ClientOptions,
    ConnectionState,
    events::{Close, Error, Failed, Message, Open},
    transport::TcpConnector,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(client) = build_client(&cli) else {
        return ExitCode::FAILURE;
    };

    client.on::<Open>(|()| info!("connected"));
    client.on::<Message>(|payload| match payload.as_text() {
        Some(text) => println!("{text}"),
        None => println!("{}", String::from_utf8_lossy(payload.as_bytes())),
    });
    client.on::<Close>(|reason| warn!(%reason, "disconnected"));
    client.on::<Error>(|err| warn!(error = %err, "client error"));
    client.on::<Failed>(|failure| error!(%failure, "giving up"));
    client.connect();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let outcome = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => client.send(line),
                Ok(None) => break ExitCode::SUCCESS,
                Err(err) => {
                    error!(error = %err, "failed to read stdin");
                    break ExitCode::FAILURE;
                }
            },
            _ = tokio::signal::ctrl_c() => break ExitCode::SUCCESS,
            _ = client.wait_for_state(|state| state == ConnectionState::Failed) => {
                break ExitCode::FAILURE;
            }
        }
    };

    client.close();
    client
        .wait_for_state(|state| matches!(state, ConnectionState::Closed | ConnectionState::Failed))
        .await;
    outcome
}

fn build_client(cli: &Cli) -> Option<Client> {
    let options = ClientOptions {
        max_attempts: cli.max_attempts,
        reconnect_delay_ms: cli.reconnect_delay_ms,
        heartbeat_interval_ms: cli.heartbeat_interval_ms,
    };
    let builder = Client::builder(cli.address.clone()).options(options);
    let kind = cli.transport.unwrap_or_else(|| TransportKind::infer(&cli.address));

    match kind {
        TransportKind::Tcp => Some(builder.build(TcpConnector::new())),
        #[cfg(feature = "websocket")]
        TransportKind::Websocket => Some(builder.build(tether::transport::WebSocketConnector::new())),
        #[cfg(not(feature = "websocket"))]
        TransportKind::Websocket => {
            error!("built without the `websocket` feature");
            None
        }
    }
}
