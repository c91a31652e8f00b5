mod api;
mod console;
mod player;
mod session;

use anyhow::Context;
use clap::Parser;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use crate::api::RelayApi;
use crate::console::{ConsolePresenter, HELP};
use crate::session::Session;

/// Watch a video in lock-step with everyone connected to the same relay.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Relay base URL
    #[arg(long, env = "LOCKSTEP_SERVER", default_value = "http://127.0.0.1:5000")]
    server: Url,

    /// Name shown next to your chat messages
    #[arg(long, env = "LOCKSTEP_NAME", default_value = "guest")]
    name: String,

    /// Simulated time for the player to load media metadata
    #[arg(long, default_value_t = 200)]
    metadata_delay_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lockstep=warn,lockstep_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let api = RelayApi::new(args.server.clone());

    match api.notes().await {
        Ok(notes) => ConsolePresenter::default().history(&notes),
        Err(e) => tracing::warn!("Could not load chat history: {:#}", e),
    }

    let ws_url = api.ws_url(&args.name)?;
    let (ws, _) = connect_async(ws_url.as_str())
        .await
        .with_context(|| format!("connecting to {}", ws_url))?;
    println!("Connected to {} as {}", args.server, args.name);
    println!("{}", HELP);

    let session = Session::new(api, Duration::from_millis(args.metadata_delay_ms));
    session.run(ws, tokio::io::stdin()).await
}
