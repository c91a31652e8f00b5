use clap::Parser;
use lockstep_server::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Relay server for lockstep watch parties.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML config file; LOCKSTEP_* environment variables override it
    #[arg(short, long, env = "LOCKSTEP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lockstep_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_ref())?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.server.bind_address,
        upload_dir = %config.media.upload_dir.display(),
        "lockstep relay starting"
    );

    lockstep_server::run(config).await
}
