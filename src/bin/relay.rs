use anyhow::Context;
use clap::Parser;
use relay_etl::config::defaults::DEFAULT_RELAY_BIND;
use relay_etl::relay::start_relay_server;
use relay_etl::utils::logger;
use std::net::SocketAddr;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Forward GET requests with caller-supplied headers (POST /proxy)")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_RELAY_BIND)]
    bind: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_logger(args.verbose, args.log_json);

    let bind_address: SocketAddr = args
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", args.bind))?;

    tracing::info!("🚀 Starting relay on {}", bind_address);

    if let Err(e) = start_relay_server(bind_address).await {
        tracing::error!("❌ Relay failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    Ok(())
}
