use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

use parkshare_cli::{init_tracing, run_server, Config};

#[derive(Parser)]
#[command(name = "parkshare")]
#[command(about = "Parkshare - parking space rental coordination server")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Port to listen on (overrides PORT)")]
    port: Option<u16>,
    #[arg(long, help = "Address to bind (overrides PARKSHARE_HOST)")]
    host: Option<IpAddr>,
    #[arg(
        long,
        help = "SQLite database file (overrides DATABASE_PATH); in-memory storage when unset"
    )]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env()?.with_overrides(cli.host, cli.port, cli.database)?;
    run_server(config).await?;

    Ok(())
}
