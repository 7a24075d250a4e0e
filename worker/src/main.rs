use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    beacon_worker::run(beacon_worker::cli::Cli::parse()).await
}
