use clap::Parser;
use wa_gateway::config::GatewayConfig;

/// Server entry point
///
/// This is a thin wrapper that delegates to the library crate.
/// Sessions, dispatch and the HTTP API all live in lib.rs.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GatewayConfig::parse();
    wa_gateway::run(config).await
}
