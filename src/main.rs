use clap::Parser;
use market_sim::{config::SimConfig, simulate::run_simulation, utils::shutdown_token};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = SimConfig::parse();
    tracing_subscriber::fmt().with_max_level(cfg.log_level).init();

    let report = run_simulation(cfg, shutdown_token()).await?;
    report.log_summary();
    Ok(())
}
