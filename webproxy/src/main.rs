use std::process::ExitCode;

use tracing::{info, warn};
use utils::init_tracing;
use webproxy_config::ProxyConfig;
use webproxy_core::master::Master;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cfg = match ProxyConfig::from_args(std::env::args()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    init_tracing();

    let master = Master::new(cfg);
    master
        .run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!(target: "webproxy::master", "Received Ctrl+C"),
                Err(e) => {
                    warn!(target: "webproxy::master", error = ?e, "Ctrl+C handler unavailable");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await?;

    Ok(ExitCode::SUCCESS)
}
