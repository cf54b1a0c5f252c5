//! # Relay CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 管道运行与生命周期管理
//! - Ctrl+C / 超时取消

mod cli;
mod commands;
mod error;
mod formats;
mod stats;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::{error, info};

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // .env may carry RELAY_* settings
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    observability::init_with_config(logging_config(&cli, ObservabilityConfig::from_env()))?;

    info!(version = env!("CARGO_PKG_VERSION"), "relay starting");

    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }
    result
}

/// Logging settings: flags win over `RELAY_LOG_LEVEL`
///
/// The Prometheus exporter is left to `run --metrics-port`.
fn logging_config(cli: &Cli, env: ObservabilityConfig) -> ObservabilityConfig {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn".to_string(),
        (false, 0) => env.default_log_level,
        (false, 1) => "debug".to_string(),
        (false, _) => "trace".to_string(),
    };
    ObservabilityConfig::logging_only(cli.log_format.into(), level)
}
