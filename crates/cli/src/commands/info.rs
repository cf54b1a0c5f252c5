//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::RelayConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::ensure_config_exists;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    pipeline: PipelineInfo,
    input_format: String,
    routes: Vec<RouteInfo>,
}

#[derive(Serialize)]
struct PipelineInfo {
    worker_count: usize,
    queue_capacity: usize,
    ordering: String,
    shutdown: String,
}

#[derive(Serialize)]
struct RouteInfo {
    kind: String,
    sender: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");
    ensure_config_exists(&args.config)?;

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args);
        let json = serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &RelayConfig, args: &InfoArgs) -> ConfigInfo {
    let routes = config
        .routes
        .iter()
        .map(|r| RouteInfo {
            kind: r.kind.clone(),
            sender: format!("{:?}", r.sender),
            params: if args.params {
                r.params.clone()
            } else {
                HashMap::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", config.version),
        pipeline: PipelineInfo {
            worker_count: config.pipeline.worker_count,
            queue_capacity: config.pipeline.queue_capacity,
            ordering: format!("{:?}", config.pipeline.ordering),
            shutdown: format!("{:?}", config.pipeline.shutdown),
        },
        input_format: config.input.format.to_string(),
        routes,
    }
}

fn print_config_info(config: &RelayConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                     Relay Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let pipeline = &config.pipeline;
    println!("⚙️  Pipeline");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Workers: {}", pipeline.worker_count);
    println!("   ├─ Queue capacity: {}", pipeline.queue_capacity);
    println!("   ├─ Ordering: {:?}", pipeline.ordering);
    println!("   ├─ Shutdown: {:?}", pipeline.shutdown);
    println!("   └─ Input format: {}", config.input.format);

    println!("\n📤 Routes ({})", config.routes.len());
    for (i, route) in config.routes.iter().enumerate() {
        let is_last = i == config.routes.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({:?})", prefix, route.kind, route.sender);

        if args.params {
            let mut params: Vec<_> = route.params.iter().collect();
            params.sort();
            for (key, value) in params {
                println!("   {}  • {} = {}", child_prefix, key, value);
            }
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{RouteConfig, SenderType};
    use std::path::PathBuf;

    #[test]
    fn test_build_config_info_hides_params_by_default() {
        let config = RelayConfig {
            routes: vec![RouteConfig {
                kind: "telegram".into(),
                sender: SenderType::Log,
                params: HashMap::from([("channel".to_string(), "tg".to_string())]),
            }],
            ..Default::default()
        };
        let mut args = InfoArgs {
            config: PathBuf::from("relay.toml"),
            json: true,
            params: false,
        };

        let info = build_config_info(&config, &args);
        assert!(info.routes[0].params.is_empty());
        assert_eq!(info.routes[0].sender, "Log");
        assert_eq!(info.pipeline.worker_count, 1);

        args.params = true;
        let info = build_config_info(&config, &args);
        assert_eq!(info.routes[0].params["channel"], "tg");
    }
}
