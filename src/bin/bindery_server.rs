//!
//! bindery server binary
//! ---------------------
//! Command-line entry point for serving asset packages standalone. Bundles
//! are mounted from the command line, the package configuration comes from
//! a JSON file, and both can also be supplied via environment variables.

use std::env;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use bindery::manager::AssetManager;
use bindery::resolver::DiskBundles;
use bindery::server;

fn parse_port_env(name: &str) -> Option<u16> {
    match env::var(name) {
        Ok(val) => val.parse::<u16>().ok(),
        Err(_) => None,
    }
}

fn parse_port_arg(args: &[String], flag: &str) -> Option<u16> {
    parse_value_arg(args, flag).and_then(|v| v.parse::<u16>().ok())
}

fn parse_value_arg(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag
            && i + 1 < args.len() {
                return Some(args[i + 1].clone());
            }
        i += 1;
    }
    None
}

/// Collect every `--bundle id=dir` pair, in order.
fn parse_bundle_args(args: &[String]) -> Vec<String> {
    let mut bundles = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--bundle" && i + 1 < args.len() {
            bundles.push(args[i + 1].clone());
            i += 1;
        }
        i += 1;
    }
    bundles
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    println!(r"   __    _           __
  / /_  (_)___  ____/ /__  _______  __
 / __ \/ / __ \/ __  / _ \/ ___/ / / /
/ /_/ / / / / / /_/ /  __/ /  / /_/ /
\____/_/_/ /_/\__,_/\___/_/   \__, /
                             /____/   ");

    // Initialize tracing subscriber with env filter if provided
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("bindery Server\n\nUSAGE:\n  bindery_server [--http-port N] [--config PATH] [--bundle ID=DIR]...\n\nOPTIONS:\n  --http-port N       HTTP port (env: BINDERY_HTTP_PORT, default 8466)\n  --config PATH       JSON configuration override (env: BINDERY_CONFIG)\n  --bundle ID=DIR     Mount a bundle id at a directory; repeatable\n                      (env: BINDERY_BUNDLES, comma-separated ID=DIR pairs)\n");
        return Ok(());
    }

    // Defaults, then environment, then CLI arguments.
    let default_http: u16 = 8466;
    let env_http = parse_port_env("BINDERY_HTTP_PORT");
    let env_config = env::var("BINDERY_CONFIG").ok();
    let env_bundles: Vec<String> = env::var("BINDERY_BUNDLES")
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let arg_http = parse_port_arg(&args, "--http-port");
    let arg_config = parse_value_arg(&args, "--config");
    let arg_bundles = parse_bundle_args(&args);

    let http_port = arg_http.or(env_http).unwrap_or(default_http);
    let config_path = arg_config.or(env_config);

    let mut bundles = DiskBundles::new();
    for mount in env_bundles.iter().chain(arg_bundles.iter()) {
        let Some((id, dir)) = mount.split_once('=') else {
            bail!("invalid bundle mount '{}', expected ID=DIR", mount);
        };
        bundles = bundles.mount(id, dir);
    }

    let manager = Arc::new(AssetManager::new(Arc::new(bundles)));

    if let Some(path) = &config_path {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path))?;
        let custom: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in configuration file: {}", path))?;
        manager.override_configuration(custom)?;
    }

    // The host readiness signal: build the available-file index and resolve
    // the configured filter chains.
    manager.on_bundles_initialized()?;

    server::run_with_port(manager, http_port).await
}
