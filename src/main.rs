//! ccNexus - protocol-translation gateway
//!
//! Accepts requests in any of three chat-completion dialects (Claude
//! Messages, OpenAI Chat Completions, OpenAI Responses) and forwards them
//! to a configured upstream speaking any of the three, translating
//! requests, responses, and streaming events in both directions.

mod api;
mod conversion;
mod core;
mod models;

use crate::api::endpoints::{create_router, AppState};
use crate::core::config::Config;
use crate::core::logging::init_logging;
use crate::core::model_manager::ModelManager;
use crate::core::upstream::UpstreamClient;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--help") {
        print_help();
        return;
    }

    let config = match Config::from_env() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("Configuration Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.log_level);

    if !config.validate_api_key() {
        error!("Upstream API key is not configured");
        std::process::exit(1);
    }

    print_startup_banner(&config);

    let model_manager = Arc::new(ModelManager::new((*config).clone()));
    let upstream = Arc::new(UpstreamClient::new(
        config.upstream_dialect,
        config.upstream_base_url.clone(),
        config.upstream_api_key.clone(),
        config.request_timeout,
    ));

    let app_state = AppState {
        config: config.clone(),
        model_manager,
        upstream,
    };

    let app = create_router(app_state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Print startup banner with configuration
fn print_startup_banner(config: &Config) {
    println!("ccNexus protocol gateway");
    println!("   Upstream dialect: {}", config.upstream_dialect);
    println!("   Upstream URL: {}", config.upstream_base_url);
    println!("   Big Model (opus): {}", config.big_model);
    println!("   Middle Model (sonnet): {}", config.middle_model);
    println!("   Small Model (haiku): {}", config.small_model);
    println!("   Request Timeout: {}s", config.request_timeout);
    println!("   Server: {}:{}", config.host, config.port);
    println!(
        "   Client API Key Validation: {}",
        if config.client_api_key.is_some() {
            "Enabled"
        } else {
            "Disabled"
        }
    );
    println!();
}

/// Print help message
fn print_help() {
    println!("ccNexus protocol gateway");
    println!();
    println!("Usage: ccnexus [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --help    Display this help message");
    println!();
    println!("Environment variables:");
    println!("  CONFIG_PATH - Path to the TOML configuration file (default: config.toml)");
    println!();
    println!("Configuration file sections:");
    println!("  api_key    - Optional API key required from clients");
    println!("  [upstream] - dialect (claude|chat|responses), base_url, api_key");
    println!("  [models]   - big_model, middle_model, small_model");
    println!("  [server]   - host, port, log_level");
    println!("  [request]  - request_timeout");
    println!();
    println!("Model mapping:");
    println!("  Names containing haiku  -> small_model");
    println!("  Names containing sonnet -> middle_model");
    println!("  Names containing opus   -> big_model");
    println!("  Anything else passes through unchanged");
}
