// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use std::env;
use tracing::info;

use visionflow_server::{api::start_server, config::ServerConfig, version};

#[tokio::main]
async fn main() -> Result<()> {
    // Values from .env must be visible before clap reads the environment
    dotenv::dotenv().ok();

    let config = ServerConfig::parse();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting VisionFlow server...\n");
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!("📅 Build Date: {}", version::BUILD_DATE);
    println!();

    info!("{}", version::get_version_string());
    info!(
        "Model: {} (confidence {}, iou {}, max {})",
        config.model_path.display(),
        config.confidence_threshold,
        config.iou_threshold,
        config.max_detections
    );
    info!("Database: {}", config.database_url);

    start_server(config).await
}
