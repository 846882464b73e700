// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::api::http_server::{start_server, AppState};
use crate::config::ServiceConfig;
use crate::vision::{DetectionService, VisionModelManager};

/// YOLO object detection HTTP service
#[derive(Parser, Debug)]
#[command(name = "yolo-detection-api")]
#[command(version)]
#[command(about = "Serve a YOLO ONNX detector over HTTP", long_about = None)]
pub struct Cli {
    /// Load environment variables from this file before reading configuration
    #[arg(long, global = true, env = "ENV_FILE")]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve(ServeArgs),

    /// Load the model, print its metadata and exit
    CheckModel(ServeArgs),
}

/// Overrides applied on top of environment configuration
#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Path to the ONNX model
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// Labels file, one class name per line
    #[arg(long)]
    pub labels_path: Option<PathBuf>,

    /// Minimum confidence for a detection
    #[arg(long)]
    pub confidence_threshold: Option<f32>,

    /// IoU above which same-class boxes are suppressed
    #[arg(long)]
    pub iou_threshold: Option<f32>,
}

impl ServeArgs {
    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(path) = &self.model_path {
            config.model_path = path.clone();
        }
        if let Some(path) = &self.labels_path {
            config.labels_path = Some(path.clone());
        }
        if let Some(threshold) = self.confidence_threshold {
            config.confidence_threshold = threshold;
        }
        if let Some(threshold) = self.iou_threshold {
            config.iou_threshold = threshold;
        }
    }
}

impl Cli {
    /// Load `.env` (or `--env-file`) into the process environment
    pub fn load_env(&self) -> Result<()> {
        match &self.env_file {
            Some(path) => {
                dotenv::from_path(path)
                    .with_context(|| format!("Failed to load env file {}", path.display()))?;
            }
            None => {
                dotenv::dotenv().ok();
            }
        }
        Ok(())
    }

    /// Build the validated configuration: environment first, then flags
    pub fn config(&self) -> Result<ServiceConfig> {
        let mut config = ServiceConfig::from_env();
        if let Some(Commands::Serve(args) | Commands::CheckModel(args)) = &self.command {
            args.apply(&mut config);
        }
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
        Ok(config)
    }
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.config()?;

    let manager = VisionModelManager::new(config.vision_model_config())
        .await
        .with_context(|| format!("Failed to load model {}", config.model_path.display()))?;

    let model = manager.model_info();
    info!(
        "Model {}: input {}x{}, {} classes",
        model.name, model.input_size, model.input_size, model.num_classes
    );

    match cli.command {
        Some(Commands::CheckModel(_)) => {
            println!("{}", serde_json::to_string_pretty(&model)?);
            Ok(())
        }
        Some(Commands::Serve(_)) | None => {
            let addr = config.listen_addr().map_err(|e| anyhow::anyhow!(e))?;
            let service = DetectionService::new(manager.detector(), config.decoder_limits());
            let state = AppState::new(Arc::new(service))
                .with_cors_origins(config.cors_allowed_origins.clone());
            start_server(addr, Arc::new(state)).await
        }
    }
}
