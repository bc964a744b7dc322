// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! Ferro Predict Web Service
//!
//! Serves genomic sequence model predictions (interval tracks, REF/ALT
//! variant comparisons and variant scores) over a JSON API, with the
//! generated plots and an optional bundled frontend.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::util::SubscriberInitExt;

use ferro_predict::service::{create_app, spawn_annotation_warmup, ServiceConfig};
use ferro_predict::validate_credential;

#[derive(Parser)]
#[command(name = "ferro-predict")]
#[command(about = "Web service for genomic sequence model predictions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web service
    Serve {
        /// Configuration file path
        #[arg(short, long, default_value = "config/service.toml")]
        config: PathBuf,

        /// Override host address
        #[arg(long)]
        host: Option<String>,

        /// Override port
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory for generated plots
        #[arg(long)]
        plots_dir: Option<PathBuf>,

        /// Use the synthetic backend instead of the remote model API
        #[arg(long)]
        mock: bool,

        /// Log level (trace, debug, info, warn, error)
        #[arg(long, default_value = "info")]
        log_level: String,
    },

    /// Generate a sample configuration file
    Config {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config/service.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Check configuration and, optionally, the annotation source
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "config/service.toml")]
        config: PathBuf,

        /// Also download and index the annotation table
        #[arg(long)]
        annotations: bool,

        /// Check this API key against the backend
        #[arg(long, env = "FERRO_PREDICT_API_KEY")]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            plots_dir,
            mock,
            log_level,
        } => serve_command(config, host, port, plots_dir, mock, log_level).await,
        Commands::Config { output, force } => config_command(output, force).await,
        Commands::Check {
            config,
            annotations,
            api_key,
        } => check_command(config, annotations, api_key).await,
    }
}

async fn serve_command(
    config_path: PathBuf,
    host_override: Option<String>,
    port_override: Option<u16>,
    plots_dir: Option<PathBuf>,
    mock: bool,
    log_level: String,
) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&log_level)?;

    info!("Starting ferro-predict web service");

    let mut config = load_or_create_config(&config_path).await?;
    config.apply_env_overrides();

    // Command line beats environment beats file
    if let Some(host) = host_override {
        config.server.host = host;
    }
    if let Some(port) = port_override {
        config.server.port = port;
    }
    if let Some(dir) = plots_dir {
        config.plots.dir = if dir.is_absolute() {
            dir
        } else {
            std::env::current_dir()?.join(dir)
        };
    }
    if mock {
        config.backend.mock = true;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e.into());
    }

    tokio::fs::create_dir_all(&config.plots.dir).await?;
    info!("Plots directory: {}", config.plots.dir.display());
    match &config.plots.frontend_dist_dir {
        Some(dist) => info!("Serving frontend from: {}", dist.display()),
        None => info!("No frontend configured, API-only mode"),
    }

    let (app, state) = create_app(config.clone())?;

    if config.annotation.preload {
        spawn_annotation_warmup(&state);
    } else {
        info!("Annotation index will be built on first use");
    }

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let browser_host = if config.server.host == "0.0.0.0" {
        "localhost"
    } else {
        &config.server.host
    };
    info!(
        "Ferro predict web service running on http://{}:{}",
        browser_host, config.server.port
    );
    info!(
        "Health check available at http://{}:{}/health",
        browser_host, config.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}

async fn config_command(
    output_path: PathBuf,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if output_path.exists() && !force {
        eprintln!(
            "Configuration file already exists: {}",
            output_path.display()
        );
        eprintln!("Use --force to overwrite");
        std::process::exit(1);
    }

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    ServiceConfig::default().to_file(&output_path)?;

    println!(
        "Sample configuration file created: {}",
        output_path.display()
    );
    println!("Edit the file to configure the backend, annotations and plots");

    Ok(())
}

async fn check_command(
    config_path: PathBuf,
    build_annotations: bool,
    api_key: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Checking configuration...");

    let mut config = load_or_create_config(&config_path).await?;
    config.apply_env_overrides();

    match config.validate() {
        Ok(()) => println!("Configuration is valid"),
        Err(e) => {
            println!("Configuration validation failed: {}", e);
            return Err(e.into());
        }
    }

    let (_, state) = match create_app(config) {
        Ok(created) => created,
        Err(e) => {
            println!("Failed to initialize application: {}", e);
            return Err(e.into());
        }
    };

    println!("\nBackend: {}", state.backend.name());
    println!(
        "Annotation source: {}",
        state
            .annotations
            .source_identifier()
            .unwrap_or_else(|| "(preloaded)".to_string())
    );
    println!("Plots directory: {}", state.artifacts.dir().display());

    if let Some(api_key) = api_key {
        println!("\nChecking API key against backend...");
        match validate_credential(state.backend.as_ref(), &api_key).await {
            Ok(_) => println!("  OK backend accepted the key"),
            Err(e) => {
                println!("  ERROR {}", e);
                return Err(e.into());
            }
        }
    }

    if build_annotations {
        println!("\nBuilding annotation index...");
        match state.annotations.ensure_ready().await {
            Ok(index) => println!(
                "  OK {} canonical transcripts on {} chromosomes",
                index.len(),
                index.chromosomes().count()
            ),
            Err(e) => {
                println!("  ERROR {}", e);
                return Err(e.into());
            }
        }
    }

    println!("\nCheck completed");
    Ok(())
}

async fn load_or_create_config(
    config_path: &Path,
) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    if config_path.exists() {
        info!("Loading configuration from {}", config_path.display());
        Ok(ServiceConfig::from_file(config_path)?)
    } else {
        warn!(
            "Configuration file not found: {}, using defaults",
            config_path.display()
        );
        println!("TIP: Run 'ferro-predict config' to generate a sample configuration file");
        Ok(ServiceConfig::default())
    }
}

fn init_tracing(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

    let filter =
        EnvFilter::try_new(level).map_err(|e| format!("Invalid log level '{}': {}", level, e))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    info!("Tracing initialized with level: {}", level);

    Ok(())
}
