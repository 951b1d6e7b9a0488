use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use wildfire_lib::prediction::PredictionService;
use wildfire_lib::registry::{ModelRegistry, ModelStore};
use wildfire_lib::server::{self, load_index_template, AppState};
use wildfire_lib::utils::config::{FrontEnd, ServerConfig};
use wildfire_lib::utils::{env::load_env, init_logging};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct ServerArgs {
    /// Front end profile, selects the default bind address
    #[arg(long, value_enum, default_value_t = FrontEnd::App)]
    front_end: FrontEnd,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(long)]
    port: Option<u16>,

    /// Directory holding pipeline.json and the model artifacts
    #[arg(long)]
    models_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Environment first so RUST_LOG from .env applies to the logger
    let env = load_env();
    init_logging();
    env.log();
    info!("Starting wildfire burned-area prediction server");

    let args = ServerArgs::parse();
    let mut config = ServerConfig::from_env(args.front_end);
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(models_dir) = args.models_dir {
        config.models_dir = models_dir;
    }
    config.log_config();

    let registry = ModelRegistry::load(ModelStore::new(&config.models_dir))
        .context("Failed to load model artifacts")?;
    let service = PredictionService::new(
        Arc::new(registry),
        config.prediction_cache_size,
        config.legacy_algo_fallback,
    );
    let index_html = load_index_template(config.template_path.as_deref())?;
    let state = Arc::new(AppState::new(service, index_html));

    server::serve(&config.bind_address(), state).await
}
