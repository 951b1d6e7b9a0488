// src/utils/config.rs

use clap::ValueEnum;
use log::info;
use std::env;
use std::path::PathBuf;

use crate::prediction::cache::DEFAULT_CACHE_SIZE;

/// Which of the two historical front ends the server stands in for. Both
/// serve the same routes; they only differ in where they bind by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FrontEnd {
    /// Form UI + JSON API, development-server defaults
    App,
    /// Lightweight API server defaults
    Api,
}

impl FrontEnd {
    pub fn default_host(&self) -> &'static str {
        match self {
            FrontEnd::App => "127.0.0.1",
            FrontEnd::Api => "localhost",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            FrontEnd::App => 5000,
            FrontEnd::Api => 8080,
        }
    }
}

/// Runtime configuration of the prediction server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub front_end: FrontEnd,
    pub host: String,
    pub port: u16,
    /// Directory holding `pipeline.json` and the `<algo>_model.json` artifacts
    pub models_dir: PathBuf,
    /// Optional HTML template replacing the embedded form page
    pub template_path: Option<PathBuf>,
    /// Maximum number of cached predictions, 0 disables the cache
    pub prediction_cache_size: usize,
    /// Map unknown algorithm names to svr instead of rejecting them
    pub legacy_algo_fallback: bool,
}

impl ServerConfig {
    pub fn defaults(front_end: FrontEnd) -> Self {
        Self {
            front_end,
            host: front_end.default_host().to_string(),
            port: front_end.default_port(),
            models_dir: PathBuf::from("models"),
            template_path: None,
            prediction_cache_size: DEFAULT_CACHE_SIZE,
            legacy_algo_fallback: false,
        }
    }

    /// Create server configuration from environment variables
    pub fn from_env(front_end: FrontEnd) -> Self {
        let defaults = Self::defaults(front_end);
        Self {
            front_end,
            host: env::var("PREDICTOR_HOST").unwrap_or(defaults.host),
            port: env::var("PREDICTOR_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            models_dir: env::var("PREDICTOR_MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.models_dir),
            template_path: env::var("PREDICTOR_TEMPLATE_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            prediction_cache_size: env::var("PREDICTION_CACHE_SIZE")
                .unwrap_or_else(|_| DEFAULT_CACHE_SIZE.to_string())
                .parse()
                .unwrap_or(DEFAULT_CACHE_SIZE),
            legacy_algo_fallback: env::var("PREDICTOR_LEGACY_ALGO_FALLBACK")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Log the current configuration
    pub fn log_config(&self) {
        info!("Front end profile: {:?}", self.front_end);
        info!("   Bind address: {}", self.bind_address());
        info!("   Models directory: {}", self.models_dir.display());
        match &self.template_path {
            Some(path) => info!("   Template: {}", path.display()),
            None => info!("   Template: embedded"),
        }
        if self.prediction_cache_size == 0 {
            info!("   Prediction cache DISABLED");
        } else {
            info!("   Prediction cache size: {}", self.prediction_cache_size);
        }
        if self.legacy_algo_fallback {
            info!("   Legacy fallback ENABLED: unknown algorithms are served by svr");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_end_defaults() {
        let app = ServerConfig::defaults(FrontEnd::App);
        assert_eq!(app.bind_address(), "127.0.0.1:5000");
        assert_eq!(app.models_dir, PathBuf::from("models"));
        assert_eq!(app.prediction_cache_size, DEFAULT_CACHE_SIZE);
        assert!(!app.legacy_algo_fallback);

        let api = ServerConfig::defaults(FrontEnd::Api);
        assert_eq!(api.bind_address(), "localhost:8080");
    }

    #[test]
    fn test_env_config() {
        env::set_var("PREDICTOR_HOST", "0.0.0.0");
        env::set_var("PREDICTOR_PORT", "9090");
        env::set_var("PREDICTOR_MODELS_DIR", "/srv/models");
        env::set_var("PREDICTOR_TEMPLATE_PATH", "/srv/index.html");
        env::set_var("PREDICTION_CACHE_SIZE", "0");
        env::set_var("PREDICTOR_LEGACY_ALGO_FALLBACK", "true");

        let config = ServerConfig::from_env(FrontEnd::Api);
        assert_eq!(config.bind_address(), "0.0.0.0:9090");
        assert_eq!(config.models_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.template_path, Some(PathBuf::from("/srv/index.html")));
        assert_eq!(config.prediction_cache_size, 0);
        assert!(config.legacy_algo_fallback);

        // unparsable values fall back to defaults
        env::set_var("PREDICTOR_PORT", "not-a-port");
        env::set_var("PREDICTOR_LEGACY_ALGO_FALLBACK", "yes");
        let config = ServerConfig::from_env(FrontEnd::Api);
        assert_eq!(config.port, 8080);
        assert!(!config.legacy_algo_fallback);

        // Clean up
        env::remove_var("PREDICTOR_HOST");
        env::remove_var("PREDICTOR_PORT");
        env::remove_var("PREDICTOR_MODELS_DIR");
        env::remove_var("PREDICTOR_TEMPLATE_PATH");
        env::remove_var("PREDICTION_CACHE_SIZE");
        env::remove_var("PREDICTOR_LEGACY_ALGO_FALLBACK");
    }
}
