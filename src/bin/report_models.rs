// src/bin/report_models.rs
//! Prints what a models directory would serve: pipeline layout, per-algorithm
//! artifact status, the strongest linear weights and, optionally, a sample
//! prediction from every loaded model.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use wildfire_lib::models::{LinearModel, RegressionModel};
use wildfire_lib::observation::{Month, Observation, Weekday};
use wildfire_lib::registry::{ModelSet, ModelStore};
use wildfire_lib::utils::config::{FrontEnd, ServerConfig};
use wildfire_lib::utils::{env::load_env, init_logging};
use wildfire_lib::Algorithm;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct ReportArgs {
    /// Directory holding pipeline.json and the model artifacts
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Also predict the reference observation with every loaded model
    #[arg(long)]
    sample: bool,
}

/// The reference observation used throughout the project's documentation.
fn reference_observation() -> Observation {
    Observation {
        x: 7,
        y: 5,
        month: Month::Mar,
        day: Weekday::Fri,
        ffmc: 86.2,
        dmc: 26.2,
        dc: 94.3,
        isi: 5.1,
        temp: 8.2,
        rh: 51.0,
        wind: 6.7,
        rain: 0.0,
    }
}

fn print_linear_weights(model: &LinearModel, feature_names: &[String]) {
    let mut weighted: Vec<(&str, f64)> = feature_names
        .iter()
        .map(String::as_str)
        .zip(model.coefficients.iter().copied())
        .collect();
    weighted.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));

    println!("      Most Influential Features (Sorted by Absolute Weight):");
    println!("      ------------------------------------------------------");
    println!("      | {:<35} | {:>10} |", "Feature Name", "Weight");
    println!("      |---------------------------------------|------------|");
    for (name, weight) in weighted.iter().take(8) {
        println!("      | {:<35} | {:>10.4} |", name, weight);
    }
    println!("      |---------------------------------------|------------|");
    println!("      | {:<35} | {:>10.4} |", "(Intercept)", model.intercept);
    println!("      ------------------------------------------------------");
}

fn print_model_report(set: &ModelSet, algorithm: Algorithm, feature_names: &[String]) {
    println!("==================================================");
    println!("  Algorithm: {}", algorithm.as_str().to_uppercase());
    println!("==================================================");

    let report = set.report();
    let Some(entry) = report.models.iter().find(|m| m.algorithm == algorithm) else {
        return;
    };
    let Some(loaded) = set.model(algorithm) else {
        println!(
            "  NOT LOADED: {}\n",
            entry.error.as_deref().unwrap_or("no error recorded")
        );
        return;
    };

    println!("  Kind:       {}", loaded.artifact.model.kind());
    println!("  Features:   {}", loaded.artifact.n_features);
    println!("  Artifact:   {}", loaded.path.display());
    println!("  SHA-256:    {}", loaded.sha256);

    match &loaded.artifact.model {
        RegressionModel::Linear(model) => print_linear_weights(model, feature_names),
        RegressionModel::Ransac(model) => {
            if let Some(inliers) = model.inlier_count {
                println!("  Inliers:    {}", inliers);
            }
            print_linear_weights(&model.estimator, feature_names);
        }
        RegressionModel::RandomForest(model) => {
            let nodes: usize = model.trees.iter().map(|t| t.nodes.len()).sum();
            println!("  Trees:      {} ({} nodes)", model.trees.len(), nodes);
        }
        RegressionModel::Svr(model) => {
            println!("  Kernel:     {:?}", model.kernel);
            println!("  Support:    {} vectors", model.support_vectors.nrows());
        }
    }
    println!();
}

fn print_sample_predictions(set: &ModelSet) -> Result<()> {
    let observation = reference_observation();
    let features = set
        .pipeline
        .pipeline
        .prepare(&observation)
        .context("Failed to transform the reference observation")?;

    println!("--- Reference observation ---");
    println!("{}", serde_json::to_string(&observation)?);
    println!("      | {:<10} | {:>12} |", "Algorithm", "Area (ha)");
    println!("      |------------|--------------|");
    for algorithm in set.algorithms() {
        let Some(loaded) = set.model(algorithm) else {
            continue;
        };
        match loaded.artifact.predict(&features) {
            Ok(predictions) => {
                let area = predictions.first().copied().unwrap_or(f64::NAN);
                println!("      | {:<10} | {:>12.4} |", algorithm, area);
            }
            Err(e) => println!("      | {:<10} | error: {:#}", algorithm, e),
        }
    }
    println!();
    Ok(())
}

fn main() -> Result<()> {
    let env = load_env();
    init_logging();
    env.log();

    let args = ReportArgs::parse();
    let models_dir = args
        .models_dir
        .unwrap_or_else(|| ServerConfig::from_env(FrontEnd::App).models_dir);

    println!("--- Wildfire Model Report ---");
    let store = ModelStore::new(&models_dir);
    let set = ModelSet::load(&store, 1)
        .with_context(|| format!("Failed to load models from {}", models_dir.display()))?;

    let report = set.report();
    println!("\nModels directory: {}", store.root().display());
    println!(
        "Pipeline: {} features from branches [{}]",
        report.pipeline.output_width,
        report.pipeline.branches.join(", ")
    );
    println!("Pipeline SHA-256: {}\n", report.pipeline.sha256);

    let feature_names = set.pipeline.pipeline.feature_names();
    for algorithm in Algorithm::ALL {
        print_model_report(&set, algorithm, &feature_names);
    }

    if args.sample {
        print_sample_predictions(&set)?;
    }

    println!("--- End of Report ---");
    Ok(())
}
