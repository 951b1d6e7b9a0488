pub mod algorithm;
pub mod models;
pub mod observation;
pub mod pipeline;
pub mod prediction;
pub mod registry;
pub mod server;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use algorithm::Algorithm;
pub use observation::{Month, Observation, Weekday};
pub use prediction::{PredictError, PredictRequest, PredictionResult, PredictionService};
pub use registry::{ModelRegistry, ModelStore};
