//! Feature preparation: turns observations into the numeric matrix the
//! regression models were fitted on.
//!
//! The persisted [`FeaturePipeline`] is a feature union of branches. Each
//! branch selects observation columns with an [`AttributeSelector`] and runs
//! them through one fitted transform (standard scaling, multi-label
//! binarization or passthrough).
pub mod artifact;
pub mod transformers;

pub use artifact::{BranchTransform, FeaturePipeline, PipelineBranch, PIPELINE_FORMAT_VERSION};
pub use transformers::{AttributeSelector, CustomBinarizer, Passthrough, StandardScaler, Transformer};
