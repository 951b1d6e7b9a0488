// src/algorithm.rs
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of persisted regression models a request can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Lr,
    Ransac,
    Rfr,
    Sgd,
    Svr,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Lr,
        Algorithm::Ransac,
        Algorithm::Rfr,
        Algorithm::Sgd,
        Algorithm::Svr,
    ];

    /// Model used for unrecognised selectors when legacy fallback is on.
    pub const LEGACY_DEFAULT: Algorithm = Algorithm::Svr;

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Lr => "lr",
            Algorithm::Ransac => "ransac",
            Algorithm::Rfr => "rfr",
            Algorithm::Sgd => "sgd",
            Algorithm::Svr => "svr",
        }
    }

    /// File name of the persisted artifact inside the models directory.
    pub fn artifact_file_name(&self) -> String {
        format!("{}_model.json", self.as_str())
    }

    /// Resolves a selector string. Unknown names are an error unless
    /// `legacy_fallback` is set, in which case they map to [`Algorithm::LEGACY_DEFAULT`].
    pub fn resolve(name: &str, legacy_fallback: bool) -> Result<Algorithm, String> {
        match name.parse::<Algorithm>() {
            Ok(algo) => Ok(algo),
            Err(_) if legacy_fallback => {
                warn!(
                    "Unrecognised algorithm '{}', falling back to '{}'",
                    name,
                    Self::LEGACY_DEFAULT
                );
                Ok(Self::LEGACY_DEFAULT)
            }
            Err(e) => Err(e),
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown algorithm '{}', expected one of: lr, ransac, rfr, sgd, svr",
                    s
                )
            })
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_selectors() {
        for algo in Algorithm::ALL {
            assert_eq!(algo.as_str().parse::<Algorithm>().unwrap(), algo);
        }
        assert!("LR".parse::<Algorithm>().is_err());
        assert!("knn".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_artifact_file_names() {
        assert_eq!(Algorithm::Lr.artifact_file_name(), "lr_model.json");
        assert_eq!(Algorithm::Ransac.artifact_file_name(), "ransac_model.json");
        assert_eq!(Algorithm::Svr.artifact_file_name(), "svr_model.json");
    }

    #[test]
    fn test_resolve_strict_and_legacy() {
        assert_eq!(Algorithm::resolve("sgd", false).unwrap(), Algorithm::Sgd);
        assert!(Algorithm::resolve("xgboost", false).is_err());
        assert_eq!(Algorithm::resolve("xgboost", true).unwrap(), Algorithm::Svr);
        assert_eq!(Algorithm::resolve("", true).unwrap(), Algorithm::Svr);
    }
}
