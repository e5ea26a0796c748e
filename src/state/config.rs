use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::processing::report::NumberFormat;
use crate::processing::statistics::{ModeTiePolicy, StatsOptions, VariancePolicy};

pub const DEFAULT_REPORT_NAME: &str = "computeStatisticsResults.tsv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("precision scale must be a positive finite number, got {0}")]
    InvalidScale(f64),
    #[error("report name must be a plain file name, got {0:?}")]
    InvalidReportName(String),
}

/// Settings for one invocation. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub variance: VariancePolicy,
    pub mode_ties: ModeTiePolicy,
    pub number_format: NumberFormat,
    pub precision_scale: Option<f64>,
    pub report_name: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            variance: VariancePolicy::default(),
            mode_ties: ModeTiePolicy::default(),
            number_format: NumberFormat::default(),
            precision_scale: None,
            report_name: DEFAULT_REPORT_NAME.to_string(),
        }
    }
}

impl RunConfig {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: RunConfig = serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        tracing::info!("Config loaded from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(scale) = self.precision_scale {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(ConfigError::InvalidScale(scale));
            }
        }
        let name = Path::new(&self.report_name);
        if self.report_name.is_empty() || name.file_name() != Some(name.as_os_str()) {
            return Err(ConfigError::InvalidReportName(self.report_name.clone()));
        }
        Ok(())
    }

    pub fn stats_options(&self) -> StatsOptions {
        StatsOptions {
            variance: self.variance,
            mode_ties: self.mode_ties,
            precision_scale: self.precision_scale,
        }
    }
}
