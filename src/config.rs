use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{NoiseCorrectionError, Result},
    events::source::SourceType,
    output::combinatorics::binomial,
};

/// Expiry applied to sources that don't set one, in seconds.
pub const DEFAULT_EXPIRY_SECONDS: u64 = 60 * 60 * 24 * 30;

/// Randomized response parameters of the API for one source type. Defines
/// the output space a single source can produce.
///
/// Noise rates follow the event-level reports explainer:
/// https://github.com/WICG/conversion-measurement-api/blob/main/EVENT.md#data-limits-and-noise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    source_type: SourceType,
    flip_probability: f64,
    data_cardinality: usize,
    max_reports: usize,
    max_windows: usize,
}

impl ApiConfig {
    /// Constructs a new `ApiConfig`, validating that:
    /// - `flip_probability` is in `[0, 1)`.
    /// - `data_cardinality` and `max_windows` are at least 1.
    /// - the output space size fits in a `u64`.
    pub fn new(
        source_type: SourceType,
        flip_probability: f64,
        data_cardinality: usize,
        max_reports: usize,
        max_windows: usize,
    ) -> Result<Self> {
        let config = Self {
            source_type,
            flip_probability,
            data_cardinality,
            max_reports,
            max_windows,
        };
        config.validate()?;
        Ok(config)
    }

    /// Default parameters for sources registered on click.
    pub fn navigation() -> Self {
        Self {
            source_type: SourceType::Navigation,
            flip_probability: 0.5,
            data_cardinality: 8,
            max_reports: 3,
            max_windows: 3,
        }
    }

    /// Default parameters for sources registered on view.
    pub fn event() -> Self {
        Self {
            source_type: SourceType::Event,
            flip_probability: 0.0000025,
            data_cardinality: 2,
            max_reports: 1,
            max_windows: 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> {
            Err(NoiseCorrectionError::Configuration(msg))
        };
        if !(0.0..1.0).contains(&self.flip_probability) {
            return invalid(format!(
                "flip_probability must be in [0, 1), got {}",
                self.flip_probability
            ));
        }
        if self.data_cardinality < 1 {
            return invalid("data_cardinality must be at least 1".to_string());
        }
        if self.max_windows < 1 {
            return invalid("max_windows must be at least 1".to_string());
        }
        self.output_space_size().map(|_| ())
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn flip_probability(&self) -> f64 {
        self.flip_probability
    }

    pub fn data_cardinality(&self) -> usize {
        self.data_cardinality
    }

    pub fn max_reports(&self) -> usize {
        self.max_reports
    }

    pub fn max_windows(&self) -> usize {
        self.max_windows
    }

    /// Number of distinct (window, trigger data) pairs a single report can
    /// take.
    pub fn num_report_slots(&self) -> Result<usize> {
        self.data_cardinality
            .checked_mul(self.max_windows)
            .ok_or_else(|| self.too_large("number of report slots"))
    }

    /// Size of the output space, `C(slots + max_reports, max_reports)`.
    pub fn num_outputs(&self) -> Result<u64> {
        self.validate()?;
        self.output_space_size()
    }

    fn output_space_size(&self) -> Result<u64> {
        let line_length = self
            .num_report_slots()?
            .checked_add(self.max_reports)
            .ok_or_else(|| self.too_large("number of report slots and reports"))?;
        binomial(line_length, self.max_reports)
            .ok_or_else(|| self.too_large("output space"))
    }

    fn too_large(&self, what: &str) -> NoiseCorrectionError {
        NoiseCorrectionError::Configuration(format!(
            "{what} of {self:?} does not fit in 64 bits"
        ))
    }
}

/// Parameters of a full correction run, one `ApiConfig` per source type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionConfig {
    pub navigation: ApiConfig,
    pub event: ApiConfig,

    /// Trades bias for variance in the estimator; 0 is fully unbiased.
    #[serde(default)]
    pub beta: f64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            navigation: ApiConfig::navigation(),
            event: ApiConfig::event(),
            beta: 0.0,
        }
    }
}

impl CorrectionConfig {
    pub fn validate(&self) -> Result<()> {
        for (expected, config) in [
            (SourceType::Navigation, &self.navigation),
            (SourceType::Event, &self.event),
        ] {
            if config.source_type != expected {
                return Err(NoiseCorrectionError::Configuration(format!(
                    "{expected} parameters are declared for {} sources",
                    config.source_type
                )));
            }
            config.validate()?;
        }
        if !(0.0..=1.0).contains(&self.beta) {
            return Err(NoiseCorrectionError::Configuration(format!(
                "beta must be in [0, 1], got {}",
                self.beta
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json)
            .context("Failed to parse correction configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn for_source_type(&self, source_type: SourceType) -> &ApiConfig {
        match source_type {
            SourceType::Navigation => &self.navigation,
            SourceType::Event => &self.event,
        }
    }
}
