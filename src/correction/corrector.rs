use anyhow::Context;
use log::{debug, info};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use super::{
    estimator::{observe, CorrectedHistogram, DebiasingEstimator, ObservedHistogram},
    matcher::adjust_to_match_distribution,
};
use crate::{
    config::{ApiConfig, CorrectionConfig},
    errors::Result,
    events::{join::JoinedSource, source::SourceType},
    output::{Output, OutputSpaceEnumerator, StarsAndBarsEnumerator},
};

/// Debiased report count for one trigger data value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDataCount {
    pub trigger_data: usize,
    pub report_count: f64,
}

/// Debiased report counts, per source type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCorrection {
    pub navigation: Vec<TriggerDataCount>,
    pub event: Vec<TriggerDataCount>,
}

/// Corrects the noise of event-level reports, either in aggregate or by
/// synthesizing new event-level data. Navigation and event sources are
/// corrected independently, each with its own parameters.
pub struct NoiseCorrector<R: Rng, E: OutputSpaceEnumerator = StarsAndBarsEnumerator> {
    pub config: CorrectionConfig,

    /// Source of randomness for shuffling and resampling.
    pub rng: R,

    pub enumerator: E,
}

impl<R: Rng> NoiseCorrector<R> {
    pub fn new(config: CorrectionConfig, rng: R) -> Result<Self> {
        Self::with_enumerator(config, rng, StarsAndBarsEnumerator)
    }
}

impl<R: Rng, E: OutputSpaceEnumerator> NoiseCorrector<R, E> {
    pub fn with_enumerator(config: CorrectionConfig, rng: R, enumerator: E) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng,
            enumerator,
        })
    }

    pub fn estimator(&self, api_config: &ApiConfig) -> Result<DebiasingEstimator> {
        DebiasingEstimator::new(api_config.flip_probability(), self.config.beta)
    }

    /// Histogram of `outputs` over the whole output space.
    pub fn observed_histogram(
        &self,
        outputs: &[Output],
        api_config: &ApiConfig,
    ) -> Result<ObservedHistogram> {
        let universe = self.enumerator.enumerate(api_config)?;
        observe(universe, outputs.iter())
    }

    /// Debiased number of sources per output.
    pub fn corrected_output_counts(
        &self,
        joined: &[JoinedSource],
        api_config: &ApiConfig,
    ) -> Result<CorrectedHistogram> {
        self.debias(&outputs_of(joined, api_config)?, api_config)
    }

    fn debias(&self, outputs: &[Output], api_config: &ApiConfig) -> Result<CorrectedHistogram> {
        let observed = self.observed_histogram(outputs, api_config)?;
        Ok(self.estimator(api_config)?.estimate(&observed))
    }

    /// Debiased report counts per trigger data, for sources of one type.
    pub fn trigger_data_counts(
        &self,
        joined: &[JoinedSource],
        api_config: &ApiConfig,
    ) -> Result<Vec<TriggerDataCount>> {
        let corrected = self.corrected_output_counts(joined, api_config)?;
        let mut report_counts = vec![0.0; api_config.data_cardinality()];
        for (output, count) in &corrected {
            let histogram = output.data_histogram(api_config.data_cardinality());
            for (total, reports) in report_counts.iter_mut().zip(histogram) {
                *total += count * reports as f64;
            }
        }

        Ok(report_counts
            .into_iter()
            .enumerate()
            .map(|(trigger_data, report_count)| TriggerDataCount {
                trigger_data,
                report_count,
            })
            .collect())
    }

    /// Debiased report counts per trigger data, per source type.
    pub fn correct_aggregates(
        &self,
        joined: &[JoinedSource],
    ) -> anyhow::Result<AggregateCorrection> {
        let (navigation, event): (Vec<JoinedSource>, Vec<JoinedSource>) = joined
            .iter()
            .cloned()
            .partition(|j| j.source.source_type == SourceType::Navigation);
        info!(
            "Correcting aggregates of {} navigation and {} event sources",
            navigation.len(),
            event.len()
        );

        Ok(AggregateCorrection {
            navigation: self
                .trigger_data_counts(&navigation, &self.config.navigation)
                .context("Failed to correct navigation aggregates")?,
            event: self
                .trigger_data_counts(&event, &self.config.event)
                .context("Failed to correct event aggregates")?,
        })
    }

    /// Replaces the reports of sources of one type with synthetic ones that
    /// match the debiased distribution of outputs, changing as few sources
    /// as possible. Sources come back shuffled.
    pub fn correct_source_type(
        &mut self,
        mut joined: Vec<JoinedSource>,
        api_config: &ApiConfig,
    ) -> Result<Vec<JoinedSource>> {
        // The matcher favors values it sees first, shuffle to avoid favoring
        // some sources over others.
        joined.shuffle(&mut self.rng);

        let outputs = outputs_of(&joined, api_config)?;
        let target = self.debias(&outputs, api_config)?;
        let adjusted =
            adjust_to_match_distribution(&outputs, &target, Output::empty(), &mut self.rng)?;
        debug!(
            "Matched {} {} sources against {} outputs",
            joined.len(),
            api_config.source_type(),
            target.len()
        );

        joined
            .into_iter()
            .zip(adjusted)
            .map(|(j, output)| {
                let reports = output.generate_reports(&j.source)?;
                Ok(JoinedSource::new(j.source, reports))
            })
            .collect()
    }

    /// Synthetic event-level data for all sources, navigation sources first.
    pub fn correct_event_level(
        &mut self,
        joined: Vec<JoinedSource>,
    ) -> anyhow::Result<Vec<JoinedSource>> {
        let (navigation, event): (Vec<JoinedSource>, Vec<JoinedSource>) = joined
            .into_iter()
            .partition(|j| j.source.source_type == SourceType::Navigation);
        info!(
            "Generating corrected event-level data for {} navigation and {} event sources",
            navigation.len(),
            event.len()
        );

        let navigation_config = self.config.navigation.clone();
        let event_config = self.config.event.clone();
        let mut corrected = self
            .correct_source_type(navigation, &navigation_config)
            .context("Failed to correct navigation sources")?;
        corrected.extend(
            self.correct_source_type(event, &event_config)
                .context("Failed to correct event sources")?,
        );
        Ok(corrected)
    }
}

fn outputs_of(joined: &[JoinedSource], api_config: &ApiConfig) -> Result<Vec<Output>> {
    joined
        .iter()
        .map(|j| Output::from_joined(j, api_config))
        .collect()
}
