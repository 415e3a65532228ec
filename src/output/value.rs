use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    config::ApiConfig,
    errors::{NoiseCorrectionError, Result},
    events::{
        join::JoinedSource,
        report::{Report, ReportBody},
        source::Source,
    },
};

/// A single report as seen by the noise model: its reporting window and its
/// trigger data.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ReportSlot {
    pub window: usize,
    pub trigger_data: usize,
}

impl ReportSlot {
    pub fn new(window: usize, trigger_data: usize) -> Self {
        Self {
            window,
            trigger_data,
        }
    }

    /// Slot at position `index` of the flattened `(window, trigger_data)`
    /// space, windows major.
    pub fn from_index(index: usize, data_cardinality: usize) -> Self {
        Self::new(index / data_cardinality, index % data_cardinality)
    }

    pub fn fits(&self, config: &ApiConfig) -> bool {
        self.window < config.max_windows()
            && self.trigger_data < config.data_cardinality()
    }
}

/// Everything the API outputs for one source: zero or more reports. The
/// order in which reports were sent carries no information, so reports are
/// kept sorted and two outputs with the same reports are equal.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "Vec<ReportSlot>", into = "Vec<ReportSlot>")]
pub struct Output {
    reports: Vec<ReportSlot>,
}

impl From<Vec<ReportSlot>> for Output {
    fn from(reports: Vec<ReportSlot>) -> Self {
        Self::new(reports)
    }
}

impl From<Output> for Vec<ReportSlot> {
    fn from(output: Output) -> Self {
        output.reports
    }
}

impl Output {
    pub fn new(mut reports: Vec<ReportSlot>) -> Self {
        reports.sort_unstable();
        Self { reports }
    }

    /// The output of a source that sent no report.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[ReportSlot] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Whether this output belongs to the output space of `config`.
    pub fn fits(&self, config: &ApiConfig) -> bool {
        self.len() <= config.max_reports()
            && self.reports.iter().all(|slot| slot.fits(config))
    }

    /// Reduces a source and its reports to an output.
    pub fn from_joined(joined: &JoinedSource, config: &ApiConfig) -> Result<Self> {
        let source = &joined.source;
        if source.source_type != config.source_type() {
            return Err(NoiseCorrectionError::Configuration(format!(
                "{} source {} cannot be read with {} parameters",
                source.source_type,
                source.source_event_id(),
                config.source_type()
            )));
        }

        let mut reports = Vec::with_capacity(joined.reports.len());
        for report in &joined.reports {
            let window = source.window_index(report.report_time)?;
            let trigger_data = usize::try_from(report.trigger_data()).map_err(|_| {
                NoiseCorrectionError::UnknownOutput(format!(
                    "trigger data {}",
                    report.trigger_data()
                ))
            })?;
            reports.push(ReportSlot::new(window, trigger_data));
        }

        let output = Self::new(reports);
        if !output.fits(config) {
            return Err(NoiseCorrectionError::UnknownOutput(format!(
                "{output} of source {}",
                source.source_event_id()
            )));
        }
        Ok(output)
    }

    /// Number of reports per trigger data value.
    pub fn data_histogram(&self, data_cardinality: usize) -> Vec<u64> {
        let mut histogram = vec![0; data_cardinality];
        for slot in &self.reports {
            if let Some(count) = histogram.get_mut(slot.trigger_data) {
                *count += 1;
            }
        }
        histogram
    }

    /// Synthesizes the reports `source` would have sent to produce this
    /// output.
    pub fn generate_reports(&self, source: &Source) -> Result<Vec<Report>> {
        self.reports
            .iter()
            .map(|slot| {
                Ok(Report {
                    report_time: source.report_time_for_window(slot.window)?,
                    report: ReportBody {
                        source_event_id: source.source_event_id().to_string(),
                        source_type: source.source_type,
                        trigger_data: slot.trigger_data as u64,
                    },
                })
            })
            .collect()
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "[no report]");
        }
        let slots: Vec<String> = self
            .reports
            .iter()
            .map(|slot| format!("(window: {}, data: {})", slot.window, slot.trigger_data))
            .collect();
        write!(f, "[{}]", slots.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::source::{SourceRegistrationConfig, SourceType};

    fn navigation_source() -> Source {
        Source {
            source_time: 100,
            source_type: SourceType::Navigation,
            registration_config: SourceRegistrationConfig {
                source_event_id: "42".to_string(),
                expiry: None,
            },
        }
    }

    fn report(report_time: i64, trigger_data: u64) -> Report {
        Report {
            report_time,
            report: ReportBody {
                source_event_id: "42".to_string(),
                source_type: SourceType::Navigation,
                trigger_data,
            },
        }
    }

    #[test]
    fn test_report_order_is_irrelevant() {
        let a = Output::new(vec![ReportSlot::new(1, 0), ReportSlot::new(0, 3)]);
        let b = Output::new(vec![ReportSlot::new(0, 3), ReportSlot::new(1, 0)]);
        assert_eq!(a, b);
        assert_eq!(a.reports()[0], ReportSlot::new(0, 3));
    }

    #[test]
    fn test_from_joined() -> Result<()> {
        let config = ApiConfig::navigation();
        let day = 60 * 60 * 24;
        let joined = JoinedSource::new(
            navigation_source(),
            vec![report(100 + 8 * day, 5), report(100 + day, 7)],
        );
        let output = Output::from_joined(&joined, &config)?;
        assert_eq!(
            output.reports(),
            &[ReportSlot::new(0, 7), ReportSlot::new(1, 5)]
        );
        assert_eq!(output.data_histogram(8), vec![0, 0, 0, 0, 0, 1, 0, 1]);
        Ok(())
    }

    #[test]
    fn test_from_joined_outside_output_space() {
        let config = ApiConfig::navigation();

        let too_large = JoinedSource::new(navigation_source(), vec![report(100, 8)]);
        assert!(matches!(
            Output::from_joined(&too_large, &config),
            Err(NoiseCorrectionError::UnknownOutput(_))
        ));

        let too_many = JoinedSource::new(navigation_source(), vec![report(100, 1); 4]);
        assert!(matches!(
            Output::from_joined(&too_many, &config),
            Err(NoiseCorrectionError::UnknownOutput(_))
        ));

        let wrong_type = JoinedSource::new(navigation_source(), vec![]);
        assert!(matches!(
            Output::from_joined(&wrong_type, &ApiConfig::event()),
            Err(NoiseCorrectionError::Configuration(_))
        ));
    }

    #[test]
    fn test_generated_reports_read_back_to_same_output() -> Result<()> {
        let config = ApiConfig::navigation();
        let source = navigation_source();
        let output = Output::new(vec![
            ReportSlot::new(2, 1),
            ReportSlot::new(0, 4),
            ReportSlot::new(1, 1),
        ]);
        let reports = output.generate_reports(&source)?;
        assert!(reports.iter().all(|r| r.source_event_id() == "42"));

        let joined = JoinedSource::new(source, reports);
        assert_eq!(Output::from_joined(&joined, &config)?, output);
        Ok(())
    }

    #[test]
    fn test_display() {
        assert_eq!(Output::empty().to_string(), "[no report]");
        let output = Output::new(vec![ReportSlot::new(0, 1)]);
        assert_eq!(output.to_string(), "[(window: 0, data: 1)]");
    }
}
