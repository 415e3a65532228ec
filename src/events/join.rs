use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{report::Report, source::Source};

/// A source together with every report attributed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedSource {
    pub source: Source,
    pub reports: Vec<Report>,
}

impl JoinedSource {
    pub fn new(source: Source, reports: Vec<Report>) -> Self {
        Self { source, reports }
    }
}

/// Attaches reports to their sources by `source_event_id`. Sources without
/// reports get an empty list, reports without a source are dropped.
pub fn join_reports_with_sources(
    sources: Vec<Source>,
    reports: Vec<Report>,
) -> Vec<JoinedSource> {
    let mut reports_by_source: HashMap<String, Vec<Report>> = HashMap::new();
    for report in reports {
        reports_by_source
            .entry(report.source_event_id().to_string())
            .or_default()
            .push(report);
    }

    let joined: Vec<JoinedSource> = sources
        .into_iter()
        .map(|source| {
            let reports = reports_by_source
                .get(source.source_event_id())
                .cloned()
                .unwrap_or_default();
            JoinedSource::new(source, reports)
        })
        .collect();

    debug!(
        "Joined {} sources with reports from {} source event ids",
        joined.len(),
        reports_by_source.len()
    );
    joined
}
