#![allow(unused)] // not every test binary uses every fixture

use ara_denoise::{
    events::{
        join::JoinedSource,
        source::{Source, SourceRegistrationConfig, SourceType},
    },
    output::Output,
};

pub const DAY: i64 = 60 * 60 * 24;

pub fn source(id: usize, source_type: SourceType) -> Source {
    Source {
        source_time: 1_600_000_000 + id as i64,
        source_type,
        registration_config: SourceRegistrationConfig {
            source_event_id: id.to_string(),
            expiry: Some(20 * DAY as u64),
        },
    }
}

/// A source whose reports produce exactly `output`.
pub fn joined_with_output(
    id: usize,
    source_type: SourceType,
    output: &Output,
) -> anyhow::Result<JoinedSource> {
    let source = source(id, source_type);
    let reports = output.generate_reports(&source)?;
    Ok(JoinedSource::new(source, reports))
}
