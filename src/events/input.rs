//! JSON input format: one batch holds the registered sources and the
//! event-level reports they produced.
//!
//! ```json
//! {
//!   "input": {
//!     "sources": [{
//!       "source_time": 123,
//!       "source_type": "navigation",
//!       "registration_config": { "source_event_id": "123456789", "expiry": "864000" }
//!     }]
//!   },
//!   "reports": [{
//!     "report_time": 123,
//!     "report": { "source_event_id": "123456789", "source_type": "navigation", "trigger_data": "4" }
//!   }]
//! }
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::{
    join::{join_reports_with_sources, JoinedSource},
    report::Report,
    source::Source,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSources {
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputBatch {
    pub input: InputSources,
    #[serde(default)]
    pub reports: Vec<Report>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// The whole input is a single batch.
    #[default]
    Single,
    /// JSON lines, one batch per line. Events of a given browser are
    /// expected to be isolated in one line.
    Multi,
}

impl InputBatch {
    pub fn join(self) -> Vec<JoinedSource> {
        join_reports_with_sources(self.input.sources, self.reports)
    }

    pub fn parse_single(json: &str) -> anyhow::Result<Vec<JoinedSource>> {
        let batch: InputBatch =
            serde_json::from_str(json).context("Failed to parse input batch")?;
        Ok(batch.join())
    }

    pub fn parse_multi(json_lines: &str) -> anyhow::Result<Vec<JoinedSource>> {
        let mut joined = vec![];
        for (line_number, line) in json_lines.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let batch: InputBatch = serde_json::from_str(line).with_context(|| {
                format!("Failed to parse input batch on line {}", line_number + 1)
            })?;
            joined.extend(batch.join());
        }
        Ok(joined)
    }

    pub fn parse(mode: InputMode, text: &str) -> anyhow::Result<Vec<JoinedSource>> {
        match mode {
            InputMode::Single => Self::parse_single(text),
            InputMode::Multi => Self::parse_multi(text),
        }
    }
}
