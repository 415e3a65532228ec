use serde::{Deserialize, Serialize};

use super::source::SourceType;
use crate::util::serde_util::{deserialize_u64, serialize_as_string};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBody {
    /// Source this report is attributed to.
    pub source_event_id: String,
    pub source_type: SourceType,

    /// Coarse data set in the trigger registration.
    #[serde(
        deserialize_with = "deserialize_u64",
        serialize_with = "serialize_as_string"
    )]
    pub trigger_data: u64,
}

/// An event-level report, as sent by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Time at which the report was sent, in seconds since the UNIX epoch.
    pub report_time: i64,
    pub report: ReportBody,
}

impl Report {
    pub fn source_event_id(&self) -> &str {
        &self.report.source_event_id
    }

    pub fn trigger_data(&self) -> u64 {
        self.report.trigger_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_data_as_string_or_number() -> anyhow::Result<()> {
        let from_string: Report = serde_json::from_str(
            r#"{"report_time": 10, "report": {"source_event_id": "1337",
                "source_type": "navigation", "trigger_data": "4"}}"#,
        )?;
        let from_number: Report = serde_json::from_str(
            r#"{"report_time": 10, "report": {"source_event_id": "1337",
                "source_type": "navigation", "trigger_data": 4}}"#,
        )?;
        assert_eq!(from_string, from_number);
        assert_eq!(from_string.trigger_data(), 4);

        let json = serde_json::to_value(&from_string)?;
        assert_eq!(json["report"]["trigger_data"], "4");
        Ok(())
    }

    #[test]
    fn test_invalid_trigger_data() {
        let parsed: Result<Report, _> = serde_json::from_str(
            r#"{"report_time": 10, "report": {"source_event_id": "1",
                "source_type": "event", "trigger_data": "four"}}"#,
        );
        assert!(parsed.is_err());
    }
}
