use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    config::DEFAULT_EXPIRY_SECONDS,
    errors::{NoiseCorrectionError, Result},
    util::serde_util::{deserialize_opt_u64, serialize_opt_as_string},
};

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// End of the first two navigation reporting windows, relative to the source
/// time. The third window ends at the source expiry.
pub const NAVIGATION_WINDOW_ENDS: [i64; 2] = [2 * SECONDS_PER_DAY, 7 * SECONDS_PER_DAY];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Registered on click.
    Navigation,
    /// Registered on view.
    Event,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Navigation => write!(f, "navigation"),
            SourceType::Event => write!(f, "event"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRegistrationConfig {
    pub source_event_id: String,

    /// Expiry in seconds, defaults to 30 days.
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u64",
        serialize_with = "serialize_opt_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<u64>,
}

/// A source registration, as received from the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Registration time in seconds since the UNIX epoch.
    pub source_time: i64,
    pub source_type: SourceType,
    pub registration_config: SourceRegistrationConfig,
}

impl Source {
    pub fn source_event_id(&self) -> &str {
        &self.registration_config.source_event_id
    }

    pub fn expiry_seconds(&self) -> i64 {
        let expiry = self
            .registration_config
            .expiry
            .unwrap_or(DEFAULT_EXPIRY_SECONDS);
        i64::try_from(expiry).unwrap_or(i64::MAX)
    }

    /// Expiry of a navigation source, which must end after the second
    /// reporting window.
    fn navigation_expiry(&self) -> Result<i64> {
        let expiry = self.expiry_seconds();
        if expiry <= NAVIGATION_WINDOW_ENDS[1] {
            return Err(NoiseCorrectionError::Configuration(format!(
                "navigation source {} expires after {expiry}s, which is not more than 7 days",
                self.source_event_id()
            )));
        }
        Ok(expiry)
    }

    /// Reporting window that a report sent at `report_time` belongs to.
    pub fn window_index(&self, report_time: i64) -> Result<usize> {
        match self.source_type {
            SourceType::Event => Ok(0),
            SourceType::Navigation => {
                let expiry = self.navigation_expiry()?;
                let elapsed = report_time.saturating_sub(self.source_time);
                let window = if elapsed >= expiry {
                    2
                } else if elapsed >= NAVIGATION_WINDOW_ENDS[1] {
                    1
                } else {
                    0
                };
                Ok(window)
            }
        }
    }

    /// Time at which a report in the given window is sent. Inverse of
    /// [`Source::window_index`].
    pub fn report_time_for_window(&self, window: usize) -> Result<i64> {
        let offset = match (self.source_type, window) {
            (SourceType::Event, 0) => self.expiry_seconds(),
            (SourceType::Navigation, 0 | 1) => {
                self.navigation_expiry()?;
                NAVIGATION_WINDOW_ENDS[window]
            }
            (SourceType::Navigation, 2) => self.navigation_expiry()?,
            (source_type, window) => {
                return Err(NoiseCorrectionError::UnknownOutput(format!(
                    "window {window} for a {source_type} source"
                )))
            }
        };
        Ok(self.source_time.saturating_add(offset))
    }
}
