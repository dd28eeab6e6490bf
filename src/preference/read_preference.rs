//! Read preference values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::preference::{PreferenceError, PreferenceResult};

/// Smallest max staleness a server selector will honour.
pub const MIN_MAX_STALENESS: Duration = Duration::from_secs(90);

/// A set of server tags that must all match.
pub type TagSet = BTreeMap<String, String>;

/// Which replica set members a read may be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadPreferenceMode {
    #[default]
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

impl ReadPreferenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadPreferenceMode::Primary => "primary",
            ReadPreferenceMode::PrimaryPreferred => "primaryPreferred",
            ReadPreferenceMode::Secondary => "secondary",
            ReadPreferenceMode::SecondaryPreferred => "secondaryPreferred",
            ReadPreferenceMode::Nearest => "nearest",
        }
    }

    /// Whether a non-primary member may serve the read.
    pub fn allows_secondary(&self) -> bool {
        !matches!(self, ReadPreferenceMode::Primary)
    }
}

impl fmt::Display for ReadPreferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadPreferenceMode {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(ReadPreferenceMode::Primary),
            "primarypreferred" => Ok(ReadPreferenceMode::PrimaryPreferred),
            "secondary" => Ok(ReadPreferenceMode::Secondary),
            "secondarypreferred" => Ok(ReadPreferenceMode::SecondaryPreferred),
            "nearest" => Ok(ReadPreferenceMode::Nearest),
            _ => Err(PreferenceError::UnknownMode(s.to_string())),
        }
    }
}

/// A read routing preference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReadPreference {
    mode: ReadPreferenceMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tag_sets: Vec<TagSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_staleness: Option<Duration>,
}

impl ReadPreference {
    pub fn new(mode: ReadPreferenceMode) -> Self {
        Self {
            mode,
            tag_sets: Vec::new(),
            max_staleness: None,
        }
    }

    pub fn primary() -> Self {
        Self::new(ReadPreferenceMode::Primary)
    }

    pub fn primary_preferred() -> Self {
        Self::new(ReadPreferenceMode::PrimaryPreferred)
    }

    pub fn secondary() -> Self {
        Self::new(ReadPreferenceMode::Secondary)
    }

    pub fn secondary_preferred() -> Self {
        Self::new(ReadPreferenceMode::SecondaryPreferred)
    }

    pub fn nearest() -> Self {
        Self::new(ReadPreferenceMode::Nearest)
    }

    /// Restrict eligible members by tags. Empty sets are allowed.
    pub fn with_tag_sets(mut self, tag_sets: Vec<TagSet>) -> PreferenceResult<Self> {
        if self.mode == ReadPreferenceMode::Primary && !tag_sets.is_empty() {
            return Err(PreferenceError::PrimaryWithTagSets);
        }
        self.tag_sets = tag_sets;
        Ok(self)
    }

    /// Exclude members lagging the primary by more than `max_staleness`.
    pub fn with_max_staleness(mut self, max_staleness: Duration) -> PreferenceResult<Self> {
        if self.mode == ReadPreferenceMode::Primary {
            return Err(PreferenceError::PrimaryWithMaxStaleness);
        }
        if max_staleness < MIN_MAX_STALENESS {
            return Err(PreferenceError::MaxStalenessTooSmall {
                actual_secs: max_staleness.as_secs(),
                min_secs: MIN_MAX_STALENESS.as_secs(),
            });
        }
        self.max_staleness = Some(max_staleness);
        Ok(self)
    }

    pub fn mode(&self) -> ReadPreferenceMode {
        self.mode
    }

    pub fn tag_sets(&self) -> &[TagSet] {
        &self.tag_sets
    }

    pub fn max_staleness(&self) -> Option<Duration> {
        self.max_staleness
    }
}

impl fmt::Display for ReadPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mode)?;
        if !self.tag_sets.is_empty() {
            write!(f, " tags={:?}", self.tag_sets)?;
        }
        if let Some(staleness) = self.max_staleness {
            write!(f, " maxStaleness={}s", staleness.as_secs())?;
        }
        Ok(())
    }
}
