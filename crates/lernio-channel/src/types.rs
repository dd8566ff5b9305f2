//! Channel framework type definitions
//!
//! Enums for channel selection, exportable unit kinds, and transmission state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of learning channel an exportable unit can be transmitted to.
///
/// Each variant corresponds to one external LMS / learning-record system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// Canvas LMS
    Canvas,
    /// Blackboard Learn
    Blackboard,
    /// Moodle
    Moodle,
    /// SAP SuccessFactors
    SapSuccessFactors,
    /// Cornerstone OnDemand
    Cornerstone,
    /// Degreed (v2 API)
    Degreed2,
    /// Generic xAPI activity stream (any LRS)
    Xapi,
}

impl ChannelType {
    /// Get all available channel types.
    #[must_use]
    pub fn all() -> &'static [ChannelType] {
        &[
            ChannelType::Canvas,
            ChannelType::Blackboard,
            ChannelType::Moodle,
            ChannelType::SapSuccessFactors,
            ChannelType::Cornerstone,
            ChannelType::Degreed2,
            ChannelType::Xapi,
        ]
    }

    /// Get the stable channel code used in the database and the API surface.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Canvas => "canvas",
            ChannelType::Blackboard => "blackboard",
            ChannelType::Moodle => "moodle",
            ChannelType::SapSuccessFactors => "sap_success_factors",
            ChannelType::Cornerstone => "cornerstone",
            ChannelType::Degreed2 => "degreed2",
            ChannelType::Xapi => "xapi",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = ParseChannelTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "canvas" => Ok(ChannelType::Canvas),
            "blackboard" => Ok(ChannelType::Blackboard),
            "moodle" => Ok(ChannelType::Moodle),
            "sap_success_factors" => Ok(ChannelType::SapSuccessFactors),
            "cornerstone" => Ok(ChannelType::Cornerstone),
            "degreed2" => Ok(ChannelType::Degreed2),
            "xapi" => Ok(ChannelType::Xapi),
            _ => Err(ParseChannelTypeError(s.to_string())),
        }
    }
}

/// Error parsing channel type from string.
#[derive(Debug, Clone)]
pub struct ParseChannelTypeError(String);

impl fmt::Display for ParseChannelTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid channel type '{}', expected one of: canvas, blackboard, moodle, sap_success_factors, cornerstone, degreed2, xapi",
            self.0
        )
    }
}

impl std::error::Error for ParseChannelTypeError {}

/// Kind of exportable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Content catalog metadata (one course/program).
    ContentMetadata,
    /// Learner completion/progress data (one learner, one content item).
    LearnerData,
}

impl UnitType {
    /// Get the string representation used in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::ContentMetadata => "content_metadata",
            UnitType::LearnerData => "learner_data",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = ParseUnitTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "content_metadata" => Ok(UnitType::ContentMetadata),
            "learner_data" => Ok(UnitType::LearnerData),
            _ => Err(ParseUnitTypeError(s.to_string())),
        }
    }
}

/// Error parsing unit type from string.
#[derive(Debug, Clone)]
pub struct ParseUnitTypeError(String);

impl fmt::Display for ParseUnitTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid unit type '{}', expected one of: content_metadata, learner_data",
            self.0
        )
    }
}

impl std::error::Error for ParseUnitTypeError {}

/// Outcome of the most recent transmission attempt for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransmissionStatus {
    /// Unit has been handed to the transmitter but the outcome is not known yet.
    #[default]
    Pending,
    /// Last attempt was acknowledged by the remote channel.
    Success,
    /// Last attempt failed; the unit is due again on the next run.
    Failed,
}

impl TransmissionStatus {
    /// Get the string representation used in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TransmissionStatus::Pending => "pending",
            TransmissionStatus::Success => "success",
            TransmissionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TransmissionStatus::Pending),
            "success" => Ok(TransmissionStatus::Success),
            "failed" => Ok(TransmissionStatus::Failed),
            _ => Err(format!("Unknown transmission status: {s}")),
        }
    }
}

/// Result status of a channel health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    /// Channel is reachable and credentials validate.
    Ok,
    /// Configuration is malformed (bad chunk size, missing credentials).
    InvalidConfig,
    /// Channel rejected the credentials.
    AuthFailed,
    /// Channel could not be reached.
    Unreachable,
}

impl HealthStatus {
    /// Get the status string reported on the API surface.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Ok => "OK",
            HealthStatus::InvalidConfig => "INVALID_CONFIG",
            HealthStatus::AuthFailed => "AUTH_FAILED",
            HealthStatus::Unreachable => "UNREACHABLE",
        }
    }

    /// Whether this status counts as healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
