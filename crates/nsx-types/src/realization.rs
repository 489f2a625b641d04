//! Realization-status records returned by the NSX realized-entities API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code NSX reports while a load-balancer provider is still being
/// provisioned. An ERROR entity carrying this code is not a real failure.
pub const PROVIDER_NOT_READY_ERROR_CODE: i64 = 500030;

/// Realization state of a single realized entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RealizedState {
    Realized,
    Unrealized,
    Error,
    InProgress,
    Unavailable,
    /// Any state string this crate does not know about.
    #[default]
    #[serde(other)]
    Unknown,
}

impl RealizedState {
    /// Returns true if the entity is fully realized.
    pub fn is_realized(&self) -> bool {
        matches!(self, RealizedState::Realized)
    }

    /// Returns true if the entity reported an error.
    pub fn is_error(&self) -> bool {
        matches!(self, RealizedState::Error)
    }
}

impl fmt::Display for RealizedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RealizedState::Realized => "REALIZED",
            RealizedState::Unrealized => "UNREALIZED",
            RealizedState::Error => "ERROR",
            RealizedState::InProgress => "IN_PROGRESS",
            RealizedState::Unavailable => "UNAVAILABLE",
            RealizedState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Structured API error attached to an alarm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// An alarm raised against a realized entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ApiErrorDetails>,
}

impl Alarm {
    /// Creates an alarm carrying only a message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            error_details: None,
        }
    }

    /// Creates an alarm carrying a message and a structured error code.
    pub fn with_code(message: impl Into<String>, code: i64) -> Self {
        let message = message.into();
        Self {
            message: Some(message.clone()),
            error_details: Some(ApiErrorDetails {
                error_code: Some(code),
                error_message: Some(message),
            }),
        }
    }

    /// Returns the structured error code, if any.
    pub fn error_code(&self) -> Option<i64> {
        self.error_details.as_ref().and_then(|d| d.error_code)
    }

    /// Returns true if this alarm only reports a provider that is not ready yet.
    pub fn is_provider_not_ready(&self) -> bool {
        self.error_code() == Some(PROVIDER_NOT_READY_ERROR_CODE)
    }
}

/// One entity of a realization-status listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealizedResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub state: RealizedState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alarms: Vec<Alarm>,
}

impl RealizedResource {
    /// Creates an entity of the given type and state without an id.
    pub fn new(entity_type: impl Into<String>, state: RealizedState) -> Self {
        Self {
            id: None,
            entity_type: Some(entity_type.into()),
            state,
            alarms: Vec::new(),
        }
    }

    /// Sets the entity id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Appends an alarm.
    pub fn with_alarm(mut self, alarm: Alarm) -> Self {
        self.alarms.push(alarm);
        self
    }

    /// Returns the alarm messages that carry text, in order.
    pub fn alarm_messages(&self) -> impl Iterator<Item = &str> {
        self.alarms.iter().filter_map(|a| a.message.as_deref())
    }
}

/// Response of the realized-entities list call for one intent path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealizedResourceList {
    #[serde(default)]
    pub results: Vec<RealizedResource>,
}

impl RealizedResourceList {
    pub fn new(results: Vec<RealizedResource>) -> Self {
        Self { results }
    }
}

/// `(id, entity type)` pair selecting which realized entities matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpectedEntity {
    pub id: String,
    pub entity_type: String,
}

impl ExpectedEntity {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
        }
    }

    /// Returns true if `resource` has exactly this id and entity type.
    pub fn matches(&self, resource: &RealizedResource) -> bool {
        resource.id.as_deref() == Some(self.id.as_str())
            && resource.entity_type.as_deref() == Some(self.entity_type.as_str())
    }
}
