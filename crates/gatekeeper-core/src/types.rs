use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Transition of the stable presence signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceEdge {
    /// Absent to present: a vehicle reached the gate.
    Arrival,
    /// Present to absent: the vehicle left the sensor field.
    Departure,
}

impl PresenceEdge {
    /// Edge produced when the stable presence becomes `present`.
    #[must_use]
    pub fn from_presence(present: bool) -> Self {
        if present {
            Self::Arrival
        } else {
            Self::Departure
        }
    }
}

impl fmt::Display for PresenceEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arrival => write!(f, "arrival"),
            Self::Departure => write!(f, "departure"),
        }
    }
}

/// A "vehicle arrived" event sent to the verification service.
///
/// Carries no payload beyond its identity and triggering time; image capture
/// is performed by the service itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Identifier used to correlate log lines of one attempt.
    pub attempt_id: Uuid,

    /// Wall-clock time of the arrival edge.
    pub triggered_at: DateTime<Utc>,
}

impl VerificationRequest {
    /// Create a request stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            triggered_at: Utc::now(),
        }
    }
}

impl Default for VerificationRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Parsed answer of the verification service.
///
/// A missing or unparseable answer is never represented by this type; it is a
/// transport or payload error at the channel level.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the service allows the vehicle in.
    pub granted: bool,

    /// Recognized plate text, when the service returned one.
    pub plate: Option<String>,
}

impl VerificationResult {
    /// An explicit grant.
    #[must_use]
    pub fn granted(plate: Option<String>) -> Self {
        Self {
            granted: true,
            plate,
        }
    }

    /// An explicit deny.
    #[must_use]
    pub fn denied(plate: Option<String>) -> Self {
        Self {
            granted: false,
            plate,
        }
    }

    /// Plate text, or `None` when absent or empty.
    #[must_use]
    pub fn plate(&self) -> Option<&str> {
        self.plate.as_deref().filter(|p| !p.is_empty())
    }
}

/// Why an attempt ended without opening the barrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The service answered with an explicit deny.
    Rejected,
    /// No decisive answer arrived within the decision window.
    Timeout,
    /// The link failed or the answer could not be parsed.
    Transport(String),
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "rejected"),
            Self::Timeout => write!(f, "timeout"),
            Self::Transport(detail) => write!(f, "transport failure: {detail}"),
        }
    }
}

/// Final, fail-closed outcome of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Granted { plate: Option<String> },
    Denied { plate: Option<String>, reason: DenyReason },
}

impl Decision {
    /// Normalize a channel answer; only an explicit grant opens the gate.
    #[must_use]
    pub fn from_result(result: VerificationResult) -> Self {
        if result.granted {
            Self::Granted {
                plate: result.plate,
            }
        } else {
            Self::Denied {
                plate: result.plate,
                reason: DenyReason::Rejected,
            }
        }
    }

    #[must_use]
    pub fn timeout() -> Self {
        Self::Denied {
            plate: None,
            reason: DenyReason::Timeout,
        }
    }

    #[must_use]
    pub fn transport_failure(detail: impl Into<String>) -> Self {
        Self::Denied {
            plate: None,
            reason: DenyReason::Transport(detail.into()),
        }
    }

    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    #[must_use]
    pub fn plate(&self) -> Option<&str> {
        match self {
            Self::Granted { plate } | Self::Denied { plate, .. } => {
                plate.as_deref().filter(|p| !p.is_empty())
            }
        }
    }
}
