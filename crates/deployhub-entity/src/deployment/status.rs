//! Deployment status and its forward-only transition rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a deployment.
///
/// ```text
/// pending ──► ready ──► expired
///    │                    ▲
///    ├──► error ──────────┤
///    └────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "deployment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// Uploaded and queued, not yet validated.
    Pending,
    /// Validated and routable.
    Ready,
    /// Validation failed; terminal until expiry.
    Error,
    /// Past its expiry; storage reclaimed.
    Expired,
}

impl DeploymentStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Ready, Self::Error, Self::Expired];

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Ready)
                | (Self::Pending, Self::Error)
                | (Self::Pending, Self::Expired)
                | (Self::Ready, Self::Expired)
                | (Self::Error, Self::Expired)
        )
    }

    /// Statuses from which `self` may be entered.
    pub fn predecessors(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[],
            Self::Ready | Self::Error => &[Self::Pending],
            Self::Expired => &[Self::Pending, Self::Ready, Self::Error],
        }
    }

    /// Whether the deployment still holds (or will hold) its storage.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Ready)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "error" => Ok(Self::Error),
            "expired" => Ok(Self::Expired),
            other => Err(format!(
                "unknown deployment status '{other}' (expected pending, ready, error, expired)"
            )),
        }
    }
}
