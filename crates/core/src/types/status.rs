//! Status and role enums stored in the hosted backend.

use serde::{Deserialize, Serialize};

/// Moderation status of a gallery item.
///
/// Items are created `Pending` (or `Approved` when an admin uploads them) and
/// only move on through an explicit moderation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl MediaStatus {
    /// Statuses a non-admin viewer may see.
    pub const PUBLIC: &'static [Self] = &[Self::Approved];

    /// Statuses an admin viewer sees in the gallery.
    pub const ADMIN: &'static [Self] = &[Self::Approved, Self::Pending];

    /// Wire value used by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Statuses visible in the gallery for the given viewer.
    #[must_use]
    pub const fn visible_to(is_admin: bool) -> &'static [Self] {
        if is_admin { Self::ADMIN } else { Self::PUBLIC }
    }

    /// Initial status for a freshly uploaded item.
    #[must_use]
    pub const fn for_upload(uploader_is_admin: bool) -> Self {
        if uploader_is_admin {
            Self::Approved
        } else {
            Self::Pending
        }
    }
}

impl std::fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("invalid media status: {s}")),
        }
    }
}

/// Moderation decision taken by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationDecision {
    Approve,
    Reject,
}

impl ModerationDecision {
    /// Status the item ends up in after this decision.
    #[must_use]
    pub const fn target_status(self) -> MediaStatus {
        match self {
            Self::Approve => MediaStatus::Approved,
            Self::Reject => MediaStatus::Rejected,
        }
    }
}

/// Role recorded in the `user_roles` table.
///
/// The presence of an `Admin` row for a user is the only authorization
/// signal; a user without rows is an ordinary viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
}

impl Role {
    /// Wire value used by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}
