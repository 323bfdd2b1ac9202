use core::str::FromStr;

use serde::{Deserialize, Serialize};

use detailr_core::DomainError;

/// Platform-wide role stored on a profile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Detailer,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Customer, UserRole::Detailer, UserRole::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Detailer => "detailer",
            Self::Admin => "admin",
        }
    }

    /// Admins are treated as a superset of detailer access.
    pub fn has_detailer_access(&self) -> bool {
        matches!(self, Self::Detailer | Self::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl core::fmt::Display for UserRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "detailer" => Ok(Self::Detailer),
            "admin" => Ok(Self::Admin),
            _ => Err(DomainError::unknown("user role", s)),
        }
    }
}

/// Role held by a member within a detailing organization.
///
/// Ordered from most to least privileged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    Owner,
    Manager,
    Dispatcher,
    Detailer,
}

impl OrgRole {
    pub const ALL: [OrgRole; 4] = [
        OrgRole::Owner,
        OrgRole::Manager,
        OrgRole::Dispatcher,
        OrgRole::Detailer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::Dispatcher => "dispatcher",
            Self::Detailer => "detailer",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Owner => "Organization owner with full control, including settings and role changes",
            Self::Manager => "Runs day-to-day operations: teams, members, earnings and payouts",
            Self::Dispatcher => "Assigns and reassigns bookings to detailers",
            Self::Detailer => "Fulfils bookings assigned to them",
        }
    }
}

impl core::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrgRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "manager" => Ok(Self::Manager),
            "dispatcher" => Ok(Self::Dispatcher),
            "detailer" => Ok(Self::Detailer),
            _ => Err(DomainError::unknown("organization role", s)),
        }
    }
}
