//! Profiles, detailers and organization membership.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use detailr_auth::{OrgRole, UserRole};
use detailr_core::{DetailerId, DomainError, OrganizationId, ProfileId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Commission scheme chosen by a detailer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    /// Fixed subscription plus a low per-booking percentage.
    Subscription,
    /// Pay-per-booking at the standard percentage.
    Percentage,
}

impl PricingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::Percentage => "percentage",
        }
    }
}

impl FromStr for PricingModel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "subscription" => Ok(Self::Subscription),
            "percentage" => Ok(Self::Percentage),
            _ => Err(DomainError::unknown("pricing model", s)),
        }
    }
}

/// A detailer record. `organization_id` is `None` for solo detailers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailerRecord {
    pub id: DetailerId,
    pub profile_id: ProfileId,
    pub organization_id: Option<OrganizationId>,
    pub pricing_model: Option<PricingModel>,
    pub is_active: bool,
}

/// Whether a detailer works alone or inside an organization.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailerMode {
    Solo,
    Organization,
}

impl DetailerMode {
    pub fn of(record: Option<&DetailerRecord>) -> Self {
        match record.and_then(|r| r.organization_id) {
            Some(_) => Self::Organization,
            None => Self::Solo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub slug: Option<String>,
    pub owner_profile_id: Option<ProfileId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMember {
    pub organization_id: OrganizationId,
    pub profile_id: ProfileId,
    pub detailer_id: Option<DetailerId>,
    pub role: OrgRole,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub joined_at: DateTime<Utc>,
}
