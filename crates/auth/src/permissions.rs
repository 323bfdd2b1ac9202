//! Organization permission evaluator.
//!
//! Pure, total mapping from an (optional) organization role to a fixed set of
//! capabilities. No IO, no panics.

use serde::Serialize;

use crate::roles::OrgRole;

/// A single organization-scoped capability.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    AssignJobs,
    ManageTeams,
    ManageMembers,
    ViewOrgEarnings,
    ManageOrgSettings,
    ChangeMemberRoles,
    RemoveMembers,
    ViewAllOrgBookings,
    UpdateBookingStatus,
    CreatePayoutBatches,
}

impl Capability {
    pub const ALL: [Capability; 10] = [
        Capability::AssignJobs,
        Capability::ManageTeams,
        Capability::ManageMembers,
        Capability::ViewOrgEarnings,
        Capability::ManageOrgSettings,
        Capability::ChangeMemberRoles,
        Capability::RemoveMembers,
        Capability::ViewAllOrgBookings,
        Capability::UpdateBookingStatus,
        Capability::CreatePayoutBatches,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssignJobs => "assign_jobs",
            Self::ManageTeams => "manage_teams",
            Self::ManageMembers => "manage_members",
            Self::ViewOrgEarnings => "view_org_earnings",
            Self::ManageOrgSettings => "manage_org_settings",
            Self::ChangeMemberRoles => "change_member_roles",
            Self::RemoveMembers => "remove_members",
            Self::ViewAllOrgBookings => "view_all_org_bookings",
            Self::UpdateBookingStatus => "update_booking_status",
            Self::CreatePayoutBatches => "create_payout_batches",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved capability set for one member.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrgPermissions {
    pub can_assign_jobs: bool,
    pub can_manage_teams: bool,
    pub can_manage_members: bool,
    pub can_view_org_earnings: bool,
    pub can_manage_org_settings: bool,
    pub can_change_member_roles: bool,
    pub can_remove_members: bool,
    pub can_view_all_org_bookings: bool,
    pub can_update_booking_status: bool,
    pub can_create_payout_batches: bool,
}

impl OrgPermissions {
    /// Everything denied (no role / not a member).
    pub const NONE: OrgPermissions = OrgPermissions {
        can_assign_jobs: false,
        can_manage_teams: false,
        can_manage_members: false,
        can_view_org_earnings: false,
        can_manage_org_settings: false,
        can_change_member_roles: false,
        can_remove_members: false,
        can_view_all_org_bookings: false,
        can_update_booking_status: false,
        can_create_payout_batches: false,
    };

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::AssignJobs => self.can_assign_jobs,
            Capability::ManageTeams => self.can_manage_teams,
            Capability::ManageMembers => self.can_manage_members,
            Capability::ViewOrgEarnings => self.can_view_org_earnings,
            Capability::ManageOrgSettings => self.can_manage_org_settings,
            Capability::ChangeMemberRoles => self.can_change_member_roles,
            Capability::RemoveMembers => self.can_remove_members,
            Capability::ViewAllOrgBookings => self.can_view_all_org_bookings,
            Capability::UpdateBookingStatus => self.can_update_booking_status,
            Capability::CreatePayoutBatches => self.can_create_payout_batches,
        }
    }

    /// Granted capabilities, in declaration order.
    pub fn granted(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.allows(*c))
            .collect()
    }
}

/// Capability set for `role`. `None` yields [`OrgPermissions::NONE`].
pub fn permissions_for(role: Option<OrgRole>) -> OrgPermissions {
    match role {
        Some(OrgRole::Owner) => OrgPermissions {
            can_assign_jobs: true,
            can_manage_teams: true,
            can_manage_members: true,
            can_view_org_earnings: true,
            can_manage_org_settings: true,
            can_change_member_roles: true,
            can_remove_members: true,
            can_view_all_org_bookings: true,
            can_update_booking_status: true,
            can_create_payout_batches: true,
        },
        Some(OrgRole::Manager) => OrgPermissions {
            can_assign_jobs: true,
            can_manage_teams: true,
            can_manage_members: true,
            can_view_org_earnings: true,
            can_manage_org_settings: false,
            can_change_member_roles: false,
            can_remove_members: true,
            can_view_all_org_bookings: true,
            can_update_booking_status: true,
            can_create_payout_batches: true,
        },
        Some(OrgRole::Dispatcher) => OrgPermissions {
            can_assign_jobs: true,
            can_view_all_org_bookings: true,
            can_update_booking_status: true,
            ..OrgPermissions::NONE
        },
        Some(OrgRole::Detailer) | None => OrgPermissions::NONE,
    }
}

pub fn has_permission(role: Option<OrgRole>, capability: Capability) -> bool {
    permissions_for(role).allows(capability)
}

pub fn can_assign_jobs(role: Option<OrgRole>) -> bool {
    has_permission(role, Capability::AssignJobs)
}

pub fn can_change_member_roles(role: Option<OrgRole>) -> bool {
    has_permission(role, Capability::ChangeMemberRoles)
}

pub fn can_remove_members(role: Option<OrgRole>) -> bool {
    has_permission(role, Capability::RemoveMembers)
}

pub fn can_view_all_org_bookings(role: Option<OrgRole>) -> bool {
    has_permission(role, Capability::ViewAllOrgBookings)
}

/// Role definition with its granted capabilities (for display/audit).
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub capabilities: Vec<Capability>,
}

/// The full role → capability matrix, most privileged role first.
pub fn capability_matrix() -> Vec<RoleDefinition> {
    OrgRole::ALL
        .into_iter()
        .map(|role| RoleDefinition {
            name: role.as_str(),
            description: role.description(),
            capabilities: permissions_for(Some(role)).granted(),
        })
        .collect()
}
