//! Organization membership management and organization-scoped access.
//!
//! Capability checks run here, before any remote action is invoked.

use std::sync::Arc;

use tracing::{info, warn};

use detailr_auth::{AuthError, Capability, Identity, OrgRole, require_capability, require_user};
use detailr_core::{DetailerId, ProfileId};
use detailr_marketplace::{Booking, BookingFilters, Organization, OrganizationMember};

use super::mode::{ModeResolver, OrgContext};
use crate::error::ServiceError;
use crate::platform::DirectoryStore;

pub struct OrganizationService {
    directory: Arc<dyn DirectoryStore>,
    modes: Arc<ModeResolver>,
}

impl OrganizationService {
    pub fn new(directory: Arc<dyn DirectoryStore>, modes: Arc<ModeResolver>) -> Self {
        Self { directory, modes }
    }

    pub async fn context(&self, identity: Option<&Identity>) -> Result<OrgContext, ServiceError> {
        self.modes.resolve_context(identity).await
    }

    /// Resolve the caller's context and require `capability` in it.
    pub async fn authorize(
        &self,
        identity: Option<&Identity>,
        capability: Capability,
    ) -> Result<OrgContext, ServiceError> {
        let ctx = self.context(identity).await?;
        require_capability(ctx.role, capability)?;
        Ok(ctx)
    }

    /// May the caller hand `booking` to `target`?
    ///
    /// Admins may always assign. Anyone else needs `assign_jobs` in the
    /// organization that owns the booking, and the target detailer must
    /// belong to that same organization. Bookings of other organizations (and
    /// solo bookings) are reported as not found.
    pub async fn authorize_assignment(
        &self,
        identity: Option<&Identity>,
        booking: &Booking,
        target: DetailerId,
    ) -> Result<(), ServiceError> {
        let identity = require_user(identity)?;
        if identity.role.is_admin() {
            return Ok(());
        }
        let ctx = self.authorize(Some(identity), Capability::AssignJobs).await?;
        let org = member_org(&ctx)?;
        if booking.organization_id != Some(org.id) {
            warn!(
                profile_id = %identity.profile_id,
                booking_id = %booking.id,
                organization_id = %org.id,
                "assignment refused for booking outside the caller's organization"
            );
            return Err(ServiceError::NotFoundOrInaccessible);
        }

        let in_org = self
            .directory
            .get_detailer(target)
            .await?
            .is_some_and(|d| d.organization_id == Some(org.id));
        if !in_org {
            return Err(ServiceError::validation(
                "detailer_id must be a detailer of the booking's organization",
            ));
        }
        Ok(())
    }

    pub async fn members(
        &self,
        identity: Option<&Identity>,
    ) -> Result<(Organization, Vec<OrganizationMember>), ServiceError> {
        let ctx = self.context(identity).await?;
        let (Some(org), Some(_)) = (ctx.organization, ctx.role) else {
            return Err(AuthError::forbidden("Forbidden: organization membership required").into());
        };
        let members = self.directory.get_organization_members(org.id).await?;
        Ok((org, members))
    }

    pub async fn change_member_role(
        &self,
        identity: Option<&Identity>,
        member: ProfileId,
        role: OrgRole,
    ) -> Result<OrganizationMember, ServiceError> {
        let ctx = self.authorize(identity, Capability::ChangeMemberRoles).await?;
        let org = member_org(&ctx)?;
        if member == ctx.profile_id {
            return Err(ServiceError::validation("cannot change your own role"));
        }
        if role == OrgRole::Owner {
            return Err(ServiceError::validation("ownership cannot be granted through a role change"));
        }

        let updated = self
            .directory
            .update_member_role(org.id, member, role)
            .await?
            .ok_or(ServiceError::NotFoundOrInaccessible)?;
        info!(organization_id = %org.id, member = %member, role = %role, "member role changed");
        Ok(updated)
    }

    pub async fn remove_member(
        &self,
        identity: Option<&Identity>,
        member: ProfileId,
    ) -> Result<(), ServiceError> {
        let ctx = self.authorize(identity, Capability::RemoveMembers).await?;
        let org = member_org(&ctx)?;
        if member == ctx.profile_id {
            return Err(ServiceError::validation("cannot remove yourself"));
        }

        let target_role = self
            .directory
            .get_user_role_in_organization(member, org.id)
            .await?
            .ok_or(ServiceError::NotFoundOrInaccessible)?;
        if target_role == OrgRole::Owner {
            return Err(AuthError::forbidden("Forbidden: the organization owner cannot be removed").into());
        }

        if !self.directory.remove_organization_member(org.id, member).await? {
            return Err(ServiceError::NotFoundOrInaccessible);
        }
        info!(organization_id = %org.id, member = %member, "member removed");
        Ok(())
    }

    /// Narrow `filters` to what the caller may see.
    ///
    /// Admins see everything. Organization members holding
    /// `view_all_org_bookings` see their organization; everyone else sees the
    /// bookings assigned to their own detailer record.
    pub async fn scope_bookings(
        &self,
        identity: Option<&Identity>,
        mut filters: BookingFilters,
    ) -> Result<BookingFilters, ServiceError> {
        let identity = require_user(identity)?;
        if identity.role.is_admin() {
            return Ok(filters);
        }

        let ctx = self.context(Some(identity)).await?;
        if let (Some(org), true) = (&ctx.organization, ctx.permissions.can_view_all_org_bookings) {
            filters.organization_id = Some(org.id);
            return Ok(filters);
        }

        let record = self
            .directory
            .get_detailer_by_profile(identity.profile_id)
            .await?
            .ok_or_else(|| AuthError::forbidden("Forbidden: detailer access required"))?;
        filters.detailer_id = Some(record.id);
        Ok(filters)
    }

    /// `NotFoundOrInaccessible` unless the caller may read `booking`.
    pub async fn ensure_booking_visible(
        &self,
        identity: Option<&Identity>,
        booking: &Booking,
    ) -> Result<(), ServiceError> {
        let identity = require_user(identity)?;
        if identity.role.is_admin() || booking.customer_id == identity.profile_id {
            return Ok(());
        }

        let ctx = self.context(Some(identity)).await?;
        let org_visible = ctx.permissions.can_view_all_org_bookings
            && ctx.organization.as_ref().map(|o| o.id).is_some()
            && ctx.organization.as_ref().map(|o| o.id) == booking.organization_id;
        if org_visible {
            return Ok(());
        }

        let own = match self.directory.get_detailer_by_profile(identity.profile_id).await {
            Ok(record) => record.is_some_and(|d| booking.detailer_id == Some(d.id)),
            Err(err) => {
                warn!(profile_id = %identity.profile_id, error = %err, "detailer lookup failed during visibility check");
                false
            }
        };
        if own {
            Ok(())
        } else {
            Err(ServiceError::NotFoundOrInaccessible)
        }
    }
}

fn member_org(ctx: &OrgContext) -> Result<&Organization, ServiceError> {
    ctx.organization
        .as_ref()
        .ok_or_else(|| AuthError::forbidden("Forbidden: organization membership required").into())
}
