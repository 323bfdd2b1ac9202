//! Solo vs organization mode, plus the acting member's organization and role.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use detailr_auth::{AuthError, FailurePolicy, Identity, OrgPermissions, OrgRole, permissions_for};
use detailr_core::{OrganizationId, ProfileId};
use detailr_marketplace::{DetailerMode, Organization};

use crate::error::{PlatformError, ServiceError};
use crate::platform::DirectoryStore;

/// Everything an organization-aware handler needs about the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgContext {
    pub profile_id: ProfileId,
    pub mode: DetailerMode,
    pub organization: Option<Organization>,
    pub role: Option<OrgRole>,
    pub permissions: OrgPermissions,
}

pub struct ModeResolver {
    directory: Arc<dyn DirectoryStore>,
    policy: FailurePolicy,
}

impl ModeResolver {
    pub fn new(directory: Arc<dyn DirectoryStore>, policy: FailurePolicy) -> Self {
        Self { directory, policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// `Solo` unless the profile has a detailer record with an organization.
    pub async fn resolve_mode(
        &self,
        identity: Option<&Identity>,
        profile_id: Option<ProfileId>,
    ) -> Result<DetailerMode, ServiceError> {
        let target = target(identity, profile_id)?;
        let record = self.directory.get_detailer_by_profile(target).await;
        let record = self.absorb("resolve_mode", target, record, None)?;
        Ok(DetailerMode::of(record.as_ref()))
    }

    pub async fn resolve_organization(
        &self,
        identity: Option<&Identity>,
        profile_id: Option<ProfileId>,
    ) -> Result<Option<Organization>, ServiceError> {
        let target = target(identity, profile_id)?;
        let org = self.directory.get_user_organization(target).await;
        self.absorb("resolve_organization", target, org, None)
    }

    /// Role within `organization_id`, `None` when not a member.
    pub async fn resolve_role(
        &self,
        organization_id: OrganizationId,
        identity: Option<&Identity>,
        profile_id: Option<ProfileId>,
    ) -> Result<Option<OrgRole>, ServiceError> {
        let target = target(identity, profile_id)?;
        let role = self
            .directory
            .get_user_role_in_organization(target, organization_id)
            .await;
        self.absorb("resolve_role", target, role, None)
    }

    pub async fn resolve_context(&self, identity: Option<&Identity>) -> Result<OrgContext, ServiceError> {
        let target = target(identity, None)?;
        let mode = self.resolve_mode(identity, None).await?;
        let organization = self.resolve_organization(identity, None).await?;
        let role = match &organization {
            Some(org) => self.resolve_role(org.id, identity, None).await?,
            None => None,
        };
        Ok(OrgContext {
            profile_id: target,
            mode,
            organization,
            role,
            permissions: permissions_for(role),
        })
    }

    fn absorb<T>(
        &self,
        operation: &'static str,
        profile_id: ProfileId,
        result: Result<T, PlatformError>,
        fallback: T,
    ) -> Result<T, ServiceError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) if self.policy.is_fail_open() => {
                warn!(
                    operation,
                    profile_id = %profile_id,
                    procedure = err.procedure(),
                    error = %err,
                    "lookup failed, treating as no data"
                );
                Ok(fallback)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn target(identity: Option<&Identity>, profile_id: Option<ProfileId>) -> Result<ProfileId, AuthError> {
    match (profile_id, identity) {
        (Some(explicit), _) => Ok(explicit),
        (None, Some(identity)) => Ok(identity.profile_id),
        (None, None) => Err(AuthError::unauthenticated()),
    }
}
