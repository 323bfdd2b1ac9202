//! Admin-only operations: user roles, payouts and refunds.

use std::sync::Arc;

use tracing::info;

use detailr_auth::{Identity, UserRole, require_admin};
use detailr_core::{ProfileId, RefundId};
use detailr_marketplace::{PayoutBatch, Profile, RefundDecision, RefundRequest};

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::platform::{DirectoryStore, FinanceStore, Page};

pub struct AdminService {
    directory: Arc<dyn DirectoryStore>,
    finance: Arc<dyn FinanceStore>,
    config: Arc<AppConfig>,
}

impl AdminService {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        finance: Arc<dyn FinanceStore>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            directory,
            finance,
            config,
        }
    }

    pub async fn list_users(
        &self,
        identity: Option<&Identity>,
        role: Option<UserRole>,
    ) -> Result<Vec<Profile>, ServiceError> {
        require_admin(identity)?;
        Ok(self.directory.list_profiles(role).await?)
    }

    pub async fn update_user_role(
        &self,
        identity: Option<&Identity>,
        user: ProfileId,
        role: UserRole,
    ) -> Result<Profile, ServiceError> {
        let admin = require_admin(identity)?;
        let profile = self
            .directory
            .update_profile_role(user, role)
            .await?
            .ok_or(ServiceError::NotFoundOrInaccessible)?;
        info!(admin = %admin.profile_id, user = %user, role = %role, "user role updated");
        Ok(profile)
    }

    pub async fn payouts(&self, identity: Option<&Identity>, page: Page) -> Result<Vec<PayoutBatch>, ServiceError> {
        require_admin(identity)?;
        Ok(self.finance.get_all_payouts(page).await?)
    }

    pub async fn pending_refunds(
        &self,
        identity: Option<&Identity>,
        page: Page,
    ) -> Result<Vec<RefundRequest>, ServiceError> {
        require_admin(identity)?;
        Ok(self.finance.get_pending_refunds(page).await?)
    }

    /// Requires the payment provider key: an approved refund is paid out by the platform.
    pub async fn process_refund(
        &self,
        identity: Option<&Identity>,
        refund: RefundId,
        decision: &RefundDecision,
    ) -> Result<RefundRequest, ServiceError> {
        let admin = require_admin(identity)?;
        self.config.require_payment_secret()?;
        let processed = self
            .finance
            .process_refund_request(refund, decision, admin.profile_id)
            .await?
            .ok_or(ServiceError::NotFoundOrInaccessible)?;
        info!(
            admin = %admin.profile_id,
            refund_id = %refund,
            approved = decision.approve,
            "refund processed"
        );
        Ok(processed)
    }
}
