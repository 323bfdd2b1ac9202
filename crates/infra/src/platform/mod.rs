//! Boundary to the external data platform.
//!
//! Every remote procedure this layer invokes is a method on one of the store
//! traits below, with a typed result. Implementations parse the remote
//! response at the boundary and report shape mismatches as
//! [`PlatformError::ContractViolation`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use detailr_auth::{OrgRole, UserRole};
use detailr_core::{BookingId, DetailerId, OrganizationId, Percentage, ProfileId, RefundId};
use detailr_marketplace::{
    AvailabilityQuery, AvailableDetailer, Booking, BookingFilters, BookingStatus, DetailerRecord,
    Organization, OrganizationMember, PaymentStatus, PayoutBatch, Profile, RefundDecision,
    RefundRequest,
};

use crate::error::PlatformError;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryPlatform;
pub use postgres::PgPlatform;

/// Remote procedure names, as invoked on the platform.
pub mod procedures {
    pub const UPDATE_BOOKING_STATUS: &str = "update_booking_status";
    pub const ASSIGN_DETAILER_TO_BOOKING: &str = "assign_detailer_to_booking";
    pub const ACCEPT_BOOKING: &str = "accept_booking";
    pub const MARK_BOOKING_PAID_FOR_TESTING: &str = "mark_booking_paid_for_testing";
    pub const CHECK_DETAILER_AVAILABILITY: &str = "check_detailer_availability_in_radius";
    pub const GET_DETAILER_BY_PROFILE: &str = "get_detailer_by_profile";
    pub const GET_USER_ORGANIZATION: &str = "get_user_organization";
    pub const GET_USER_ROLE_IN_ORGANIZATION: &str = "get_user_role_in_organization";
    pub const GET_ORGANIZATION_MEMBERS: &str = "get_organization_members";
    pub const UPDATE_MEMBER_ROLE: &str = "update_member_role";
    pub const REMOVE_ORGANIZATION_MEMBER: &str = "remove_organization_member";
    pub const GET_PLATFORM_FEE_PERCENTAGE: &str = "get_platform_fee_percentage";
    pub const GET_SUBSCRIPTION_FEE_PERCENTAGE: &str = "get_subscription_fee_percentage";
    pub const GET_ALL_PAYOUTS: &str = "get_all_payouts";
    pub const GET_PENDING_REFUNDS: &str = "get_pending_refunds";
    pub const PROCESS_REFUND_REQUEST: &str = "process_refund_request";

    // Plain table reads/writes (not stored procedures).
    pub const LIST_BOOKINGS: &str = "bookings.list";
    pub const GET_BOOKING: &str = "bookings.get";
    pub const GET_PROFILE: &str = "profiles.get";
    pub const LIST_PROFILES: &str = "profiles.list";
    pub const UPDATE_PROFILE_ROLE: &str = "profiles.update_role";
    pub const GET_DETAILER: &str = "detailers.get";
}

/// Result row of a status-changing booking procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingUpdate {
    pub booking_id: BookingId,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub detailer_id: Option<DetailerId>,
}

/// Offset pagination for admin listings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(50).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Booking reads and the named booking procedures.
///
/// Commands return `Ok(None)` when the procedure ran but produced no row.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn list_bookings(&self, filters: &BookingFilters) -> Result<Vec<Booking>, PlatformError>;

    /// Fully joined booking.
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, PlatformError>;

    async fn update_booking_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<Option<BookingUpdate>, PlatformError>;

    async fn assign_detailer_to_booking(
        &self,
        id: BookingId,
        detailer_id: DetailerId,
    ) -> Result<Option<BookingUpdate>, PlatformError>;

    async fn accept_booking(&self, id: BookingId) -> Result<Option<BookingUpdate>, PlatformError>;

    /// Test-only shortcut that bypasses the status state machine.
    async fn mark_booking_paid_for_testing(
        &self,
        id: BookingId,
    ) -> Result<Option<BookingUpdate>, PlatformError>;

    async fn check_detailer_availability_in_radius(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<AvailableDetailer>, PlatformError>;
}

/// Profiles, detailers and organization membership.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, PlatformError>;

    async fn list_profiles(&self, role: Option<UserRole>) -> Result<Vec<Profile>, PlatformError>;

    async fn update_profile_role(
        &self,
        id: ProfileId,
        role: UserRole,
    ) -> Result<Option<Profile>, PlatformError>;

    async fn get_detailer(&self, id: DetailerId) -> Result<Option<DetailerRecord>, PlatformError>;

    async fn get_detailer_by_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<DetailerRecord>, PlatformError>;

    async fn get_user_organization(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<Organization>, PlatformError>;

    async fn get_user_role_in_organization(
        &self,
        profile_id: ProfileId,
        organization_id: OrganizationId,
    ) -> Result<Option<OrgRole>, PlatformError>;

    async fn get_organization_members(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<OrganizationMember>, PlatformError>;

    async fn update_member_role(
        &self,
        organization_id: OrganizationId,
        profile_id: ProfileId,
        role: OrgRole,
    ) -> Result<Option<OrganizationMember>, PlatformError>;

    /// `true` if a membership was removed.
    async fn remove_organization_member(
        &self,
        organization_id: OrganizationId,
        profile_id: ProfileId,
    ) -> Result<bool, PlatformError>;
}

/// Fee configuration, payouts and refunds.
#[async_trait]
pub trait FinanceStore: Send + Sync {
    async fn get_platform_fee_percentage(&self) -> Result<Percentage, PlatformError>;

    async fn get_subscription_fee_percentage(&self) -> Result<Percentage, PlatformError>;

    async fn get_all_payouts(&self, page: Page) -> Result<Vec<PayoutBatch>, PlatformError>;

    async fn get_pending_refunds(&self, page: Page) -> Result<Vec<RefundRequest>, PlatformError>;

    async fn process_refund_request(
        &self,
        id: RefundId,
        decision: &RefundDecision,
        processed_by: ProfileId,
    ) -> Result<Option<RefundRequest>, PlatformError>;
}
