//! In-memory platform for dev/tests.
//!
//! Mirrors the observable contract of the remote procedures closely enough to
//! exercise the service layer: terminal bookings refuse transitions, only
//! offered bookings can be accepted, refunds are processed once. Individual
//! procedures can be made to fail, and every call is counted.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use detailr_auth::{OrgRole, UserRole};
use detailr_core::{BookingId, DetailerId, OrganizationId, Percentage, ProfileId, RefundId};
use detailr_marketplace::{
    AvailabilityQuery, AvailableDetailer, Booking, BookingFilters, BookingStatus, DetailerRecord,
    Organization, OrganizationMember, PaymentStatus, PayoutBatch, Profile, RefundDecision,
    RefundRequest, RefundStatus,
};

use super::procedures as p;
use super::{BookingStore, BookingUpdate, DirectoryStore, FinanceStore, Page};
use crate::error::PlatformError;

#[derive(Debug, Default)]
struct State {
    bookings: HashMap<BookingId, Booking>,
    profiles: HashMap<ProfileId, Profile>,
    detailers: HashMap<DetailerId, DetailerRecord>,
    organizations: HashMap<OrganizationId, Organization>,
    members: Vec<OrganizationMember>,
    available: Vec<AvailableDetailer>,
    payouts: Vec<PayoutBatch>,
    refunds: HashMap<RefundId, RefundRequest>,
    platform_fee: Option<Percentage>,
    subscription_fee: Option<Percentage>,
}

#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    state: RwLock<State>,
    failing: RwLock<HashSet<&'static str>>,
    calls: RwLock<HashMap<&'static str, usize>>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    // ── seeding ────────────────────────────────────────────────────────────

    pub fn insert_booking(&self, booking: Booking) {
        if let Ok(mut s) = self.state.write() {
            s.bookings.insert(booking.id, booking);
        }
    }

    pub fn insert_profile(&self, profile: Profile) {
        if let Ok(mut s) = self.state.write() {
            s.profiles.insert(profile.id, profile);
        }
    }

    pub fn insert_detailer(&self, detailer: DetailerRecord) {
        if let Ok(mut s) = self.state.write() {
            s.detailers.insert(detailer.id, detailer);
        }
    }

    pub fn insert_organization(&self, organization: Organization) {
        if let Ok(mut s) = self.state.write() {
            s.organizations.insert(organization.id, organization);
        }
    }

    pub fn insert_member(&self, member: OrganizationMember) {
        if let Ok(mut s) = self.state.write() {
            s.members
                .retain(|m| !(m.organization_id == member.organization_id && m.profile_id == member.profile_id));
            s.members.push(member);
        }
    }

    pub fn insert_available_detailer(&self, detailer: AvailableDetailer) {
        if let Ok(mut s) = self.state.write() {
            s.available.push(detailer);
        }
    }

    pub fn insert_payout(&self, payout: PayoutBatch) {
        if let Ok(mut s) = self.state.write() {
            s.payouts.push(payout);
        }
    }

    pub fn insert_refund(&self, refund: RefundRequest) {
        if let Ok(mut s) = self.state.write() {
            s.refunds.insert(refund.id, refund);
        }
    }

    /// Configure fee percentages. `None` makes the corresponding read fail.
    pub fn set_fee_percentages(&self, platform: Option<Percentage>, subscription: Option<Percentage>) {
        if let Ok(mut s) = self.state.write() {
            s.platform_fee = platform;
            s.subscription_fee = subscription;
        }
    }

    // ── fault injection / observation ──────────────────────────────────────

    /// Make every subsequent call to `procedure` fail.
    pub fn fail_procedure(&self, procedure: &'static str) {
        if let Ok(mut f) = self.failing.write() {
            f.insert(procedure);
        }
    }

    pub fn restore_procedure(&self, procedure: &'static str) {
        if let Ok(mut f) = self.failing.write() {
            f.remove(procedure);
        }
    }

    /// Number of times `procedure` has been invoked.
    pub fn calls(&self, procedure: &'static str) -> usize {
        self.calls
            .read()
            .map(|c| c.get(procedure).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn booking(&self, id: BookingId) -> Option<Booking> {
        self.state.read().ok()?.bookings.get(&id).cloned()
    }

    fn enter(&self, procedure: &'static str) -> Result<(), PlatformError> {
        if let Ok(mut c) = self.calls.write() {
            *c.entry(procedure).or_insert(0) += 1;
        }
        let failing = self
            .failing
            .read()
            .map(|f| f.contains(procedure))
            .unwrap_or(false);
        if failing {
            return Err(PlatformError::remote(procedure, "injected failure"));
        }
        Ok(())
    }

    fn read(&self, procedure: &'static str) -> Result<RwLockReadGuard<'_, State>, PlatformError> {
        self.enter(procedure)?;
        self.state
            .read()
            .map_err(|_| PlatformError::remote(procedure, "state lock poisoned"))
    }

    fn write(&self, procedure: &'static str) -> Result<RwLockWriteGuard<'_, State>, PlatformError> {
        self.enter(procedure)?;
        self.state
            .write()
            .map_err(|_| PlatformError::remote(procedure, "state lock poisoned"))
    }
}

fn update_of(b: &Booking) -> BookingUpdate {
    BookingUpdate {
        booking_id: b.id,
        status: b.status,
        payment_status: b.payment_status,
        detailer_id: b.detailer_id,
    }
}

fn paginate<T>(rows: Vec<T>, page: Page) -> Vec<T> {
    rows.into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl BookingStore for InMemoryPlatform {
    async fn list_bookings(&self, filters: &BookingFilters) -> Result<Vec<Booking>, PlatformError> {
        let s = self.read(p::LIST_BOOKINGS)?;
        Ok(filters.apply(s.bookings.values().cloned().map(Booking::without_relations)))
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, PlatformError> {
        let s = self.read(p::GET_BOOKING)?;
        Ok(s.bookings.get(&id).cloned())
    }

    async fn update_booking_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<Option<BookingUpdate>, PlatformError> {
        let mut s = self.write(p::UPDATE_BOOKING_STATUS)?;
        let Some(b) = s.bookings.get_mut(&id) else {
            return Ok(None);
        };
        if b.status.is_terminal() {
            return Err(PlatformError::remote(
                p::UPDATE_BOOKING_STATUS,
                format!("cannot transition from terminal status {}", b.status),
            ));
        }
        b.status = status;
        Ok(Some(update_of(b)))
    }

    async fn assign_detailer_to_booking(
        &self,
        id: BookingId,
        detailer_id: DetailerId,
    ) -> Result<Option<BookingUpdate>, PlatformError> {
        let mut s = self.write(p::ASSIGN_DETAILER_TO_BOOKING)?;
        if !s.detailers.contains_key(&detailer_id) {
            return Err(PlatformError::remote(p::ASSIGN_DETAILER_TO_BOOKING, "unknown detailer"));
        }
        let Some(b) = s.bookings.get_mut(&id) else {
            return Ok(None);
        };
        if b.status.is_terminal() {
            return Err(PlatformError::remote(
                p::ASSIGN_DETAILER_TO_BOOKING,
                format!("cannot assign a {} booking", b.status),
            ));
        }
        b.detailer_id = Some(detailer_id);
        Ok(Some(update_of(b)))
    }

    async fn accept_booking(&self, id: BookingId) -> Result<Option<BookingUpdate>, PlatformError> {
        let mut s = self.write(p::ACCEPT_BOOKING)?;
        let Some(b) = s.bookings.get_mut(&id) else {
            return Ok(None);
        };
        if b.status != BookingStatus::Offered {
            return Err(PlatformError::remote(
                p::ACCEPT_BOOKING,
                format!("only offered bookings can be accepted (was {})", b.status),
            ));
        }
        b.status = BookingStatus::Accepted;
        Ok(Some(update_of(b)))
    }

    async fn mark_booking_paid_for_testing(
        &self,
        id: BookingId,
    ) -> Result<Option<BookingUpdate>, PlatformError> {
        let mut s = self.write(p::MARK_BOOKING_PAID_FOR_TESTING)?;
        let Some(b) = s.bookings.get_mut(&id) else {
            return Ok(None);
        };
        b.status = BookingStatus::Paid;
        b.payment_status = PaymentStatus::Paid;
        Ok(Some(update_of(b)))
    }

    async fn check_detailer_availability_in_radius(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<AvailableDetailer>, PlatformError> {
        let s = self.read(p::CHECK_DETAILER_AVAILABILITY)?;
        let mut rows: Vec<AvailableDetailer> = s
            .available
            .iter()
            .filter(|d| !query.exclude_detailer_ids.contains(&d.detailer_id))
            .filter(|d| query.radius_miles.is_none_or(|r| d.distance_miles <= r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.distance_miles.total_cmp(&b.distance_miles));
        Ok(rows)
    }
}

#[async_trait]
impl DirectoryStore for InMemoryPlatform {
    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, PlatformError> {
        let s = self.read(p::GET_PROFILE)?;
        Ok(s.profiles.get(&id).cloned())
    }

    async fn list_profiles(&self, role: Option<UserRole>) -> Result<Vec<Profile>, PlatformError> {
        let s = self.read(p::LIST_PROFILES)?;
        let mut rows: Vec<Profile> = s
            .profiles
            .values()
            .filter(|pr| role.is_none_or(|r| pr.role == r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.email.cmp(&b.email)));
        Ok(rows)
    }

    async fn update_profile_role(
        &self,
        id: ProfileId,
        role: UserRole,
    ) -> Result<Option<Profile>, PlatformError> {
        let mut s = self.write(p::UPDATE_PROFILE_ROLE)?;
        Ok(s.profiles.get_mut(&id).map(|pr| {
            pr.role = role;
            pr.clone()
        }))
    }

    async fn get_detailer(&self, id: DetailerId) -> Result<Option<DetailerRecord>, PlatformError> {
        let s = self.read(p::GET_DETAILER)?;
        Ok(s.detailers.get(&id).cloned())
    }

    async fn get_detailer_by_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<DetailerRecord>, PlatformError> {
        let s = self.read(p::GET_DETAILER_BY_PROFILE)?;
        Ok(s.detailers.values().find(|d| d.profile_id == profile_id).cloned())
    }

    async fn get_user_organization(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<Organization>, PlatformError> {
        let s = self.read(p::GET_USER_ORGANIZATION)?;
        Ok(s.members
            .iter()
            .find(|m| m.profile_id == profile_id)
            .and_then(|m| s.organizations.get(&m.organization_id))
            .cloned())
    }

    async fn get_user_role_in_organization(
        &self,
        profile_id: ProfileId,
        organization_id: OrganizationId,
    ) -> Result<Option<OrgRole>, PlatformError> {
        let s = self.read(p::GET_USER_ROLE_IN_ORGANIZATION)?;
        Ok(s.members
            .iter()
            .find(|m| m.profile_id == profile_id && m.organization_id == organization_id)
            .map(|m| m.role))
    }

    async fn get_organization_members(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<OrganizationMember>, PlatformError> {
        let s = self.read(p::GET_ORGANIZATION_MEMBERS)?;
        let mut rows: Vec<OrganizationMember> = s
            .members
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(rows)
    }

    async fn update_member_role(
        &self,
        organization_id: OrganizationId,
        profile_id: ProfileId,
        role: OrgRole,
    ) -> Result<Option<OrganizationMember>, PlatformError> {
        let mut s = self.write(p::UPDATE_MEMBER_ROLE)?;
        Ok(s.members
            .iter_mut()
            .find(|m| m.profile_id == profile_id && m.organization_id == organization_id)
            .map(|m| {
                m.role = role;
                m.clone()
            }))
    }

    async fn remove_organization_member(
        &self,
        organization_id: OrganizationId,
        profile_id: ProfileId,
    ) -> Result<bool, PlatformError> {
        let mut s = self.write(p::REMOVE_ORGANIZATION_MEMBER)?;
        let before = s.members.len();
        s.members
            .retain(|m| !(m.profile_id == profile_id && m.organization_id == organization_id));
        let removed = s.members.len() != before;
        if removed {
            for d in s.detailers.values_mut() {
                if d.profile_id == profile_id && d.organization_id == Some(organization_id) {
                    d.organization_id = None;
                }
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl FinanceStore for InMemoryPlatform {
    async fn get_platform_fee_percentage(&self) -> Result<Percentage, PlatformError> {
        let s = self.read(p::GET_PLATFORM_FEE_PERCENTAGE)?;
        s.platform_fee
            .ok_or_else(|| PlatformError::remote(p::GET_PLATFORM_FEE_PERCENTAGE, "setting not configured"))
    }

    async fn get_subscription_fee_percentage(&self) -> Result<Percentage, PlatformError> {
        let s = self.read(p::GET_SUBSCRIPTION_FEE_PERCENTAGE)?;
        s.subscription_fee
            .ok_or_else(|| PlatformError::remote(p::GET_SUBSCRIPTION_FEE_PERCENTAGE, "setting not configured"))
    }

    async fn get_all_payouts(&self, page: Page) -> Result<Vec<PayoutBatch>, PlatformError> {
        let s = self.read(p::GET_ALL_PAYOUTS)?;
        let mut rows = s.payouts.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }

    async fn get_pending_refunds(&self, page: Page) -> Result<Vec<RefundRequest>, PlatformError> {
        let s = self.read(p::GET_PENDING_REFUNDS)?;
        let mut rows: Vec<RefundRequest> = s
            .refunds
            .values()
            .filter(|r| r.status == RefundStatus::Pending)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(paginate(rows, page))
    }

    async fn process_refund_request(
        &self,
        id: RefundId,
        decision: &RefundDecision,
        _processed_by: ProfileId,
    ) -> Result<Option<RefundRequest>, PlatformError> {
        let mut s = self.write(p::PROCESS_REFUND_REQUEST)?;
        let Some(refund) = s.refunds.get_mut(&id) else {
            return Ok(None);
        };
        if refund.status != RefundStatus::Pending {
            return Err(PlatformError::remote(p::PROCESS_REFUND_REQUEST, "refund already processed"));
        }
        refund.status = decision.resulting_status();
        let refund = refund.clone();

        if refund.status == RefundStatus::Approved {
            if let Some(b) = s.bookings.get_mut(&refund.booking_id) {
                b.payment_status = PaymentStatus::Refunded;
            }
        }
        Ok(Some(refund))
    }
}
