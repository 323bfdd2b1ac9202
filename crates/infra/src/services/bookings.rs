//! Booking queries and the named booking commands.
//!
//! Commands are thin wrappers over remote procedures: the platform decides
//! whether a transition is legal and callers decide whether the actor may ask
//! for it. Every command fails the same way, with `CommandFailed`, whether
//! the procedure errored or returned nothing.

use std::sync::Arc;

use tracing::{debug, info, warn};

use detailr_core::{BookingId, DetailerId};
use detailr_marketplace::{AvailabilityQuery, AvailableDetailer, Booking, BookingFilters, BookingStatus};

use crate::error::{PlatformError, ServiceError};
use crate::idempotency::{IdempotencyWindow, Lookup, RequestKey};
use crate::platform::{BookingStore, BookingUpdate, procedures as p};

pub struct BookingService {
    store: Arc<dyn BookingStore>,
    replays: IdempotencyWindow<BookingUpdate>,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self::with_window(store, IdempotencyWindow::default())
    }

    pub fn with_window(store: Arc<dyn BookingStore>, replays: IdempotencyWindow<BookingUpdate>) -> Self {
        Self { store, replays }
    }

    /// At most `filters.effective_limit()` bookings, never an error for "no rows".
    pub async fn list_bookings(&self, filters: &BookingFilters) -> Result<Vec<Booking>, ServiceError> {
        let mut rows = self.store.list_bookings(filters).await?;
        rows.truncate(filters.effective_limit());
        debug!(count = rows.len(), "listed bookings");
        Ok(rows)
    }

    pub async fn get_booking_by_id(&self, id: BookingId) -> Result<Booking, ServiceError> {
        match self.store.get_booking(id).await {
            Ok(Some(booking)) => Ok(booking),
            Ok(None) => {
                debug!(booking_id = %id, "booking not found");
                Err(ServiceError::NotFoundOrInaccessible)
            }
            Err(err) => {
                warn!(booking_id = %id, error = %err, "booking read failed, reporting as not found");
                Err(ServiceError::NotFoundOrInaccessible)
            }
        }
    }

    pub async fn update_status(
        &self,
        id: BookingId,
        status: BookingStatus,
        request: Option<RequestKey<'_>>,
    ) -> Result<BookingUpdate, ServiceError> {
        self.run(p::UPDATE_BOOKING_STATUS, id, request, status.as_str(), || {
            self.store.update_booking_status(id, status)
        })
        .await
    }

    /// Caller must have authorized the assignment for this booking first.
    pub async fn assign_detailer(
        &self,
        id: BookingId,
        detailer_id: DetailerId,
        request: Option<RequestKey<'_>>,
    ) -> Result<BookingUpdate, ServiceError> {
        let fingerprint = detailer_id.to_string();
        self.run(p::ASSIGN_DETAILER_TO_BOOKING, id, request, &fingerprint, || {
            self.store.assign_detailer_to_booking(id, detailer_id)
        })
        .await
    }

    pub async fn accept_booking(
        &self,
        id: BookingId,
        request: Option<RequestKey<'_>>,
    ) -> Result<BookingUpdate, ServiceError> {
        self.run(p::ACCEPT_BOOKING, id, request, "", || self.store.accept_booking(id))
            .await
    }

    pub async fn cancel_booking(
        &self,
        id: BookingId,
        request: Option<RequestKey<'_>>,
    ) -> Result<BookingUpdate, ServiceError> {
        self.update_status(id, BookingStatus::Cancelled, request).await
    }

    /// Bypasses the status state machine. Only reachable behind the test-payment gate.
    pub async fn mark_paid_for_testing(&self, id: BookingId) -> Result<BookingUpdate, ServiceError> {
        warn!(booking_id = %id, "marking booking paid via test shortcut");
        self.run(p::MARK_BOOKING_PAID_FOR_TESTING, id, None, "", || {
            self.store.mark_booking_paid_for_testing(id)
        })
        .await
    }

    pub async fn check_availability(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<AvailableDetailer>, ServiceError> {
        query.validate()?;
        Ok(self.store.check_detailer_availability_in_radius(query).await?)
    }

    async fn run<F, Fut>(
        &self,
        command: &'static str,
        id: BookingId,
        request: Option<RequestKey<'_>>,
        fingerprint: &str,
        call: F,
    ) -> Result<BookingUpdate, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Option<BookingUpdate>, PlatformError>>,
    {
        let replay_key = request.map(|r| IdempotencyWindow::<BookingUpdate>::key(command, id, r));
        if let Some(key) = replay_key.as_deref() {
            match self.replays.lookup(key, fingerprint) {
                Lookup::Replay(previous) => {
                    info!(command, booking_id = %id, "replaying idempotent command result");
                    return Ok(previous);
                }
                Lookup::Conflict => {
                    warn!(command, booking_id = %id, "idempotency key reused with a different payload");
                    return Err(ServiceError::conflict(
                        "Idempotency-Key was already used for a different request",
                    ));
                }
                Lookup::Miss => {}
            }
        }

        let update = match call().await {
            Ok(Some(update)) => update,
            Ok(None) => {
                warn!(command, booking_id = %id, "command returned no result");
                return Err(ServiceError::command_failed(command, "no result returned"));
            }
            Err(err) => {
                warn!(command, booking_id = %id, error = %err, "command failed");
                return Err(ServiceError::command_failed(command, err.to_string()));
            }
        };

        info!(command, booking_id = %id, status = %update.status, "booking command applied");
        if let Some(key) = replay_key {
            self.replays.insert(key, fingerprint, update.clone());
        }
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use detailr_core::{Money, ProfileId};
    use detailr_marketplace::{DetailerRecord, PaymentStatus};

    use crate::platform::InMemoryPlatform;

    fn booking(status: BookingStatus, day: u32, start: Option<(u32, u32)>) -> Booking {
        Booking {
            id: BookingId::new(),
            receipt_id: None,
            status,
            payment_status: PaymentStatus::Unpaid,
            scheduled_date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            scheduled_time_start: start.map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap()),
            scheduled_time_end: None,
            scheduled_start: None,
            scheduled_end: None,
            total_amount: Money::from_cents(10_000),
            service_price: Money::from_cents(10_000),
            addons_total: Money::ZERO,
            tax_amount: Money::ZERO,
            customer_id: ProfileId::new(),
            service_id: None,
            car_id: None,
            detailer_id: None,
            organization_id: None,
            team_id: None,
            address: None,
            created_at: Utc::now(),
            service: None,
            car: None,
            customer: None,
            detailer: None,
            team: None,
        }
    }

    fn setup() -> (Arc<InMemoryPlatform>, BookingService) {
        let platform = Arc::new(InMemoryPlatform::new());
        let service = BookingService::new(platform.clone());
        (platform, service)
    }

    #[tokio::test]
    async fn list_matches_any_of_several_statuses_and_orders_by_date_then_start() {
        let (platform, svc) = setup();
        let late = booking(BookingStatus::Paid, 2, Some((14, 0)));
        let early = booking(BookingStatus::Offered, 2, Some((9, 0)));
        let untimed = booking(BookingStatus::Paid, 2, None);
        let first_day = booking(BookingStatus::Paid, 1, Some((18, 0)));
        let excluded = booking(BookingStatus::Completed, 1, Some((8, 0)));
        for b in [&late, &early, &untimed, &first_day, &excluded] {
            platform.insert_booking(b.clone());
        }

        let filters = BookingFilters::default().with_statuses([BookingStatus::Paid, BookingStatus::Offered]);
        let ids: Vec<_> = svc.list_bookings(&filters).await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![first_day.id, early.id, late.id, untimed.id]);
    }

    #[tokio::test]
    async fn list_never_exceeds_limit_and_is_empty_not_error() {
        let (platform, svc) = setup();
        for day in 1..=5 {
            platform.insert_booking(booking(BookingStatus::Paid, day, None));
        }
        let rows = svc.list_bookings(&BookingFilters::default().limit(3)).await.unwrap();
        assert_eq!(rows.len(), 3);

        let none = svc
            .list_bookings(&BookingFilters::default().with_status(BookingStatus::NoShow))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn get_by_id_collapses_missing_and_failed_reads() {
        let (platform, svc) = setup();
        let b = booking(BookingStatus::Paid, 1, None);
        platform.insert_booking(b.clone());

        assert_eq!(svc.get_booking_by_id(b.id).await.unwrap().id, b.id);
        assert_eq!(
            svc.get_booking_by_id(BookingId::new()).await,
            Err(ServiceError::NotFoundOrInaccessible)
        );

        platform.fail_procedure(p::GET_BOOKING);
        assert_eq!(svc.get_booking_by_id(b.id).await, Err(ServiceError::NotFoundOrInaccessible));
    }

    #[tokio::test]
    async fn cancel_is_update_status_to_cancelled() {
        let (platform, svc) = setup();
        let b = booking(BookingStatus::Accepted, 1, None);
        platform.insert_booking(b.clone());

        let update = svc.cancel_booking(b.id, None).await.unwrap();
        assert_eq!(update.status, BookingStatus::Cancelled);
        assert_eq!(platform.calls(p::UPDATE_BOOKING_STATUS), 1);
        assert_eq!(platform.booking(b.id).unwrap().status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn commands_fail_uniformly() {
        let (platform, svc) = setup();
        let done = booking(BookingStatus::Completed, 1, None);
        platform.insert_booking(done.clone());

        // Procedure rejects the transition.
        assert!(matches!(
            svc.update_status(done.id, BookingStatus::InProgress, None).await,
            Err(ServiceError::CommandFailed { command: p::UPDATE_BOOKING_STATUS, .. })
        ));
        // Procedure returns no row.
        assert!(matches!(
            svc.accept_booking(BookingId::new(), None).await,
            Err(ServiceError::CommandFailed { command: p::ACCEPT_BOOKING, .. })
        ));
        // Transport failure.
        platform.fail_procedure(p::ASSIGN_DETAILER_TO_BOOKING);
        assert!(matches!(
            svc.assign_detailer(done.id, DetailerId::new(), None).await,
            Err(ServiceError::CommandFailed { command: p::ASSIGN_DETAILER_TO_BOOKING, .. })
        ));
    }

    #[tokio::test]
    async fn accept_and_assign_delegate_to_procedures() {
        let (platform, svc) = setup();
        let offered = booking(BookingStatus::Offered, 1, None);
        platform.insert_booking(offered.clone());
        let detailer = DetailerRecord {
            id: DetailerId::new(),
            profile_id: ProfileId::new(),
            organization_id: None,
            pricing_model: None,
            is_active: true,
        };
        platform.insert_detailer(detailer.clone());

        let assigned = svc.assign_detailer(offered.id, detailer.id, None).await.unwrap();
        assert_eq!(assigned.detailer_id, Some(detailer.id));
        assert_eq!(assigned.status, BookingStatus::Offered);

        let accepted = svc.accept_booking(offered.id, None).await.unwrap();
        assert_eq!(accepted.status, BookingStatus::Accepted);
    }

    #[tokio::test]
    async fn repeated_idempotency_key_replays_without_second_call() {
        let (platform, svc) = setup();
        let offered = booking(BookingStatus::Offered, 1, None);
        platform.insert_booking(offered.clone());

        let actor = ProfileId::new();
        let key = Some(RequestKey::new(actor, "key-1"));

        let first = svc.accept_booking(offered.id, key).await.unwrap();
        let second = svc.accept_booking(offered.id, key).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(platform.calls(p::ACCEPT_BOOKING), 1);

        // A different key is a different request and hits the procedure.
        assert!(svc.accept_booking(offered.id, Some(RequestKey::new(actor, "key-2"))).await.is_err());
        assert_eq!(platform.calls(p::ACCEPT_BOOKING), 2);
    }

    fn solo_detailer(platform: &InMemoryPlatform) -> DetailerId {
        let id = DetailerId::new();
        platform.insert_detailer(DetailerRecord {
            id,
            profile_id: ProfileId::new(),
            organization_id: None,
            pricing_model: None,
            is_active: true,
        });
        id
    }

    #[tokio::test]
    async fn reused_key_with_different_payload_is_a_conflict() {
        let (platform, svc) = setup();
        let b = booking(BookingStatus::Paid, 1, None);
        platform.insert_booking(b.clone());
        let (d1, d2) = (solo_detailer(&platform), solo_detailer(&platform));
        let key = Some(RequestKey::new(ProfileId::new(), "k"));

        let first = svc.assign_detailer(b.id, d1, key).await.unwrap();
        assert_eq!(first.detailer_id, Some(d1));

        assert!(matches!(
            svc.assign_detailer(b.id, d2, key).await,
            Err(ServiceError::Conflict(_))
        ));
        assert_eq!(platform.calls(p::ASSIGN_DETAILER_TO_BOOKING), 1);
        assert_eq!(platform.booking(b.id).unwrap().detailer_id, Some(d1));

        // Same for status changes under one key.
        let status_key = Some(RequestKey::new(ProfileId::new(), "s"));
        svc.update_status(b.id, BookingStatus::InProgress, status_key).await.unwrap();
        assert!(matches!(
            svc.update_status(b.id, BookingStatus::Cancelled, status_key).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn another_actor_reusing_a_key_is_not_replayed() {
        let (platform, svc) = setup();
        let offered = booking(BookingStatus::Offered, 1, None);
        platform.insert_booking(offered.clone());

        svc.accept_booking(offered.id, Some(RequestKey::new(ProfileId::new(), "same")))
            .await
            .unwrap();
        // The second actor's request reaches the procedure, which refuses a second accept.
        assert!(matches!(
            svc.accept_booking(offered.id, Some(RequestKey::new(ProfileId::new(), "same"))).await,
            Err(ServiceError::CommandFailed { .. })
        ));
        assert_eq!(platform.calls(p::ACCEPT_BOOKING), 2);
    }

    #[tokio::test]
    async fn mark_paid_for_testing_sets_both_statuses() {
        let (platform, svc) = setup();
        let b = booking(BookingStatus::RequiresPayment, 1, None);
        platform.insert_booking(b.clone());

        let update = svc.mark_paid_for_testing(b.id).await.unwrap();
        assert_eq!(update.status, BookingStatus::Paid);
        assert_eq!(update.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn availability_is_validated_before_the_remote_call() {
        let (platform, svc) = setup();
        let query = AvailabilityQuery {
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            time_start: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            time_end: None,
            lat: 123.0,
            lng: 0.0,
            radius_miles: None,
            exclude_detailer_ids: vec![],
        };
        assert!(matches!(svc.check_availability(&query).await, Err(ServiceError::Validation(_))));
        assert_eq!(platform.calls(p::CHECK_DETAILER_AVAILABILITY), 0);
    }
}
