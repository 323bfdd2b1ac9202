//! Postgres-backed platform.
//!
//! Booking commands, membership and finance operations are stored procedures
//! owned by the platform; they are invoked as set-returning functions and
//! their rows parsed here. Enum-typed columns are read as `::text` and parsed
//! with the domain `FromStr` impls; numeric money columns are read as integer
//! cents.
//!
//! ## Error Mapping
//!
//! | Failure | PlatformError |
//! |---------|---------------|
//! | Database / pool / IO error | `Remote` |
//! | Column missing, wrong type, unknown enum value, NULL scalar | `ContractViolation` |

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;
use uuid::Uuid;

use detailr_auth::{OrgRole, UserRole};
use detailr_core::{
    BookingId, CarId, DetailerId, Money, OrganizationId, Percentage, PayoutId, ProfileId, RefundId,
    ServiceId, TeamId,
};
use detailr_marketplace::{
    AvailabilityQuery, AvailableDetailer, Booking, BookingFilters, BookingOrder, BookingStatus,
    CarSummary, CustomerSummary, DetailerRecord, DetailerSummary, Organization, OrganizationMember,
    PayoutBatch, Profile, RefundDecision, RefundRequest, ServiceSummary, TeamSummary,
};

use super::procedures as p;
use super::{BookingStore, BookingUpdate, DirectoryStore, FinanceStore, Page};
use crate::error::PlatformError;

const BOOKING_COLUMNS: &str = r#"
    b.id, b.receipt_id, b.status::text AS status, b.payment_status::text AS payment_status,
    b.scheduled_date, b.scheduled_time_start, b.scheduled_time_end,
    b.scheduled_start, b.scheduled_end,
    ROUND(b.total_amount * 100)::bigint AS total_cents,
    ROUND(COALESCE(b.service_price, 0) * 100)::bigint AS service_price_cents,
    ROUND(COALESCE(b.addons_total, 0) * 100)::bigint AS addons_total_cents,
    ROUND(COALESCE(b.tax_amount, 0) * 100)::bigint AS tax_cents,
    b.customer_id, b.service_id, b.car_id, b.detailer_id, b.organization_id, b.team_id,
    b.address, b.created_at
"#;

const UPDATE_COLUMNS: &str =
    "r.booking_id, r.status::text AS status, r.payment_status::text AS payment_status, r.detailer_id";

const PAYOUT_COLUMNS: &str = r#"
    r.id, r.detailer_id, r.period_start, r.period_end,
    ROUND(r.amount * 100)::bigint AS amount_cents, r.booking_count::bigint AS booking_count,
    r.transfer_status::text AS transfer_status, r.external_payout_id, r.created_at
"#;

const REFUND_COLUMNS: &str = r#"
    r.id, r.booking_id, r.requested_by, ROUND(r.amount * 100)::bigint AS amount_cents,
    r.reason, r.status::text AS status, r.created_at
"#;

const MEMBER_COLUMNS: &str = r#"
    r.organization_id, r.profile_id, r.detailer_id, r.role::text AS role,
    r.full_name, r.email, r.joined_at
"#;

const DETAILER_COLUMNS: &str =
    "r.id, r.profile_id, r.organization_id, r.pricing_model::text AS pricing_model, r.is_active";

/// Platform client over a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgPlatform {
    pool: Arc<PgPool>,
}

impl PgPlatform {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn fetch_update(
        &self,
        procedure: &'static str,
        sql: &str,
        id: BookingId,
        arg: Option<Uuid>,
        text_arg: Option<&str>,
    ) -> Result<Option<BookingUpdate>, PlatformError> {
        let mut query = sqlx::query(sql).bind(*id.as_uuid());
        if let Some(arg) = arg {
            query = query.bind(arg);
        }
        if let Some(arg) = text_arg {
            query = query.bind(arg);
        }
        let row = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(procedure, e))?;
        row.map(|r| update_from_row(procedure, &r)).transpose()
    }
}

#[async_trait]
impl BookingStore for PgPlatform {
    #[instrument(skip(self), err)]
    async fn list_bookings(&self, filters: &BookingFilters) -> Result<Vec<Booking>, PlatformError> {
        let order_column = match filters.order_by {
            BookingOrder::ScheduledDate => "b.scheduled_date",
            BookingOrder::CreatedAt => "b.created_at",
        };
        let direction = if filters.ascending { "ASC" } else { "DESC" };
        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings b
            WHERE (cardinality($1::text[]) = 0 OR b.status::text = ANY($1))
                AND ($2::uuid IS NULL OR b.detailer_id = $2)
                AND ($3::uuid IS NULL OR b.organization_id = $3)
                AND ($4::date IS NULL OR b.scheduled_date >= $4)
                AND ($5::date IS NULL OR b.scheduled_date <= $5)
            ORDER BY {order_column} {direction}, b.scheduled_time_start ASC NULLS LAST
            LIMIT $6
            "#
        );
        let statuses: Vec<String> = filters.statuses.iter().map(|s| s.as_str().to_string()).collect();

        let rows = sqlx::query(&sql)
            .bind(statuses)
            .bind(filters.detailer_id.map(|d| *d.as_uuid()))
            .bind(filters.organization_id.map(|o| *o.as_uuid()))
            .bind(filters.from_date)
            .bind(filters.to_date)
            .bind(i64::try_from(filters.effective_limit()).unwrap_or(i64::MAX))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(p::LIST_BOOKINGS, e))?;

        rows.iter().map(|r| booking_from_row(p::LIST_BOOKINGS, r)).collect()
    }

    #[instrument(skip(self), err)]
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, PlatformError> {
        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS},
                s.name AS service_name, s.duration_minutes AS service_duration,
                c.make AS car_make, c.model AS car_model, c.year AS car_year,
                c.license_plate AS car_plate,
                cu.full_name AS customer_name, cu.email AS customer_email, cu.phone AS customer_phone,
                d.profile_id AS detailer_profile_id, dp.full_name AS detailer_name,
                t.name AS team_name
            FROM bookings b
            LEFT JOIN services s ON s.id = b.service_id
            LEFT JOIN cars c ON c.id = b.car_id
            LEFT JOIN profiles cu ON cu.id = b.customer_id
            LEFT JOIN detailers d ON d.id = b.detailer_id
            LEFT JOIN profiles dp ON dp.id = d.profile_id
            LEFT JOIN teams t ON t.id = b.team_id
            WHERE b.id = $1
            "#
        );
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(p::GET_BOOKING, e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut booking = booking_from_row(p::GET_BOOKING, &row)?;
        attach_relations(&mut booking, &row)?;
        Ok(Some(booking))
    }

    #[instrument(skip(self), err)]
    async fn update_booking_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<Option<BookingUpdate>, PlatformError> {
        let sql = format!("SELECT {UPDATE_COLUMNS} FROM update_booking_status($1, $2) r");
        self.fetch_update(p::UPDATE_BOOKING_STATUS, &sql, id, None, Some(status.as_str()))
            .await
    }

    #[instrument(skip(self), err)]
    async fn assign_detailer_to_booking(
        &self,
        id: BookingId,
        detailer_id: DetailerId,
    ) -> Result<Option<BookingUpdate>, PlatformError> {
        let sql = format!("SELECT {UPDATE_COLUMNS} FROM assign_detailer_to_booking($1, $2) r");
        self.fetch_update(
            p::ASSIGN_DETAILER_TO_BOOKING,
            &sql,
            id,
            Some(*detailer_id.as_uuid()),
            None,
        )
        .await
    }

    #[instrument(skip(self), err)]
    async fn accept_booking(&self, id: BookingId) -> Result<Option<BookingUpdate>, PlatformError> {
        let sql = format!("SELECT {UPDATE_COLUMNS} FROM accept_booking($1) r");
        self.fetch_update(p::ACCEPT_BOOKING, &sql, id, None, None).await
    }

    #[instrument(skip(self), err)]
    async fn mark_booking_paid_for_testing(
        &self,
        id: BookingId,
    ) -> Result<Option<BookingUpdate>, PlatformError> {
        let sql = format!("SELECT {UPDATE_COLUMNS} FROM mark_booking_paid_for_testing($1) r");
        self.fetch_update(p::MARK_BOOKING_PAID_FOR_TESTING, &sql, id, None, None)
            .await
    }

    #[instrument(skip(self), err)]
    async fn check_detailer_availability_in_radius(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<AvailableDetailer>, PlatformError> {
        const PROC: &str = p::CHECK_DETAILER_AVAILABILITY;
        let excluded: Vec<Uuid> = query.exclude_detailer_ids.iter().map(|d| *d.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT r.detailer_id, r.full_name, r.organization_id,
                r.distance_miles::float8 AS distance_miles
            FROM check_detailer_availability_in_radius($1, $2, $3, $4, $5, $6, $7) r
            ORDER BY r.distance_miles ASC
            "#,
        )
        .bind(query.date)
        .bind(query.time_start)
        .bind(query.time_end)
        .bind(query.lat)
        .bind(query.lng)
        .bind(query.radius_miles)
        .bind(excluded)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(PROC, e))?;

        rows.iter()
            .map(|r| {
                Ok(AvailableDetailer {
                    detailer_id: DetailerId::from_uuid(col(PROC, r, "detailer_id")?),
                    full_name: col(PROC, r, "full_name")?,
                    organization_id: col::<Option<Uuid>>(PROC, r, "organization_id")?
                        .map(OrganizationId::from_uuid),
                    distance_miles: col(PROC, r, "distance_miles")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl DirectoryStore for PgPlatform {
    #[instrument(skip(self), err)]
    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, PlatformError> {
        let row = sqlx::query(
            "SELECT id, email, full_name, role::text AS role, created_at FROM profiles WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(p::GET_PROFILE, e))?;
        row.map(|r| profile_from_row(p::GET_PROFILE, &r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_profiles(&self, role: Option<UserRole>) -> Result<Vec<Profile>, PlatformError> {
        let rows = sqlx::query(
            r#"
            SELECT id, email, full_name, role::text AS role, created_at
            FROM profiles
            WHERE ($1::text IS NULL OR role::text = $1)
            ORDER BY created_at DESC, email ASC
            "#,
        )
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(p::LIST_PROFILES, e))?;
        rows.iter().map(|r| profile_from_row(p::LIST_PROFILES, r)).collect()
    }

    #[instrument(skip(self), err)]
    async fn update_profile_role(
        &self,
        id: ProfileId,
        role: UserRole,
    ) -> Result<Option<Profile>, PlatformError> {
        let row = sqlx::query(
            r#"
            UPDATE profiles SET role = $2::text::user_role, updated_at = now()
            WHERE id = $1
            RETURNING id, email, full_name, role::text AS role, created_at
            "#,
        )
        .bind(*id.as_uuid())
        .bind(role.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(p::UPDATE_PROFILE_ROLE, e))?;
        row.map(|r| profile_from_row(p::UPDATE_PROFILE_ROLE, &r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn get_detailer(&self, id: DetailerId) -> Result<Option<DetailerRecord>, PlatformError> {
        let sql = format!("SELECT {DETAILER_COLUMNS} FROM detailers r WHERE r.id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(p::GET_DETAILER, e))?;
        row.map(|r| detailer_from_row(p::GET_DETAILER, &r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn get_detailer_by_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<DetailerRecord>, PlatformError> {
        let sql = format!("SELECT {DETAILER_COLUMNS} FROM get_detailer_by_profile($1) r");
        let row = sqlx::query(&sql)
            .bind(*profile_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(p::GET_DETAILER_BY_PROFILE, e))?;
        row.map(|r| detailer_from_row(p::GET_DETAILER_BY_PROFILE, &r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn get_user_organization(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<Organization>, PlatformError> {
        const PROC: &str = p::GET_USER_ORGANIZATION;
        let row = sqlx::query("SELECT r.id, r.name, r.slug, r.owner_profile_id FROM get_user_organization($1) r")
            .bind(*profile_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(PROC, e))?;
        row.map(|r| {
            Ok(Organization {
                id: OrganizationId::from_uuid(col(PROC, &r, "id")?),
                name: col(PROC, &r, "name")?,
                slug: col(PROC, &r, "slug")?,
                owner_profile_id: col::<Option<Uuid>>(PROC, &r, "owner_profile_id")?
                    .map(ProfileId::from_uuid),
            })
        })
        .transpose()
    }

    #[instrument(skip(self), err)]
    async fn get_user_role_in_organization(
        &self,
        profile_id: ProfileId,
        organization_id: OrganizationId,
    ) -> Result<Option<OrgRole>, PlatformError> {
        const PROC: &str = p::GET_USER_ROLE_IN_ORGANIZATION;
        let row = sqlx::query("SELECT get_user_role_in_organization($1, $2)::text AS role")
            .bind(*profile_id.as_uuid())
            .bind(*organization_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(PROC, e))?;
        parsed_opt(PROC, &row, "role")
    }

    #[instrument(skip(self), err)]
    async fn get_organization_members(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<OrganizationMember>, PlatformError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM get_organization_members($1) r");
        let rows = sqlx::query(&sql)
            .bind(*organization_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(p::GET_ORGANIZATION_MEMBERS, e))?;
        rows.iter()
            .map(|r| member_from_row(p::GET_ORGANIZATION_MEMBERS, r))
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn update_member_role(
        &self,
        organization_id: OrganizationId,
        profile_id: ProfileId,
        role: OrgRole,
    ) -> Result<Option<OrganizationMember>, PlatformError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM update_member_role($1, $2, $3) r");
        let row = sqlx::query(&sql)
            .bind(*organization_id.as_uuid())
            .bind(*profile_id.as_uuid())
            .bind(role.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(p::UPDATE_MEMBER_ROLE, e))?;
        row.map(|r| member_from_row(p::UPDATE_MEMBER_ROLE, &r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn remove_organization_member(
        &self,
        organization_id: OrganizationId,
        profile_id: ProfileId,
    ) -> Result<bool, PlatformError> {
        const PROC: &str = p::REMOVE_ORGANIZATION_MEMBER;
        let row = sqlx::query("SELECT remove_organization_member($1, $2) AS removed")
            .bind(*organization_id.as_uuid())
            .bind(*profile_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(PROC, e))?;
        Ok(col::<Option<bool>>(PROC, &row, "removed")?.unwrap_or(false))
    }
}

#[async_trait]
impl FinanceStore for PgPlatform {
    #[instrument(skip(self), err)]
    async fn get_platform_fee_percentage(&self) -> Result<Percentage, PlatformError> {
        self.fetch_percentage(p::GET_PLATFORM_FEE_PERCENTAGE).await
    }

    #[instrument(skip(self), err)]
    async fn get_subscription_fee_percentage(&self) -> Result<Percentage, PlatformError> {
        self.fetch_percentage(p::GET_SUBSCRIPTION_FEE_PERCENTAGE).await
    }

    #[instrument(skip(self), err)]
    async fn get_all_payouts(&self, page: Page) -> Result<Vec<PayoutBatch>, PlatformError> {
        const PROC: &str = p::GET_ALL_PAYOUTS;
        let sql = format!("SELECT {PAYOUT_COLUMNS} FROM get_all_payouts($1, $2) r");
        let rows = sqlx::query(&sql)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(PROC, e))?;
        rows.iter()
            .map(|r| {
                Ok(PayoutBatch {
                    id: PayoutId::from_uuid(col(PROC, r, "id")?),
                    detailer_id: DetailerId::from_uuid(col(PROC, r, "detailer_id")?),
                    period_start: col(PROC, r, "period_start")?,
                    period_end: col(PROC, r, "period_end")?,
                    amount: money(PROC, r, "amount_cents")?,
                    booking_count: col(PROC, r, "booking_count")?,
                    transfer_status: parsed_opt(PROC, r, "transfer_status")?,
                    external_payout_id: col(PROC, r, "external_payout_id")?,
                    created_at: col(PROC, r, "created_at")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn get_pending_refunds(&self, page: Page) -> Result<Vec<RefundRequest>, PlatformError> {
        let sql = format!("SELECT {REFUND_COLUMNS} FROM get_pending_refunds($1, $2) r");
        let rows = sqlx::query(&sql)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(p::GET_PENDING_REFUNDS, e))?;
        rows.iter()
            .map(|r| refund_from_row(p::GET_PENDING_REFUNDS, r))
            .collect()
    }

    #[instrument(skip(self, decision), err)]
    async fn process_refund_request(
        &self,
        id: RefundId,
        decision: &RefundDecision,
        processed_by: ProfileId,
    ) -> Result<Option<RefundRequest>, PlatformError> {
        let sql = format!("SELECT {REFUND_COLUMNS} FROM process_refund_request($1, $2, $3, $4) r");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .bind(decision.approve)
            .bind(decision.notes.as_deref())
            .bind(*processed_by.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(p::PROCESS_REFUND_REQUEST, e))?;
        row.map(|r| refund_from_row(p::PROCESS_REFUND_REQUEST, &r)).transpose()
    }
}

impl PgPlatform {
    async fn fetch_percentage(&self, procedure: &'static str) -> Result<Percentage, PlatformError> {
        let sql = format!("SELECT ROUND({procedure}() * 100)::bigint AS basis_points");
        let row = sqlx::query(&sql)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(procedure, e))?;
        let bp: Option<i64> = col(procedure, &row, "basis_points")?;
        let bp = bp.ok_or_else(|| PlatformError::contract(procedure, "percentage is NULL"))?;
        let bp = u32::try_from(bp)
            .ok()
            .filter(|bp| *bp <= 10_000)
            .ok_or_else(|| PlatformError::contract(procedure, format!("percentage out of range: {bp} bp")))?;
        Ok(Percentage::from_basis_points(bp))
    }
}

// ── row decoding ───────────────────────────────────────────────────────────

fn col<'r, T>(procedure: &'static str, row: &'r PgRow, name: &str) -> Result<T, PlatformError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| PlatformError::contract(procedure, format!("column '{name}': {e}")))
}

fn parsed<T>(procedure: &'static str, row: &PgRow, name: &str) -> Result<T, PlatformError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = col(procedure, row, name)?;
    raw.parse()
        .map_err(|e: T::Err| PlatformError::contract(procedure, format!("column '{name}': {e}")))
}

fn parsed_opt<T>(procedure: &'static str, row: &PgRow, name: &str) -> Result<Option<T>, PlatformError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = col(procedure, row, name)?;
    raw.map(|raw| {
        raw.parse()
            .map_err(|e: T::Err| PlatformError::contract(procedure, format!("column '{name}': {e}")))
    })
    .transpose()
}

fn money(procedure: &'static str, row: &PgRow, name: &str) -> Result<Money, PlatformError> {
    Ok(Money::from_cents(col(procedure, row, name)?))
}

fn update_from_row(procedure: &'static str, r: &PgRow) -> Result<BookingUpdate, PlatformError> {
    Ok(BookingUpdate {
        booking_id: BookingId::from_uuid(col(procedure, r, "booking_id")?),
        status: parsed(procedure, r, "status")?,
        payment_status: parsed(procedure, r, "payment_status")?,
        detailer_id: col::<Option<Uuid>>(procedure, r, "detailer_id")?.map(DetailerId::from_uuid),
    })
}

fn booking_from_row(procedure: &'static str, r: &PgRow) -> Result<Booking, PlatformError> {
    Ok(Booking {
        id: BookingId::from_uuid(col(procedure, r, "id")?),
        receipt_id: col(procedure, r, "receipt_id")?,
        status: parsed(procedure, r, "status")?,
        payment_status: parsed(procedure, r, "payment_status")?,
        scheduled_date: col(procedure, r, "scheduled_date")?,
        scheduled_time_start: col(procedure, r, "scheduled_time_start")?,
        scheduled_time_end: col(procedure, r, "scheduled_time_end")?,
        scheduled_start: col(procedure, r, "scheduled_start")?,
        scheduled_end: col(procedure, r, "scheduled_end")?,
        total_amount: money(procedure, r, "total_cents")?,
        service_price: money(procedure, r, "service_price_cents")?,
        addons_total: money(procedure, r, "addons_total_cents")?,
        tax_amount: money(procedure, r, "tax_cents")?,
        customer_id: ProfileId::from_uuid(col(procedure, r, "customer_id")?),
        service_id: col::<Option<Uuid>>(procedure, r, "service_id")?.map(ServiceId::from_uuid),
        car_id: col::<Option<Uuid>>(procedure, r, "car_id")?.map(CarId::from_uuid),
        detailer_id: col::<Option<Uuid>>(procedure, r, "detailer_id")?.map(DetailerId::from_uuid),
        organization_id: col::<Option<Uuid>>(procedure, r, "organization_id")?
            .map(OrganizationId::from_uuid),
        team_id: col::<Option<Uuid>>(procedure, r, "team_id")?.map(TeamId::from_uuid),
        address: col(procedure, r, "address")?,
        created_at: col(procedure, r, "created_at")?,
        service: None,
        car: None,
        customer: None,
        detailer: None,
        team: None,
    })
}

fn attach_relations(b: &mut Booking, r: &PgRow) -> Result<(), PlatformError> {
    const PROC: &str = p::GET_BOOKING;

    if let (Some(id), Some(name)) = (b.service_id, col::<Option<String>>(PROC, r, "service_name")?) {
        b.service = Some(ServiceSummary {
            id,
            name,
            duration_minutes: col(PROC, r, "service_duration")?,
        });
    }
    if let (Some(id), Some(make), Some(model)) = (
        b.car_id,
        col::<Option<String>>(PROC, r, "car_make")?,
        col::<Option<String>>(PROC, r, "car_model")?,
    ) {
        b.car = Some(CarSummary {
            id,
            make,
            model,
            year: col(PROC, r, "car_year")?,
            license_plate: col(PROC, r, "car_plate")?,
        });
    }
    b.customer = Some(CustomerSummary {
        id: b.customer_id,
        full_name: col(PROC, r, "customer_name")?,
        email: col(PROC, r, "customer_email")?,
        phone: col(PROC, r, "customer_phone")?,
    });
    if let (Some(id), Some(profile)) = (b.detailer_id, col::<Option<Uuid>>(PROC, r, "detailer_profile_id")?) {
        b.detailer = Some(DetailerSummary {
            id,
            profile_id: ProfileId::from_uuid(profile),
            full_name: col(PROC, r, "detailer_name")?,
        });
    }
    if let (Some(id), Some(name)) = (b.team_id, col::<Option<String>>(PROC, r, "team_name")?) {
        b.team = Some(TeamSummary { id, name });
    }
    Ok(())
}

fn profile_from_row(procedure: &'static str, r: &PgRow) -> Result<Profile, PlatformError> {
    Ok(Profile {
        id: ProfileId::from_uuid(col(procedure, r, "id")?),
        email: col(procedure, r, "email")?,
        full_name: col(procedure, r, "full_name")?,
        role: parsed(procedure, r, "role")?,
        created_at: col(procedure, r, "created_at")?,
    })
}

fn detailer_from_row(procedure: &'static str, r: &PgRow) -> Result<DetailerRecord, PlatformError> {
    Ok(DetailerRecord {
        id: DetailerId::from_uuid(col(procedure, r, "id")?),
        profile_id: ProfileId::from_uuid(col(procedure, r, "profile_id")?),
        organization_id: col::<Option<Uuid>>(procedure, r, "organization_id")?
            .map(OrganizationId::from_uuid),
        pricing_model: parsed_opt(procedure, r, "pricing_model")?,
        is_active: col(procedure, r, "is_active")?,
    })
}

fn member_from_row(procedure: &'static str, r: &PgRow) -> Result<OrganizationMember, PlatformError> {
    Ok(OrganizationMember {
        organization_id: OrganizationId::from_uuid(col(procedure, r, "organization_id")?),
        profile_id: ProfileId::from_uuid(col(procedure, r, "profile_id")?),
        detailer_id: col::<Option<Uuid>>(procedure, r, "detailer_id")?.map(DetailerId::from_uuid),
        role: parsed(procedure, r, "role")?,
        full_name: col(procedure, r, "full_name")?,
        email: col(procedure, r, "email")?,
        joined_at: col(procedure, r, "joined_at")?,
    })
}

fn refund_from_row(procedure: &'static str, r: &PgRow) -> Result<RefundRequest, PlatformError> {
    Ok(RefundRequest {
        id: RefundId::from_uuid(col(procedure, r, "id")?),
        booking_id: BookingId::from_uuid(col(procedure, r, "booking_id")?),
        requested_by: ProfileId::from_uuid(col(procedure, r, "requested_by")?),
        amount: money(procedure, r, "amount_cents")?,
        reason: col(procedure, r, "reason")?,
        status: parsed(procedure, r, "status")?,
        created_at: col(procedure, r, "created_at")?,
    })
}

/// Map a transport/database failure to a `Remote` platform error.
fn map_sqlx_error(procedure: &'static str, err: sqlx::Error) -> PlatformError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            PlatformError::remote(procedure, format!("database error [{code}]: {}", db_err.message()))
        }
        sqlx::Error::ColumnNotFound(col) => {
            PlatformError::contract(procedure, format!("column '{col}' not returned"))
        }
        sqlx::Error::ColumnDecode { index, source } => {
            PlatformError::contract(procedure, format!("column {index}: {source}"))
        }
        sqlx::Error::PoolClosed => PlatformError::remote(procedure, "connection pool closed"),
        sqlx::Error::PoolTimedOut => PlatformError::remote(procedure, "connection pool timed out"),
        other => PlatformError::remote(procedure, other.to_string()),
    }
}
