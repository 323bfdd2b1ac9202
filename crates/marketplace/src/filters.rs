//! Booking list filters and the in-process filter/sort engine.
//!
//! The Postgres store translates [`BookingFilters`] to SQL; the in-memory
//! store and tests run [`BookingFilters::apply`]. Both must agree on the
//! ordering rules documented on [`BookingFilters`].

use core::cmp::Ordering;
use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use detailr_core::{DetailerId, DomainError, OrganizationId};

use crate::booking::Booking;
use crate::status::BookingStatus;

pub const DEFAULT_LIST_LIMIT: usize = 200;
/// Upper bound on any requested page size.
pub const MAX_LIST_LIMIT: usize = 1_000;

/// Primary sort key for booking lists.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingOrder {
    #[default]
    ScheduledDate,
    CreatedAt,
}

impl BookingOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScheduledDate => "scheduled_date",
            Self::CreatedAt => "created_at",
        }
    }
}

impl FromStr for BookingOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "scheduled_date" => Ok(Self::ScheduledDate),
            "created_at" => Ok(Self::CreatedAt),
            _ => Err(DomainError::unknown("booking order", s)),
        }
    }
}

/// Filters for listing bookings.
///
/// - `statuses`: empty means any; otherwise a booking matches if its status is
///   any of the listed values
/// - date bounds are inclusive
/// - ordering: `order_by` in the `ascending` direction, then start time
///   ascending with missing start times last
/// - at most `limit` rows (default [`DEFAULT_LIST_LIMIT`], capped at
///   [`MAX_LIST_LIMIT`])
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingFilters {
    pub statuses: Vec<BookingStatus>,
    pub detailer_id: Option<DetailerId>,
    pub organization_id: Option<OrganizationId>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<usize>,
    pub order_by: BookingOrder,
    pub ascending: bool,
}

impl Default for BookingFilters {
    fn default() -> Self {
        Self {
            statuses: Vec::new(),
            detailer_id: None,
            organization_id: None,
            from_date: None,
            to_date: None,
            limit: None,
            order_by: BookingOrder::ScheduledDate,
            ascending: true,
        }
    }
}

impl BookingFilters {
    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = BookingStatus>) -> Self {
        self.statuses.extend(statuses);
        self
    }

    pub fn for_detailer(mut self, detailer_id: DetailerId) -> Self {
        self.detailer_id = Some(detailer_id);
        self
    }

    pub fn for_organization(mut self, organization_id: OrganizationId) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from_date = from;
        self.to_date = to;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(mut self, order_by: BookingOrder, ascending: bool) -> Self {
        self.order_by = order_by;
        self.ascending = ascending;
        self
    }

    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT)
    }

    /// Parse a comma-separated status list (`"paid,offered"`).
    pub fn parse_statuses(raw: &str) -> Result<Vec<BookingStatus>, DomainError> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(BookingStatus::from_str)
            .collect()
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&booking.status) {
            return false;
        }
        if let Some(d) = self.detailer_id {
            if booking.detailer_id != Some(d) {
                return false;
            }
        }
        if let Some(o) = self.organization_id {
            if booking.organization_id != Some(o) {
                return false;
            }
        }
        if let Some(from) = self.from_date {
            if booking.scheduled_date < from {
                return false;
            }
        }
        if let Some(to) = self.to_date {
            if booking.scheduled_date > to {
                return false;
            }
        }
        true
    }

    pub fn compare(&self, a: &Booking, b: &Booking) -> Ordering {
        let primary = match self.order_by {
            BookingOrder::ScheduledDate => a.scheduled_date.cmp(&b.scheduled_date),
            BookingOrder::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let primary = if self.ascending { primary } else { primary.reverse() };

        primary.then_with(|| match (a.scheduled_time_start, b.scheduled_time_start) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    }

    /// Filter, sort and truncate. Never returns more than the effective limit.
    pub fn apply<I>(&self, bookings: I) -> Vec<Booking>
    where
        I: IntoIterator<Item = Booking>,
    {
        let mut rows: Vec<Booking> = bookings.into_iter().filter(|b| self.matches(b)).collect();
        rows.sort_by(|a, b| self.compare(a, b));
        rows.truncate(self.effective_limit());
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::fixtures::booking;
    use chrono::NaiveTime;
    use proptest::prelude::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn time(h: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, 0, 0)
    }

    #[test]
    fn default_order_is_date_then_start_time_nulls_last() {
        let rows = vec![
            booking(date(2), time(9), BookingStatus::Paid),
            booking(date(1), None, BookingStatus::Paid),
            booking(date(1), time(14), BookingStatus::Paid),
            booking(date(1), time(8), BookingStatus::Paid),
        ];
        let out = BookingFilters::default().apply(rows);
        let keys: Vec<_> = out.iter().map(|b| (b.scheduled_date, b.scheduled_time_start)).collect();
        assert_eq!(
            keys,
            vec![
                (date(1), time(8)),
                (date(1), time(14)),
                (date(1), None),
                (date(2), time(9)),
            ]
        );
    }

    #[test]
    fn descending_keeps_secondary_key_ascending() {
        let rows = vec![
            booking(date(1), time(9), BookingStatus::Paid),
            booking(date(3), time(15), BookingStatus::Paid),
            booking(date(3), time(7), BookingStatus::Paid),
        ];
        let out = BookingFilters::default()
            .order(BookingOrder::ScheduledDate, false)
            .apply(rows);
        let keys: Vec<_> = out.iter().map(|b| (b.scheduled_date, b.scheduled_time_start)).collect();
        assert_eq!(keys, vec![(date(3), time(7)), (date(3), time(15)), (date(1), time(9))]);
    }

    #[test]
    fn status_set_is_a_union() {
        let rows = vec![
            booking(date(1), None, BookingStatus::Paid),
            booking(date(1), None, BookingStatus::Offered),
            booking(date(1), None, BookingStatus::Cancelled),
        ];
        let out = BookingFilters::default()
            .with_statuses([BookingStatus::Paid, BookingStatus::Offered])
            .apply(rows);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|b| b.status != BookingStatus::Cancelled));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let rows = (1..=5).map(|d| booking(date(d), None, BookingStatus::Paid));
        let out = BookingFilters::default()
            .between(Some(date(2)), Some(date(4)))
            .apply(rows);
        let days: Vec<_> = out.iter().map(|b| b.scheduled_date).collect();
        assert_eq!(days, vec![date(2), date(3), date(4)]);
    }

    #[test]
    fn detailer_and_org_filters() {
        let d = DetailerId::new();
        let o = OrganizationId::new();
        let mut mine = booking(date(1), None, BookingStatus::Accepted);
        mine.detailer_id = Some(d);
        mine.organization_id = Some(o);
        let other = booking(date(1), None, BookingStatus::Accepted);

        let out = BookingFilters::default().for_detailer(d).apply(vec![mine.clone(), other.clone()]);
        assert_eq!(out, vec![mine.clone()]);

        let out = BookingFilters::default().for_organization(o).apply(vec![other, mine.clone()]);
        assert_eq!(out, vec![mine]);
    }

    #[test]
    fn nothing_matching_is_empty_not_an_error() {
        let out = BookingFilters::default()
            .with_status(BookingStatus::NoShow)
            .apply(vec![booking(date(1), None, BookingStatus::Paid)]);
        assert!(out.is_empty());
    }

    #[test]
    fn parse_status_list() {
        assert_eq!(
            BookingFilters::parse_statuses("paid, offered,").unwrap(),
            vec![BookingStatus::Paid, BookingStatus::Offered]
        );
        assert!(BookingFilters::parse_statuses("paid,bogus").is_err());
        assert!(BookingFilters::parse_statuses("").unwrap().is_empty());
    }

    #[test]
    fn default_limit_is_two_hundred() {
        let rows = (0..250).map(|_| booking(date(1), None, BookingStatus::Paid));
        assert_eq!(BookingFilters::default().apply(rows).len(), DEFAULT_LIST_LIMIT);
    }

    #[test]
    fn oversized_limit_is_capped() {
        let filters = BookingFilters::default().limit(usize::MAX);
        assert_eq!(filters.effective_limit(), MAX_LIST_LIMIT);
        assert_eq!(BookingFilters::default().limit(5).effective_limit(), 5);
    }

    fn arb_status() -> impl Strategy<Value = BookingStatus> {
        (0usize..BookingStatus::ALL.len()).prop_map(|i| BookingStatus::ALL[i])
    }

    fn arb_booking() -> impl Strategy<Value = Booking> {
        (1u32..28, prop::option::of(0u32..24), arb_status())
            .prop_map(|(d, h, st)| booking(date(d), h.and_then(|h| time(h)), st))
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: results respect the limit, contain only requested
        /// statuses, include every match up to the limit, and are ordered.
        #[test]
        fn list_respects_limit_membership_and_order(
            rows in prop::collection::vec(arb_booking(), 0..60),
            wanted in prop::collection::vec(arb_status(), 0..3),
            limit in 0usize..40,
        ) {
            let filters = BookingFilters::default().with_statuses(wanted.clone()).limit(limit);
            let out = filters.apply(rows.clone());

            let matching = rows.iter().filter(|b| wanted.is_empty() || wanted.contains(&b.status)).count();
            prop_assert!(out.len() <= limit);
            prop_assert_eq!(out.len(), matching.min(limit));
            for b in &out {
                prop_assert!(wanted.is_empty() || wanted.contains(&b.status));
            }
            for pair in out.windows(2) {
                prop_assert_ne!(filters.compare(&pair[0], &pair[1]), Ordering::Greater);
            }
        }
    }
}
