use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use detailr_core::{BookingId, CarId, DetailerId, Money, OrganizationId, ProfileId, ServiceId, TeamId};

use crate::status::{BookingStatus, PaymentStatus};

/// A scheduled service engagement, with its read-only relations flattened to
/// single nested objects.
///
/// Amounts are integer cents. `total_amount` is expected to equal
/// `service_price + addons_total + tax_amount`; the platform owns that rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub receipt_id: Option<String>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,

    pub scheduled_date: NaiveDate,
    pub scheduled_time_start: Option<NaiveTime>,
    pub scheduled_time_end: Option<NaiveTime>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,

    pub total_amount: Money,
    pub service_price: Money,
    pub addons_total: Money,
    pub tax_amount: Money,

    pub customer_id: ProfileId,
    pub service_id: Option<ServiceId>,
    pub car_id: Option<CarId>,
    pub detailer_id: Option<DetailerId>,
    pub organization_id: Option<OrganizationId>,
    pub team_id: Option<TeamId>,
    pub address: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub car: Option<CarSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailer: Option<DetailerSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamSummary>,
}

impl Booking {
    /// Belongs to an organization but nobody has been dispatched yet.
    pub fn is_unassigned(&self) -> bool {
        self.organization_id.is_some() && self.detailer_id.is_none()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Copy with the relations stripped (list views).
    pub fn without_relations(mut self) -> Self {
        self.service = None;
        self.car = None;
        self.customer = None;
        self.detailer = None;
        self.team = None;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub id: ServiceId,
    pub name: String,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarSummary {
    pub id: CarId,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub license_plate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub id: ProfileId,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailerSummary {
    pub id: DetailerId,
    pub profile_id: ProfileId,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub id: TeamId,
    pub name: String,
}
