use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use detailr_core::{DetailerId, DomainError, DomainResult, OrganizationId};

/// Parameters for the detailer-availability radius search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub time_start: NaiveTime,
    pub time_end: Option<NaiveTime>,
    pub lat: f64,
    pub lng: f64,
    pub radius_miles: Option<f64>,
    #[serde(default)]
    pub exclude_detailer_ids: Vec<DetailerId>,
}

impl AvailabilityQuery {
    pub fn validate(&self) -> DomainResult<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(DomainError::validation("booking_lat must be within -90..=90"));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(DomainError::validation("booking_lng must be within -180..=180"));
        }
        if let Some(end) = self.time_end {
            if end <= self.time_start {
                return Err(DomainError::validation(
                    "booking_time_end must be after booking_time_start",
                ));
            }
        }
        if let Some(r) = self.radius_miles {
            if !r.is_finite() || r <= 0.0 {
                return Err(DomainError::validation("radius must be positive"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableDetailer {
    pub detailer_id: DetailerId,
    pub full_name: Option<String>,
    pub organization_id: Option<OrganizationId>,
    pub distance_miles: f64,
}
