//! `detailr-marketplace`: marketplace read models and pure query logic.
//!
//! Bookings, organization directory, payouts and refunds as this layer sees
//! them. State transitions are owned by the external platform; nothing here
//! mutates a booking.

pub mod availability;
pub mod booking;
pub mod directory;
pub mod filters;
pub mod finance;
pub mod status;

pub use availability::{AvailabilityQuery, AvailableDetailer};
pub use booking::{Booking, CarSummary, CustomerSummary, DetailerSummary, ServiceSummary, TeamSummary};
pub use directory::{DetailerMode, DetailerRecord, Organization, OrganizationMember, PricingModel, Profile};
pub use filters::{BookingFilters, BookingOrder, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
pub use finance::{PayoutBatch, RefundDecision, RefundRequest, RefundStatus, TransferStatus};
pub use status::{BookingStatus, PaymentStatus};
