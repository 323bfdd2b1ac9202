//! `detailr-core`: shared domain primitives.
//!
//! This crate contains **pure** building blocks (ids, money, errors) with no
//! infrastructure concerns.

pub mod error;
pub mod id;
pub mod money;

pub use error::{DomainError, DomainResult};
pub use id::{
    BookingId, CarId, DetailerId, OrganizationId, PayoutId, ProfileId, RefundId, ServiceId, TeamId,
};
pub use money::{FeeSplit, Money, Percentage};
