//! Application services over the platform stores.

pub mod admin;
pub mod bookings;
pub mod fees;
pub mod mode;
pub mod organization;

pub use admin::AdminService;
pub use bookings::BookingService;
pub use fees::{FeeBreakdown, FeeCalculator, FeeResolution, FeeSource};
pub use mode::{ModeResolver, OrgContext};
pub use organization::OrganizationService;
