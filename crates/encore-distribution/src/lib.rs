//! Encore distribution layer.
//!
//! Splits an accepted settlement into per-member payouts according to a
//! distribution plan, and tracks each payout's lifecycle independently of the
//! parent settlement and of its siblings.

pub mod allocator;
pub mod error;
pub mod types;

pub use allocator::DistributionAllocator;
pub use error::DistributionError;
pub use types::{DistributionPlan, MemberPayout, PlanEntry, PlanEntrySpec};
