//! Types that represent the documents a user owns: their profile, their leave record and one office
//! tracker record per month.
mod leave;
mod office;
mod profile;

pub use leave::{LeaveBalance, LeaveEntry, LeaveRecord};
pub use office::{DayChange, OfficeTrackerRecord};
pub use profile::{ProfileUpdate, UserId, UserProfile};
