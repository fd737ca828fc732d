//! The calendar compliance engine: date arithmetic, the bank holiday table, the office attendance
//! calculator and the leave day counter. Nothing in this module performs I/O.

mod bank_holidays;
mod compliance;
mod date;
mod leave;

pub use bank_holidays::{
    holiday_name, is_bank_holiday, BankHolidayTable, GENERIC_HOLIDAY_NAME, TABLE_VERSION,
};
pub use compliance::{
    compliance_status, progress_percentage, required_office_days, ComplianceCalculator,
    ComplianceInput, ComplianceRules, ComplianceStatus, ComplianceSummary, DayKind, DayView,
    ExclusionKind, PoolExclusion, AT_RISK_THRESHOLD,
};
pub use date::{
    add_months, calendar_grid, days_in_range, is_weekend, DateKey, GridFill, Week, YearMonth,
};
pub use leave::{count_leave_days, leave_overlay};
