//! Working-day counting for holiday leave.
//!
//! Leave only skips weekends and bank holidays. Exclusions made in the office tracker do not apply
//! here; the two are joined only through `leave_overlay`, which feeds booked days into the office
//! tracker's working-day pool.

use crate::calendar::bank_holidays::BankHolidayTable;
use crate::calendar::date::{days_in_range, is_weekend, DateKey, YearMonth};
use std::collections::BTreeSet;

/// Counts the working days consumed by leave from `from` to `to` inclusive. Returns 0 if `to` is
/// before `from`.
pub fn count_leave_days(holidays: &BankHolidayTable, from: DateKey, to: DateKey) -> u32 {
    days_in_range(from, to)
        .into_iter()
        .filter(|d| !is_weekend(*d) && !holidays.is_bank_holiday(*d))
        .count() as u32
}

/// Every booked date that falls in `month`, given inclusive `(from, to)` ranges.
pub fn leave_overlay<I>(ranges: I, month: YearMonth) -> BTreeSet<DateKey>
where
    I: IntoIterator<Item = (DateKey, DateKey)>,
{
    let first = month.first_day();
    let last = month.last_day();
    ranges
        .into_iter()
        .filter(|(from, to)| *from <= last && *to >= first)
        .flat_map(|(from, to)| days_in_range(from.max(first), to.min(last)))
        .collect()
}
