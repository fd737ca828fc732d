//! The England & Wales bank holiday table.
//!
//! This is literal data, not a calendar algorithm: nothing is derived from Easter or from
//! substitute-day rules. To cover another year, add its rows to `ENGLAND_AND_WALES` and bump
//! `TABLE_VERSION`. Dates outside the covered years are never bank holidays.

use crate::calendar::date::{days_in_range, DateKey};
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::sync::OnceLock;

/// Bumped whenever rows are added to or corrected in `ENGLAND_AND_WALES`.
pub const TABLE_VERSION: u32 = 1;

/// Used when a date is in the holiday set but has no name.
pub const GENERIC_HOLIDAY_NAME: &str = "Bank Holiday";

/// (year, month, day, name)
const ENGLAND_AND_WALES: &[(i32, u32, u32, &str)] = &[
    (2025, 1, 1, "New Year's Day"),
    (2025, 4, 18, "Good Friday"),
    (2025, 4, 21, "Easter Monday"),
    (2025, 5, 5, "Early May bank holiday"),
    (2025, 5, 26, "Spring bank holiday"),
    (2025, 8, 25, "Summer bank holiday"),
    (2025, 12, 25, "Christmas Day"),
    (2025, 12, 26, "Boxing Day"),
    (2026, 1, 1, "New Year's Day"),
    (2026, 4, 3, "Good Friday"),
    (2026, 4, 6, "Easter Monday"),
    (2026, 5, 4, "Early May bank holiday"),
    (2026, 5, 25, "Spring bank holiday"),
    (2026, 8, 31, "Summer bank holiday"),
    (2026, 12, 25, "Christmas Day"),
    (2026, 12, 28, "Boxing Day (substitute day)"),
];

/// An immutable lookup table of public holidays for one jurisdiction.
#[derive(Debug, Clone, Default)]
pub struct BankHolidayTable {
    dates: HashSet<DateKey>,
    names: HashMap<DateKey, &'static str>,
    years: Option<RangeInclusive<i32>>,
}

impl BankHolidayTable {
    /// Builds a table from `(date, name)` pairs. The covered years span from the earliest to the
    /// latest year present.
    pub fn new(entries: impl IntoIterator<Item = (DateKey, &'static str)>) -> Self {
        let mut table = Self::default();
        for (date, name) in entries {
            table.dates.insert(date);
            table.names.insert(date, name);
            let year = date.year();
            table.years = Some(match table.years.take() {
                Some(r) => (*r.start()).min(year)..=(*r.end()).max(year),
                None => year..=year,
            });
        }
        table
    }

    /// The England & Wales table, built once on first use.
    pub fn england_and_wales() -> &'static BankHolidayTable {
        static TABLE: OnceLock<BankHolidayTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            BankHolidayTable::new(ENGLAND_AND_WALES.iter().filter_map(|(y, m, d, name)| {
                DateKey::from_ymd(*y, *m, *d).ok().map(|date| (date, *name))
            }))
        })
    }

    pub fn is_bank_holiday(&self, date: DateKey) -> bool {
        self.dates.contains(&date)
    }

    /// The name of the holiday on `date`, or `None` if it is not a bank holiday.
    pub fn holiday_name(&self, date: DateKey) -> Option<&'static str> {
        if !self.is_bank_holiday(date) {
            return None;
        }
        Some(self.names.get(&date).copied().unwrap_or(GENERIC_HOLIDAY_NAME))
    }

    /// The first and last years that the table has data for, or `None` for an empty table.
    pub fn covered_years(&self) -> Option<RangeInclusive<i32>> {
        self.years.clone()
    }

    /// Whether `date` falls in a year the table has data for. Outside of those years
    /// `is_bank_holiday` is always false.
    pub fn covers(&self, date: DateKey) -> bool {
        self.years
            .as_ref()
            .map(|r| r.contains(&date.year()))
            .unwrap_or(false)
    }

    /// All holidays from `start` to `end` inclusive, in date order.
    pub fn holidays_between(&self, start: DateKey, end: DateKey) -> Vec<(DateKey, &'static str)> {
        let mut found: Vec<(DateKey, &'static str)> = self
            .dates
            .iter()
            .filter(|d| **d >= start && **d <= end)
            .filter_map(|d| self.holiday_name(*d).map(|name| (*d, name)))
            .collect();
        found.sort();
        found
    }

    /// All holidays in `year`, in date order.
    pub fn holidays_in(&self, year: i32) -> Vec<(DateKey, &'static str)> {
        match (
            DateKey::from_ymd(year, 1, 1),
            DateKey::from_ymd(year, 12, 31),
        ) {
            (Ok(start), Ok(end)) => self.holidays_between(start, end),
            _ => Vec::new(),
        }
    }

    /// Counts the bank holidays from `start` to `end` inclusive.
    pub fn count_between(&self, start: DateKey, end: DateKey) -> usize {
        days_in_range(start, end)
            .into_iter()
            .filter(|d| self.is_bank_holiday(*d))
            .count()
    }
}

/// Shorthand for `BankHolidayTable::england_and_wales().is_bank_holiday(date)`.
pub fn is_bank_holiday(date: DateKey) -> bool {
    BankHolidayTable::england_and_wales().is_bank_holiday(date)
}

/// Shorthand for `BankHolidayTable::england_and_wales().holiday_name(date)`.
pub fn holiday_name(date: DateKey) -> Option<&'static str> {
    BankHolidayTable::england_and_wales().holiday_name(date)
}
