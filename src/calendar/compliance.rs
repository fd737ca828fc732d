//! The office attendance compliance calculator.
//!
//! Given a month, the days marked as office days, the manual exclusions, the automatic exclusion
//! toggles and (optionally) the booked leave days, this computes the pool of working days, how many
//! office days are required, how many have been selected and whether the month is on track.
//!
//! Everything here is pure. Nothing is read from or written to the store.

use crate::calendar::bank_holidays::BankHolidayTable;
use crate::calendar::date::{is_weekend, DateKey, YearMonth};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A month is "at risk" rather than "not meeting" when the selected office days reach this
/// fraction of the required days.
pub const AT_RISK_THRESHOLD: f64 = 0.75;

/// How a manually excluded date should be treated.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionKind {
    /// Removed from the working-day pool for the month.
    Excluded,
    /// Treated as a bank holiday, e.g. a company holiday or a holiday in another region.
    Holiday,
}

serde_plain::derive_display_from_serialize!(ExclusionKind);
serde_plain::derive_fromstr_from_deserialize!(ExclusionKind);

/// The three-state classification of a month.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceStatus {
    OnTrack,
    AtRisk,
    NotMeeting,
}

serde_plain::derive_display_from_serialize!(ComplianceStatus);
serde_plain::derive_fromstr_from_deserialize!(ComplianceStatus);

/// The per-month settings that drive the calculation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRules {
    /// 0 to 100.
    pub required_percentage: u8,
    pub exclude_weekends: bool,
    pub exclude_bank_holidays: bool,
}

/// The reason a date is not part of the working-day pool. The variants are listed in priority
/// order: when several apply, the first one wins.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolExclusion {
    Weekend,
    BankHoliday,
    Manual(ExclusionKind),
    Leave,
}

/// Everything the calculator needs for one month.
#[derive(Debug, Clone, Copy)]
pub struct ComplianceInput<'a> {
    pub month: YearMonth,
    pub rules: ComplianceRules,
    pub office_days: &'a BTreeSet<DateKey>,
    pub exclusions: &'a BTreeMap<DateKey, ExclusionKind>,
    /// Booked leave days. `None` when leave is not overlaid on the office tracker.
    pub leave_days: Option<&'a BTreeSet<DateKey>>,
}

/// The result of evaluating a month.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    pub month: YearMonth,
    pub required_percentage: u8,
    pub total_days: u32,
    pub working_days: u32,
    pub weekend_days: u32,
    pub bank_holiday_days: u32,
    pub excluded_days: u32,
    pub leave_days: u32,
    pub required_office_days: u32,
    pub selected_office_days: u32,
    pub remaining_office_days: u32,
    pub progress_percentage: u32,
    pub status: ComplianceStatus,
    /// False when the month is outside the years the bank holiday table has data for.
    pub holidays_covered: bool,
}

/// How a single day should be presented.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    Weekend,
    BankHoliday,
    Excluded,
    HolidayOverride,
    Leave,
    Office,
    Working,
}

serde_plain::derive_display_from_serialize!(DayKind);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct DayView {
    pub date: DateKey,
    pub kind: DayKind,
    /// Whether the day counts towards the working-day pool.
    pub in_pool: bool,
    /// Whether the day is marked as an office day, even if it does not count.
    pub office: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holiday_name: Option<&'static str>,
}

/// `ceil(working_days * required_percentage / 100)`
pub fn required_office_days(working_days: u32, required_percentage: u8) -> u32 {
    let product = u64::from(working_days) * u64::from(required_percentage.min(100));
    product.div_ceil(100) as u32
}

/// `min(100, round(selected / required * 100))`, or 100 when nothing is required.
pub fn progress_percentage(selected: u32, required: u32) -> u32 {
    if required == 0 {
        return 100;
    }
    let (s, r) = (u64::from(selected), u64::from(required));
    // round half up
    let pct = (s * 200 + r) / (r * 2);
    pct.min(100) as u32
}

pub fn compliance_status(selected: u32, required: u32) -> ComplianceStatus {
    if selected >= required {
        ComplianceStatus::OnTrack
    } else if f64::from(selected) >= f64::from(required) * AT_RISK_THRESHOLD {
        ComplianceStatus::AtRisk
    } else {
        ComplianceStatus::NotMeeting
    }
}

/// Evaluates months against a bank holiday table.
#[derive(Debug, Clone, Copy)]
pub struct ComplianceCalculator<'t> {
    holidays: &'t BankHolidayTable,
}

impl Default for ComplianceCalculator<'static> {
    fn default() -> Self {
        Self::new(BankHolidayTable::england_and_wales())
    }
}

impl<'t> ComplianceCalculator<'t> {
    pub fn new(holidays: &'t BankHolidayTable) -> Self {
        Self { holidays }
    }

    /// Why `date` is left out of the working-day pool, or `None` if it is a working day.
    ///
    /// Automatic exclusions are checked first, so when a toggle is on it wins over any manual
    /// exclusion or leave on the same date.
    pub fn pool_exclusion(
        &self,
        input: &ComplianceInput<'_>,
        date: DateKey,
    ) -> Option<PoolExclusion> {
        if input.rules.exclude_weekends && is_weekend(date) {
            return Some(PoolExclusion::Weekend);
        }
        if input.rules.exclude_bank_holidays && self.holidays.is_bank_holiday(date) {
            return Some(PoolExclusion::BankHoliday);
        }
        if let Some(kind) = input.exclusions.get(&date) {
            return Some(PoolExclusion::Manual(*kind));
        }
        if input
            .leave_days
            .map(|leave| leave.contains(&date))
            .unwrap_or(false)
        {
            return Some(PoolExclusion::Leave);
        }
        None
    }

    /// The working days of the month, in order.
    pub fn working_days(&self, input: &ComplianceInput<'_>) -> Vec<DateKey> {
        input
            .month
            .days()
            .filter(|d| self.pool_exclusion(input, *d).is_none())
            .collect()
    }

    /// Computes the summary for the month.
    pub fn evaluate(&self, input: &ComplianceInput<'_>) -> ComplianceSummary {
        let mut total_days = 0;
        let mut working_days = 0;
        let mut weekend_days = 0;
        let mut bank_holiday_days = 0;
        let mut excluded_days = 0;
        let mut leave_days = 0;
        let mut selected = 0;

        for date in input.month.days() {
            total_days += 1;
            match self.pool_exclusion(input, date) {
                Some(PoolExclusion::Weekend) => weekend_days += 1,
                Some(PoolExclusion::BankHoliday) => bank_holiday_days += 1,
                Some(PoolExclusion::Manual(_)) => excluded_days += 1,
                Some(PoolExclusion::Leave) => leave_days += 1,
                None => {
                    working_days += 1;
                    if input.office_days.contains(&date) {
                        selected += 1;
                    }
                }
            }
        }

        let required = required_office_days(working_days, input.rules.required_percentage);
        ComplianceSummary {
            month: input.month,
            required_percentage: input.rules.required_percentage,
            total_days,
            working_days,
            weekend_days,
            bank_holiday_days,
            excluded_days,
            leave_days,
            required_office_days: required,
            selected_office_days: selected,
            remaining_office_days: required.saturating_sub(selected),
            progress_percentage: progress_percentage(selected, required),
            status: compliance_status(selected, required),
            holidays_covered: self.holidays.covers(input.month.first_day()),
        }
    }

    /// Classifies a single date for display.
    ///
    /// An office mark takes over the display of a bank holiday or weekend only when that day was
    /// not removed from the pool by an automatic toggle.
    pub fn classify(&self, input: &ComplianceInput<'_>, date: DateKey) -> DayView {
        let office = input.office_days.contains(&date);
        let holiday_name = self.holidays.holiday_name(date);
        let exclusion = self.pool_exclusion(input, date);
        let kind = match exclusion {
            Some(PoolExclusion::Weekend) => DayKind::Weekend,
            Some(PoolExclusion::BankHoliday) => DayKind::BankHoliday,
            Some(PoolExclusion::Manual(ExclusionKind::Excluded)) => DayKind::Excluded,
            Some(PoolExclusion::Manual(ExclusionKind::Holiday)) => DayKind::HolidayOverride,
            Some(PoolExclusion::Leave) => DayKind::Leave,
            None if office => DayKind::Office,
            None if holiday_name.is_some() => DayKind::BankHoliday,
            None if is_weekend(date) => DayKind::Weekend,
            None => DayKind::Working,
        };
        DayView {
            date,
            kind,
            in_pool: exclusion.is_none(),
            office,
            holiday_name,
        }
    }

    /// Classifies every date of the month.
    pub fn month_view(&self, input: &ComplianceInput<'_>) -> Vec<DayView> {
        input
            .month
            .days()
            .map(|d| self.classify(input, d))
            .collect()
    }
}
