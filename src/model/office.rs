use crate::calendar::{
    ComplianceCalculator, ComplianceInput, ComplianceRules, ComplianceSummary, DateKey, DayView,
    ExclusionKind, YearMonth,
};
use crate::Result;
use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The office attendance record for one user and one month.
///
/// A date is never in both `office_days` and `exclusions`: every mutation below keeps the two
/// disjoint.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "RawOfficeTrackerRecord")]
pub struct OfficeTrackerRecord {
    month: YearMonth,
    required_percentage: u8,
    exclude_weekends: bool,
    exclude_bank_holidays: bool,
    #[serde(default)]
    office_days: BTreeSet<DateKey>,
    #[serde(default)]
    exclusions: BTreeMap<DateKey, ExclusionKind>,
}

/// The stored shape of an `OfficeTrackerRecord`, before its invariants are checked.
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct RawOfficeTrackerRecord {
    month: YearMonth,
    required_percentage: u8,
    exclude_weekends: bool,
    exclude_bank_holidays: bool,
    #[serde(default)]
    office_days: BTreeSet<DateKey>,
    #[serde(default)]
    exclusions: BTreeMap<DateKey, ExclusionKind>,
}

impl TryFrom<RawOfficeTrackerRecord> for OfficeTrackerRecord {
    type Error = crate::Error;

    fn try_from(raw: RawOfficeTrackerRecord) -> Result<Self> {
        let record = Self {
            month: raw.month,
            required_percentage: raw.required_percentage,
            exclude_weekends: raw.exclude_weekends,
            exclude_bank_holidays: raw.exclude_bank_holidays,
            office_days: raw.office_days,
            exclusions: raw.exclusions,
        };
        record.validate()?;
        Ok(record)
    }
}

/// What a single interaction with a day did to the record.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayChange {
    OfficeAdded,
    OfficeRemoved,
    Excluded,
    Included,
}

serde_plain::derive_display_from_serialize!(DayChange);

impl OfficeTrackerRecord {
    /// An empty record for `month` using `rules` as its settings.
    pub fn new(month: YearMonth, rules: ComplianceRules) -> Self {
        Self {
            month,
            required_percentage: rules.required_percentage.min(100),
            exclude_weekends: rules.exclude_weekends,
            exclude_bank_holidays: rules.exclude_bank_holidays,
            office_days: BTreeSet::new(),
            exclusions: BTreeMap::new(),
        }
    }

    pub fn month(&self) -> YearMonth {
        self.month
    }

    pub fn rules(&self) -> ComplianceRules {
        ComplianceRules {
            required_percentage: self.required_percentage,
            exclude_weekends: self.exclude_weekends,
            exclude_bank_holidays: self.exclude_bank_holidays,
        }
    }

    pub fn office_days(&self) -> &BTreeSet<DateKey> {
        &self.office_days
    }

    pub fn exclusions(&self) -> &BTreeMap<DateKey, ExclusionKind> {
        &self.exclusions
    }

    pub fn is_office_day(&self, date: DateKey) -> bool {
        self.office_days.contains(&date)
    }

    pub fn exclusion(&self, date: DateKey) -> Option<ExclusionKind> {
        self.exclusions.get(&date).copied()
    }

    pub fn set_required_percentage(&mut self, pct: u8) -> Result<()> {
        ensure!(
            pct <= 100,
            "The required percentage must be between 0 and 100, got {pct}"
        );
        self.required_percentage = pct;
        Ok(())
    }

    pub fn set_exclude_weekends(&mut self, value: bool) {
        self.exclude_weekends = value;
    }

    pub fn set_exclude_bank_holidays(&mut self, value: bool) {
        self.exclude_bank_holidays = value;
    }

    /// Excludes `date` from the working-day pool. The date stops being an office day.
    pub fn add_exclusion(&mut self, date: DateKey, kind: ExclusionKind) -> Result<()> {
        self.check_month(date)?;
        self.office_days.remove(&date);
        self.exclusions.insert(date, kind);
        Ok(())
    }

    /// Removes the exclusion on `date`, returning whether there was one. The date does not become
    /// an office day.
    pub fn remove_exclusion(&mut self, date: DateKey) -> Result<bool> {
        self.check_month(date)?;
        Ok(self.exclusions.remove(&date).is_some())
    }

    /// A short interaction with a day. An excluded day gets its exclusion cleared, any other day
    /// toggles in or out of the office days.
    pub fn tap(&mut self, date: DateKey) -> Result<DayChange> {
        self.check_month(date)?;
        if self.exclusions.remove(&date).is_some() {
            return Ok(DayChange::Included);
        }
        if self.office_days.remove(&date) {
            Ok(DayChange::OfficeRemoved)
        } else {
            self.office_days.insert(date);
            Ok(DayChange::OfficeAdded)
        }
    }

    /// A long interaction with a day. Toggles the day between excluded and not excluded.
    pub fn hold(&mut self, date: DateKey) -> Result<DayChange> {
        if self.remove_exclusion(date)? {
            Ok(DayChange::Included)
        } else {
            self.add_exclusion(date, ExclusionKind::Excluded)?;
            Ok(DayChange::Excluded)
        }
    }

    /// The calculator input for this record.
    pub fn input<'a>(&'a self, leave_days: Option<&'a BTreeSet<DateKey>>) -> ComplianceInput<'a> {
        ComplianceInput {
            month: self.month,
            rules: self.rules(),
            office_days: &self.office_days,
            exclusions: &self.exclusions,
            leave_days,
        }
    }

    pub fn evaluate(
        &self,
        calculator: &ComplianceCalculator<'_>,
        leave_days: Option<&BTreeSet<DateKey>>,
    ) -> ComplianceSummary {
        calculator.evaluate(&self.input(leave_days))
    }

    pub fn month_view(
        &self,
        calculator: &ComplianceCalculator<'_>,
        leave_days: Option<&BTreeSet<DateKey>>,
    ) -> Vec<DayView> {
        calculator.month_view(&self.input(leave_days))
    }

    /// Checks the percentage range, that every date is in the month, and that no date is both an
    /// office day and excluded.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.required_percentage <= 100,
            "The required percentage must be between 0 and 100, got {}",
            self.required_percentage
        );
        for date in self.office_days.iter().chain(self.exclusions.keys()) {
            self.check_month(*date)?;
        }
        if let Some(date) = self
            .office_days
            .iter()
            .find(|d| self.exclusions.contains_key(*d))
        {
            bail!("{date} is both an office day and excluded");
        }
        Ok(())
    }

    fn check_month(&self, date: DateKey) -> Result<()> {
        if !self.month.contains(date) {
            bail!("{date} is not in {}", self.month);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::ComplianceStatus;
    use std::str::FromStr;

    fn d(s: &str) -> DateKey {
        DateKey::from_str(s).unwrap()
    }

    fn record() -> OfficeTrackerRecord {
        OfficeTrackerRecord::new(
            YearMonth::new(2026, 2).unwrap(),
            ComplianceRules {
                required_percentage: 60,
                exclude_weekends: true,
                exclude_bank_holidays: true,
            },
        )
    }

    fn disjoint(r: &OfficeTrackerRecord) -> bool {
        r.office_days()
            .iter()
            .all(|d| !r.exclusions().contains_key(d))
    }

    #[test]
    fn test_add_exclusion_removes_office_day() {
        let mut r = record();
        assert_eq!(r.tap(d("2026-02-02")).unwrap(), DayChange::OfficeAdded);
        assert!(r.is_office_day(d("2026-02-02")));
        r.add_exclusion(d("2026-02-02"), ExclusionKind::Holiday)
            .unwrap();
        assert!(!r.is_office_day(d("2026-02-02")));
        assert_eq!(r.exclusion(d("2026-02-02")), Some(ExclusionKind::Holiday));
    }

    #[test]
    fn test_remove_exclusion_does_not_restore_office_day() {
        let mut r = record();
        r.tap(d("2026-02-02")).unwrap();
        r.add_exclusion(d("2026-02-02"), ExclusionKind::Excluded)
            .unwrap();
        assert!(r.remove_exclusion(d("2026-02-02")).unwrap());
        assert!(!r.is_office_day(d("2026-02-02")));
        assert!(!r.remove_exclusion(d("2026-02-02")).unwrap());
    }

    #[test]
    fn test_tap_clears_exclusion_first() {
        let mut r = record();
        r.add_exclusion(d("2026-02-03"), ExclusionKind::Excluded)
            .unwrap();
        assert_eq!(r.tap(d("2026-02-03")).unwrap(), DayChange::Included);
        assert!(r.exclusion(d("2026-02-03")).is_none());
        assert!(!r.is_office_day(d("2026-02-03")));
        assert_eq!(r.tap(d("2026-02-03")).unwrap(), DayChange::OfficeAdded);
        assert_eq!(r.tap(d("2026-02-03")).unwrap(), DayChange::OfficeRemoved);
    }

    #[test]
    fn test_hold_toggles_exclusion() {
        let mut r = record();
        r.tap(d("2026-02-04")).unwrap();
        assert_eq!(r.hold(d("2026-02-04")).unwrap(), DayChange::Excluded);
        assert!(!r.is_office_day(d("2026-02-04")));
        assert_eq!(r.exclusion(d("2026-02-04")), Some(ExclusionKind::Excluded));
        assert_eq!(r.hold(d("2026-02-04")).unwrap(), DayChange::Included);
        assert!(r.exclusion(d("2026-02-04")).is_none());
    }

    #[test]
    fn test_mutations_keep_sets_disjoint() {
        let mut r = record();
        let days: Vec<DateKey> = r.month().days().take(10).collect();
        for (i, day) in days.iter().cycle().take(60).enumerate() {
            match i % 5 {
                0 | 3 => {
                    r.tap(*day).unwrap();
                }
                1 => {
                    r.hold(*day).unwrap();
                }
                2 => r.add_exclusion(*day, ExclusionKind::Holiday).unwrap(),
                _ => {
                    r.remove_exclusion(*day).unwrap();
                }
            }
            assert!(disjoint(&r), "step {i} on {day}");
        }
    }

    #[test]
    fn test_dates_outside_month_are_rejected() {
        let mut r = record();
        assert!(r.tap(d("2026-03-02")).is_err());
        assert!(r.hold(d("2026-01-30")).is_err());
        assert!(r
            .add_exclusion(d("2026-03-02"), ExclusionKind::Excluded)
            .is_err());
        assert!(r.office_days().is_empty());
        assert!(r.exclusions().is_empty());
    }

    #[test]
    fn test_set_required_percentage() {
        let mut r = record();
        r.set_required_percentage(0).unwrap();
        assert_eq!(r.rules().required_percentage, 0);
        assert!(r.set_required_percentage(101).is_err());
        assert_eq!(r.rules().required_percentage, 0);
    }

    #[test]
    fn test_evaluate() {
        let mut r = record();
        let weekdays: Vec<DateKey> = r
            .month()
            .days()
            .filter(|d| !crate::calendar::is_weekend(*d))
            .take(9)
            .collect();
        for day in weekdays {
            r.tap(day).unwrap();
        }
        let summary = r.evaluate(&ComplianceCalculator::default(), None);
        assert_eq!(summary.required_office_days, 12);
        assert_eq!(summary.selected_office_days, 9);
        assert_eq!(summary.status, ComplianceStatus::AtRisk);
        assert_eq!(summary.progress_percentage, 75);
    }

    #[test]
    fn test_serde_shape() {
        let mut r = record();
        r.tap(d("2026-02-02")).unwrap();
        r.add_exclusion(d("2026-02-03"), ExclusionKind::Holiday)
            .unwrap();
        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "month": "2026-02",
                "required_percentage": 60,
                "exclude_weekends": true,
                "exclude_bank_holidays": true,
                "office_days": ["2026-02-02"],
                "exclusions": { "2026-02-03": "holiday" }
            })
        );
        let back: OfficeTrackerRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_deserialize_rejects_broken_records() {
        let base = serde_json::json!({
            "month": "2026-02",
            "required_percentage": 60,
            "exclude_weekends": true,
            "exclude_bank_holidays": true,
        });
        let with = |key: &str, value: serde_json::Value| {
            let mut doc = base.clone();
            doc[key] = value;
            serde_json::from_value::<OfficeTrackerRecord>(doc)
        };

        assert!(serde_json::from_value::<OfficeTrackerRecord>(base.clone()).is_ok());
        let err = with("required_percentage", serde_json::json!(250)).unwrap_err();
        assert!(err.to_string().contains("between 0 and 100"), "{err}");
        let err = with("office_days", serde_json::json!(["2026-02-02", "2026-03-02"])).unwrap_err();
        assert!(err.to_string().contains("2026-03-02 is not in 2026-02"), "{err}");
        assert!(with("exclusions", serde_json::json!({"2026-01-30": "excluded"})).is_err());

        let mut doc = base.clone();
        doc["office_days"] = serde_json::json!(["2026-02-02"]);
        doc["exclusions"] = serde_json::json!({"2026-02-02": "excluded"});
        let err = serde_json::from_value::<OfficeTrackerRecord>(doc).unwrap_err();
        assert!(err.to_string().contains("both an office day and excluded"), "{err}");
    }
}
