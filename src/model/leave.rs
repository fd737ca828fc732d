use crate::calendar::{count_leave_days, leave_overlay, BankHolidayTable, DateKey, YearMonth};
use crate::utils::generate_leave_id;
use crate::Result;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// A contiguous, inclusive range of booked leave.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "RawLeaveEntry")]
pub struct LeaveEntry {
    id: String,
    from_date: DateKey,
    to_date: DateKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

/// The stored shape of a `LeaveEntry`, before its range is checked.
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct RawLeaveEntry {
    id: String,
    from_date: DateKey,
    to_date: DateKey,
    #[serde(default)]
    note: Option<String>,
}

impl TryFrom<RawLeaveEntry> for LeaveEntry {
    type Error = crate::Error;

    fn try_from(raw: RawLeaveEntry) -> Result<Self> {
        LeaveEntry::new(raw.id, raw.from_date, raw.to_date, raw.note)
    }
}

impl LeaveEntry {
    pub fn new(
        id: impl Into<String>,
        from_date: DateKey,
        to_date: DateKey,
        note: Option<String>,
    ) -> Result<Self> {
        if to_date < from_date {
            bail!("The leave ends on {to_date}, which is before it starts on {from_date}");
        }
        Ok(Self {
            id: id.into(),
            from_date,
            to_date,
            note: note.filter(|n| !n.trim().is_empty()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn from_date(&self) -> DateKey {
        self.from_date
    }

    pub fn to_date(&self) -> DateKey {
        self.to_date
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Working days consumed by this entry.
    pub fn working_days(&self, holidays: &BankHolidayTable) -> u32 {
        count_leave_days(holidays, self.from_date, self.to_date)
    }

    pub fn overlaps(&self, other: &LeaveEntry) -> bool {
        self.from_date <= other.to_date && other.from_date <= self.to_date
    }
}

/// Allowance and balance of a user's leave.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct LeaveBalance {
    pub available: u32,
    pub used: u32,
    /// Negative when more days are booked than are available.
    pub remaining: i64,
}

impl LeaveBalance {
    /// More days are booked than are available.
    pub fn is_overbooked(&self) -> bool {
        self.remaining < 0
    }
}

/// The leave record for one user.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LeaveRecord {
    available_days: u32,
    #[serde(default)]
    entries: Vec<LeaveEntry>,
}

impl LeaveRecord {
    pub fn new(available_days: u32) -> Self {
        Self {
            available_days,
            entries: Vec::new(),
        }
    }

    pub fn available_days(&self) -> u32 {
        self.available_days
    }

    pub fn set_available_days(&mut self, days: u32) {
        self.available_days = days;
    }

    /// Entries ordered by start date.
    pub fn entries(&self) -> &[LeaveEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &str) -> Option<&LeaveEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Books leave from `from` to `to` inclusive under a newly generated id. Overlapping an existing
    /// booking is allowed but logged.
    pub fn book(
        &mut self,
        from: DateKey,
        to: DateKey,
        note: Option<String>,
    ) -> Result<&LeaveEntry> {
        let entry = LeaveEntry::new(generate_leave_id(), from, to, note)?;
        self.insert(entry)
    }

    /// Inserts an entry, keeping the entries ordered by start date.
    pub fn insert(&mut self, entry: LeaveEntry) -> Result<&LeaveEntry> {
        if self.entry(&entry.id).is_some() {
            bail!("A leave entry with ID '{}' already exists", entry.id);
        }
        for existing in self.entries.iter().filter(|e| e.overlaps(&entry)) {
            warn!(
                "Leave {} to {} overlaps the existing booking '{}' ({} to {})",
                entry.from_date, entry.to_date, existing.id, existing.from_date, existing.to_date
            );
        }
        let ix = self
            .entries
            .partition_point(|e| (e.from_date, e.to_date) <= (entry.from_date, entry.to_date));
        self.entries.insert(ix, entry);
        self.entries
            .get(ix)
            .context("The inserted leave entry is missing")
    }

    /// Removes the entry with `id` and returns it.
    pub fn cancel(&mut self, id: &str) -> Result<LeaveEntry> {
        let ix = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .with_context(|| format!("Leave entry not found: {id}"))?;
        Ok(self.entries.remove(ix))
    }

    pub fn balance(&self, holidays: &BankHolidayTable) -> LeaveBalance {
        let used: u32 = self.entries.iter().map(|e| e.working_days(holidays)).sum();
        LeaveBalance {
            available: self.available_days,
            used,
            remaining: i64::from(self.available_days) - i64::from(used),
        }
    }

    /// Booked dates falling in `month`, for overlaying on the office tracker.
    pub fn overlay(&self, month: YearMonth) -> BTreeSet<DateKey> {
        leave_overlay(
            self.entries.iter().map(|e| (e.from_date, e.to_date)),
            month,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> DateKey {
        DateKey::from_str(s).unwrap()
    }

    #[test]
    fn test_entry_rejects_inverted_range() {
        let result = LeaveEntry::new("x", d("2026-02-06"), d("2026-02-02"), None);
        assert!(result.is_err());
        assert!(LeaveEntry::new("x", d("2026-02-06"), d("2026-02-06"), None).is_ok());
    }

    #[test]
    fn test_deserialize_rejects_inverted_range() {
        let json = serde_json::json!({
            "available_days": 25,
            "entries": [{"id": "x", "from_date": "2026-02-06", "to_date": "2026-02-02"}]
        });
        let err = serde_json::from_value::<LeaveRecord>(json).unwrap_err();
        assert!(err.to_string().contains("before it starts"), "{err}");

        let json = serde_json::json!({"id": "x", "from_date": "2026-02-02", "to_date": "2026-02-06"});
        let entry: LeaveEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.from_date(), d("2026-02-02"));
    }

    #[test]
    fn test_blank_note_is_dropped() {
        let entry = LeaveEntry::new("x", d("2026-02-02"), d("2026-02-06"), Some("  ".into()))
            .unwrap();
        assert_eq!(entry.note(), None);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("note").is_none());
    }

    #[test]
    fn test_book_and_balance() {
        let table = BankHolidayTable::england_and_wales();
        let mut record = LeaveRecord::new(25);
        let id = record
            .book(d("2026-02-02"), d("2026-02-06"), Some("Skiing".into()))
            .unwrap()
            .id()
            .to_string();
        assert!(id.starts_with("leave-"));
        assert_eq!(record.entry(&id).unwrap().working_days(table), 5);

        record
            .book(d("2026-04-02"), d("2026-04-07"), None)
            .unwrap();
        let balance = record.balance(table);
        assert_eq!(balance.available, 25);
        assert_eq!(balance.used, 7);
        assert_eq!(balance.remaining, 18);
    }

    #[test]
    fn test_entries_stay_ordered() {
        let mut record = LeaveRecord::new(25);
        record.book(d("2026-08-03"), d("2026-08-07"), None).unwrap();
        record.book(d("2026-02-02"), d("2026-02-03"), None).unwrap();
        record.book(d("2026-05-11"), d("2026-05-11"), None).unwrap();
        let starts: Vec<String> = record
            .entries()
            .iter()
            .map(|e| e.from_date().to_string())
            .collect();
        assert_eq!(starts, vec!["2026-02-02", "2026-05-11", "2026-08-03"]);
    }

    #[test]
    fn test_overlapping_bookings_are_allowed() {
        let mut record = LeaveRecord::new(25);
        record.book(d("2026-02-02"), d("2026-02-06"), None).unwrap();
        record.book(d("2026-02-05"), d("2026-02-10"), None).unwrap();
        assert_eq!(record.entries().len(), 2);
        assert!(record.entries()[0].overlaps(&record.entries()[1]));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut record = LeaveRecord::new(25);
        let entry = LeaveEntry::new("same", d("2026-02-02"), d("2026-02-02"), None).unwrap();
        record.insert(entry.clone()).unwrap();
        assert!(record.insert(entry).is_err());
    }

    #[test]
    fn test_cancel() {
        let mut record = LeaveRecord::new(10);
        let id = record
            .book(d("2026-02-02"), d("2026-02-06"), None)
            .unwrap()
            .id()
            .to_string();
        let removed = record.cancel(&id).unwrap();
        assert_eq!(removed.from_date(), d("2026-02-02"));
        assert!(record.entries().is_empty());
        let err = record.cancel(&id).unwrap_err();
        assert!(err.to_string().contains("Leave entry not found"));
    }

    #[test]
    fn test_over_booking_goes_negative() {
        let table = BankHolidayTable::england_and_wales();
        let mut record = LeaveRecord::new(3);
        record.book(d("2026-02-02"), d("2026-02-06"), None).unwrap();
        assert_eq!(record.balance(table).remaining, -2);
        assert!(record.balance(table).is_overbooked());
        record.set_available_days(5);
        assert!(!record.balance(table).is_overbooked());
    }

    #[test]
    fn test_overlay() {
        let mut record = LeaveRecord::new(25);
        record.book(d("2026-01-29"), d("2026-02-02"), None).unwrap();
        let overlay = record.overlay(YearMonth::new(2026, 2).unwrap());
        assert_eq!(overlay.len(), 2);
        assert!(overlay.contains(&d("2026-02-01")));
        assert!(overlay.contains(&d("2026-02-02")));
    }
}
