//! Timezone-free date types and calendar arithmetic.
//!
//! `DateKey` is a calendar date that renders as `YYYY-MM-DD` and `YearMonth` is a calendar month that
//! renders as `YYYY-MM`. Both wrap a `chrono::NaiveDate` so ordering is chronological, which also
//! matches the lexicographic ordering of their zero-padded string forms.

use crate::Result;
use anyhow::{bail, Context};
use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar date in the local, unzoned sense.
///
/// # Examples
///
/// ```
/// # use attend::calendar::DateKey;
/// # use std::str::FromStr;
/// let d = DateKey::from_str("2026-02-01").unwrap();
/// assert_eq!(d.to_string(), "2026-02-01");
/// assert!(DateKey::from_str("2026-2-1").is_err());
/// assert!(DateKey::from_str("2026-02-30").is_err());
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .with_context(|| format!("{year:04}-{month:02}-{day:02} is not a valid date"))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    /// The month that this date falls in.
    pub fn year_month(&self) -> YearMonth {
        YearMonth(self.0.with_day(1).unwrap_or(self.0))
    }

    /// Today's date according to the local clock.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }
}

impl Display for DateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        if !has_shape(s, &[4, 7], 10) {
            bail!("'{s}' is not a date in the form YYYY-MM-DD");
        }
        let date = NaiveDate::parse_from_str(s, DATE_FORMAT)
            .with_context(|| format!("'{s}' is not a valid calendar date"))?;
        Ok(Self(date))
    }
}

impl From<NaiveDate> for DateKey {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl Serialize for DateKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateKey::from_str(&s).map_err(|e| serde::de::Error::custom(format!("{e:#}")))
    }
}

/// A calendar month. Internally this is the first day of the month.
///
/// # Examples
///
/// ```
/// # use attend::calendar::YearMonth;
/// # use std::str::FromStr;
/// let m = YearMonth::from_str("2026-02").unwrap();
/// assert_eq!(m.days().count(), 28);
/// assert_eq!(m.add_months(11).unwrap().to_string(), "2027-01");
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .with_context(|| format!("{year:04}-{month:02} is not a valid month"))
    }

    /// The month containing today's date according to the local clock.
    pub fn current() -> Self {
        DateKey::today().year_month()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> DateKey {
        DateKey(self.0)
    }

    pub fn last_day(&self) -> DateKey {
        self.days().last().unwrap_or(DateKey(self.0))
    }

    /// Every date of the month, in order.
    pub fn days(&self) -> impl Iterator<Item = DateKey> {
        let month = self.0.month();
        self.0
            .iter_days()
            .take_while(move |d| d.month() == month)
            .map(DateKey)
    }

    pub fn contains(&self, date: DateKey) -> bool {
        date.year_month() == *self
    }

    /// Moves forward (or backward when `n` is negative) by `n` months. Returns `None` if the result
    /// is outside the range chrono can represent.
    pub fn add_months(&self, n: i32) -> Option<Self> {
        let months = Months::new(n.unsigned_abs());
        let moved = if n >= 0 {
            self.0.checked_add_months(months)
        } else {
            self.0.checked_sub_months(months)
        };
        moved.map(Self)
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.0.year(), self.0.month())
    }
}

impl FromStr for YearMonth {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        if !has_shape(s, &[4], 7) {
            bail!("'{s}' is not a month in the form YYYY-MM");
        }
        let year: i32 = s[..4]
            .parse()
            .with_context(|| format!("'{s}' has an invalid year"))?;
        let month: u32 = s[5..]
            .parse()
            .with_context(|| format!("'{s}' has an invalid month"))?;
        Self::new(year, month)
    }
}

impl From<DateKey> for YearMonth {
    fn from(value: DateKey) -> Self {
        value.year_month()
    }
}

impl Serialize for YearMonth {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        YearMonth::from_str(&s).map_err(|e| serde::de::Error::custom(format!("{e:#}")))
    }
}

/// True if `s` is `len` bytes long with a `-` at each of `dashes` and an ASCII digit everywhere else.
fn has_shape(s: &str, dashes: &[usize], len: usize) -> bool {
    s.len() == len
        && s.bytes().enumerate().all(|(ix, b)| {
            if dashes.contains(&ix) {
                b == b'-'
            } else {
                b.is_ascii_digit()
            }
        })
}

/// True if the date is a Saturday or a Sunday.
pub fn is_weekend(date: DateKey) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The inclusive, ordered sequence of dates from `start` to `end`. Empty if `start > end`.
pub fn days_in_range(start: DateKey, end: DateKey) -> Vec<DateKey> {
    if start > end {
        return Vec::new();
    }
    start
        .0
        .iter_days()
        .take_while(|d| *d <= end.0)
        .map(DateKey)
        .collect()
}

/// Moves `date` by `n` months. The result is always the first day of the resulting month.
pub fn add_months(date: DateKey, n: i32) -> Option<DateKey> {
    date.year_month().add_months(n).map(|m| m.first_day())
}

/// What to put in the grid slots that fall before the first or after the last day of the month.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridFill {
    /// Leave the slots empty.
    #[default]
    Blank,
    /// Fill the slots with the dates from the neighbouring months.
    SpillOver,
}

/// One row of a month grid, Monday first.
pub type Week = [Option<DateKey>; 7];

/// Lays out `month` as complete Monday-first weeks.
pub fn calendar_grid(month: YearMonth, fill: GridFill) -> Vec<Week> {
    let first = month.first_day().date();
    let last = month.last_day().date();
    let lead = u64::from(first.weekday().num_days_from_monday());
    let start = first.checked_sub_days(Days::new(lead)).unwrap_or(first);

    let mut cells: Vec<Option<DateKey>> = Vec::new();
    for day in start.iter_days() {
        if day > last && cells.len() % 7 == 0 {
            break;
        }
        let in_month = day >= first && day <= last;
        cells.push(if in_month || fill == GridFill::SpillOver {
            Some(DateKey(day))
        } else {
            None
        });
    }

    cells
        .chunks(7)
        .filter_map(|week| Week::try_from(week).ok())
        .collect()
}
