//! Office tracker commands.
//!
//! Mutating commands group their dates by month, apply the change to each month's record and save
//! it, then report the month's summary after the change.

use crate::args::{ExcludeArgs, OfficeSettingsArgs, OfficeShowArgs};
use crate::calendar::{
    calendar_grid, BankHolidayTable, ComplianceCalculator, ComplianceStatus, ComplianceSummary,
    DateKey, DayKind, DayView, ExclusionKind, GridFill, YearMonth,
};
use crate::commands::{plural, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{DayChange, OfficeTrackerRecord, UserId};
use crate::{Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write;
use tracing::{debug, warn};

/// A month's summary together with the classification of each of its days.
#[derive(Debug, Clone, Serialize)]
pub struct MonthReport {
    pub summary: ComplianceSummary,
    pub days: Vec<DayView>,
}

/// What a command did to one date. `change` is `None` when the date was left as it was.
#[derive(Debug, Clone, Serialize)]
pub struct DateChange {
    pub date: DateKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<DayChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfficeChanges {
    pub changes: Vec<DateChange>,
    /// One summary per month touched, after the changes.
    pub summaries: Vec<ComplianceSummary>,
}

/// Shows a month as a calendar grid followed by its summary.
pub async fn office_show(
    config: Config,
    user: &UserId,
    args: &OfficeShowArgs,
) -> Result<Out<MonthReport>> {
    let base = args.month().unwrap_or_else(YearMonth::current);
    let month = base
        .add_months(args.offset())
        .with_context(|| format!("Cannot move {} months from {base}", args.offset()))
        .pub_result(ErrorType::Request)?;

    let record = config
        .records(user)
        .office(month, config.office_defaults())
        .await
        .pub_result(ErrorType::Database)?;
    let leave = leave_days(&config, user, month).await?;

    let calc = ComplianceCalculator::default();
    let summary = record.evaluate(&calc, leave.as_ref());
    let days = record.month_view(&calc, leave.as_ref());
    warn_uncovered(&summary);

    let fill = if args.spill_over() {
        GridFill::SpillOver
    } else {
        GridFill::Blank
    };
    let mut message = render_month(month, &days, fill);
    message.push('\n');
    message.push_str(&describe(&summary));
    Ok(Out::new(message, MonthReport { summary, days }))
}

/// Toggles each date in or out of the office days, clearing an exclusion first if there is one.
pub async fn office_tap(
    config: Config,
    user: &UserId,
    dates: &[DateKey],
) -> Result<Out<OfficeChanges>> {
    let changes = apply(&config, user, dates, |record, date| {
        record.tap(date).map(Some)
    })
    .await?;
    Ok(changes_out(changes))
}

/// Toggles each date between excluded and not excluded.
pub async fn office_hold(
    config: Config,
    user: &UserId,
    dates: &[DateKey],
) -> Result<Out<OfficeChanges>> {
    let changes = apply(&config, user, dates, |record, date| {
        record.hold(date).map(Some)
    })
    .await?;
    Ok(changes_out(changes))
}

/// Excludes each date with the given kind. An office mark on the date is removed.
pub async fn office_exclude(
    config: Config,
    user: &UserId,
    args: &ExcludeArgs,
) -> Result<Out<OfficeChanges>> {
    let kind = args.kind();
    let changes = apply(&config, user, args.dates(), |record, date| {
        if record.exclusion(date) == Some(kind) {
            return Ok(None);
        }
        record.add_exclusion(date, kind)?;
        Ok(Some(DayChange::Excluded))
    })
    .await?;
    Ok(changes_out(changes))
}

/// Removes the exclusion on each date. The dates do not become office days.
pub async fn office_include(
    config: Config,
    user: &UserId,
    dates: &[DateKey],
) -> Result<Out<OfficeChanges>> {
    let changes = apply(&config, user, dates, |record, date| {
        let removed = record.remove_exclusion(date)?;
        if !removed {
            debug!("{date} was not excluded");
        }
        Ok(removed.then_some(DayChange::Included))
    })
    .await?;
    Ok(changes_out(changes))
}

/// Changes the settings of a month and saves them with the month's record.
pub async fn office_settings(
    config: Config,
    user: &UserId,
    args: &OfficeSettingsArgs,
) -> Result<Out<ComplianceSummary>> {
    let month = args.month().unwrap_or_else(YearMonth::current);
    let records = config.records(user);
    let mut record = records
        .office(month, config.office_defaults())
        .await
        .pub_result(ErrorType::Database)?;

    if let Some(pct) = args.required_percentage() {
        record
            .set_required_percentage(pct)
            .pub_result(ErrorType::Request)?;
    }
    if let Some(value) = args.exclude_weekends() {
        record.set_exclude_weekends(value);
    }
    if let Some(value) = args.exclude_bank_holidays() {
        record.set_exclude_bank_holidays(value);
    }
    if !args.is_empty() {
        records
            .save_office(&record)
            .await
            .pub_result(ErrorType::Database)?;
    }

    let rules = record.rules();
    let summary = evaluate(&config, user, &record).await?;
    let message = format!(
        "{month}: {}% required, weekends {}, bank holidays {}\n{}",
        rules.required_percentage,
        if rules.exclude_weekends { "excluded" } else { "included" },
        if rules.exclude_bank_holidays {
            "excluded"
        } else {
            "included"
        },
        describe(&summary)
    );
    Ok(Out::new(message, summary))
}

/// Summarizes every month the user has a record for, oldest first.
pub async fn office_history(config: Config, user: &UserId) -> Result<Out<Vec<ComplianceSummary>>> {
    let records = config
        .records(user)
        .office_history()
        .await
        .pub_result(ErrorType::Database)?;

    let mut summaries = Vec::with_capacity(records.len());
    for record in &records {
        summaries.push(evaluate(&config, user, record).await?);
    }

    if summaries.is_empty() {
        return Ok(Out::new("No months have been recorded yet", summaries));
    }
    let mut message = String::new();
    for s in &summaries {
        let _ = writeln!(
            message,
            "{}  {:>2}/{:<2} office days  {:>3}%  {}",
            s.month, s.selected_office_days, s.required_office_days, s.progress_percentage, s.status
        );
    }
    Ok(Out::new(message.trim_end().to_string(), summaries))
}

/// Lays out the classified days of `month` as a Monday-first calendar with one marker per day.
pub fn render_month(month: YearMonth, days: &[DayView], fill: GridFill) -> String {
    let by_date: HashMap<DateKey, &DayView> = days.iter().map(|d| (d.date, d)).collect();
    let mut out = String::new();
    let _ = writeln!(out, "{}", month.first_day().date().format("%B %Y"));
    out.push_str(" Mo  Tu  We  Th  Fr  Sa  Su\n");
    for week in calendar_grid(month, fill) {
        let cells: Vec<String> = week
            .iter()
            .map(|slot| match slot {
                None => "   ".to_string(),
                Some(date) => match by_date.get(date) {
                    Some(view) => format!("{:>2}{}", date.day(), marker(view.kind)),
                    None => format!("{:>2}-", date.day()),
                },
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join(" ").trim_end());
    }
    out.push_str("* office  . working  B bank holiday  H holiday  x excluded  L leave");
    if fill == GridFill::SpillOver {
        out.push_str("  - other month");
    }
    out.push('\n');
    out
}

fn marker(kind: DayKind) -> char {
    match kind {
        DayKind::Office => '*',
        DayKind::Working => '.',
        DayKind::Weekend => ' ',
        DayKind::BankHoliday => 'B',
        DayKind::HolidayOverride => 'H',
        DayKind::Excluded => 'x',
        DayKind::Leave => 'L',
    }
}

/// A short description of a summary, e.g. for the end of a command's message.
fn describe(s: &ComplianceSummary) -> String {
    let mut text = format!(
        "{}: {} of {} required office days ({}%), {}. {} in the pool \
         ({} weekend, {} bank holiday, {} excluded, {} leave).",
        s.month,
        s.selected_office_days,
        s.required_office_days,
        s.progress_percentage,
        s.status,
        plural(s.working_days as usize, "working day"),
        s.weekend_days,
        s.bank_holiday_days,
        s.excluded_days,
        s.leave_days,
    );
    if s.status != ComplianceStatus::OnTrack {
        let _ = write!(
            text,
            " {} needed.",
            plural(s.remaining_office_days as usize, "more office day")
        );
    }
    if !s.holidays_covered {
        text.push_str(" Bank holidays are not known for this month.");
    }
    text
}

fn warn_uncovered(summary: &ComplianceSummary) {
    if summary.holidays_covered {
        return;
    }
    match BankHolidayTable::england_and_wales().covered_years() {
        Some(years) => warn!(
            "Bank holidays are only known for {} to {}, {} is treated as having none",
            years.start(),
            years.end(),
            summary.month
        ),
        None => warn!("No bank holidays are known"),
    }
}

/// The user's booked leave in `month`, when leave is overlaid on the office tracker.
async fn leave_days(
    config: &Config,
    user: &UserId,
    month: YearMonth,
) -> Result<Option<BTreeSet<DateKey>>> {
    if !config.leave_overlay() {
        return Ok(None);
    }
    let leave = config
        .records(user)
        .leave(config.leave_allowance())
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Some(leave.overlay(month)))
}

async fn evaluate(
    config: &Config,
    user: &UserId,
    record: &OfficeTrackerRecord,
) -> Result<ComplianceSummary> {
    let leave = leave_days(config, user, record.month()).await?;
    let summary = record.evaluate(&ComplianceCalculator::default(), leave.as_ref());
    warn_uncovered(&summary);
    Ok(summary)
}

async fn apply<F>(
    config: &Config,
    user: &UserId,
    dates: &[DateKey],
    mut change: F,
) -> Result<OfficeChanges>
where
    F: FnMut(&mut OfficeTrackerRecord, DateKey) -> Result<Option<DayChange>>,
{
    let mut by_month: BTreeMap<YearMonth, Vec<DateKey>> = BTreeMap::new();
    for date in dates {
        by_month.entry(date.year_month()).or_default().push(*date);
    }

    // Every month is loaded and changed before any is saved. Only a failing save can leave some
    // months written and others not.
    let records = config.records(user);
    let mut changes = Vec::with_capacity(dates.len());
    let mut changed = Vec::with_capacity(by_month.len());
    for (month, dates) in by_month {
        let mut record = records
            .office(month, config.office_defaults())
            .await
            .pub_result(ErrorType::Database)?;
        for date in dates {
            let result = change(&mut record, date).pub_result(ErrorType::Request)?;
            changes.push(DateChange {
                date,
                change: result,
            });
        }
        changed.push(record);
    }

    let mut summaries = Vec::with_capacity(changed.len());
    for record in &changed {
        records
            .save_office(record)
            .await
            .pub_result(ErrorType::Database)?;
        summaries.push(evaluate(config, user, record).await?);
    }
    Ok(OfficeChanges { changes, summaries })
}

fn changes_out(changes: OfficeChanges) -> Out<OfficeChanges> {
    let mut message = String::new();
    for c in &changes.changes {
        let _ = match c.change {
            Some(change) => writeln!(message, "{}: {change}", c.date),
            None => writeln!(message, "{}: unchanged", c.date),
        };
    }
    for summary in &changes.summaries {
        let _ = writeln!(message, "{}", describe(summary));
    }
    Out::new(message.trim_end().to_string(), changes)
}
