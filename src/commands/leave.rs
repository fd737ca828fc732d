use crate::args::{LeaveAllowanceArgs, LeaveBookArgs, LeaveCancelArgs};
use crate::calendar::{BankHolidayTable, DateKey};
use crate::commands::{plural, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{LeaveBalance, LeaveEntry, UserId};
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Write;
use tracing::warn;

/// A booking and the working days it consumes.
#[derive(Debug, Clone, Serialize)]
pub struct BookedLeave {
    #[serde(flatten)]
    pub entry: LeaveEntry,
    pub working_days: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaveReport {
    pub balance: LeaveBalance,
    pub entries: Vec<BookedLeave>,
}

/// Lists the bookings of `user` and their balance.
pub async fn leave_show(config: Config, user: &UserId) -> Result<Out<LeaveReport>> {
    let holidays = BankHolidayTable::england_and_wales();
    let record = config
        .records(user)
        .leave(config.leave_allowance())
        .await
        .pub_result(ErrorType::Database)?;

    let entries: Vec<BookedLeave> = record
        .entries()
        .iter()
        .map(|entry| BookedLeave {
            entry: entry.clone(),
            working_days: entry.working_days(holidays),
        })
        .collect();
    let balance = record.balance(holidays);
    warn_overbooked(&balance);

    let mut message = String::new();
    for booked in &entries {
        let _ = writeln!(message, "{}", describe(booked));
    }
    let _ = write!(message, "{}", describe_balance(&balance));
    Ok(Out::new(message, LeaveReport { balance, entries }))
}

/// Books leave. Overlapping an existing booking is allowed.
///
/// # Errors
/// - Returns an error if the booking ends before it starts.
pub async fn leave_book(
    config: Config,
    user: &UserId,
    args: &LeaveBookArgs,
) -> Result<Out<BookedLeave>> {
    let holidays = BankHolidayTable::england_and_wales();
    warn_uncovered(holidays, args.from(), args.to());

    let records = config.records(user);
    let mut record = records
        .leave(config.leave_allowance())
        .await
        .pub_result(ErrorType::Database)?;
    let entry = record
        .book(args.from(), args.to(), args.note().map(str::to_string))
        .pub_result(ErrorType::Request)?
        .clone();
    records
        .save_leave(&record)
        .await
        .pub_result(ErrorType::Database)?;

    let booked = BookedLeave {
        working_days: entry.working_days(holidays),
        entry,
    };
    let balance = record.balance(holidays);
    warn_overbooked(&balance);
    let message = format!("Booked {}\n{}", describe(&booked), describe_balance(&balance));
    Ok(Out::new(message, booked))
}

/// Cancels the booking with the given ID.
pub async fn leave_cancel(
    config: Config,
    user: &UserId,
    args: &LeaveCancelArgs,
) -> Result<Out<LeaveEntry>> {
    let records = config.records(user);
    let mut record = records
        .leave(config.leave_allowance())
        .await
        .pub_result(ErrorType::Database)?;
    let entry = record.cancel(args.id()).pub_result(ErrorType::Request)?;
    records
        .save_leave(&record)
        .await
        .pub_result(ErrorType::Database)?;

    let balance = record.balance(BankHolidayTable::england_and_wales());
    let message = format!(
        "Cancelled leave from {} to {}\n{}",
        entry.from_date(),
        entry.to_date(),
        describe_balance(&balance)
    );
    Ok(Out::new(message, entry))
}

/// Sets the number of days of leave available to `user`.
pub async fn leave_allowance(
    config: Config,
    user: &UserId,
    args: &LeaveAllowanceArgs,
) -> Result<Out<LeaveBalance>> {
    let records = config.records(user);
    let mut record = records
        .leave(config.leave_allowance())
        .await
        .pub_result(ErrorType::Database)?;
    record.set_available_days(args.days());
    records
        .save_leave(&record)
        .await
        .pub_result(ErrorType::Database)?;

    let balance = record.balance(BankHolidayTable::england_and_wales());
    warn_overbooked(&balance);
    Ok(Out::new(describe_balance(&balance), balance))
}

fn describe(booked: &BookedLeave) -> String {
    let entry = &booked.entry;
    let mut text = format!(
        "{}  {} to {}  {}",
        entry.id(),
        entry.from_date(),
        entry.to_date(),
        plural(booked.working_days as usize, "working day")
    );
    if let Some(note) = entry.note() {
        let _ = write!(text, "  {note}");
    }
    text
}

fn describe_balance(balance: &LeaveBalance) -> String {
    format!(
        "{} of {} used, {} remaining",
        balance.used,
        plural(balance.available as usize, "day"),
        balance.remaining
    )
}

fn warn_overbooked(balance: &LeaveBalance) {
    if balance.is_overbooked() {
        warn!(
            "More leave is booked than is available, {} days over",
            balance.remaining.unsigned_abs()
        );
    }
}

fn warn_uncovered(holidays: &BankHolidayTable, from: DateKey, to: DateKey) {
    if holidays.covers(from) && holidays.covers(to) {
        return;
    }
    warn!(
        "Bank holidays are not known for all of {from} to {to}, every weekday outside the known \
        years is counted as a working day"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{date, TestEnv};

    fn book(from: &str, to: &str) -> LeaveBookArgs {
        LeaveBookArgs::new(date(from), date(to), None)
    }

    #[tokio::test]
    async fn test_book_show_cancel() {
        let env = TestEnv::new().await;
        let user = env.user();

        let out = leave_book(env.config(), &user, &book("2026-02-02", "2026-02-06"))
            .await
            .unwrap();
        let booked = out.structure().unwrap().clone();
        assert_eq!(booked.working_days, 5);
        assert!(out.message().contains("5 of 25 days used, 20 remaining"));

        // Easter 2026: Good Friday and Easter Monday are not counted.
        leave_book(env.config(), &user, &book("2026-04-02", "2026-04-07"))
            .await
            .unwrap();

        let out = leave_show(env.config(), &user).await.unwrap();
        let report = out.structure().unwrap();
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[1].working_days, 2);
        assert_eq!(report.balance.used, 7);
        assert_eq!(report.balance.remaining, 18);

        let args = LeaveCancelArgs::new(booked.entry.id());
        leave_cancel(env.config(), &user, &args).await.unwrap();
        let out = leave_show(env.config(), &user).await.unwrap();
        assert_eq!(out.structure().unwrap().balance.used, 2);

        let err = leave_cancel(env.config(), &user, &args).await.unwrap_err();
        assert!(format!("{err:#}").contains("Leave entry not found"));
    }

    #[tokio::test]
    async fn test_book_inverted_range_is_rejected() {
        let env = TestEnv::new().await;
        let err = leave_book(env.config(), &env.user(), &book("2026-02-06", "2026-02-02"))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").starts_with("request error"));
        let out = leave_show(env.config(), &env.user()).await.unwrap();
        assert!(out.structure().unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn test_allowance() {
        let env = TestEnv::new().await;
        let user = env.user();
        leave_book(env.config(), &user, &book("2026-02-02", "2026-02-06"))
            .await
            .unwrap();
        let out = leave_allowance(env.config(), &user, &LeaveAllowanceArgs::new(3))
            .await
            .unwrap();
        let balance = out.structure().unwrap();
        assert_eq!(balance.available, 3);
        assert_eq!(balance.remaining, -2);
        assert!(balance.is_overbooked());
        assert_eq!(out.message(), "5 of 3 days used, -2 remaining");
    }

    #[tokio::test]
    async fn test_users_are_separate() {
        let env = TestEnv::new().await;
        let other: UserId = "someone-else".parse().unwrap();
        leave_book(env.config(), &other, &book("2026-02-02", "2026-02-02"))
            .await
            .unwrap();
        let out = leave_show(env.config(), &env.user()).await.unwrap();
        assert!(out.structure().unwrap().entries.is_empty());
        let out = leave_show(env.config(), &other).await.unwrap();
        assert_eq!(out.structure().unwrap().entries.len(), 1);
    }
}
