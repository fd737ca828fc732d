use crate::args::HolidaysArgs;
use crate::calendar::{BankHolidayTable, DateKey, TABLE_VERSION};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::Result;
use anyhow::anyhow;
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Serialize)]
pub struct Holiday {
    pub date: DateKey,
    pub name: &'static str,
}

/// Lists the England and Wales bank holidays, for one year or for every year in the table.
///
/// # Errors
/// - Returns an error if `year` is outside the years the table covers.
pub async fn holidays(args: &HolidaysArgs) -> Result<Out<Vec<Holiday>>> {
    let table = BankHolidayTable::england_and_wales();
    let years = table
        .covered_years()
        .ok_or_else(|| anyhow!("The bank holiday table is empty"))
        .pub_result(ErrorType::Config)?;

    let selected = match args.year() {
        Some(year) if !years.contains(&year) => {
            return Err(anyhow!(
                "Bank holidays are only known for {} to {}, not {year}",
                years.start(),
                years.end()
            ))
            .pub_result(ErrorType::Request);
        }
        Some(year) => year..=year,
        None => years,
    };

    let list: Vec<Holiday> = selected
        .flat_map(|year| table.holidays_in(year))
        .map(|(date, name)| Holiday { date, name })
        .collect();

    let mut message = String::new();
    for h in &list {
        let _ = writeln!(message, "{}  {}  {}", h.date, h.date.weekday(), h.name);
    }
    let _ = write!(message, "England and Wales, table version {TABLE_VERSION}");
    Ok(Out::new(message, list))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_holidays_for_year() {
        let out = holidays(&HolidaysArgs::new(Some(2026))).await.unwrap();
        let list = out.structure().unwrap();
        assert_eq!(list.len(), 8);
        assert_eq!(list[0].date.to_string(), "2026-01-01");
        let last = list.last().unwrap();
        assert_eq!(last.date.to_string(), "2026-12-28");
        assert_eq!(last.name, "Boxing Day (substitute day)");
        assert!(out.message().contains("2026-04-03  Fri  Good Friday"));
    }

    #[tokio::test]
    async fn test_all_holidays_are_ordered() {
        let out = holidays(&HolidaysArgs::default()).await.unwrap();
        let list = out.structure().unwrap();
        assert_eq!(list.len(), 16);
        assert!(list.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn test_year_outside_table() {
        let err = holidays(&HolidaysArgs::new(Some(2031))).await.unwrap_err();
        assert!(format!("{err:#}").contains("only known for 2025 to 2026"));
    }
}
