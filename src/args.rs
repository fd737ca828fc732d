//! These structs provide the CLI interface for the attend CLI.

use crate::calendar::{DateKey, ExclusionKind, YearMonth};
use crate::model::{ProfileUpdate, UserId};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// attend: track office attendance against a monthly target, and book leave.
///
/// Each month has a working-day pool: the days of the month minus weekends, bank holidays
/// (England and Wales) and any days you exclude. You mark the days you were in the office and
/// attend tells you whether you are on track for the percentage of the pool you are required to
/// attend.
///
/// Start with `attend init`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and the database.
    ///
    /// The user given with --user becomes the default user for every other command. If you do not
    /// give one, a new user ID is generated.
    Init(InitArgs),
    /// Show or edit your profile.
    Profile(ProfileArgs),
    /// Mark office days and exclusions, and see how a month is going.
    Office(OfficeArgs),
    /// Book and cancel leave and set your yearly allowance.
    Leave(LeaveArgs),
    /// List the bank holidays attend knows about.
    Holidays(HolidaysArgs),
    /// Write a JSON snapshot of your records to the backups directory.
    Backup(BackupArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where attend data and configuration is held. Defaults to ~/attend
    #[arg(long, env = "ATTEND_HOME", default_value_t = default_attend_home())]
    attend_home: DisplayPath,

    /// The user to act for. Defaults to the user in config.json.
    #[arg(long, env = "ATTEND_USER", global = true)]
    user: Option<UserId>,
}

impl Common {
    pub fn new(log_level: LevelFilter, attend_home: PathBuf, user: Option<UserId>) -> Self {
        Self {
            log_level,
            attend_home: attend_home.into(),
            user,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn attend_home(&self) -> &DisplayPath {
        &self.attend_home
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }
}

/// Profile fields that can be given on the command line.
#[derive(Debug, Parser, Clone, Default)]
pub struct ProfileFields {
    /// Your name, as you would like it shown.
    #[arg(long)]
    display_name: Option<String>,

    #[arg(long)]
    email: Option<String>,
}

impl ProfileFields {
    pub fn new(display_name: Option<String>, email: Option<String>) -> Self {
        Self {
            display_name,
            email,
        }
    }

    pub fn update(&self) -> ProfileUpdate {
        ProfileUpdate {
            display_name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// (Not shown): Args for the `attend init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    #[clap(flatten)]
    profile: ProfileFields,
}

impl InitArgs {
    pub fn new(profile: ProfileFields) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ProfileFields {
        &self.profile
    }
}

#[derive(Debug, Parser, Clone)]
pub struct ProfileArgs {
    #[command(subcommand)]
    command: ProfileCommand,
}

impl ProfileArgs {
    pub fn command(&self) -> &ProfileCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    /// Show your profile.
    Show,
    /// Change the given fields of your profile and leave the others as they are.
    Set(ProfileFields),
}

#[derive(Debug, Parser, Clone)]
pub struct OfficeArgs {
    #[command(subcommand)]
    command: OfficeCommand,
}

impl OfficeArgs {
    pub fn command(&self) -> &OfficeCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum OfficeCommand {
    /// Show a month as a calendar together with its attendance summary.
    Show(OfficeShowArgs),
    /// Toggle each date in or out of your office days. A date that is excluded has its exclusion
    /// removed instead.
    Tap(DatesArgs),
    /// Toggle each date between excluded and not excluded.
    Hold(DatesArgs),
    /// Exclude each date from the working-day pool.
    Exclude(ExcludeArgs),
    /// Remove the exclusion on each date.
    Include(DatesArgs),
    /// Change the settings of a month.
    Settings(OfficeSettingsArgs),
    /// Summarize every month that has been recorded.
    History,
}

/// (Not shown): Args for the `attend office show` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct OfficeShowArgs {
    /// The month to show, e.g. 2026-02. Defaults to the current month.
    #[arg(long)]
    month: Option<YearMonth>,

    /// Move this many months forward (or back, if negative) from --month.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    offset: i32,

    /// Fill the first and last week of the calendar with days from the neighbouring months.
    #[arg(long)]
    spill_over: bool,
}

impl OfficeShowArgs {
    pub fn new(month: Option<YearMonth>, offset: i32, spill_over: bool) -> Self {
        Self {
            month,
            offset,
            spill_over,
        }
    }

    pub fn month(&self) -> Option<YearMonth> {
        self.month
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn spill_over(&self) -> bool {
        self.spill_over
    }
}

/// (Not shown): One or more dates, e.g. `2026-02-02 2026-02-03`.
#[derive(Debug, Parser, Clone)]
pub struct DatesArgs {
    #[arg(required = true)]
    dates: Vec<DateKey>,
}

impl DatesArgs {
    pub fn new(dates: Vec<DateKey>) -> Self {
        Self { dates }
    }

    pub fn dates(&self) -> &[DateKey] {
        &self.dates
    }
}

/// (Not shown): Args for the `attend office exclude` command.
#[derive(Debug, Parser, Clone)]
pub struct ExcludeArgs {
    #[clap(flatten)]
    dates: DatesArgs,

    /// "excluded" removes the days from the pool, "holiday" treats them like bank holidays.
    #[arg(long, default_value_t = ExclusionKind::Excluded)]
    kind: ExclusionKind,
}

impl ExcludeArgs {
    pub fn new(dates: Vec<DateKey>, kind: ExclusionKind) -> Self {
        Self {
            dates: DatesArgs::new(dates),
            kind,
        }
    }

    pub fn dates(&self) -> &[DateKey] {
        self.dates.dates()
    }

    pub fn kind(&self) -> ExclusionKind {
        self.kind
    }
}

/// (Not shown): Args for the `attend office settings` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct OfficeSettingsArgs {
    /// The month to change. Defaults to the current month.
    #[arg(long)]
    month: Option<YearMonth>,

    /// The percentage of working days you are expected in the office, 0 to 100.
    #[arg(long)]
    required_percentage: Option<u8>,

    /// Whether Saturdays and Sundays are taken out of the working-day pool.
    #[arg(long)]
    exclude_weekends: Option<bool>,

    /// Whether bank holidays are taken out of the working-day pool.
    #[arg(long)]
    exclude_bank_holidays: Option<bool>,
}

impl OfficeSettingsArgs {
    pub fn new(
        month: Option<YearMonth>,
        required_percentage: Option<u8>,
        exclude_weekends: Option<bool>,
        exclude_bank_holidays: Option<bool>,
    ) -> Self {
        Self {
            month,
            required_percentage,
            exclude_weekends,
            exclude_bank_holidays,
        }
    }

    pub fn month(&self) -> Option<YearMonth> {
        self.month
    }

    pub fn required_percentage(&self) -> Option<u8> {
        self.required_percentage
    }

    pub fn exclude_weekends(&self) -> Option<bool> {
        self.exclude_weekends
    }

    pub fn exclude_bank_holidays(&self) -> Option<bool> {
        self.exclude_bank_holidays
    }

    pub fn is_empty(&self) -> bool {
        self.required_percentage.is_none()
            && self.exclude_weekends.is_none()
            && self.exclude_bank_holidays.is_none()
    }
}

#[derive(Debug, Parser, Clone)]
pub struct LeaveArgs {
    #[command(subcommand)]
    command: LeaveCommand,
}

impl LeaveArgs {
    pub fn command(&self) -> &LeaveCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum LeaveCommand {
    /// Show your bookings and how many days you have left.
    Show,
    /// Book leave from one date to another, both included.
    Book(LeaveBookArgs),
    /// Cancel a booking by its ID.
    Cancel(LeaveCancelArgs),
    /// Set the number of days of leave available to you.
    Allowance(LeaveAllowanceArgs),
}

/// (Not shown): Args for the `attend leave book` command.
#[derive(Debug, Parser, Clone)]
pub struct LeaveBookArgs {
    #[arg(long)]
    from: DateKey,

    #[arg(long)]
    to: DateKey,

    #[arg(long)]
    note: Option<String>,
}

impl LeaveBookArgs {
    pub fn new(from: DateKey, to: DateKey, note: Option<String>) -> Self {
        Self { from, to, note }
    }

    pub fn from(&self) -> DateKey {
        self.from
    }

    pub fn to(&self) -> DateKey {
        self.to
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

#[derive(Debug, Parser, Clone)]
pub struct LeaveCancelArgs {
    /// The ID shown by `attend leave show`, e.g. leave-3f2b0c4e9a1d4b7c8e6f5a4b3c2d1e0f
    id: String,
}

impl LeaveCancelArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Parser, Clone)]
pub struct LeaveAllowanceArgs {
    days: u32,
}

impl LeaveAllowanceArgs {
    pub fn new(days: u32) -> Self {
        Self { days }
    }

    pub fn days(&self) -> u32 {
        self.days
    }
}

/// (Not shown): Args for the `attend holidays` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct HolidaysArgs {
    /// Only list the holidays of this year.
    #[arg(long)]
    year: Option<i32>,
}

impl HolidaysArgs {
    pub fn new(year: Option<i32>) -> Self {
        Self { year }
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }
}

/// (Not shown): Args for the `attend backup` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct BackupArgs {
    /// Also copy the SQLite database file.
    #[arg(long)]
    sqlite: bool,
}

impl BackupArgs {
    pub fn new(sqlite: bool) -> Self {
        Self { sqlite }
    }

    pub fn sqlite(&self) -> bool {
        self.sqlite
    }
}

fn default_attend_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("attend"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --attend-home or ATTEND_HOME instead of relying on the default \
                attend home directory.",
            );
            PathBuf::from("attend")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
