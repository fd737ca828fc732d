use attend::args::{Args, Command, LeaveCommand, OfficeCommand, ProfileCommand};
use attend::{commands, Config, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().attend_home().path();

    if let Command::Init(init_args) = args.command() {
        commands::init(home, args.common().user(), init_args)
            .await?
            .print();
        return Ok(());
    }
    if let Command::Holidays(holidays_args) = args.command() {
        commands::holidays(holidays_args).await?.print();
        return Ok(());
    }

    let config = Config::load(home).await?;
    let user = config.resolve_user(args.common().user());
    debug!("Acting for user '{user}'");

    let _: () = match args.command() {
        Command::Init(_) | Command::Holidays(_) => {}

        Command::Profile(profile_args) => match profile_args.command() {
            ProfileCommand::Show => commands::profile_show(config, &user).await?.print(),
            ProfileCommand::Set(fields) => {
                commands::profile_set(config, &user, fields).await?.print()
            }
        },

        Command::Office(office_args) => match office_args.command() {
            OfficeCommand::Show(show) => commands::office_show(config, &user, show).await?.print(),
            OfficeCommand::Tap(dates) => commands::office_tap(config, &user, dates.dates())
                .await?
                .print(),
            OfficeCommand::Hold(dates) => commands::office_hold(config, &user, dates.dates())
                .await?
                .print(),
            OfficeCommand::Exclude(exclude) => {
                commands::office_exclude(config, &user, exclude)
                    .await?
                    .print()
            }
            OfficeCommand::Include(dates) => {
                commands::office_include(config, &user, dates.dates())
                    .await?
                    .print()
            }
            OfficeCommand::Settings(settings) => {
                commands::office_settings(config, &user, settings)
                    .await?
                    .print()
            }
            OfficeCommand::History => commands::office_history(config, &user).await?.print(),
        },

        Command::Leave(leave_args) => match leave_args.command() {
            LeaveCommand::Show => commands::leave_show(config, &user).await?.print(),
            LeaveCommand::Book(book) => commands::leave_book(config, &user, book).await?.print(),
            LeaveCommand::Cancel(cancel) => commands::leave_cancel(config, &user, cancel)
                .await?
                .print(),
            LeaveCommand::Allowance(allowance) => {
                commands::leave_allowance(config, &user, allowance)
                    .await?
                    .print()
            }
        },

        Command::Backup(backup_args) => commands::backup(config, &user, backup_args)
            .await?
            .print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        // RUST_LOG wins when it is set.
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(format!(
            "{}={},{}={}",
            env!("CARGO_CRATE_NAME"),
            level,
            env!("CARGO_BIN_NAME"),
            level
        )),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
