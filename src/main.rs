use std::{collections::HashMap, path::PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use habit_tracker::{
    BackendClient, CompletionStore, DayLabeler, DayStatus, Direction, Granularity, HabitName,
    HabitStore, PeriodView, PgStore, SystemClock, Toggle, Tracker, config::AppConfig,
    month_blocks, report, shift_period,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "habit-tracker")]
#[command(about = "Track daily habits and their completion over calendar periods")]
struct Args {
    /// Storage backend; defaults to postgres when a database URL is configured
    #[arg(long, value_enum, global = true)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Rest,
    Postgres,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage habits
    Habits {
        #[command(subcommand)]
        action: HabitsAction,
    },
    /// Mark a habit done today, or undo it
    Toggle { habit_id: String },
    /// Show which habits are done today
    Today,
    /// Print the completion grid of a period
    Grid {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Export a period's summaries as CSV
    Report {
        #[command(flatten)]
        period: PeriodArgs,
        /// Directory the report is written to
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum HabitsAction {
    List,
    Add { name: String },
    Rename { habit_id: String, name: String },
    Remove { habit_id: String },
}

#[derive(clap::Args, Debug)]
struct PeriodArgs {
    /// week, month, quarter, semester or year
    #[arg(long)]
    view: Option<Granularity>,
    /// Any day inside the period (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Periods to move back (negative) or forward (positive)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    shift: i32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("habit_tracker=debug");

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let backend = args.backend.unwrap_or(if config.database.url.is_some() {
        Backend::Postgres
    } else {
        Backend::Rest
    });

    rt.block_on(async {
        match backend {
            Backend::Rest => {
                let client = BackendClient::new(&config.backend, &config.network)?;
                tracing::debug!("Using table API backend");
                run(client, &config, args.command).await
            }
            Backend::Postgres => {
                let url = config
                    .database
                    .url
                    .as_deref()
                    .context("--backend postgres needs database.url or DATABASE_URL")?;
                let store = PgStore::connect(url)
                    .await
                    .context("Failed to connect to PostgreSQL")?;
                run(store, &config, args.command).await
            }
        }
    })
}

async fn run<S>(store: S, config: &AppConfig, command: Command) -> Result<()>
where
    S: HabitStore + CompletionStore,
{
    let zone = config.tracker.reference_zone()?;
    let tracker = Tracker::new(store, SystemClock, zone, config.tracker.owner_id.clone());
    let labels = config.display.locale.labeler();

    match command {
        Command::Habits { action } => manage_habits(&tracker, action).await,
        Command::Toggle { habit_id } => {
            match tracker.toggle_today(&habit_id).await? {
                Toggle::Marked(completion) => println!("Marked {habit_id} done on {}", completion.day),
                Toggle::Cleared => println!("Cleared {habit_id} for {}", tracker.today()),
            }
            Ok(())
        }
        Command::Today => {
            println!("{}", labels.long_date(tracker.today()));
            for entry in tracker.today_status().await? {
                let mark = if entry.done { '#' } else { ' ' };
                println!("[{mark}] {}  ({})", entry.habit.name, entry.habit.id);
            }
            Ok(())
        }
        Command::Grid { period } => {
            let (granularity, reference) = resolve_period(&tracker, config, &period);
            let view = tracker.period_view(granularity, reference).await?;
            print_view(&view, &*labels, reference == tracker.today());
            Ok(())
        }
        Command::Report { period, out } => {
            let (granularity, reference) = resolve_period(&tracker, config, &period);
            let view = tracker.period_view(granularity, reference).await?;
            let path = report::export_csv(&out, &view, &SystemClock).await?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

async fn manage_habits<S>(tracker: &Tracker<S, SystemClock>, action: HabitsAction) -> Result<()>
where
    S: HabitStore + CompletionStore,
{
    let store = tracker.store();
    let owner = tracker.owner();

    match action {
        HabitsAction::List => {
            for habit in store.list_habits(owner).await? {
                println!("{}  {}", habit.id, habit.name);
            }
        }
        HabitsAction::Add { name } => {
            let habit = store.create_habit(owner, &HabitName::parse(&name)?).await?;
            println!("{}  {}", habit.id, habit.name);
        }
        HabitsAction::Rename { habit_id, name } => {
            let habit = store
                .rename_habit(owner, &habit_id, &HabitName::parse(&name)?)
                .await?;
            println!("{}  {}", habit.id, habit.name);
        }
        HabitsAction::Remove { habit_id } => {
            store.delete_habit(owner, &habit_id).await?;
            println!("Removed {habit_id}");
        }
    }
    Ok(())
}

/// Granularity and reference date after applying `--shift`.
fn resolve_period<S, C>(
    tracker: &Tracker<S, C>,
    config: &AppConfig,
    args: &PeriodArgs,
) -> (Granularity, NaiveDate)
where
    S: HabitStore + CompletionStore,
    C: habit_tracker::Clock,
{
    let granularity = args.view.unwrap_or(config.tracker.default_view);
    let direction = if args.shift < 0 {
        Direction::Previous
    } else {
        Direction::Next
    };

    let reference = (0..args.shift.unsigned_abs()).fold(
        args.date.unwrap_or_else(|| tracker.today()),
        |day, _| shift_period(day, granularity, direction),
    );
    (granularity, reference)
}

fn print_view(view: &PeriodView, labels: &dyn DayLabeler, is_current: bool) {
    let period = &view.period;
    let granularity = period.granularity;

    if is_current {
        println!("{}", labels.period_caption(granularity));
    }
    println!(
        "{} - {}",
        labels.long_date(period.start),
        labels.long_date(period.end)
    );

    let width = view
        .rows
        .iter()
        .map(|row| row.habit.name.chars().count())
        .max()
        .unwrap_or(0);

    match granularity {
        Granularity::Week | Granularity::Month => {
            let header: Vec<String> = period
                .days
                .iter()
                .map(|day| format!("{:>2}", labels.day_header(*day, granularity)))
                .collect();
            println!("{:width$}  {}", "", header.join(" "));

            for row in &view.rows {
                let cells: Vec<String> = row
                    .statuses
                    .iter()
                    .map(|status| format!("{:>2}", status.symbol()))
                    .collect();
                println!(
                    "{:width$}  {}  {}/{} {}%",
                    row.habit.name,
                    cells.join(" "),
                    row.summary.completed,
                    row.summary.total,
                    row.summary.percentage
                );
            }
        }
        Granularity::Quarter | Granularity::Semester | Granularity::Year => {
            let blocks = month_blocks(period);
            for row in &view.rows {
                let statuses: HashMap<NaiveDate, DayStatus> = period
                    .days
                    .iter()
                    .copied()
                    .zip(row.statuses.iter().copied())
                    .collect();

                println!(
                    "{}  {}/{} {}%",
                    row.habit.name,
                    row.summary.completed,
                    row.summary.total,
                    row.summary.percentage
                );
                for block in &blocks {
                    let chunks: Vec<String> = block
                        .chunks
                        .iter()
                        .map(|chunk| {
                            chunk
                                .iter()
                                .map(|day| {
                                    statuses
                                        .get(day)
                                        .map_or(DayStatus::Neutral.symbol(), DayStatus::symbol)
                                })
                                .collect()
                        })
                        .collect();
                    println!("  {:<11} {}", labels.month_name(block.month), chunks.join(" "));
                }
            }
        }
    }

    println!(
        "{:width$}  {}/{} {}%",
        "Total", view.overall.completed, view.overall.total, view.overall.percentage
    );
}
