use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};

use streakboard::config::Settings;
use streakboard::engdb::{self, profiles};
use streakboard::ghapi::GithubClient;
use streakboard::models::NewStatusReport;
use streakboard::tasks::{self, Task, TaskContext};
use streakboard::{EngagementError, leaderboard, streak};

#[derive(Parser)]
#[command(name = "streakboard", version, about = "Streaks, clubs and leaderboard scoring")]
struct Cli {
    /// SQLite database to use (overrides STREAKBOARD_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database tables
    Init,
    /// Register a user
    AddUser {
        username: String,
        /// GitHub login used to match synced contributors
        #[arg(long)]
        github: Option<String>,
    },
    /// Submit a daily status report
    CheckIn(CheckInArgs),
    /// Show one user's stats
    Profile { username: String },
    /// Print the top users by score
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Sync GitHub contributors and their clubs
    SyncContributors(TaskArgs),
    /// Re-derive every user's club membership
    RecomputeClubs(TaskArgs),
    /// Rewrite every cached score from the points ledger
    RecomputeLeaderboard(TaskArgs),
    /// List users whose streak breaks unless they check in today
    CheckInReminders(TaskArgs),
}

#[derive(Args)]
struct TaskArgs {
    /// Compute and log without writing
    #[arg(long)]
    dry_run: bool,
    /// Run as of this day (YYYY-MM-DD) instead of today
    #[arg(long, value_parser = parse_date_arg)]
    date: Option<NaiveDate>,
}

#[derive(Args)]
struct CheckInArgs {
    username: String,
    /// Day of the check-in (YYYY-MM-DD), defaults to today
    #[arg(long, value_parser = parse_date_arg)]
    date: Option<NaiveDate>,
    #[arg(long, default_value = "")]
    previous_work: String,
    #[arg(long, default_value = "")]
    next_plan: String,
    #[arg(long, default_value = "")]
    blockers: String,
    #[arg(long)]
    goal_accomplished: bool,
    #[arg(long, default_value = "")]
    mood: String,
}

fn parse_date_arg(input: &str) -> Result<NaiveDate, String> {
    streakboard::error::parse_date(input).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Begin logger
    env_logger::init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;
    if let Some(database) = cli.database {
        settings.database_path = database;
    }

    let connection = engdb::connect(&settings.database_path)
        .with_context(|| format!("Could not open database {}", settings.database_path))?;

    let (task, args) = match cli.command {
        Command::Init => {
            println!("Database ready at {}", settings.database_path);
            return Ok(());
        }
        Command::AddUser { username, github } => {
            let user_id = profiles::insert_profile(&connection, &username, github.as_deref())
                .with_context(|| format!("Could not add user {username}"))?;
            println!("Added {username} (id {user_id})");
            return Ok(());
        }
        Command::CheckIn(args) => return check_in(&connection, args),
        Command::Profile { username } => {
            let profile = profiles::query_profile_by_username(&connection, &username)?
                .ok_or_else(|| EngagementError::UnknownUser(username))?;
            println!("{profile}");
            return Ok(());
        }
        Command::Leaderboard { limit } => {
            let top = leaderboard::standings(&connection, limit)?;
            println!("{}", leaderboard::render_standings(&top));
            return Ok(());
        }
        Command::SyncContributors(args) => (Task::SyncContributors, args),
        Command::RecomputeClubs(args) => (Task::RecomputeClubs, args),
        Command::RecomputeLeaderboard(args) => (Task::RecomputeLeaderboard, args),
        Command::CheckInReminders(args) => (Task::CheckInReminders, args),
    };

    let github = GithubClient::new(&settings)?;
    let ctx = TaskContext {
        connection: &connection,
        source: &github,
        repositories: settings.repositories()?,
        today: args.date.unwrap_or_else(|| Utc::now().date_naive()),
        dry_run: args.dry_run,
    };

    let report = tasks::run_task(&ctx, task).await;
    if report.succeeded() {
        println!("{}: {}", task.name(), report.detail);
        Ok(())
    } else {
        Err(anyhow!("{} failed: {}", task.name(), report.detail))
    }
}

fn check_in(connection: &rusqlite::Connection, args: CheckInArgs) -> Result<()> {
    let profile = profiles::query_profile_by_username(connection, &args.username)?
        .ok_or_else(|| EngagementError::UnknownUser(args.username.clone()))?;

    let report = NewStatusReport {
        date: args.date.unwrap_or_else(|| Utc::now().date_naive()),
        previous_work: args.previous_work,
        next_plan: args.next_plan,
        blockers: args.blockers,
        goal_accomplished: args.goal_accomplished,
        current_mood: args.mood,
    };

    match streak::submit_check_in(connection, profile.user_id, &report) {
        Ok(outcome) => {
            if !outcome.report_stored {
                println!("Already checked in on {}.", report.date);
            }
            if let Some(points) = outcome.points_awarded {
                println!("Streak milestone reached: +{points} points!");
            }
            println!("{}", outcome.profile);
            Ok(())
        }
        Err(err @ EngagementError::OutOfOrderCheckIn { .. }) => {
            // The report is kept; only the streak was left alone.
            println!("Warning: {err}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
