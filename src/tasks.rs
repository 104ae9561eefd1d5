use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;

use crate::config::RepoRef;
use crate::engdb::taskruns;
use crate::ghapi::ContributorSource;
use crate::models::TaskStatus;

pub mod contributors;
pub mod recompute;
pub mod reminders;

/// The periodic commands. Each one is a single shot: an outside scheduler
/// decides when (and whether) to run it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    SyncContributors,
    RecomputeClubs,
    RecomputeLeaderboard,
    CheckInReminders,
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::SyncContributors => "sync-contributors",
            Task::RecomputeClubs => "recompute-clubs",
            Task::RecomputeLeaderboard => "recompute-leaderboard",
            Task::CheckInReminders => "check-in-reminders",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Running,
    Success,
    Failed,
}

impl TaskState {
    fn can_become(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Idle, TaskState::Running)
                | (TaskState::Running, TaskState::Success)
                | (TaskState::Running, TaskState::Failed)
                | (TaskState::Success, TaskState::Idle)
                | (TaskState::Failed, TaskState::Idle)
        )
    }
}

/// Everything a task may touch during one invocation.
pub struct TaskContext<'a, S> {
    pub connection: &'a Connection,
    pub source: &'a S,
    pub repositories: Vec<RepoRef>,
    /// The day the task runs "as of".
    pub today: NaiveDate,
    /// Compute and log, but leave derived data alone.
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: Task,
    /// The terminal state this run reached (success or failed).
    pub outcome: TaskState,
    pub detail: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TaskReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == TaskState::Success
    }
}

struct Lifecycle {
    task: Task,
    state: TaskState,
}

impl Lifecycle {
    fn advance(&mut self, next: TaskState) {
        debug_assert!(self.state.can_become(next), "{:?} -> {next:?}", self.state);
        log::debug!("[{}] {:?} -> {next:?}", self.task.name(), self.state);
        self.state = next;
    }
}

/// Runs `task` once and records the outcome in TaskRuns (unless dry running).
///
/// A failure is logged and reported, never retried here.
pub async fn run_task<S: ContributorSource>(ctx: &TaskContext<'_, S>, task: Task) -> TaskReport {
    let mut lifecycle = Lifecycle { task, state: TaskState::Idle };
    lifecycle.advance(TaskState::Running);

    log::info!("[run_task] Running {} as of {}{}", task.name(), ctx.today,
               if ctx.dry_run { " (dry run)" } else { "" });
    let started_at = Utc::now();

    let result = match task {
        Task::SyncContributors => contributors::sync_contributors(ctx).await,
        Task::RecomputeClubs => recompute::recompute_clubs(ctx),
        Task::RecomputeLeaderboard => recompute::recompute_leaderboard(ctx),
        Task::CheckInReminders => reminders::check_in_reminders(ctx),
    };

    let (outcome, detail) = match result {
        Ok(summary) => {
            log::info!("[run_task] {} succeeded: {summary}", task.name());
            (TaskState::Success, summary)
        }
        Err(err) => {
            log::error!("[run_task] {} failed: {err:#}", task.name());
            (TaskState::Failed, format!("{err:#}"))
        }
    };
    lifecycle.advance(outcome);

    let finished_at = Utc::now();
    let status = match outcome {
        TaskState::Success => TaskStatus::Success,
        _ => TaskStatus::Failed,
    };
    if !ctx.dry_run {
        if let Err(err) = taskruns::insert_task_run(ctx.connection, task.name(), started_at,
                                                    finished_at, status, &detail) {
            log::error!("[run_task] Could not record run of {}: {err}", task.name());
        }
    }

    lifecycle.advance(TaskState::Idle);

    TaskReport { task, outcome, detail, started_at, finished_at }
}
