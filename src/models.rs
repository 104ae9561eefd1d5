use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::EngagementError;

pub type UserId = i64;

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub github_login: Option<String>,

    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_check_in: Option<NaiveDate>,

    pub leaderboard_score: i64,

    pub contribution_count: u32,
    pub clubs: ClubFlags,
}

impl std::fmt::Display for UserProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "**User Stats:** {}\n\
             \tCurrent Streak: {}\n\
             \tLongest Streak: {}\n\
             \tLast Check-in: {}\n\
             \tScore: {}\n\
             \tContributions: {}\n\
             \tClubs: {}",
            self.username,
            self.current_streak,
            self.longest_streak,
            self.last_check_in.map_or_else(|| String::from("never"), |d| d.to_string()),
            self.leaderboard_score,
            self.contribution_count,
            self.clubs,
        )
    }
}

/// Stored club membership. Each family is only ever written together with the
/// value it is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClubFlags {
    pub weekly: bool,
    pub monthly: bool,
    pub ten: bool,
    pub fifty: bool,
    pub hundred: bool,
}

impl std::fmt::Display for ClubFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = Vec::new();
        if self.monthly {
            names.push("Monthly Club");
        } else if self.weekly {
            names.push("Weekly Club");
        }
        if self.hundred {
            names.push("100 Club");
        } else if self.fifty {
            names.push("50 Club");
        } else if self.ten {
            names.push("10 Club");
        }

        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(", "))
        }
    }
}

/// A daily status report as submitted by the user.
#[derive(Debug, Clone, Default)]
pub struct NewStatusReport {
    pub date: NaiveDate,
    pub previous_work: String,
    pub next_plan: String,
    pub blockers: String,
    pub goal_accomplished: bool,
    pub current_mood: String,
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub id: i64,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub previous_work: String,
    pub next_plan: String,
    pub blockers: String,
    pub goal_accomplished: bool,
    pub current_mood: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityType {
    BugReport,
    BugComment,
    BugLike,
    Login,
    DashboardVisit,
}

impl ActivityType {
    pub const ALL: [ActivityType; 5] = [
        ActivityType::BugReport,
        ActivityType::BugComment,
        ActivityType::BugLike,
        ActivityType::Login,
        ActivityType::DashboardVisit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::BugReport => "bug_report",
            ActivityType::BugComment => "bug_comment",
            ActivityType::BugLike => "bug_like",
            ActivityType::Login => "login",
            ActivityType::DashboardVisit => "dashboard_visit",
        }
    }
}

impl FromStr for ActivityType {
    type Err = EngagementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EngagementError::InvalidActivityType(s.to_string()))
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct UserActivity {
    pub id: i64,
    pub user_id: UserId,
    pub organization_id: Option<i64>,
    pub activity_type: ActivityType,
    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct PointsEntry {
    pub id: i64,
    pub user_id: UserId,
    pub score: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// A repository contributor as reported by GitHub.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Contributor {
    #[serde(rename = "id")]
    pub github_id: i64,
    pub login: String,
    pub contributions: u32,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(rename = "type", default)]
    pub contributor_type: String,
}

impl Contributor {
    pub fn is_bot(&self) -> bool {
        self.contributor_type == "Bot" || self.login.ends_with("[bot]")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Success,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskRun {
    pub id: i64,
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub detail: String,
}
