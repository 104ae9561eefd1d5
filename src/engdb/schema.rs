pub const USER_PROFILES_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS UserProfiles (
        user_id             INTEGER     PRIMARY KEY,
        username            TEXT        NOT NULL    UNIQUE,
        github_login        TEXT,

        current_streak      INTEGER     NOT NULL    DEFAULT 0,
        longest_streak      INTEGER     NOT NULL    DEFAULT 0,
        last_check_in       DATE,

        leaderboard_score   INTEGER     NOT NULL    DEFAULT 0,

        contribution_count  INTEGER     NOT NULL    DEFAULT 0,
        weekly_club         BOOLEAN     NOT NULL    DEFAULT 0,
        monthly_club        BOOLEAN     NOT NULL    DEFAULT 0,
        ten_club            BOOLEAN     NOT NULL    DEFAULT 0,
        fifty_club          BOOLEAN     NOT NULL    DEFAULT 0,
        hundred_club        BOOLEAN     NOT NULL    DEFAULT 0
    )";

pub const STATUS_REPORTS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS DailyStatusReports (
        id                  INTEGER     PRIMARY KEY,
        user_id             INTEGER     NOT NULL    REFERENCES UserProfiles(user_id),
        date                DATE        NOT NULL,

        previous_work       TEXT        NOT NULL,
        next_plan           TEXT        NOT NULL,
        blockers            TEXT        NOT NULL,
        goal_accomplished   BOOLEAN     NOT NULL,
        current_mood        TEXT        NOT NULL,

        created_at          TIMESTAMP   NOT NULL,

        UNIQUE (user_id, date)
    )";

pub const USER_ACTIVITIES_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS UserActivities (
        id                  INTEGER     PRIMARY KEY,
        user_id             INTEGER     NOT NULL    REFERENCES UserProfiles(user_id),
        organization_id     INTEGER,
        activity_type       TEXT        NOT NULL,
        timestamp           TIMESTAMP   NOT NULL,
        metadata            TEXT        NOT NULL    DEFAULT '{}'
    )";

pub const POINTS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS Points (
        id                  INTEGER     PRIMARY KEY,
        user_id             INTEGER     NOT NULL    REFERENCES UserProfiles(user_id),
        score               INTEGER     NOT NULL,
        reason              TEXT        NOT NULL,
        created_at          TIMESTAMP   NOT NULL
    )";

pub const CONTRIBUTORS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS Contributors (
        github_id           INTEGER     PRIMARY KEY,
        login               TEXT        NOT NULL,
        contributions       INTEGER     NOT NULL,
        avatar_url          TEXT        NOT NULL,
        html_url            TEXT        NOT NULL,
        contributor_type    TEXT        NOT NULL,
        updated_at          TIMESTAMP   NOT NULL
    )";

pub const TASK_RUNS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS TaskRuns (
        id                  INTEGER     PRIMARY KEY,
        task                TEXT        NOT NULL,
        started_at          TIMESTAMP   NOT NULL,
        finished_at         TIMESTAMP   NOT NULL,
        status              TEXT        NOT NULL,
        detail              TEXT        NOT NULL
    )";

/// Every table, in creation order.
pub const TABLES: [(&str, &str); 6] = [
    ("UserProfiles", USER_PROFILES_SCHEMA),
    ("DailyStatusReports", STATUS_REPORTS_SCHEMA),
    ("UserActivities", USER_ACTIVITIES_SCHEMA),
    ("Points", POINTS_SCHEMA),
    ("Contributors", CONTRIBUTORS_SCHEMA),
    ("TaskRuns", TASK_RUNS_SCHEMA),
];
