use chrono::NaiveDate;
use rusqlite::Connection;

use crate::{engdb::DBResult, models::{self, UserId}};

/////*============== PROFILE QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::UserProfile {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            username: row.get("username")?,
            github_login: row.get("github_login")?,
            current_streak: row.get("current_streak")?,
            longest_streak: row.get("longest_streak")?,
            last_check_in: row.get("last_check_in")?,
            leaderboard_score: row.get("leaderboard_score")?,
            contribution_count: row.get("contribution_count")?,
            clubs: models::ClubFlags {
                weekly: row.get("weekly_club")?,
                monthly: row.get("monthly_club")?,
                ten: row.get("ten_club")?,
                fifty: row.get("fifty_club")?,
                hundred: row.get("hundred_club")?,
            },
        })
    }
}

/// Creates an empty profile and returns its id.
pub fn insert_profile(
    connection: &Connection,
    username: &str,
    github_login: Option<&str>,
) -> DBResult<UserId> {
    log::trace!("[insert_profile] Inserting profile {username} into UserProfiles...");

    connection
        .prepare(
            "INSERT INTO UserProfiles (username,  github_login)
             VALUES                   (:username, :github_login)",
        )?
        .execute(rusqlite::named_params! {
            ":username": username,
            ":github_login": github_login,
        })?;

    log::info!("User {username} has been added to the database.");
    Ok(connection.last_insert_rowid())
}

/// Returns the profile with id `user_id`, if it exists.
pub fn query_profile(connection: &Connection, user_id: UserId) -> DBResult<Option<models::UserProfile>> {
    connection
        .prepare("SELECT * FROM UserProfiles WHERE user_id = :user_id")?
        .query(rusqlite::named_params! { ":user_id": user_id })?
        .next()?
        .map(|row| row.try_into())
        .transpose()
}

/// Returns the profile with the username: `username`, if it exists.
pub fn query_profile_by_username(
    connection: &Connection,
    username: &str,
) -> DBResult<Option<models::UserProfile>> {
    connection
        .prepare("SELECT * FROM UserProfiles WHERE username = :username")?
        .query(rusqlite::named_params! { ":username": username })?
        .next()?
        .map(|row| row.try_into())
        .transpose()
}

/// All profiles linked to the GitHub account `login` (case-insensitive).
pub fn query_profiles_by_github_login(
    connection: &Connection,
    login: &str,
) -> DBResult<Vec<models::UserProfile>> {
    connection
        .prepare(
            "SELECT * FROM UserProfiles
             WHERE github_login = :login COLLATE NOCASE
             ORDER BY user_id",
        )?
        .query_map(rusqlite::named_params! { ":login": login }, |row| {
            models::UserProfile::try_from(row)
        })?
        .collect()
}

pub fn query_all_user_ids(connection: &Connection) -> DBResult<Vec<UserId>> {
    log::trace!("[query_all_user_ids] Querying every user id.");
    connection
        .prepare("SELECT user_id FROM UserProfiles ORDER BY user_id")?
        .query_map([], |row| row.get("user_id"))?
        .collect()
}

/// Users whose streak will break unless they check in on `date`: their last
/// check-in was the day before and they have no report for `date` yet.
pub fn query_streaks_at_risk(
    connection: &Connection,
    date: NaiveDate,
) -> DBResult<Vec<models::UserProfile>> {
    let Some(yesterday) = date.pred_opt() else {
        return Ok(Vec::new());
    };

    connection
        .prepare(
            "SELECT u.*
             FROM UserProfiles u
             WHERE u.last_check_in = :yesterday
               AND u.current_streak > 0
               AND NOT EXISTS (
                 SELECT 1
                 FROM DailyStatusReports r
                 WHERE r.user_id = u.user_id
                   AND r.date = :date
               )
             ORDER BY u.current_streak DESC, u.user_id",
        )?
        .query_map(
            rusqlite::named_params! { ":yesterday": yesterday, ":date": date },
            |row| models::UserProfile::try_from(row),
        )?
        .collect()
}

/// Writes the streak counters together with the streak-derived clubs.
pub fn update_streak(
    connection: &Connection,
    user_id: UserId,
    current_streak: u32,
    longest_streak: u32,
    last_check_in: NaiveDate,
    weekly_club: bool,
    monthly_club: bool,
) -> DBResult<()> {
    connection
        .prepare(
            "UPDATE UserProfiles SET
                current_streak = :current_streak,
                longest_streak = :longest_streak,
                last_check_in = :last_check_in,
                weekly_club = :weekly_club,
                monthly_club = :monthly_club
             WHERE user_id = :user_id",
        )?
        .execute(rusqlite::named_params! {
            ":user_id": user_id,
            ":current_streak": current_streak,
            ":longest_streak": longest_streak,
            ":last_check_in": last_check_in,
            ":weekly_club": weekly_club,
            ":monthly_club": monthly_club,
        })
        .inspect_err(|err| log::error!("[update_streak] Could not update streak for {user_id}: {err}"))?;

    Ok(())
}

pub fn update_streak_clubs(
    connection: &Connection,
    user_id: UserId,
    weekly_club: bool,
    monthly_club: bool,
) -> DBResult<()> {
    connection
        .prepare(
            "UPDATE UserProfiles SET weekly_club = :weekly_club, monthly_club = :monthly_club
             WHERE user_id = :user_id",
        )?
        .execute(rusqlite::named_params! {
            ":user_id": user_id,
            ":weekly_club": weekly_club,
            ":monthly_club": monthly_club,
        })?;

    Ok(())
}

/// Stores the contribution count and the tiers derived from it in one statement.
pub fn update_contribution_clubs(
    connection: &Connection,
    user_id: UserId,
    contribution_count: u32,
    ten_club: bool,
    fifty_club: bool,
    hundred_club: bool,
) -> DBResult<()> {
    connection
        .prepare(
            "UPDATE UserProfiles SET
                contribution_count = :contribution_count,
                ten_club = :ten_club,
                fifty_club = :fifty_club,
                hundred_club = :hundred_club
             WHERE user_id = :user_id",
        )?
        .execute(rusqlite::named_params! {
            ":user_id": user_id,
            ":contribution_count": contribution_count,
            ":ten_club": ten_club,
            ":fifty_club": fifty_club,
            ":hundred_club": hundred_club,
        })?;

    Ok(())
}
