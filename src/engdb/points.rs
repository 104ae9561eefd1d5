use chrono::Utc;
use rusqlite::Connection;

use crate::{engdb::DBResult, models::{self, UserId}};

impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::PointsEntry {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            score: row.get("score")?,
            reason: row.get("reason")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Appends ``score`` to ``user_id``'s ledger.
///
/// Returns the id of the new ledger row.
pub fn insert_points(connection: &Connection, user_id: UserId, score: i64, reason: &str) -> DBResult<i64> {
    log::trace!("[insert_points] Adding {score} points to {user_id} ({reason})");

    connection
        .prepare(
            "INSERT INTO Points ( user_id,  score,  reason,  created_at)
             VALUES             (:user_id, :score, :reason, :created_at)",
        )?
        .execute(rusqlite::named_params! {
            ":user_id": user_id,
            ":score": score,
            ":reason": reason,
            ":created_at": Utc::now(),
        })?;

    Ok(connection.last_insert_rowid())
}

/// Sums ``user_id``'s ledger. An empty ledger sums to 0.
pub fn query_total(connection: &Connection, user_id: UserId) -> DBResult<i64> {
    connection
        .prepare("SELECT COALESCE(SUM(score), 0) AS total FROM Points WHERE user_id = :user_id")?
        .query_row(rusqlite::named_params! { ":user_id": user_id }, |row| row.get("total"))
}

pub fn query_ledger(connection: &Connection, user_id: UserId) -> DBResult<Vec<models::PointsEntry>> {
    let mut stmt = connection.prepare(
        "SELECT * FROM Points WHERE user_id = :user_id ORDER BY id",
    )?;

    let entries = stmt
        .query_map(rusqlite::named_params! { ":user_id": user_id }, |row| {
            models::PointsEntry::try_from(row)
        })?
        .collect::<DBResult<Vec<models::PointsEntry>>>()?;

    Ok(entries)
}

/// Materializes the ledger sum into ``UserProfiles.leaderboard_score``.
///
/// A single UPDATE-from-SELECT, so the cached value always equals the ledger as
/// seen by the last writer. Returns the new score, or `None` for an unknown user.
pub fn store_ledger_total(connection: &Connection, user_id: UserId) -> DBResult<Option<i64>> {
    connection
        .prepare(
            "UPDATE UserProfiles
             SET leaderboard_score = (
                SELECT COALESCE(SUM(score), 0) FROM Points WHERE user_id = :user_id
             )
             WHERE user_id = :user_id
             RETURNING leaderboard_score",
        )?
        .query(rusqlite::named_params! { ":user_id": user_id })?
        .next()?
        .map(|row| row.get("leaderboard_score"))
        .transpose()
}

/// The top ``limit`` profiles by cached score, ties broken by username.
pub fn query_top(connection: &Connection, limit: usize) -> DBResult<Vec<models::UserProfile>> {
    let mut stmt = connection.prepare(
        "SELECT * FROM UserProfiles
         ORDER BY leaderboard_score DESC, username
         LIMIT :limit",
    )?;

    let profiles = stmt
        .query_map(rusqlite::named_params! { ":limit": limit as i64 }, |row| {
            models::UserProfile::try_from(row)
        })?
        .collect::<DBResult<Vec<models::UserProfile>>>()?;

    Ok(profiles)
}
