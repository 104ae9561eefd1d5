use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::{engdb::DBResult, models::{self, UserId}};

/////*============== ACTIVITY QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::UserActivity {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        let kind: String = row.get("activity_type")?;
        let activity_type = kind.parse::<models::ActivityType>().map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })?;

        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            organization_id: row.get("organization_id")?,
            activity_type,
            timestamp: row.get("timestamp")?,
            metadata: row.get("metadata")?,
        })
    }
}

/// Appends one activity row and returns its id. Rows are never updated.
pub fn insert_activity(
    connection: &Connection,
    user_id: UserId,
    organization_id: Option<i64>,
    activity_type: models::ActivityType,
    timestamp: DateTime<Utc>,
    metadata: &serde_json::Value,
) -> DBResult<i64> {
    log::trace!("[insert_activity] Recording {activity_type} for user {user_id}...");

    connection
        .prepare(
            "INSERT INTO UserActivities
                ( user_id,  organization_id,  activity_type,  timestamp,  metadata)
             VALUES
                (:user_id, :organization_id, :activity_type, :timestamp, :metadata)",
        )?
        .execute(rusqlite::named_params! {
            ":user_id": user_id,
            ":organization_id": organization_id,
            ":activity_type": activity_type.as_str(),
            ":timestamp": timestamp,
            ":metadata": metadata,
        })?;

    Ok(connection.last_insert_rowid())
}

/// Gathers a user's activities, oldest first.
pub fn query_activities(connection: &Connection, user_id: UserId) -> DBResult<Vec<models::UserActivity>> {
    let mut stmt = connection.prepare(
        "SELECT * FROM UserActivities
         WHERE user_id = :user_id
         ORDER BY timestamp, id",
    )?;

    let activities = stmt
        .query_map(rusqlite::named_params! { ":user_id": user_id }, |row| {
            models::UserActivity::try_from(row)
                .inspect_err(|err| log::error!("[query_activities] Could not convert row into \
                                                activity: {err}"))
        })?
        .collect::<DBResult<Vec<models::UserActivity>>>()?;

    Ok(activities)
}

pub fn count_activities(connection: &Connection, user_id: UserId) -> DBResult<i64> {
    connection
        .prepare("SELECT COUNT(*) AS total FROM UserActivities WHERE user_id = :user_id")?
        .query_row(rusqlite::named_params! { ":user_id": user_id }, |row| row.get("total"))
}
