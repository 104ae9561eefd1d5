use chrono::{NaiveDate, Utc};
use rusqlite::Connection;

use crate::{engdb::DBResult, models::{self, UserId}};

/////*============== STATUS REPORT QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::StatusReport {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            date: row.get("date")?,
            previous_work: row.get("previous_work")?,
            next_plan: row.get("next_plan")?,
            blockers: row.get("blockers")?,
            goal_accomplished: row.get("goal_accomplished")?,
            current_mood: row.get("current_mood")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a daily status report.
/// Returns `true` if it was newly added, false if the user already reported that day.
pub fn insert_report(
    connection: &Connection,
    user_id: UserId,
    report: &models::NewStatusReport,
) -> DBResult<bool> {
    log::trace!("[insert_report] Inserting report for user {user_id} on {}...", report.date);

    let query_params = rusqlite::named_params! {
            ":user_id":           user_id,
            ":date":              report.date,
            ":previous_work":     report.previous_work,
            ":next_plan":         report.next_plan,
            ":blockers":          report.blockers,
            ":goal_accomplished": report.goal_accomplished,
            ":current_mood":      report.current_mood,
            ":created_at":        Utc::now(),
    };

    connection
        .prepare(
            "INSERT INTO DailyStatusReports
                ( user_id,  date,  previous_work,  next_plan,  blockers,
                  goal_accomplished,  current_mood,  created_at)
             VALUES
                (:user_id, :date, :previous_work, :next_plan, :blockers,
                 :goal_accomplished, :current_mood, :created_at)",
        )?
        .execute(query_params)
        .map_or_else(crate::engdb::swallow_constraint_violation, |_| Ok(true))
}

pub fn query_report(
    connection: &Connection,
    user_id: UserId,
    date: NaiveDate,
) -> DBResult<Option<models::StatusReport>> {
    connection
        .prepare("SELECT * FROM DailyStatusReports WHERE user_id = :user_id AND date = :date")?
        .query(rusqlite::named_params! { ":user_id": user_id, ":date": date })?
        .next()?
        .map(|row| row.try_into())
        .transpose()
}

/// Gathers a user's reports, newest first.
pub fn query_reports(connection: &Connection, user_id: UserId) -> DBResult<Vec<models::StatusReport>> {
    let mut stmt = connection.prepare(
        "SELECT * FROM DailyStatusReports
         WHERE user_id = :user_id
         ORDER BY date DESC",
    )?;

    let reports = stmt
        .query_map(rusqlite::named_params! { ":user_id": user_id }, |row| {
            models::StatusReport::try_from(row)
        })?
        .collect::<DBResult<Vec<models::StatusReport>>>()?;

    Ok(reports)
}
