use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::{engdb::DBResult, models};

impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::TaskRun {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        let status = match row.get::<_, String>("status")?.as_str() {
            "success" => models::TaskStatus::Success,
            _ => models::TaskStatus::Failed,
        };

        Ok(Self {
            id: row.get("id")?,
            task: row.get("task")?,
            started_at: row.get("started_at")?,
            finished_at: row.get("finished_at")?,
            status,
            detail: row.get("detail")?,
        })
    }
}

pub fn insert_task_run(
    connection: &Connection,
    task: &str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    status: models::TaskStatus,
    detail: &str,
) -> DBResult<i64> {
    log::trace!("[insert_task_run] Recording {} run of {task}", status.as_str());

    connection
        .prepare(
            "INSERT INTO TaskRuns ( task,  started_at,  finished_at,  status,  detail)
             VALUES               (:task, :started_at, :finished_at, :status, :detail)",
        )?
        .execute(rusqlite::named_params! {
            ":task": task,
            ":started_at": started_at,
            ":finished_at": finished_at,
            ":status": status.as_str(),
            ":detail": detail,
        })?;

    Ok(connection.last_insert_rowid())
}

/// The most recent run of `task`, if it ever ran.
pub fn query_last_run(connection: &Connection, task: &str) -> DBResult<Option<models::TaskRun>> {
    connection
        .prepare("SELECT * FROM TaskRuns WHERE task = :task ORDER BY id DESC LIMIT 1")?
        .query(rusqlite::named_params! { ":task": task })?
        .next()?
        .map(|row| row.try_into())
        .transpose()
}
