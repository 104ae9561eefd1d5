use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::{engdb::DBResult, models};

/////*============== CONTRIBUTOR QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::Contributor {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            github_id: row.get("github_id")?,
            login: row.get("login")?,
            contributions: row.get("contributions")?,
            avatar_url: row.get("avatar_url")?,
            html_url: row.get("html_url")?,
            contributor_type: row.get("contributor_type")?,
        })
    }
}

/// Upserts a contributor keyed by its GitHub id.
///
/// Tries an UPDATE first and falls back to INSERT. If the INSERT loses a race
/// against another writer, the unique-constraint violation is turned back into
/// an UPDATE. Returns `true` if a new row was created.
pub fn upsert_contributor(
    connection: &Connection,
    contributor: &models::Contributor,
    now: DateTime<Utc>,
) -> DBResult<bool> {
    if update_contributor(connection, contributor, now)? {
        return Ok(false);
    }

    log::trace!("[upsert_contributor] Inserting contributor {} ({})...",
        contributor.login, contributor.github_id);

    let inserted = connection
        .prepare(
            "INSERT INTO Contributors
                ( github_id,  login,  contributions,  avatar_url,  html_url,
                  contributor_type,  updated_at)
             VALUES
                (:github_id, :login, :contributions, :avatar_url, :html_url,
                 :contributor_type, :updated_at)",
        )?
        .execute(rusqlite::named_params! {
            ":github_id": contributor.github_id,
            ":login": contributor.login,
            ":contributions": contributor.contributions,
            ":avatar_url": contributor.avatar_url,
            ":html_url": contributor.html_url,
            ":contributor_type": contributor.contributor_type,
            ":updated_at": now,
        })
        .map_or_else(crate::engdb::swallow_constraint_violation, |_| Ok(true))?;

    if !inserted {
        log::debug!("[upsert_contributor] {} appeared concurrently, updating instead.",
            contributor.login);
        update_contributor(connection, contributor, now)?;
    }

    Ok(inserted)
}

/// Returns whether a row matched.
fn update_contributor(
    connection: &Connection,
    contributor: &models::Contributor,
    now: DateTime<Utc>,
) -> DBResult<bool> {
    let changed = connection
        .prepare(
            "UPDATE Contributors SET
                login = :login,
                contributions = :contributions,
                avatar_url = :avatar_url,
                html_url = :html_url,
                contributor_type = :contributor_type,
                updated_at = :updated_at
             WHERE github_id = :github_id",
        )?
        .execute(rusqlite::named_params! {
            ":github_id": contributor.github_id,
            ":login": contributor.login,
            ":contributions": contributor.contributions,
            ":avatar_url": contributor.avatar_url,
            ":html_url": contributor.html_url,
            ":contributor_type": contributor.contributor_type,
            ":updated_at": now,
        })?;

    Ok(changed > 0)
}

pub fn query_contributor(connection: &Connection, github_id: i64) -> DBResult<Option<models::Contributor>> {
    connection
        .prepare("SELECT * FROM Contributors WHERE github_id = :github_id")?
        .query(rusqlite::named_params! { ":github_id": github_id })?
        .next()?
        .map(|row| row.try_into())
        .transpose()
}

pub fn query_contributors(connection: &Connection) -> DBResult<Vec<models::Contributor>> {
    let mut stmt = connection.prepare(
        "SELECT * FROM Contributors ORDER BY contributions DESC, login",
    )?;

    let contributors = stmt
        .query_map([], |row| models::Contributor::try_from(row))?
        .collect::<DBResult<Vec<models::Contributor>>>()?;

    Ok(contributors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engdb::connect_in_memory;

    fn contributor(github_id: i64, contributions: u32) -> models::Contributor {
        models::Contributor {
            github_id,
            login: format!("user{github_id}"),
            contributions,
            avatar_url: String::from("https://avatars.example/u"),
            html_url: format!("https://github.com/user{github_id}"),
            contributor_type: String::from("User"),
        }
    }

    #[test]
    fn upsert_inserts_then_updates() {
        let connection = connect_in_memory().unwrap();

        assert!(upsert_contributor(&connection, &contributor(7, 12), Utc::now()).unwrap());
        assert!(!upsert_contributor(&connection, &contributor(7, 55), Utc::now()).unwrap());

        let all = query_contributors(&connection).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].contributions, 55);
    }

    #[test]
    fn contributors_are_ordered_by_contributions() {
        let connection = connect_in_memory().unwrap();
        upsert_contributor(&connection, &contributor(1, 3), Utc::now()).unwrap();
        upsert_contributor(&connection, &contributor(2, 30), Utc::now()).unwrap();

        let ids: Vec<_> = query_contributors(&connection)
            .unwrap()
            .into_iter()
            .map(|c| c.github_id)
            .collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(query_contributor(&connection, 1).unwrap().unwrap().contributions, 3);
    }
}
