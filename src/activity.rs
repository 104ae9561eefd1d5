use chrono::Utc;
use rusqlite::Connection;
use serde_json::{Map, Value};

use crate::engdb::{activities, profiles};
use crate::error::{EngagementError, EngagementResult};
use crate::models::{ActivityType, UserActivity, UserId};

/// Appends exactly one activity row for ``user_id`` and returns it.
///
/// ``activity_type`` is validated before anything is written; an unknown type
/// fails with `InvalidActivityType`.
pub fn record_activity(
    connection: &Connection,
    user_id: UserId,
    activity_type: &str,
    organization_id: Option<i64>,
    metadata: Map<String, Value>,
) -> EngagementResult<UserActivity> {
    let activity_type = activity_type
        .parse::<ActivityType>()
        .inspect_err(|err| log::warn!("[record_activity] Rejected activity for {user_id}: {err}"))?;

    record(connection, user_id, activity_type, organization_id, metadata)
}

/// Typed variant of [`record_activity`], used by the event bus.
pub fn record(
    connection: &Connection,
    user_id: UserId,
    activity_type: ActivityType,
    organization_id: Option<i64>,
    metadata: Map<String, Value>,
) -> EngagementResult<UserActivity> {
    if profiles::query_profile(connection, user_id)?.is_none() {
        return Err(EngagementError::UnknownUser(user_id.to_string()));
    }

    let timestamp = Utc::now();
    let metadata = Value::Object(metadata);
    let id = activities::insert_activity(
        connection,
        user_id,
        organization_id,
        activity_type,
        timestamp,
        &metadata,
    )?;

    Ok(UserActivity {
        id,
        user_id,
        organization_id,
        activity_type,
        timestamp,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engdb::connect_in_memory;
    use serde_json::json;

    #[test]
    fn records_one_row_with_metadata() {
        let connection = connect_in_memory().unwrap();
        let id = profiles::insert_profile(&connection, "alice", None).unwrap();

        let mut metadata = Map::new();
        metadata.insert(String::from("issue_id"), json!(31));
        let recorded = record_activity(&connection, id, "bug_report", Some(4), metadata).unwrap();

        let stored = activities::query_activities(&connection, id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, recorded.id);
        assert_eq!(stored[0].activity_type, ActivityType::BugReport);
        assert_eq!(stored[0].organization_id, Some(4));
        assert_eq!(stored[0].metadata, json!({ "issue_id": 31 }));
    }

    #[test]
    fn unknown_type_writes_nothing() {
        let connection = connect_in_memory().unwrap();
        let id = profiles::insert_profile(&connection, "alice", None).unwrap();

        let err = record_activity(&connection, id, "payout", None, Map::new()).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(activities::count_activities(&connection, id).unwrap(), 0);
    }

    #[test]
    fn unknown_user_is_rejected() {
        let connection = connect_in_memory().unwrap();
        let err = record_activity(&connection, 5, "login", None, Map::new()).unwrap_err();
        assert!(matches!(err, EngagementError::UnknownUser(_)));
    }
}
