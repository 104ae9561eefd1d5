use rusqlite::Connection;
use serde_json::{Map, Value, json};

use crate::activity;
use crate::engdb;
use crate::error::EngagementResult;
use crate::leaderboard;
use crate::models::{ActivityType, UserId};

/// Something a user did on the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    BugReported { user_id: UserId, organization_id: Option<i64>, issue_id: i64 },
    BugCommented { user_id: UserId, organization_id: Option<i64>, issue_id: i64, comment_id: i64 },
    BugLiked { user_id: UserId, organization_id: Option<i64>, issue_id: i64 },
    LoggedIn { user_id: UserId },
    DashboardVisited { user_id: UserId, organization_id: Option<i64>, path: String },
}

impl DomainEvent {
    pub fn user_id(&self) -> UserId {
        match self {
            DomainEvent::BugReported { user_id, .. }
            | DomainEvent::BugCommented { user_id, .. }
            | DomainEvent::BugLiked { user_id, .. }
            | DomainEvent::LoggedIn { user_id }
            | DomainEvent::DashboardVisited { user_id, .. } => *user_id,
        }
    }

    pub fn organization_id(&self) -> Option<i64> {
        match self {
            DomainEvent::BugReported { organization_id, .. }
            | DomainEvent::BugCommented { organization_id, .. }
            | DomainEvent::BugLiked { organization_id, .. }
            | DomainEvent::DashboardVisited { organization_id, .. } => *organization_id,
            DomainEvent::LoggedIn { .. } => None,
        }
    }

    pub fn activity_type(&self) -> ActivityType {
        match self {
            DomainEvent::BugReported { .. } => ActivityType::BugReport,
            DomainEvent::BugCommented { .. } => ActivityType::BugComment,
            DomainEvent::BugLiked { .. } => ActivityType::BugLike,
            DomainEvent::LoggedIn { .. } => ActivityType::Login,
            DomainEvent::DashboardVisited { .. } => ActivityType::DashboardVisit,
        }
    }

    pub fn metadata(&self) -> Map<String, Value> {
        let value = match self {
            DomainEvent::BugReported { issue_id, .. } | DomainEvent::BugLiked { issue_id, .. } => {
                json!({ "issue_id": issue_id })
            }
            DomainEvent::BugCommented { issue_id, comment_id, .. } => {
                json!({ "issue_id": issue_id, "comment_id": comment_id })
            }
            DomainEvent::LoggedIn { .. } => json!({}),
            DomainEvent::DashboardVisited { path, .. } => json!({ "path": path }),
        };

        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

pub trait EventHandler {
    fn name(&self) -> &'static str;
    fn handle(&self, connection: &Connection, event: &DomainEvent) -> EngagementResult<()>;
}

/// Writes one `UserActivity` row per event.
pub struct ActivityRecorder;

impl EventHandler for ActivityRecorder {
    fn name(&self) -> &'static str {
        "activity_recorder"
    }

    fn handle(&self, connection: &Connection, event: &DomainEvent) -> EngagementResult<()> {
        activity::record(
            connection,
            event.user_id(),
            event.activity_type(),
            event.organization_id(),
            event.metadata(),
        )?;
        Ok(())
    }
}

/// Credits the points ledger for events worth points.
pub struct PointsAwarder;

impl PointsAwarder {
    pub fn points_for(activity_type: ActivityType) -> Option<(i64, &'static str)> {
        match activity_type {
            ActivityType::BugReport => Some((3, "Bug reported")),
            ActivityType::BugComment => Some((1, "Commented on a bug")),
            ActivityType::BugLike => Some((1, "Liked a bug")),
            ActivityType::Login | ActivityType::DashboardVisit => None,
        }
    }
}

impl EventHandler for PointsAwarder {
    fn name(&self) -> &'static str {
        "points_awarder"
    }

    fn handle(&self, connection: &Connection, event: &DomainEvent) -> EngagementResult<()> {
        if let Some((score, reason)) = Self::points_for(event.activity_type()) {
            leaderboard::award_points(connection, event.user_id(), score, reason)?;
        }
        Ok(())
    }
}

/// Explicit in-process dispatch: every registered handler sees every event,
/// in registration order, inside a single transaction.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus with the activity recorder and the points awarder registered.
    pub fn with_default_handlers() -> Self {
        let mut bus = Self::new();
        bus.register(Box::new(ActivityRecorder));
        bus.register(Box::new(PointsAwarder));
        bus
    }

    pub fn register(&mut self, handler: Box<dyn EventHandler>) {
        log::debug!("[register] Registered event handler {}", handler.name());
        self.handlers.push(handler);
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Runs every handler for `event`. If any handler fails, nothing any
    /// handler wrote is kept.
    pub fn publish(&self, connection: &Connection, event: &DomainEvent) -> EngagementResult<()> {
        log::trace!("[publish] Publishing {event:?}");
        let tx = engdb::begin_write(connection)?;

        for handler in &self.handlers {
            handler
                .handle(&tx, event)
                .inspect_err(|err| log::error!("[publish] Handler {} failed on {event:?}: {err}",
                                               handler.name()))?;
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engdb::{activities, connect_in_memory, points, profiles};
    use crate::error::EngagementError;

    #[test]
    fn one_event_one_activity_row() {
        let connection = connect_in_memory().unwrap();
        let id = profiles::insert_profile(&connection, "alice", None).unwrap();
        let bus = EventBus::with_default_handlers();

        bus.publish(&connection, &DomainEvent::BugReported {
            user_id: id,
            organization_id: Some(2),
            issue_id: 77,
        })
        .unwrap();
        bus.publish(&connection, &DomainEvent::LoggedIn { user_id: id }).unwrap();

        let stored = activities::query_activities(&connection, id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].activity_type, ActivityType::BugReport);
        assert_eq!(stored[0].metadata, json!({ "issue_id": 77 }));
        assert_eq!(stored[1].activity_type, ActivityType::Login);
    }

    #[test]
    fn bug_reports_earn_points() {
        let connection = connect_in_memory().unwrap();
        let id = profiles::insert_profile(&connection, "alice", None).unwrap();
        let bus = EventBus::with_default_handlers();

        bus.publish(&connection, &DomainEvent::BugReported { user_id: id, organization_id: None, issue_id: 1 })
            .unwrap();
        bus.publish(&connection, &DomainEvent::DashboardVisited {
            user_id: id,
            organization_id: None,
            path: String::from("/dashboard"),
        })
        .unwrap();

        let profile = profiles::query_profile(&connection, id).unwrap().unwrap();
        assert_eq!(profile.leaderboard_score, 3);
        assert_eq!(points::query_ledger(&connection, id).unwrap().len(), 1);
    }

    struct Failing;

    impl EventHandler for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn handle(&self, _: &Connection, event: &DomainEvent) -> EngagementResult<()> {
            Err(EngagementError::UnknownUser(event.user_id().to_string()))
        }
    }

    #[test]
    fn failing_handler_rolls_back_the_event() {
        let connection = connect_in_memory().unwrap();
        let id = profiles::insert_profile(&connection, "alice", None).unwrap();

        let mut bus = EventBus::with_default_handlers();
        bus.register(Box::new(Failing));
        assert_eq!(bus.handler_names(), vec!["activity_recorder", "points_awarder", "failing"]);

        let event = DomainEvent::BugReported { user_id: id, organization_id: None, issue_id: 9 };
        assert!(bus.publish(&connection, &event).is_err());

        assert_eq!(activities::count_activities(&connection, id).unwrap(), 0);
        assert_eq!(points::query_total(&connection, id).unwrap(), 0);
    }
}
