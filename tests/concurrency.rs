use chrono::{Days, NaiveDate};

use std::path::Path;
use std::thread;

use streakboard::engdb::{self, points, profiles};
use streakboard::events::{DomainEvent, EventBus};
use streakboard::models::{NewStatusReport, UserId};
use streakboard::submit_check_in;

const DAYS: u64 = 30;

fn check_in_daily(path: &Path, user_id: UserId) {
    let connection = engdb::connect(path).unwrap();
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    for offset in 0..DAYS {
        let report = NewStatusReport {
            date: start + Days::new(offset),
            goal_accomplished: true,
            ..NewStatusReport::default()
        };
        submit_check_in(&connection, user_id, &report).unwrap();
    }
}

fn publish_daily(path: &Path, event: DomainEvent) {
    let connection = engdb::connect(path).unwrap();
    let bus = EventBus::with_default_handlers();

    for _ in 0..DAYS {
        bus.publish(&connection, &event).unwrap();
    }
}

#[test]
fn concurrent_writers_wait_and_scores_match_the_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streakboard.db");

    let connection = engdb::connect(&path).unwrap();
    let alice = profiles::insert_profile(&connection, "alice", None).unwrap();
    let bob = profiles::insert_profile(&connection, "bob", None).unwrap();
    let carol = profiles::insert_profile(&connection, "carol", None).unwrap();

    let reported = |user_id| DomainEvent::BugReported { user_id, organization_id: None, issue_id: 1 };
    let liked = |user_id| DomainEvent::BugLiked { user_id, organization_id: None, issue_id: 1 };

    thread::scope(|scope| {
        // Different users, each checking in and reporting bugs.
        for user_id in [alice, bob] {
            let path = &path;
            scope.spawn(move || check_in_daily(path, user_id));
            scope.spawn(move || publish_daily(path, reported(user_id)));
        }

        // Three connections writing for the same user.
        let path = &path;
        scope.spawn(move || check_in_daily(path, carol));
        scope.spawn(move || publish_daily(path, reported(carol)));
        scope.spawn(move || publish_daily(path, liked(carol)));
    });

    // 7, 15 and 30-day milestones pay 20 + 30 + 50.
    let milestones = 100;
    let expected = [
        (alice, milestones + 3 * DAYS as i64),
        (bob, milestones + 3 * DAYS as i64),
        (carol, milestones + 4 * DAYS as i64),
    ];

    for (user_id, score) in expected {
        let profile = profiles::query_profile(&connection, user_id).unwrap().unwrap();
        assert_eq!(profile.current_streak, DAYS as u32);
        assert_eq!(profile.leaderboard_score, points::query_total(&connection, user_id).unwrap());
        assert_eq!(profile.leaderboard_score, score);
    }
}
