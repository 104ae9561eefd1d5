use itertools::Itertools;
use rusqlite::Connection;

use crate::engdb::points;
use crate::error::{EngagementError, EngagementResult};
use crate::models::{UserId, UserProfile};

/// Recomputes ``user_id``'s leaderboard score from the points ledger.
///
/// Safe to call at any time and from any connection: the cached score is
/// rewritten from the ledger in one statement. Returns the new score.
pub fn recompute_leaderboard(connection: &Connection, user_id: UserId) -> EngagementResult<i64> {
    let score = points::store_ledger_total(connection, user_id)?
        .ok_or_else(|| EngagementError::UnknownUser(user_id.to_string()))?;

    log::trace!("[recompute_leaderboard] {user_id} now has {score} points");
    Ok(score)
}

/// Appends a ledger row and refreshes the cached score.
///
/// Runs on the caller's connection, so wrapping it in the caller's transaction
/// keeps the ledger and the cached score consistent.
pub fn award_points(
    connection: &Connection,
    user_id: UserId,
    score: i64,
    reason: &str,
) -> EngagementResult<i64> {
    points::insert_points(connection, user_id, score, reason)?;
    let total = recompute_leaderboard(connection, user_id)?;

    log::info!("[award_points] {user_id}'s new score is {total} ({score:+}, {reason})");
    Ok(total)
}

/// The top ``limit`` users by cached score.
pub fn standings(connection: &Connection, limit: usize) -> EngagementResult<Vec<UserProfile>> {
    Ok(points::query_top(connection, limit)?)
}

pub fn render_standings(profiles: &[UserProfile]) -> String {
    if profiles.is_empty() {
        return String::from("**Leaderboard:** nobody has scored yet.");
    }

    let rows = profiles
        .iter()
        .enumerate()
        .map(|(rank, p)| {
            format!(
                "\t{}. {} ({} points, streak {}, {})",
                rank + 1,
                p.username,
                p.leaderboard_score,
                p.current_streak,
                p.clubs
            )
        })
        .join("\n");

    format!("**Leaderboard:**\n{rows}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engdb::{connect_in_memory, profiles};

    #[test]
    fn empty_ledger_scores_zero() {
        let connection = connect_in_memory().unwrap();
        let id = profiles::insert_profile(&connection, "alice", None).unwrap();

        assert_eq!(recompute_leaderboard(&connection, id).unwrap(), 0);
    }

    #[test]
    fn recompute_matches_ledger_sum_and_is_idempotent() {
        let connection = connect_in_memory().unwrap();
        let id = profiles::insert_profile(&connection, "alice", None).unwrap();

        points::insert_points(&connection, id, 20, "Completed 7-day streak").unwrap();
        points::insert_points(&connection, id, 3, "Bug reported").unwrap();
        points::insert_points(&connection, id, -5, "Correction").unwrap();

        assert_eq!(recompute_leaderboard(&connection, id).unwrap(), 18);
        assert_eq!(recompute_leaderboard(&connection, id).unwrap(), 18);
        assert_eq!(points::query_total(&connection, id).unwrap(), 18);

        let profile = profiles::query_profile(&connection, id).unwrap().unwrap();
        assert_eq!(profile.leaderboard_score, 18);
    }

    #[test]
    fn award_points_keeps_cache_in_step() {
        let connection = connect_in_memory().unwrap();
        let id = profiles::insert_profile(&connection, "alice", None).unwrap();

        assert_eq!(award_points(&connection, id, 3, "Bug reported").unwrap(), 3);
        assert_eq!(award_points(&connection, id, 1, "Comment").unwrap(), 4);
        assert_eq!(points::query_ledger(&connection, id).unwrap().len(), 2);
    }

    #[test]
    fn unknown_user_is_an_error() {
        let connection = connect_in_memory().unwrap();
        assert!(matches!(
            recompute_leaderboard(&connection, 99),
            Err(EngagementError::UnknownUser(_))
        ));
    }

    #[test]
    fn standings_are_ordered_by_score() {
        let connection = connect_in_memory().unwrap();
        let alice = profiles::insert_profile(&connection, "alice", None).unwrap();
        let bob = profiles::insert_profile(&connection, "bob", None).unwrap();
        award_points(&connection, alice, 5, "Bug reported").unwrap();
        award_points(&connection, bob, 9, "Bug reported").unwrap();

        let top = standings(&connection, 10).unwrap();
        assert_eq!(top[0].username, "bob");
        assert_eq!(top[1].username, "alice");

        let rendered = render_standings(&top);
        assert!(rendered.contains("1. bob (9 points"));
        assert!(rendered.contains("2. alice (5 points"));
    }
}
