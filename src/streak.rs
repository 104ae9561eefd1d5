use chrono::NaiveDate;
use rusqlite::Connection;

use crate::clubs::StreakTiers;
use crate::engdb::{self, profiles, reports};
use crate::error::{EngagementError, EngagementResult};
use crate::leaderboard;
use crate::models::{NewStatusReport, UserId, UserProfile};

/// Streak lengths that earn points the day they are reached.
pub const MILESTONES: [(u32, i64, &str); 6] = [
    (7, 20, "Completed 7-day streak"),
    (15, 30, "Completed 15-day streak"),
    (30, 50, "Completed 30-day streak"),
    (100, 150, "Completed 100-day streak"),
    (180, 300, "Completed 180-day streak"),
    (365, 500, "Completed 365-day streak"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakState {
    pub current: u32,
    pub longest: u32,
    pub last_check_in: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// First ever check-in.
    Started,
    /// Checked in the day after the previous check-in.
    Extended,
    /// Missed at least one day; the streak restarts at 1.
    Broken,
    /// Second check-in on the same day.
    Unchanged,
}

impl StreakState {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            current: profile.current_streak,
            longest: profile.longest_streak,
            last_check_in: profile.last_check_in,
        }
    }

    /// Applies a check-in dated `date`.
    ///
    /// Fails with `OutOfOrderCheckIn` if `date` is before the last check-in; the
    /// state is left untouched in that case.
    pub fn advance(&self, date: NaiveDate) -> EngagementResult<(StreakState, StreakChange)> {
        let (current, change) = match self.last_check_in {
            None => (1, StreakChange::Started),
            Some(last) => match (date - last).num_days() {
                0 => return Ok((*self, StreakChange::Unchanged)),
                1 => (self.current.saturating_add(1), StreakChange::Extended),
                gap if gap > 1 => (1, StreakChange::Broken),
                _ => {
                    return Err(EngagementError::OutOfOrderCheckIn {
                        last_check_in: last,
                        attempted: date,
                    });
                }
            },
        };

        let next = StreakState {
            current,
            longest: self.longest.max(current),
            last_check_in: Some(date),
        };

        Ok((next, change))
    }
}

/// Points for reaching `streak`, if it is a milestone.
pub fn milestone_reward(streak: u32) -> Option<(i64, &'static str)> {
    MILESTONES
        .iter()
        .find(|(days, _, _)| *days == streak)
        .map(|(_, score, reason)| (*score, *reason))
}

#[derive(Debug, Clone)]
pub struct CheckInOutcome {
    pub profile: UserProfile,
    pub change: StreakChange,
    /// False when the user had already reported for that day.
    pub report_stored: bool,
    pub points_awarded: Option<i64>,
}

/// Stores a daily status report and advances the user's streak.
///
/// The report, the streak counters, streak clubs, milestone points and the
/// leaderboard score are all written in one transaction. An out-of-order
/// report is still stored, but the streak is left alone and
/// `OutOfOrderCheckIn` is returned for the caller to handle.
pub fn submit_check_in(
    connection: &Connection,
    user_id: UserId,
    report: &NewStatusReport,
) -> EngagementResult<CheckInOutcome> {
    log::trace!("[submit_check_in] Check-in for {user_id} on {}", report.date);
    let tx = engdb::begin_write(connection)?;

    let profile = profiles::query_profile(&tx, user_id)?
        .ok_or_else(|| EngagementError::UnknownUser(user_id.to_string()))?;

    let report_stored = reports::insert_report(&tx, user_id, report)?;

    let (next, change) = match StreakState::from_profile(&profile).advance(report.date) {
        Ok(advanced) => advanced,
        Err(err) => {
            log::warn!("[submit_check_in] {} sent an out-of-order check-in: {err}", profile.username);
            tx.commit()?;
            return Err(err);
        }
    };

    let mut points_awarded = None;
    if change != StreakChange::Unchanged {
        let tiers = StreakTiers::classify(next.current);
        profiles::update_streak(
            &tx,
            user_id,
            next.current,
            next.longest,
            report.date,
            tiers.weekly,
            tiers.monthly,
        )?;

        match milestone_reward(next.current) {
            Some((score, reason)) => {
                leaderboard::award_points(&tx, user_id, score, reason)?;
                points_awarded = Some(score);
            }
            None => {
                leaderboard::recompute_leaderboard(&tx, user_id)?;
            }
        }

        log::info!(
            "[submit_check_in] {}'s streak is now {} ({change:?}, longest {})",
            profile.username, next.current, next.longest
        );
    }

    let profile = profiles::query_profile(&tx, user_id)?
        .ok_or_else(|| EngagementError::UnknownUser(user_id.to_string()))?;
    tx.commit()?;

    Ok(CheckInOutcome { profile, change, report_stored, points_awarded })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn state(current: u32, longest: u32, last: Option<NaiveDate>) -> StreakState {
        StreakState { current, longest, last_check_in: last }
    }

    #[test]
    fn first_check_in_starts_at_one() {
        let (next, change) = StreakState::default().advance(date(2024, 1, 1)).unwrap();
        assert_eq!(next, state(1, 1, Some(date(2024, 1, 1))));
        assert_eq!(change, StreakChange::Started);
    }

    #[test]
    fn next_day_extends() {
        let (next, change) = state(5, 5, Some(date(2024, 1, 1)))
            .advance(date(2024, 1, 2))
            .unwrap();
        assert_eq!(next.current, 6);
        assert_eq!(next.longest, 6);
        assert_eq!(change, StreakChange::Extended);
    }

    #[test]
    fn gap_resets_to_one_and_keeps_longest() {
        let (next, change) = state(6, 6, Some(date(2024, 1, 2)))
            .advance(date(2024, 1, 10))
            .unwrap();
        assert_eq!(next, state(1, 6, Some(date(2024, 1, 10))));
        assert_eq!(change, StreakChange::Broken);
    }

    #[test]
    fn same_day_is_a_no_op() {
        let before = state(3, 8, Some(date(2024, 1, 5)));
        let (next, change) = before.advance(date(2024, 1, 5)).unwrap();
        assert_eq!(next, before);
        assert_eq!(change, StreakChange::Unchanged);
    }

    #[test]
    fn earlier_date_is_out_of_order() {
        let err = state(3, 3, Some(date(2024, 1, 5)))
            .advance(date(2024, 1, 4))
            .unwrap_err();
        assert!(matches!(err, EngagementError::OutOfOrderCheckIn { .. }));
    }

    #[test]
    fn longest_never_drops_below_current_over_a_sequence() {
        let days = [1, 2, 3, 3, 7, 8, 9, 10, 11, 20, 21];
        let mut current = StreakState::default();
        let mut longest_seen = 0;

        for day in days {
            let (next, _) = current.advance(date(2024, 5, day)).unwrap();
            assert!(next.longest >= next.current);
            assert!(next.longest >= longest_seen);
            longest_seen = next.longest;
            current = next;
        }

        assert_eq!(current.current, 2);
        assert_eq!(current.longest, 5);
    }

    #[test]
    fn milestones() {
        assert_eq!(milestone_reward(7), Some((20, "Completed 7-day streak")));
        assert_eq!(milestone_reward(365).map(|(s, _)| s), Some(500));
        assert_eq!(milestone_reward(8), None);
    }
}
