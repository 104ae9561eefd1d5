//! Club membership tiers.
//!
//! Two families, each derived from exactly one source value:
//! * contribution clubs (10/50/100) from the user's contribution count, as
//!   synced from GitHub;
//! * streak clubs (weekly/monthly) from the user's check-in streak.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::engdb::profiles;
use crate::error::{EngagementError, EngagementResult};
use crate::models::{UserId, UserProfile};

pub const TEN_CLUB_THRESHOLD: u32 = 10;
pub const FIFTY_CLUB_THRESHOLD: u32 = 50;
pub const HUNDRED_CLUB_THRESHOLD: u32 = 100;

pub const WEEKLY_CLUB_STREAK: u32 = 7;
pub const MONTHLY_CLUB_STREAK: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Club {
    Weekly,
    Monthly,
    Ten,
    Fifty,
    Hundred,
}

impl Club {
    pub fn name(&self) -> &'static str {
        match self {
            Club::Weekly => "Weekly Club",
            Club::Monthly => "Monthly Club",
            Club::Ten => "10 Club",
            Club::Fifty => "50 Club",
            Club::Hundred => "100 Club",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContributionTiers {
    pub ten: bool,
    pub fifty: bool,
    pub hundred: bool,
}

impl ContributionTiers {
    pub fn classify(contribution_count: u32) -> Self {
        Self {
            ten: contribution_count >= TEN_CLUB_THRESHOLD,
            fifty: contribution_count >= FIFTY_CLUB_THRESHOLD,
            hundred: contribution_count >= HUNDRED_CLUB_THRESHOLD,
        }
    }

    /// The tier shown to users.
    pub fn highest(&self) -> Option<Club> {
        if self.hundred {
            Some(Club::Hundred)
        } else if self.fifty {
            Some(Club::Fifty)
        } else if self.ten {
            Some(Club::Ten)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakTiers {
    pub weekly: bool,
    pub monthly: bool,
}

impl StreakTiers {
    pub fn classify(streak: u32) -> Self {
        Self {
            weekly: streak >= WEEKLY_CLUB_STREAK,
            monthly: streak >= MONTHLY_CLUB_STREAK,
        }
    }

    pub fn highest(&self) -> Option<Club> {
        if self.monthly {
            Some(Club::Monthly)
        } else if self.weekly {
            Some(Club::Weekly)
        } else {
            None
        }
    }
}

/// The stored streak if it is still alive on `today` (last check-in today or
/// yesterday), otherwise 0.
pub fn effective_streak(profile: &UserProfile, today: NaiveDate) -> u32 {
    match profile.last_check_in {
        Some(last) if (today - last).num_days() <= 1 => profile.current_streak,
        _ => 0,
    }
}

/// Stores `contribution_count` as the user's authoritative count together with
/// the tiers it implies.
pub fn recompute_club_membership(
    connection: &Connection,
    user_id: UserId,
    contribution_count: u32,
) -> EngagementResult<ContributionTiers> {
    let profile = profiles::query_profile(connection, user_id)?
        .ok_or_else(|| EngagementError::UnknownUser(user_id.to_string()))?;

    let tiers = ContributionTiers::classify(contribution_count);
    profiles::update_contribution_clubs(
        connection,
        user_id,
        contribution_count,
        tiers.ten,
        tiers.fifty,
        tiers.hundred,
    )?;

    let previous = ContributionTiers::classify(profile.contribution_count);
    if previous.highest() != tiers.highest() {
        log::info!(
            "[recompute_club_membership] {} moved from {} to {}",
            profile.username,
            previous.highest().map_or("no club", |c| c.name()),
            tiers.highest().map_or("no club", |c| c.name()),
        );
    }

    Ok(tiers)
}

/// Re-derives the streak clubs from the effective streak on `today`.
pub fn recompute_streak_clubs(
    connection: &Connection,
    user_id: UserId,
    today: NaiveDate,
) -> EngagementResult<StreakTiers> {
    let profile = profiles::query_profile(connection, user_id)?
        .ok_or_else(|| EngagementError::UnknownUser(user_id.to_string()))?;

    let tiers = StreakTiers::classify(effective_streak(&profile, today));
    profiles::update_streak_clubs(connection, user_id, tiers.weekly, tiers.monthly)?;

    let previous = StreakTiers { weekly: profile.clubs.weekly, monthly: profile.clubs.monthly };
    if previous.highest() != tiers.highest() {
        log::info!(
            "[recompute_streak_clubs] {} moved from {} to {}",
            profile.username,
            previous.highest().map_or("no club", |c| c.name()),
            tiers.highest().map_or("no club", |c| c.name()),
        );
    }

    Ok(tiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engdb::connect_in_memory;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn contribution_tiers_are_monotonic() {
        let mut previous = ContributionTiers::classify(0);
        for count in 0..=150 {
            let tiers = ContributionTiers::classify(count);
            assert!(tiers.ten >= previous.ten);
            assert!(tiers.fifty >= previous.fifty);
            assert!(tiers.hundred >= previous.hundred);
            assert!(!tiers.hundred || tiers.fifty);
            assert!(!tiers.fifty || tiers.ten);
            previous = tiers;
        }
    }

    #[test]
    fn hundred_club_implies_lower_tiers() {
        let tiers = ContributionTiers::classify(100);
        assert!(tiers.hundred && tiers.fifty && tiers.ten);
        assert_eq!(tiers.highest(), Some(Club::Hundred));

        assert_eq!(ContributionTiers::classify(9).highest(), None);
        assert_eq!(ContributionTiers::classify(10).highest(), Some(Club::Ten));
        assert_eq!(ContributionTiers::classify(49).highest(), Some(Club::Ten));
        assert_eq!(ContributionTiers::classify(50).highest(), Some(Club::Fifty));
    }

    #[test]
    fn streak_tiers() {
        assert_eq!(StreakTiers::classify(6), StreakTiers::default());
        assert_eq!(StreakTiers::classify(7).highest(), Some(Club::Weekly));
        assert_eq!(StreakTiers::classify(30).highest(), Some(Club::Monthly));
    }

    #[test]
    fn effective_streak_expires_after_a_missed_day() {
        let profile = UserProfile {
            user_id: 1,
            username: String::from("alice"),
            github_login: None,
            current_streak: 9,
            longest_streak: 9,
            last_check_in: Some(date(2024, 3, 10)),
            leaderboard_score: 0,
            contribution_count: 0,
            clubs: Default::default(),
        };

        assert_eq!(effective_streak(&profile, date(2024, 3, 10)), 9);
        assert_eq!(effective_streak(&profile, date(2024, 3, 11)), 9);
        assert_eq!(effective_streak(&profile, date(2024, 3, 12)), 0);
    }

    #[test]
    fn recompute_is_idempotent_and_follows_the_source_count() {
        let connection = connect_in_memory().unwrap();
        let id = profiles::insert_profile(&connection, "alice", None).unwrap();

        let first = recompute_club_membership(&connection, id, 64).unwrap();
        let second = recompute_club_membership(&connection, id, 64).unwrap();
        assert_eq!(first, second);

        let profile = profiles::query_profile(&connection, id).unwrap().unwrap();
        assert_eq!(profile.contribution_count, 64);
        assert!(profile.clubs.ten && profile.clubs.fifty && !profile.clubs.hundred);

        // A corrected, lower source count lowers the tiers with it.
        recompute_club_membership(&connection, id, 12).unwrap();
        let profile = profiles::query_profile(&connection, id).unwrap().unwrap();
        assert!(profile.clubs.ten && !profile.clubs.fifty);
    }

    #[test]
    fn streak_clubs_drop_once_the_streak_lapses() {
        let connection = connect_in_memory().unwrap();
        let id = profiles::insert_profile(&connection, "alice", None).unwrap();
        profiles::update_streak(&connection, id, 31, 31, date(2024, 3, 10), true, true).unwrap();

        let kept = recompute_streak_clubs(&connection, id, date(2024, 3, 11)).unwrap();
        assert_eq!(kept.highest(), Some(Club::Monthly));

        let lapsed = recompute_streak_clubs(&connection, id, date(2024, 3, 12)).unwrap();
        assert_eq!(lapsed.highest(), None);
        let profile = profiles::query_profile(&connection, id).unwrap().unwrap();
        assert!(!profile.clubs.weekly && !profile.clubs.monthly);
    }

    #[test]
    fn unknown_users_are_rejected() {
        let connection = connect_in_memory().unwrap();
        let err = recompute_club_membership(&connection, 42, 10).unwrap_err();
        assert!(matches!(err, EngagementError::UnknownUser(_)));
    }
}
