use anyhow::{Result, anyhow};

use crate::clubs::{self, ContributionTiers, StreakTiers};
use crate::engdb::{self, points, profiles};
use crate::error::{EngagementError, EngagementResult};
use crate::leaderboard;
use crate::models::UserId;
use crate::tasks::TaskContext;

/// Re-derives every user's clubs from their stored contribution count and
/// their effective streak. Each user is updated in their own transaction.
pub fn recompute_clubs<S>(ctx: &TaskContext<'_, S>) -> Result<String> {
    let user_ids = profiles::query_all_user_ids(ctx.connection)?;
    let mut changed = 0;

    let failures = for_each_user(&user_ids, |user_id| {
        let profile = profiles::query_profile(ctx.connection, user_id)?
            .ok_or_else(|| EngagementError::UnknownUser(user_id.to_string()))?;

        let contribution = ContributionTiers::classify(profile.contribution_count);
        let streak = StreakTiers::classify(clubs::effective_streak(&profile, ctx.today));
        let stale = contribution.ten != profile.clubs.ten
            || contribution.fifty != profile.clubs.fifty
            || contribution.hundred != profile.clubs.hundred
            || streak.weekly != profile.clubs.weekly
            || streak.monthly != profile.clubs.monthly;

        if stale {
            changed += 1;
            log::info!("[recompute_clubs] {}'s clubs are out of date", profile.username);
        }
        if ctx.dry_run || !stale {
            return Ok(());
        }

        let tx = engdb::begin_write(ctx.connection)?;
        clubs::recompute_club_membership(&tx, user_id, profile.contribution_count)?;
        clubs::recompute_streak_clubs(&tx, user_id, ctx.today)?;
        tx.commit()?;
        Ok(())
    });

    summarize("clubs", user_ids.len(), changed, failures, ctx.dry_run)
}

/// Rewrites every cached leaderboard score from the ledger.
pub fn recompute_leaderboard<S>(ctx: &TaskContext<'_, S>) -> Result<String> {
    let user_ids = profiles::query_all_user_ids(ctx.connection)?;
    let mut changed = 0;

    let failures = for_each_user(&user_ids, |user_id| {
        let profile = profiles::query_profile(ctx.connection, user_id)?
            .ok_or_else(|| EngagementError::UnknownUser(user_id.to_string()))?;
        let total = points::query_total(ctx.connection, user_id)?;

        if total != profile.leaderboard_score {
            changed += 1;
            log::info!("[recompute_leaderboard] {}'s score drifted: cached {}, ledger {total}",
                       profile.username, profile.leaderboard_score);
        }
        if !ctx.dry_run {
            leaderboard::recompute_leaderboard(ctx.connection, user_id)?;
        }
        Ok(())
    });

    summarize("scores", user_ids.len(), changed, failures, ctx.dry_run)
}

/// Runs `update` for every user, carrying on past failures. Returns how many
/// users failed.
fn for_each_user(
    user_ids: &[UserId],
    mut update: impl FnMut(UserId) -> EngagementResult<()>,
) -> usize {
    let mut failures = 0;
    for &user_id in user_ids {
        if let Err(err) = update(user_id) {
            log::error!("[for_each_user] Update for {user_id} failed: {err}");
            failures += 1;
        }
    }

    failures
}

fn summarize(what: &str, total: usize, changed: usize, failures: usize, dry_run: bool) -> Result<String> {
    if failures > 0 {
        return Err(anyhow!("{failures} of {total} users could not be updated"));
    }

    let verb = if dry_run { "would change" } else { "changed" };
    Ok(format!("{total} users checked, {what} {verb} for {changed}"))
}
