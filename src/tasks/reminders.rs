use anyhow::Result;

use crate::engdb::profiles;
use crate::tasks::TaskContext;

/// Lists users whose streak breaks unless they check in today.
pub fn check_in_reminders<S>(ctx: &TaskContext<'_, S>) -> Result<String> {
    let at_risk = profiles::query_streaks_at_risk(ctx.connection, ctx.today)?;

    for profile in &at_risk {
        log::info!(
            "[check_in_reminders] Reminder: {} is on a {}-day streak and has not checked in on {}",
            profile.username, profile.current_streak, ctx.today
        );
    }

    Ok(format!("{} users reminded", at_risk.len()))
}
