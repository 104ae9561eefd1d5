use anyhow::{Context, Result};
use chrono::Utc;
use itertools::Itertools;
use regex::Regex;

use std::sync::LazyLock;

use crate::clubs;
use crate::engdb::{self, contributors, profiles};
use crate::ghapi::ContributorSource;
use crate::models::Contributor;
use crate::tasks::TaskContext;

static GITHUB_LOGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,37}[A-Za-z0-9])?$")
        .expect("GitHub login pattern is valid")
});

/// Pulls contributors for every configured repository, then upserts them and
/// refreshes the contribution clubs of linked profiles.
///
/// All network I/O happens before the first write; each contributor is then
/// stored in its own short transaction.
pub async fn sync_contributors<S: ContributorSource>(ctx: &TaskContext<'_, S>) -> Result<String> {
    if ctx.repositories.is_empty() {
        log::warn!("[sync_contributors] No repositories configured, nothing to sync.");
        return Ok(String::from("no repositories configured"));
    }

    let mut fetched = Vec::new();
    for repo in &ctx.repositories {
        let batch = ctx
            .source
            .fetch_contributors(repo)
            .await
            .with_context(|| format!("Could not fetch contributors for {repo}"))?;
        fetched.extend(batch);
    }

    let merged = merge_contributors(fetched);
    if ctx.dry_run {
        for contributor in &merged {
            log::info!("[sync_contributors] Would upsert {} ({} contributions)",
                       contributor.login, contributor.contributions);
        }
        return Ok(format!("{} contributors fetched, nothing written", merged.len()));
    }

    let synced_at = Utc::now();
    let mut created = 0;
    let mut linked = 0;
    for contributor in &merged {
        let tx = engdb::begin_write(ctx.connection)?;

        if contributors::upsert_contributor(&tx, contributor, synced_at)? {
            created += 1;
        }

        for profile in profiles::query_profiles_by_github_login(&tx, &contributor.login)? {
            clubs::recompute_club_membership(&tx, profile.user_id, contributor.contributions)?;
            linked += 1;
        }

        tx.commit()?;
    }

    Ok(format!(
        "{} contributors synced ({created} new), {linked} profiles updated",
        merged.len()
    ))
}

/// Drops bots and malformed logins, then sums contributions per GitHub id
/// across repositories. The result is ordered by GitHub id.
pub fn merge_contributors(fetched: Vec<Contributor>) -> Vec<Contributor> {
    fetched
        .into_iter()
        .filter(|c| {
            let keep = !c.is_bot() && GITHUB_LOGIN.is_match(&c.login);
            if !keep {
                log::debug!("[merge_contributors] Skipping {}", c.login);
            }
            keep
        })
        .into_group_map_by(|c| c.github_id)
        .into_values()
        .filter_map(|group| {
            let total = group.iter().map(|c| c.contributions).sum::<u32>();
            group.into_iter().next().map(|first| Contributor { contributions: total, ..first })
        })
        .sorted_by_key(|c| c.github_id)
        .collect()
}
