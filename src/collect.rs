use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::config::Settings;
use crate::model::{IssueRecord, Warning};
use crate::session::Session;

const PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct RepoSummary {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueItem {
    pub(crate) id: u64,
    pub(crate) number: u64,
    pub(crate) title: String,
    pub(crate) html_url: String,
    pub(crate) closed_at: Option<DateTime<Utc>>,
    pub(crate) updated_at: Option<DateTime<Utc>>,
    pub(crate) created_at: Option<DateTime<Utc>>,
    // Present when the item is actually a pull request.
    pub(crate) pull_request: Option<Value>,
}

/// Result of one collection run: the fresh issue list plus the per-org and
/// per-repo failures that were absorbed along the way.
#[derive(Debug)]
pub struct Collection {
    pub issues: Vec<IssueRecord>,
    pub warnings: Vec<Warning>,
}

/// The organization set for a run: the filtered org, or everything
/// configured.
pub fn resolve_orgs(settings: &Settings, org_filter: Option<&str>) -> Vec<String> {
    match org_filter {
        Some(org) => vec![org.to_string()],
        None => settings.orgs.clone(),
    }
}

/// Enumerate closed issues assigned to the authenticated user across the
/// given orgs, one page per repository.
///
/// Failures at org or repo granularity are logged and absorbed; they never
/// abort the run. Pagination beyond the first page is deliberately not
/// followed.
pub async fn collect(
    session: &Session,
    orgs: &[String],
    lookback_days: i64,
) -> anyhow::Result<Collection> {
    let identity = session.identity().await?;
    let since = (Utc::now() - Duration::days(lookback_days))
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    for org in orgs {
        let repos: Vec<RepoSummary> = match session
            .client()
            .get(&format!("/orgs/{org}/repos?per_page={PAGE_SIZE}"))
            .await
        {
            Ok(repos) => repos,
            Err(err) => {
                warn!(%org, error = %err, "skipping org: repository listing failed");
                warnings.push(Warning::new(org, err));
                continue;
            }
        };

        for repo in &repos {
            let endpoint = format!(
                "/repos/{org}/{repo}/issues?assignee={assignee}&state=closed&since={since}&per_page={PAGE_SIZE}",
                repo = repo.name,
                assignee = identity.login,
            );
            let items: Vec<IssueItem> = match session.client().get(&endpoint).await {
                Ok(items) => items,
                Err(err) => {
                    warn!(%org, repo = %repo.name, error = %err, "skipping repo: issue listing failed");
                    warnings.push(Warning::new(format!("{org}/{}", repo.name), err));
                    continue;
                }
            };

            issues.extend(project_issues(items, org, &repo.name));
        }
    }

    sort_newest_closed_first(&mut issues);
    Ok(Collection { issues, warnings })
}

/// Project raw issue items into records, dropping pull requests (the issues
/// endpoint returns both).
pub(crate) fn project_issues(items: Vec<IssueItem>, org: &str, repo: &str) -> Vec<IssueRecord> {
    items
        .into_iter()
        .filter(|item| item.pull_request.is_none())
        .map(|item| IssueRecord {
            id: item.id,
            number: item.number,
            title: item.title,
            url: item.html_url,
            repo: repo.to_string(),
            org: org.to_string(),
            closed_at: item.closed_at,
            updated_at: item.updated_at,
            created_at: item.created_at,
            hours: None,
        })
        .collect()
}

/// Stable sort by closed timestamp descending; records with no closed
/// timestamp sort as earliest (i.e. last).
pub(crate) fn sort_newest_closed_first(issues: &mut [IssueRecord]) {
    issues.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;

    use super::*;

    fn item(id: u64, number: u64, closed_day: Option<u32>) -> IssueItem {
        IssueItem {
            id,
            number,
            title: format!("issue {number}"),
            html_url: format!("https://github.com/acme/widget/issues/{number}"),
            closed_at: closed_day.map(|d| Utc.with_ymd_and_hms(2026, 8, d, 12, 0, 0).unwrap()),
            updated_at: None,
            created_at: None,
            pull_request: None,
        }
    }

    #[test]
    fn pull_requests_are_excluded() {
        let mut pr = item(1, 7, Some(1));
        pr.pull_request = Some(serde_json::json!({"url": "x"}));
        let records = project_issues(vec![pr, item(2, 8, Some(2))], "acme", "widget");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number, 8);
    }

    #[test]
    fn projection_leaves_hours_unset_and_keys_unique() {
        let records = project_issues(
            vec![item(1, 5, Some(1)), item(2, 6, Some(2)), item(3, 7, None)],
            "acme",
            "widget",
        );
        assert!(records.iter().all(|r| r.hours.is_none()));
        let keys: HashSet<_> = records.iter().map(|r| r.key()).collect();
        assert_eq!(keys.len(), records.len());
    }

    #[test]
    fn sorts_newest_closed_first_with_missing_dates_last() {
        let mut records = project_issues(
            vec![item(1, 5, Some(3)), item(2, 6, None), item(3, 7, Some(9))],
            "acme",
            "widget",
        );
        sort_newest_closed_first(&mut records);
        let numbers: Vec<u64> = records.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![7, 5, 6]);
    }

    #[test]
    fn org_filter_narrows_the_set() {
        let settings = Settings::default();
        assert_eq!(resolve_orgs(&settings, Some("acme")), vec!["acme"]);
        assert_eq!(resolve_orgs(&settings, None), settings.orgs);
    }
}
