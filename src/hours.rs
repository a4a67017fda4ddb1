use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tracing::warn;

use crate::model::{IssueKey, IssueRecord, Warning};
use crate::session::Session;

const HOURS_FIELD: &str = "hours";

const PROJECTS_QUERY: &str = r#"
query OrgProjects($org: String!) {
  organization(login: $org) {
    projectsV2(first: 20) {
      nodes {
        id
        title
        fields(first: 20) {
          nodes {
            ... on ProjectV2Field {
              id
              name
            }
            ... on ProjectV2IterationField {
              id
              name
            }
            ... on ProjectV2SingleSelectField {
              id
              name
            }
          }
        }
      }
    }
  }
}
"#;

const ITEMS_QUERY: &str = r#"
query ProjectItems($projectId: ID!) {
  node(id: $projectId) {
    ... on ProjectV2 {
      items(first: 100) {
        nodes {
          id
          fieldValues(first: 20) {
            nodes {
              ... on ProjectV2ItemFieldNumberValue {
                field { ... on ProjectV2Field { name } }
                number
              }
            }
          }
          content {
            ... on Issue {
              number
              repository {
                name
              }
            }
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct ProjectsData {
    organization: Option<OrganizationNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationNode {
    projects_v2: Option<ProjectConnection>,
}

#[derive(Debug, Deserialize)]
struct ProjectConnection {
    nodes: Vec<ProjectNode>,
}

#[derive(Debug, Deserialize)]
struct ProjectNode {
    id: String,
    title: String,
    fields: FieldConnection,
}

#[derive(Debug, Deserialize)]
struct FieldConnection {
    nodes: Vec<FieldNode>,
}

// Inline fragments deserialize to empty objects for unmatched field kinds.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FieldNode {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemsData {
    node: Option<ProjectItemsNode>,
}

#[derive(Debug, Deserialize)]
struct ProjectItemsNode {
    items: ItemConnection,
}

#[derive(Debug, Deserialize)]
struct ItemConnection {
    nodes: Vec<ItemNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ItemNode {
    pub(crate) field_values: FieldValueConnection,
    pub(crate) content: Option<ItemContent>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FieldValueConnection {
    pub(crate) nodes: Vec<FieldValueNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct FieldValueNode {
    pub(crate) field: Option<FieldRef>,
    pub(crate) number: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FieldRef {
    pub(crate) name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ItemContent {
    pub(crate) number: Option<u64>,
    pub(crate) repository: Option<RepositoryRef>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RepositoryRef {
    pub(crate) name: String,
}

/// Fill in `hours` on collected issues from each org's project board.
///
/// Matching is by (org, repo, number); ids are never compared, they are not
/// comparable across the REST and GraphQL surfaces. Failures are isolated
/// per org and returned as warnings.
pub async fn reconcile(
    session: &Session,
    project_name: &str,
    issues: &mut [IssueRecord],
    orgs: &[String],
) -> Vec<Warning> {
    let index = build_index(issues);
    let mut warnings = Vec::new();

    for org in orgs {
        if let Err(err) = reconcile_org(session, project_name, issues, &index, org).await {
            warn!(%org, error = %err, "skipping org during hours reconciliation");
            warnings.push(Warning::new(org, err));
        }
    }

    warnings
}

async fn reconcile_org(
    session: &Session,
    project_name: &str,
    issues: &mut [IssueRecord],
    index: &HashMap<IssueKey, usize>,
    org: &str,
) -> Result<()> {
    let data: ProjectsData = session
        .client()
        .graphql(PROJECTS_QUERY, serde_json::json!({ "org": org }))
        .await?;

    let projects = data
        .organization
        .and_then(|o| o.projects_v2)
        .map(|c| c.nodes)
        .unwrap_or_default();

    let board = projects
        .into_iter()
        .find(|p| p.title == project_name)
        .ok_or_else(|| anyhow!("project \"{project_name}\" not found in {org}"))?;

    board
        .fields
        .nodes
        .iter()
        .find(|f| field_is_hours(f))
        .ok_or_else(|| anyhow!("hours field not found in project \"{project_name}\" of {org}"))?;

    let data: ItemsData = session
        .client()
        .graphql(ITEMS_QUERY, serde_json::json!({ "projectId": board.id }))
        .await?;

    let items = data.node.map(|n| n.items.nodes).unwrap_or_default();
    apply_board_items(issues, index, org, &items);
    Ok(())
}

fn field_is_hours(field: &FieldNode) -> bool {
    field
        .name
        .as_deref()
        .is_some_and(|name| name.eq_ignore_ascii_case(HOURS_FIELD))
}

/// Index collected issues by their identifying triple so matching stays
/// linear in the number of board items.
pub(crate) fn build_index(issues: &[IssueRecord]) -> HashMap<IssueKey, usize> {
    issues
        .iter()
        .enumerate()
        .map(|(slot, issue)| (issue.key(), slot))
        .collect()
}

/// Write hour values onto matching issues. Items without an issue behind
/// them, or without a numeric hours value, are skipped; unmatched items are
/// ignored. Only the `hours` attribute is ever touched.
pub(crate) fn apply_board_items(
    issues: &mut [IssueRecord],
    index: &HashMap<IssueKey, usize>,
    org: &str,
    items: &[ItemNode],
) -> usize {
    let mut matched = 0;

    for item in items {
        let Some(content) = &item.content else {
            continue;
        };
        let (Some(number), Some(repository)) = (content.number, content.repository.as_ref()) else {
            continue;
        };
        let Some(hours) = item_hours(item) else {
            continue;
        };

        let key = (org.to_string(), repository.name.clone(), number);
        if let Some(&slot) = index.get(&key) {
            issues[slot].hours = Some(hours);
            matched += 1;
        }
    }

    matched
}

fn item_hours(item: &ItemNode) -> Option<f64> {
    item.field_values
        .nodes
        .iter()
        .find(|fv| {
            fv.field
                .as_ref()
                .and_then(|f| f.name.as_deref())
                .is_some_and(|name| name.eq_ignore_ascii_case(HOURS_FIELD))
        })
        .and_then(|fv| fv.number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(org: &str, repo: &str, number: u64) -> IssueRecord {
        IssueRecord {
            id: number * 1000,
            number,
            title: format!("issue {number}"),
            url: String::new(),
            repo: repo.to_string(),
            org: org.to_string(),
            closed_at: None,
            updated_at: None,
            created_at: None,
            hours: None,
        }
    }

    fn board_item(repo: &str, number: u64, field: &str, hours: f64) -> ItemNode {
        ItemNode {
            field_values: FieldValueConnection {
                nodes: vec![FieldValueNode {
                    field: Some(FieldRef {
                        name: Some(field.to_string()),
                    }),
                    number: Some(hours),
                }],
            },
            content: Some(ItemContent {
                number: Some(number),
                repository: Some(RepositoryRef {
                    name: repo.to_string(),
                }),
            }),
        }
    }

    #[test]
    fn matches_by_org_repo_number_triple() {
        let mut issues = vec![issue("acme", "widget", 5), issue("acme", "gadget", 5)];
        let index = build_index(&issues);
        let items = vec![board_item("widget", 5, "Hours", 3.5)];

        let matched = apply_board_items(&mut issues, &index, "acme", &items);
        assert_eq!(matched, 1);
        assert_eq!(issues[0].hours, Some(3.5));
        assert_eq!(issues[1].hours, None);
    }

    #[test]
    fn same_repo_and_number_in_other_org_does_not_match() {
        let mut issues = vec![issue("acme", "widget", 5)];
        let index = build_index(&issues);
        let items = vec![board_item("widget", 5, "hours", 2.0)];

        let matched = apply_board_items(&mut issues, &index, "other-org", &items);
        assert_eq!(matched, 0);
        assert_eq!(issues[0].hours, None);
    }

    #[test]
    fn items_without_issue_content_or_hours_are_skipped() {
        let mut issues = vec![issue("acme", "widget", 5)];
        let index = build_index(&issues);

        let draft = ItemNode::default();
        let wrong_field = board_item("widget", 5, "Estimate", 8.0);

        let matched = apply_board_items(&mut issues, &index, "acme", &[draft, wrong_field]);
        assert_eq!(matched, 0);
        assert_eq!(issues[0].hours, None);
    }

    #[test]
    fn only_hours_is_mutated() {
        let mut issues = vec![issue("acme", "widget", 5)];
        let before = issues[0].clone();
        let index = build_index(&issues);
        let items = vec![board_item("widget", 5, "HOURS", 1.25)];

        apply_board_items(&mut issues, &index, "acme", &items);
        assert_eq!(issues[0].hours, Some(1.25));
        assert_eq!(issues[0].id, before.id);
        assert_eq!(issues[0].number, before.number);
        assert_eq!(issues[0].title, before.title);
        assert_eq!(issues[0].repo, before.repo);
        assert_eq!(issues[0].org, before.org);
    }
}
