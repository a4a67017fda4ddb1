use anyhow::Result;
use async_trait::async_trait;
use clap::Args;

use crate::app::AppContext;
use crate::collect;
use crate::commands::CliCommand;
use crate::hours;
use crate::model::{IssueRecord, Warning};

#[derive(Args, Debug, Clone)]
#[command(about = "List closed issues assigned to you, annotated with board hours")]
pub struct IssuesCommand {
    /// Restrict to a single organization
    #[arg(long)]
    pub org: Option<String>,
    /// How many days back to look
    #[arg(long, default_value_t = 30)]
    pub days: i64,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[async_trait]
impl CliCommand for IssuesCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let (issues, warnings) = load_annotated_issues(ctx, self.org.as_deref(), self.days).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&issues)?);
            return Ok(());
        }

        if issues.is_empty() {
            println!("No closed issues found in the last {} days.", self.days);
        }
        for issue in &issues {
            let date = issue
                .display_date()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "no date".to_string());
            let hours = issue
                .hours
                .map(|h| format!("{h}h"))
                .unwrap_or_else(|| "no hours".to_string());
            println!(
                "{:>12}  {}/{}#{}  {}  {:>9}  {}",
                issue.id, issue.org, issue.repo, issue.number, date, hours, issue.title
            );
        }

        report_warnings(&warnings);
        Ok(())
    }
}

/// Run the pipeline: collect closed issues, then fill in hours from each
/// org's project board. Warnings from both stages are merged.
pub(crate) async fn load_annotated_issues(
    ctx: &AppContext,
    org: Option<&str>,
    days: i64,
) -> Result<(Vec<IssueRecord>, Vec<Warning>)> {
    let settings = ctx.settings()?;
    let session = ctx.session()?;
    let orgs = collect::resolve_orgs(settings, org);

    let collection = collect::collect(session, &orgs, days).await?;
    let mut issues = collection.issues;
    let mut warnings = collection.warnings;

    warnings
        .extend(hours::reconcile(session, &settings.project_name, &mut issues, &orgs).await);

    Ok((issues, warnings))
}

pub(crate) fn report_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    println!(
        "{} source(s) could not be fully enumerated; results may be incomplete:",
        warnings.len()
    );
    for warning in warnings {
        println!("  {}: {}", warning.scope, warning.message);
    }
}
