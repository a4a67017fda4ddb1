use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use clap::Args;

use crate::app::AppContext;
use crate::commands::issues::{load_annotated_issues, report_warnings};
use crate::commands::CliCommand;
use crate::config::{self, APP_INSTALL_URL};
use crate::invoice::{assemble, format_currency, generate_filename, render_yaml, InvoiceParams};
use crate::model::IssueRecord;
use crate::store;

#[derive(Args, Debug, Clone)]
#[command(about = "Assemble an invoice from selected issues and push it to GitHub")]
pub struct InvoiceCommand {
    /// Comma-separated issue ids (as shown by `issues`)
    #[arg(long, conflicts_with = "all")]
    pub select: Option<String>,
    /// Invoice every collected issue
    #[arg(long)]
    pub all: bool,
    /// Restrict collection to a single organization
    #[arg(long)]
    pub org: Option<String>,
    /// How many days back to look
    #[arg(long, default_value_t = 30)]
    pub days: i64,
    /// Client company name; defaults to the last one used
    #[arg(long)]
    pub client: Option<String>,
    /// Print the document without uploading
    #[arg(long)]
    pub dry_run: bool,
}

#[async_trait]
impl CliCommand for InvoiceCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let settings = ctx.settings()?.clone();
        validate_settings(&settings)?;

        let (issues, warnings) = load_annotated_issues(ctx, self.org.as_deref(), self.days).await?;
        report_warnings(&warnings);

        let selected = if self.all {
            issues
        } else {
            let ids = parse_selection(
                self.select
                    .as_deref()
                    .context("pass --select with issue ids, or --all")?,
            )?;
            resolve_selection(issues, &ids)?
        };

        if selected.is_empty() {
            bail!("no issues selected");
        }
        let without_hours = selected.iter().filter(|i| i.hours.is_none()).count();
        if without_hours > 0 {
            println!("Note: {without_hours} selected issue(s) have no hours and count as 0h.");
        }

        let session = ctx.session()?;
        let identity = session.identity().await?;
        let client_company = self
            .client
            .clone()
            .unwrap_or_else(|| settings.last_client.clone());
        let today = Utc::now().date_naive();

        let document = assemble(&InvoiceParams {
            username: &identity.login,
            contractor_company: &settings.contractor_company,
            contractor_id: &settings.contractor_id,
            bank_info: &settings.bank_info,
            client_company: &client_company,
            issues: &selected,
            hourly_rate: settings.hourly_rate,
            currency: &settings.currency,
            payment_method: &settings.payment_method,
            generated_on: today,
        });
        let yaml = render_yaml(&document)?;

        println!("{yaml}");
        println!(
            "Total: {}h = {}",
            document.total_hours,
            format_currency(document.total_amount(), &document.currency)
        );

        if self.dry_run {
            return Ok(());
        }

        let filename = generate_filename(&identity.login, today);
        let uploaded = store::upload(session, &filename, &yaml).await?;

        if client_company != settings.last_client {
            let mut updated = settings;
            updated.last_client = client_company;
            config::save_settings(ctx.paths(), &updated)?;
        }

        println!("Invoice uploaded: {}", uploaded.url);

        if !config::app_install_confirmed(ctx.paths()) {
            println!();
            println!("Install the invoice-writer app so your client gets notified:");
            println!("  {APP_INSTALL_URL}");
            println!("Then run `gh-invoicer app confirm-install` to stop seeing this.");
        }

        Ok(())
    }
}

fn validate_settings(settings: &config::Settings) -> Result<()> {
    if settings.contractor_company.is_empty() {
        bail!("contractor company is not set; run `gh-invoicer settings set --company ...`");
    }
    if settings.hourly_rate <= 0.0 {
        bail!("hourly rate is not set; run `gh-invoicer settings set --hourly-rate ...`");
    }
    if settings.bank_info.is_empty() {
        bail!("bank info is not set; run `gh-invoicer settings set --bank-info ...`");
    }
    Ok(())
}

fn parse_selection(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .with_context(|| format!("`{part}` is not an issue id"))
        })
        .collect()
}

/// Keep the collected issues whose ids were selected; selecting an id that
/// was not collected is an error rather than a silent omission.
fn resolve_selection(issues: Vec<IssueRecord>, ids: &[u64]) -> Result<Vec<IssueRecord>> {
    let selected: Vec<IssueRecord> = issues
        .into_iter()
        .filter(|issue| ids.contains(&issue.id))
        .collect();

    for id in ids {
        if !selected.iter().any(|issue| issue.id == *id) {
            bail!("issue id {id} is not in the collected set; run `gh-invoicer issues` first");
        }
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64) -> IssueRecord {
        IssueRecord {
            id,
            number: id,
            title: String::new(),
            url: String::new(),
            repo: "widget".to_string(),
            org: "acme".to_string(),
            closed_at: None,
            updated_at: None,
            created_at: None,
            hours: None,
        }
    }

    #[test]
    fn selection_parses_comma_separated_ids() {
        assert_eq!(parse_selection("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_selection("1,x").is_err());
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let issues = vec![record(1), record(2)];
        assert!(resolve_selection(issues, &[1, 9]).is_err());
    }

    #[test]
    fn selection_keeps_collection_order() {
        let issues = vec![record(3), record(1), record(2)];
        let selected = resolve_selection(issues, &[1, 3]).unwrap();
        let ids: Vec<u64> = selected.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }
}
