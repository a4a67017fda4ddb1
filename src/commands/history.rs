use anyhow::Result;
use async_trait::async_trait;
use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::commands::CliCommand;
use crate::invoice::{fallback_summary, format_currency, parse_summary, InvoiceSummary};

#[derive(Args, Debug, Clone)]
#[command(about = "List previously uploaded invoices")]
pub struct HistoryCommand {
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct HistoryEntry {
    name: String,
    url: String,
    #[serde(flatten)]
    summary: InvoiceSummary,
}

#[async_trait]
impl CliCommand for HistoryCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let settings = ctx.settings()?;
        let session = ctx.session()?;

        let files = crate::store::history(session).await;
        if files.is_empty() {
            println!("No invoices yet.");
            return Ok(());
        }

        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            // A file that fails to download or parse still gets a row,
            // summarized from its filename.
            let summary = match &file.download_url {
                Some(url) => match session.client().download_text(url).await {
                    Ok(content) => parse_summary(&file.name, &content),
                    Err(_) => fallback_summary(&file.name),
                },
                None => fallback_summary(&file.name),
            };
            entries.push(HistoryEntry {
                name: file.name,
                url: file.url,
                summary,
            });
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        for entry in &entries {
            println!(
                "{}  {} - {}h  {}",
                entry.name,
                entry.summary.client,
                entry.summary.hours,
                format_currency(entry.summary.amount, &settings.currency)
            );
            println!("  {}", entry.url);
        }
        Ok(())
    }
}
