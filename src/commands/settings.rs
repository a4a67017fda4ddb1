use anyhow::Result;
use async_trait::async_trait;
use clap::Subcommand;

use crate::app::AppContext;
use crate::commands::CliCommand;
use crate::config;

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Print the current settings
    Show,
    /// Update one or more settings fields
    Set {
        /// Contractor company name
        #[arg(long)]
        company: Option<String>,
        /// Contractor tax/registration id
        #[arg(long)]
        contractor_id: Option<String>,
        /// Hourly rate
        #[arg(long)]
        hourly_rate: Option<f64>,
        /// Currency code, e.g. USD or BRL
        #[arg(long)]
        currency: Option<String>,
        /// Bank details printed on the invoice
        #[arg(long)]
        bank_info: Option<String>,
        /// Payment method, e.g. "Wire Transfer"
        #[arg(long)]
        payment_method: Option<String>,
        /// Default client company
        #[arg(long)]
        client: Option<String>,
        /// Organizations to collect from (repeatable)
        #[arg(long = "org")]
        orgs: Vec<String>,
        /// Project board title that carries the hours field
        #[arg(long)]
        project_name: Option<String>,
    },
}

#[async_trait]
impl CliCommand for SettingsCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            SettingsCommand::Show => {
                let settings = ctx.settings()?;
                println!("{}", serde_json::to_string_pretty(settings)?);
                Ok(())
            }
            SettingsCommand::Set {
                company,
                contractor_id,
                hourly_rate,
                currency,
                bank_info,
                payment_method,
                client,
                orgs,
                project_name,
            } => {
                let mut settings = ctx.settings()?.clone();

                if let Some(value) = company {
                    settings.contractor_company = value.clone();
                }
                if let Some(value) = contractor_id {
                    settings.contractor_id = value.clone();
                }
                if let Some(value) = hourly_rate {
                    settings.hourly_rate = *value;
                }
                if let Some(value) = currency {
                    settings.currency = value.clone();
                }
                if let Some(value) = bank_info {
                    settings.bank_info = value.clone();
                }
                if let Some(value) = payment_method {
                    settings.payment_method = value.clone();
                }
                if let Some(value) = client {
                    settings.last_client = value.clone();
                }
                if !orgs.is_empty() {
                    settings.orgs = orgs.clone();
                }
                if let Some(value) = project_name {
                    settings.project_name = value.clone();
                }

                config::save_settings(ctx.paths(), &settings)?;
                println!("Settings saved.");
                Ok(())
            }
        }
    }
}
