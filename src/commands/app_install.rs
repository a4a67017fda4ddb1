use anyhow::Result;
use async_trait::async_trait;
use clap::Subcommand;

use crate::app::AppContext;
use crate::commands::CliCommand;
use crate::config::{self, APP_INSTALL_URL};

#[derive(Subcommand, Debug, Clone)]
pub enum AppCommand {
    /// Print the companion app install link
    InstallLink,
    /// Record that the companion app is installed
    ConfirmInstall,
}

#[async_trait]
impl CliCommand for AppCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            AppCommand::InstallLink => {
                println!("{APP_INSTALL_URL}");
                Ok(())
            }
            AppCommand::ConfirmInstall => {
                config::confirm_app_install(ctx.paths())?;
                println!("Companion app marked as installed.");
                Ok(())
            }
        }
    }
}
