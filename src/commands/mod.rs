pub mod app_install;
pub mod auth;
pub mod history;
pub mod invoice;
pub mod issues;
pub mod settings;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand};

use crate::app::AppContext;

pub use app_install::AppCommand;
pub use auth::{LoginCommand, LogoutCommand};
pub use history::HistoryCommand;
pub use invoice::InvoiceCommand;
pub use issues::IssuesCommand;
pub use settings::SettingsCommand;

#[async_trait]
pub trait CliCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()>;
}

#[derive(Parser, Debug, Clone)]
#[command(name = "gh-invoicer", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: RootCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RootCommand {
    Login(LoginCommand),
    Logout(LogoutCommand),
    Issues(IssuesCommand),
    Invoice(InvoiceCommand),
    History(HistoryCommand),
    #[command(subcommand)]
    Settings(SettingsCommand),
    #[command(subcommand)]
    App(AppCommand),
}

impl Cli {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        match self.command {
            RootCommand::Login(cmd) => cmd.execute(ctx).await,
            RootCommand::Logout(cmd) => cmd.execute(ctx).await,
            RootCommand::Issues(cmd) => cmd.execute(ctx).await,
            RootCommand::Invoice(cmd) => cmd.execute(ctx).await,
            RootCommand::History(cmd) => cmd.execute(ctx).await,
            RootCommand::Settings(cmd) => cmd.execute(ctx).await,
            RootCommand::App(cmd) => cmd.execute(ctx).await,
        }
    }
}
