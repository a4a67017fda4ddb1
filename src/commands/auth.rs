use std::io::{self, Write};

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::Args;

use crate::app::AppContext;
use crate::commands::CliCommand;
use crate::config;
use crate::github;

const TOKEN_PREFIXES: &[&str] = &["ghp_", "github_pat_"];

#[derive(Args, Debug, Clone)]
#[command(about = "Store a GitHub personal access token")]
pub struct LoginCommand {
    /// Token value; prompted for interactively when omitted
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Args, Debug, Clone)]
#[command(about = "Forget the stored token")]
pub struct LogoutCommand;

#[async_trait]
impl CliCommand for LoginCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let token = match &self.token {
            Some(token) => token.trim().to_string(),
            None => prompt_for_token()?,
        };

        if token.is_empty() {
            bail!("token cannot be empty");
        }
        if !TOKEN_PREFIXES.iter().any(|p| token.starts_with(p)) {
            bail!("that does not look like a GitHub token (expected a ghp_ or github_pat_ prefix)");
        }

        let identity = github::validate_token(&token).await?;
        config::save_token(ctx.paths(), &token)?;

        println!("Logged in as {}", identity.login);
        Ok(())
    }
}

#[async_trait]
impl CliCommand for LogoutCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        if let Some(session) = ctx.session_if_started() {
            session.invalidate_identity().await;
        }
        config::clear_token(ctx.paths())?;
        println!("Logged out.");
        Ok(())
    }
}

fn prompt_for_token() -> Result<String> {
    print!("Paste your GitHub personal access token (ghp_... or github_pat_...): ");
    io::stdout().flush()?;
    let mut token = String::new();
    io::stdin().read_line(&mut token)?;
    Ok(token.trim().to_string())
}
