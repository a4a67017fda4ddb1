use anyhow::{Context, Result};
use clap::Parser;
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;
use crate::config::{self, Settings, StatePaths};
use crate::session::Session;

pub struct AppContext {
    paths: StatePaths,
    settings: OnceCell<Settings>,
    session: OnceCell<Session>,
}

impl AppContext {
    pub fn new() -> Result<Self> {
        Ok(Self {
            paths: StatePaths::new()?,
            settings: OnceCell::new(),
            session: OnceCell::new(),
        })
    }

    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }

    pub fn settings(&self) -> Result<&Settings> {
        self.settings
            .get_or_try_init(|| config::load_settings(&self.paths))
    }

    /// The session, if a command already created one this run.
    pub fn session_if_started(&self) -> Option<&Session> {
        self.session.get()
    }

    /// The authenticated session, created lazily from the persisted token.
    pub fn session(&self) -> Result<&Session> {
        self.session.get_or_try_init(|| {
            let token = config::load_token(&self.paths)?
                .context("not logged in; run `gh-invoicer login` first")?;
            Ok(Session::new(token))
        })
    }
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();
    let ctx = AppContext::new()?;
    cli.execute(&ctx).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
