use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::invoice::INVOICE_EXTENSION;
use crate::session::Session;

const INVOICES_REPO: &str = "Invoices";
const WEB_ORIGIN: &str = "https://github.com";
const DEFAULT_BRANCH: &str = "main";

// Repository creation is eventually consistent; poll until the repo probe
// succeeds, bounded so a stuck backend cannot hang the upload.
const SETTLE_ATTEMPTS: u32 = 8;
const SETTLE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct UploadedInvoice {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct RepoContent {
    name: String,
    html_url: String,
    download_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InvoiceFile {
    pub name: String,
    pub url: String,
    pub download_url: Option<String>,
}

/// Write an invoice as a new file in the user's `Invoices` repository,
/// creating the repository first if it does not exist yet.
///
/// The returned URL is built locally from the platform's blob-URL
/// convention, not read back from the response.
pub async fn upload(session: &Session, filename: &str, content: &str) -> Result<UploadedInvoice> {
    let identity = session.identity().await?;
    let login = identity.login.as_str();

    if !repo_exists(session, login).await {
        create_invoices_repo(session).await?;
        settle(session, login).await;
    }

    let encoded = BASE64.encode(content.as_bytes());
    let body = json!({
        "message": format!("Add invoice: {filename}"),
        "content": encoded,
    });
    let _: Value = session
        .client()
        .put(
            &format!("/repos/{login}/{INVOICES_REPO}/contents/{filename}"),
            body,
        )
        .await
        .with_context(|| format!("failed to upload {filename}"))?;

    Ok(UploadedInvoice {
        url: blob_url(login, filename),
    })
}

/// Prior invoices in the destination repository, newest filename first.
/// Advisory: any failure (including a missing repository) yields an empty
/// list.
pub async fn history(session: &Session) -> Vec<InvoiceFile> {
    let identity = match session.identity().await {
        Ok(identity) => identity,
        Err(err) => {
            warn!(error = %err, "invoice history unavailable");
            return Vec::new();
        }
    };

    let contents: Vec<RepoContent> = match session
        .client()
        .get(&format!(
            "/repos/{login}/{INVOICES_REPO}/contents",
            login = identity.login
        ))
        .await
    {
        Ok(contents) => contents,
        Err(err) => {
            debug!(error = %err, "no invoice history yet");
            return Vec::new();
        }
    };

    filter_invoice_files(contents)
}

async fn repo_exists(session: &Session, login: &str) -> bool {
    session
        .client()
        .get::<Value>(&format!("/repos/{login}/{INVOICES_REPO}"))
        .await
        .is_ok()
}

async fn create_invoices_repo(session: &Session) -> Result<()> {
    let body = json!({
        "name": INVOICES_REPO,
        "description": "My invoices repository",
        "private": true,
        "auto_init": true,
    });
    let _: Value = session
        .client()
        .post("/user/repos", body)
        .await
        .context("failed to create the Invoices repository")?;
    Ok(())
}

/// Wait for a freshly created repository to become visible. If it never
/// does within the bound, fall through and let the write surface the error.
async fn settle(session: &Session, login: &str) {
    for attempt in 1..=SETTLE_ATTEMPTS {
        sleep(SETTLE_INTERVAL).await;
        if repo_exists(session, login).await {
            debug!(attempt, "Invoices repository is ready");
            return;
        }
    }
    warn!("Invoices repository still provisioning after creation; proceeding anyway");
}

pub(crate) fn blob_url(login: &str, filename: &str) -> String {
    format!("{WEB_ORIGIN}/{login}/{INVOICES_REPO}/blob/{DEFAULT_BRANCH}/{filename}")
}

pub(crate) fn filter_invoice_files(contents: Vec<RepoContent>) -> Vec<InvoiceFile> {
    let mut files: Vec<InvoiceFile> = contents
        .into_iter()
        .filter(|entry| entry.name.ends_with(INVOICE_EXTENSION))
        .map(|entry| InvoiceFile {
            name: entry.name,
            url: entry.html_url,
            download_url: entry.download_url,
        })
        .collect();

    // Filenames embed an ISO date, so name order is date order.
    files.sort_by(|a, b| b.name.cmp(&a.name));
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> RepoContent {
        RepoContent {
            name: name.to_string(),
            html_url: format!("https://github.com/alice/Invoices/blob/main/{name}"),
            download_url: Some(format!(
                "https://raw.githubusercontent.com/alice/Invoices/main/{name}"
            )),
        }
    }

    #[test]
    fn blob_url_follows_the_platform_convention() {
        assert_eq!(
            blob_url("alice", "alice-2026-08-27.invoice.yaml"),
            "https://github.com/alice/Invoices/blob/main/alice-2026-08-27.invoice.yaml"
        );
    }

    #[test]
    fn only_invoice_files_survive_filtering() {
        let files = filter_invoice_files(vec![
            entry("README.md"),
            entry("alice-2026-08-27.invoice.yaml"),
            entry("alice-2026-08-27.yaml"),
            entry("notes.invoice.yaml.bak"),
        ]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "alice-2026-08-27.invoice.yaml");
    }

    #[test]
    fn history_sorts_newest_filename_first() {
        let files = filter_invoice_files(vec![
            entry("alice-2026-06-01.invoice.yaml"),
            entry("alice-2026-08-27.invoice.yaml"),
            entry("alice-2025-12-31.invoice.yaml"),
        ]);
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "alice-2026-08-27.invoice.yaml",
                "alice-2026-06-01.invoice.yaml",
                "alice-2025-12-31.invoice.yaml"
            ]
        );
    }
}
