use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::IssueRecord;

pub const INVOICE_EXTENSION: &str = ".invoice.yaml";
const NO_DATE: &str = "no date";

// Symbol table for currency display; codes without an entry fall back to a
// `CODE ` prefix.
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[("USD", "$"), ("BRL", "R$")];

/// Inputs for one assembly run. Everything the document depends on is here,
/// so assembly stays a pure function.
pub struct InvoiceParams<'a> {
    pub username: &'a str,
    pub contractor_company: &'a str,
    pub contractor_id: &'a str,
    pub bank_info: &'a str,
    pub client_company: &'a str,
    pub issues: &'a [IssueRecord],
    pub hourly_rate: f64,
    pub currency: &'a str,
    pub payment_method: &'a str,
    pub generated_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub hours: f64,
    pub date: String,
}

/// The canonical invoice document. Field order here is the order fields
/// appear in the rendered YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDocument {
    pub username: String,
    pub contractor_company: String,
    pub contractor_id: String,
    pub bank_info: String,
    pub client_company: String,
    pub issues: Vec<LineItem>,
    pub total_hours: f64,
    pub hourly_rate: f64,
    pub currency: String,
    pub payment_method: String,
    pub date: String,
}

impl InvoiceDocument {
    pub fn total_amount(&self) -> f64 {
        self.total_hours * self.hourly_rate
    }
}

/// Summary of a stored invoice for the history listing.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSummary {
    pub date: String,
    pub client: String,
    pub hours: f64,
    pub amount: f64,
}

/// Build the document from the selected issues and contractor settings.
/// Pure: identical inputs yield identical documents.
pub fn assemble(params: &InvoiceParams<'_>) -> InvoiceDocument {
    let issues: Vec<LineItem> = params
        .issues
        .iter()
        .map(|issue| LineItem {
            repo: issue.repo.clone(),
            number: issue.number,
            title: issue.title.clone(),
            hours: issue.hours.unwrap_or(0.0),
            date: item_date(issue),
        })
        .collect();

    let total_hours = issues.iter().map(|item| item.hours).sum();

    InvoiceDocument {
        username: params.username.to_string(),
        contractor_company: params.contractor_company.to_string(),
        contractor_id: params.contractor_id.to_string(),
        bank_info: params.bank_info.to_string(),
        client_company: params.client_company.to_string(),
        issues,
        total_hours,
        hourly_rate: params.hourly_rate,
        currency: params.currency.to_string(),
        payment_method: params.payment_method.to_string(),
        date: params.generated_on.format("%Y-%m-%d").to_string(),
    }
}

pub fn render_yaml(doc: &InvoiceDocument) -> Result<String> {
    Ok(serde_yaml::to_string(doc)?)
}

/// `<login>-<YYYY-MM-DD>.invoice.yaml`; the date prefix keeps lexicographic
/// order equal to chronological order, which the history listing relies on.
pub fn generate_filename(login: &str, date: NaiveDate) -> String {
    format!("{login}-{}{INVOICE_EXTENSION}", date.format("%Y-%m-%d"))
}

pub fn currency_symbol(code: &str) -> Option<&'static str> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, symbol)| *symbol)
}

pub fn format_currency(amount: f64, code: &str) -> String {
    match currency_symbol(code) {
        Some(symbol) => format!("{symbol}{amount:.2}"),
        None => format!("{code} {amount:.2}"),
    }
}

fn item_date(issue: &IssueRecord) -> String {
    issue
        .display_date()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| NO_DATE.to_string())
}

/// Best-effort summary of a stored invoice. Malformed content degrades to a
/// stub derived from the filename rather than failing the listing.
pub fn parse_summary(name: &str, content: &str) -> InvoiceSummary {
    match serde_yaml::from_str::<InvoiceDocument>(content) {
        Ok(doc) => InvoiceSummary {
            date: doc.date.clone(),
            client: doc.client_company.clone(),
            hours: doc.total_hours,
            amount: doc.total_amount(),
        },
        Err(_) => fallback_summary(name),
    }
}

pub fn fallback_summary(name: &str) -> InvoiceSummary {
    InvoiceSummary {
        date: name.split('.').next().unwrap_or(name).to_string(),
        client: "Unknown".to_string(),
        hours: 0.0,
        amount: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn issue(number: u64, hours: Option<f64>) -> IssueRecord {
        IssueRecord {
            id: number,
            number,
            title: format!("Fix bug {number}"),
            url: String::new(),
            repo: "widget".to_string(),
            org: "acme".to_string(),
            closed_at: Some(Utc.with_ymd_and_hms(2026, 8, 20, 10, 0, 0).unwrap()),
            updated_at: None,
            created_at: None,
            hours,
        }
    }

    fn params<'a>(issues: &'a [IssueRecord]) -> InvoiceParams<'a> {
        InvoiceParams {
            username: "alice",
            contractor_company: "Acme Ltda",
            contractor_id: "12.345.678/0001-00",
            bank_info: "Bank 001, acct 42",
            client_company: "Studio Vibi INC",
            issues,
            hourly_rate: 50.0,
            currency: "USD",
            payment_method: "Wire Transfer",
            generated_on: NaiveDate::from_ymd_opt(2026, 8, 27).unwrap(),
        }
    }

    #[test]
    fn assemble_is_pure_and_totals_are_exact() {
        let issues = vec![issue(5, Some(3.5)), issue(6, None), issue(7, Some(1.0))];
        let p = params(&issues);
        let first = assemble(&p);
        let second = assemble(&p);
        assert_eq!(first, second);
        assert_eq!(first.total_hours, 4.5);
        assert_eq!(first.total_amount(), 4.5 * 50.0);
    }

    #[test]
    fn empty_selection_yields_zero_totals() {
        let issues: Vec<IssueRecord> = Vec::new();
        let doc = assemble(&params(&issues));
        assert_eq!(doc.total_hours, 0.0);
        assert_eq!(doc.total_amount(), 0.0);
        assert_eq!(format_currency(doc.total_amount(), "USD"), "$0.00");
    }

    #[test]
    fn filenames_are_deterministic_per_identity_and_date() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 27).unwrap();
        assert_eq!(
            generate_filename("alice", date),
            "alice-2026-08-27.invoice.yaml"
        );
        assert_eq!(generate_filename("alice", date), generate_filename("alice", date));
    }

    #[test]
    fn currency_formatting_covers_both_baselines_and_falls_back() {
        assert_eq!(format_currency(175.0, "USD"), "$175.00");
        assert_eq!(format_currency(175.0, "BRL"), "R$175.00");
        assert_eq!(format_currency(175.0, "EUR"), "EUR 175.00");
    }

    #[test]
    fn line_item_date_falls_back_through_timestamps() {
        let mut record = issue(5, Some(1.0));
        record.closed_at = None;
        record.updated_at = Some(Utc.with_ymd_and_hms(2026, 8, 21, 9, 0, 0).unwrap());
        assert_eq!(item_date(&record), "2026-08-21");

        record.updated_at = None;
        record.created_at = Some(Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap());
        assert_eq!(item_date(&record), "2026-08-01");

        record.created_at = None;
        assert_eq!(item_date(&record), NO_DATE);
    }

    #[test]
    fn rendered_yaml_round_trips_into_a_summary() {
        let issues = vec![issue(5, Some(3.5))];
        let doc = assemble(&params(&issues));
        let yaml = render_yaml(&doc).unwrap();

        let summary = parse_summary("alice-2026-08-27.invoice.yaml", &yaml);
        assert_eq!(summary.client, "Studio Vibi INC");
        assert_eq!(summary.hours, 3.5);
        assert_eq!(summary.amount, 175.0);
        assert_eq!(summary.date, "2026-08-27");
    }

    #[test]
    fn malformed_content_falls_back_to_filename_date_prefix() {
        let summary = parse_summary("alice-2026-08-27.invoice.yaml", "{not yaml at all");
        assert_eq!(summary.date, "alice-2026-08-27");
        assert_eq!(summary.client, "Unknown");
        assert_eq!(summary.hours, 0.0);
        assert_eq!(summary.amount, 0.0);
    }
}
