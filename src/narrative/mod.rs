//! Best-effort narrative text: email drafts, deal health, note summaries,
//! account grading and the weekly report.
//!
//! Nothing here fails. A missing API key or a failed call comes back as an
//! inline message the caller can show as-is.

pub mod gemini;
pub mod prompts;

use crate::config::AppConfig;
use crate::error::SyncError;
use crate::metrics::DashboardReport;
use crate::models::{Account, Dataset, Deal};
use crate::notify::Notifier;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

use self::gemini::GeminiClient;
use self::prompts::{Prompt, Tone};

pub const MISSING_KEY: &str = "Error: no API key is configured for narrative generation.";

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}

/// Why a narrative could not be produced.
#[derive(Debug)]
pub enum Unavailable {
    MissingKey,
    Failed(anyhow::Error),
    Empty,
}

pub struct NarrativeService {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl NarrativeService {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    /// Gemini when a key is configured, otherwise a service that only
    /// answers with the missing-key message.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let generator = match config.narrative.api_key.as_deref() {
            Some(key) => {
                let client = GeminiClient::new(&config.store, &config.narrative, key)?;
                Some(Arc::new(client) as Arc<dyn TextGenerator>)
            }
            None => None,
        };
        Ok(Self::new(generator))
    }

    pub fn is_available(&self) -> bool {
        self.generator.is_some()
    }

    async fn try_generate(&self, prompt: Prompt) -> Result<String, Unavailable> {
        let generator = self.generator.as_ref().ok_or(Unavailable::MissingKey)?;
        let text = generator.generate(&prompt).await.map_err(Unavailable::Failed)?;
        if text.trim().is_empty() {
            return Err(Unavailable::Empty);
        }
        Ok(text)
    }

    async fn inline(&self, prompt: Prompt, failed: &str, empty: &str) -> String {
        match self.try_generate(prompt).await {
            Ok(text) => text,
            Err(Unavailable::MissingKey) => MISSING_KEY.to_string(),
            Err(Unavailable::Failed(e)) => {
                warn!("Narrative generation failed: {:#}", e);
                failed.to_string()
            }
            Err(Unavailable::Empty) => empty.to_string(),
        }
    }

    pub async fn email_draft(&self, contact_name: &str, company: &str, context: &str, tone: Tone) -> String {
        self.inline(
            prompts::email_draft(contact_name, company, context, tone),
            "Failed to draft the email. Please try again.",
            "No draft was generated.",
        )
        .await
    }

    pub async fn deal_health(&self, deal: &Deal, notes: &[String]) -> String {
        self.inline(
            prompts::deal_health(&deal.title, deal.stage, deal.value(), notes),
            "Deal analysis failed.",
            "No analysis was generated.",
        )
        .await
    }

    pub async fn meeting_notes(&self, raw_notes: &str) -> String {
        self.inline(
            prompts::meeting_notes(raw_notes),
            "Failed to summarize the notes.",
            "No summary was generated.",
        )
        .await
    }

    pub async fn account_grade(&self, account: &Account, pipeline_value: u64) -> String {
        self.inline(
            prompts::account_grade(account, pipeline_value),
            "Grade assessment failed. Please try again shortly.",
            "The grade assessment could not be completed.",
        )
        .await
    }

    pub async fn weekly_report(&self, deals: &[Deal], accounts: &[Account]) -> String {
        self.inline(
            prompts::weekly_report(deals, accounts),
            "Weekly report generation failed.",
            "No report was generated.",
        )
        .await
    }
}

// ── Weekly report delivery ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyReport {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// The body is the plain KPI summary rather than generated text.
    pub fallback: bool,
}

pub fn weekly_subject(today: NaiveDate) -> String {
    format!("[Weekly Sales Report] {}", today.format("%Y-%m-%d"))
}

fn kpi_body(kpis: &DashboardReport) -> String {
    let items: String = kpis
        .summary_lines()
        .iter()
        .map(|l| format!("<li>{}</li>", l))
        .collect();
    format!("<h3>Pipeline summary</h3><ul>{}</ul>", items)
}

/// Generate this week's report from the full dataset and mail it. Falls back
/// to the KPI summary in `kpis` when no narrative can be produced.
pub async fn send_weekly_report(
    narrative: &NarrativeService,
    notifier: &dyn Notifier,
    data: &Dataset,
    kpis: &DashboardReport,
    recipient: &str,
) -> Result<WeeklyReport, SyncError> {
    let prompt = prompts::weekly_report(&data.deals, &data.accounts);
    let (body, fallback) = match narrative.try_generate(prompt).await {
        Ok(text) => (text, false),
        Err(reason) => {
            warn!("Weekly narrative unavailable ({:?}), sending the KPI summary", reason);
            (kpi_body(kpis), true)
        }
    };

    let subject = weekly_subject(kpis.reference_date);
    notifier.send(recipient, &subject, &body).await?;
    info!("Weekly report sent to {} via {}", recipient, notifier.name());

    Ok(WeeklyReport {
        recipient: recipient.to_string(),
        subject,
        body,
        fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Period, Scope};
    use crate::notify::LogNotifier;
    use std::sync::Mutex;

    struct Canned(Result<String, String>);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _prompt: &Prompt) -> Result<String> {
            self.0.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    fn service(reply: Result<&str, &str>) -> NarrativeService {
        let reply = reply.map(str::to_string).map_err(str::to_string);
        NarrativeService::new(Some(Arc::new(Canned(reply))))
    }

    #[derive(Default)]
    struct Outbox(Mutex<Vec<(String, String, String)>>);

    #[async_trait]
    impl Notifier for Outbox {
        fn name(&self) -> &'static str {
            "outbox"
        }

        async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SyncError> {
            self.0
                .lock()
                .unwrap()
                .push((recipient.into(), subject.into(), body.into()));
            Ok(())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_is_inline() {
        let s = NarrativeService::new(None);
        assert!(!s.is_available());
        assert_eq!(s.meeting_notes("call went well").await, MISSING_KEY);
        assert_eq!(s.email_draft("Kim", "Acme", "follow up", Tone::Friendly).await, MISSING_KEY);
    }

    #[tokio::test]
    async fn test_failures_and_empty_replies_are_inline() {
        assert_eq!(
            service(Err("HTTP 503")).meeting_notes("x").await,
            "Failed to summarize the notes."
        );
        assert_eq!(service(Ok("  ")).meeting_notes("x").await, "No summary was generated.");
        assert_eq!(service(Ok("- takeaway")).meeting_notes("x").await, "- takeaway");
    }

    #[tokio::test]
    async fn test_weekly_report_uses_narrative() {
        let data = crate::sample::dataset(today());
        let kpis = DashboardReport::build(&data, &Scope::All, Period::Month, today());
        let outbox = Outbox::default();

        let sent = send_weekly_report(&service(Ok("<h3>Plan</h3>")), &outbox, &data, &kpis, "hong@example.com")
            .await
            .unwrap();
        assert!(!sent.fallback);
        assert_eq!(sent.subject, "[Weekly Sales Report] 2024-06-03");
        let mail = outbox.0.lock().unwrap();
        assert_eq!(mail[0].0, "hong@example.com");
        assert_eq!(mail[0].2, "<h3>Plan</h3>");
    }

    #[tokio::test]
    async fn test_weekly_report_falls_back_to_kpis() {
        let data = crate::sample::dataset(today());
        let kpis = DashboardReport::build(&data, &Scope::All, Period::Month, today());

        let sent = send_weekly_report(&NarrativeService::new(None), &LogNotifier, &data, &kpis, "hong@example.com")
            .await
            .unwrap();
        assert!(sent.fallback);
        assert!(sent.body.starts_with("<h3>Pipeline summary</h3>"));
        assert!(sent.body.contains("<li>Target: ₩"));

        let err = send_weekly_report(&NarrativeService::new(None), &LogNotifier, &data, &kpis, "")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }
}
