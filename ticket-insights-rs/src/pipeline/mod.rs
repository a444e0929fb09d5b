//! The three-stage analysis pipeline
//!
//! tickets → [`Extractor`] (bounded fan-out) → analyses grouped by date →
//! [`Summarizer`] (sequential, ascending dates) → [`Reporter`] (one call).
//! Every stage reads its cache first, so a rerun only pays for new work.

mod extract;
mod progress;
mod report;
mod summarize;

pub use extract::Extractor;
pub use progress::ProgressCounter;
pub use report::Reporter;
pub use summarize::{top_themes, Summarizer, NO_PREVIOUS_SUMMARY};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::instrument;

use crate::cache::{DatedCache, ResultCache};
use crate::config::PipelineConfig;
use crate::core::InferenceClient;
use crate::error::Result;
use crate::models::{DailySummary, Report, TicketAnalysis, TicketRecord};
use crate::util::generate_request_id;

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run_id: String,
    /// One per input ticket, in input order
    pub analyses: Vec<TicketAnalysis>,
    /// One per date, ascending
    pub summaries: Vec<DailySummary>,
    pub report: Report,
}

/// Group analyses by the date of their ticket.
///
/// Pairs are matched by position; tickets without a parseable date go under
/// `fallback_date`, the same rule extraction uses for cache placement.
pub fn group_by_date(
    tickets: &[TicketRecord],
    analyses: &[TicketAnalysis],
    fallback_date: NaiveDate,
) -> BTreeMap<NaiveDate, Vec<TicketAnalysis>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<TicketAnalysis>> = BTreeMap::new();
    for (ticket, analysis) in tickets.iter().zip(analyses) {
        by_date
            .entry(ticket.date_or(fallback_date))
            .or_default()
            .push(analysis.clone());
    }
    by_date
}

/// All three stages wired to one client and one data directory
#[derive(Clone)]
pub struct Pipeline {
    extractor: Extractor,
    summarizer: Summarizer,
    reporter: Reporter,
    max_concurrent: usize,
}

impl Pipeline {
    pub fn new(
        extractor: Extractor,
        summarizer: Summarizer,
        reporter: Reporter,
        max_concurrent: usize,
    ) -> Self {
        Self {
            extractor,
            summarizer,
            reporter,
            max_concurrent,
        }
    }

    /// Open the caches under `config.data_dir` and build every stage
    pub fn from_config(config: &PipelineConfig, client: InferenceClient) -> Result<Self> {
        let timeout = config.request_timeout;
        Ok(Self::new(
            Extractor::new(
                DatedCache::new(config.analyses_dir())?,
                client.clone(),
                config.extract_max_tokens,
                timeout,
            ),
            Summarizer::new(
                ResultCache::new(config.summaries_dir())?,
                client.clone(),
                config.summary_max_tokens,
                timeout,
            ),
            Reporter::new(
                ResultCache::new(config.reports_dir())?,
                client,
                config.report_max_tokens,
                timeout,
            ),
            config.max_concurrent,
        ))
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Run all stages over `tickets`.
    ///
    /// `today` is fixed once per run and used for every ticket whose date
    /// does not parse.
    #[instrument(skip(self, tickets), fields(tickets = tickets.len()))]
    pub async fn run(&self, tickets: &[TicketRecord], today: NaiveDate) -> Result<PipelineOutput> {
        let run_id = generate_request_id();
        log::info!("Pipeline run {} starting with {} tickets", run_id, tickets.len());

        log::info!("Step 1: extracting ticket analyses");
        let analyses = self
            .extractor
            .extract_batch(tickets, self.max_concurrent, today)
            .await;

        log::info!("Step 2: generating daily summaries");
        let by_date = group_by_date(tickets, &analyses, today);
        let summaries = self.summarizer.summarize_all(&by_date).await?;

        log::info!("Step 3: generating report");
        let report = self.reporter.generate_report(&summaries).await?;

        log::info!(
            "Pipeline run {} complete: {} analyses, {} summaries, report for {}",
            run_id,
            analyses.len(),
            summaries.len(),
            report.period
        );

        Ok(PipelineOutput {
            run_id,
            analyses,
            summaries,
            report,
        })
    }
}
