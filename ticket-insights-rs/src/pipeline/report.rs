use std::time::Duration;

use tracing::instrument;

use crate::cache::{CacheLookup, ResultCache};
use crate::core::InferenceClient;
use crate::error::{PipelineError, Result};
use crate::models::{period_label, DailySummary, Report};
use crate::normalize::normalize_report;
use crate::prompts::report_prompt;
use crate::recovery::recover_json;

/// Multi-day executive report stage
#[derive(Clone)]
pub struct Reporter {
    cache: ResultCache,
    client: InferenceClient,
    max_tokens: u32,
    request_timeout: Duration,
}

impl Reporter {
    pub fn new(
        cache: ResultCache,
        client: InferenceClient,
        max_tokens: u32,
        request_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            client,
            max_tokens,
            request_timeout,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Cache key for the report covering `summaries`
    pub fn key_for(summaries: &[DailySummary]) -> Option<String> {
        let first = summaries.first()?;
        let last = summaries.last()?;
        Some(format!("report_{}_{}", first.date, last.date))
    }

    /// Report over an ordered, non-empty summary sequence.
    ///
    /// Normally this issues a single inference call and caches the result
    /// under `report_{first}_{last}`. When a readable report for that same
    /// period is already cached it is returned as is and no call is made,
    /// even if the summaries have changed since. Delete the cache entry to
    /// force a fresh report. A corrupt entry is regenerated and overwritten.
    #[instrument(skip(self, summaries), fields(days = summaries.len()))]
    pub async fn generate_report(&self, summaries: &[DailySummary]) -> Result<Report> {
        let (Some(first), Some(last), Some(key)) =
            (summaries.first(), summaries.last(), Self::key_for(summaries))
        else {
            return Err(PipelineError::empty_input(
                "cannot generate a report from zero daily summaries",
            ));
        };

        match self.cache.lookup::<Report>(&key)? {
            CacheLookup::Hit(report) => {
                log::info!("Reusing cached report {}", key);
                return Ok(report);
            }
            CacheLookup::Corrupt(reason) => {
                log::warn!("Regenerating report {} over corrupt cache entry: {}", key, reason);
            }
            CacheLookup::Miss => {}
        }

        let prompt = report_prompt(&summaries_block(summaries));
        let text = self
            .client
            .call(&prompt, self.max_tokens, self.request_timeout, None)
            .await?;
        let value = recover_json(&text)?;
        let report = normalize_report(&period_label(first.date, last.date), &value)?;
        self.cache.save(&key, &report)?;

        log::info!("Generated report {}", key);
        Ok(report)
    }
}

/// One paragraph per day: date, count, themes and trend
fn summaries_block(summaries: &[DailySummary]) -> String {
    summaries
        .iter()
        .map(|s| {
            format!(
                "Date: {}\nTickets: {}\nThemes: {}\nAnalysis: {}",
                s.date,
                s.ticket_count,
                s.key_themes.join(", "),
                s.trend_analysis
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
