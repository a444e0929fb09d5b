use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::instrument;

use super::progress::ProgressCounter;
use crate::cache::{CacheLookup, DatedCache};
use crate::core::InferenceClient;
use crate::error::Result;
use crate::models::{TicketAnalysis, TicketRecord};
use crate::normalize::normalize_analysis;
use crate::prompts::extraction_prompt;
use crate::recovery::recover_json;

/// Per-ticket extraction stage
#[derive(Clone)]
pub struct Extractor {
    cache: DatedCache,
    client: InferenceClient,
    max_tokens: u32,
    request_timeout: Duration,
}

impl Extractor {
    pub fn new(
        cache: DatedCache,
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

    pub fn cache(&self) -> &DatedCache {
        &self.cache
    }

    /// Analysis for one ticket, from cache or from one inference call.
    ///
    /// `date` decides the cache partition. The call holds a `gate` permit
    /// while in flight.
    pub async fn extract_ticket(
        &self,
        ticket: &TicketRecord,
        date: NaiveDate,
        gate: Option<&Semaphore>,
    ) -> Result<TicketAnalysis> {
        match self.cache.lookup::<TicketAnalysis>(date, &ticket.id)? {
            CacheLookup::Hit(analysis) => {
                log::debug!("Cache hit for ticket {}", ticket.id);
                return Ok(analysis);
            }
            CacheLookup::Corrupt(reason) => {
                log::warn!("Re-extracting ticket {} over corrupt cache entry: {}", ticket.id, reason);
            }
            CacheLookup::Miss => {}
        }

        let prompt = extraction_prompt(&ticket.content);
        let text = self
            .client
            .call(&prompt, self.max_tokens, self.request_timeout, gate)
            .await?;

        let analysis = recover_json(&text)
            .and_then(|value| normalize_analysis(&ticket.id, &value))
            .map_err(|e| e.with_context_value("ticket_id", &ticket.id))?;
        self.cache.save(date, &ticket.id, &analysis)?;

        Ok(analysis)
    }

    /// Extract every ticket concurrently, at most `max_concurrent` calls in flight.
    ///
    /// Output order matches input order. Tickets without a parseable date are
    /// filed under `fallback_date`. A ticket whose extraction fails yields a
    /// placeholder analysis.
    #[instrument(skip(self, tickets), fields(tickets = tickets.len()))]
    pub async fn extract_batch(
        &self,
        tickets: &[TicketRecord],
        max_concurrent: usize,
        fallback_date: NaiveDate,
    ) -> Vec<TicketAnalysis> {
        let gate = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let progress = ProgressCounter::new("tickets", tickets.len());

        log::info!(
            "Extracting {} tickets (max {} concurrent)",
            tickets.len(),
            max_concurrent
        );

        let tasks = tickets.iter().map(|ticket| {
            let gate = Arc::clone(&gate);
            let progress = &progress;
            async move {
                let date = ticket.date_or(fallback_date);
                let analysis = match self.extract_ticket(ticket, date, Some(&*gate)).await {
                    Ok(analysis) => analysis,
                    Err(e) => {
                        log::warn!("Failed to process {}: {}", ticket.id, e);
                        TicketAnalysis::placeholder(&ticket.id, &e)
                    }
                };
                progress.tick();
                analysis
            }
        });

        let results = join_all(tasks).await;

        let failed = results.iter().filter(|a| a.is_placeholder()).count();
        if failed > 0 {
            log::warn!("{} of {} tickets fell back to placeholders", failed, results.len());
        }
        log::info!("Extraction complete: {}/{} tickets", progress.completed(), progress.total());

        results
    }
}
