use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::NaiveDate;
use tracing::instrument;

use crate::cache::{CacheLookup, ResultCache};
use crate::core::InferenceClient;
use crate::error::{PipelineError, Result};
use crate::models::{Category, DailySummary, TicketAnalysis};
use crate::normalize::normalize_daily_summary;
use crate::prompts::{summary_prompt, SummaryPromptInput};
use crate::recovery::recover_json;

/// Sentinel passed to the model when the prior day has no usable summary
pub const NO_PREVIOUS_SUMMARY: &str = "No previous summary";

const TOP_THEMES: usize = 10;
const SAMPLE_SIZE: usize = 15;

/// Per-day aggregation stage
#[derive(Clone)]
pub struct Summarizer {
    cache: ResultCache,
    client: InferenceClient,
    max_tokens: u32,
    request_timeout: Duration,
}

impl Summarizer {
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

    /// Cache key of the summary for `date`
    pub fn key_for(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Summary for one date, from cache or from one inference call
    pub async fn summarize_day(
        &self,
        date: NaiveDate,
        analyses: &[TicketAnalysis],
    ) -> Result<DailySummary> {
        let key = Self::key_for(date);
        match self.cache.lookup::<DailySummary>(&key)? {
            CacheLookup::Hit(summary) => {
                log::debug!("Cache hit for summary {}", key);
                return Ok(summary);
            }
            CacheLookup::Corrupt(reason) => {
                log::warn!("Recomputing summary {} over corrupt cache entry: {}", key, reason);
            }
            CacheLookup::Miss => {}
        }

        let categories = format_counts(category_counts(analyses));
        let top_themes = format_counts(top_themes(analyses, TOP_THEMES));
        let samples = sample_lines(analyses, SAMPLE_SIZE);
        let previous = self.previous_summary(date);

        let prompt = summary_prompt(&SummaryPromptInput {
            ticket_count: analyses.len(),
            categories: &categories,
            top_themes: &top_themes,
            samples: &samples,
            previous_summary: &previous,
        });

        let text = self
            .client
            .call(&prompt, self.max_tokens, self.request_timeout, None)
            .await?;
        let value = recover_json(&text)?;
        let summary = normalize_daily_summary(date, analyses.len(), &value)?;
        self.cache.save(&key, &summary)?;

        log::info!("Summarized {} ({} tickets)", key, analyses.len());
        Ok(summary)
    }

    /// Summaries for every date, ascending, one call at a time.
    ///
    /// Each day reads the previous day's cached summary, so order matters.
    #[instrument(skip(self, by_date), fields(days = by_date.len()))]
    pub async fn summarize_all(
        &self,
        by_date: &BTreeMap<NaiveDate, Vec<TicketAnalysis>>,
    ) -> Result<Vec<DailySummary>> {
        if by_date.is_empty() {
            return Err(PipelineError::empty_input("no analyses to summarize"));
        }

        let mut summaries = Vec::with_capacity(by_date.len());
        for (date, analyses) in by_date {
            summaries.push(self.summarize_day(*date, analyses).await?);
        }
        Ok(summaries)
    }

    /// Trend text of the day before `date`, or the sentinel
    fn previous_summary(&self, date: NaiveDate) -> String {
        let Some(yesterday) = date.pred_opt() else {
            return NO_PREVIOUS_SUMMARY.to_string();
        };

        match self.cache.get::<DailySummary>(&Self::key_for(yesterday)) {
            Ok(Some(prev)) if !prev.trend_analysis.trim().is_empty() => prev.trend_analysis,
            Ok(_) => NO_PREVIOUS_SUMMARY.to_string(),
            Err(e) => {
                log::warn!("Cannot read previous summary for {}: {}", yesterday, e);
                NO_PREVIOUS_SUMMARY.to_string()
            }
        }
    }
}

/// Category frequencies in first-seen order
fn category_counts(analyses: &[TicketAnalysis]) -> Vec<(String, usize)> {
    let mut order: Vec<Category> = Vec::new();
    let mut counts: HashMap<Category, usize> = HashMap::new();
    for analysis in analyses {
        let count = counts.entry(analysis.category).or_insert_with(|| {
            order.push(analysis.category);
            0
        });
        *count += 1;
    }

    order
        .into_iter()
        .map(|category| (category.to_string(), counts[&category]))
        .collect()
}

/// The `limit` most frequent themes; ties keep first-seen order
pub fn top_themes(analyses: &[TicketAnalysis], limit: usize) -> Vec<(String, usize)> {
    let mut counted: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for theme in analyses.iter().flat_map(|a| a.themes.iter()) {
        match index.get(theme.as_str()) {
            Some(&i) => counted[i].1 += 1,
            None => {
                index.insert(theme.as_str(), counted.len());
                counted.push((theme.clone(), 1));
            }
        }
    }

    // Stable sort keeps insertion order among equal counts
    counted.sort_by(|a, b| b.1.cmp(&a.1));
    counted.truncate(limit);
    counted
}

fn format_counts(counts: Vec<(String, usize)>) -> String {
    if counts.is_empty() {
        return "none".to_string();
    }
    counts
        .iter()
        .map(|(name, count)| format!("{}: {}", name, count))
        .collect::<Vec<_>>()
        .join(", ")
}

fn sample_lines(analyses: &[TicketAnalysis], limit: usize) -> String {
    analyses
        .iter()
        .take(limit)
        .map(|a| format!("- [{}] {}: {}", a.priority, a.category, a.summary))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Sentiment};

    fn analysis(category: Category, themes: &[&str]) -> TicketAnalysis {
        TicketAnalysis {
            ticket_id: "t".to_string(),
            category,
            product_area: "app".to_string(),
            sentiment: Sentiment::Neutral,
            priority: Priority::High,
            themes: themes.iter().map(|t| t.to_string()).collect(),
            summary: "sum".to_string(),
        }
    }

    #[test]
    fn test_top_themes_ties_keep_first_seen() {
        let analyses = vec![
            analysis(Category::Bug, &["b", "a"]),
            analysis(Category::Bug, &["a", "c"]),
            analysis(Category::Question, &["c", "d"]),
        ];
        let top = top_themes(&analyses, 3);
        assert_eq!(
            top,
            vec![("a".to_string(), 2), ("c".to_string(), 2), ("b".to_string(), 1)]
        );
    }

    #[test]
    fn test_category_counts_and_samples() {
        let analyses = vec![
            analysis(Category::Question, &[]),
            analysis(Category::Bug, &[]),
            analysis(Category::Question, &[]),
        ];
        assert_eq!(format_counts(category_counts(&analyses)), "question: 2, bug: 1");
        assert_eq!(
            sample_lines(&analyses[..1], SAMPLE_SIZE),
            "- [high] question: sum"
        );
    }
}
