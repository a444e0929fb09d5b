//! Daily summary stage tests

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::NaiveDate;
    use tempfile::TempDir;
    use tokio_test::assert_err;

    use crate::cache::ResultCache;
    use crate::error::PipelineError;
    use crate::models::{Category, DailySummary, Priority, Sentiment, TicketAnalysis};
    use crate::pipeline::{Summarizer, NO_PREVIOUS_SUMMARY};
    use crate::tests::support::{client_for, summary_json, StubService};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn summarizer(dir: &TempDir, service: &Arc<StubService>) -> Summarizer {
        Summarizer::new(
            ResultCache::new(dir.path().join("summaries")).unwrap(),
            client_for(service),
            2048,
            Duration::from_secs(5),
        )
    }

    fn analyses(n: usize) -> Vec<TicketAnalysis> {
        (0..n)
            .map(|i| TicketAnalysis {
                ticket_id: format!("ticket_{}", i),
                category: if i % 2 == 0 { Category::Bug } else { Category::Complaint },
                product_area: "auth".to_string(),
                sentiment: Sentiment::Negative,
                priority: Priority::High,
                themes: vec!["login".to_string()],
                summary: format!("Cannot sign in ({})", i),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_previous_day_trend_is_in_prompt() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(StubService::fixed(summary_json("Worse than yesterday")));
        let summarizer = summarizer(&dir, &service);

        summarizer
            .cache()
            .save(
                &Summarizer::key_for(date("2024-03-04")),
                &DailySummary {
                    date: date("2024-03-04"),
                    ticket_count: 5,
                    key_themes: vec!["billing".to_string()],
                    trend_analysis: "Volume stable".to_string(),
                    critical_issues: vec![],
                },
            )
            .unwrap();

        let summary = summarizer
            .summarize_day(date("2024-03-05"), &analyses(3))
            .await
            .unwrap();

        let prompt = &service.prompts()[0];
        assert!(prompt.contains("Yesterday's summary: Volume stable"));
        assert!(prompt.contains("- Total tickets: 3"));
        assert!(prompt.contains("- Categories: bug: 2, complaint: 1"));
        assert!(prompt.contains("- Top themes: login: 3"));
        assert!(prompt.contains("- [high] bug: Cannot sign in (0)"));

        assert_eq!(summary.date, date("2024-03-05"));
        assert_eq!(summary.ticket_count, 3);
        assert_eq!(summary.key_themes, vec!["login", "billing"]);
        assert_eq!(summary.trend_analysis, "Worse than yesterday");
        assert_eq!(summary.critical_issues, vec!["SSO outage"]);
    }

    #[tokio::test]
    async fn test_sentinel_without_previous_day() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(StubService::fixed(summary_json("First day")));

        summarizer(&dir, &service)
            .summarize_day(date("2024-03-05"), &analyses(1))
            .await
            .unwrap();

        assert!(service.prompts()[0].contains(&format!("Yesterday's summary: {}", NO_PREVIOUS_SUMMARY)));
    }

    #[tokio::test]
    async fn test_days_run_in_order_and_chain() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(StubService::new(|_, index| {
            Ok(summary_json(&format!("trend from call {}", index)))
        }));
        let summarizer = summarizer(&dir, &service);

        let mut by_date = BTreeMap::new();
        by_date.insert(date("2024-03-06"), analyses(1));
        by_date.insert(date("2024-03-05"), analyses(2));

        let summaries = summarizer.summarize_all(&by_date).await.unwrap();

        let dates: Vec<_> = summaries.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![date("2024-03-05"), date("2024-03-06")]);

        let prompts = service.prompts();
        assert!(prompts[0].contains(NO_PREVIOUS_SUMMARY));
        assert!(prompts[1].contains("Yesterday's summary: trend from call 0"));
    }

    #[tokio::test]
    async fn test_cached_summary_is_reused() {
        let dir = TempDir::new().unwrap();
        let first = Arc::new(StubService::fixed(summary_json("cached trend")));
        summarizer(&dir, &first)
            .summarize_day(date("2024-03-05"), &analyses(2))
            .await
            .unwrap();

        let second = Arc::new(StubService::fixed(summary_json("fresh trend")));
        let summary = summarizer(&dir, &second)
            .summarize_day(date("2024-03-05"), &analyses(2))
            .await
            .unwrap();

        assert_eq!(second.calls(), 0);
        assert_eq!(summary.trend_analysis, "cached trend");
    }

    #[tokio::test]
    async fn test_no_dates_is_empty_input() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(StubService::fixed(summary_json("unused")));

        let err = assert_err!(summarizer(&dir, &service).summarize_all(&BTreeMap::new()).await);

        assert!(matches!(err, PipelineError::EmptyInput(_)));
        assert_eq!(service.calls(), 0);
    }
}
