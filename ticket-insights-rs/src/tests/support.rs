//! Stub inference services for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::core::{CompletionRequest, InferenceClient, InferenceService};
use crate::error::Result;
use crate::resilience::RetryConfig;

type Responder = Box<dyn Fn(&str, usize) -> Result<String> + Send + Sync>;

/// Scripted service that records every prompt it receives.
///
/// The responder gets the prompt and the 0-based call index.
pub struct StubService {
    respond: Responder,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubService {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str, usize) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `text`
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_, _| Ok(text.clone()))
    }

    /// Sleep for `delay` inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceService for StubService {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.respond)(&request.prompt, index)
    }
}

/// Retry policy with millisecond backoff
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_interval: Duration::from_millis(5),
        max_interval: Duration::from_millis(20),
        multiplier: 2.0,
    }
}

pub fn client_for(service: &Arc<StubService>) -> InferenceClient {
    InferenceClient::with_retry(service.clone(), fast_retry(3))
}

/// A well-formed extraction answer
pub fn analysis_json(category: &str, themes: &[&str]) -> String {
    json!({
        "category": category,
        "product_area": "app",
        "sentiment": "negative",
        "priority": "high",
        "themes": themes,
        "summary": format!("{} ticket", category),
    })
    .to_string()
}

/// A well-formed daily summary answer, wrapped in a code fence
pub fn summary_json(trend: &str) -> String {
    format!(
        "```json\n{}\n```",
        json!({
            "key_themes": ["login", "billing"],
            "trend_analysis": trend,
            "critical_issues": ["SSO outage"],
        })
    )
}

/// A well-formed report answer with trailing prose
pub fn report_json() -> String {
    format!(
        "{}\nLet me know if you need more detail.",
        json!({
            "executive_summary": "Login failures doubled.",
            "health_snapshot": {
                "overall_health": "concerning",
                "ticket_volume_trend": "+20%",
                "complaint_rate_trend": "+5%",
                "top_3_drivers": ["sso", "billing", "exports"],
            },
            "key_insights": [{
                "insight": "SSO outage",
                "severity": "high",
                "evidence": "30 tickets",
                "customer_impact": "locked out",
            }],
            "recommended_actions": [{
                "action": "Roll back IdP change",
                "priority": "immediate",
                "estimated_impact": "high",
                "suggested_owner": "Engineering",
                "success_metrics": "SSO tickets < 5/day",
            }],
            "customer_voice": {"quotes": ["I can't log in"]},
            "week_over_week_comparison": {
                "improved": ["billing"],
                "deteriorated": ["sso"],
                "stayed_same": [],
            },
        })
    )
}
