//! Records flowing through the pipeline
//!
//! Everything here serializes with snake_case field names; enums encode as
//! their snake_case names and dates as `YYYY-MM-DD`. These are the shapes
//! written to the caches.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw support interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: String,
    pub content: String,
    /// Creation timestamp as received; may not parse
    pub created_at: String,
    #[serde(default = "empty_object")]
    pub metadata: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

const NAIVE_DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

impl TicketRecord {
    pub fn new(id: impl Into<String>, content: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            created_at: created_at.into(),
            metadata: empty_object(),
        }
    }

    /// Calendar date of `created_at`, if it parses.
    ///
    /// Offset timestamps keep their local date rather than converting to UTC.
    pub fn created_date(&self) -> Option<NaiveDate> {
        let raw = self.created_at.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.date_naive());
        }

        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(ts.date());
            }
        }

        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }

    /// Parsed date or `fallback`
    pub fn date_or(&self, fallback: NaiveDate) -> NaiveDate {
        self.created_date().unwrap_or(fallback)
    }
}

macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
        aliases { $($alias:literal => $target:ident),* $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            /// Case-insensitive; `-` and spaces count as `_`
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let key = s.trim().to_lowercase().replace(['-', ' '], "_");
                match key.as_str() {
                    $($label => Ok($name::$variant),)+
                    $($alias => Ok($name::$target),)*
                    _ => Err(format!("unrecognized {} {:?}", stringify!($name).to_lowercase(), s)),
                }
            }
        }
    };
}

label_enum! {
    /// Kind of support interaction
    Category {
        Bug => "bug",
        FeatureRequest => "feature_request",
        Question => "question",
        Complaint => "complaint",
        Error => "error",
    }
    aliases {
        "feature" => FeatureRequest,
        "feature_requests" => FeatureRequest,
        "enhancement" => FeatureRequest,
        "request" => FeatureRequest,
        "defect" => Bug,
        "issue" => Bug,
        "how_to" => Question,
        "inquiry" => Question,
        "complain" => Complaint,
    }
}

label_enum! {
    /// Customer mood
    Sentiment {
        Positive => "positive",
        Neutral => "neutral",
        Negative => "negative",
        Frustrated => "frustrated",
    }
    aliases {
        "happy" => Positive,
        "satisfied" => Positive,
        "mixed" => Neutral,
        "unhappy" => Negative,
        "angry" => Frustrated,
        "annoyed" => Frustrated,
    }
}

label_enum! {
    /// Urgency
    Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
    aliases {
        "normal" => Medium,
        "moderate" => Medium,
        "med" => Medium,
        "urgent" => Critical,
        "blocker" => Critical,
    }
}

/// Structured per-ticket extraction result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketAnalysis {
    pub ticket_id: String,
    pub category: Category,
    pub product_area: String,
    pub sentiment: Sentiment,
    pub priority: Priority,
    pub themes: Vec<String>,
    pub summary: String,
}

impl TicketAnalysis {
    /// Stand-in for a ticket whose extraction failed irrecoverably
    pub fn placeholder(ticket_id: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            category: Category::Error,
            product_area: "unknown".to_string(),
            sentiment: Sentiment::Neutral,
            priority: Priority::Low,
            themes: Vec::new(),
            summary: format!("Failed to extract: {}", reason),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.category == Category::Error && self.summary.starts_with("Failed to extract: ")
    }
}

/// Aggregated result for one calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub ticket_count: usize,
    pub key_themes: Vec<String>,
    pub trend_analysis: String,
    pub critical_issues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub overall_health: String,
    pub ticket_volume_trend: String,
    pub complaint_rate_trend: String,
    pub top_3_drivers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyInsight {
    pub insight: String,
    pub severity: String,
    pub evidence: String,
    pub customer_impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub action: String,
    pub priority: String,
    pub estimated_impact: String,
    pub suggested_owner: String,
    pub success_metrics: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerVoice {
    pub quotes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekOverWeekComparison {
    pub improved: Vec<String>,
    pub deteriorated: Vec<String>,
    pub stayed_same: Vec<String>,
}

/// Multi-day executive synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// `"<first> to <last>"`
    pub period: String,
    pub executive_summary: String,
    pub health_snapshot: HealthSnapshot,
    pub key_insights: Vec<KeyInsight>,
    pub recommended_actions: Vec<RecommendedAction>,
    pub customer_voice: CustomerVoice,
    pub week_over_week_comparison: WeekOverWeekComparison,
}

/// Period label for a report covering `first..=last`
pub fn period_label(first: NaiveDate, last: NaiveDate) -> String {
    format!("{} to {}", first, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_created_date_shapes() {
        let cases = [
            ("2024-03-05T10:15:00Z", Some("2024-03-05")),
            ("2024-03-05T23:15:00-05:00", Some("2024-03-05")),
            ("2024-03-05T10:15:00.123456", Some("2024-03-05")),
            ("2024-03-05 10:15:00", Some("2024-03-05")),
            ("2024-03-05", Some("2024-03-05")),
            ("last tuesday", None),
            ("", None),
        ];

        for (raw, expected) in cases {
            let ticket = TicketRecord::new("t", "c", raw);
            assert_eq!(ticket.created_date(), expected.map(date), "input {:?}", raw);
        }
    }

    #[test]
    fn test_date_or_fallback() {
        let ticket = TicketRecord::new("t", "c", "not a date");
        assert_eq!(ticket.date_or(date("2024-01-01")), date("2024-01-01"));
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Feature-Request".parse::<Category>(), Ok(Category::FeatureRequest));
        assert_eq!("feature".parse::<Category>(), Ok(Category::FeatureRequest));
        assert_eq!(" URGENT ".parse::<Priority>(), Ok(Priority::Critical));
        assert_eq!("angry".parse::<Sentiment>(), Ok(Sentiment::Frustrated));
        assert!("sideways".parse::<Sentiment>().is_err());
    }

    #[test]
    fn test_analysis_encoding() {
        let analysis = TicketAnalysis {
            ticket_id: "ticket_0".to_string(),
            category: Category::FeatureRequest,
            product_area: "billing".to_string(),
            sentiment: Sentiment::Frustrated,
            priority: Priority::High,
            themes: vec!["invoices".to_string()],
            summary: "Wants PDF invoices".to_string(),
        };

        let encoded = serde_json::to_value(&analysis).unwrap();
        assert_eq!(encoded["category"], json!("feature_request"));
        assert_eq!(encoded["sentiment"], json!("frustrated"));
        assert_eq!(encoded["priority"], json!("high"));
    }

    #[test]
    fn test_summary_date_encoding() {
        let summary = DailySummary {
            date: date("2024-03-05"),
            ticket_count: 2,
            key_themes: vec![],
            trend_analysis: "stable".to_string(),
            critical_issues: vec![],
        };
        assert_eq!(serde_json::to_value(&summary).unwrap()["date"], json!("2024-03-05"));
    }

    #[test]
    fn test_placeholder() {
        let placeholder = TicketAnalysis::placeholder("ticket_9", "timeout");
        assert_eq!(placeholder.category, Category::Error);
        assert_eq!(placeholder.product_area, "unknown");
        assert_eq!(placeholder.priority, Priority::Low);
        assert!(placeholder.themes.is_empty());
        assert_eq!(placeholder.summary, "Failed to extract: timeout");
        assert!(placeholder.is_placeholder());
    }
}
