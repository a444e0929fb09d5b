use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::{
    coerce_entries, coerce_text, coerce_text_list, pick_text, stringify, text_or, FieldShape,
    MAX_KEY_THEMES,
};
use crate::error::{PipelineError, Result};
use crate::models::{
    Category, CustomerVoice, DailySummary, HealthSnapshot, KeyInsight, Priority,
    RecommendedAction, Report, Sentiment, TicketAnalysis, WeekOverWeekComparison,
};

const DEFAULT_SEVERITY: &str = "medium";
const DEFAULT_ACTION_PRIORITY: &str = "this_week";
const DEFAULT_IMPACT: &str = "medium";

/// The top-level object of a recovered value.
///
/// A one-element array wrapping an object is unwrapped.
fn root_object<'a>(value: &'a Value, kind: &str) -> Result<&'a Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(items) if items.len() == 1 => root_object(&items[0], kind),
        other => Err(PipelineError::normalization(format!(
            "{} response must be a JSON object, got {}",
            kind,
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn enum_field<T>(map: &Map<String, Value>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    match coerce_text(map.get(key), &[key, "value", "name"]) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| PipelineError::normalization(format!("field {}: {}", key, e))),
    }
}

/// Build a ticket analysis from a recovered value.
///
/// Absent enum fields default; a present but unrecognized enum value is an
/// error.
pub fn normalize_analysis(ticket_id: &str, value: &Value) -> Result<TicketAnalysis> {
    let map = root_object(value, "analysis")?;

    Ok(TicketAnalysis {
        ticket_id: ticket_id.to_string(),
        category: enum_field(map, "category", Category::Question)?,
        product_area: text_or(
            map.get("product_area"),
            &["product_area", "name", "area"],
            "unknown",
        ),
        sentiment: enum_field(map, "sentiment", Sentiment::Neutral)?,
        priority: enum_field(map, "priority", Priority::Medium)?,
        themes: coerce_text_list(map.get("themes"), &["theme"]),
        summary: text_or(map.get("summary"), &["summary", "text", "note"], ""),
    })
}

/// Build a daily summary from a recovered value; identity fields come from the caller
pub fn normalize_daily_summary(
    date: NaiveDate,
    ticket_count: usize,
    value: &Value,
) -> Result<DailySummary> {
    let map = root_object(value, "summary")?;

    let mut key_themes = coerce_text_list(map.get("key_themes"), &["theme"]);
    key_themes.truncate(MAX_KEY_THEMES);

    Ok(DailySummary {
        date,
        ticket_count,
        key_themes,
        trend_analysis: text_or(map.get("trend_analysis"), &["note", "text", "analysis"], ""),
        critical_issues: coerce_text_list(
            map.get("critical_issues"),
            &["issue", "text", "description"],
        ),
    })
}

/// Build a report from a recovered value; `period` comes from the caller
pub fn normalize_report(period: &str, value: &Value) -> Result<Report> {
    let map = root_object(value, "report")?;

    Ok(Report {
        period: period.to_string(),
        executive_summary: text_or(
            map.get("executive_summary"),
            &["summary", "text", "note"],
            "",
        ),
        health_snapshot: health_snapshot(map.get("health_snapshot")),
        key_insights: coerce_entries(map.get("key_insights"))
            .into_iter()
            .map(key_insight)
            .collect(),
        recommended_actions: coerce_entries(map.get("recommended_actions"))
            .into_iter()
            .map(recommended_action)
            .collect(),
        customer_voice: customer_voice(map.get("customer_voice")),
        week_over_week_comparison: week_over_week(map.get("week_over_week_comparison")),
    })
}

const SNAPSHOT_TEXT_KEYS: [&str; 4] = ["text", "note", "summary", "value"];

fn health_snapshot(value: Option<&Value>) -> HealthSnapshot {
    match FieldShape::of(value) {
        FieldShape::Object(hs) => HealthSnapshot {
            overall_health: text_or(hs.get("overall_health"), &SNAPSHOT_TEXT_KEYS, ""),
            ticket_volume_trend: text_or(hs.get("ticket_volume_trend"), &SNAPSHOT_TEXT_KEYS, ""),
            complaint_rate_trend: text_or(hs.get("complaint_rate_trend"), &SNAPSHOT_TEXT_KEYS, ""),
            top_3_drivers: coerce_text_list(hs.get("top_3_drivers"), &["driver"]),
        },
        // A bare verdict is the overall health
        FieldShape::Text(_) | FieldShape::Scalar(_) | FieldShape::List(_) => HealthSnapshot {
            overall_health: text_or(value, &[], ""),
            ..HealthSnapshot::default()
        },
        FieldShape::Missing => HealthSnapshot::default(),
    }
}

fn key_insight(entry: &Value) -> KeyInsight {
    match entry {
        Value::Object(map) => KeyInsight {
            insight: pick_text(map, &["insight"]).unwrap_or_else(|| entry.to_string()),
            severity: pick_text(map, &["severity"]).unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
            evidence: pick_text(map, &["evidence", "text"]).unwrap_or_default(),
            customer_impact: pick_text(map, &["customer_impact", "impact"]).unwrap_or_default(),
        },
        other => KeyInsight {
            insight: stringify(other),
            severity: DEFAULT_SEVERITY.to_string(),
            evidence: String::new(),
            customer_impact: String::new(),
        },
    }
}

fn recommended_action(entry: &Value) -> RecommendedAction {
    match entry {
        Value::Object(map) => RecommendedAction {
            action: pick_text(map, &["action"]).unwrap_or_else(|| entry.to_string()),
            priority: pick_text(map, &["priority"])
                .unwrap_or_else(|| DEFAULT_ACTION_PRIORITY.to_string()),
            estimated_impact: pick_text(map, &["estimated_impact"])
                .unwrap_or_else(|| DEFAULT_IMPACT.to_string()),
            suggested_owner: pick_text(map, &["suggested_owner", "owner"]).unwrap_or_default(),
            success_metrics: pick_text(map, &["success_metrics", "metrics"]).unwrap_or_default(),
        },
        other => RecommendedAction {
            action: stringify(other),
            priority: DEFAULT_ACTION_PRIORITY.to_string(),
            estimated_impact: DEFAULT_IMPACT.to_string(),
            suggested_owner: String::new(),
            success_metrics: String::new(),
        },
    }
}

fn customer_voice(value: Option<&Value>) -> CustomerVoice {
    let quotes = match FieldShape::of(value) {
        FieldShape::Object(cv) => coerce_text_list(cv.get("quotes"), &["quote"]),
        FieldShape::List(_) | FieldShape::Text(_) => coerce_text_list(value, &["quote"]),
        FieldShape::Scalar(_) | FieldShape::Missing => Vec::new(),
    };
    CustomerVoice { quotes }
}

fn week_over_week(value: Option<&Value>) -> WeekOverWeekComparison {
    match FieldShape::of(value) {
        FieldShape::Object(wow) => WeekOverWeekComparison {
            improved: coerce_text_list(wow.get("improved"), &["item"]),
            deteriorated: coerce_text_list(wow.get("deteriorated"), &["item"]),
            stayed_same: coerce_text_list(wow.get("stayed_same"), &["item"]),
        },
        _ => WeekOverWeekComparison::default(),
    }
}
