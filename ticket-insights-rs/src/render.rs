//! Markdown and console rendering of a report

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::models::Report;

/// File name of the Markdown rendering of `report`
pub fn markdown_file_name(report: &Report) -> String {
    let stem = match report.period.split_once(" to ") {
        Some((start, end)) => format!("report_{}_{}", start.trim(), end.trim()),
        None => format!("report_{}", report.period.trim()),
    };
    format!("{}.md", stem.replace(['/', '\\', ' '], "_"))
}

/// Render `report` as a Markdown document
pub fn render_markdown(report: &Report) -> String {
    let mut lines: Vec<String> = vec![
        "# Support Ticket Analysis Report".to_string(),
        format!("**Period:** {}", report.period),
        String::new(),
        "## Executive Summary".to_string(),
        report.executive_summary.clone(),
        String::new(),
        "## Health Snapshot".to_string(),
    ];

    let hs = &report.health_snapshot;
    lines.push(format!("- **Overall Health:** {}", hs.overall_health));
    lines.push(format!("- **Ticket Volume Trend:** {}", hs.ticket_volume_trend));
    lines.push(format!("- **Complaint Rate Trend:** {}", hs.complaint_rate_trend));
    lines.push("- **Top 3 Drivers:**".to_string());
    lines.extend(hs.top_3_drivers.iter().map(|d| format!("  - {}", d)));
    lines.push(String::new());

    lines.push("## Key Insights".to_string());
    for (i, insight) in report.key_insights.iter().enumerate() {
        lines.push(format!("### Insight {}: {}", i + 1, insight.insight));
        lines.push(format!("- **Severity:** {}", insight.severity));
        lines.push(format!("- **Evidence:** {}", insight.evidence));
        lines.push(format!("- **Customer Impact:** {}", insight.customer_impact));
        lines.push(String::new());
    }

    lines.push("## Recommended Actions".to_string());
    for (i, action) in report.recommended_actions.iter().enumerate() {
        lines.push(format!("### Action {}: {}", i + 1, action.action));
        lines.push(format!("- **Priority:** {}", action.priority));
        lines.push(format!("- **Estimated Impact:** {}", action.estimated_impact));
        lines.push(format!("- **Suggested Owner:** {}", action.suggested_owner));
        lines.push(format!("- **Success Metrics:** {}", action.success_metrics));
        lines.push(String::new());
    }

    if !report.customer_voice.quotes.is_empty() {
        lines.push("## Customer Voice".to_string());
        lines.extend(report.customer_voice.quotes.iter().map(|q| format!("> {}", q)));
        lines.push(String::new());
    }

    lines.push("## Week-over-Week Comparison".to_string());
    let wow = &report.week_over_week_comparison;
    for (title, items) in [
        ("Improved", &wow.improved),
        ("Deteriorated", &wow.deteriorated),
        ("Stayed the Same", &wow.stayed_same),
    ] {
        if items.is_empty() {
            continue;
        }
        lines.push(format!("### {}", title));
        lines.extend(items.iter().map(|item| format!("- {}", item)));
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Write the Markdown rendering into `dir` and return its path
pub fn write_markdown(report: &Report, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .map_err(|e| PipelineError::cache(format!("cannot create {}: {}", dir.display(), e)))?;
    let path = dir.join(markdown_file_name(report));
    fs::write(&path, render_markdown(report))
        .map_err(|e| PipelineError::cache(format!("cannot write {}: {}", path.display(), e)))?;
    Ok(path)
}

/// Short plain-text digest for the terminal
pub fn console_digest(report: &Report) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();

    let _ = writeln!(out, "{}\nEXECUTIVE SUMMARY\n{}", rule, rule);
    let _ = writeln!(out, "{}", report.executive_summary);

    let hs = &report.health_snapshot;
    let _ = writeln!(out, "\nHEALTH SNAPSHOT:");
    let _ = writeln!(out, "  Overall Health: {}", hs.overall_health);
    let _ = writeln!(out, "  Ticket Volume Trend: {}", hs.ticket_volume_trend);
    let _ = writeln!(out, "  Complaint Rate Trend: {}", hs.complaint_rate_trend);
    let _ = writeln!(out, "  Top 3 Drivers: {}", hs.top_3_drivers.join(", "));

    let _ = writeln!(out, "\nKEY INSIGHTS:");
    for (i, insight) in report.key_insights.iter().enumerate() {
        let _ = writeln!(out, "{}. [{}] {}", i + 1, insight.severity.to_uppercase(), insight.insight);
    }

    let _ = writeln!(out, "\nRECOMMENDED ACTIONS:");
    for (i, action) in report.recommended_actions.iter().enumerate() {
        let _ = writeln!(out, "{}. [{}] {}", i + 1, action.priority.to_uppercase(), action.action);
        if !action.suggested_owner.is_empty() {
            let _ = writeln!(out, "   Owner: {}", action.suggested_owner);
        }
    }

    let _ = writeln!(out, "\nCUSTOMER VOICE:");
    for quote in &report.customer_voice.quotes {
        let _ = writeln!(out, "  \"{}\"", quote);
    }
    let _ = write!(out, "{}", rule);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CustomerVoice, HealthSnapshot, KeyInsight, RecommendedAction, WeekOverWeekComparison,
    };

    fn report() -> Report {
        Report {
            period: "2024-03-04 to 2024-03-05".to_string(),
            executive_summary: "Login failures doubled.".to_string(),
            health_snapshot: HealthSnapshot {
                overall_health: "concerning".to_string(),
                ticket_volume_trend: "+20%".to_string(),
                complaint_rate_trend: "+5%".to_string(),
                top_3_drivers: vec!["sso".to_string()],
            },
            key_insights: vec![KeyInsight {
                insight: "SSO outage".to_string(),
                severity: "high".to_string(),
                evidence: "30 tickets".to_string(),
                customer_impact: "locked out".to_string(),
            }],
            recommended_actions: vec![RecommendedAction {
                action: "Roll back IdP change".to_string(),
                priority: "immediate".to_string(),
                estimated_impact: "high".to_string(),
                suggested_owner: "Engineering".to_string(),
                success_metrics: "SSO tickets < 5/day".to_string(),
            }],
            customer_voice: CustomerVoice { quotes: vec![] },
            week_over_week_comparison: WeekOverWeekComparison {
                improved: vec!["billing".to_string()],
                deteriorated: vec![],
                stayed_same: vec![],
            },
        }
    }

    #[test]
    fn test_markdown_sections() {
        let md = render_markdown(&report());
        assert!(md.starts_with("# Support Ticket Analysis Report\n**Period:** 2024-03-04 to 2024-03-05"));
        assert!(md.contains("## Executive Summary\nLogin failures doubled."));
        assert!(md.contains("- **Overall Health:** concerning"));
        assert!(md.contains("  - sso"));
        assert!(md.contains("### Insight 1: SSO outage"));
        assert!(md.contains("### Action 1: Roll back IdP change"));
        assert!(md.contains("### Improved\n- billing"));
        // Empty sections are omitted
        assert!(!md.contains("## Customer Voice"));
        assert!(!md.contains("### Deteriorated"));
    }

    #[test]
    fn test_customer_voice_quotes() {
        let mut report = report();
        report.customer_voice.quotes = vec!["I can't log in".to_string()];
        assert!(render_markdown(&report).contains("## Customer Voice\n> I can't log in"));
    }

    #[test]
    fn test_file_name_and_digest() {
        let report = report();
        assert_eq!(markdown_file_name(&report), "report_2024-03-04_2024-03-05.md");

        let digest = console_digest(&report);
        assert!(digest.contains("1. [HIGH] SSO outage"));
        assert!(digest.contains("1. [IMMEDIATE] Roll back IdP change\n   Owner: Engineering"));
    }
}
