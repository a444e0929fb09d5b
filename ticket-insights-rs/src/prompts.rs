//! Prompt templates for the three inference stages

/// Per-ticket extraction prompt
pub fn extraction_prompt(ticket_content: &str) -> String {
    format!(
        r#"Analyze this support ticket:

{ticket_content}

Extract JSON with: category, product_area, sentiment, priority, themes (list), summary

Categories: bug, feature_request, question, complaint
Sentiments: positive, neutral, negative, frustrated
Priorities: low, medium, high, critical

Return ONLY valid JSON."#
    )
}

/// Inputs of the daily summary prompt, already rendered as text
#[derive(Debug, Clone)]
pub struct SummaryPromptInput<'a> {
    pub ticket_count: usize,
    /// e.g. `bug: 4, question: 2`
    pub categories: &'a str,
    /// e.g. `login: 3, billing: 1`
    pub top_themes: &'a str,
    /// One `- [priority] category: summary` line per sampled analysis
    pub samples: &'a str,
    pub previous_summary: &'a str,
}

/// Per-day aggregation prompt
pub fn summary_prompt(input: &SummaryPromptInput<'_>) -> String {
    format!(
        r#"Summarize today's support tickets.

Stats:
- Total tickets: {ticket_count}
- Categories: {categories}
- Top themes: {top_themes}

Sample tickets:
{samples}

Yesterday's summary: {previous_summary}

Generate JSON with:
- key_themes: list of 5 most important themes
- trend_analysis: how this compares to yesterday
- critical_issues: anything requiring immediate attention

Return ONLY valid JSON."#,
        ticket_count = input.ticket_count,
        categories = input.categories,
        top_themes = input.top_themes,
        samples = input.samples,
        previous_summary = input.previous_summary,
    )
}

/// Multi-day executive report prompt
pub fn report_prompt(summaries: &str) -> String {
    format!(
        r#"Generate an executive report optimized for product team engagement and action.

Daily summaries for the period:
{summaries}

Create a JSON report with the following structure:

1. executive_summary:
   - Start with the most critical insight (what changed and why it matters)
   - Include key metrics with directional indicators (↑↓)
   - End with business impact (customer satisfaction, revenue risk, brand reputation)
   - Keep to 3-4 sentences max

2. health_snapshot:
   - overall_health: "critical" | "concerning" | "stable" | "improving" (with brief justification)
   - ticket_volume_trend: numerical change with percentage
   - complaint_rate_trend: numerical change with percentage
   - top_3_drivers: list of issue types driving the most volume

3. key_insights (5 insights, prioritized by impact):
   For each insight provide:
   - insight: the finding itself
   - severity: "critical" | "high" | "medium" | "low"
   - evidence: specific data points or patterns supporting this
   - customer_impact: how this affects customer experience

4. recommended_actions (3-5 actions, prioritized):
   For each action provide:
   - action: specific, actionable task
   - priority: "immediate" | "this_week" | "this_month"
   - estimated_impact: "high" | "medium" | "low" (expected reduction in ticket volume or complaint rate)
   - suggested_owner: which team should own this (e.g., "Engineering", "Operations", "Product", "Support")
   - success_metrics: how to measure if this worked (specific KPIs)

5. customer_voice:
   - quotes: 2-3 verbatim ticket quotes or paraphrased examples that illustrate the most critical issues

6. week_over_week_comparison:
   - improved, deteriorated, stayed_same: lists of concrete changes

Guidelines:
- Use specific numbers over vague terms ("42% complaint rate" not "high complaints")
- Frame insights around customer impact and business risk
- Make actions concrete enough that teams can start immediately
- Use urgency appropriately (not everything is critical)

Return ONLY valid JSON."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_prompt_embeds_ticket() {
        let prompt = extraction_prompt("My invoice is wrong");
        assert!(prompt.contains("My invoice is wrong"));
        assert!(prompt.ends_with("Return ONLY valid JSON."));
    }

    #[test]
    fn test_summary_prompt_fields() {
        let prompt = summary_prompt(&SummaryPromptInput {
            ticket_count: 3,
            categories: "bug: 2, question: 1",
            top_themes: "login: 2",
            samples: "- [high] bug: cannot log in",
            previous_summary: "No previous summary",
        });
        assert!(prompt.contains("- Total tickets: 3"));
        assert!(prompt.contains("Yesterday's summary: No previous summary"));
        assert!(prompt.contains("- [high] bug: cannot log in"));
    }
}
