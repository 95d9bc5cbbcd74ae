use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::models::{IndicatorReading, RiskAssessment, Status, Stream};
use crate::risk::SUB_SCORE_CAP;

const CHART_WIDTH: usize = 40;

/// One line per indicator explaining its contribution to the score.
pub fn reasons(reading: &IndicatorReading, assessment: &RiskAssessment) -> Vec<String> {
    let parts = &assessment.sub_scores;
    let absence_rate = reading.absence_rate().unwrap_or_default();

    vec![
        format!(
            "School absence: {:.2}% ({} of {}) -> {:.1}/{:.0}",
            absence_rate,
            reading.absent_students,
            reading.total_students,
            parts.school,
            SUB_SCORE_CAP
        ),
        format!(
            "Medicine sales: {} cold/cough + {} fever -> {:.1}/{:.0}",
            reading.cold_sales, reading.fever_sales, parts.medicine, SUB_SCORE_CAP
        ),
        format!(
            "Toilet usage: {} visits -> {:.1}/{:.0}",
            reading.toilet_usage_count, parts.toilet, SUB_SCORE_CAP
        ),
        format!(
            "Water quality: pH {:.2}, turbidity {:.2} -> {:.1}/{:.0}",
            reading.ph, reading.turbidity, parts.water, SUB_SCORE_CAP
        ),
    ]
}

pub fn build_report(
    village: &str,
    generated_at: NaiveDateTime,
    assessment: &RiskAssessment,
    reasons: &str,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "AI EARLY DISEASE WARNING REPORT");
    let _ = writeln!(output, "------------------------------");
    let _ = writeln!(output, "Date: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(output, "Village: {}", village);
    let _ = writeln!(output, "Data as of: {}", assessment.date);
    let _ = writeln!(output);
    let _ = writeln!(output, "Risk Score: {}", assessment.score);
    let _ = writeln!(output, "Status: {}", assessment.status);
    let _ = writeln!(output);
    let _ = writeln!(output, "Reasons:");
    if reasons.trim().is_empty() {
        let _ = writeln!(output, "No reasons recorded.");
    } else {
        let _ = writeln!(output, "{}", reasons.trim_end());
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "Recommended Action:");
    let _ = writeln!(output, "- Increase medical stock");
    let _ = writeln!(output, "- Deploy health workers");
    let _ = writeln!(output, "- Issue public advisory");

    output
}

/// Horizontal bar chart, one row per value, scaled to the largest value.
pub fn render_trend(stream: Stream, values: &[f64]) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Trend: {} (last {} readings)",
        stream,
        values.len()
    );

    if values.is_empty() {
        let _ = writeln!(output, "No readings.");
        return output;
    }

    let max = values.iter().copied().fold(0.0_f64, f64::max);
    for (index, value) in values.iter().enumerate() {
        let bar = if max > 0.0 {
            ((value / max) * CHART_WIDTH as f64).round() as usize
        } else {
            0
        };
        let _ = writeln!(
            output,
            "{:>3} | {:<width$} {:.1}",
            index + 1,
            "#".repeat(bar),
            value,
            width = CHART_WIDTH
        );
    }

    output
}

pub fn render_dashboard(
    assessment: &RiskAssessment,
    reasons: &[String],
    trend: Option<(Stream, &[f64])>,
) -> String {
    let mut output = String::new();
    let marker = match assessment.status {
        Status::Normal => "[ok]",
        Status::Alert => "[!]",
        Status::Emergency => "[!!!]",
    };

    let _ = writeln!(output, "Early Disease Warning ({})", assessment.date);
    let _ = writeln!(output, "Current Status: {} {}", marker, assessment.status);
    let _ = writeln!(output, "Risk Score: {} / 100", assessment.score);
    let _ = writeln!(output);
    let _ = writeln!(output, "Reasons:");
    for reason in reasons {
        let _ = writeln!(output, "- {}", reason);
    }

    if let Some((stream, values)) = trend {
        let _ = writeln!(output);
        output.push_str(&render_trend(stream, values));
    }

    output
}
