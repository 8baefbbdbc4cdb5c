//! Human-readable rendering of a run summary.

use super::Summary;
use crate::detect::{Metric, Severity};

const RULE_WIDTH: usize = 60;

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "🔴",
        Severity::Medium => "🟡",
        Severity::Low => "🟢",
    }
}

fn unit(metric: Metric) -> &'static str {
    match metric {
        Metric::Temperature => "°C",
        Metric::Humidity => "%",
    }
}

/// Render the summary with at most `top` anomalies listed.
pub fn format_summary(summary: &Summary, top: usize) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    if summary.is_no_data() {
        out.push_str("No data found. Make sure your sensors are sending data.\n");
        return out;
    }

    out.push_str(&format!("{thin}\nSUMMARY\n{thin}\n"));
    out.push_str(&format!("Data points analyzed: {}\n", summary.data_points_analyzed));
    out.push_str(&format!(
        "Time range: {} to {}\n",
        summary.time_range.start.as_deref().unwrap_or("-"),
        summary.time_range.end.as_deref().unwrap_or("-")
    ));

    for metric in Metric::ALL {
        let stats = summary.statistics.get(metric);
        let u = unit(metric);
        out.push_str(&format!("\n{} stats:\n", metric.label()));
        out.push_str(&format!("  Mean: {:.1}{u}\n", stats.mean));
        out.push_str(&format!("  Std Dev: {:.2}\n", stats.std));
        out.push_str(&format!("  Range: {:.1} - {:.1}{u}\n", stats.min, stats.max));
    }

    let counts = &summary.anomalies;
    out.push_str(&format!("\n{rule}\nANOMALIES DETECTED: {}\n{rule}\n", counts.total));

    if counts.total == 0 {
        out.push_str("\n✅ No anomalies detected! All readings are within normal ranges.\n");
        return out;
    }

    out.push_str("\nBy Severity:\n");
    out.push_str(&format!("  🔴 High:   {}\n", counts.by_severity.high));
    out.push_str(&format!("  🟡 Medium: {}\n", counts.by_severity.medium));
    out.push_str(&format!("  🟢 Low:    {}\n", counts.by_severity.low));

    out.push_str("\nBy Metric:\n");
    out.push_str(&format!("  Temperature: {}\n", counts.by_metric.temperature));
    out.push_str(&format!("  Humidity:    {}\n", counts.by_metric.humidity));

    out.push_str("\nBy Detection Method:\n");
    out.push_str(&format!("  Z-Score:          {}\n", counts.by_method.zscore));
    out.push_str(&format!("  Rate of Change:   {}\n", counts.by_method.rate_of_change));
    out.push_str(&format!("  Isolation Forest: {}\n", counts.by_method.isolation_forest));

    out.push_str(&format!("\n{rule}\nTOP ANOMALIES\n{rule}\n"));
    for (i, a) in summary.anomaly_details.iter().take(top).enumerate() {
        out.push_str(&format!(
            "\n{}. {} [{}] {}\n",
            i + 1,
            severity_icon(a.severity),
            a.severity.as_str().to_uppercase(),
            a.metric.label()
        ));
        out.push_str(&format!("   Time: {}\n", a.timestamp));
        out.push_str(&format!(
            "   Value: {:?} (expected: {:?} - {:?})\n",
            a.value, a.expected_range.0, a.expected_range.1
        ));
        out.push_str(&format!("   Method: {}\n", a.method));
        out.push_str(&format!("   Message: {}\n", a.message));
    }

    out
}
