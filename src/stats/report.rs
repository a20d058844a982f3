//! Statistics report formatting.

use super::StatsReport;

/// Format a report as the human-readable summary.
pub fn format_summary(report: &StatsReport) -> String {
    let mut summary = format!("Total Number of Records:\t{}\n", report.record_count);
    summary.push_str(&format!("Min:\t{}\tMax:\t{}\n", report.min, report.max));
    summary.push_str(&format!("Mean:\t{:.4}\n", report.mean));
    summary.push_str(&format!("Standard Deviation:\t{:.4}\n", report.std_dev));
    summary.push_str(&format!(
        "Median:\t{}\t(25th: {}\t75th: {})\n",
        report.quartiles.median, report.quartiles.q1, report.quartiles.q3
    ));
    summary
}

/// Per-stage timings, one line each.
pub fn format_timings(report: &StatsReport) -> String {
    let total_us: u64 = report.timings.iter().map(|t| t.meta.duration_us).sum();
    let mut out = format!(
        "Backend: {} (block size {}, {} merge)\n",
        report.backend, report.block_size, report.merge
    );
    for timing in &report.timings {
        out.push_str(&format!(
            "  {:<20} {:>10} us\n",
            timing.stage.to_string(),
            timing.meta.duration_us
        ));
    }
    out.push_str(&format!("  {:<20} {:>10} us\n", "total", total_us));
    out
}
