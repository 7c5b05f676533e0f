use std::fmt;

use chrono::NaiveDateTime;

use crate::models::Report;

/// Console view of a report
pub struct ReportView<'a> {
    pub report: &'a Report,
    pub verbose: bool,
    pub debug: bool,
}

/// Render the console report
pub fn render(report: &Report, verbose: bool, debug: bool) -> String {
    ReportView { report, verbose, debug }.to_string()
}

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;

        if let Some(date) = report.selected_date {
            writeln!(f, "Report for {}", date)?;
        }
        writeln!(
            f,
            "Total active time spent casting spells: {:.2} minutes",
            report.active_seconds as f64 / 60.0
        )?;
        writeln!(f, "Total AFK time: {:.2} minutes", report.afk_seconds as f64 / 60.0)?;
        writeln!(f, "Total processing time: {:.2} seconds", report.processing_secs)?;

        if !report.skills.is_empty() {
            writeln!(f, "\nSkill-ups detected:")?;
            for (skill, record) in &report.skills {
                writeln!(
                    f,
                    "{}: {} -> {} ({:+})",
                    skill,
                    record.start,
                    record.end,
                    record.delta()
                )?;
            }
        }

        writeln!(f, "\nTotal experience messages detected: {}", report.experience_count)?;

        if self.verbose {
            writeln!(f, "\nStatistics:")?;
            writeln!(f, "Total log entries scanned: {}", report.total_log_entries)?;
            writeln!(f, "First cast entry: {}", display_time(report.first_cast_time))?;
            writeln!(f, "Last cast entry: {}", display_time(report.last_cast_time))?;
            if report.malformed_cast_lines > 0 {
                writeln!(
                    f,
                    "Cast lines skipped (malformed timestamp): {}",
                    report.malformed_cast_lines
                )?;
            }
        }

        if self.debug {
            writeln!(f, "\nDebug mode enabled: detailed processing output written to stderr.")?;
            writeln!(f, "Experience lines are written to excluded_lines_*.log")?;
        }

        Ok(())
    }
}

fn display_time(time: Option<NaiveDateTime>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "none".to_string())
}
