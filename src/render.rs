//! Terminal presentation of a [`Report`].
//!
//! Plain-text tables for timings, ping outcomes and fetch outcomes, plus an
//! optional section listing redirect chains. JSON output is also available
//! for scripting.

use std::io::{self, Write};
use std::time::Duration;

use crate::dashboard::Report;
use crate::probe::http::FetchOutcome;
use crate::probe::ping::PingOutcome;

/// Widest URL cell before truncation.
const MAX_URL_WIDTH: usize = 40;

/// Widest error cell before truncation.
const MAX_ERROR_WIDTH: usize = 60;

/// Placeholder for measurements that do not apply to errored outcomes.
const NOT_APPLICABLE: &str = "-";

/// Shorten `s` to at most `max_len` characters, ending in `...` when cut.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Format a duration as milliseconds with two decimals.
pub fn format_duration(d: Duration) -> String {
    format!("{:.2} ms", d.as_secs_f64() * 1000.0)
}

/// Minimal bordered text table.
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        widths
    }

    fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        let widths = self.widths();
        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+");
        let separator = format!("+{separator}+");

        writeln!(out, "{separator}")?;
        write_row(out, &self.headers, &widths)?;
        writeln!(out, "{separator}")?;
        for row in &self.rows {
            write_row(out, row, &widths)?;
        }
        writeln!(out, "{separator}")
    }
}

fn write_row(out: &mut impl Write, cells: &[String], widths: &[usize]) -> io::Result<()> {
    write!(out, "|")?;
    for (cell, width) in cells.iter().zip(widths) {
        let pad = width.saturating_sub(cell.chars().count());
        write!(out, " {cell}{} |", " ".repeat(pad))?;
    }
    writeln!(out)
}

fn timing_table(report: &Report) -> Table {
    let mut table = Table::new(["Operation", "Time"]);
    table.push_row(vec!["Ping".into(), format_duration(report.ping_elapsed)]);
    table.push_row(vec!["Fetch".into(), format_duration(report.fetch_elapsed)]);
    table.push_row(vec!["Total".into(), format_duration(report.total_elapsed())]);
    table
}

fn ping_table(outcomes: &[PingOutcome]) -> Table {
    let mut table = Table::new(["URL", "Domain", "Packets", "Loss", "Avg RTT", "Result"]);
    for outcome in outcomes {
        let row = match outcome.error {
            Some(ref e) => vec![
                truncate(&outcome.url, MAX_URL_WIDTH),
                truncate(&outcome.domain, MAX_URL_WIDTH),
                NOT_APPLICABLE.into(),
                NOT_APPLICABLE.into(),
                NOT_APPLICABLE.into(),
                truncate(&format!("ERROR: {e}"), MAX_ERROR_WIDTH),
            ],
            None => vec![
                truncate(&outcome.url, MAX_URL_WIDTH),
                truncate(&outcome.domain, MAX_URL_WIDTH),
                format!("{}/{}", outcome.packets_received, outcome.packets_sent),
                format!("{:.1}%", outcome.packet_loss_percent),
                format_duration(outcome.avg_rtt),
                "OK".into(),
            ],
        };
        table.push_row(row);
    }
    table
}

/// Status cell, tagging a final 3xx that was not followed.
fn status_cell(status: u16) -> String {
    if (300..400).contains(&status) {
        format!("{status} (Redirect)")
    } else {
        status.to_string()
    }
}

fn fetch_table(outcomes: &[FetchOutcome]) -> Table {
    let mut table = Table::new(["URL", "Status", "Size (MB)", "Bytes", "Redirects", "Result"]);
    for outcome in outcomes {
        let redirects = outcome.redirects.len().to_string();
        let row = match outcome.error {
            Some(ref e) => vec![
                truncate(&outcome.url, MAX_URL_WIDTH),
                NOT_APPLICABLE.into(),
                NOT_APPLICABLE.into(),
                NOT_APPLICABLE.into(),
                redirects,
                truncate(&format!("ERROR: {e}"), MAX_ERROR_WIDTH),
            ],
            None => vec![
                truncate(&outcome.url, MAX_URL_WIDTH),
                status_cell(outcome.status_code),
                format!("{:.2}", outcome.body_size_mb),
                outcome.body_length_bytes.to_string(),
                redirects,
                "OK".into(),
            ],
        };
        table.push_row(row);
    }
    table
}

fn write_redirect_details(outcomes: &[FetchOutcome], out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Redirect details")?;
    for outcome in outcomes.iter().filter(|o| o.was_redirected()) {
        writeln!(out, "  {}", outcome.url)?;
        for (i, location) in outcome.redirects.iter().enumerate() {
            writeln!(out, "    {}. {}", i + 1, location)?;
        }
    }
    Ok(())
}

/// Write the report as text tables.
pub fn render_text(report: &Report, out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "Web dashboard - {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out)?;

    writeln!(out, "Timing")?;
    timing_table(report).write_to(out)?;
    writeln!(out)?;

    writeln!(out, "Ping results (slowest first)")?;
    ping_table(&report.ping).write_to(out)?;
    writeln!(out)?;

    writeln!(out, "Fetch results (largest first)")?;
    fetch_table(&report.fetch).write_to(out)?;

    if report.has_redirects() {
        writeln!(out)?;
        write_redirect_details(&report.fetch, out)?;
    }

    Ok(())
}

/// Write the report as pretty-printed JSON.
pub fn render_json(report: &Report, out: &mut impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}
