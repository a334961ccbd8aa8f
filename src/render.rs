use chrono::{DateTime, Local, TimeZone, Utc};

use crate::models::OutboxMessage;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const CONTENT_WIDTH: usize = 48;
const HEADERS: [&str; 9] = [
    "ID",
    "Key",
    "Topic",
    "Partition",
    "Content",
    "Status",
    "Created",
    "Updated",
    "Send times",
];

/// Formats epoch milliseconds as local wall-clock time.
pub fn format_locale_time(ms: i64) -> String {
    format_time_in(ms, &Local)
}

/// Out-of-range timestamps render as the epoch.
pub fn format_time_in<Tz: TimeZone>(ms: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let instant = DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default();
    instant.with_timezone(tz).format(TIME_FORMAT).to_string()
}

/// Renders rows as a plain-text table, keeping their order.
pub fn render_table(rows: &[OutboxMessage]) -> String {
    render_table_with(rows, format_locale_time)
}

fn render_table_with(rows: &[OutboxMessage], format_time: impl Fn(i64) -> String) -> String {
    let cells: Vec<[String; 9]> = rows
        .iter()
        .map(|row| {
            [
                row.id.to_string(),
                row.key.clone(),
                row.msg.topic.clone(),
                row.msg.partition.to_string(),
                truncate(&row.msg.content, CONTENT_WIDTH),
                row.status.label().to_string(),
                format_time(row.ctime),
                format_time(row.utime),
                row.send_times.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|header| header.chars().count());
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, HEADERS.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for line in &cells {
        push_line(&mut out, line.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let padded: Vec<String> = cells
        .zip(widths.iter())
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(padded.join("  ").trim_end());
    out.push('\n');
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
