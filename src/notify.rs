// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Notification rendering and the line-oriented output sink.
//!
//! Rendering is a pure function of its inputs: the same records, totals and
//! instant always produce the same lines. Each line is emitted on its own so
//! the outbound channel can consume them one at a time.

use std::{fmt::Display, io::Write};

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    aggregate::{AggregateTotals, active_records},
    batch::{BatchResult, TargetFailure},
    error::Error,
    extract::truncate_chars,
    metrics::{TEMPERATURE_TIPS, UV_TIPS, relative_time},
    repository::RepositoryRecord,
    weather::WeatherRecord,
};

/// Horizontal rule framing the repository digest.
pub const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━";

/// Characters of a commit message shown in a repository block.
pub const COMMIT_MESSAGE_CAP: usize = 50;

/// Prefix written before every line unless configured otherwise.
pub const DEFAULT_PREFIX: &str = "[NOTIFY] ";

/// Formats `value` with a comma every three digits.
///
/// # Examples
///
/// ```
/// use tempo_digest::group_thousands;
///
/// assert_eq!(group_thousands(1234567,), "1,234,567");
/// assert_eq!(group_thousands(-950,), "-950");
/// ```
pub fn group_thousands(value: i64,) -> String
{
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1,);

    if value < 0 {
        grouped.push('-',);
    }
    for (index, digit,) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',',);
        }
        grouped.push(digit,);
    }

    grouped
}

/// Renders the repository digest.
///
/// Sections appear in a fixed order: header, overview, one block per record
/// in batch order, the recently-active roster (omitted when empty), and the
/// time-of-day footer.
pub fn render_repository_digest<Tz,>(
    batch: &BatchResult<RepositoryRecord,>,
    totals: &AggregateTotals,
    now: &DateTime<Tz,>,
) -> Vec<String,>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let utc_now = now.with_timezone(&Utc,);
    let mut lines = vec![
        "📊 GitHub Repository Stats".to_owned(),
        SEPARATOR.to_owned(),
        format!("📅 {}", now.format("%Y-%m-%d %A")),
        String::new(),
        format!("📈 Overview ({} repositories)", totals.processed),
        format!("• Stars: {}", group_thousands(totals.total_stars,)),
        format!("• Forks: {}", group_thousands(totals.total_forks,)),
        format!("• Active repositories: {}", totals.active),
        String::new(),
    ];

    for record in &batch.records {
        render_record(record, utc_now, &mut lines,);
    }

    let active = active_records(&batch.records,);
    if !active.is_empty() {
        lines.push("🔥 Active in the last 24 hours:".to_owned(),);
        lines.extend(active.iter().map(|record| format!("• {}", record.identifier),),);
        lines.push(String::new(),);
    }

    lines.push(format!("⏰ Generated at: {}", now.format("%H:%M:%S")),);
    lines.push(SEPARATOR.to_owned(),);
    lines
}

fn render_record(record: &RepositoryRecord, now: DateTime<Utc,>, lines: &mut Vec<String,>,)
{
    let mark = if record.is_active { "🔥" } else { "  " };
    let info = &record.info;

    lines.push(format!("{mark} {}", record.identifier),);
    lines.push(format!(
        "⭐ {} stars | 🔱 {} forks | 👀 {} watchers",
        group_thousands(info.stars,),
        group_thousands(info.forks,),
        group_thousands(info.watchers,)
    ),);

    if let Some(commit,) = record.latest_commit() {
        lines.push(format!("📝 Latest commit: {}", truncate_chars(&commit.message, COMMIT_MESSAGE_CAP,)),);
        lines.push(format!("   ({} · {})", commit.author, relative_time(&commit.date, now,)),);
    }

    if let Some(release,) = &record.release {
        lines.push(format!("🏷️  Latest release: {}", release.tag_name),);
        lines.push(format!("   Published {}", relative_time(&release.published_at, now,)),);
    }

    lines.push(String::new(),);
}

/// Renders the weather report for one city.
pub fn render_weather<Tz,>(record: &WeatherRecord, now: &DateTime<Tz,>,) -> Vec<String,>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    vec![
        format!("☀️ {} Weather Forecast", record.city),
        String::new(),
        format!("📅 {}", now.format("%Y-%m-%d %A")),
        String::new(),
        "🌡️ Temperature".to_owned(),
        format!("  Current: {}°C (feels like {}°C)", record.temp_c, record.feels_like_c),
        format!("  Range: {}°C ~ {}°C", record.min_temp_c, record.max_temp_c),
        format!("  {}", TEMPERATURE_TIPS.label_for(record.temp_c,)),
        String::new(),
        format!("🌤️ Conditions: {}", record.description),
        format!("💧 Humidity: {}%", record.humidity),
        format!("💨 Wind: {} km/h ({})", record.wind_speed_kmph, record.wind_direction),
        format!("☀️ UV index: {} ({})", record.uv_index, UV_TIPS.label_for(record.uv_index,)),
        String::new(),
        format!("🌅 Sunrise: {}", record.sunrise),
        format!("🌇 Sunset: {}", record.sunset),
    ]
}

/// Renders the notification sent when a batch produced nothing.
pub fn render_failure(title: &str, failures: &[TargetFailure],) -> Vec<String,>
{
    let mut lines = vec![format!("❌ {title}")];
    if failures.is_empty() {
        lines.push("• no targets configured".to_owned(),);
    }
    lines.extend(failures.iter().map(|failure| format!("• {failure}"),),);
    lines
}

/// Writes notification lines to an [`io::Write`](std::io::Write) with a fixed
/// prefix.
///
/// # Examples
///
/// ```
/// use tempo_digest::LineSink;
///
/// let mut sink = LineSink::new(Vec::new(), "[NOTIFY] ",);
/// sink.emit_all(["first", "", "third"],)?;
/// assert_eq!(sink.into_inner(), b"[NOTIFY] first\n[NOTIFY] \n[NOTIFY] third\n");
/// # Ok::<(), tempo_digest::Error>(())
/// ```
#[derive(Debug,)]
pub struct LineSink<W,>
{
    writer: W,
    prefix: String,
}

impl<W: Write,> LineSink<W,>
{
    /// Creates a sink writing `prefix` before every line.
    pub fn new(writer: W, prefix: impl Into<String,>,) -> Self
    {
        Self {
            writer, prefix: prefix.into(),
        }
    }

    /// Writes a single line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Notify`] when the writer fails.
    pub fn emit(&mut self, line: &str,) -> Result<(), Error,>
    {
        writeln!(self.writer, "{}{line}", self.prefix).map_err(|source| Error::Notify {
            source,
        },)
    }

    /// Writes every line in order and flushes the writer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Notify`] on the first failed write or flush.
    pub fn emit_all<I, S,>(&mut self, lines: I,) -> Result<(), Error,>
    where
        I: IntoIterator<Item = S,>,
        S: AsRef<str,>,
    {
        for line in lines {
            self.emit(line.as_ref(),)?;
        }
        self.writer.flush().map_err(|source| Error::Notify {
            source,
        },)
    }

    /// Returns the underlying writer.
    pub fn into_inner(self,) -> W
    {
        self.writer
    }
}
