// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Values derived from extracted facts and the current time.
//!
//! Everything here is a pure function of its arguments; nothing is cached
//! between runs.

use chrono::{DateTime, TimeDelta, Utc};

/// Width of the "recently active" window in hours.
pub const ACTIVITY_WINDOW_HOURS: i64 = 24;

/// Parses an RFC 3339 timestamp (`2024-05-01T12:00:00Z`) into UTC.
pub fn parse_timestamp(value: &str,) -> Option<DateTime<Utc,>,>
{
    DateTime::parse_from_rfc3339(value.trim(),).ok().map(|parsed| parsed.with_timezone(&Utc,),)
}

/// Renders the time elapsed since `timestamp` using the largest whole unit.
///
/// Malformed timestamps are returned unchanged. Timestamps in the future
/// render as `just now`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use tempo_digest::relative_time;
///
/// let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0,).unwrap();
/// assert_eq!(relative_time("2024-05-01T10:30:00Z", now,), "1 hours ago");
/// assert_eq!(relative_time("2024-04-28T12:00:00Z", now,), "3 days ago");
/// assert_eq!(relative_time("yesterday", now,), "yesterday");
/// ```
pub fn relative_time(timestamp: &str, now: DateTime<Utc,>,) -> String
{
    let Some(moment,) = parse_timestamp(timestamp,) else {
        return timestamp.to_owned();
    };

    let elapsed = now - moment;
    if elapsed.num_days() >= 1 {
        format!("{} days ago", elapsed.num_days())
    } else if elapsed.num_hours() >= 1 {
        format!("{} hours ago", elapsed.num_hours())
    } else if elapsed.num_minutes() >= 1 {
        format!("{} minutes ago", elapsed.num_minutes())
    } else {
        "just now".to_owned()
    }
}

/// Returns `true` when the most recent activity happened strictly less than
/// [`ACTIVITY_WINDOW_HOURS`] before `now`.
///
/// `None` (no activity entries) and unparsable timestamps yield `false`.
pub fn is_recently_active(latest: Option<&str,>, now: DateTime<Utc,>,) -> bool
{
    latest
        .and_then(parse_timestamp,)
        .is_some_and(|moment| now - moment < TimeDelta::hours(ACTIVITY_WINDOW_HOURS,),)
}

/// Ordered table of inclusive upper bounds mapped to labels.
///
/// Bounds must be ascending. A reading resolves to the label of the first
/// bound it does not exceed; readings above every bound take the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct ThresholdTable
{
    bands:   &'static [(i64, &'static str,)],
    default: &'static str,
}

impl ThresholdTable
{
    /// Creates a table from ascending `(inclusive upper bound, label)` pairs.
    pub const fn new(bands: &'static [(i64, &'static str,)], default: &'static str,) -> Self
    {
        Self {
            bands, default,
        }
    }

    /// Label of the band containing `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tempo_digest::UV_TIPS;
    ///
    /// assert_eq!(UV_TIPS.label_for(2,), "No protection needed");
    /// assert_eq!(UV_TIPS.label_for(3,), "Protection advised");
    /// assert_eq!(UV_TIPS.label_for(11,), "Protection required");
    /// ```
    pub fn label_for(&self, value: i64,) -> &'static str
    {
        self.bands
            .iter()
            .find(|(bound, _,)| value <= *bound,)
            .map_or(self.default, |(_, label,)| *label,)
    }

    /// Bands in ascending order, without the default.
    pub fn bands(&self,) -> &'static [(i64, &'static str,)]
    {
        self.bands
    }
}

/// Clothing tip by current temperature in °C.
pub const TEMPERATURE_TIPS: ThresholdTable = ThresholdTable::new(
    &[
        (-1, "🧊 Bundle up",),
        (9, "🧥 Wear extra layers",),
        (19, "👔 Mild",),
        (29, "👕 Comfortable",),
    ],
    "🌡️ Beware of heat",
);

/// Sun protection tip by UV index.
pub const UV_TIPS: ThresholdTable = ThresholdTable::new(
    &[(2, "No protection needed",), (5, "Protection advised",), (7, "Extra protection",)],
    "Protection required",
);
