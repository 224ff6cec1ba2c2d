// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Detailed JSON dump of a repository batch.
//!
//! The notification only carries headline numbers. The report keeps every
//! extracted fact together with the failure list so a run can be inspected
//! afterwards.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use crate::{
    aggregate::AggregateTotals,
    batch::{BatchResult, TargetFailure},
    error::{self, Error},
    repository::RepositoryRecord
};

/// Serialized shape of the report file.
#[derive(Debug, Serialize)]
pub struct RepositoryReport<'a> {
    /// Instant the batch was analyzed, RFC 3339 in UTC.
    pub generated_at: String,
    /// Totals shown in the notification overview.
    pub totals:       &'a AggregateTotals,
    /// Successful records in batch order.
    pub records:      &'a [RepositoryRecord],
    /// Dropped targets with their causes.
    pub failures:     &'a [TargetFailure]
}

impl<'a> RepositoryReport<'a> {
    /// Borrows the parts of a finished batch.
    pub fn new(
        batch: &'a BatchResult<RepositoryRecord>,
        totals: &'a AggregateTotals,
        now: DateTime<Utc>
    ) -> Self {
        Self {
            generated_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            totals,
            records: &batch.records,
            failures: &batch.failures
        }
    }
}

/// Writes `report` to `path` as pretty-printed JSON, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be written and
/// [`Error::Serialize`] when encoding fails.
pub fn write_report(path: &Path, report: &RepositoryReport<'_>) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| error::io_error(parent, source))?;
    }

    let file = File::create(path).map_err(|source| error::io_error(path, source))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer
        .write_all(b"\n")
        .map_err(|source| error::io_error(path, source))?;
    writer
        .flush()
        .map_err(|source| error::io_error(path, source))?;

    info!("Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::Value;
    use tempfile::tempdir;

    use super::*;
    use crate::{error::TargetError, repository::RepositoryInfo};

    fn sample_batch() -> BatchResult<RepositoryRecord> {
        BatchResult {
            records:   vec![RepositoryRecord {
                identifier: "b/y".to_owned(),
                info:       RepositoryInfo {
                    full_name:   "b/y".to_owned(),
                    description: "No description".to_owned(),
                    stars:       42,
                    forks:       3,
                    watchers:    42,
                    open_issues: 1,
                    language:    "Unknown".to_owned(),
                    created_at:  "2020-01-01T00:00:00Z".to_owned(),
                    updated_at:  "2024-01-01T00:00:00Z".to_owned()
                },
                commits:    Vec::new(),
                release:    None,
                is_active:  false
            }],
            failures:  vec![TargetFailure {
                target: "a/x".to_owned(),
                reason: TargetError::NotFound {
                    url: "https://api.github.com/repos/a/x".to_owned()
                }
            }],
            attempted: 2
        }
    }

    #[test]
    fn report_contains_records_and_failures() {
        let batch = sample_batch();
        let totals = AggregateTotals::from_batch(&batch);
        let now = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("valid instant");
        let directory = tempdir().expect("failed to create temp dir");
        let path = directory.path().join("nested/report.json");

        write_report(&path, &RepositoryReport::new(&batch, &totals, now))
            .expect("write should succeed");

        let contents = fs::read_to_string(&path).expect("should read report");
        assert!(contents.ends_with("}\n"));
        let value: Value = serde_json::from_str(&contents).expect("should parse json");
        assert_eq!(value["generated_at"], "2024-05-01T12:00:00Z");
        assert_eq!(value["totals"]["total_stars"], 42);
        assert_eq!(value["records"][0]["info"]["language"], "Unknown");
        assert_eq!(value["records"][0]["release"], Value::Null);
        assert_eq!(value["failures"][0]["target"], "a/x");
    }

    #[test]
    fn unwritable_path_reports_io_error() {
        let batch = sample_batch();
        let totals = AggregateTotals::from_batch(&batch);
        let directory = tempdir().expect("failed to create temp dir");

        let error = write_report(
            directory.path(),
            &RepositoryReport::new(&batch, &totals, Utc::now())
        )
        .expect_err("a directory is not a file");
        assert!(matches!(error, Error::Io { .. }));
    }
}
