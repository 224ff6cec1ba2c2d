// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Batch-level totals over successful repository records.

use serde::Serialize;

use crate::{batch::BatchResult, repository::RepositoryRecord};

/// Numeric headline fields of a repository record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash,)]
pub enum MetricField
{
    /// Stargazer count.
    Stars,
    /// Fork count.
    Forks,
    /// Watcher count.
    Watchers,
    /// Open issue count.
    OpenIssues,
}

impl MetricField
{
    /// Reads the field from `record`.
    pub fn read(self, record: &RepositoryRecord,) -> i64
    {
        match self {
            Self::Stars => record.info.stars,
            Self::Forks => record.info.forks,
            Self::Watchers => record.info.watchers,
            Self::OpenIssues => record.info.open_issues,
        }
    }
}

/// Sums `field` across `records`.
pub fn sum_field(records: &[RepositoryRecord], field: MetricField,) -> i64
{
    records.iter().map(|record| field.read(record,),).sum()
}

/// Records flagged as recently active, in their original order.
pub fn active_records(records: &[RepositoryRecord],) -> Vec<&RepositoryRecord,>
{
    records.iter().filter(|record| record.is_active,).collect()
}

/// Totals rendered in the notification overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize,)]
pub struct AggregateTotals
{
    /// Successful records.
    pub processed:   usize,
    /// Stars across all records.
    pub total_stars: i64,
    /// Forks across all records.
    pub total_forks: i64,
    /// Records flagged as recently active.
    pub active:      usize,
}

impl AggregateTotals
{
    /// Computes totals over the successful records of `batch`.
    pub fn from_batch(batch: &BatchResult<RepositoryRecord,>,) -> Self
    {
        Self {
            processed:   batch.records.len(),
            total_stars: sum_field(&batch.records, MetricField::Stars,),
            total_forks: sum_field(&batch.records, MetricField::Forks,),
            active:      batch.records.iter().filter(|record| record.is_active,).count(),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::repository::RepositoryInfo;

    fn record(identifier: &str, stars: i64, forks: i64, is_active: bool,) -> RepositoryRecord
    {
        RepositoryRecord {
            identifier: identifier.to_owned(),
            info: RepositoryInfo {
                full_name:   identifier.to_owned(),
                description: "No description".to_owned(),
                stars,
                forks,
                watchers:    stars,
                open_issues: 1,
                language:    "Rust".to_owned(),
                created_at:  "2020-01-01T00:00:00Z".to_owned(),
                updated_at:  "2024-01-01T00:00:00Z".to_owned(),
            },
            commits: Vec::new(),
            release: None,
            is_active,
        }
    }

    fn batch(records: Vec<RepositoryRecord,>,) -> BatchResult<RepositoryRecord,>
    {
        let attempted = records.len();
        BatchResult {
            records, failures: Vec::new(), attempted,
        }
    }

    #[test]
    fn totals_sum_headline_fields()
    {
        let batch = batch(vec![
            record("a/x", 10, 2, true,),
            record("b/y", 5, 1, false,),
            record("c/z", 1, 0, true,),
        ],);

        let totals = AggregateTotals::from_batch(&batch,);
        assert_eq!(
            totals,
            AggregateTotals {
                processed: 3, total_stars: 16, total_forks: 3, active: 2,
            }
        );
        assert_eq!(sum_field(&batch.records, MetricField::OpenIssues,), 3);
        assert_eq!(sum_field(&batch.records, MetricField::Watchers,), 16);
    }

    #[test]
    fn active_subset_preserves_order()
    {
        let records = vec![
            record("c/z", 1, 0, true,),
            record("b/y", 5, 1, false,),
            record("a/x", 10, 2, true,),
        ];

        let active: Vec<&str,> =
            active_records(&records,).iter().map(|record| record.identifier.as_str(),).collect();
        assert_eq!(active, ["c/z", "a/x"]);
    }

    #[test]
    fn no_active_records_yields_empty_subset()
    {
        let records = vec![record("a/x", 1, 1, false,)];
        assert!(active_records(&records,).is_empty());
        assert_eq!(AggregateTotals::from_batch(&batch(records,),).active, 0);
    }
}
