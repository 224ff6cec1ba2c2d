// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Runs an analyzer over an ordered target list.
//!
//! Successes are collected in input order regardless of completion order;
//! failures are logged and recorded next to their identifier. The batch only
//! fails as a whole when no target succeeds.

use std::{fmt, future::Future};

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::error::{Error, TargetError};

/// Analysis of a single target.
pub trait Analyze
{
    /// Record produced for a successful target.
    type Record;

    /// Analyzes `target`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] when the target's primary resource cannot be
    /// fetched or extracted.
    fn analyze(&self, target: &str,)
    -> impl Future<Output = Result<Self::Record, TargetError,>,>;
}

/// A target that was dropped from the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct TargetFailure
{
    /// Identifier as configured.
    pub target: String,
    /// Why the target was dropped.
    #[serde(serialize_with = "serialize_display")]
    pub reason: TargetError,
}

impl fmt::Display for TargetFailure
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{}: {}", self.target, self.reason)
    }
}

fn serialize_display<T: fmt::Display, S: Serializer,>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error,>
{
    serializer.collect_str(value,)
}

/// Outcome of a batch with at least one success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct BatchResult<R,>
{
    /// Successful records in input order.
    pub records:   Vec<R,>,
    /// Failed targets in input order.
    pub failures:  Vec<TargetFailure,>,
    /// Number of targets attempted.
    pub attempted: usize,
}

impl<R,> BatchResult<R,>
{
    /// Number of successful targets.
    pub fn succeeded(&self,) -> usize
    {
        self.records.len()
    }

    /// Returns `true` when at least one target failed.
    pub fn is_partial(&self,) -> bool
    {
        !self.failures.is_empty()
    }
}

/// Drives an [`Analyze`] implementation over a target list.
///
/// # Examples
///
/// ```
/// use tempo_digest::{Analyze, BatchOrchestrator, TargetError};
///
/// struct Echo;
///
/// impl Analyze for Echo {
///     type Record = String;
///
///     async fn analyze(&self, target: &str) -> Result<String, TargetError> {
///         Ok(target.to_uppercase())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), tempo_digest::Error> {
/// let targets = vec!["a/x".to_owned(), "b/y".to_owned()];
/// let batch = BatchOrchestrator::new(&Echo).run(&targets).await?;
/// assert_eq!(batch.records, ["A/X", "B/Y"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug,)]
pub struct BatchOrchestrator<'a, A,>
{
    analyzer:    &'a A,
    concurrency: usize,
    progress:    ProgressBar,
}

impl<'a, A: Analyze,> BatchOrchestrator<'a, A,>
{
    /// Creates a sequential orchestrator without a visible progress bar.
    pub fn new(analyzer: &'a A,) -> Self
    {
        Self {
            analyzer, concurrency: 1, progress: ProgressBar::hidden(),
        }
    }

    /// Analyzes up to `concurrency` targets at the same time. Values below 1
    /// are treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize,) -> Self
    {
        self.concurrency = concurrency.max(1,);
        self
    }

    /// Reports progress through `progress`.
    pub fn with_progress(mut self, progress: ProgressBar,) -> Self
    {
        self.progress = progress;
        self
    }

    /// Runs the analyzer once per target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchFailed`] when no target succeeds, including the
    /// degenerate empty target list.
    pub async fn run(&self, targets: &[String],) -> Result<BatchResult<A::Record,>, Error,>
    {
        self.progress.set_length(targets.len() as u64,);

        let outcomes: Vec<(&String, Result<A::Record, TargetError,>,),> = stream::iter(targets,)
            .map(|target| async move {
                self.progress.set_message(target.clone(),);
                let outcome = self.analyzer.analyze(target,).await;
                self.progress.inc(1,);
                (target, outcome,)
            },)
            .buffered(self.concurrency,)
            .collect()
            .await;

        self.progress.finish_and_clear();

        let mut records = Vec::with_capacity(outcomes.len(),);
        let mut failures = Vec::new();

        for (target, outcome,) in outcomes {
            match outcome {
                Ok(record,) => records.push(record,),
                Err(reason,) => {
                    warn!("{target}: skipped: {reason}");
                    failures.push(TargetFailure {
                        target: target.clone(), reason,
                    },);
                }
            }
        }

        if records.is_empty() {
            warn!("All {} targets failed", targets.len());
            return Err(Error::BatchFailed {
                attempted: targets.len(), failures,
            },);
        }

        info!("{} of {} targets succeeded", records.len(), targets.len());

        Ok(BatchResult {
            records,
            failures,
            attempted: targets.len(),
        },)
    }
}

/// Progress bar drawn on stderr while a batch runs.
pub fn batch_progress_bar(len: usize,) -> ProgressBar
{
    let bar = ProgressBar::new(len as u64,);
    if let Ok(style,) =
        ProgressStyle::default_bar().template("{spinner:.yellow} [{elapsed_precise}] {pos}/{len} {msg}",)
    {
        bar.set_style(style,);
    }
    bar
}
