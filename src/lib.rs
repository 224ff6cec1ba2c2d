// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Polls repository and weather APIs and turns the responses into short
//! line-oriented digests.
//!
//! The library is organised as a downward pipeline: [`Fetch`] retrieves a
//! JSON document, [`extract`] pulls typed facts out of it, the metrics helpers
//! derive activity and relative times, an [`Analyze`] implementation builds
//! one record per target, [`BatchOrchestrator`] runs it over a target list
//! tolerating partial failure, [`AggregateTotals`] reduces the batch, and the
//! `render_*` functions produce the notification lines for a [`LineSink`].

mod aggregate;
mod batch;
mod config;
mod error;
mod extract;
mod fetch;
mod metrics;
mod notify;
mod report;
mod repository;
mod weather;

pub use aggregate::{AggregateTotals, MetricField, active_records, sum_field};
pub use batch::{Analyze, BatchOrchestrator, BatchResult, TargetFailure, batch_progress_bar};
pub use config::{
    ConfigFile, DEFAULT_API_BASE, DEFAULT_CITY, DEFAULT_COMMIT_COUNT, DEFAULT_CONCURRENCY,
    DEFAULT_LANG, DEFAULT_TARGETS, DEFAULT_TIMEOUT_SECS, MAX_COMMIT_COUNT, RepositoryConfig,
    RepositoryOverrides, RepositorySection, WeatherConfig, WeatherOverrides, WeatherSection,
    load_config, parse_config, parse_target_list,
};
pub use error::{Error, ExtractionError, FetchError, TargetError, io_error};
pub use extract::{
    ExtractedFacts, FieldKind, FieldSpec, Scalar, extract, extract_list, truncate_chars,
};
pub use fetch::{
    DEFAULT_TIMEOUT, Fetch, FetchOutcome, FetchRequest, HttpFetcher, RawResponse, StaticFetcher,
    USER_AGENT, parse_body,
};
pub use metrics::{
    ACTIVITY_WINDOW_HOURS, TEMPERATURE_TIPS, ThresholdTable, UV_TIPS, is_recently_active,
    parse_timestamp, relative_time,
};
pub use notify::{
    COMMIT_MESSAGE_CAP, DEFAULT_PREFIX, LineSink, SEPARATOR, group_thousands, render_failure,
    render_repository_digest, render_weather,
};
pub use report::{RepositoryReport, write_report};
pub use repository::{
    CommitEntry, ReleaseInfo, RepositoryAnalyzer, RepositoryInfo, RepositoryRecord,
    split_identifier,
};
pub use weather::{WEATHER_API_BASE, WeatherAnalyzer, WeatherRecord};
