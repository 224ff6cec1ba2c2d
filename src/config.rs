// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Run configuration for the repository and weather pipelines.
//!
//! Values come from three layers, highest priority first: command-line flags
//! (which clap also fills from environment variables), an optional YAML file,
//! and built-in defaults. The resolved [`RepositoryConfig`] and
//! [`WeatherConfig`] are validated once and then passed explicitly into the
//! pipeline; nothing below this module reads the environment.
//!
//! ```yaml
//! repositories:
//!   targets:
//!     - rust-lang/rust
//!     - tokio-rs/tokio
//!   commit_count: 3
//!   concurrency: 2
//! weather:
//!   city: Beijing
//!   lang: zh
//! ```

use std::{fs, path::Path, sync::LazyLock, time::Duration};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{self, Error};

/// Targets polled when nothing else is configured.
pub const DEFAULT_TARGETS: &str = "facebook/react,vuejs/vue,sveltejs/svelte";
/// Base URL of the repository API.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
/// Recent commits fetched per repository.
pub const DEFAULT_COMMIT_COUNT: usize = 3;
/// Upper bound accepted by the commits endpoint for a single page.
pub const MAX_COMMIT_COUNT: usize = 100;
/// Targets analyzed at the same time.
pub const DEFAULT_CONCURRENCY: usize = 1;
/// Per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// City used by the weather pipeline.
pub const DEFAULT_CITY: &str = "Beijing";
/// Language requested from the weather API.
pub const DEFAULT_LANG: &str = "en";

static LANG_PATTERN: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2,3}(-[a-z]{2,4})?$",).expect("language pattern is valid",)
},);

/// Root YAML document.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile
{
    /// Repository pipeline section.
    #[serde(default)]
    pub repositories: RepositorySection,

    /// Weather pipeline section.
    #[serde(default)]
    pub weather: WeatherSection,
}

/// Repository settings as written in YAML. Every value is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(deny_unknown_fields)]
pub struct RepositorySection
{
    /// Ordered `owner/name` identifiers.
    #[serde(default, alias = "repos")]
    pub targets: Option<Vec<String,>,>,

    /// Recent commits fetched per repository.
    #[serde(default, alias = "commits")]
    pub commit_count: Option<usize,>,

    /// Base URL of the repository API.
    #[serde(default)]
    pub api_base: Option<String,>,

    /// Targets analyzed at the same time.
    #[serde(default)]
    pub concurrency: Option<usize,>,

    /// Per-request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64,>,
}

/// Weather settings as written in YAML.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(deny_unknown_fields)]
pub struct WeatherSection
{
    /// City name passed to the weather API.
    #[serde(default)]
    pub city: Option<String,>,

    /// Two-letter language code.
    #[serde(default)]
    pub lang: Option<String,>,

    /// Per-request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64,>,
}

/// Loads a YAML configuration file.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read and [`Error::Parse`]
/// when it is not a valid document.
pub fn load_config(path: &Path,) -> Result<ConfigFile, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
    parse_config(&contents,)
}

/// Parses a YAML configuration document.
///
/// An empty document yields the defaults.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the YAML cannot be decoded.
pub fn parse_config(contents: &str,) -> Result<ConfigFile, Error,>
{
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default(),);
    }

    Ok(serde_yaml::from_str(contents,)?,)
}

/// Splits a comma-delimited target list.
///
/// Entries are trimmed and blank entries dropped; order and duplicates are
/// kept.
///
/// # Examples
///
/// ```
/// use tempo_digest::parse_target_list;
///
/// assert_eq!(parse_target_list(" a/x, b/y,,a/x ",), ["a/x", "b/y", "a/x"]);
/// ```
pub fn parse_target_list(raw: &str,) -> Vec<String,>
{
    raw.split(',',)
        .map(str::trim,)
        .filter(|entry| !entry.is_empty(),)
        .map(str::to_owned,)
        .collect()
}

/// Values supplied on the command line or through environment variables.
#[derive(Debug, Default, Clone, PartialEq, Eq,)]
pub struct RepositoryOverrides
{
    /// Comma-delimited target list.
    pub targets:      Option<String,>,
    /// Authentication token.
    pub token:        Option<String,>,
    /// Recent commits per repository.
    pub commit_count: Option<usize,>,
    /// Base URL of the repository API.
    pub api_base:     Option<String,>,
    /// Targets analyzed at the same time.
    pub concurrency:  Option<usize,>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64,>,
}

/// Validated configuration of the repository pipeline.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct RepositoryConfig
{
    /// Ordered identifiers, duplicates allowed.
    pub targets:      Vec<String,>,
    /// Token appended as an `Authorization` header when present.
    pub token:        Option<String,>,
    /// Recent commits fetched per repository.
    pub commit_count: usize,
    /// Base URL without a trailing slash.
    pub api_base:     String,
    /// Targets analyzed at the same time.
    pub concurrency:  usize,
    /// Per-request timeout.
    pub timeout:      Duration,
}

impl RepositoryConfig
{
    /// Merges overrides, the file section, and defaults, then validates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the target list is empty, the commit
    /// count is outside `1..=100`, the concurrency or timeout is zero, or the
    /// API base is not an HTTP(S) URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use tempo_digest::{RepositoryConfig, RepositoryOverrides, RepositorySection};
    ///
    /// let overrides = RepositoryOverrides {
    ///     targets: Some("a/x,b/y".to_owned(),), ..Default::default()
    /// };
    /// let config = RepositoryConfig::resolve(&RepositorySection::default(), overrides,)?;
    /// assert_eq!(config.targets, ["a/x", "b/y"]);
    /// assert_eq!(config.commit_count, 3);
    /// # Ok::<(), tempo_digest::Error>(())
    /// ```
    pub fn resolve(
        section: &RepositorySection,
        overrides: RepositoryOverrides,
    ) -> Result<Self, Error,>
    {
        let targets = match (overrides.targets, &section.targets,) {
            (Some(raw,), _,) => parse_target_list(&raw,),
            (None, Some(list,),) => list
                .iter()
                .map(|entry| entry.trim(),)
                .filter(|entry| !entry.is_empty(),)
                .map(str::to_owned,)
                .collect(),
            (None, None,) => parse_target_list(DEFAULT_TARGETS,),
        };

        if targets.is_empty() {
            return Err(Error::validation("target list must contain at least one owner/name",),);
        }

        let token = overrides
            .token
            .map(|token| token.trim().to_owned(),)
            .filter(|token| !token.is_empty(),);

        let commit_count =
            overrides.commit_count.or(section.commit_count,).unwrap_or(DEFAULT_COMMIT_COUNT,);
        if commit_count == 0 || commit_count > MAX_COMMIT_COUNT {
            return Err(Error::validation(format!(
                "commit count must be between 1 and {MAX_COMMIT_COUNT}, got {commit_count}"
            ),),);
        }

        let api_base = overrides
            .api_base
            .or_else(|| section.api_base.clone(),)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_owned(),);
        let api_base = validate_base_url(&api_base,)?;

        let concurrency =
            overrides.concurrency.or(section.concurrency,).unwrap_or(DEFAULT_CONCURRENCY,);
        if concurrency == 0 {
            return Err(Error::validation("concurrency must be at least 1",),);
        }

        let timeout = resolve_timeout(overrides.timeout_secs.or(section.timeout_secs,),)?;

        Ok(Self {
            targets,
            token,
            commit_count,
            api_base,
            concurrency,
            timeout,
        },)
    }
}

/// Values supplied on the command line for the weather pipeline.
#[derive(Debug, Default, Clone, PartialEq, Eq,)]
pub struct WeatherOverrides
{
    /// City name.
    pub city:         Option<String,>,
    /// Language code.
    pub lang:         Option<String,>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64,>,
}

/// Validated configuration of the weather pipeline.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct WeatherConfig
{
    /// City name, trimmed.
    pub city:    String,
    /// Lowercase language code.
    pub lang:    String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl WeatherConfig
{
    /// Merges overrides, the file section, and defaults, then validates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the city is blank, the language is
    /// not a short lowercase code, or the timeout is zero.
    pub fn resolve(section: &WeatherSection, overrides: WeatherOverrides,) -> Result<Self, Error,>
    {
        let city = overrides
            .city
            .or_else(|| section.city.clone(),)
            .unwrap_or_else(|| DEFAULT_CITY.to_owned(),);
        let city = city.trim();
        if city.is_empty() {
            return Err(Error::validation("city must not be blank",),);
        }

        let lang = overrides
            .lang
            .or_else(|| section.lang.clone(),)
            .unwrap_or_else(|| DEFAULT_LANG.to_owned(),)
            .trim()
            .to_ascii_lowercase();
        if !LANG_PATTERN.is_match(&lang,) {
            return Err(Error::validation(format!("unsupported language code '{lang}'"),),);
        }

        let timeout = resolve_timeout(overrides.timeout_secs.or(section.timeout_secs,),)?;

        Ok(Self {
            city: city.to_owned(), lang, timeout,
        },)
    }
}

fn resolve_timeout(seconds: Option<u64,>,) -> Result<Duration, Error,>
{
    match seconds.unwrap_or(DEFAULT_TIMEOUT_SECS,) {
        0 => Err(Error::validation("timeout must be at least 1 second",),),
        value => Ok(Duration::from_secs(value,),),
    }
}

fn validate_base_url(raw: &str,) -> Result<String, Error,>
{
    let trimmed = raw.trim().trim_end_matches('/',);
    if !(trimmed.starts_with("https://",) || trimmed.starts_with("http://",)) {
        return Err(Error::validation(format!("api base '{raw}' must be an http(s) URL"),),);
    }

    Ok(trimmed.to_owned(),)
}
