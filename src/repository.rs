// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Per-repository analysis: metadata, recent commits, latest release.
//!
//! The metadata resource is primary: if it cannot be fetched or extracted the
//! repository is dropped from the batch. Commits and the latest release are
//! enrichments and degrade to "none" on any failure.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    batch::Analyze,
    config::RepositoryConfig,
    error::{ExtractionError, TargetError},
    extract::{ExtractedFacts, FieldSpec, extract, extract_list},
    fetch::{Fetch, FetchOutcome, FetchRequest, USER_AGENT},
    metrics::{is_recently_active, parse_timestamp},
};

const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const TEXT_CAP: usize = 200;
const SHORT_SHA_LEN: usize = 7;

static IDENTIFIER_PATTERN: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)$",).expect("identifier pattern is valid",)
},);

/// Repository metadata from the primary resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct RepositoryInfo
{
    /// `owner/name` as reported by the API.
    pub full_name:   String,
    /// Description, capped at 200 characters.
    pub description: String,
    /// Stargazer count.
    pub stars:       i64,
    /// Fork count.
    pub forks:       i64,
    /// Watcher count.
    pub watchers:    i64,
    /// Open issue count.
    pub open_issues: i64,
    /// Primary language.
    pub language:    String,
    /// Creation timestamp.
    pub created_at:  String,
    /// Last update timestamp.
    pub updated_at:  String,
}

impl RepositoryInfo
{
    /// Field set of the repository resource.
    pub fn fields() -> Vec<FieldSpec,>
    {
        vec![
            FieldSpec::text("full_name", "full_name",),
            FieldSpec::text("description", "description",).or("No description",).truncate(TEXT_CAP,),
            FieldSpec::integer("stars", "stargazers_count",),
            FieldSpec::integer("forks", "forks_count",),
            FieldSpec::integer("watchers", "watchers_count",),
            FieldSpec::integer("open_issues", "open_issues_count",),
            FieldSpec::text("language", "language",).or("Unknown",),
            FieldSpec::timestamp("created_at", "created_at",),
            FieldSpec::timestamp("updated_at", "updated_at",),
        ]
    }

    /// Builds the record from facts extracted with [`RepositoryInfo::fields`].
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when a field is missing or mistyped.
    pub fn from_facts(facts: &ExtractedFacts,) -> Result<Self, ExtractionError,>
    {
        Ok(Self {
            full_name:   facts.text("full_name",)?.to_owned(),
            description: facts.text("description",)?.to_owned(),
            stars:       facts.integer("stars",)?,
            forks:       facts.integer("forks",)?,
            watchers:    facts.integer("watchers",)?,
            open_issues: facts.integer("open_issues",)?,
            language:    facts.text("language",)?.to_owned(),
            created_at:  facts.timestamp("created_at",)?.to_owned(),
            updated_at:  facts.timestamp("updated_at",)?.to_owned(),
        },)
    }
}

/// One entry of the recent-commits list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct CommitEntry
{
    /// Abbreviated SHA.
    pub sha:     String,
    /// First line of the commit message.
    pub message: String,
    /// Author name.
    pub author:  String,
    /// Author timestamp.
    pub date:    String,
}

impl CommitEntry
{
    /// Field set of one element of the commits resource.
    pub fn fields() -> Vec<FieldSpec,>
    {
        vec![
            FieldSpec::text("sha", "sha",).truncate(SHORT_SHA_LEN,),
            FieldSpec::text("message", "commit.message",).first_line(),
            FieldSpec::text("author", "commit.author.name",),
            FieldSpec::timestamp("date", "commit.author.date",),
        ]
    }

    /// Builds the entry from facts extracted with [`CommitEntry::fields`].
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when a field is missing or mistyped.
    pub fn from_facts(facts: &ExtractedFacts,) -> Result<Self, ExtractionError,>
    {
        Ok(Self {
            sha:     facts.text("sha",)?.to_owned(),
            message: facts.text("message",)?.to_owned(),
            author:  facts.text("author",)?.to_owned(),
            date:    facts.timestamp("date",)?.to_owned(),
        },)
    }
}

/// Latest tagged release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct ReleaseInfo
{
    /// Tag name.
    pub tag_name:     String,
    /// Release title, falling back to the tag.
    pub name:         String,
    /// Publication timestamp.
    pub published_at: String,
    /// Release notes, capped at 200 characters.
    pub body:         String,
}

impl ReleaseInfo
{
    /// Field set of the latest-release resource.
    pub fn fields() -> Vec<FieldSpec,>
    {
        vec![
            FieldSpec::text("tag_name", "tag_name",),
            FieldSpec::text("name", "name",).optional(),
            FieldSpec::timestamp("published_at", "published_at",),
            FieldSpec::text("body", "body",).or("",).truncate(TEXT_CAP,),
        ]
    }

    /// Builds the release from facts extracted with [`ReleaseInfo::fields`].
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when a field is missing or mistyped.
    pub fn from_facts(facts: &ExtractedFacts,) -> Result<Self, ExtractionError,>
    {
        let tag_name = facts.text("tag_name",)?.to_owned();
        let name = facts
            .optional_text("name",)
            .filter(|name| !name.trim().is_empty(),)
            .map_or_else(|| tag_name.clone(), str::to_owned,);

        Ok(Self {
            tag_name,
            name,
            published_at: facts.timestamp("published_at",)?.to_owned(),
            body: facts.text("body",)?.to_owned(),
        },)
    }
}

/// Aggregated result for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct RepositoryRecord
{
    /// Identifier as configured.
    pub identifier: String,
    /// Primary metadata.
    pub info:       RepositoryInfo,
    /// Most recent commits, newest first as served by the API.
    pub commits:    Vec<CommitEntry,>,
    /// Latest release, if any.
    pub release:    Option<ReleaseInfo,>,
    /// Whether the newest commit is less than 24 hours old.
    pub is_active:  bool,
}

impl RepositoryRecord
{
    /// Newest commit, if any.
    pub fn latest_commit(&self,) -> Option<&CommitEntry,>
    {
        self.commits.first()
    }
}

/// Splits an `owner/name` identifier.
///
/// # Errors
///
/// Returns [`TargetError::InvalidIdentifier`] when the identifier does not
/// contain exactly one slash or uses characters outside `[A-Za-z0-9_.-]`.
pub fn split_identifier(identifier: &str,) -> Result<(&str, &str,), TargetError,>
{
    let captures = IDENTIFIER_PATTERN.captures(identifier,).ok_or_else(|| {
        TargetError::InvalidIdentifier {
            identifier: identifier.to_owned(),
            reason:     "expected owner/name",
        }
    },)?;

    match (captures.get(1,), captures.get(2,),) {
        (Some(owner,), Some(name,),) => Ok((owner.as_str(), name.as_str(),),),
        _ => Err(TargetError::InvalidIdentifier {
            identifier: identifier.to_owned(),
            reason:     "expected owner/name",
        },),
    }
}

/// [`Analyze`] implementation for repositories.
#[derive(Debug,)]
pub struct RepositoryAnalyzer<F,>
{
    fetcher:      F,
    api_base:     String,
    token:        Option<String,>,
    commit_count: usize,
    now:          DateTime<Utc,>,
}

impl<F: Fetch,> RepositoryAnalyzer<F,>
{
    /// Creates an analyzer. `now` is the instant activity is measured against.
    pub fn new(fetcher: F, config: &RepositoryConfig, now: DateTime<Utc,>,) -> Self
    {
        Self {
            fetcher,
            api_base: config.api_base.clone(),
            token: config.token.clone(),
            commit_count: config.commit_count,
            now,
        }
    }

    /// Underlying fetcher.
    pub fn fetcher(&self,) -> &F
    {
        &self.fetcher
    }

    /// URL of the repository metadata resource.
    pub fn info_url(&self, owner: &str, name: &str,) -> String
    {
        format!("{}/repos/{owner}/{name}", self.api_base)
    }

    /// URL of the recent-commits resource.
    pub fn commits_url(&self, owner: &str, name: &str,) -> String
    {
        format!("{}/repos/{owner}/{name}/commits?per_page={}", self.api_base, self.commit_count)
    }

    /// URL of the latest-release resource.
    pub fn release_url(&self, owner: &str, name: &str,) -> String
    {
        format!("{}/repos/{owner}/{name}/releases/latest", self.api_base)
    }

    fn request(&self, url: String,) -> FetchRequest
    {
        let request = FetchRequest::new(url,)
            .header("Accept", ACCEPT_HEADER,)
            .header("User-Agent", USER_AGENT,);
        match &self.token {
            Some(token,) => request.header("Authorization", format!("token {token}"),),
            None => request,
        }
    }

    async fn fetch_info(&self, owner: &str, name: &str,) -> Result<RepositoryInfo, TargetError,>
    {
        let url = self.info_url(owner, name,);
        match self.fetcher.fetch(&self.request(url.clone(),),).await? {
            FetchOutcome::Found(raw,) => Ok(RepositoryInfo::from_facts(&extract(
                &raw,
                &RepositoryInfo::fields(),
            )?,)?,),
            FetchOutcome::NotFound => Err(TargetError::NotFound {
                url,
            },),
        }
    }

    async fn fetch_commits(&self, identifier: &str, owner: &str, name: &str,) -> Vec<CommitEntry,>
    {
        let request = self.request(self.commits_url(owner, name,),);
        let raw = match self.fetcher.fetch(&request,).await {
            Ok(FetchOutcome::Found(raw,),) => raw,
            Ok(FetchOutcome::NotFound,) => {
                warn!("{identifier}: commits resource not found; continuing without commits");
                return Vec::new();
            }
            Err(error,) => {
                warn!("{identifier}: failed to fetch commits: {error}; continuing without commits");
                return Vec::new();
            }
        };

        let entries = extract_list(&raw, &CommitEntry::fields(), self.commit_count,)
            .and_then(|facts| facts.iter().map(CommitEntry::from_facts,).collect::<Result<Vec<_,>, _,>>(),);

        match entries {
            Ok(entries,) => {
                debug!("{identifier}: extracted {} commits", entries.len());
                entries
            }
            Err(error,) => {
                warn!("{identifier}: malformed commits payload: {error}; continuing without commits");
                Vec::new()
            }
        }
    }

    fn activity_flag(&self, identifier: &str, commits: &[CommitEntry],) -> bool
    {
        let latest = commits.first().map(|commit| commit.date.as_str(),);
        if let Some(date,) = latest.filter(|date| parse_timestamp(date,).is_none(),) {
            warn!("{identifier}: unparsable commit timestamp `{date}`; treating as inactive");
            return false;
        }
        is_recently_active(latest, self.now,)
    }

    async fn fetch_release(&self, identifier: &str, owner: &str, name: &str,) -> Option<ReleaseInfo,>
    {
        let request = self.request(self.release_url(owner, name,),);
        let raw = match self.fetcher.fetch(&request,).await {
            Ok(FetchOutcome::Found(raw,),) => raw,
            Ok(FetchOutcome::NotFound,) => {
                debug!("{identifier}: no published release");
                return None;
            }
            Err(error,) => {
                warn!("{identifier}: failed to fetch latest release: {error}");
                return None;
            }
        };

        match extract(&raw, &ReleaseInfo::fields(),).and_then(|facts| ReleaseInfo::from_facts(&facts,),) {
            Ok(release,) => {
                debug!("{identifier}: latest release {}", release.tag_name);
                Some(release,)
            }
            Err(error,) => {
                warn!("{identifier}: malformed release payload: {error}");
                None
            }
        }
    }
}

impl<F: Fetch,> Analyze for RepositoryAnalyzer<F,>
{
    type Record = RepositoryRecord;

    async fn analyze(&self, identifier: &str,) -> Result<RepositoryRecord, TargetError,>
    {
        let (owner, name,) = split_identifier(identifier,)?;
        debug!("Analyzing {identifier}");

        let info = self.fetch_info(owner, name,).await?;
        let commits = self.fetch_commits(identifier, owner, name,).await;
        let release = self.fetch_release(identifier, owner, name,).await;
        let is_active = self.activity_flag(identifier, &commits,);

        info!(
            "{identifier}: {} stars, {} commits, release {}, active {}",
            info.stars,
            commits.len(),
            release.as_ref().map_or("none", |release| release.tag_name.as_str(),),
            is_active
        );

        Ok(RepositoryRecord {
            identifier: identifier.to_owned(),
            info,
            commits,
            release,
            is_active,
        },)
    }
}

#[cfg(test)]
mod tests
{
    use chrono::{TimeDelta, TimeZone};
    use serde_json::json;

    use super::*;
    use crate::{
        config::{RepositoryOverrides, RepositorySection},
        error::FetchError,
        fetch::StaticFetcher,
    };

    fn now() -> DateTime<Utc,>
    {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0,).unwrap()
    }

    fn config(token: Option<&str,>,) -> RepositoryConfig
    {
        let overrides = RepositoryOverrides {
            targets: Some("a/x".to_owned(),),
            token: token.map(str::to_owned,),
            ..RepositoryOverrides::default()
        };
        RepositoryConfig::resolve(&RepositorySection::default(), overrides,).expect("valid config",)
    }

    fn info_body() -> serde_json::Value
    {
        json!({
            "full_name": "a/x",
            "description": null,
            "stargazers_count": 1200,
            "forks_count": 30,
            "watchers_count": 1200,
            "open_issues_count": 4,
            "language": "Rust",
            "created_at": "2020-01-01T00:00:00Z",
            "updated_at": "2024-05-01T08:00:00Z"
        })
    }

    fn commit(sha: &str, message: &str, date: &str,) -> serde_json::Value
    {
        json!({
            "sha": sha,
            "commit": {"message": message, "author": {"name": "Ada", "date": date}}
        })
    }

    const INFO: &str = "https://api.github.com/repos/a/x";
    const COMMITS: &str = "https://api.github.com/repos/a/x/commits?per_page=3";
    const RELEASE: &str = "https://api.github.com/repos/a/x/releases/latest";

    #[test]
    fn identifiers_must_be_owner_name_pairs()
    {
        assert_eq!(split_identifier("rust-lang/rust.vim"), Ok(("rust-lang", "rust.vim")));
        for bad in ["rust", "a/b/c", "/x", "a/", "a b/c"] {
            assert!(split_identifier(bad,).is_err(), "{bad} should be rejected");
        }
    }

    #[tokio::test]
    async fn full_record_is_assembled()
    {
        let recent = (now() - TimeDelta::hours(2,)).format("%Y-%m-%dT%H:%M:%SZ",).to_string();
        let fetcher = StaticFetcher::new()
            .with_json(INFO, info_body(),)
            .with_json(
                COMMITS,
                json!([
                    commit("0123456789", "Fix parser\n\nDetails", &recent),
                    commit("abcdef0123", "Bump deps", "2024-04-01T00:00:00Z"),
                ]),
            )
            .with_json(
                RELEASE,
                json!({"tag_name": "v1.2.0", "name": null, "published_at": "2024-04-29T12:00:00Z", "body": null}),
            );
        let analyzer = RepositoryAnalyzer::new(fetcher, &config(None,), now(),);

        let record = analyzer.analyze("a/x",).await.expect("analysis should succeed",);
        assert_eq!(record.info.description, "No description");
        assert_eq!(record.info.stars, 1200);
        assert_eq!(record.commits.len(), 2);
        assert_eq!(record.commits[0].sha, "0123456");
        assert_eq!(record.commits[0].message, "Fix parser");
        let release = record.release.as_ref().expect("release present",);
        assert_eq!(release.name, "v1.2.0");
        assert_eq!(release.body, "");
        assert!(record.is_active);
    }

    #[tokio::test]
    async fn primary_failure_fails_target()
    {
        let fetcher = StaticFetcher::new().with_failure(
            INFO,
            FetchError::Status {
                url: INFO.to_owned(), status: 502,
            },
        );
        let analyzer = RepositoryAnalyzer::new(fetcher, &config(None,), now(),);

        let error = analyzer.analyze("a/x",).await.unwrap_err();
        assert!(matches!(error, TargetError::Fetch { .. }));
        assert_eq!(analyzer.fetcher().requests().len(), 1, "secondary resources must not be fetched");
    }

    #[tokio::test]
    async fn primary_not_found_fails_target()
    {
        let analyzer =
            RepositoryAnalyzer::new(StaticFetcher::new().with_not_found(INFO,), &config(None,), now(),);

        let error = analyzer.analyze("a/x",).await.unwrap_err();
        assert_eq!(
            error,
            TargetError::NotFound {
                url: INFO.to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn malformed_primary_fails_target()
    {
        let mut body = info_body();
        body["stargazers_count"] = json!("lots");
        let analyzer =
            RepositoryAnalyzer::new(StaticFetcher::new().with_json(INFO, body,), &config(None,), now(),);

        let error = analyzer.analyze("a/x",).await.unwrap_err();
        assert!(matches!(error, TargetError::Extract { .. }));
    }

    #[tokio::test]
    async fn secondary_failures_degrade_gracefully()
    {
        let fetcher = StaticFetcher::new()
            .with_json(INFO, info_body(),)
            .with_failure(
                COMMITS,
                FetchError::Transport {
                    url: COMMITS.to_owned(), message: "timed out".to_owned(),
                },
            )
            .with_failure(
                RELEASE,
                FetchError::Status {
                    url: RELEASE.to_owned(), status: 500,
                },
            );
        let analyzer = RepositoryAnalyzer::new(fetcher, &config(None,), now(),);

        let record = analyzer.analyze("a/x",).await.expect("analysis should succeed",);
        assert!(record.commits.is_empty());
        assert!(record.release.is_none());
        assert!(!record.is_active);
    }

    #[tokio::test]
    async fn missing_release_is_not_a_failure()
    {
        let fetcher = StaticFetcher::new()
            .with_json(INFO, info_body(),)
            .with_json(COMMITS, json!([]),)
            .with_not_found(RELEASE,);
        let analyzer = RepositoryAnalyzer::new(fetcher, &config(None,), now(),);

        let record = analyzer.analyze("a/x",).await.expect("analysis should succeed",);
        assert!(record.release.is_none());
        assert!(record.latest_commit().is_none());
    }

    #[tokio::test]
    async fn malformed_commit_entry_empties_list()
    {
        let fetcher = StaticFetcher::new()
            .with_json(INFO, info_body(),)
            .with_json(COMMITS, json!([commit("abc", "ok", "2024-05-01T11:00:00Z"), {"sha": "def"}]),)
            .with_not_found(RELEASE,);
        let analyzer = RepositoryAnalyzer::new(fetcher, &config(None,), now(),);

        let record = analyzer.analyze("a/x",).await.expect("analysis should succeed",);
        assert!(record.commits.is_empty());
        assert!(!record.is_active);
    }

    #[tokio::test]
    async fn unparsable_commit_date_marks_repository_inactive()
    {
        let fetcher = StaticFetcher::new()
            .with_json(INFO, info_body(),)
            .with_json(COMMITS, json!([commit("abc1234", "Tidy up", "garbage-date")]),)
            .with_not_found(RELEASE,);
        let analyzer = RepositoryAnalyzer::new(fetcher, &config(None,), now(),);

        let record = analyzer.analyze("a/x",).await.expect("analysis should succeed",);
        assert_eq!(record.commits.len(), 1);
        assert_eq!(record.commits[0].date, "garbage-date");
        assert!(!record.is_active);
        assert!(!analyzer.activity_flag("a/x", &record.commits,));
    }

    #[tokio::test]
    async fn token_is_sent_as_authorization_header()
    {
        let fetcher = StaticFetcher::new().with_not_found(INFO,);
        let analyzer = RepositoryAnalyzer::new(fetcher, &config(Some("secret",),), now(),);
        let _ = analyzer.analyze("a/x",).await;

        let requests = analyzer.fetcher().requests();
        assert_eq!(requests[0].header_value("Authorization"), Some("token secret"));
        assert_eq!(requests[0].header_value("Accept"), Some(ACCEPT_HEADER));
        assert_eq!(requests[0].header_value("user-agent"), Some(USER_AGENT));
    }

    #[tokio::test]
    async fn invalid_identifier_skips_network()
    {
        let analyzer = RepositoryAnalyzer::new(StaticFetcher::new(), &config(None,), now(),);

        let error = analyzer.analyze("not-a-repo",).await.unwrap_err();
        assert!(matches!(error, TargetError::InvalidIdentifier { .. }));
        assert!(analyzer.fetcher().requests().is_empty());
    }
}
