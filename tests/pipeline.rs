// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use tempo_digest::{
    AggregateTotals, BatchOrchestrator, FetchError, LineSink, RepositoryAnalyzer,
    RepositoryConfig, StaticFetcher, TargetError, render_repository_digest,
};

fn config() -> RepositoryConfig
{
    RepositoryConfig {
        targets:      vec!["a/x".to_owned(), "b/y".to_owned()],
        token:        Some("secret".to_owned(),),
        commit_count: 3,
        api_base:     "https://api.github.com".to_owned(),
        concurrency:  2,
        timeout:      Duration::from_secs(10,),
    }
}

fn fetcher() -> StaticFetcher
{
    StaticFetcher::new()
        .with_failure(
            "https://api.github.com/repos/a/x",
            FetchError::Transport {
                url:     "https://api.github.com/repos/a/x".to_owned(),
                message: "connection reset".to_owned(),
            },
        )
        .with_json(
            "https://api.github.com/repos/b/y",
            json!({
                "full_name": "b/y",
                "description": "Second repository",
                "stargazers_count": 2048,
                "forks_count": 64,
                "watchers_count": 2048,
                "open_issues_count": 5,
                "language": null,
                "created_at": "2019-03-01T00:00:00Z",
                "updated_at": "2024-04-30T18:00:00Z"
            }),
        )
        .with_json("https://api.github.com/repos/b/y/commits?per_page=3", json!([]),)
        .with_not_found("https://api.github.com/repos/b/y/releases/latest",)
}

#[tokio::test]
async fn partial_batch_renders_surviving_targets()
{
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0,).single().expect("valid instant",);
    let config = config();
    let analyzer = RepositoryAnalyzer::new(fetcher(), &config, now,);

    let batch = BatchOrchestrator::new(&analyzer,)
        .with_concurrency(config.concurrency,)
        .run(&config.targets,)
        .await
        .expect("one target succeeded",);

    assert_eq!(batch.attempted, 2);
    assert_eq!(batch.succeeded(), 1);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].target, "a/x");
    assert!(matches!(batch.failures[0].reason, TargetError::Fetch { .. }));

    let record = &batch.records[0];
    assert_eq!(record.identifier, "b/y");
    assert_eq!(record.info.language, "Unknown");
    assert!(record.commits.is_empty());
    assert!(record.release.is_none());
    assert!(!record.is_active);

    let totals = AggregateTotals::from_batch(&batch,);
    let lines = render_repository_digest(&batch, &totals, &now,);
    assert!(lines.contains(&"📈 Overview (1 repositories)".to_owned()));
    assert!(lines.contains(&"   b/y".to_owned()));
    assert!(lines.contains(&"⭐ 2,048 stars | 🔱 64 forks | 👀 2,048 watchers".to_owned()));
    assert!(!lines.iter().any(|line| line.contains("a/x")));
    assert!(!lines.iter().any(|line| line.starts_with("📝",) || line.starts_with("🏷️",)));
    assert!(!lines.iter().any(|line| line.starts_with("🔥",)));

    let mut sink = LineSink::new(Vec::new(), "[NOTIFY] ",);
    sink.emit_all(&lines,).expect("in-memory sink",);
    let text = String::from_utf8(sink.into_inner(),).expect("valid UTF-8",);
    assert_eq!(text.lines().count(), lines.len());
    assert!(text.lines().all(|line| line.starts_with("[NOTIFY] ")));

    let requests = analyzer.fetcher().requests();
    assert!(
        requests
            .iter()
            .all(|request| request.header_value("Authorization",) == Some("token secret"))
    );
}
