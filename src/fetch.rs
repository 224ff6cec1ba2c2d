// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Single-attempt HTTP GET returning a parsed JSON tree.
//!
//! The [`Fetch`] trait is the seam between the pipeline and the transport.
//! [`HttpFetcher`] talks to real endpoints; [`StaticFetcher`] serves canned
//! responses for offline runs and tests.

use std::{collections::HashMap, future::Future, sync::Mutex, time::Duration};

use reqwest::StatusCode;
use tracing::debug;

use crate::error::{Error, FetchError};

/// Unparsed structured response: a tree of null/bool/number/string/array/
/// object nodes.
pub type RawResponse = serde_json::Value;

/// User agent sent with every request.
pub const USER_AGENT: &str = "Tempo-GitHub-Monitor/1.0";

/// Per-request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10,);

/// Successful result of a fetch.
#[derive(Debug, Clone, PartialEq,)]
pub enum FetchOutcome
{
    /// The resource exists and its body parsed as JSON.
    Found(RawResponse,),
    /// The server answered `404 Not Found`.
    NotFound,
}

/// GET request description: absolute URL plus extra headers.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct FetchRequest
{
    /// Absolute URL.
    pub url:     String,
    /// Header name/value pairs in insertion order.
    pub headers: Vec<(String, String,),>,
}

impl FetchRequest
{
    /// Creates a request without extra headers.
    pub fn new(url: impl Into<String,>,) -> Self
    {
        Self {
            url: url.into(), headers: Vec::new(),
        }
    }

    /// Appends a header and returns the request.
    pub fn header(mut self, name: impl Into<String,>, value: impl Into<String,>,) -> Self
    {
        self.headers.push((name.into(), value.into(),),);
        self
    }

    /// Looks up the first header with the given name, ignoring ASCII case.
    pub fn header_value(&self, name: &str,) -> Option<&str,>
    {
        self.headers
            .iter()
            .find(|(candidate, _,)| candidate.eq_ignore_ascii_case(name,),)
            .map(|(_, value,)| value.as_str(),)
    }
}

/// Issues one GET per call. Implementations never retry.
pub trait Fetch
{
    /// Fetches `request` and parses the body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, timeout, non-2xx status
    /// other than 404, or a body that is not valid JSON.
    fn fetch(
        &self,
        request: &FetchRequest,
    ) -> impl Future<Output = Result<FetchOutcome, FetchError,>,>;
}

/// [`Fetch`] implementation backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone,)]
pub struct HttpFetcher
{
    client: reqwest::Client,
}

impl HttpFetcher
{
    /// Builds a client that applies `timeout` to every request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] when the TLS backend cannot be initialized.
    pub fn new(timeout: Duration,) -> Result<Self, Error,>
    {
        let client = reqwest::Client::builder()
            .timeout(timeout,)
            .user_agent(USER_AGENT,)
            .build()
            .map_err(|e| Error::client(e.to_string(),),)?;

        Ok(Self {
            client,
        },)
    }
}

impl Fetch for HttpFetcher
{
    async fn fetch(&self, request: &FetchRequest,) -> Result<FetchOutcome, FetchError,>
    {
        debug!("GET {}", request.url);

        let mut builder = self.client.get(&request.url,);
        for (name, value,) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str(),);
        }

        let response = builder.send().await.map_err(|e| transport_error(&request.url, &e,),)?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("{} answered 404", request.url);
            return Ok(FetchOutcome::NotFound,);
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                url: request.url.clone(), status: status.as_u16(),
            },);
        }

        let body = response.bytes().await.map_err(|e| transport_error(&request.url, &e,),)?;
        parse_body(&request.url, &body,).map(FetchOutcome::Found,)
    }
}

fn transport_error(url: &str, error: &reqwest::Error,) -> FetchError
{
    let message = if error.is_timeout() {
        format!("timed out: {error}")
    } else {
        error.to_string()
    };

    FetchError::Transport {
        url: url.to_owned(), message,
    }
}

/// Parses a response body into a [`RawResponse`].
///
/// # Errors
///
/// Returns [`FetchError::Body`] when `body` is not valid JSON.
pub fn parse_body(url: &str, body: &[u8],) -> Result<RawResponse, FetchError,>
{
    serde_json::from_slice(body,).map_err(|e| FetchError::Body {
        url: url.to_owned(), message: e.to_string(),
    },)
}

/// In-memory [`Fetch`] implementation keyed by URL.
///
/// Unregistered URLs fail with [`FetchError::Transport`]. Every request is
/// recorded so callers can inspect the headers that were sent.
///
/// # Examples
///
/// ```
/// use tempo_digest::{FetchOutcome, StaticFetcher};
///
/// let fetcher = StaticFetcher::new()
///     .with_json("https://example.test/a", serde_json::json!({"ok": true}),)
///     .with_not_found("https://example.test/b",);
/// assert_eq!(fetcher.len(), 2);
/// # let _ = FetchOutcome::NotFound;
/// ```
#[derive(Debug, Default,)]
pub struct StaticFetcher
{
    responses: HashMap<String, Result<FetchOutcome, FetchError,>,>,
    requests:  Mutex<Vec<FetchRequest,>,>,
}

impl StaticFetcher
{
    /// Creates an empty fetcher.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Registers a JSON body for `url`.
    pub fn with_json(mut self, url: impl Into<String,>, body: RawResponse,) -> Self
    {
        self.responses.insert(url.into(), Ok(FetchOutcome::Found(body,),),);
        self
    }

    /// Registers a 404 for `url`.
    pub fn with_not_found(mut self, url: impl Into<String,>,) -> Self
    {
        self.responses.insert(url.into(), Ok(FetchOutcome::NotFound,),);
        self
    }

    /// Registers a failure for `url`.
    pub fn with_failure(mut self, url: impl Into<String,>, error: FetchError,) -> Self
    {
        self.responses.insert(url.into(), Err(error,),);
        self
    }

    /// Number of registered URLs.
    pub fn len(&self,) -> usize
    {
        self.responses.len()
    }

    /// Returns `true` when no URL is registered.
    pub fn is_empty(&self,) -> bool
    {
        self.responses.is_empty()
    }

    /// Requests received so far, in call order.
    pub fn requests(&self,) -> Vec<FetchRequest,>
    {
        self.requests.lock().map(|log| log.clone(),).unwrap_or_default()
    }
}

impl Fetch for StaticFetcher
{
    async fn fetch(&self, request: &FetchRequest,) -> Result<FetchOutcome, FetchError,>
    {
        if let Ok(mut log,) = self.requests.lock() {
            log.push(request.clone(),);
        }

        self.responses.get(&request.url,).cloned().unwrap_or_else(|| {
            Err(FetchError::Transport {
                url:     request.url.clone(),
                message: "no response registered".to_owned(),
            },)
        },)
    }
}

#[cfg(test)]
mod tests
{
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread,
    };

    use serde_json::json;

    use super::*;

    fn spawn_one_shot_http(status: &'static str, body: &'static [u8],) -> (String, thread::JoinHandle<(),>,)
    {
        let listener = TcpListener::bind("127.0.0.1:0",).expect("bind loopback",);
        let addr = listener.local_addr().expect("local addr",);
        let handle = thread::spawn(move || {
            let (mut stream, _,) = listener.accept().expect("accept",);
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request,);
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes(),).expect("write head",);
            stream.write_all(body,).expect("write body",);
            let _ = stream.flush();
        },);
        (format!("http://{addr}/repos/a/x"), handle,)
    }

    async fn fetch_once(status: &'static str, body: &'static [u8],) -> (String, Result<FetchOutcome, FetchError,>,)
    {
        let (url, server,) = spawn_one_shot_http(status, body,);
        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT,).expect("client builds",);
        let outcome = fetcher.fetch(&FetchRequest::new(url.clone(),),).await;
        server.join().expect("server thread",);
        (url, outcome,)
    }

    #[tokio::test]
    async fn http_success_parses_json_body()
    {
        let (_, outcome,) = fetch_once("200 OK", br#"{"stargazers_count":7}"#,).await;
        assert_eq!(outcome, Ok(FetchOutcome::Found(json!({"stargazers_count": 7}),)));
    }

    #[tokio::test]
    async fn http_not_found_is_an_outcome_not_an_error()
    {
        let (_, outcome,) = fetch_once("404 Not Found", br#"{"message":"Not Found"}"#,).await;
        assert_eq!(outcome, Ok(FetchOutcome::NotFound));
    }

    #[tokio::test]
    async fn http_server_error_maps_to_status()
    {
        let (url, outcome,) = fetch_once("500 Internal Server Error", b"{}",).await;
        assert_eq!(
            outcome,
            Err(FetchError::Status {
                url, status: 500,
            },)
        );
    }

    #[tokio::test]
    async fn http_non_json_body_maps_to_body_error()
    {
        let (url, outcome,) = fetch_once("200 OK", b"<html>",).await;
        match outcome {
            Err(FetchError::Body {
                url: failed, ..
            },) => assert_eq!(failed, url),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn parse_body_accepts_json_tree()
    {
        let value = parse_body("https://example.test", br#"{"a":[1,null,"x"]}"#,)
            .expect("valid json",);
        assert_eq!(value, json!({"a": [1, null, "x"]}));
    }

    #[test]
    fn parse_body_reports_malformed_payload()
    {
        let error = parse_body("https://example.test", b"<html>",).unwrap_err();
        match error {
            FetchError::Body {
                url, ..
            } => assert_eq!(url, "https://example.test"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn request_header_lookup_ignores_case()
    {
        let request = FetchRequest::new("https://example.test",).header("Authorization", "token t",);
        assert_eq!(request.header_value("authorization"), Some("token t"));
        assert_eq!(request.header_value("accept"), None);
    }

    #[test]
    fn http_fetcher_builds_with_default_timeout()
    {
        assert!(HttpFetcher::new(DEFAULT_TIMEOUT,).is_ok());
    }

    #[tokio::test]
    async fn static_fetcher_serves_registered_outcomes()
    {
        let fetcher = StaticFetcher::new()
            .with_json("https://example.test/a", json!({"ok": true}),)
            .with_not_found("https://example.test/b",);

        let found = fetcher.fetch(&FetchRequest::new("https://example.test/a",),).await;
        assert_eq!(found, Ok(FetchOutcome::Found(json!({"ok": true}),)));

        let missing = fetcher.fetch(&FetchRequest::new("https://example.test/b",),).await;
        assert_eq!(missing, Ok(FetchOutcome::NotFound));

        let unknown = fetcher.fetch(&FetchRequest::new("https://example.test/c",),).await;
        assert!(matches!(unknown, Err(FetchError::Transport { .. })));

        assert_eq!(fetcher.requests().len(), 3);
    }
}
