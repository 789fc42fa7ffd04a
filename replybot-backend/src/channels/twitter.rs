//! Twitter API v2 client
//!
//! Implements [`SocialPlatform`] with OAuth 1.0a user-context requests.
//! A 429 response waits for the rate-limit window to reset and repeats the
//! request once.

use super::oauth::{build_query_string, generate_oauth_header, TwitterCredentials};
use super::SocialPlatform;
use crate::models::mention::preview_text;
use crate::models::{AccountId, Mention, Post, PostId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Twitter API v2 base URL
const TWITTER_API_BASE: &str = "https://api.twitter.com/2";

/// Maximum characters in a standard tweet
pub const TWITTER_MAX_CHARS: usize = 280;

/// Page size requested from the mentions timeline (API maximum)
const MENTIONS_PAGE_SIZE: &str = "100";

/// Wait used when a 429 carries no reset header, and the upper bound for any wait
const MAX_RATE_LIMIT_WAIT_SECS: u64 = 15 * 60;

/// Twitter API v2 mentions response
#[derive(Debug, Deserialize)]
struct MentionsResponse {
    data: Option<Vec<Tweet>>,
    meta: Option<MentionsMeta>,
    errors: Option<Vec<TwitterApiError>>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    conversation_id: Option<String>,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MentionsMeta {
    result_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TwitterApiError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

impl TwitterApiError {
    fn describe(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.error_type.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

/// Single tweet lookup response
#[derive(Debug, Deserialize)]
struct SingleTweetResponse {
    data: Option<Tweet>,
    errors: Option<Vec<TwitterApiError>>,
}

/// Single user lookup response
#[derive(Debug, Deserialize)]
struct SingleUserResponse {
    data: Option<TwitterUser>,
}

#[derive(Debug, Deserialize)]
struct TwitterUser {
    id: String,
    username: String,
}

/// Twitter API v2 tweet post response
#[derive(Debug, Deserialize)]
struct PostTweetResponse {
    data: Option<PostedTweet>,
    errors: Option<Vec<TwitterApiError>>,
}

#[derive(Debug, Deserialize)]
struct PostedTweet {
    id: String,
    text: String,
}

/// Rate limit information from Twitter API response headers
#[derive(Debug, Clone, Default)]
struct RateLimitInfo {
    /// Remaining requests in current window
    remaining: Option<u32>,
    /// Unix timestamp when the rate limit resets
    reset_at: Option<u64>,
}

impl RateLimitInfo {
    fn from_response(response: &reqwest::Response) -> Self {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };

        Self {
            remaining: header("x-rate-limit-remaining").and_then(|v| v.parse().ok()),
            reset_at: header("x-rate-limit-reset").and_then(|v| v.parse().ok()),
        }
    }

    /// Seconds to sleep before repeating a rate-limited request
    fn wait_secs(&self, now_unix: u64) -> u64 {
        self.reset_at
            .map(|reset| reset.saturating_sub(now_unix))
            .unwrap_or(MAX_RATE_LIMIT_WAIT_SECS)
            .clamp(1, MAX_RATE_LIMIT_WAIT_SECS)
    }
}

/// Whether a response should be waited out and the request sent again.
/// Only the first 429 of a request is retried.
fn should_wait_out(status: StatusCode, already_waited: bool) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS && !already_waited
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Twitter client for a single authenticated account
pub struct TwitterClient {
    client: reqwest::Client,
    credentials: TwitterCredentials,
    api_base: String,
}

impl TwitterClient {
    pub fn new(credentials: TwitterCredentials) -> Self {
        TwitterClient {
            client: crate::http::shared_client().clone(),
            credentials,
            api_base: TWITTER_API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    fn with_api_base(credentials: TwitterCredentials, api_base: impl Into<String>) -> Self {
        TwitterClient {
            api_base: api_base.into(),
            ..Self::new(credentials)
        }
    }

    /// Send a signed request, waiting out one 429 before giving up.
    /// Returns the final status and body.
    async fn send_signed(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<(StatusCode, String), String> {
        let url = format!("{}{}", self.api_base, path);
        let full_url = if query.is_empty() {
            url.clone()
        } else {
            format!("{}?{}", url, build_query_string(query))
        };

        let mut waited = false;
        loop {
            // Query params must be included in the signature; JSON bodies are not
            let auth_header = generate_oauth_header(
                method.as_str(),
                &url,
                &self.credentials,
                if query.is_empty() { None } else { Some(query) },
            );

            let mut request = self
                .client
                .request(method.clone(), &full_url)
                .header("Authorization", auth_header);
            if let Some(json) = body {
                request = request.json(json);
            }

            let response = request
                .send()
                .await
                .map_err(|e| format!("Request failed: {}", e))?;

            let status = response.status();
            if should_wait_out(status, waited) {
                let rate_limit = RateLimitInfo::from_response(&response);
                let wait_secs = rate_limit.wait_secs(unix_now());
                log::warn!(
                    "Twitter: Rate limited on {} {} (remaining={:?}), waiting {} seconds",
                    method,
                    path,
                    rate_limit.remaining,
                    wait_secs
                );
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                waited = true;
                continue;
            }

            let text = response
                .text()
                .await
                .map_err(|e| format!("Failed to read response ({}): {}", status, e))?;
            log::debug!("Twitter {} {} response ({}): {}", method, path, status, text);
            return Ok((status, text));
        }
    }
}

#[async_trait]
impl SocialPlatform for TwitterClient {
    async fn resolve_self_identity(&self) -> Result<AccountId, String> {
        let (status, body) = self.send_signed(Method::GET, "/users/me", &[], None).await?;
        if !status.is_success() {
            return Err(format!("API error ({}): {}", status, body));
        }
        let user = parse_user(&body)?;
        log::info!("Twitter: Authenticated as @{} ({})", user.username, user.id);
        Ok(user.id)
    }

    async fn fetch_mentions(&self, account_id: &str, window_start: &str) -> Result<Vec<Mention>, String> {
        let path = format!("/users/{}/mentions", account_id);
        let params: [(&str, &str); 3] = [
            ("start_time", window_start),
            ("max_results", MENTIONS_PAGE_SIZE),
            ("tweet.fields", "created_at,conversation_id"),
        ];

        let (status, body) = self.send_signed(Method::GET, &path, &params, None).await?;
        if !status.is_success() {
            return Err(format!("API error ({}): {}", status, body));
        }
        parse_mentions(&body)
    }

    async fn fetch_post(&self, post_id: &str) -> Result<Option<Post>, String> {
        let path = format!("/tweets/{}", post_id);
        let (status, body) = self.send_signed(Method::GET, &path, &[], None).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(format!("API error ({}): {}", status, body));
        }
        parse_single_post(&body)
    }

    async fn post_reply(&self, text: &str, in_reply_to_id: &str) -> Result<PostId, String> {
        let text = truncate_for_tweet(text, TWITTER_MAX_CHARS);
        let body = serde_json::json!({
            "text": text,
            "reply": {
                "in_reply_to_tweet_id": in_reply_to_id
            }
        });

        let (status, response_body) = self.send_signed(Method::POST, "/tweets", &[], Some(&body)).await?;
        if !status.is_success() {
            return Err(format!("API error ({}): {}", status, response_body));
        }
        parse_posted_tweet(&response_body)
    }
}

fn parse_user(body: &str) -> Result<TwitterUser, String> {
    let data: SingleUserResponse =
        serde_json::from_str(body).map_err(|e| format!("Failed to parse response: {}", e))?;
    data.data.ok_or_else(|| "No user data returned".to_string())
}

/// Parse a mentions page into deduplicated mentions, keeping response order
fn parse_mentions(body: &str) -> Result<Vec<Mention>, String> {
    let data: MentionsResponse =
        serde_json::from_str(body).map_err(|e| format!("Failed to parse response: {}", e))?;

    let errors = join_errors(data.errors.as_deref());
    let tweets = match (data.data, errors) {
        (Some(tweets), errors) => {
            // Partial errors can accompany real data
            if let Some(errors) = errors {
                log::warn!("Twitter: Partial errors in mentions response: {}", errors);
            }
            tweets
        }
        (None, Some(errors)) => return Err(format!("Twitter API errors: {}", errors)),
        (None, None) => {
            log::debug!(
                "Twitter: Mentions response without data (result_count={:?})",
                data.meta.and_then(|m| m.result_count)
            );
            Vec::new()
        }
    };

    let mut seen = HashSet::new();
    Ok(tweets
        .into_iter()
        .filter(|tweet| seen.insert(tweet.id.clone()))
        .map(mention_from_tweet)
        .collect())
}

fn parse_single_post(body: &str) -> Result<Option<Post>, String> {
    let data: SingleTweetResponse =
        serde_json::from_str(body).map_err(|e| format!("Failed to parse response: {}", e))?;

    if data.data.is_none() {
        if let Some(errors) = join_errors(data.errors.as_deref()) {
            log::debug!("Twitter: Post lookup returned errors: {}", errors);
        }
    }

    Ok(data.data.map(|tweet| Post {
        id: tweet.id,
        text: tweet.text,
    }))
}

fn parse_posted_tweet(body: &str) -> Result<PostId, String> {
    let data: PostTweetResponse =
        serde_json::from_str(body).map_err(|e| format!("Failed to parse response: {}", e))?;

    if let Some(errors) = join_errors(data.errors.as_deref()) {
        return Err(format!("Twitter API errors: {}", errors));
    }

    data.data
        .map(|tweet| {
            log::info!("Twitter: Posted tweet {} - {}", tweet.id, preview_text(&tweet.text, 50));
            tweet.id
        })
        .ok_or_else(|| "No tweet data returned".to_string())
}

fn join_errors(errors: Option<&[TwitterApiError]>) -> Option<String> {
    match errors {
        Some(errors) if !errors.is_empty() => Some(
            errors
                .iter()
                .map(|e| e.describe())
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    }
}

fn mention_from_tweet(tweet: Tweet) -> Mention {
    let created_at = tweet.created_at.as_deref().and_then(|raw| {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| log::debug!("Twitter: Unparseable created_at {:?}: {}", raw, e))
            .ok()
    });

    Mention {
        id: tweet.id,
        text: tweet.text,
        conversation_id: tweet.conversation_id,
        created_at,
    }
}

/// Cut text to at most `max_chars` characters, ending with an ellipsis when cut
fn truncate_for_tweet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const POSTED: &str =
        "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 32\r\nConnection: close\r\n\r\n{\"data\":{\"id\":\"77\",\"text\":\"hi\"}}";
    const RATE_LIMITED: &str =
        "HTTP/1.1 429 Too Many Requests\r\nx-rate-limit-remaining: 0\r\nx-rate-limit-reset: 0\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}";
    const NOT_FOUND: &str =
        "HTTP/1.1 404 Not Found\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}";
    const NO_DATA: &str =
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 44\r\nConnection: close\r\n\r\n{\"errors\":[{\"title\":\"Authorization Error\"}]}";
    const SERVER_ERROR: &str =
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}";
    const NO_MENTIONS: &str =
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 27\r\nConnection: close\r\n\r\n{\"meta\":{\"result_count\":0}}";
    // Promises more body than it sends before closing
    const TRUNCATED: &str =
        "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 200\r\nConnection: close\r\n\r\n{\"data\":";

    fn credentials() -> TwitterCredentials {
        TwitterCredentials::new(
            "ck".to_string(),
            "cs".to_string(),
            "at".to_string(),
            "ats".to_string(),
        )
    }

    type RequestLog = Arc<Mutex<Vec<String>>>;

    /// Serve one scripted response per connection; the last one repeats.
    /// Returns the base URL and the request lines received.
    async fn scripted_server(responses: Vec<&'static str>) -> (String, RequestLog) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests: RequestLog = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let request_line = read_request(&mut socket).await;
                let n = {
                    let mut log = log.lock().unwrap();
                    log.push(request_line);
                    log.len() - 1
                };
                let response = responses.get(n).or(responses.last()).copied().unwrap_or("");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (base, requests)
    }

    /// Read one request and return its request line
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn test_should_wait_out() {
        assert!(should_wait_out(StatusCode::TOO_MANY_REQUESTS, false));
        assert!(!should_wait_out(StatusCode::TOO_MANY_REQUESTS, true));
        assert!(!should_wait_out(StatusCode::OK, false));
        assert!(!should_wait_out(StatusCode::SERVICE_UNAVAILABLE, false));
    }

    #[tokio::test]
    async fn test_post_reply_succeeds_after_one_rate_limit() {
        let (base, requests) = scripted_server(vec![RATE_LIMITED, POSTED]).await;
        let client = TwitterClient::with_api_base(credentials(), base);

        assert_eq!(client.post_reply("hi", "5").await.unwrap(), "77");
        assert_eq!(requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_second_rate_limit_is_an_error() {
        let (base, requests) = scripted_server(vec![RATE_LIMITED]).await;
        let client = TwitterClient::with_api_base(credentials(), base);

        let err = client.post_reply("hi", "5").await.unwrap_err();
        assert!(err.contains("429"), "{}", err);
        assert_eq!(requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_body_reports_read_failure() {
        let (base, requests) = scripted_server(vec![TRUNCATED]).await;
        let client = TwitterClient::with_api_base(credentials(), base);

        let err = client.post_reply("hi", "5").await.unwrap_err();
        assert!(err.starts_with("Failed to read response"), "{}", err);
        assert!(!err.contains("Failed to parse"), "{}", err);
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_mentions_query() {
        let (base, requests) = scripted_server(vec![NO_MENTIONS]).await;
        let client = TwitterClient::with_api_base(credentials(), base);

        let mentions = client.fetch_mentions("42", "2024-05-01T11:40:00Z").await.unwrap();
        assert!(mentions.is_empty());

        let request_line = requests.lock().unwrap()[0].clone();
        assert!(request_line.starts_with("GET /users/42/mentions?"), "{}", request_line);
        assert!(request_line.contains("start_time=2024-05-01T11%3A40%3A00Z"), "{}", request_line);
        assert!(request_line.contains("max_results=100"), "{}", request_line);
        assert!(!request_line.contains("expansions"), "{}", request_line);
    }

    #[tokio::test]
    async fn test_fetch_post_absent_versus_failed() {
        for absent in [NOT_FOUND, NO_DATA] {
            let (base, _) = scripted_server(vec![absent]).await;
            let client = TwitterClient::with_api_base(credentials(), base);
            assert_eq!(client.fetch_post("1").await.unwrap(), None);
        }

        let (base, _) = scripted_server(vec![SERVER_ERROR]).await;
        let client = TwitterClient::with_api_base(credentials(), base);
        let err = client.fetch_post("1").await.unwrap_err();
        assert!(err.starts_with("API error (500"), "{}", err);
    }

    #[test]
    fn test_parse_mentions() {
        let body = r#"{
            "data": [
                {"id": "3", "text": "@bot what now?", "conversation_id": "1", "created_at": "2024-05-01T12:00:05.000Z"},
                {"id": "2", "text": "@bot hello", "conversation_id": "2"}
            ],
            "meta": {"result_count": 2, "newest_id": "3", "oldest_id": "2"}
        }"#;
        let mentions = parse_mentions(body).unwrap();

        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].id, "3");
        assert_eq!(mentions[0].conversation_id.as_deref(), Some("1"));
        assert_eq!(
            mentions[0].created_at.map(|dt| dt.to_rfc3339()),
            Some("2024-05-01T12:00:05+00:00".to_string())
        );
        assert_eq!(mentions[1].id, "2");
        assert!(mentions[1].created_at.is_none());
    }

    #[test]
    fn test_parse_mentions_empty_and_deduplicated() {
        let empty = r#"{"meta": {"result_count": 0}}"#;
        assert!(parse_mentions(empty).unwrap().is_empty());

        let dup = r#"{"data": [
            {"id": "9", "text": "first"},
            {"id": "9", "text": "again"},
            {"id": "8", "text": "other"}
        ]}"#;
        let mentions = parse_mentions(dup).unwrap();
        assert_eq!(mentions.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["9", "8"]);
        assert_eq!(mentions[0].text, "first");
    }

    #[test]
    fn test_parse_mentions_errors() {
        let partial = r#"{
            "data": [{"id": "5", "text": "hi", "conversation_id": "4"}],
            "errors": [{"detail": "Could not find tweet with id: [4].", "type": "https://api.twitter.com/2/problems/resource-not-found"}]
        }"#;
        assert_eq!(parse_mentions(partial).unwrap().len(), 1);

        let failed = r#"{"errors": [{"message": "Invalid start_time"}]}"#;
        let err = parse_mentions(failed).unwrap_err();
        assert!(err.contains("Invalid start_time"), "{}", err);

        assert!(parse_mentions("not json").unwrap_err().starts_with("Failed to parse response"));
    }

    #[test]
    fn test_parse_single_post() {
        let found = r#"{"data": {"id": "1", "text": "the original post", "conversation_id": "1"}}"#;
        assert_eq!(
            parse_single_post(found).unwrap(),
            Some(Post { id: "1".to_string(), text: "the original post".to_string() })
        );

        let missing = r#"{"errors": [{"detail": "Could not find tweet with id: [1].", "title": "Not Found Error"}]}"#;
        assert_eq!(parse_single_post(missing).unwrap(), None);
    }

    #[test]
    fn test_parse_posted_tweet() {
        let ok = r#"{"data": {"id": "77", "text": "reply"}}"#;
        assert_eq!(parse_posted_tweet(ok).unwrap(), "77");

        let err = r#"{"errors": [{"message": "duplicate content"}]}"#;
        assert!(parse_posted_tweet(err).unwrap_err().contains("duplicate content"));

        assert_eq!(parse_posted_tweet("{}").unwrap_err(), "No tweet data returned");
    }

    #[test]
    fn test_parse_user() {
        let body = r#"{"data": {"id": "42", "name": "Bot", "username": "replybot"}}"#;
        let user = parse_user(body).unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.username, "replybot");
        assert!(parse_user(r#"{}"#).is_err());
    }

    #[test]
    fn test_truncate_for_tweet() {
        assert_eq!(truncate_for_tweet("  short reply ", TWITTER_MAX_CHARS), "short reply");

        let long = "word ".repeat(100);
        let cut = truncate_for_tweet(&long, TWITTER_MAX_CHARS);
        assert!(cut.chars().count() <= TWITTER_MAX_CHARS);
        assert!(cut.ends_with('…'));

        let wide = "ü".repeat(300);
        assert_eq!(truncate_for_tweet(&wide, TWITTER_MAX_CHARS).chars().count(), TWITTER_MAX_CHARS);
    }

    #[test]
    fn test_rate_limit_wait() {
        let info = RateLimitInfo { remaining: Some(0), reset_at: Some(1_000) };
        assert_eq!(info.wait_secs(940), 60);
        // Reset already passed
        assert_eq!(info.wait_secs(2_000), 1);

        let far = RateLimitInfo { remaining: Some(0), reset_at: Some(100_000) };
        assert_eq!(far.wait_secs(0), MAX_RATE_LIMIT_WAIT_SECS);

        assert_eq!(RateLimitInfo::default().wait_secs(0), MAX_RATE_LIMIT_WAIT_SECS);
    }
}
