//! YouTube Data API v3 comment fetcher.

use anyhow::{Context, Result};
use axum::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::classifier::LabelSource;
use crate::sentiment::Sentiment;

pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Largest page `commentThreads.list` accepts.
const MAX_PAGE_SIZE: usize = 100;

/// A top-level comment. `sentiment` is filled in once by the analyzer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Comment {
    pub author: String,
    pub text: String,
    pub like_count: u64,
    pub published_at: DateTime<Utc>,
    pub sentiment: Option<Sentiment>,
    pub labelled_by: Option<LabelSource>,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<String>, like_count: u64, published_at: DateTime<Utc>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            like_count,
            published_at,
            sentiment: None,
            labelled_by: None,
        }
    }
}

/// Source of comments for a video.
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// Fetches at most `max_results` comments in API order.
    async fn fetch_comments(&self, video_id: &str, max_results: usize) -> Result<Vec<Comment>>;
}

// API response structures
#[derive(Debug, Deserialize)]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
struct ThreadSnippet {
    #[serde(rename = "topLevelComment")]
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
struct CommentSnippet {
    #[serde(rename = "authorDisplayName", default)]
    author_display_name: String,
    #[serde(rename = "textDisplay", default)]
    text_display: String,
    #[serde(rename = "likeCount", default)]
    like_count: u64,
    #[serde(rename = "publishedAt")]
    published_at: DateTime<Utc>,
}

impl From<CommentThread> for Comment {
    fn from(thread: CommentThread) -> Self {
        let s = thread.snippet.top_level_comment.snippet;
        Comment::new(s.author_display_name, s.text_display, s.like_count, s.published_at)
    }
}

pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_YOUTUBE_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_page(&self, video_id: &str, page_size: usize, page_token: Option<&str>) -> Result<CommentThreadsResponse> {
        let url = format!("{}/commentThreads", self.base_url);
        let page_size = page_size.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("videoId", video_id),
            ("maxResults", page_size.as_str()),
            ("key", self.api_key.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("YouTube API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("YouTube API error {}: {}", status, error_text);
        }

        response
            .json::<CommentThreadsResponse>()
            .await
            .map_err(|e| e.without_url())
            .context("Failed to decode YouTube commentThreads response")
    }
}

#[async_trait]
impl CommentSource for YouTubeClient {
    async fn fetch_comments(&self, video_id: &str, max_results: usize) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = Vec::new();
        let mut page_token: Option<String> = None;

        while comments.len() < max_results {
            let page_size = MAX_PAGE_SIZE.min(max_results - comments.len());
            let page = self.fetch_page(video_id, page_size, page_token.as_deref()).await?;
            debug!("Fetched page of {} comments for {}", page.items.len(), video_id);

            comments.extend(page.items.into_iter().map(Comment::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        comments.truncate(max_results);
        info!("📥 Fetched {} comments for video {}", comments.len(), video_id);
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
    use std::collections::HashMap;

    async fn spawn_mock(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn thread(n: usize) -> serde_json::Value {
        serde_json::json!({
            "snippet": {
                "topLevelComment": {
                    "snippet": {
                        "authorDisplayName": format!("user{}", n),
                        "textDisplay": format!("comment {}", n),
                        "likeCount": n,
                        "publishedAt": "2024-03-01T12:00:00Z"
                    }
                }
            }
        })
    }

    /// Serves `total` comments in pages, honouring maxResults and pageToken.
    async fn paged_comments(Query(params): Query<HashMap<String, String>>, total: usize) -> impl IntoResponse {
        if params.get("key").map(String::as_str) != Some("yt-key") {
            return (StatusCode::FORBIDDEN, "bad key").into_response();
        }
        if params.get("videoId").map(String::as_str) == Some("missing") {
            return (StatusCode::NOT_FOUND, r#"{"error":{"message":"videoNotFound"}}"#).into_response();
        }
        let page_size: usize = params["maxResults"].parse().unwrap();
        assert!(page_size <= 100);
        let start: usize = params.get("pageToken").map(|t| t.parse().unwrap()).unwrap_or(0);
        let end = (start + page_size).min(total);
        let items: Vec<_> = (start..end).map(thread).collect();
        let mut body = serde_json::json!({ "items": items });
        if end < total {
            body["nextPageToken"] = serde_json::json!(end.to_string());
        }
        Json(body).into_response()
    }

    async fn client_for(total: usize) -> YouTubeClient {
        let router = Router::new().route(
            "/commentThreads",
            get(move |q: Query<HashMap<String, String>>| paged_comments(q, total)),
        );
        let base = spawn_mock(router).await;
        YouTubeClient::new(reqwest::Client::new(), "yt-key").with_base_url(base)
    }

    #[tokio::test]
    async fn test_follows_continuation_tokens() {
        let client = client_for(250).await;
        let comments = client.fetch_comments("vid", 230).await.unwrap();
        assert_eq!(comments.len(), 230);
        assert_eq!(comments[0].author, "user0");
        assert_eq!(comments[229].text, "comment 229");
        assert_eq!(comments[5].like_count, 5);
        assert!(comments.iter().all(|c| c.sentiment.is_none()));
    }

    #[tokio::test]
    async fn test_stops_when_no_more_pages() {
        let client = client_for(42).await;
        let comments = client.fetch_comments("vid", 100).await.unwrap();
        assert_eq!(comments.len(), 42);
    }

    #[tokio::test]
    async fn test_parses_timestamp() {
        let client = client_for(1).await;
        let comments = client.fetch_comments("vid", 10).await.unwrap();
        assert_eq!(comments[0].published_at.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[tokio::test]
    async fn test_api_error_is_propagated() {
        let client = client_for(10).await;
        let err = client.fetch_comments("missing", 10).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        let client = YouTubeClient::new(reqwest::Client::new(), "SECRET-YT-KEY").with_base_url("http://127.0.0.1:1");
        let err = client.fetch_comments("vid", 10).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.starts_with("YouTube API request failed"));
        assert!(!message.contains("SECRET-YT-KEY"));
    }
}
