use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::analyzer::{analyze_batch, AnalysisRun, Method, Stats};
use crate::classifier::SentimentClassifier;
use crate::export::{Exporter, XLSX_CONTENT_TYPE};
use crate::video_id::extract_video_id;
use crate::views::{render_index, render_results, IndexPage, ResultsPage};
use crate::youtube::{Comment, CommentSource};

pub struct AppState {
    pub comments: Arc<dyn CommentSource>,
    pub classifier: SentimentClassifier,
    pub exporter: Exporter,
    pub default_max_comments: usize,
    /// Upper bound on a requested count; `None` accepts any positive count.
    pub max_comments_limit: Option<usize>,
}

/// Request-level failures. Everything else is absorbed inside the run.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Invalid YouTube URL")]
    InvalidUrl,
    #[error("{0}")]
    InvalidCount(String),
    #[error("Error: {0:#}")]
    Fetch(#[from] anyhow::Error),
}

impl AnalyzeError {
    pub fn status(&self) -> StatusCode {
        match self {
            AnalyzeError::InvalidUrl | AnalyzeError::InvalidCount(_) => StatusCode::BAD_REQUEST,
            AnalyzeError::Fetch(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

pub struct AnalysisOutcome {
    pub run: AnalysisRun,
    pub export_file: Option<String>,
}

impl AppState {
    /// Validates a requested count: default when absent, positive, and within the
    /// configured cap if there is one.
    pub fn resolve_max_comments(&self, requested: Option<usize>) -> Result<usize, AnalyzeError> {
        match requested {
            None => Ok(self.default_max_comments),
            Some(0) => Err(AnalyzeError::InvalidCount(
                "Maximum comments must be at least 1".to_string(),
            )),
            Some(n) => match self.max_comments_limit {
                Some(limit) if n > limit => Err(AnalyzeError::InvalidCount(format!(
                    "Maximum comments cannot exceed {}",
                    limit
                ))),
                _ => Ok(n),
            },
        }
    }

    /// URL → fetch → classify → export.
    pub async fn run_analysis(
        &self,
        url: &str,
        max_comments: usize,
        force_keywords: bool,
    ) -> Result<AnalysisOutcome, AnalyzeError> {
        let video_id = extract_video_id(url).ok_or(AnalyzeError::InvalidUrl)?;
        info!("🎬 Analyzing up to {} comments for video {}", max_comments, video_id);

        let comments = self
            .comments
            .fetch_comments(&video_id, max_comments)
            .await
            .map_err(|e| {
                error!("❌ Comment fetch failed for {}: {:#}", video_id, e);
                AnalyzeError::from(e)
            })?;

        let mode = self.classifier.initial_mode(force_keywords);
        let run = analyze_batch(comments, mode, &self.classifier).await;

        let export_file = match self.exporter.export(&run.comments).await {
            Ok(name) => Some(name),
            Err(e) => {
                warn!("⚠️ Spreadsheet export failed: {:#}", e);
                None
            }
        };

        Ok(AnalysisOutcome { run, export_file })
    }
}

// ============================================================================
// HTML form
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub youtube_url: String,
    pub max_comments: Option<String>,
    pub use_fallback: Option<String>,
}

fn parse_count(raw: Option<&str>) -> Result<Option<usize>, AnalyzeError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| {
            AnalyzeError::InvalidCount("Maximum comments must be a positive whole number".to_string())
        }),
    }
}

pub async fn index_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let warning = state.classifier.unavailable_warning();
    Html(render_index(&IndexPage {
        warning: warning.as_deref(),
        max_comments: state.default_max_comments,
        ..Default::default()
    }))
}

pub async fn analyze_form(State(state): State<Arc<AppState>>, Form(form): Form<AnalyzeForm>) -> Response {
    let warning = state.classifier.unavailable_warning();
    let use_fallback = form.use_fallback.as_deref() == Some("on");

    let result = match parse_count(form.max_comments.as_deref()) {
        Ok(requested) => match state.resolve_max_comments(requested) {
            Ok(max) => state.run_analysis(&form.youtube_url, max, use_fallback).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => Html(render_results(&ResultsPage {
            run: &outcome.run,
            warning: warning.as_deref(),
            export_file: outcome.export_file.as_deref(),
        }))
        .into_response(),
        Err(e) => {
            let message = e.to_string();
            let page = render_index(&IndexPage {
                warning: warning.as_deref(),
                error: Some(&message),
                url: &form.youtube_url,
                max_comments: state.default_max_comments,
                use_fallback,
            });
            (e.status(), Html(page)).into_response()
        }
    }
}

// ============================================================================
// Download
// ============================================================================

pub async fn download_export(State(state): State<Arc<AppState>>, Path(file_name): Path<String>) -> Response {
    let Some(path) = state.exporter.resolve(&file_name) else {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Err(e) => {
            error!("Failed to read export {}: {}", path.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response()
        }
    }
}

// ============================================================================
// JSON API
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Watch, short-link or embed URL
    pub url: String,
    pub max_comments: Option<usize>,
    #[serde(default)]
    pub use_fallback: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalysisReport {
    pub comments: Vec<Comment>,
    pub stats: Stats,
    pub method: Method,
    pub quota_notice: Option<String>,
    /// Standing warning when the remote model is unavailable
    pub warning: Option<String>,
    /// File name for `/download/{file}`, absent if the export failed
    pub export_file: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub remote_model_available: bool,
}

#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Comments analysed", body = AnalysisReport),
        (status = 400, description = "Invalid URL or comment count", body = ErrorBody),
        (status = 502, description = "Comment fetch failed", body = ErrorBody)
    ),
    tag = "analysis"
)]
pub async fn analyze_json(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisReport>, (StatusCode, Json<ErrorBody>)> {
    let to_error = |e: AnalyzeError| (e.status(), Json(ErrorBody { error: e.to_string() }));

    let max = state.resolve_max_comments(req.max_comments).map_err(to_error)?;
    let outcome = state
        .run_analysis(&req.url, max, req.use_fallback)
        .await
        .map_err(to_error)?;

    let AnalysisRun { comments, method, quota_notice, stats } = outcome.run;
    Ok(Json(AnalysisReport {
        comments,
        stats,
        method,
        quota_notice,
        warning: state.classifier.unavailable_warning(),
        export_file: outcome.export_file,
    }))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "analysis"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        remote_model_available: state.classifier.remote_available(),
    })
}
