mod analyzer;
mod api;
mod classifier;
mod config;
mod export;
mod gemini;
mod sentiment;
mod video_id;
mod views;
mod youtube;

use axum::{
    routing::{get, post},
    Router,
};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::classifier::{RemoteModel, SentimentClassifier};
use crate::config::Config;
use crate::export::Exporter;
use crate::gemini::GeminiClient;
use crate::youtube::YouTubeClient;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::analyze_json,
        api::health
    ),
    components(
        schemas(
            api::AnalyzeRequest,
            api::AnalysisReport,
            api::ErrorBody,
            api::HealthResponse,
            crate::youtube::Comment,
            crate::analyzer::Stats,
            crate::analyzer::Method,
            crate::sentiment::Sentiment,
            crate::classifier::LabelSource
        )
    ),
    tags(
        (name = "analysis", description = "Comment Sentiment Analysis API")
    )
)]
struct ApiDoc;

fn build_classifier(config: &Config, http: reqwest::Client) -> SentimentClassifier {
    match &config.gemini_api_key {
        Some(key) => {
            let client = GeminiClient::new(http, key.as_str(), config.gemini_model.as_str())
                .with_base_url(config.gemini_api_base.as_str());
            info!("🤖 Gemini API configured (model {})", client.model());
            SentimentClassifier::new(RemoteModel::Available(Arc::new(client)))
        }
        None => {
            warn!("GEMINI_API_KEY is not set; using keyword-based sentiment analysis only");
            SentimentClassifier::keyword_only("GEMINI_API_KEY is not set")
        }
    }
}

fn router(state: Arc<api::AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let json_api = Router::new()
        .route("/api/analyze", post(api::analyze_json))
        .route("/health", get(api::health))
        .layer(cors);

    Router::new()
        .merge(SwaggerUi::new("/sentiment-swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(api::index_page).post(api::analyze_form))
        .route("/download/:filename", get(api::download_export))
        .merge(json_api)
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("yt_comment_sentiment=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    let http = reqwest::Client::builder()
        .user_agent(concat!("yt-comment-sentiment/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let comments = YouTubeClient::new(http.clone(), config.youtube_api_key.as_str())
        .with_base_url(config.youtube_api_base.as_str());
    let classifier = build_classifier(&config, http);
    let exporter = Exporter::new(config.export_dir.as_str(), config.export_per_run);
    info!(
        "💾 Exports go to {} ({})",
        exporter.dir().display(),
        if config.export_per_run { "one file per run" } else { "shared file" }
    );

    let state = Arc::new(api::AppState {
        comments: Arc::new(comments),
        classifier,
        exporter,
        default_max_comments: config.default_max_comments,
        max_comments_limit: config.max_comments_limit,
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
