//! Sentiment classification with a remote model and a keyword fallback.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::gemini::CompletionModel;
use crate::sentiment::{keyword_sentiment, Sentiment};

const PROMPT_TEMPLATE: &str = "Analyze the sentiment of this YouTube comment and classify it as either 'Good' or 'Bad'.
Return ONLY 'Good' or 'Bad' without any other text.

Comment: {comment}";

pub fn build_prompt(comment: &str) -> String {
    PROMPT_TEMPLATE.replace("{comment}", comment)
}

/// Maps a model answer to a label. Anything other than good/bad is Neutral.
pub fn parse_answer(answer: &str) -> Sentiment {
    match answer.trim().to_lowercase().as_str() {
        "good" => Sentiment::Good,
        "bad" => Sentiment::Bad,
        _ => Sentiment::Neutral,
    }
}

/// True when an upstream error reports a rate limit or exhausted quota.
pub fn is_quota_error(message: &str) -> bool {
    message.contains("429") || message.to_lowercase().contains("quota")
}

/// Active strategy of a batch. `Fallback` never goes back to `Remote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    Remote,
    Fallback,
}

/// Which path produced a comment's label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    Model,
    Keywords,
    /// The model call aborted and the comment was left Neutral.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub sentiment: Sentiment,
    pub source: LabelSource,
}

impl Classified {
    pub fn by_keywords(text: &str) -> Self {
        Self {
            sentiment: keyword_sentiment(text),
            source: LabelSource::Keywords,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// The model rejected the call for rate-limit or quota reasons.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    /// The model call panicked before producing a result.
    #[error("model call aborted: {0}")]
    Aborted(String),
}

/// Remote model handle, decided once at startup.
#[derive(Clone)]
pub enum RemoteModel {
    Available(Arc<dyn CompletionModel>),
    Unavailable { reason: String },
}

#[derive(Clone)]
pub struct SentimentClassifier {
    remote: RemoteModel,
}

impl SentimentClassifier {
    pub fn new(remote: RemoteModel) -> Self {
        Self { remote }
    }

    pub fn keyword_only(reason: impl Into<String>) -> Self {
        Self::new(RemoteModel::Unavailable { reason: reason.into() })
    }

    pub fn remote_available(&self) -> bool {
        matches!(self.remote, RemoteModel::Available(_))
    }

    /// Standing warning shown on every page while the model is unavailable.
    pub fn unavailable_warning(&self) -> Option<String> {
        match &self.remote {
            RemoteModel::Available(_) => None,
            RemoteModel::Unavailable { reason } => Some(format!(
                "Gemini API is not available ({}). The application will use keyword-based sentiment analysis.",
                reason
            )),
        }
    }

    /// Mode a batch starts in for the caller's choice.
    pub fn initial_mode(&self, force_keywords: bool) -> AnalysisMode {
        if force_keywords || !self.remote_available() {
            AnalysisMode::Fallback
        } else {
            AnalysisMode::Remote
        }
    }

    /// Labels one comment under `mode`.
    ///
    /// A remote call that fails or comes back without answer text falls back to the
    /// keyword tables for this comment only. Quota errors are returned so the batch
    /// can switch modes.
    pub async fn classify(&self, text: &str, mode: AnalysisMode) -> Result<Classified, ClassifyError> {
        let model = match (&self.remote, mode) {
            (RemoteModel::Available(model), AnalysisMode::Remote) => Arc::clone(model),
            _ => return Ok(Classified::by_keywords(text)),
        };

        let prompt = build_prompt(text);
        let call = tokio::spawn(async move { model.complete(&prompt).await });
        let result = call.await.map_err(|e| ClassifyError::Aborted(e.to_string()))?;

        match result {
            Ok(Some(answer)) => Ok(Classified {
                sentiment: parse_answer(&answer),
                source: LabelSource::Model,
            }),
            Ok(None) => {
                debug!("Gemini returned no answer text, using keyword fallback");
                Ok(Classified::by_keywords(text))
            }
            Err(e) => {
                let message = format!("{:#}", e);
                if is_quota_error(&message) {
                    return Err(ClassifyError::QuotaExceeded(message));
                }
                warn!("Gemini API error, using keyword fallback: {}", message);
                Ok(Classified::by_keywords(text))
            }
        }
    }
}
