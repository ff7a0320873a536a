//! Batch analysis: labels every fetched comment and aggregates the results.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::classifier::{AnalysisMode, ClassifyError, Classified, LabelSource, SentimentClassifier};
use crate::sentiment::Sentiment;
use crate::youtube::Comment;

pub const QUOTA_NOTICE: &str = "API quota exceeded. Using fallback sentiment analysis method.";

/// Method reported for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    RemoteAi,
    KeywordFallback,
}

impl Method {
    pub fn label(&self) -> &'static str {
        match self {
            Method::RemoteAi => "Gemini AI",
            Method::KeywordFallback => "keyword-based",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct Stats {
    pub total: usize,
    pub good: usize,
    pub bad: usize,
    pub neutral: usize,
    pub good_percent: f64,
    pub bad_percent: f64,
    pub neutral_percent: f64,
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

impl Stats {
    /// Counts labels; comments without one count as Neutral.
    pub fn from_comments(comments: &[Comment]) -> Self {
        let total = comments.len();
        let good = comments.iter().filter(|c| c.sentiment == Some(Sentiment::Good)).count();
        let bad = comments.iter().filter(|c| c.sentiment == Some(Sentiment::Bad)).count();
        let neutral = total - good - bad;

        Stats {
            total,
            good,
            bad,
            neutral,
            good_percent: percent(good, total),
            bad_percent: percent(bad, total),
            neutral_percent: percent(neutral, total),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalysisRun {
    pub comments: Vec<Comment>,
    pub method: Method,
    pub quota_notice: Option<String>,
    pub stats: Stats,
}

/// Labels `comments` in order, starting in `mode`.
///
/// A quota error moves the batch to `Fallback` for every remaining comment and
/// the current one is labelled by keywords. An aborted model call leaves that
/// comment Neutral. The batch itself never fails.
pub async fn analyze_batch(
    mut comments: Vec<Comment>,
    mut mode: AnalysisMode,
    classifier: &SentimentClassifier,
) -> AnalysisRun {
    let started_in_fallback = mode == AnalysisMode::Fallback;
    let mut quota_notice: Option<String> = None;

    for comment in comments.iter_mut() {
        let classified = match classifier.classify(&comment.text, mode).await {
            Ok(classified) => classified,
            Err(ClassifyError::QuotaExceeded(msg)) => {
                warn!("⚠️ Gemini quota exhausted, switching batch to keyword analysis: {}", msg);
                mode = AnalysisMode::Fallback;
                quota_notice.get_or_insert_with(|| QUOTA_NOTICE.to_string());
                Classified::by_keywords(&comment.text)
            }
            Err(e) => {
                warn!("Sentiment classification failed, marking comment neutral: {}", e);
                Classified {
                    sentiment: Sentiment::Neutral,
                    source: LabelSource::Default,
                }
            }
        };
        comment.sentiment = Some(classified.sentiment);
        comment.labelled_by = Some(classified.source);
    }

    let method = if started_in_fallback || mode == AnalysisMode::Fallback {
        Method::KeywordFallback
    } else {
        Method::RemoteAi
    };
    let stats = Stats::from_comments(&comments);
    info!(
        "🧠 Sentiment analysis ({}): {} comments, {} good, {} bad, {} neutral",
        method, stats.total, stats.good, stats.bad, stats.neutral
    );

    AnalysisRun {
        comments,
        method,
        quota_notice,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::{answer, PanickingModel, ScriptedModel};
    use crate::classifier::RemoteModel;
    use chrono::Utc;
    use std::sync::Arc;

    fn comments(texts: &[&str]) -> Vec<Comment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Comment::new(format!("user{}", i), *t, i as u64, Utc::now()))
            .collect()
    }

    fn labels(run: &AnalysisRun) -> Vec<Sentiment> {
        run.comments.iter().map(|c| c.sentiment.unwrap()).collect()
    }

    #[test]
    fn test_stats_rounding() {
        let mut batch = comments(&["a", "b", "c"]);
        batch[0].sentiment = Some(Sentiment::Good);
        batch[1].sentiment = Some(Sentiment::Bad);
        batch[2].sentiment = Some(Sentiment::Neutral);
        let stats = Stats::from_comments(&batch);
        assert_eq!((stats.total, stats.good, stats.bad, stats.neutral), (3, 1, 1, 1));
        assert_eq!(stats.good_percent, 33.3);
        let sum = stats.good_percent + stats.bad_percent + stats.neutral_percent;
        assert!((sum - 100.0).abs() <= 0.1 + 1e-9);
    }

    #[test]
    fn test_stats_empty_batch() {
        let stats = Stats::from_comments(&[]);
        assert_eq!(stats, Stats::default());
    }

    #[test]
    fn test_stats_two_thirds() {
        let mut batch = comments(&["a", "b", "c"]);
        batch[0].sentiment = Some(Sentiment::Good);
        batch[1].sentiment = Some(Sentiment::Good);
        batch[2].sentiment = Some(Sentiment::Bad);
        let stats = Stats::from_comments(&batch);
        assert_eq!(stats.good_percent, 66.7);
        assert_eq!(stats.bad_percent, 33.3);
        assert_eq!(stats.neutral_percent, 0.0);
    }

    #[tokio::test]
    async fn test_remote_run() {
        let model = ScriptedModel::new(vec![answer("Good"), answer("bad"), answer("maybe")]);
        let classifier = SentimentClassifier::new(RemoteModel::Available(model.clone()));
        let run = analyze_batch(comments(&["x", "y", "z"]), AnalysisMode::Remote, &classifier).await;

        assert_eq!(labels(&run), vec![Sentiment::Good, Sentiment::Bad, Sentiment::Neutral]);
        assert_eq!(run.method, Method::RemoteAi);
        assert!(run.quota_notice.is_none());
        assert_eq!(model.calls(), 3);
        assert!(run.comments.iter().all(|c| c.labelled_by == Some(LabelSource::Model)));
    }

    #[tokio::test]
    async fn test_quota_error_switches_remaining_comments_to_keywords() {
        let model = ScriptedModel::new(vec![
            answer("Bad"),
            Err(anyhow::anyhow!("Gemini API error 429 Too Many Requests: quota")),
            answer("Bad"),
            answer("Bad"),
        ]);
        let classifier = SentimentClassifier::new(RemoteModel::Available(model.clone()));
        let batch = comments(&["love it", "awesome", "terrible", "just a video"]);
        let run = analyze_batch(batch, AnalysisMode::Remote, &classifier).await;

        assert_eq!(model.calls(), 2);
        assert_eq!(
            labels(&run),
            vec![Sentiment::Bad, Sentiment::Good, Sentiment::Bad, Sentiment::Neutral]
        );
        assert_eq!(run.comments[0].labelled_by, Some(LabelSource::Model));
        assert!(run.comments[1..]
            .iter()
            .all(|c| c.labelled_by == Some(LabelSource::Keywords)));
        assert_eq!(run.quota_notice.as_deref(), Some(QUOTA_NOTICE));
        assert_eq!(run.method, Method::KeywordFallback);
    }

    #[tokio::test]
    async fn test_empty_answer_uses_keywords_for_that_comment() {
        let model = ScriptedModel::new(vec![Ok(None), answer("Good")]);
        let classifier = SentimentClassifier::new(RemoteModel::Available(model.clone()));
        let batch = comments(&["Terrible, what a waste, I hate it", "fine"]);
        let run = analyze_batch(batch, AnalysisMode::Remote, &classifier).await;

        assert_eq!(labels(&run), vec![Sentiment::Bad, Sentiment::Good]);
        assert_eq!(run.comments[0].labelled_by, Some(LabelSource::Keywords));
        assert_eq!(run.comments[1].labelled_by, Some(LabelSource::Model));
        assert_eq!(model.calls(), 2);
        assert_eq!(run.method, Method::RemoteAi);
        assert!(run.quota_notice.is_none());
    }

    #[tokio::test]
    async fn test_aborted_call_marks_comment_neutral() {
        let classifier = SentimentClassifier::new(RemoteModel::Available(Arc::new(PanickingModel)));
        let run = analyze_batch(comments(&["great", "awful"]), AnalysisMode::Remote, &classifier).await;

        assert_eq!(labels(&run), vec![Sentiment::Neutral, Sentiment::Neutral]);
        assert!(run.comments.iter().all(|c| c.labelled_by == Some(LabelSource::Default)));
        assert_eq!(run.method, Method::RemoteAi);
    }

    #[tokio::test]
    async fn test_forced_fallback_never_calls_model() {
        let model = ScriptedModel::new(vec![answer("Bad")]);
        let classifier = SentimentClassifier::new(RemoteModel::Available(model.clone()));
        let run = analyze_batch(comments(&["great", "awful"]), AnalysisMode::Fallback, &classifier).await;

        assert_eq!(model.calls(), 0);
        assert_eq!(labels(&run), vec![Sentiment::Good, Sentiment::Bad]);
        assert_eq!(run.method, Method::KeywordFallback);
    }

    #[tokio::test]
    async fn test_unavailable_model_reports_keyword_method() {
        let classifier = SentimentClassifier::keyword_only("GEMINI_API_KEY not set");
        let mode = classifier.initial_mode(false);
        let run = analyze_batch(comments(&["nice", "boring", "ok"]), mode, &classifier).await;

        assert_eq!(run.method.to_string(), "keyword-based");
        assert_eq!(run.stats.total, 3);
        assert_eq!(run.stats.good + run.stats.bad + run.stats.neutral, run.stats.total);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let classifier = SentimentClassifier::keyword_only("none");
        let run = analyze_batch(Vec::new(), AnalysisMode::Fallback, &classifier).await;
        assert_eq!(run.stats, Stats::default());
        assert!(run.comments.is_empty());
    }
}
