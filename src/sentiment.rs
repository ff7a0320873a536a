//! Keyword-based sentiment analysis.
//!
//! The local classifier needs no network access: it counts how many entries of
//! the positive and negative keyword tables occur in the lower-cased comment
//! and picks the side with more hits. It is the fallback whenever the remote
//! model is unavailable, forced off, or out of quota.

use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// Positive keywords. Matched as substrings, so "thanks" also hits "thank".
pub const POSITIVE_KEYWORDS: &[&str] = &[
    "good", "great", "awesome", "excellent", "amazing", "love", "best",
    "nice", "fantastic", "wonderful", "brilliant", "perfect", "thank",
    "thanks", "helpful", "beautiful", "enjoyed", "like", "recommend",
];

/// Negative keywords. "not good" also hits "good" on the positive side.
pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "bad", "terrible", "awful", "worst", "hate", "poor", "waste",
    "disappointed", "disappointing", "horrible", "useless", "dislike",
    "unfortunately", "boring", "stupid", "not good", "sucks", "wrong",
];

/// Sentiment label attached to every analysed comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub enum Sentiment {
    Good,
    Bad,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Good => "Good",
            Sentiment::Bad => "Bad",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword hit counts for one piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordScore {
    pub positive_count: usize,
    pub negative_count: usize,
}

impl KeywordScore {
    pub fn sentiment(&self) -> Sentiment {
        if self.positive_count > self.negative_count {
            Sentiment::Good
        } else if self.negative_count > self.positive_count {
            Sentiment::Bad
        } else {
            Sentiment::Neutral
        }
    }
}

fn count_hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}

/// Counts keyword hits without tokenising; each keyword counts at most once.
pub fn score_keywords(text: &str) -> KeywordScore {
    let lowercase_text = text.to_lowercase();
    KeywordScore {
        positive_count: count_hits(&lowercase_text, POSITIVE_KEYWORDS),
        negative_count: count_hits(&lowercase_text, NEGATIVE_KEYWORDS),
    }
}

/// Classifies text with the keyword tables. Ties, including no hits, are Neutral.
pub fn keyword_sentiment(text: &str) -> Sentiment {
    score_keywords(text).sentiment()
}
