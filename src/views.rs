//! HTML pages for the form and the results.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::analyzer::AnalysisRun;
use crate::sentiment::Sentiment;

/// Form page state.
#[derive(Debug, Default)]
pub struct IndexPage<'a> {
    pub warning: Option<&'a str>,
    pub error: Option<&'a str>,
    pub url: &'a str,
    pub max_comments: usize,
    pub use_fallback: bool,
}

/// Results page state.
#[derive(Debug)]
pub struct ResultsPage<'a> {
    pub run: &'a AnalysisRun,
    pub warning: Option<&'a str>,
    pub export_file: Option<&'a str>,
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<main class="container">
<h1>YouTube Comment Sentiment Analysis</h1>
{body}
</main>
</body>
</html>"#,
        title = encode_text(title),
        body = body,
    )
}

fn alert(class: &str, message: Option<&str>) -> String {
    message
        .map(|m| format!(r#"<div class="alert {}">{}</div>"#, class, encode_text(m)))
        .unwrap_or_default()
}

pub fn render_index(page: &IndexPage) -> String {
    let body = format!(
        r#"{warning}
{error}
<form method="post" action="/" class="card">
  <label for="youtube_url">YouTube video URL</label>
  <input type="url" id="youtube_url" name="youtube_url" required placeholder="https://www.youtube.com/watch?v=..." value="{url}">
  <label for="max_comments">Maximum comments</label>
  <input type="number" id="max_comments" name="max_comments" min="1" value="{max_comments}">
  <label class="checkbox"><input type="checkbox" name="use_fallback"{checked}> Use keyword-based analysis only</label>
  <button type="submit">Analyze</button>
</form>"#,
        warning = alert("warning", page.warning),
        error = alert("error", page.error),
        url = encode_double_quoted_attribute(page.url),
        max_comments = page.max_comments,
        checked = if page.use_fallback { " checked" } else { "" },
    );
    layout("YouTube Comment Sentiment Analysis", &body)
}

fn sentiment_class(sentiment: Option<Sentiment>) -> &'static str {
    match sentiment {
        Some(Sentiment::Good) => "good",
        Some(Sentiment::Bad) => "bad",
        _ => "neutral",
    }
}

pub fn render_results(page: &ResultsPage) -> String {
    let run = page.run;
    let stats = &run.stats;

    let rows: String = run
        .comments
        .iter()
        .map(|c| {
            format!(
                r#"<tr class="{class}"><td>{author}</td><td>{text}</td><td>{likes}</td><td>{published}</td><td>{sentiment}</td></tr>
"#,
                class = sentiment_class(c.sentiment),
                author = encode_text(&c.author),
                text = encode_text(&c.text),
                likes = c.like_count,
                published = c.published_at.format("%Y-%m-%d %H:%M"),
                sentiment = c.sentiment.map(|s| s.as_str()).unwrap_or("Neutral"),
            )
        })
        .collect();

    let download = match page.export_file {
        Some(name) => format!(
            r#"<a class="button" href="/download/{}">Download spreadsheet</a>"#,
            encode_double_quoted_attribute(name)
        ),
        None => r#"<p class="muted">Spreadsheet export is unavailable for this run.</p>"#.to_string(),
    };

    let body = format!(
        r#"{warning}
{quota}
<section class="card stats">
  <p>Analysis method: <strong>{method}</strong></p>
  <p>Total comments: <strong>{total}</strong></p>
  <ul>
    <li class="good">Good: {good} ({good_percent:.1}%)</li>
    <li class="bad">Bad: {bad} ({bad_percent:.1}%)</li>
    <li class="neutral">Neutral: {neutral} ({neutral_percent:.1}%)</li>
  </ul>
  {download}
</section>
<table>
<thead><tr><th>Author</th><th>Comment</th><th>Likes</th><th>Published</th><th>Sentiment</th></tr></thead>
<tbody>
{rows}</tbody>
</table>
<p><a href="/">Analyze another video</a></p>"#,
        warning = alert("warning", page.warning),
        quota = alert("info", run.quota_notice.as_deref()),
        method = run.method,
        total = stats.total,
        good = stats.good,
        good_percent = stats.good_percent,
        bad = stats.bad,
        bad_percent = stats.bad_percent,
        neutral = stats.neutral,
        neutral_percent = stats.neutral_percent,
        download = download,
        rows = rows,
    );
    layout("Sentiment Results", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{Method, Stats};
    use crate::youtube::Comment;
    use chrono::Utc;

    fn run() -> AnalysisRun {
        let mut comment = Comment::new("<script>", "nice & <b>bold</b>", 2, Utc::now());
        comment.sentiment = Some(Sentiment::Good);
        let comments = vec![comment];
        AnalysisRun {
            stats: Stats::from_comments(&comments),
            comments,
            method: Method::KeywordFallback,
            quota_notice: Some("API quota exceeded. Using fallback sentiment analysis method.".into()),
        }
    }

    #[test]
    fn test_index_shows_warning_and_error() {
        let html = render_index(&IndexPage {
            warning: Some("Gemini API is not available"),
            error: Some("Invalid YouTube URL"),
            url: "\"><script>",
            max_comments: 50,
            use_fallback: true,
        });
        assert!(html.contains("Gemini API is not available"));
        assert!(html.contains("Invalid YouTube URL"));
        assert!(html.contains(r#"value="50""#));
        assert!(html.contains(" checked"));
        assert!(!html.contains("\"><script>"));
    }

    #[test]
    fn test_results_escape_comment_text() {
        let run = run();
        let html = render_results(&ResultsPage {
            run: &run,
            warning: None,
            export_file: Some("youtube_comments.xlsx"),
        });
        assert!(html.contains("nice &amp; &lt;b&gt;bold&lt;/b&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("keyword-based"));
        assert!(html.contains("API quota exceeded"));
        assert!(html.contains("/download/youtube_comments.xlsx"));
        assert!(html.contains("Good: 1 (100.0%)"));
    }

    #[test]
    fn test_results_without_export() {
        let run = run();
        let html = render_results(&ResultsPage { run: &run, warning: None, export_file: None });
        assert!(html.contains("Spreadsheet export is unavailable"));
    }
}
