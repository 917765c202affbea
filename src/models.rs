use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::fmt;
use url::Url;

use crate::error::PipelineError;

/// Format GDELT expects for its `startdatetime` / `enddatetime` parameters.
pub const COMPACT_TIMESTAMP: &str = "%Y%m%d%H%M%S";

pub const MAX_KEYWORDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchTerm(pub String);

impl SearchTerm {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Top search terms for the date the user asked about.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendResult {
    pub date: NaiveDate,
    pub terms: Vec<SearchTerm>,
}

impl TrendResult {
    pub fn display_line(&self) -> String {
        let terms = self
            .terms
            .iter()
            .map(SearchTerm::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        format!("Top search term for date {} is: {}", self.date.format("%Y-%m-%d"), terms)
    }
}

/// Closed time range, whole-second precision. `end` is never before `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// The `days` days leading up to `now`.
    pub fn trailing_days(now: DateTime<Utc>, days: u32) -> Self {
        TimeWindow {
            start: truncate_to_second(now - Duration::days(i64::from(days))),
            end: truncate_to_second(now),
        }
    }

    pub fn start_compact(&self) -> String {
        self.start.format(COMPACT_TIMESTAMP).to_string()
    }

    pub fn end_compact(&self) -> String {
        self.end.format(COMPACT_TIMESTAMP).to_string()
    }
}

fn truncate_to_second(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.timestamp(), 0).unwrap_or(ts)
}

/// One to three non-empty keywords, in the order the user typed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keywords(Vec<String>);

impl Keywords {
    /// Blank inputs are dropped; at least one keyword must remain.
    pub fn parse<I, S>(raw: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw: Vec<String> = raw.into_iter().map(|s| s.as_ref().to_string()).collect();
        if raw.len() > MAX_KEYWORDS {
            return Err(PipelineError::TooManyKeywords(raw.len()));
        }

        let keywords: Vec<String> = raw
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();

        if keywords.is_empty() {
            return Err(PipelineError::MissingKeyword);
        }
        Ok(Keywords(keywords))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn joined(&self) -> String {
        self.0.join(" ")
    }

    /// Case-insensitive match against any keyword.
    pub fn mentioned_in(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.0.iter().any(|k| haystack.contains(&k.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsDocument {
    pub title: String,
    pub body: String,
    pub url: Option<Url>,
    pub domain: Option<String>,
    pub seen_at: Option<DateTime<Utc>>,
}

impl NewsDocument {
    pub fn mentions_any(&self, keywords: &Keywords) -> bool {
        keywords.mentioned_in(&self.title) || keywords.mentioned_in(&self.body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary(pub String);

#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub title: String,
    /// `Err` holds the reason the document could not be summarized.
    pub summary: Result<Summary, String>,
}

impl ReportEntry {
    pub fn display(&self) -> String {
        match &self.summary {
            Ok(summary) => format!("Original Headline: {}.\nSummary: {}", self.title, summary.0),
            Err(reason) => format!(
                "Original Headline: {}.\nSummary unavailable: {}",
                self.title, reason
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub header: String,
    pub entries: Vec<ReportEntry>,
}

impl Report {
    pub fn header_for(keywords: &Keywords) -> String {
        format!(
            "Summaries of news articles with the keywords: {}",
            keywords.joined()
        )
    }

    /// Header first, then one string per document in retrieval order.
    pub fn lines(&self) -> Vec<String> {
        std::iter::once(self.header.clone())
            .chain(self.entries.iter().map(ReportEntry::display))
            .collect()
    }

    pub fn summaries(&self) -> impl Iterator<Item = (&str, &Summary)> {
        self.entries
            .iter()
            .filter_map(|e| e.summary.as_ref().ok().map(|s| (e.title.as_str(), s)))
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.summary.is_err()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn keywords_drop_blank_inputs() {
        let keywords = Keywords::parse(["fashion", "", "  "]).unwrap();
        assert_eq!(keywords.iter().collect::<Vec<_>>(), vec!["fashion"]);
    }

    #[test]
    fn keywords_require_one_non_empty() {
        let err = Keywords::parse(["", "", ""]).unwrap_err();
        assert!(matches!(err, PipelineError::MissingKeyword));
    }

    #[test]
    fn keywords_reject_more_than_three() {
        let err = Keywords::parse(["a", "b", "c", "d"]).unwrap_err();
        assert!(matches!(err, PipelineError::TooManyKeywords(4)));
    }

    #[test]
    fn keyword_match_ignores_case() {
        let keywords = Keywords::parse(["Fashion", "shoes"]).unwrap();
        assert!(keywords.mentioned_in("Paris FASHION week opens"));
        assert!(!keywords.mentioned_in("Stock market news"));
    }

    #[test]
    fn trailing_window_formats_compactly() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 13, 45, 7).unwrap()
            + Duration::milliseconds(250);
        let window = TimeWindow::trailing_days(now, 5);
        assert_eq!(window.start_compact(), "20240505134507");
        assert_eq!(window.end_compact(), "20240510134507");
        assert!(window.end_compact() >= window.start_compact());

        let empty = TimeWindow::trailing_days(now, 0);
        assert_eq!(empty.start_compact(), empty.end_compact());
    }

    #[test]
    fn report_lines_are_header_plus_entries() {
        let keywords = Keywords::parse(["fashion", "", "shoes"]).unwrap();
        let report = Report {
            header: Report::header_for(&keywords),
            entries: vec![
                ReportEntry {
                    title: "A".into(),
                    summary: Ok(Summary("first".into())),
                },
                ReportEntry {
                    title: "B".into(),
                    summary: Err("model timed out".into()),
                },
            ],
        };

        let lines = report.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Summaries of news articles with the keywords: fashion shoes"
        );
        assert_eq!(lines[1], "Original Headline: A.\nSummary: first");
        assert!(lines[2].contains("Summary unavailable: model timed out"));
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.summaries().count(), 1);
    }
}
