use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};

use crate::ai_summarizer::Summarizer;
use crate::error::PipelineError;
use crate::models::{Keywords, NewsDocument, Report, ReportEntry, TimeWindow};
use crate::retriever::NewsFeed;

pub const MIN_RECORDS: u32 = 1;
pub const MAX_RECORDS: u32 = 20;
pub const DEFAULT_WINDOW_DAYS: u32 = 5;

/// What one "summarize news" submission asks for.
#[derive(Debug, Clone)]
pub struct NewsRequest {
    pub keywords: Vec<String>,
    pub max_records: u32,
    pub window_days: u32,
}

impl NewsRequest {
    pub fn new(keywords: Vec<String>, max_records: u32) -> Self {
        NewsRequest {
            keywords,
            max_records,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

/// Retrieve the news for the requested keywords and summarize every article.
///
/// Runs strictly in order: validate, retrieve, then one summary per document.
/// A document whose summary fails keeps its slot in the report with the
/// failure reason instead of aborting the rest.
pub async fn build_report<F, S>(
    feed: &F,
    summarizer: &S,
    request: &NewsRequest,
    now: DateTime<Utc>,
) -> Result<(Keywords, Report), PipelineError>
where
    F: NewsFeed + ?Sized,
    S: Summarizer + ?Sized,
{
    let keywords = Keywords::parse(&request.keywords)?;
    if !(MIN_RECORDS..=MAX_RECORDS).contains(&request.max_records) {
        return Err(PipelineError::MaxRecordsOutOfRange(request.max_records));
    }

    let window = TimeWindow::trailing_days(now, request.window_days);
    info!(
        "Retrieving up to {} articles for '{}' between {} and {}",
        request.max_records,
        keywords.joined(),
        window.start_compact(),
        window.end_compact()
    );

    let documents = match feed.search(&keywords, &window, request.max_records).await {
        Ok(documents) if documents.is_empty() => {
            info!("No articles matched '{}'", keywords.joined());
            return Err(PipelineError::NoArticles);
        }
        Ok(documents) => documents,
        Err(e) => {
            error!("News retrieval failed for '{}': {}", keywords.joined(), e);
            return Err(e.into());
        }
    };

    let entries = summarize_in_order(summarizer, documents).await;
    let report = Report {
        header: Report::header_for(&keywords),
        entries,
    };

    info!(
        "Report ready: {} articles, {} without a summary",
        report.entries.len(),
        report.failed_count()
    );
    Ok((keywords, report))
}

async fn summarize_in_order<S>(summarizer: &S, documents: Vec<NewsDocument>) -> Vec<ReportEntry>
where
    S: Summarizer + ?Sized,
{
    // `then` awaits each future before pulling the next document
    stream::iter(documents.into_iter().enumerate())
        .then(|(i, document)| async move {
            debug!("Summarizing document {}: {}", i, document.title);
            let summary = summarizer.summarize(&document).await.map_err(|e| {
                warn!("Summary failed for '{}': {}", document.title, e);
                e.to_string()
            });
            ReportEntry {
                title: document.title,
                summary,
            }
        })
        .collect()
        .await
}
