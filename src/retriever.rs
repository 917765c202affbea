//! News retrieval from the GDELT DOC 2.0 article search API.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::RetrievalError;
use crate::extractor::fetch_article;
use crate::models::{Keywords, NewsDocument, TimeWindow};
use crate::utils::clean_html_tags;

pub const GDELT_DOC_API: &str = "https://api.gdeltproject.org/api/v2/doc/doc";

const SEEN_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// A searchable source of news documents.
#[async_trait]
pub trait NewsFeed: Send + Sync {
    /// Up to `max_records` documents matching any keyword inside `window`.
    ///
    /// No matches is `Ok(vec![])`; only transport and decoding problems are errors.
    async fn search(
        &self,
        keywords: &Keywords,
        window: &TimeWindow,
        max_records: u32,
    ) -> Result<Vec<NewsDocument>, RetrievalError>;
}

#[derive(Debug, Deserialize)]
struct GdeltResponse {
    #[serde(default)]
    articles: Vec<GdeltArticle>,
}

#[derive(Debug, Deserialize)]
struct GdeltArticle {
    url: Option<String>,
    title: Option<String>,
    #[serde(rename = "seendate")]
    seen_date: Option<String>,
    domain: Option<String>,
}

pub struct GdeltFeed {
    client: Client,
    base_url: String,
    fetch_bodies: bool,
}

impl GdeltFeed {
    pub fn new(client: Client, fetch_bodies: bool) -> Self {
        GdeltFeed {
            client,
            base_url: GDELT_DOC_API.to_string(),
            fetch_bodies,
        }
    }

    async fn fetch_listing(
        &self,
        keywords: &Keywords,
        window: &TimeWindow,
        max_records: u32,
    ) -> Result<Vec<NewsDocument>, RetrievalError> {
        let query = build_query(keywords);
        debug!(
            "GDELT search: query='{}', window={}..{}, maxrecords={}",
            query,
            window.start_compact(),
            window.end_compact(),
            max_records
        );

        let max_records = max_records.to_string();
        let start = window.start_compact();
        let end = window.end_compact();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("query", query.as_str()),
                ("mode", "ArtList"),
                ("format", "json"),
                ("sort", "DateDesc"),
                ("maxrecords", max_records.as_str()),
                ("startdatetime", start.as_str()),
                ("enddatetime", end.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RetrievalError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RetrievalError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(RetrievalError::ApiError {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        parse_article_list(&body)
    }

    async fn attach_body(&self, document: &mut NewsDocument) {
        let Some(url) = document.url.clone() else {
            return;
        };
        match fetch_article(&self.client, &url).await {
            Ok(article) => {
                document.body = article.best_text();
                if document.title.is_empty() {
                    document.title = article.title.unwrap_or_default();
                }
            }
            Err(e) => warn!("Could not fetch article body from {}: {:?}", url, e),
        }
    }
}

#[async_trait]
impl NewsFeed for GdeltFeed {
    async fn search(
        &self,
        keywords: &Keywords,
        window: &TimeWindow,
        max_records: u32,
    ) -> Result<Vec<NewsDocument>, RetrievalError> {
        let mut documents = self.fetch_listing(keywords, window, max_records).await?;
        info!("GDELT returned {} articles", documents.len());

        if self.fetch_bodies {
            for document in documents.iter_mut() {
                self.attach_body(document).await;
            }
        }

        Ok(filter_documents(documents, keywords, max_records))
    }
}

/// GDELT wants OR'ed terms in parentheses and phrases in quotes.
pub fn build_query(keywords: &Keywords) -> String {
    let terms: Vec<String> = keywords
        .iter()
        .map(|k| {
            if k.contains(char::is_whitespace) {
                format!("\"{}\"", k.replace('"', ""))
            } else {
                k.to_string()
            }
        })
        .collect();

    if terms.len() == 1 {
        terms[0].clone()
    } else {
        format!("({})", terms.join(" OR "))
    }
}

fn parse_article_list(body: &str) -> Result<Vec<NewsDocument>, RetrievalError> {
    // Invalid queries come back as a 200 with a plain-text explanation
    let response: GdeltResponse = serde_json::from_str(body).map_err(|e| {
        RetrievalError::ParseError(format!("{}: {}", e, body.trim().chars().take(200).collect::<String>()))
    })?;

    let documents = response
        .articles
        .into_iter()
        .filter_map(|article| {
            let title = clean_html_tags(&article.title.unwrap_or_default());
            if title.is_empty() {
                return None;
            }
            Some(NewsDocument {
                title,
                body: String::new(),
                url: article.url.as_deref().and_then(|u| Url::parse(u).ok()),
                domain: article.domain.filter(|d| !d.is_empty()),
                seen_at: article.seen_date.as_deref().and_then(parse_seen_date),
            })
        })
        .collect();

    Ok(documents)
}

fn parse_seen_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, SEEN_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Drop documents that don't mention any keyword and enforce the cap.
pub fn filter_documents(
    documents: Vec<NewsDocument>,
    keywords: &Keywords,
    max_records: u32,
) -> Vec<NewsDocument> {
    let before = documents.len();
    let kept: Vec<NewsDocument> = documents
        .into_iter()
        .filter(|d| d.mentions_any(keywords))
        .take(max_records as usize)
        .collect();
    if kept.len() < before {
        debug!("Kept {} of {} documents after keyword filter", kept.len(), before);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"{
      "articles": [
        {
          "url": "https://example.com/fashion-week",
          "url_mobile": "",
          "title": "Fashion week opens in Paris",
          "seendate": "20240510T134500Z",
          "socialimage": "https://example.com/img.jpg",
          "domain": "example.com",
          "language": "English",
          "sourcecountry": "France"
        },
        {
          "url": "https://example.org/markets",
          "title": "Markets rally &amp; close higher",
          "seendate": "not a date",
          "domain": ""
        },
        {
          "url": "https://example.net/untitled",
          "title": "",
          "seendate": "20240510T120000Z"
        }
      ]
    }"#;

    fn doc(title: &str, body: &str) -> NewsDocument {
        NewsDocument {
            title: title.into(),
            body: body.into(),
            url: None,
            domain: None,
            seen_at: None,
        }
    }

    #[test]
    fn parses_article_list() {
        let documents = parse_article_list(SAMPLE).unwrap();
        assert_eq!(documents.len(), 2);

        let first = &documents[0];
        assert_eq!(first.title, "Fashion week opens in Paris");
        assert_eq!(first.domain.as_deref(), Some("example.com"));
        assert_eq!(
            first.seen_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 10, 13, 45, 0).unwrap())
        );
        assert_eq!(
            first.url.as_ref().map(Url::as_str),
            Some("https://example.com/fashion-week")
        );

        let second = &documents[1];
        assert_eq!(second.title, "Markets rally & close higher");
        assert!(second.seen_at.is_none());
        assert!(second.domain.is_none());
    }

    #[test]
    fn empty_object_means_no_matches() {
        assert!(parse_article_list("{}").unwrap().is_empty());
    }

    #[test]
    fn plain_text_reply_is_a_parse_error() {
        let err = parse_article_list("The specified phrase is too short.").unwrap_err();
        assert!(matches!(err, RetrievalError::ParseError(_)));
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn query_ors_keywords_and_quotes_phrases() {
        let single = Keywords::parse(["fashion", "", ""]).unwrap();
        assert_eq!(build_query(&single), "fashion");

        let several = Keywords::parse(["fashion", "street style", "shoes"]).unwrap();
        assert_eq!(build_query(&several), "(fashion OR \"street style\" OR shoes)");
    }

    #[test]
    fn filter_keeps_matching_documents_up_to_cap() {
        let keywords = Keywords::parse(["fashion", "", ""]).unwrap();
        let documents = vec![
            doc("Fashion trends for autumn", ""),
            doc("Election results", "Nothing relevant here"),
            doc("Retail update", "Fast fashion sales grew"),
            doc("FASHION brands", ""),
        ];

        let kept = filter_documents(documents, &keywords, 2);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].title, "Fashion trends for autumn");
        assert_eq!(kept[1].title, "Retail update");
        assert!(kept.iter().all(|d| d.mentions_any(&keywords)));
    }
}
