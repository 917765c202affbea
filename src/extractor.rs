use anyhow::{anyhow, Result};
use log::debug;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::utils::clean_html_tags;

const MIN_PARAGRAPH_CHARS: usize = 40;

const BOILERPLATE: &[&str] = &[
    "READ MORE",
    "Read more:",
    "Sign up for",
    "Subscribe to",
    "newsletter",
    "Follow us on",
    "All rights reserved",
    "© Copyright",
    "Cookie",
    "cookies",
    "Advertisement",
];

/// Text pulled from an article page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: String,
}

impl ExtractedArticle {
    /// Body text if we found any, otherwise the meta description.
    pub fn best_text(&self) -> String {
        if !self.body.is_empty() {
            self.body.clone()
        } else {
            self.description.clone().unwrap_or_default()
        }
    }
}

pub async fn fetch_article(client: &Client, url: &Url) -> Result<ExtractedArticle> {
    let response = client.get(url.as_str()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("{} returned status {}", url, status));
    }
    let html = response.text().await?;
    let article = extract_article(&html);
    debug!(
        "Extracted {} body characters from {}",
        article.body.len(),
        url
    );
    Ok(article)
}

pub fn extract_article(html: &str) -> ExtractedArticle {
    let document = Html::parse_document(html);

    let meta_selector = Selector::parse("head meta").unwrap();
    let mut title = None;
    let mut description = None;

    for tag in document.select(&meta_selector) {
        let property = tag.value().attr("property").or(tag.value().attr("name"));
        let content = tag.value().attr("content").unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        match property {
            Some("og:title") => title = Some(clean_html_tags(content)),
            Some("og:description") => description = Some(clean_html_tags(content)),
            Some("description") if description.is_none() => {
                description = Some(clean_html_tags(content))
            }
            _ => {}
        }
    }

    let container_selector = Selector::parse("article, main, .post, .entry, .article-body").unwrap();
    let paragraph_selector = Selector::parse("p").unwrap();

    let mut paragraphs: Vec<String> = document
        .select(&container_selector)
        .map(|container| {
            container
                .select(&paragraph_selector)
                .filter_map(|p| keep_paragraph(&p.inner_html()))
                .collect::<Vec<_>>()
        })
        .find(|found| !found.is_empty())
        .unwrap_or_default();

    // No recognizable container, fall back to every paragraph on the page
    if paragraphs.is_empty() {
        paragraphs = document
            .select(&paragraph_selector)
            .filter_map(|p| keep_paragraph(&p.inner_html()))
            .collect();
    }

    ExtractedArticle {
        title,
        description,
        body: paragraphs.join("\n\n"),
    }
}

fn keep_paragraph(inner_html: &str) -> Option<String> {
    let text = clean_html_tags(inner_html);
    if text.chars().count() < MIN_PARAGRAPH_CHARS {
        return None;
    }
    if BOILERPLATE.iter().any(|phrase| text.contains(phrase)) {
        return None;
    }
    Some(text)
}
