use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::json;
use tiktoken_rs::{o200k_base, CoreBPE};

use crate::ai_client::ModelHandle;
use crate::error::ModelError;
use crate::models::{NewsDocument, Summary};

/// Article bodies beyond this are cut before prompting.
const MAX_BODY_TOKENS: usize = 3_000;

const SUMMARY_PROMPT: &str = r#"
You are a marketing analyst's assistant. You receive one news article.

Summarize the article in two to three sentences. Keep the facts that matter to a marketer:
what happened, who is involved, and why consumers or brands might care.
Do not invent details that are not in the article. If only the headline is available,
summarize what the headline reports without speculating.

Return only a JSON object with this structure:
{ "summary": string }
"#;

#[derive(Debug, Deserialize)]
struct RawAiSummary {
    summary: String,
}

/// Turns one news document into a short summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, document: &NewsDocument) -> Result<Summary, ModelError>;
}

pub struct OpenAiSummarizer {
    model: ModelHandle,
    bpe: CoreBPE,
}

impl OpenAiSummarizer {
    pub fn new(model: ModelHandle) -> anyhow::Result<Self> {
        let bpe = o200k_base()?;
        Ok(OpenAiSummarizer { model, bpe })
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, document: &NewsDocument) -> Result<Summary, ModelError> {
        let body = truncate_to_tokens(&self.bpe, &document.body, MAX_BODY_TOKENS);
        let user_prompt = article_prompt(document, &body);
        debug!(
            "Summarizing '{}' ({} prompt characters)",
            document.title,
            user_prompt.len()
        );

        let schema = json!({
          "type": "object",
          "properties": {
            "summary": { "type": "string" }
          },
          "required": ["summary"],
          "additionalProperties": false
        });

        let request = self.model.request(
            SUMMARY_PROMPT.to_string(),
            user_prompt,
            400,
            Some(("news_summary", schema)),
        )?;
        let content = self.model.complete(request).await?;
        parse_summary(&content)
    }
}

/// `body` is the document body after token truncation.
pub fn article_prompt(document: &NewsDocument, body: &str) -> String {
    let mut prompt = format!("Headline: {}", document.title);
    if let Some(domain) = &document.domain {
        prompt.push_str(&format!("\nSource: {}", domain));
    }
    if let Some(seen_at) = document.seen_at {
        prompt.push_str(&format!("\nPublished: {}", seen_at.format("%Y-%m-%d")));
    }

    let body = body.trim();
    if body.is_empty() {
        prompt.push_str("\n\nArticle text: (not available)");
    } else {
        prompt.push_str(&format!("\n\nArticle text:\n{}", body));
    }
    prompt
}

fn parse_summary(content: &str) -> Result<Summary, ModelError> {
    let raw: RawAiSummary =
        serde_json::from_str(content).map_err(|e| ModelError::ParseError(e.to_string()))?;
    let summary = raw.summary.trim();
    if summary.is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(Summary(summary.to_string()))
}

fn truncate_to_tokens(bpe: &CoreBPE, text: &str, max_tokens: usize) -> String {
    if max_tokens == 0 || text.is_empty() {
        return String::new();
    }
    let ids = bpe.encode_with_special_tokens(text);
    if ids.len() <= max_tokens {
        return text.to_string();
    }
    debug!("Cutting article body from {} to {} tokens", ids.len(), max_tokens);
    bpe.decode(ids[..max_tokens].to_vec()).unwrap_or_default()
}
