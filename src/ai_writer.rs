use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use log::{debug, info};

use crate::ai_client::ModelHandle;
use crate::models::Report;
use crate::utils::truncate_chars;

const SOCIAL_POST_MAX_CHARS: usize = 280;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContentKind {
    BlogPost,
    Article,
    ProductDescription,
    SocialMediaPost,
    Email,
}

impl ContentKind {
    fn describe(self) -> &'static str {
        match self {
            ContentKind::BlogPost => "a blog post of four to six paragraphs",
            ContentKind::Article => "an informative article with a headline",
            ContentKind::ProductDescription => "a product description of one or two paragraphs",
            ContentKind::SocialMediaPost => "a social media post under 280 characters",
            ContentKind::Email => "a marketing email with a subject line",
        }
    }
}

/// Inputs for a piece of marketing copy.
#[derive(Debug, Clone)]
pub struct MarketingBrief {
    pub kind: ContentKind,
    pub topic: String,
    pub audience: Option<String>,
    pub tone: Option<String>,
    pub translate_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedText {
    pub text: String,
    pub translation: Option<Translation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub language: String,
    pub text: String,
}

const WRITER_PROMPT: &str = "You are an experienced marketing copywriter. \
Write clear, persuasive copy. Avoid clickbait and unverifiable claims. \
Return only the requested text, without preamble.";

pub fn brief_prompt(brief: &MarketingBrief) -> String {
    let mut prompt = format!("Write {} about: {}.", brief.kind.describe(), brief.topic.trim());
    if let Some(audience) = brief.audience.as_deref().filter(|a| !a.trim().is_empty()) {
        prompt.push_str(&format!("\nTarget audience: {}.", audience.trim()));
    }
    if let Some(tone) = brief.tone.as_deref().filter(|t| !t.trim().is_empty()) {
        prompt.push_str(&format!("\nTone of voice: {}.", tone.trim()));
    }
    prompt
}

pub async fn generate_marketing_text(model: &ModelHandle, brief: &MarketingBrief) -> Result<GeneratedText> {
    if brief.topic.trim().is_empty() {
        return Err(anyhow!("Describe what the copy should be about"));
    }

    let request = model.request(WRITER_PROMPT.to_string(), brief_prompt(brief), 1200, None)?;
    let text = model
        .complete(request)
        .await
        .context("Marketing text generation failed")?;
    info!("Generated {} characters of {:?}", text.len(), brief.kind);

    let translation = match brief.translate_to.as_deref().filter(|l| !l.trim().is_empty()) {
        Some(language) => Some(Translation {
            language: language.trim().to_string(),
            text: translate(model, &text, language).await?,
        }),
        None => None,
    };

    Ok(GeneratedText { text, translation })
}

pub async fn translate(model: &ModelHandle, text: &str, language: &str) -> Result<String> {
    let language = language.trim();
    if language.is_empty() {
        return Err(anyhow!("Target language is empty"));
    }
    if text.trim().is_empty() {
        return Ok(String::new());
    }

    let system_prompt = format!(
        "You are a professional translator. Translate the user's text into {}. \
         Keep formatting, names and hashtags. Return only the translation.",
        language
    );
    debug!("Translating {} characters into {}", text.len(), language);
    let request = model.request(system_prompt, text.to_string(), 2000, None)?;
    model
        .complete(request)
        .await
        .with_context(|| format!("Translation into {} failed", language))
}

/// The report's summaries as a prompt for a social post.
pub fn social_post_prompt(report: &Report) -> Option<String> {
    let bullets: Vec<String> = report
        .summaries()
        .map(|(title, summary)| format!("- {}: {}", title, summary.0))
        .collect();
    if bullets.is_empty() {
        return None;
    }
    Some(format!(
        "{}\n\n{}\n\nWrite one engaging social media post (at most {} characters, \
         one or two hashtags) that highlights the most interesting of these stories.",
        report.header, bullets.join("\n"), SOCIAL_POST_MAX_CHARS
    ))
}

pub async fn compose_social_post(model: &ModelHandle, report: &Report) -> Result<String> {
    let prompt = social_post_prompt(report)
        .ok_or_else(|| anyhow!("The report has no summaries to post about"))?;
    let request = model.request(WRITER_PROMPT.to_string(), prompt, 200, None)?;
    let post = model
        .complete(request)
        .await
        .context("Social post generation failed")?;
    Ok(finish_social_post(&post))
}

/// Strips wrapping quotes and enforces the post length limit.
fn finish_social_post(raw: &str) -> String {
    truncate_chars(raw.trim().trim_matches('"'), SOCIAL_POST_MAX_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportEntry, Summary};

    #[test]
    fn brief_prompt_includes_optional_fields() {
        let brief = MarketingBrief {
            kind: ContentKind::ProductDescription,
            topic: " waterproof trail shoes ".into(),
            audience: Some("weekend hikers".into()),
            tone: Some("  ".into()),
            translate_to: None,
        };
        let prompt = brief_prompt(&brief);
        assert!(prompt.starts_with("Write a product description"));
        assert!(prompt.contains("about: waterproof trail shoes."));
        assert!(prompt.contains("Target audience: weekend hikers."));
        assert!(!prompt.contains("Tone of voice"));
    }

    #[test]
    fn social_prompt_skips_failed_summaries() {
        let report = Report {
            header: "Summaries of news articles with the keywords: fashion".into(),
            entries: vec![
                ReportEntry {
                    title: "Coats sell out".into(),
                    summary: Ok(Summary("Retailers ran out of coats.".into())),
                },
                ReportEntry {
                    title: "Broken".into(),
                    summary: Err("timed out".into()),
                },
            ],
        };
        let prompt = social_post_prompt(&report).unwrap();
        assert!(prompt.contains("- Coats sell out: Retailers ran out of coats."));
        assert!(!prompt.contains("Broken"));

        let all_failed = Report {
            header: "h".into(),
            entries: vec![ReportEntry {
                title: "Broken".into(),
                summary: Err("timed out".into()),
            }],
        };
        assert!(social_post_prompt(&all_failed).is_none());
    }

    #[test]
    fn social_post_fits_the_limit() {
        let long = format!("\"{}\"", "Autumn coats are back. ".repeat(20));
        let post = finish_social_post(&long);
        assert!(post.chars().count() <= SOCIAL_POST_MAX_CHARS);
        assert!(!post.starts_with('"'));

        assert_eq!(finish_social_post(" \"Coats are back #fall\" "), "Coats are back #fall");
    }
}
