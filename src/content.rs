use std::sync::LazyLock;

use anyhow::Result;
use chrono::Local;
use log::{debug, info};
use regex::Regex;

use crate::ai_client::{TextParams, TextService};
use crate::config::Settings;
use crate::error::GenerateError;
use crate::models::Article;
use crate::sequence::image_file_name;
use crate::template::fill_template;

pub const TITLE_TEMPLATE: &str = "titleTranslation";
pub const PERSON_TEMPLATE: &str = "personExtraction";
pub const ARTICLE_TEMPLATE: &str = "articleSummary";

const TITLE_TEMPERATURE: f32 = 0.7;
const TITLE_MAX_TOKENS: u32 = 200;
const PERSON_TEMPERATURE: f32 = 0.2;
const PERSON_MAX_TOKENS: u32 = 50;
const ARTICLE_TEMPERATURE: f32 = 0.8;
const ARTICLE_MAX_TOKENS: u32 = 4000;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\n]+").unwrap());

/// Runs the three text prompts for one article against a [`TextService`].
pub struct ContentGenerator<'a, T: TextService + ?Sized> {
    settings: &'a Settings,
    service: &'a T,
    category: &'a str,
}

impl<'a, T: TextService + ?Sized> ContentGenerator<'a, T> {
    pub fn new(settings: &'a Settings, service: &'a T, category: &'a str) -> Self {
        ContentGenerator {
            settings,
            service,
            category,
        }
    }

    pub async fn translate_title(&self, article: &Article) -> Result<String> {
        let text = self
            .run(TITLE_TEMPLATE, article, TITLE_TEMPERATURE, TITLE_MAX_TOKENS)
            .await?;
        let title = text.trim().to_string();
        info!("Translated title: {}", title);
        Ok(title)
    }

    /// `None` when the service answers with the configured no-person token.
    pub async fn extract_person(&self, article: &Article) -> Result<Option<String>> {
        let text = self
            .run(PERSON_TEMPLATE, article, PERSON_TEMPERATURE, PERSON_MAX_TOKENS)
            .await?;
        let name = text.trim();

        if name.is_empty() || name == self.settings.content_config.no_person_token {
            debug!("No person found in article");
            return Ok(None);
        }

        info!("Person mentioned: {}", name);
        Ok(Some(name.to_string()))
    }

    pub async fn write_article(&self, article: &Article, image_tag: &str) -> Result<String> {
        let raw = self
            .run(ARTICLE_TEMPLATE, article, ARTICLE_TEMPERATURE, ARTICLE_MAX_TOKENS)
            .await?;
        if raw.trim().is_empty() {
            return Err(GenerateError::EmptyResponse(ARTICLE_TEMPLATE.to_string()).into());
        }

        let html = normalize_article_html(&raw, image_tag);
        debug!("Article HTML is {} chars", html.len());
        Ok(html)
    }

    async fn run(
        &self,
        name: &str,
        article: &Article,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let template = self
            .settings
            .prompts
            .get(name)
            .ok_or_else(|| GenerateError::MissingTemplate(name.to_string()))?;

        let config = &self.settings.content_config;
        let word_count_min = config.word_count_min.to_string();
        let word_count_max = config.word_count_max.to_string();
        let date = Local::now().date_naive().format("%Y-%m-%d").to_string();

        let prompt = fill_template(
            name,
            template,
            &[
                ("title", article.title.as_str()),
                ("summary", article.summary.as_str()),
                ("link", article.link.as_str()),
                ("category", self.category),
                ("wordCountMin", word_count_min.as_str()),
                ("wordCountMax", word_count_max.as_str()),
                ("date", date.as_str()),
            ],
        )?;

        let params = TextParams {
            model: config.text_model.clone(),
            temperature,
            max_tokens,
        };
        debug!("Running {} prompt", name);
        self.service.complete(&prompt, &params).await
    }
}

/// `<img>` tag pointing at the image generated for `id`.
pub fn image_tag(image_path: &str, id: u64, alt: &str) -> String {
    format!(
        r#"<img src="{}{}" alt="{}">"#,
        image_path,
        image_file_name(id),
        escape_attribute(alt)
    )
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Turn the model's article into a single-line HTML block.
///
/// Strips a surrounding code fence, places `image_tag` right after the first
/// `</p>` (or in front when there is no paragraph), then folds newlines and
/// runs of spaces into single spaces.
pub fn normalize_article_html(raw: &str, image_tag: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```html") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();

    let with_image = match text.find("</p>") {
        Some(idx) => {
            let (head, tail) = text.split_at(idx + "</p>".len());
            format!("{head}{image_tag}{tail}")
        }
        None => format!("{image_tag}{text}"),
    };

    WHITESPACE_RUN
        .replace_all(&with_image, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Replies with a canned answer per template and records every call.
    struct MockText {
        replies: HashMap<&'static str, &'static str>,
        calls: Mutex<Vec<(String, TextParams)>>,
    }

    impl MockText {
        fn new(replies: &[(&'static str, &'static str)]) -> Self {
            MockText {
                replies: replies.iter().copied().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextService for MockText {
        async fn complete(&self, prompt: &str, params: &TextParams) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), params.clone()));
            let reply = self
                .replies
                .iter()
                .find(|(key, _)| prompt.starts_with(*key))
                .map(|(_, reply)| reply.to_string())
                .unwrap_or_default();
            Ok(reply)
        }
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.prompts = HashMap::from([
            (TITLE_TEMPLATE.to_string(), "TITLE {title}".to_string()),
            (PERSON_TEMPLATE.to_string(), "PERSON {title} / {summary}".to_string()),
            (
                ARTICLE_TEMPLATE.to_string(),
                "ARTICLE {category} {wordCountMin}-{wordCountMax} {title} {link}".to_string(),
            ),
        ]);
        settings
    }

    fn article() -> Article {
        Article {
            title: "Fed holds rates".to_string(),
            summary: "Powell signals patience.".to_string(),
            link: "https://news.example/fed".to_string(),
        }
    }

    #[test]
    fn test_normalize_strips_fences_and_inserts_image() {
        let out = normalize_article_html("```html<p>A</p>B```", r#"<img src="X">"#);
        assert_eq!(out, r#"<p>A</p><img src="X">B"#);
    }

    #[test]
    fn test_normalize_without_paragraph_prepends_image() {
        let out = normalize_article_html("```\nplain text\n```", "<img>");
        assert_eq!(out, "<img>plain text");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        let raw = "<p>First\nline</p>\n\n<p>Second    para</p>\n";
        let out = normalize_article_html(raw, "<img>");
        assert_eq!(out, "<p>First line</p><img> <p>Second para</p>");
        assert!(!out.contains('\n'));
        assert!(!out.contains("  "));
    }

    #[test]
    fn test_normalize_only_first_paragraph_gets_image() {
        let out = normalize_article_html("<p>A</p><p>B</p>", "<img>");
        assert_eq!(out, "<p>A</p><img><p>B</p>");
    }

    #[test]
    fn test_image_tag_escapes_alt() {
        assert_eq!(
            image_tag("img/content/", 7, r#"Fed "holds" <rates>"#),
            r#"<img src="img/content/7.jpg" alt="Fed &quot;holds&quot; &lt;rates&gt;">"#
        );
    }

    #[tokio::test]
    async fn test_translate_title_trims_and_fills_prompt() {
        let settings = settings();
        let service = MockText::new(&[("TITLE", "  聯準會按兵不動 \n")]);
        let generator = ContentGenerator::new(&settings, &service, "美股");

        let title = generator.translate_title(&article()).await.unwrap();
        assert_eq!(title, "聯準會按兵不動");

        let calls = service.calls.lock().unwrap();
        assert_eq!(calls[0].0, "TITLE Fed holds rates");
        assert_eq!(calls[0].1.temperature, TITLE_TEMPERATURE);
        assert_eq!(calls[0].1.model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_extract_person_sentinel_means_absent() {
        let settings = settings();
        let service = MockText::new(&[("PERSON", " 無 ")]);
        let generator = ContentGenerator::new(&settings, &service, "美股");
        assert_eq!(generator.extract_person(&article()).await.unwrap(), None);

        let service = MockText::new(&[("PERSON", "Jerome Powell\n")]);
        let generator = ContentGenerator::new(&settings, &service, "美股");
        assert_eq!(
            generator.extract_person(&article()).await.unwrap(),
            Some("Jerome Powell".to_string())
        );
        assert_eq!(
            service.calls.lock().unwrap()[0].1.temperature,
            PERSON_TEMPERATURE
        );
    }

    #[tokio::test]
    async fn test_extract_person_uses_configured_token() {
        let mut settings = settings();
        settings.content_config.no_person_token = "None".to_string();
        let service = MockText::new(&[("PERSON", "None")]);
        let generator = ContentGenerator::new(&settings, &service, "美股");
        assert_eq!(generator.extract_person(&article()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_article_normalizes_output() {
        let settings = settings();
        let service = MockText::new(&[("ARTICLE", "```html\n<p>Intro</p>\n<p>Body</p>\n```")]);
        let generator = ContentGenerator::new(&settings, &service, "美股");

        let html = generator.write_article(&article(), "<img>").await.unwrap();
        assert_eq!(html, "<p>Intro</p><img> <p>Body</p>");

        let calls = service.calls.lock().unwrap();
        assert_eq!(
            calls[0].0,
            "ARTICLE 美股 1200-2000 Fed holds rates https://news.example/fed"
        );
        assert_eq!(calls[0].1.max_tokens, ARTICLE_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_write_article_rejects_empty_response() {
        let settings = settings();
        let service = MockText::new(&[("ARTICLE", "  ")]);
        let generator = ContentGenerator::new(&settings, &service, "美股");

        let err = generator.write_article(&article(), "<img>").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<GenerateError>(),
            Some(&GenerateError::EmptyResponse(ARTICLE_TEMPLATE.to_string()))
        );
    }

    #[tokio::test]
    async fn test_missing_template_fails_every_operation() {
        let settings = Settings::default();
        let service = MockText::new(&[]);
        let generator = ContentGenerator::new(&settings, &service, "美股");

        let title = generator.translate_title(&article()).await.unwrap_err();
        let person = generator.extract_person(&article()).await.unwrap_err();
        let body = generator.write_article(&article(), "<img>").await.unwrap_err();

        for (err, name) in [
            (title, TITLE_TEMPLATE),
            (person, PERSON_TEMPLATE),
            (body, ARTICLE_TEMPLATE),
        ] {
            assert_eq!(
                err.downcast_ref::<GenerateError>(),
                Some(&GenerateError::MissingTemplate(name.to_string()))
            );
        }
        assert!(service.calls.lock().unwrap().is_empty());
    }
}
