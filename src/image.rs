use anyhow::Result;
use log::{error, info};

use crate::ai_client::ImageService;
use crate::config::Settings;
use crate::error::GenerateError;
use crate::models::Article;
use crate::template::fill_template;

pub const WITH_PERSON_TEMPLATE: &str = "withPerson";
pub const WITHOUT_PERSON_TEMPLATE: &str = "withoutPerson";

const IMAGE_TEXT_CHARS: usize = 200;

/// Prompt for the post image: a portrait-style prompt when a person was
/// found, otherwise a generic one built from the start of the article text.
pub fn build_image_prompt(
    settings: &Settings,
    person: Option<&str>,
    article: &Article,
) -> Result<String, GenerateError> {
    match person {
        Some(person) => fill_template(
            WITH_PERSON_TEMPLATE,
            image_template(settings, WITH_PERSON_TEMPLATE)?,
            &[("person", person), ("title", article.title.as_str())],
        ),
        None => {
            let source = if article.summary.trim().is_empty() {
                &article.title
            } else {
                &article.summary
            };
            let text: String = source.chars().take(IMAGE_TEXT_CHARS).collect();
            fill_template(
                WITHOUT_PERSON_TEMPLATE,
                image_template(settings, WITHOUT_PERSON_TEMPLATE)?,
                &[("text", text.as_str()), ("title", article.title.as_str())],
            )
        }
    }
}

fn image_template<'a>(settings: &'a Settings, name: &str) -> Result<&'a str, GenerateError> {
    settings
        .image_prompts
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| GenerateError::MissingTemplate(name.to_string()))
}

async fn try_generate_image<S: ImageService + ?Sized>(
    settings: &Settings,
    service: &S,
    person: Option<&str>,
    article: &Article,
) -> Result<Vec<u8>> {
    let prompt = build_image_prompt(settings, person, article)?;
    let url = service.create_image(&prompt, &settings.image_config).await?;
    info!("Image generated at {}", url);
    service.download(&url).await
}

/// Generate and download the post image. Failures are logged and yield
/// `None`; the run carries on without an image.
pub async fn generate_image<S: ImageService + ?Sized>(
    settings: &Settings,
    service: &S,
    person: Option<&str>,
    article: &Article,
) -> Option<Vec<u8>> {
    match try_generate_image(settings, service, person, article).await {
        Ok(bytes) => {
            info!("Downloaded image ({} bytes)", bytes.len());
            Some(bytes)
        }
        Err(e) => {
            error!("Image generation failed: {:#}", e);
            None
        }
    }
}
