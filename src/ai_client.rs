use anyhow::{Context, Result, anyhow, bail};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
        CreateImageRequestArgs, Image, ImageModel, ImageQuality, ImageResponseFormat, ImageSize,
    },
};
use async_trait::async_trait;
use log::debug;
use tokio::time::Duration;
use url::Url;

use crate::config::{ImageConfig, Settings};

#[derive(Debug, Clone, PartialEq)]
pub struct TextParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Prompt in, completion text out.
#[async_trait]
pub trait TextService: Send + Sync {
    async fn complete(&self, prompt: &str, params: &TextParams) -> Result<String>;
}

#[async_trait]
pub trait ImageService: Send + Sync {
    /// Request an image and return the URL of the first result.
    async fn create_image(&self, prompt: &str, config: &ImageConfig) -> Result<Url>;

    async fn download(&self, url: &Url) -> Result<Vec<u8>>;
}

pub struct OpenAiService {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    timeout: Duration,
}

impl OpenAiService {
    pub fn new(settings: &Settings, http: reqwest::Client) -> Self {
        let mut openai_config = OpenAIConfig::default();
        if let Some(api_key) = &settings.api_key {
            openai_config = openai_config.with_api_key(api_key);
        }
        debug!("Created OpenAI client");

        OpenAiService {
            client: Client::with_config(openai_config),
            http,
            timeout: Duration::from_secs(settings.content_config.request_timeout_secs),
        }
    }
}

#[async_trait]
impl TextService for OpenAiService {
    async fn complete(&self, prompt: &str, params: &TextParams) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&params.model)
            .messages([ChatCompletionRequestUserMessage::from(prompt.to_string()).into()])
            .temperature(params.temperature)
            .max_tokens(params.max_tokens)
            .build()
            .context("Failed to build OpenAI request")?;

        debug!("Making OpenAI chat call with model {}", params.model);
        let start_time = std::time::Instant::now();
        let response = match tokio::time::timeout(self.timeout, self.client.chat().create(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(api_error)) => return Err(anyhow!("OpenAI API error: {}", api_error)),
            Err(_) => bail!("OpenAI API call timed out after {:?}", self.timeout),
        };
        debug!("OpenAI chat call completed in {:?}", start_time.elapsed());

        response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("No valid content in OpenAI response"))
    }
}

#[async_trait]
impl ImageService for OpenAiService {
    async fn create_image(&self, prompt: &str, config: &ImageConfig) -> Result<Url> {
        let request = CreateImageRequestArgs::default()
            .prompt(prompt)
            .model(image_model(&config.model))
            .n(config.n)
            .size(image_size(&config.size)?)
            .quality(image_quality(&config.quality)?)
            .response_format(ImageResponseFormat::Url)
            .build()
            .context("Failed to build image request")?;

        let response = match tokio::time::timeout(self.timeout, self.client.images().create(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(api_error)) => return Err(anyhow!("OpenAI image API error: {}", api_error)),
            Err(_) => bail!("OpenAI image call timed out after {:?}", self.timeout),
        };

        let first = response
            .data
            .first()
            .ok_or_else(|| anyhow!("Image response contained no images"))?;

        match first.as_ref() {
            Image::Url { url, .. } => Url::parse(url).context("Image response URL is invalid"),
            Image::B64Json { .. } => bail!("Image response was base64, expected a URL"),
        }
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

fn image_model(name: &str) -> ImageModel {
    match name {
        "dall-e-2" => ImageModel::DallE2,
        "dall-e-3" => ImageModel::DallE3,
        other => ImageModel::Other(other.to_string()),
    }
}

fn image_size(size: &str) -> Result<ImageSize> {
    match size {
        "256x256" => Ok(ImageSize::S256x256),
        "512x512" => Ok(ImageSize::S512x512),
        "1024x1024" => Ok(ImageSize::S1024x1024),
        "1792x1024" => Ok(ImageSize::S1792x1024),
        "1024x1792" => Ok(ImageSize::S1024x1792),
        other => Err(anyhow!("Unsupported image size `{}`", other)),
    }
}

fn image_quality(quality: &str) -> Result<ImageQuality> {
    match quality.to_lowercase().as_str() {
        "standard" => Ok(ImageQuality::Standard),
        "hd" => Ok(ImageQuality::HD),
        other => Err(anyhow!("Unsupported image quality `{}`", other)),
    }
}
