use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use log::{debug, info, warn};

use crate::ai_client::{ImageService, OpenAiService, TextService};
use crate::category::{current_weekday, select_category};
use crate::config::Settings;
use crate::content::{ContentGenerator, image_tag};
use crate::fetcher::{FeedFetcher, collect_articles, log_article_preview, resolve_article};
use crate::image::generate_image;
use crate::logger::init_logger;
use crate::models::{GeneratedContent, Post};
use crate::publisher::Publisher;
use crate::sequence::SequenceAllocator;

pub struct RunOptions {
    pub settings_path: Option<PathBuf>,
    pub weekday: Option<usize>,
    pub no_image: bool,
    pub verbose: bool,
}

pub struct PipelineOptions {
    pub weekday: usize,
    pub no_image: bool,
}

pub async fn run_generator(options: RunOptions) -> Result<()> {
    // 0) Initialize logger
    init_logger(options.verbose)?;
    debug!("Logger initialized");

    // 1) Ensure settings exist
    let path = match options.settings_path {
        Some(path) => path,
        None => Settings::default_path()?,
    };
    let outcome = Settings::ensure(&path)?;
    if outcome.created {
        warn!(
            "Settings file created at {}. Please review it and run again.",
            outcome.path.display()
        );
        return Ok(());
    }

    let settings = Settings::load(&path)?;
    debug!("Settings loaded from {}", path.display());

    // 2) Shared HTTP client for feeds and image downloads
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 13.5; rv:116.0) Gecko/20100101 Firefox/116.0")
        .build()?;
    let openai = OpenAiService::new(&settings, client.clone());

    let pipeline = PipelineOptions {
        weekday: options.weekday.unwrap_or_else(current_weekday),
        no_image: options.no_image,
    };

    match run_pipeline(&settings, &pipeline, &client, &openai, &openai).await? {
        Some(id) => info!("Post {} generated.", id),
        None => warn!("No articles found and the fallback article is disabled. Nothing generated."),
    }

    Ok(())
}

/// One full generation run. Returns the id of the published post, or `None`
/// when no article could be chosen.
pub async fn run_pipeline<F, T, I>(
    settings: &Settings,
    options: &PipelineOptions,
    fetcher: &F,
    text: &T,
    images: &I,
) -> Result<Option<u64>>
where
    F: FeedFetcher + ?Sized,
    T: TextService + ?Sized,
    I: ImageService + ?Sized,
{
    let config = &settings.content_config;

    // 1) Today's category
    let selection = select_category(settings, options.weekday);
    if selection.category.is_empty() {
        warn!("No category configured for weekday {}", options.weekday);
    } else {
        info!("Today's category: {} ({})", selection.category, selection.day);
    }

    // 2) Pick an article
    let pool = collect_articles(fetcher, &selection.feeds, config.max_articles_per_feed).await;
    let article = {
        let mut rng = rand::rng();
        resolve_article(&pool, config, &mut rng)
    };
    let Some(article) = article else {
        return Ok(None);
    };
    log_article_preview(&article);

    // 3) Allocate the image id before anything is generated
    let id = SequenceAllocator::new(&config.counter_file, config.initial_image_id).next_id()?;
    info!("Using image id {}", id);

    // 4) Text content
    let generator = ContentGenerator::new(settings, text, &selection.category);
    let mut content = GeneratedContent {
        translated_title: generator.translate_title(&article).await?,
        person_name: generator.extract_person(&article).await?,
        ..GeneratedContent::default()
    };
    let tag = image_tag(&config.image_path, id, &content.translated_title);
    content.article_html = generator.write_article(&article, &tag).await?;

    // 5) Image
    if options.no_image {
        info!("--no-image flag set, skipping image generation");
    } else {
        content.image =
            generate_image(settings, images, content.person_name.as_deref(), &article).await;
    }

    // 6) Publish
    let post = Post {
        title: content.translated_title,
        image_id: id,
        font_size: config.font_size.clone(),
        date: Local::now().date_naive(),
        content_html: content.article_html,
        link: article.link,
    };
    Publisher::new(&config.log_file, &config.image_path).publish(&post, content.image.as_deref())?;

    Ok(Some(id))
}
