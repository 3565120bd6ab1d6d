use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::models::Article;

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const SETTINGS_FILE: &str = "settings.json";

const WEEKDAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub api_key: Option<String>,
    pub content_config: ContentConfig,
    pub daily_categories: DailyCategories,
    pub prompts: HashMap<String, String>,
    pub image_prompts: HashMap<String, String>,
    pub image_config: ImageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentConfig {
    pub max_articles_per_feed: usize,
    pub word_count_min: u32,
    pub word_count_max: u32,
    pub font_size: String,
    pub image_path: String,
    pub initial_image_id: u64,
    pub use_fallback_article: bool,
    pub fallback_article: Article,
    pub counter_file: PathBuf,
    pub log_file: PathBuf,
    pub text_model: String,
    pub no_person_token: String,
    pub request_timeout_secs: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        ContentConfig {
            max_articles_per_feed: 5,
            word_count_min: 1200,
            word_count_max: 2000,
            font_size: "16px".to_string(),
            image_path: "img/content/".to_string(),
            initial_image_id: 1,
            use_fallback_article: true,
            fallback_article: Article {
                title: "Global markets brace for uncertainty".to_string(),
                summary: "Investors remain cautious as markets weigh mixed economic signals and shifting policy expectations.".to_string(),
                link: "https://www.reuters.com/markets/".to_string(),
            },
            counter_file: PathBuf::from("last_image_id.txt"),
            log_file: PathBuf::from("generated_posts.txt"),
            text_model: "gpt-4o".to_string(),
            no_person_token: "無".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DailyCategory {
    pub day: String,
    pub category: String,
    pub feeds: Vec<String>,
}

/// Weekday categories, either as a Monday-first list or keyed by weekday.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DailyCategories {
    List(Vec<DailyCategory>),
    ByWeekday(BTreeMap<String, DailyCategory>),
}

impl Default for DailyCategories {
    fn default() -> Self {
        DailyCategories::List(Vec::new())
    }
}

impl DailyCategories {
    /// `weekday` is 0 for Monday through 6 for Sunday.
    pub fn for_weekday(&self, weekday: usize) -> Option<&DailyCategory> {
        match self {
            DailyCategories::List(list) => list.get(weekday),
            DailyCategories::ByWeekday(map) => map.iter().find_map(|(key, category)| {
                let key = key.trim().to_lowercase();
                let matches = key.parse::<usize>().ok() == Some(weekday)
                    || WEEKDAY_NAMES.get(weekday) == Some(&key.as_str());
                matches.then_some(category)
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub model: String,
    pub size: String,
    pub quality: String,
    pub n: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig {
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
            quality: "standard".to_string(),
            n: 1,
        }
    }
}

pub struct EnsureOutcome {
    pub path: PathBuf,
    pub created: bool,
}

impl Settings {
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix(PKG_NAME);
        xdg_dirs
            .place_config_file(SETTINGS_FILE)
            .context("Could not create the configuration directory")
    }

    /// Write a starter settings document if none exists at `path`.
    pub fn ensure(path: &Path) -> Result<EnsureOutcome> {
        if path.exists() {
            return Ok(EnsureOutcome {
                path: path.to_path_buf(),
                created: false,
            });
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, DEFAULT_SETTINGS)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(EnsureOutcome {
            path: path.to_path_buf(),
            created: true,
        })
    }

    /// Read and parse the settings document. Any failure halts the run.
    pub fn load(path: &Path) -> Result<Settings> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Settings::from_json(&raw).map_err(|e| anyhow!("Invalid settings in {}: {}", path.display(), e))
    }

    pub fn from_json(raw: &str) -> Result<Settings> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|e| anyhow!("at `{}`: {}", e.path(), e.inner()))
    }
}

const DEFAULT_SETTINGS: &str = r#"{
  "apiKey": null,
  "contentConfig": {
    "maxArticlesPerFeed": 5,
    "wordCountMin": 1200,
    "wordCountMax": 2000,
    "fontSize": "16px",
    "imagePath": "img/content/",
    "initialImageId": 1,
    "useFallbackArticle": true,
    "fallbackArticle": {
      "title": "Global markets brace for uncertainty",
      "summary": "Investors remain cautious as markets weigh mixed economic signals and shifting policy expectations.",
      "link": "https://www.reuters.com/markets/"
    },
    "counterFile": "last_image_id.txt",
    "logFile": "generated_posts.txt",
    "textModel": "gpt-4o",
    "noPersonToken": "無",
    "requestTimeoutSecs": 120
  },
  "dailyCategories": [
    {
      "day": "周一",
      "category": "台股",
      "feeds": [
        "https://www.cnyes.com/rss/news/cat/tw_stock",
        "https://tw.stock.yahoo.com/rss/sitemap.xml",
        "https://money.udn.com/rssfeed/lists/10038",
        "https://www.businesstoday.com.tw/rss",
        "https://www.moneydj.com/rss/news.xml"
      ]
    },
    {
      "day": "周二",
      "category": "幣圈",
      "feeds": [
        "https://decrypt.co/feed",
        "https://cointelegraph.com/rss",
        "https://news.bitcoin.com/feed/",
        "https://www.theblock.co/rss",
        "https://www.coindesk.com/arc/outboundfeeds/rss/"
      ]
    },
    {
      "day": "周三",
      "category": "美股",
      "feeds": [
        "https://www.marketwatch.com/rss/topstories",
        "https://www.cnbc.com/id/100003114/device/rss/rss.html",
        "https://www.bloomberg.com/feed/podcast/markets.xml",
        "https://www.nasdaq.com/feed/rssoutbound",
        "https://www.wsj.com/xml/rss/3_7085.xml"
      ]
    },
    {
      "day": "周四",
      "category": "ETF",
      "feeds": [
        "https://www.etftrends.com/feed/",
        "https://seekingalpha.com/tag/etf.rss",
        "https://www.etf.com/sections/news/rss",
        "https://www.morningstar.com/feeds/news.rss",
        "https://www.investopedia.com/feedbuilder/rssfeed"
      ]
    },
    {
      "day": "周五",
      "category": "黃金",
      "feeds": [
        "https://www.kitco.com/news/category/mining/rss",
        "https://www.kitco.com/rss/gold-live.xml",
        "https://www.gold.org/rss",
        "https://www.metal.com/rss/gold",
        "https://www.bullionvault.com/rss.xml"
      ]
    },
    {
      "day": "周六",
      "category": "外匯",
      "feeds": [
        "https://www.forexlive.com/feed/",
        "https://www.dailyfx.com/feeds/market-news",
        "https://www.fxstreet.com/rss",
        "https://www.investing.com/rss/forex.rss",
        "https://www.babypips.com/news/rss"
      ]
    },
    {
      "day": "周日",
      "category": "商品市場",
      "feeds": [
        "https://www.cmegroup.com/rss/market-news.rss",
        "https://www.barchart.com/commodities/rss",
        "https://www.investing.com/rss/commodities.rss",
        "https://www.reuters.com/arc/outboundfeeds/rss/commodities/",
        "https://www.bloomberg.com/feed/podcast/commodities.xml"
      ]
    }
  ],
  "prompts": {
    "titleTranslation": "Translate this {category} news headline into Traditional Chinese. Reply with the headline only.\n\n{title}",
    "personExtraction": "Name the main person mentioned in this news item. Reply with the name only, or 無 if no person is mentioned.\n\nTitle: {title}\nSummary: {summary}",
    "articleSummary": "Write a {wordCountMin}-{wordCountMax} word article in Traditional Chinese about the following {category} news, formatted as HTML paragraphs (<p>...</p>).\n\nTitle: {title}\nSummary: {summary}\nSource: {link}\nDate: {date}"
  },
  "imagePrompts": {
    "withPerson": "An editorial illustration of {person} in a financial news setting, inspired by: {title}",
    "withoutPerson": "An editorial illustration for a financial news article about: {text}"
  },
  "imageConfig": {
    "model": "dall-e-3",
    "size": "1024x1024",
    "quality": "standard",
    "n": 1
  }
}
"#;
