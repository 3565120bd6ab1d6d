use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub link: String,
}

/// Everything the generative services produced for one article.
#[derive(Debug, Clone, Default)]
pub struct GeneratedContent {
    pub translated_title: String,
    pub person_name: Option<String>,
    pub article_html: String,
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub title: String,
    pub image_id: u64,
    pub font_size: String,
    pub date: NaiveDate,
    pub content_html: String,
    pub link: String,
}
