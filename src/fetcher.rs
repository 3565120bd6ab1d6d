use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use feed_rs::{model::Feed, parser};
use log::{debug, info, warn};
use rand::{Rng, seq::IndexedRandom};
use reqwest::Client;

use crate::config::ContentConfig;
use crate::models::Article;

const PREVIEW_CHARS: usize = 150;

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_feed(&self, url: &str) -> Result<Feed>;
}

#[async_trait]
impl FeedFetcher for Client {
    async fn fetch_feed(&self, url: &str) -> Result<Feed> {
        let response = self.get(url).send().await.context("failed to fetch feed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("feed fetch failed with status: {}", status));
        }

        let bytes = response.bytes().await.context("failed to read feed body")?;
        parser::parse(bytes.as_ref()).context("failed to parse feed")
    }
}

/// Articles from the first `max` entries of `feed`, skipping untitled ones.
pub fn collect_entries(feed: Feed, max: usize) -> Vec<Article> {
    feed.entries
        .into_iter()
        .take(max)
        .filter_map(|entry| {
            let title = entry.title.map(|t| t.content.trim().to_string())?;
            if title.is_empty() {
                return None;
            }
            Some(Article {
                title,
                summary: entry.summary.map(|s| s.content).unwrap_or_default(),
                link: entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Pool every feed's entries. A feed that cannot be fetched or parsed is
/// logged and skipped.
pub async fn collect_articles<F: FeedFetcher + ?Sized>(
    fetcher: &F,
    feeds: &[String],
    max_per_feed: usize,
) -> Vec<Article> {
    let mut pool = Vec::new();

    for url in feeds {
        match fetcher.fetch_feed(url).await {
            Ok(feed) => {
                let articles = collect_entries(feed, max_per_feed);
                debug!("Collected {} articles from {}", articles.len(), url);
                pool.extend(articles);
            }
            Err(e) => warn!("Could not parse feed {}: {:#}", url, e),
        }
    }

    info!("Collected {} candidate articles from {} feeds", pool.len(), feeds.len());
    pool
}

pub fn choose_article<R: Rng + ?Sized>(pool: &[Article], rng: &mut R) -> Option<Article> {
    pool.choose(rng).cloned()
}

/// Pick an article from `pool`, falling back to the configured placeholder
/// when the pool is empty and the fallback is enabled.
pub fn resolve_article<R: Rng + ?Sized>(
    pool: &[Article],
    content_config: &ContentConfig,
    rng: &mut R,
) -> Option<Article> {
    if let Some(article) = choose_article(pool, rng) {
        return Some(article);
    }

    if content_config.use_fallback_article {
        warn!("No articles found, using the fallback article");
        Some(content_config.fallback_article.clone())
    } else {
        None
    }
}

pub fn log_article_preview(article: &Article) {
    let preview: String = article.summary.chars().take(PREVIEW_CHARS).collect();
    info!("Article title: {}", article.title);
    info!("Original link: {}", article.link);
    info!("Summary (first {} chars): {}...", PREVIEW_CHARS, preview);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashMap;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Markets</title>
    <link>https://news.example</link>
    <description>Market news</description>
    <item>
      <title>Stocks climb on earnings</title>
      <link>https://news.example/a</link>
      <description>Shares rose broadly.</description>
    </item>
    <item>
      <title></title>
      <link>https://news.example/empty</link>
    </item>
    <item>
      <link>https://news.example/untitled</link>
      <description>No title here.</description>
    </item>
    <item>
      <title>Bond yields slip</title>
      <link>https://news.example/b</link>
    </item>
    <item>
      <title>Oil steadies</title>
      <link>https://news.example/c</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Gold desk</title>
  <id>urn:gold</id>
  <updated>2026-10-19T00:00:00Z</updated>
  <entry>
    <title>Gold hits record</title>
    <id>urn:gold:1</id>
    <updated>2026-10-19T00:00:00Z</updated>
    <link href="https://gold.example/1"/>
    <summary>Bullion extends gains.</summary>
  </entry>
</feed>"#;

    struct MockFetcher {
        feeds: HashMap<String, &'static str>,
    }

    #[async_trait]
    impl FeedFetcher for MockFetcher {
        async fn fetch_feed(&self, url: &str) -> Result<Feed> {
            let body = self
                .feeds
                .get(url)
                .ok_or_else(|| anyhow!("404 for {url}"))?;
            parser::parse(body.as_bytes()).context("failed to parse feed")
        }
    }

    fn article(i: usize) -> Article {
        Article {
            title: format!("title-{i}"),
            summary: String::new(),
            link: format!("https://news.example/{i}"),
        }
    }

    #[test]
    fn test_collect_entries_skips_untitled() {
        let feed = parser::parse(RSS.as_bytes()).unwrap();
        let articles = collect_entries(feed, 10);
        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Stocks climb on earnings", "Bond yields slip", "Oil steadies"]);
        assert_eq!(articles[0].summary, "Shares rose broadly.");
        assert_eq!(articles[0].link, "https://news.example/a");
        assert_eq!(articles[1].summary, "");
        assert!(articles.iter().all(|a| !a.title.is_empty()));
    }

    #[test]
    fn test_collect_entries_caps_before_filtering() {
        let feed = parser::parse(RSS.as_bytes()).unwrap();
        let articles = collect_entries(feed, 4);
        assert_eq!(articles.len(), 2);

        let feed = parser::parse(RSS.as_bytes()).unwrap();
        assert_eq!(collect_entries(feed, 0).len(), 0);
    }

    #[test]
    fn test_collect_entries_reads_atom() {
        let feed = parser::parse(ATOM.as_bytes()).unwrap();
        let articles = collect_entries(feed, 5);
        assert_eq!(
            articles,
            vec![Article {
                title: "Gold hits record".to_string(),
                summary: "Bullion extends gains.".to_string(),
                link: "https://gold.example/1".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_collect_articles_tolerates_bad_feeds() {
        let fetcher = MockFetcher {
            feeds: HashMap::from([
                ("https://rss.example".to_string(), RSS),
                ("https://atom.example".to_string(), ATOM),
                ("https://broken.example".to_string(), "<html>not a feed"),
            ]),
        };
        let feeds = vec![
            "https://broken.example".to_string(),
            "https://missing.example".to_string(),
            "https://rss.example".to_string(),
            "https://atom.example".to_string(),
        ];

        let pool = collect_articles(&fetcher, &feeds, 5).await;
        assert_eq!(pool.len(), 4);
        assert_eq!(pool[3].title, "Gold hits record");
    }

    #[tokio::test]
    async fn test_collect_articles_with_no_feeds() {
        let fetcher = MockFetcher {
            feeds: HashMap::new(),
        };
        assert!(collect_articles(&fetcher, &[], 5).await.is_empty());
    }

    #[test]
    fn test_choose_article_is_deterministic_for_a_seed() {
        let pool: Vec<Article> = (0..10).map(article).collect();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            assert_eq!(choose_article(&pool, &mut a), choose_article(&pool, &mut b));
        }
    }

    #[test]
    fn test_choose_article_is_uniform() {
        let pool: Vec<Article> = (0..4).map(article).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0usize; 4];
        let draws = 40_000;

        for _ in 0..draws {
            let picked = choose_article(&pool, &mut rng).unwrap();
            let i = pool.iter().position(|a| a == &picked).unwrap();
            counts[i] += 1;
        }

        let expected = draws / pool.len();
        for count in counts {
            assert!(count.abs_diff(expected) < expected / 10, "counts: {counts:?}");
        }
    }

    #[test]
    fn test_resolve_article_uses_fallback() {
        let config = ContentConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let picked = resolve_article(&[], &config, &mut rng).unwrap();
        assert_eq!(picked.title, config.fallback_article.title);
        assert_eq!(picked.link, config.fallback_article.link);
    }

    #[test]
    fn test_resolve_article_without_fallback() {
        let config = ContentConfig {
            use_fallback_article: false,
            ..ContentConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(resolve_article(&[], &config, &mut rng).is_none());

        let pool = vec![article(3)];
        assert_eq!(resolve_article(&pool, &config, &mut rng), Some(article(3)));
    }
}
