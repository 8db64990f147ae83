use std::{collections::HashMap, time::Duration};

use reqwest::Client;
use url::Url;

use crate::config;

pub mod client;
pub mod error;
pub mod parse;

pub use error::ScraperError;

/// Slugs that differ between our catalogue and the comic site.
const SLUG_ALIASES: &[(&str, &str)] = &[
    ("the-beginning-after-the-end", "the-beginning-after-the-end-indo"),
    ("one-piece", "one-piece-indonesia"),
    ("boruto", "boruto-two-blue-vortex"),
];

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Chapter {
    pub title: String,
    pub link: String,
    pub slug: String,
    pub number: Option<f64>,
    pub release_date: Option<String>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct SimilarComic {
    pub title: String,
    pub slug: String,
    pub link: String,
    pub cover_url: Option<String>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ScrapedDetail {
    pub chapters: Vec<Chapter>,
    pub first_chapter: Option<Chapter>,
    pub latest_chapter: Option<Chapter>,
    pub similar_comics: Vec<SimilarComic>,
}

#[derive(serde::Deserialize)]
struct LocalSearchResponse {
    results: Vec<LocalSearchResult>,
}

#[derive(serde::Deserialize)]
struct LocalSearchResult {
    slug: String,
}

#[derive(Clone)]
pub struct ChapterScraper {
    client: Client,
    hosts: Vec<String>,
    search_url: String,
    local_search_url: String,
    aliases: HashMap<String, String>,
}

impl ChapterScraper {
    pub fn new(config: &config::Scraper) -> Result<Self, ScraperError> {
        let client = client::build_client(Duration::from_secs(config.timeout_seconds))?;

        let mut aliases: HashMap<String, String> = SLUG_ALIASES
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        aliases.extend(config.aliases.clone());

        Ok(ChapterScraper {
            client,
            hosts: config.hosts.clone(),
            search_url: config.search_url.clone(),
            local_search_url: config.local_search_url.clone(),
            aliases,
        })
    }

    pub fn resolve_alias<'a>(&'a self, slug: &'a str) -> &'a str {
        self.aliases.get(slug).map(String::as_str).unwrap_or(slug)
    }

    /// Fetches the chapter list for `slug`, falling back from the mirror
    /// hosts to the site search and finally to our own `/search`. Returns the
    /// last error when every strategy fails.
    #[tracing::instrument(name = "resolve and fetch detail", skip(self))]
    pub async fn resolve_and_fetch_detail_by_slug(
        &self,
        slug: &str,
    ) -> Result<ScrapedDetail, ScraperError> {
        let slug = self.resolve_alias(slug).to_string();
        let keyword = slug.replace('-', " ").trim().to_string();

        let mut last_error = match self.fetch_detail_from_hosts(&slug).await {
            Ok(detail) => return Ok(detail),
            Err(e) => e,
        };
        tracing::warn!(err.msg = %last_error, "direct fetch failed, trying site search");

        match self.search_remote_slug(&keyword).await {
            Ok(found) if found != slug => match self.fetch_detail_from_hosts(&found).await {
                Ok(detail) => return Ok(detail),
                Err(e) => last_error = e,
            },
            Ok(_) => {}
            Err(e) => last_error = e,
        }
        tracing::warn!(err.msg = %last_error, "site search failed, trying local search");

        match self.search_local_slug(&keyword).await {
            Ok(found) if found != slug => match self.fetch_detail_from_hosts(&found).await {
                Ok(detail) => return Ok(detail),
                Err(e) => last_error = e,
            },
            Ok(_) => {}
            Err(e) => last_error = e,
        }

        Err(last_error)
    }

    async fn fetch_detail_from_hosts(&self, slug: &str) -> Result<ScrapedDetail, ScraperError> {
        let mut last_error = None;

        for host in &self.hosts {
            let url = Url::parse(host)?.join(&format!("manga/{}/", slug))?;

            match self.fetch_html(url.as_str()).await {
                Ok(html) => {
                    let detail = parse::parse_detail(&html, &url);
                    tracing::info!(%url, chapters = detail.chapters.len(), "fetched comic detail");
                    return Ok(detail);
                }
                Err(e) => {
                    tracing::debug!(%url, err.msg = %e, "mirror attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(ScraperError::NoHosts))
    }

    async fn search_remote_slug(&self, keyword: &str) -> Result<String, ScraperError> {
        let url = Url::parse_with_params(
            &self.search_url,
            &[("post_type", "manga"), ("s", keyword)],
        )?;

        let html = self.fetch_html(url.as_str()).await?;

        parse::parse_search_slugs(&html)
            .into_iter()
            .next()
            .ok_or_else(|| ScraperError::NoSearchResult(keyword.to_string()))
    }

    async fn search_local_slug(&self, keyword: &str) -> Result<String, ScraperError> {
        let url = Url::parse(&self.local_search_url)?.join("search")?;

        let response = self
            .client
            .get(url.as_str())
            .query(&[("q", keyword)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ScraperError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body: LocalSearchResponse = response.json().await?;
        body.results
            .into_iter()
            .map(|r| r.slug)
            .find(|s| !s.is_empty())
            .ok_or_else(|| ScraperError::NoSearchResult(keyword.to_string()))
    }

    async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
