//! DBLP author directory
//!
//! Two lookups per author: a name search that yields a DBLP person id (PID),
//! and a person-page fetch that yields the current affiliation. Both results,
//! including negative ones, are cached so repeated runs do not re-fetch.

use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;

use artrank_core::{matches_search_result, strip_disambiguation_suffix};

use crate::{fetch_text, CacheStore, NetError};

const SEARCH_NAMESPACE: &str = "dblp_author";
const AFFILIATION_NAMESPACE: &str = "dblp_affil";

static PID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/pid/([\w/\-]+)").unwrap());

/// DBLP endpoints and cache policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DblpConfig {
    pub search_url: String,
    pub person_url: String,
    /// Freshness of cached lookups, in days
    pub cache_ttl_days: u64,
    /// Hits requested per search
    pub max_hits: usize,
}

impl Default for DblpConfig {
    fn default() -> Self {
        Self {
            search_url: "https://dblp.org/search/author/api".to_string(),
            person_url: "https://dblp.org/pid".to_string(),
            cache_ttl_days: 90,
            max_hits: 5,
        }
    }
}

impl DblpConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_days * 86_400)
    }
}

/// Cost counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    pub network_requests: usize,
    pub cache_hits: usize,
}

/// Cached, rate-limited DBLP client
pub struct DblpClient {
    client: Client,
    cache: Arc<dyn CacheStore>,
    config: DblpConfig,
    request_delay: Duration,
    network_requests: AtomicUsize,
    cache_hits: AtomicUsize,
}

impl DblpClient {
    pub fn new(
        client: Client,
        cache: Arc<dyn CacheStore>,
        config: DblpConfig,
        request_delay: Duration,
    ) -> Self {
        Self {
            client,
            cache,
            config,
            request_delay,
            network_requests: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
        }
    }

    pub fn stats(&self) -> LookupStats {
        LookupStats {
            network_requests: self.network_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }

    fn cached(&self, namespace: &str, key: &str) -> Option<Option<String>> {
        let body = self.cache.get(namespace, key, self.config.cache_ttl())?;
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Cache hit {}: {}",
            key,
            if body.is_empty() { "not found" } else { body.as_str() }
        );
        Some(Some(body).filter(|b| !b.is_empty()))
    }

    fn remember(&self, namespace: &str, key: &str, value: Option<&str>) {
        if let Err(e) = self.cache.put(namespace, key, value.unwrap_or_default()) {
            debug!("Failed to cache {}: {}", key, e);
        }
    }

    async fn get(&self, url: &str) -> Result<String, NetError> {
        tokio::time::sleep(self.request_delay).await;
        self.network_requests.fetch_add(1, Ordering::Relaxed);
        fetch_text(&self.client, url, None).await
    }

    /// Search for an author and return their PID
    pub async fn search_author(&self, name: &str) -> Result<Option<String>, NetError> {
        let clean = strip_disambiguation_suffix(name);
        let key = format!("search:{clean}");
        if let Some(hit) = self.cached(SEARCH_NAMESPACE, &key) {
            return Ok(hit);
        }

        let url = format!(
            "{}?q={}&format=json&h={}",
            self.config.search_url,
            urlencoding::encode(&clean),
            self.config.max_hits
        );
        debug!("Searching DBLP for: {}", clean);

        let body = self.get(&url).await?;
        let pid = parse_search_response(&body, &clean)?;
        self.remember(SEARCH_NAMESPACE, &key, pid.as_deref());
        Ok(pid)
    }

    /// Fetch the affiliation listed on a person page
    pub async fn fetch_affiliation(&self, pid: &str) -> Result<Option<String>, NetError> {
        let key = format!("affil:{pid}");
        if let Some(hit) = self.cached(AFFILIATION_NAMESPACE, &key) {
            return Ok(hit);
        }

        let url = format!("{}/{}.html", self.config.person_url, pid);
        let html = self.get(&url).await?;
        let affiliation = parse_affiliation(&html);
        self.remember(AFFILIATION_NAMESPACE, &key, affiliation.as_deref());
        Ok(affiliation)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: SearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult {
    #[serde(default)]
    hits: SearchHits,
}

#[derive(Debug, Default, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hit: Vec<SearchHit>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchHit {
    #[serde(default)]
    info: HitInfo,
}

#[derive(Debug, Default, Deserialize)]
struct HitInfo {
    #[serde(default)]
    author: String,
    #[serde(default)]
    url: String,
}

/// PID path component of a DBLP person URL; a trailing `.html` is not part
/// of the captured id
pub fn extract_pid(url: &str) -> Option<String> {
    PID_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pick a PID from a search response.
///
/// The first hit whose author name matches the query wins; failing that, the
/// first hit carrying a PID (hits are relevance-ordered).
pub fn parse_search_response(json: &str, query: &str) -> Result<Option<String>, NetError> {
    let response: SearchResponse =
        serde_json::from_str(json).map_err(|e| NetError::Parse(e.to_string()))?;
    let hits = response.result.hits.hit;

    let matched = hits
        .iter()
        .filter(|hit| matches_search_result(query, &hit.info.author))
        .find_map(|hit| extract_pid(&hit.info.url));

    Ok(matched.or_else(|| hits.iter().find_map(|hit| extract_pid(&hit.info.url))))
}

/// Affiliation from a person page (`li[itemprop=affiliation] span[itemprop=name]`)
pub fn parse_affiliation(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"li[itemprop="affiliation"] span[itemprop="name"]"#).ok()?;

    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
}
