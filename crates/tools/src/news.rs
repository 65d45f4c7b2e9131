//! News search.

use luxas_core::config::NewsSettings;
use luxas_core::{AppError, AppResult, RetryPolicy, Service};
use luxas_llm::http;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub source: String,
    pub link: String,
}

/// Search press coverage for a query.
#[async_trait::async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(&self, query: &str) -> AppResult<Vec<NewsArticle>>;
}

/// Google News through SerpAPI.
pub struct SerpApiNews {
    client: reqwest::Client,
    settings: NewsSettings,
    api_key: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    news_results: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl SerpApiNews {
    pub fn new(settings: NewsSettings, api_key: String, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
            api_key,
            retry,
        }
    }

    fn url(&self, query: &str) -> AppResult<reqwest::Url> {
        reqwest::Url::parse_with_params(
            &self.settings.endpoint,
            &[
                ("engine", "google_news"),
                ("q", query),
                ("hl", self.settings.language.as_str()),
                ("gl", self.settings.country.as_str()),
                ("api_key", self.api_key.as_str()),
            ],
        )
        .map_err(|e| AppError::Config(format!("Invalid news endpoint: {}", e)))
    }

    async fn search_once(&self, url: &reqwest::Url) -> AppResult<SerpResponse> {
        http::send_json(Service::NewsSearch, self.client.get(url.clone())).await
    }
}

#[async_trait::async_trait]
impl NewsSearch for SerpApiNews {
    #[instrument(skip(self), fields(engine = "google_news"))]
    async fn search(&self, query: &str) -> AppResult<Vec<NewsArticle>> {
        let url = self.url(query)?;
        let response = self
            .retry
            .run("serpapi.search", || self.search_once(&url))
            .await?;

        if let Some(error) = response.error {
            // SerpAPI reports "no results" as an error string.
            if error.contains("hasn't returned any results") {
                return Ok(Vec::new());
            }
            return Err(AppError::Search(error));
        }

        let mut articles = parse_results(&response.news_results);
        articles.truncate(self.settings.max_articles);
        tracing::debug!(articles = articles.len(), "News search finished");
        Ok(articles)
    }
}

/// Articles from `news_results`, flattening grouped stories.
fn parse_results(results: &[Value]) -> Vec<NewsArticle> {
    let mut articles = Vec::new();
    for item in results {
        if let Some(stories) = item.get("stories").and_then(Value::as_array) {
            articles.extend(parse_results(stories));
            continue;
        }
        if let Some(article) = parse_article(item) {
            articles.push(article);
        }
    }
    articles
}

fn parse_article(item: &Value) -> Option<NewsArticle> {
    let title = item.get("title")?.as_str()?.trim().to_string();
    let link = item
        .get("link")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    // `source` is a plain string in older responses, `{name, ..}` in newer ones.
    let source = match item.get("source") {
        Some(Value::String(name)) => name.clone(),
        Some(Value::Object(source)) => source
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };

    Some(NewsArticle {
        title,
        source,
        link,
    })
}
