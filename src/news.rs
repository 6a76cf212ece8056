//! Headline fetcher: a filter-and-truncate layer over the NewsAPI
//! "everything" endpoint. Consumes the ambient stack only; no merge logic.

use crate::providers::{ProviderError, http_client};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

pub const NEWS_FILE: &str = "news.json";

const MAX_ARTICLES: usize = 5;

const ALLOWED_SOURCES: [&str; 11] = [
    "조선",
    "중앙",
    "동아",
    "문화",
    "한경",
    "매경",
    "WSJ",
    "Bloomberg",
    "Reuters",
    "Fox News",
    "Breitbart",
];

const ALLOWED_DOMAINS: [&str; 11] = [
    "chosun.com",
    "joongang.co.kr",
    "donga.com",
    "munhwa.com",
    "hankyung.com",
    "mk.co.kr",
    "wsj.com",
    "bloomberg.com",
    "reuters.com",
    "foxnews.com",
    "breitbart.com",
];

/// One query escalation step. The list below widens the lookback window and
/// loosens restrictions until something comes back.
#[derive(Debug, Clone, Copy)]
struct FetchAttempt {
    lookback_hours: i64,
    page_size: u32,
    use_language: bool,
    restrict_domains: bool,
    broad_query: bool,
}

const FETCH_ATTEMPTS: [FetchAttempt; 7] = [
    FetchAttempt { lookback_hours: 1, page_size: 30, use_language: true, restrict_domains: true, broad_query: false },
    FetchAttempt { lookback_hours: 2, page_size: 30, use_language: true, restrict_domains: true, broad_query: false },
    FetchAttempt { lookback_hours: 3, page_size: 30, use_language: true, restrict_domains: true, broad_query: false },
    FetchAttempt { lookback_hours: 6, page_size: 30, use_language: true, restrict_domains: true, broad_query: false },
    FetchAttempt { lookback_hours: 12, page_size: 30, use_language: true, restrict_domains: true, broad_query: false },
    FetchAttempt { lookback_hours: 24, page_size: 50, use_language: false, restrict_domains: true, broad_query: false },
    FetchAttempt { lookback_hours: 48, page_size: 50, use_language: false, restrict_domains: false, broad_query: true },
];

const BROAD_QUERY: &str = "economy OR policy OR market OR trade";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSection {
    pub id: String,
    pub query: String,
    pub lang: String,
}

fn section(id: &str, query: &str, lang: &str) -> NewsSection {
    NewsSection {
        id: id.to_string(),
        query: query.to_string(),
        lang: lang.to_string(),
    }
}

pub fn default_sections() -> Vec<NewsSection> {
    vec![
        section("news-korea-econ", "Korea economy OR Korea exports OR Korea inflation", "ko"),
        section("news-thai-econ", "Thailand economy OR Bank of Thailand OR Thailand inflation", "en"),
        section("news-global-econ", "global economy OR Federal Reserve OR ECB OR oil", "en"),
        section("news-korea-soc", "Korea policy OR Korea politics OR Korea industry", "ko"),
        section("news-thai-soc", "Thailand policy OR Thailand politics OR Thailand industry", "en"),
        section("news-global-soc", "geopolitics OR G7 OR trade policy OR security", "en"),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSource {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    pub source: ArticleSource,
    #[serde(rename = "numericHint")]
    pub numeric_hint: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewsReport {
    pub generated_at: String,
    pub sections: BTreeMap<String, Vec<Article>>,
    pub errors: BTreeMap<String, String>,
    pub key_configured: bool,
}

#[derive(Deserialize, Debug)]
struct EverythingResponse {
    status: Option<String>,
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Deserialize, Debug)]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<RawSource>,
}

#[derive(Deserialize, Debug)]
struct RawSource {
    name: Option<String>,
}

fn allowed_article(article: &RawArticle) -> bool {
    let source = article
        .source
        .as_ref()
        .and_then(|s| s.name.as_deref())
        .unwrap_or("")
        .to_lowercase();
    let url = article.url.as_deref().unwrap_or("").to_lowercase();
    ALLOWED_SOURCES
        .iter()
        .any(|s| source.contains(&s.to_lowercase()))
        || ALLOWED_DOMAINS.iter().any(|d| url.contains(d))
}

/// First currency/percentage/number fragment found in the text, used by the
/// dashboard to badge headlines. "n/a" when nothing numeric appears.
pub fn numeric_hint(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '$' | '₩' | '%' | '억' | '조' => return c.to_string(),
            'b' | 'B' if matches!(chars.get(i + 1), Some('p' | 'P')) => {
                return chars[i..i + 2].iter().collect();
            }
            d if d.is_ascii_digit() => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_ascii_digit() {
                    j += 1;
                }
                if chars.get(j) == Some(&'.')
                    && chars.get(j + 1).is_some_and(|c| c.is_ascii_digit())
                {
                    j += 1;
                    while j < chars.len() && chars[j].is_ascii_digit() {
                        j += 1;
                    }
                }
                return chars[i..j].iter().collect();
            }
            _ => {}
        }
        i += 1;
    }
    "n/a".to_string()
}

pub struct NewsClient {
    base_url: String,
    api_key: Option<String>,
}

impl NewsClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        NewsClient {
            base_url: base_url.to_string(),
            api_key,
        }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetches every configured section, recording per-section failures
    /// instead of propagating them. A short delay between sections respects
    /// the provider's rate limit.
    pub async fn build_report(&self, sections: &[NewsSection]) -> NewsReport {
        let mut out = BTreeMap::new();
        let mut errors = BTreeMap::new();

        for section in sections {
            match self.fetch_section(section).await {
                Ok(articles) => {
                    out.insert(section.id.clone(), articles);
                }
                Err(e) => {
                    out.insert(section.id.clone(), Vec::new());
                    errors.insert(section.id.clone(), e.to_string());
                }
            }
            if self.has_key() {
                tokio::time::sleep(std::time::Duration::from_millis(150)).await;
            }
        }

        NewsReport {
            generated_at: Utc::now().to_rfc3339(),
            sections: out,
            errors,
            key_configured: self.has_key(),
        }
    }

    #[instrument(name = "NewsFetch", skip(self, section), fields(section = %section.id))]
    async fn fetch_section(&self, section: &NewsSection) -> Result<Vec<Article>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::ConfigMissing("NEWS_API_KEY".to_string()))?;

        let url = format!("{}/v2/everything", self.base_url);
        let client = http_client()?;
        let mut last_error: Option<String> = None;

        for attempt in FETCH_ATTEMPTS {
            let from = (Utc::now() - Duration::hours(attempt.lookback_hours)).to_rfc3339();
            let query = if attempt.broad_query {
                BROAD_QUERY
            } else {
                &section.query
            };
            let mut params: Vec<(&str, String)> = vec![
                ("q", query.to_string()),
                ("from", from),
                ("sortBy", "publishedAt".to_string()),
                ("pageSize", attempt.page_size.to_string()),
                ("apiKey", api_key.to_string()),
            ];
            if attempt.use_language {
                params.push(("language", section.lang.clone()));
            }
            if attempt.restrict_domains {
                params.push(("domains", ALLOWED_DOMAINS.join(",")));
            }

            debug!(
                "Requesting news for {} with {}h lookback",
                section.id, attempt.lookback_hours
            );
            let response = client.get(&url).query(&params).send().await.map_err(|e| {
                ProviderError::Unavailable(format!("request error for {}: {e}", section.id))
            })?;

            let data = response.json::<EverythingResponse>().await.map_err(|e| {
                ProviderError::Unavailable(format!(
                    "failed to parse response for {}: {e}",
                    section.id
                ))
            })?;

            if data.status.as_deref() == Some("error") {
                last_error = Some(
                    data.message
                        .or(data.code)
                        .unwrap_or_else(|| "news provider error".to_string()),
                );
                continue;
            }

            let articles: Vec<Article> = data
                .articles
                .iter()
                .filter(|a| allowed_article(a))
                .filter_map(|a| {
                    let published_at = a.published_at.clone()?;
                    let hint_input = format!(
                        "{} {}",
                        a.title.as_deref().unwrap_or(""),
                        a.description.as_deref().unwrap_or("")
                    );
                    Some(Article {
                        title: a.title.clone(),
                        description: a.description.clone(),
                        url: a.url.clone(),
                        published_at,
                        source: ArticleSource {
                            name: a
                                .source
                                .as_ref()
                                .and_then(|s| s.name.clone())
                                .unwrap_or_else(|| "unknown".to_string()),
                        },
                        numeric_hint: numeric_hint(&hint_input),
                    })
                })
                .take(MAX_ARTICLES)
                .collect();

            if !articles.is_empty() {
                return Ok(articles);
            }
        }

        match last_error {
            Some(message) => Err(ProviderError::Unavailable(message)),
            None => Ok(Vec::new()),
        }
    }
}
