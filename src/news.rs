//! # Weather Headlines
//!
//! Latest weather and climate headlines from the GNews search API.
//!
//! A successful search answers `{"totalArticles": n, "articles": [...]}`.
//! Failures answer `{"errors": [...]}` (or an object of messages), usually
//! with a 4xx status; the first message surfaces as [`NewsError::Api`].

use crate::config::GNewsConfig;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsError {
    /// No `token` configured
    #[error("GNews API key is not configured")]
    MissingApiKey,

    /// Request could not be completed
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// API answered with an `errors` list
    #[error("GNews error: {message}")]
    Api { message: String },

    /// Body was not the expected JSON
    #[error("unexpected GNews response")]
    Malformed(#[from] serde_json::Error),

    /// HTTP client could not be constructed
    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),
}

/// One headline.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Headline {
    pub title: String,
    pub url: String,
    pub source: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Option<Vec<Article>>,
    /// A list of messages, or an object keyed by the offending parameter
    #[serde(default)]
    errors: Option<Value>,
}

#[derive(Deserialize)]
struct Article {
    title: String,
    url: String,
    source: ArticleSource,
}

#[derive(Deserialize)]
struct ArticleSource {
    name: String,
}

/// Parse a `/search` response body.
///
/// A body without `articles` is an empty result, not an error.
pub fn parse_articles(body: &str) -> Result<Vec<Headline>, NewsError> {
    let response: SearchResponse = serde_json::from_str(body)?;

    if let Some(errors) = response.errors {
        let messages: Vec<&Value> = match &errors {
            Value::Array(items) => items.iter().collect(),
            Value::Object(fields) => fields.values().collect(),
            other => vec![other],
        };
        let message = messages
            .into_iter()
            .filter_map(Value::as_str)
            .find(|m| !m.is_empty())
            .unwrap_or("request rejected")
            .to_string();
        return Err(NewsError::Api { message });
    }

    Ok(response
        .articles
        .unwrap_or_default()
        .into_iter()
        .map(|article| Headline {
            title: article.title,
            url: article.url,
            source: article.source.name,
        })
        .collect())
}

/// HTTP client for the GNews v4 API.
pub struct GNewsClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    query: String,
    lang: String,
    country: String,
    max_articles: u32,
}

impl GNewsClient {
    pub fn new(config: &GNewsConfig) -> Result<Self, NewsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(NewsError::ClientBuild)?;

        Ok(GNewsClient {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            query: config.query.clone(),
            lang: config.lang.clone(),
            country: config.country.clone(),
            max_articles: config.max_articles,
        })
    }

    /// Latest headlines matching the configured query.
    pub async fn headlines(&self) -> Result<Vec<Headline>, NewsError> {
        let key = self.api_key.as_deref().ok_or(NewsError::MissingApiKey)?;
        let url = format!("{}/search", self.api_url);
        let max = self.max_articles.to_string();
        debug!("Requesting {} for {:?}", url, self.query);

        // Rejections carry their reason in the body, so the status is not checked
        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", self.query.as_str()),
                ("lang", self.lang.as_str()),
                ("country", self.country.as_str()),
                ("max", max.as_str()),
                ("token", key),
            ])
            .send()
            .await
            .map_err(|source| NewsError::Transport {
                url: url.clone(),
                source,
            })?;

        let body = response
            .text()
            .await
            .map_err(|source| NewsError::Transport { url, source })?;

        parse_articles(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_articles() {
        let body = r#"{
            "totalArticles": 2,
            "articles": [
                {
                    "title": "Cyclone nears Odisha coast",
                    "description": "IMD issues red alert",
                    "url": "https://example.com/cyclone",
                    "publishedAt": "2024-05-26T08:00:00Z",
                    "source": {"name": "The Hindu", "url": "https://www.thehindu.com"}
                },
                {
                    "title": "Monsoon arrives in Kerala",
                    "url": "https://example.com/monsoon",
                    "source": {"name": "NDTV"}
                }
            ]
        }"#;

        let headlines = parse_articles(body).unwrap();
        assert_eq!(
            headlines,
            vec![
                Headline {
                    title: "Cyclone nears Odisha coast".to_string(),
                    url: "https://example.com/cyclone".to_string(),
                    source: "The Hindu".to_string(),
                },
                Headline {
                    title: "Monsoon arrives in Kerala".to_string(),
                    url: "https://example.com/monsoon".to_string(),
                    source: "NDTV".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_missing_articles_is_empty() {
        assert!(parse_articles(r#"{"totalArticles": 0}"#).unwrap().is_empty());
        assert!(parse_articles(r#"{"totalArticles": 0, "articles": []}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_errors_list_is_api_error() {
        let body = r#"{"errors": ["You did not provide an API key."]}"#;
        match parse_articles(body) {
            Err(NewsError::Api { message }) => {
                assert_eq!(message, "You did not provide an API key.")
            }
            other => panic!("expected API error, got {:?}", other),
        }

        let body = r#"{"errors": {"q": "The query is required."}}"#;
        assert!(matches!(
            parse_articles(body),
            Err(NewsError::Api { message }) if message == "The query is required."
        ));
    }

    #[test]
    fn test_incomplete_article_is_malformed() {
        let body = r#"{"articles": [{"title": "No link", "source": {"name": "X"}}]}"#;
        assert!(matches!(parse_articles(body), Err(NewsError::Malformed(_))));
        assert!(matches!(parse_articles("<html>"), Err(NewsError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let client = GNewsClient::new(&GNewsConfig::default()).unwrap();
        assert!(matches!(
            client.headlines().await,
            Err(NewsError::MissingApiKey)
        ));
    }
}
