//! Elasticsearch backend over HTTP.
//!
//! Each namespace maps to one Elasticsearch index and each entity id to a
//! document id within it.

use super::client::{page_offset, IndexClient, IndexDocument, SearchHits};
use crate::config::{AppConfig, SearchConfig};
use crate::{LiftlogError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: HitsTotal,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// Elasticsearch 7+ reports `{"value": n, "relation": ..}`, older versions a bare number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HitsTotal {
    Count(usize),
    Object { value: usize },
}

impl HitsTotal {
    fn value(&self) -> usize {
        match self {
            HitsTotal::Count(n) => *n,
            HitsTotal::Object { value } => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
}

/// HTTP [`IndexClient`] for Elasticsearch.
pub struct ElasticsearchClient {
    client: Client,
    base_url: String,
}

impl ElasticsearchClient {
    /// Create a client for the given endpoint with the default timeout.
    pub fn new(endpoint: url::Url) -> Result<Self> {
        Self::with_timeout(endpoint, SearchConfig::REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(endpoint: url::Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| LiftlogError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                cause: None,
            })?;

        Ok(Self {
            client,
            base_url: endpoint.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn document_url(&self, namespace: &str, id: i64) -> String {
        format!(
            "{}/{}/_doc/{}",
            self.base_url,
            urlencoding::encode(namespace),
            id
        )
    }

    fn search_url(&self, namespace: &str) -> String {
        format!("{}/{}/_search", self.base_url, urlencoding::encode(namespace))
    }

    /// Turn a non-success response into a search error carrying its body.
    async fn check_status(namespace: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LiftlogError::Search {
            namespace: namespace.to_string(),
            message: format!("{}: {}", status, body),
            status_code: Some(status.as_u16()),
        })
    }
}

#[async_trait]
impl IndexClient for ElasticsearchClient {
    async fn index(&self, namespace: &str, id: i64, fields: &IndexDocument) -> Result<()> {
        let url = self.document_url(namespace, id);
        let response = self.client.put(&url).json(fields).send().await?;
        Self::check_status(namespace, response).await?;
        debug!("PUT {}", url);
        Ok(())
    }

    async fn delete(&self, namespace: &str, id: i64) -> Result<()> {
        let url = self.document_url(namespace, id);
        let response = self.client.delete(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("DELETE {}: document already absent", url);
            return Ok(());
        }
        Self::check_status(namespace, response).await?;
        debug!("DELETE {}", url);
        Ok(())
    }

    async fn search(
        &self,
        namespace: &str,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> Result<SearchHits> {
        let from = page_offset(page, per_page)?;
        let body = json!({
            "query": {
                "multi_match": {
                    "query": expression,
                    "fields": ["*"]
                }
            },
            "from": from,
            "size": per_page,
        });

        let response = self
            .client
            .post(self.search_url(namespace))
            .json(&body)
            .send()
            .await?;

        // The index is created lazily by the first upsert.
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Search index {} does not exist yet", namespace);
            return Ok(SearchHits::empty());
        }

        let response = Self::check_status(namespace, response).await?;
        let parsed: SearchResponse = response.json().await?;

        let mut ids = Vec::with_capacity(parsed.hits.hits.len());
        for hit in parsed.hits.hits {
            match hit.id.parse::<i64>() {
                Ok(id) => ids.push(id),
                Err(_) => warn!("Ignoring non-numeric document id {:?} in {}", hit.id, namespace),
            }
        }

        Ok(SearchHits {
            ids,
            total: parsed.hits.total.value(),
        })
    }

    async fn available(&self) -> bool {
        match self.client.get(&self.base_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Search backend at {} unreachable: {}", self.base_url, e);
                false
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "elasticsearch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> ElasticsearchClient {
        ElasticsearchClient::new(url::Url::parse(endpoint).unwrap()).unwrap()
    }

    #[test]
    fn test_urls() {
        let es = client("http://localhost:9200/");
        assert_eq!(es.base_url(), "http://localhost:9200");
        assert_eq!(
            es.document_url("workout", 7),
            "http://localhost:9200/workout/_doc/7"
        );
        assert_eq!(es.search_url("exercise"), "http://localhost:9200/exercise/_search");
    }

    #[test]
    fn test_parse_hits_total_shapes() {
        let modern: SearchResponse = serde_json::from_str(
            r#"{"hits": {"total": {"value": 3, "relation": "eq"},
                "hits": [{"_id": "7"}, {"_id": "3"}, {"_id": "9"}]}}"#,
        )
        .unwrap();
        assert_eq!(modern.hits.total.value(), 3);
        assert_eq!(modern.hits.hits[0].id, "7");

        let legacy: SearchResponse =
            serde_json::from_str(r#"{"hits": {"total": 0, "hits": []}}"#).unwrap();
        assert_eq!(legacy.hits.total.value(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_page_fails_before_request() {
        let es = client("http://127.0.0.1:9");
        let err = es.search("exercise", "squat", usize::MAX, 10).await.unwrap_err();
        assert!(matches!(err, LiftlogError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        let es = ElasticsearchClient::with_timeout(
            url::Url::parse("http://127.0.0.1:9").unwrap(),
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(!es.available().await);
    }
}
