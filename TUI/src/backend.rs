// Backend communication with the embedding service over HTTP

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::point_store::{Point, PointId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub id: PointId,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingEntry {
    pub id: PointId,
    #[serde(default)]
    pub text: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsResponse {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub embeddings: Vec<EmbeddingEntry>,
}

impl EmbeddingsResponse {
    /// Points in listing order. A zero count means nothing is plotted even if
    /// the list is padded.
    pub fn into_points(self) -> Vec<Point> {
        if self.count == 0 {
            return Vec::new();
        }
        self.embeddings
            .into_iter()
            .map(|e| Point::new(e.id, e.text, e.x, e.y))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResponse {
    #[serde(default)]
    pub word1: String,
    #[serde(default)]
    pub word2: String,
    pub cosine_similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

/// The backend operations the explorer consumes.
#[async_trait]
pub trait EmbeddingApi: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbedResponse, FetchError>;

    async fn list_embeddings(&self) -> Result<EmbeddingsResponse, FetchError>;

    async fn similarity(&self, a: &PointId, b: &PointId) -> Result<SimilarityResponse, FetchError>;

    async fn clear_embeddings(&self) -> Result<(), FetchError>;

    async fn health(&self) -> Result<HealthResponse, FetchError>;
}

/// HTTP client for the embedding service.
pub struct Backend {
    base_url: String,
    client: reqwest::Client,
}

impl Backend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-success response into `Rejected`, preferring the body's
    /// `detail` field over `fallback`.
    async fn check(response: reqwest::Response, fallback: &str) -> Result<reqwest::Response, FetchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail)
            .and_then(|d| match d {
                serde_json::Value::String(s) if !s.is_empty() => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .unwrap_or_else(|| fallback.to_string());

        warn!(status = status.as_u16(), %detail, "backend rejected request");
        Err(FetchError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl EmbeddingApi for Backend {
    async fn embed(&self, text: &str) -> Result<EmbedResponse, FetchError> {
        debug!(chars = text.chars().count(), "POST /embed");
        let response = self
            .client
            .post(self.url("/embed"))
            .json(&EmbedRequest { text })
            .send()
            .await?;
        let response = Self::check(response, "Failed to compute embedding").await?;
        Ok(response.json().await?)
    }

    async fn list_embeddings(&self) -> Result<EmbeddingsResponse, FetchError> {
        debug!("GET /embeddings");
        let response = self.client.get(self.url("/embeddings")).send().await?;
        let response = Self::check(response, "Failed to fetch embeddings").await?;
        Ok(response.json().await?)
    }

    async fn similarity(&self, a: &PointId, b: &PointId) -> Result<SimilarityResponse, FetchError> {
        debug!(%a, %b, "GET /similarity");
        let response = self
            .client
            .get(self.url("/similarity"))
            .query(&[("id1", a.as_str()), ("id2", b.as_str())])
            .send()
            .await?;
        let response = Self::check(response, "Failed to compute similarity").await?;
        Ok(response.json().await?)
    }

    async fn clear_embeddings(&self) -> Result<(), FetchError> {
        debug!("DELETE /embeddings");
        let response = self.client.delete(self.url("/embeddings")).send().await?;
        Self::check(response, "Failed to clear embeddings").await?;
        Ok(())
    }

    async fn health(&self) -> Result<HealthResponse, FetchError> {
        let response = self.client.get(self.url("/health")).send().await?;
        let response = Self::check(response, "Health check failed").await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> Backend {
        Backend::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_embeddings_response_deserialize() {
        let json = r#"{
            "count": 2,
            "embeddings": [
                {"id": "p1", "text": "cat", "x": 0.0, "y": 0.0, "embedding": [0.1, 0.2]},
                {"id": "p2", "text": "dog", "x": 1.0, "y": 0.0, "embedding": [0.3, 0.4]}
            ]
        }"#;

        let response: EmbeddingsResponse = serde_json::from_str(json).unwrap();
        let points = response.into_points();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0], Point::new("p1", "cat", 0.0, 0.0));
        assert_eq!(points[1].label, "dog");
    }

    #[test]
    fn test_embeddings_response_zero_count() {
        let json = r#"{"count": 0, "embeddings": []}"#;
        let response: EmbeddingsResponse = serde_json::from_str(json).unwrap();
        assert!(response.into_points().is_empty());
    }

    #[test]
    fn test_embed_response_without_text() {
        let json = r#"{"id": "abc", "embedding": [0.5, -0.25]}"#;
        let response: EmbedResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.id.as_str(), "abc");
        assert_eq!(response.text, None);
        assert_eq!(response.embedding, vec![0.5, -0.25]);
    }

    #[tokio::test]
    async fn test_embed_posts_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .and(body_json(serde_json::json!({"text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1234567890",
                "text": "hello",
                "embedding": [0.1, 0.2, 0.3]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = backend(&server).embed("hello").await.unwrap();
        assert_eq!(response.id.as_str(), "1234567890");
        assert_eq!(response.embedding.len(), 3);
    }

    #[tokio::test]
    async fn test_embed_failure_uses_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"detail": "text too long"})),
            )
            .mount(&server)
            .await;

        let err = backend(&server).embed("x").await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Rejected {
                status: 400,
                detail: "text too long".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_failure_without_detail_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let err = backend(&server).list_embeddings().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch embeddings");
    }

    #[tokio::test]
    async fn test_similarity_sends_ids_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/similarity"))
            .and(query_param("id1", "a"))
            .and(query_param("id2", "b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "word1": "cat",
                "word2": "dog",
                "cosine_similarity": 0.7312
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = backend(&server)
            .similarity(&PointId::from("a"), &PointId::from("b"))
            .await
            .unwrap();
        assert_eq!(response.word1, "cat");
        assert!((response.cosine_similarity - 0.7312).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_clear_accepts_any_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server).clear_embeddings().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let backend = Backend::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = backend.health().await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = Backend::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(backend.url("/embed"), "http://localhost:8000/embed");
    }
}
