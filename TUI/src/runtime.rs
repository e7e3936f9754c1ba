//! Runs session requests on tokio tasks and hands the results back to the UI
//! thread in arrival order.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::backend::{EmbeddingApi, EmbeddingsResponse};
use crate::effect::{Completion, Request};

pub struct Runtime {
    api: Arc<dyn EmbeddingApi>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    similarity: Option<(u64, AbortHandle)>,
}

impl Runtime {
    pub fn new(api: Arc<dyn EmbeddingApi>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api,
            tx,
            rx,
            similarity: None,
        }
    }

    pub fn dispatch(&mut self, request: Request) {
        let api = Arc::clone(&self.api);
        match request {
            Request::Embed { text } => {
                self.spawn(async move { Completion::Embedded(api.embed(&text).await) });
            }
            Request::ListPoints { ticket } => {
                self.spawn(async move {
                    let result = api
                        .list_embeddings()
                        .await
                        .map(EmbeddingsResponse::into_points);
                    Completion::Points { ticket, result }
                });
            }
            Request::Similarity(request) => {
                self.abort_similarity();
                let ticket = request.ticket;
                let handle = self.spawn(async move {
                    let result = api.similarity(&request.a.id, &request.b.id).await;
                    Completion::Similarity { ticket, result }
                });
                self.similarity = Some((ticket, handle));
            }
            Request::CancelSimilarity { ticket } => {
                if matches!(self.similarity, Some((current, _)) if current == ticket) {
                    self.abort_similarity();
                }
            }
            Request::ClearAll => {
                self.spawn(async move { Completion::Cleared(api.clear_embeddings().await) });
            }
            Request::Health => {
                self.spawn(async move { Completion::Health(api.health().await) });
            }
        }
    }

    /// Next finished request, if any, without waiting.
    pub fn try_next(&mut self) -> Option<Completion> {
        self.rx.try_recv().ok()
    }

    #[cfg(test)]
    pub async fn next(&mut self) -> Option<Completion> {
        self.rx.recv().await
    }

    fn abort_similarity(&mut self) {
        if let Some((ticket, handle)) = self.similarity.take() {
            debug!(ticket, "aborting similarity request");
            handle.abort();
        }
    }

    fn spawn<F>(&self, work: F) -> AbortHandle
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let completion = work.await;
            // The receiver only goes away on shutdown.
            let _ = tx.send(completion);
        })
        .abort_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::point_store::Point;
    use crate::similarity::SimilarityRequest;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn runtime(server: &MockServer) -> Runtime {
        let backend = Backend::new(server.uri(), Duration::from_secs(5)).unwrap();
        Runtime::new(Arc::new(backend))
    }

    fn similarity_request(ticket: u64, a: &str, b: &str) -> Request {
        Request::Similarity(SimilarityRequest {
            ticket,
            a: Point::new(a, a, 0.0, 0.0),
            b: Point::new(b, b, 1.0, 1.0),
        })
    }

    async fn mount_similarity(server: &MockServer, delay: Duration) {
        Mock::given(method("GET"))
            .and(path("/similarity"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "word1": "x",
                        "word2": "y",
                        "cosine_similarity": 0.5
                    }))
                    .set_delay(delay),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_list_points_completes_with_ticket() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 1,
                "embeddings": [{"id": "a", "text": "cat", "x": 0.5, "y": 0.25}]
            })))
            .mount(&server)
            .await;

        let mut rt = runtime(&server);
        rt.dispatch(Request::ListPoints { ticket: 7 });

        match rt.next().await {
            Some(Completion::Points { ticket, result }) => {
                assert_eq!(ticket, 7);
                assert_eq!(result.unwrap(), vec![Point::new("a", "cat", 0.5, 0.25)]);
            }
            other => panic!("unexpected completion: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_similarity_never_completes() {
        let server = MockServer::start().await;
        mount_similarity(&server, Duration::from_millis(300)).await;

        let mut rt = runtime(&server);
        rt.dispatch(similarity_request(1, "a", "b"));
        rt.dispatch(Request::CancelSimilarity { ticket: 1 });

        let waited = tokio::time::timeout(Duration::from_millis(800), rt.next()).await;
        assert!(waited.is_err(), "cancelled request still delivered");
    }

    #[tokio::test]
    async fn test_new_similarity_aborts_previous() {
        let server = MockServer::start().await;
        mount_similarity(&server, Duration::from_millis(200)).await;

        let mut rt = runtime(&server);
        rt.dispatch(similarity_request(1, "a", "b"));
        rt.dispatch(similarity_request(2, "b", "c"));

        match rt.next().await {
            Some(Completion::Similarity { ticket, result }) => {
                assert_eq!(ticket, 2);
                assert!(result.is_ok());
            }
            other => panic!("unexpected completion: {other:?}"),
        }
        let waited = tokio::time::timeout(Duration::from_millis(600), rt.next()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_cancel_for_other_ticket_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/similarity"))
            .and(query_param("id1", "a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "word1": "a",
                "word2": "b",
                "cosine_similarity": 0.25
            })))
            .mount(&server)
            .await;

        let mut rt = runtime(&server);
        rt.dispatch(similarity_request(5, "a", "b"));
        rt.dispatch(Request::CancelSimilarity { ticket: 4 });

        assert!(matches!(
            rt.next().await,
            Some(Completion::Similarity { ticket: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_embed_error_is_delivered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"detail": "text too long"})),
            )
            .mount(&server)
            .await;

        let mut rt = runtime(&server);
        rt.dispatch(Request::Embed {
            text: "hello".to_string(),
        });

        match rt.next().await {
            Some(Completion::Embedded(Err(err))) => assert_eq!(err.to_string(), "text too long"),
            other => panic!("unexpected completion: {other:?}"),
        }
    }
}
