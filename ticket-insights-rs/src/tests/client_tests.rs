//! Inference client tests
//!
//! WireMock stands in for the Messages API; stub and mock services exercise
//! retry, timeout and gating without HTTP.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use mockall::mock;
    use serde_json::json;
    use tokio::sync::Semaphore;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::core::{CompletionRequest, InferenceClient, InferenceService};
    use crate::error::{PipelineError, Result};
    use crate::resilience::RetryConfig;
    use crate::services::anthropic::{AnthropicClient, AnthropicClientBuilder};
    use crate::tests::support::{fast_retry, StubService};

    mock! {
        pub Inference {}

        #[async_trait]
        impl InferenceService for Inference {
            async fn complete(&self, request: &CompletionRequest) -> Result<String>;
        }
    }

    fn create_test_client(mock_server: &MockServer) -> AnthropicClient {
        AnthropicClientBuilder::new()
            .api_key("mock_api_key_for_testing")
            .base_url(mock_server.uri())
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build Anthropic client")
    }

    fn message_response(text: &str) -> serde_json::Value {
        json!({
            "id": "msg_mock123",
            "type": "message",
            "role": "assistant",
            "model": "claude-haiku-4-5",
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 6}
        })
    }

    #[tokio::test]
    async fn test_complete_sends_messages_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "mock_api_key_for_testing"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_json(json!({
                "model": "claude-haiku-4-5",
                "max_tokens": 64,
                "messages": [{"role": "user", "content": "Hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_response("  {\"ok\": true}\n")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let text = client
            .complete(&CompletionRequest::new("Hello", 64))
            .await
            .unwrap();

        assert_eq!(text, "{\"ok\": true}");
    }

    #[tokio::test]
    async fn test_non_text_blocks_are_skipped() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "model": "claude-haiku-4-5",
                "content": [
                    {"type": "thinking", "thinking": "hmm"},
                    {"type": "text", "text": "answer"}
                ],
                "usage": {"input_tokens": 1, "output_tokens": 1}
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let text = client.complete(&CompletionRequest::new("q", 16)).await.unwrap();
        assert_eq!(text, "answer");
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "type": "error",
                "error": {"type": "rate_limit_error", "message": "Too many requests"}
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_response("done")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = InferenceClient::with_retry(
            Arc::new(create_test_client(&mock_server)),
            fast_retry(3),
        );
        let text = client
            .call("Hello", 64, Duration::from_secs(5), None)
            .await
            .unwrap();

        assert_eq!(text, "done");
    }

    #[tokio::test]
    async fn test_authentication_error_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "type": "error",
                "error": {"type": "authentication_error", "message": "invalid x-api-key"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = InferenceClient::with_retry(
            Arc::new(create_test_client(&mock_server)),
            fast_retry(3),
        );
        let err = client
            .call("Hello", 64, Duration::from_secs(5), None)
            .await
            .unwrap_err();

        assert!(matches!(err.root(), PipelineError::Authentication(_)));
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.error_code(), Some("authentication_error"));
    }

    #[tokio::test]
    async fn test_overloaded_maps_to_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_json(json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let err = client
            .complete(&CompletionRequest::new("Hello", 64))
            .await
            .unwrap_err();

        assert!(matches!(err.root(), PipelineError::Server(_)));
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), Some(529));
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_final_error() {
        let service = Arc::new(StubService::new(|_, index| {
            Err(PipelineError::server(format!("attempt {}", index + 1)))
        }));
        let client = InferenceClient::with_retry(service.clone(), fast_retry(3));

        let err = client
            .call("p", 16, Duration::from_secs(5), None)
            .await
            .unwrap_err();

        assert_eq!(service.calls(), 3);
        assert!(matches!(err, PipelineError::Server(ref m) if m == "attempt 3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_retryable() {
        let service = Arc::new(StubService::fixed("late").with_delay(Duration::from_secs(30)));
        let client = InferenceClient::with_retry(service.clone(), RetryConfig::with_max_attempts(2));

        let err = client
            .call("p", 16, Duration::from_secs(1), None)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Timeout(_)));
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_released_during_backoff() {
        let gate = Arc::new(Semaphore::new(1));
        let service = Arc::new(StubService::new(|_, index| match index {
            0 => Err(PipelineError::rate_limit("slow down")),
            _ => Ok("ok".to_string()),
        }));
        let client = InferenceClient::new(service.clone());

        let task = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                client
                    .call("p", 16, Duration::from_secs(5), Some(&*gate))
                    .await
            })
        };

        // First attempt has failed; the client now sleeps 1s before retrying
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(service.calls(), 1);
        assert!(gate.try_acquire().is_ok());

        assert_eq!(task.await.unwrap().unwrap(), "ok");
        assert_eq!(service.calls(), 2);
        assert_eq!(gate.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_client_over_mocked_service() {
        let mut service = MockInference::new();
        service
            .expect_complete()
            .withf(|request| request.max_tokens == 32 && request.prompt == "ping")
            .times(1)
            .returning(|_| Ok("pong".to_string()));

        let client = InferenceClient::new(Arc::new(service));
        assert_eq!(client.service_name(), "inference");

        let text = client
            .call("ping", 32, Duration::from_secs(5), None)
            .await
            .unwrap();
        assert_eq!(text, "pong");
    }

    #[tokio::test]
    async fn test_validation_error_from_mocked_service_is_fatal() {
        let mut service = MockInference::new();
        service
            .expect_complete()
            .times(1)
            .returning(|_| Err(PipelineError::validation("max_tokens too large")));

        let client = InferenceClient::with_retry(Arc::new(service), fast_retry(3));
        let err = client
            .call("ping", 32, Duration::from_secs(5), None)
            .await
            .unwrap_err();
        assert!(err.is_permanent());
    }
}
