/// Integration tests with a mocked chat-completions API
/// Exercises status mapping, retry and caching without hitting the real service
use loan_risk_api::models::{ApplicantForm, RiskLabel};
use loan_risk_api::reasons::{model_reasons, ReasonSource};
use loan_risk_api::text_generation::{CompletionError, LlmClient, TextGenerator};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create a client pointing at the mock server
fn create_test_client(base_url: String, timeout: Duration) -> LlmClient {
    LlmClient::new(base_url, "test_key".to_string(), "test-model".to_string(), timeout).unwrap()
}

fn completion(text: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [
            {
                "index": 0,
                "message": { "role": "assistant", "content": text },
                "finish_reason": "stop"
            }
        ]
    })
}

#[tokio::test]
async fn test_successful_completion() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test_key"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-model",
            "temperature": 0.6,
            "max_tokens": 750
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  Strengths: reliable  \n")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri(), Duration::from_secs(5));
    let text = client.complete("explain this").await.unwrap();

    assert_eq!(text, "Strengths: reliable");
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri(), Duration::from_secs(5));
    let err = client.complete("explain this").await.unwrap_err();

    assert!(matches!(err, CompletionError::Authentication(_)));
}

#[tokio::test]
async fn test_too_many_requests_maps_to_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri(), Duration::from_secs(5));
    let err = client.complete("explain this").await.unwrap_err();

    assert!(matches!(err, CompletionError::RateLimited(_)));
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri(), Duration::from_secs(5));
    let err = client.complete("explain this").await.unwrap_err();

    assert!(matches!(err, CompletionError::Api(_)));
}

#[tokio::test]
async fn test_empty_choices_is_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri(), Duration::from_secs(5));
    let err = client.complete("explain this").await.unwrap_err();

    assert!(matches!(err, CompletionError::Api(_)));
}

#[tokio::test]
async fn test_timeout_is_retried_once() {
    let mock_server = MockServer::start().await;

    // First attempt is slower than the client timeout
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("on time")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri(), Duration::from_millis(500));
    let text = client.complete("explain this").await.unwrap();

    assert_eq!(text, "on time");
}

#[tokio::test]
async fn test_persistent_timeout_is_attempted_twice() {
    let mock_server = MockServer::start().await;

    // Every attempt is slower than the client timeout
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri(), Duration::from_millis(200));
    let err = client.complete("explain this").await.unwrap_err();

    assert!(matches!(err, CompletionError::Transport(_)));
}

#[tokio::test]
async fn test_model_reasons_fall_back_after_persistent_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri(), Duration::from_millis(200));
    let explanation = model_reasons(&client, &ApplicantForm::sample(), RiskLabel::LowRisk).await;

    assert_eq!(explanation.source, ReasonSource::Fallback);
    assert_eq!(
        explanation.lines,
        vec![CompletionError::Transport(String::new()).fallback_message().to_string()]
    );
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    // Nothing listens on port 1
    let client = create_test_client("http://127.0.0.1:1".to_string(), Duration::from_secs(2));
    let err = client.complete("explain this").await.unwrap_err();

    assert!(matches!(err, CompletionError::Transport(_)));
}

#[tokio::test]
async fn test_identical_prompts_hit_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("cached answer")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri(), Duration::from_secs(5));
    let first = client.complete("same prompt").await.unwrap();
    let second = client.complete("same prompt").await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_repeated_failures_open_circuit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri(), Duration::from_secs(5));
    for attempt in 0..5 {
        let err = client.complete(&format!("prompt {}", attempt)).await.unwrap_err();
        assert!(matches!(err, CompletionError::Api(_)));
    }

    let err = client.complete("prompt 5").await.unwrap_err();
    assert_eq!(err, CompletionError::CircuitOpen);
}

#[tokio::test]
async fn test_model_reasons_fall_back_on_rate_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri(), Duration::from_secs(5));
    let explanation = model_reasons(&client, &ApplicantForm::sample(), RiskLabel::NeedsReview).await;

    assert_eq!(explanation.source, ReasonSource::Fallback);
    assert_eq!(
        explanation.lines,
        vec![CompletionError::RateLimited(String::new()).fallback_message().to_string()]
    );
}
