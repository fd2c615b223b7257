//! Integration tests for the Ollama backend and model classifier against a
//! mock HTTP server.

#![cfg(feature = "ollama")]

use std::time::Duration;

use mailcal_core::{ClassifierMode, GenerationBackend, IntentClassifier};
use mailcal_inference::{select_classifier, ClassifierConfig, ModelClassifier, OllamaBackend};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_reply(content: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "flan-t5-small",
        "message": { "role": "assistant", "content": content },
        "done": true
    })
}

fn backend_for(server: &MockServer) -> OllamaBackend {
    OllamaBackend::with_config(server.uri(), "flan-t5-small".to_string())
}

#[tokio::test]
async fn test_generate_posts_chat_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "flan-t5-small",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("YES")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = backend_for(&mock_server);
    let result = backend.generate("Answer YES or NO:").await;
    assert_eq!(result.unwrap(), "YES");
}

#[tokio::test]
async fn test_generate_non_success_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&mock_server)
        .await;

    let err = backend_for(&mock_server).generate("p").await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_health_check_reflects_tags_endpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
        .mount(&mock_server)
        .await;

    assert!(backend_for(&mock_server).health_check().await.unwrap());
}

#[tokio::test]
async fn test_health_check_unreachable_is_false() {
    // Nothing listens on port 9 (discard) in the test environment.
    let backend = OllamaBackend::with_config("http://127.0.0.1:9".to_string(), "m".to_string());
    assert!(!backend.health_check().await.unwrap());
}

#[tokio::test]
async fn test_model_classifier_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Yes.")))
        .mount(&mock_server)
        .await;

    let classifier = ModelClassifier::new(backend_for(&mock_server));
    let result = classifier
        .classify("Interview Invitation", "Your interview is on Dec 15, 2025 at 2:30pm")
        .await;
    assert!(result.is_event);
}

#[tokio::test]
async fn test_model_classifier_slow_server_times_out_to_no() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply("YES"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let classifier =
        ModelClassifier::new(backend_for(&mock_server)).with_timeout(Duration::from_millis(50));
    assert!(!classifier.classify("Meeting", "tomorrow").await.is_event);
}

#[tokio::test]
async fn test_server_error_degrades_to_no() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let classifier = ModelClassifier::new(backend_for(&mock_server));
    assert!(!classifier.classify("Meeting", "tomorrow").await.is_event);
}

#[tokio::test]
async fn test_auto_selection_falls_back_when_server_down() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let classifier =
        select_classifier(&ClassifierConfig::default(), backend_for(&mock_server)).await;
    assert_eq!(classifier.mode(), ClassifierMode::Keyword);
    assert!(classifier.classify("Project meeting", "").await.is_event);
}
