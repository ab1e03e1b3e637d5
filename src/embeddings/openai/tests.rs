use super::*;
use crate::config::EmbeddingConfig;

fn test_config() -> EmbeddingConfig {
    EmbeddingConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-embed-model".to_string(),
        dimension: 5,
        api_key: Some("sk-test".to_string()),
        timeout_secs: 10,
    }
}

#[test]
fn client_configuration() {
    let client = OpenAiEmbedClient::new(&test_config()).expect("Failed to create client");

    assert_eq!(client.model, "test-embed-model");
    assert_eq!(client.dimension, 5);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
}

#[test]
fn model_identifier_exposed() {
    let client = OpenAiEmbedClient::new(&test_config()).expect("Failed to create client");

    assert_eq!(EmbeddingProvider::model(&client), "test-embed-model");
}

#[test]
fn builder_replaces_timeout() {
    let client = OpenAiEmbedClient::new(&test_config())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(2));

    // Agent config is opaque; the builder must at least keep the rest intact.
    assert_eq!(client.model, "test-embed-model");
}

#[test]
fn unreachable_host_is_dependency_failure() {
    // Reserved TEST-NET address, nothing listens there.
    let config = EmbeddingConfig {
        host: "192.0.2.1".to_string(),
        port: 9,
        protocol: "http".to_string(),
        timeout_secs: 1,
        ..test_config()
    };
    let client = OpenAiEmbedClient::new(&config)
        .expect("Failed to create client")
        .with_timeout(Duration::from_millis(200));

    let result = client.embed_sync("hello");
    assert!(matches!(result, Err(RagError::Dependency(_))));
}
