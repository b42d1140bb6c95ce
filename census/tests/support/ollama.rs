use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Ollamaモックサーバーを起動する
///
/// - GET /api/ps（稼働確認・ロード中モデル）
/// - GET /api/version
/// - GET /api/tags（ローカルモデル）
#[allow(dead_code)]
pub async fn spawn_mock_ollama(version: &str) -> MockServer {
    let server = MockServer::builder().start().await;

    Mock::given(method("GET"))
        .and(path("/api/ps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "llama3:8b", "model": "llama3:8b", "size": 5_000_000_000u64 }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": version })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                { "name": "llama3:8b", "size": 4_700_000_000u64 },
                { "name": "qwen2:0.5b", "size": 352_000_000u64 }
            ]
        })))
        .mount(&server)
        .await;

    server
}

/// 全パスに指定ステータスを返すサーバーを起動する
#[allow(dead_code)]
pub async fn spawn_status_server(status: u16) -> MockServer {
    let server = MockServer::builder().start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}
