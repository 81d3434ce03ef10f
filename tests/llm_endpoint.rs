use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use medibot::config::LlmConfig;
use medibot::llm::{GenerationParams, HuggingFaceEndpoint, LlmError, TextGenerator};

async fn generate(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer hf_test");
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials in Authorization header" })),
        );
    }

    let params = &body["parameters"];
    let temperature_ok = params["temperature"]
        .as_f64()
        .is_some_and(|t| (t - 0.5).abs() < 1e-6);
    if !temperature_ok
        || params["return_full_text"] != json!(false)
        || params["max_new_tokens"] != json!(512)
    {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad parameters" })));
    }

    let prompt = body["inputs"].as_str().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!([{ "generated_text": format!("echo: {prompt}") }])),
    )
}

async fn loading() -> (StatusCode, Json<Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "Model org/loading is currently loading" })),
    )
}

/// Serve a fake inference API on an ephemeral port and return its base URL
async fn spawn_mock() -> String {
    let app = Router::new()
        .route("/models/org/chat", post(generate))
        .route("/models/org/loading", post(loading));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/models")
}

fn llm_config(endpoint_url: &str, repo_id: &str) -> LlmConfig {
    LlmConfig {
        repo_id: repo_id.to_string(),
        endpoint_url: endpoint_url.to_string(),
        api_key_env: "HF_TOKEN".to_string(),
    }
}

fn params() -> GenerationParams {
    GenerationParams {
        temperature: 0.5,
        max_new_tokens: 512,
    }
}

#[tokio::test]
async fn test_generate_sends_prompt_and_token() {
    let base = spawn_mock().await;
    let endpoint = HuggingFaceEndpoint::new(&llm_config(&base, "org/chat"), "hf_test");

    let text = endpoint.generate("What is a fever?", &params()).await.unwrap();
    assert_eq!(text, "echo: What is a fever?");
}

#[tokio::test]
async fn test_wrong_temperature_is_rejected() {
    let base = spawn_mock().await;
    let endpoint = HuggingFaceEndpoint::new(&llm_config(&base, "org/chat"), "hf_test");
    let hot = GenerationParams {
        temperature: 0.9,
        ..params()
    };

    let err = endpoint.generate("hi", &hot).await.unwrap_err();
    assert!(matches!(err, LlmError::Status { status: 400, .. }));
}

#[tokio::test]
async fn test_wrong_token_is_status_error() {
    let base = spawn_mock().await;
    let endpoint = HuggingFaceEndpoint::new(&llm_config(&base, "org/chat"), "hf_wrong");

    let err = endpoint.generate("hi", &params()).await.unwrap_err();
    match err {
        LlmError::Status { status, detail } => {
            assert_eq!(status, 401);
            assert!(detail.contains("Invalid credentials"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_loading_model_is_status_error() {
    let base = spawn_mock().await;
    let endpoint = HuggingFaceEndpoint::new(&llm_config(&base, "org/loading"), "hf_test");

    let err = endpoint.generate("hi", &params()).await.unwrap_err();
    assert!(matches!(err, LlmError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_request_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = llm_config(&format!("http://{addr}/models"), "org/chat");
    let endpoint = HuggingFaceEndpoint::new(&config, "hf_test");

    let err = endpoint.generate("hi", &params()).await.unwrap_err();
    assert!(matches!(err, LlmError::Request(_)));
}
