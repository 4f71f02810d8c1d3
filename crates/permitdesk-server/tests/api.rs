use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;
use chrono::{NaiveDate, TimeDelta};
use permitdesk_core::{Catalog, Prompt, Wizard};
use permitdesk_gateway::{AnswersPayload, ChatQnaClient, RetryPolicy};
use permitdesk_server::{AppState, Clock, ServerConfig, build_router};
use serde_json::{Value, json};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

async fn spawn_app(config: ServerConfig) -> String {
    let state = AppState::new(Catalog::builtin().unwrap(), config).with_clock(Clock::Fixed(today()));
    spawn(build_router(state)).await
}

fn config_with_analytics(url: String) -> ServerConfig {
    ServerConfig {
        analytics_url: url,
        analytics_key: Some("mdb-test".into()),
        analytics_retry: RetryPolicy::single_attempt(Duration::from_secs(5)),
        ..ServerConfig::default()
    }
}

/// Analytics stand-in answering every query with the given rows.
async fn spawn_analytics(rows: Vec<Value>) -> String {
    let app = Router::new().route(
        "/api/sql/query",
        post(move || {
            let rows = rows.clone();
            async move {
                axum::Json(json!({
                    "type": "table",
                    "column_names": ["form_name", "due_date", "document_url"],
                    "data": rows,
                }))
            }
        }),
    );
    format!("{}/api/sql/query", spawn(app).await)
}

fn prediction(name: &str, days: i64) -> Value {
    let due = today() + TimeDelta::days(days);
    json!([name, due.format("%Y-%m-%d").to_string(), format!("https://forms.example/{name}")])
}

#[tokio::test]
async fn lists_forms_keyed_by_id() {
    let base = spawn_app(ServerConfig::default()).await;
    let resp = reqwest::get(format!("{base}/api/forms")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["cache-control"], "no-store");
    let body: Value = resp.json().await.unwrap();
    let map = body.as_object().unwrap();
    assert_eq!(map.len(), 15);
    assert_eq!(map["1001"]["id"], 1001);
    assert!(map["1001"]["governingBody"].is_string());
}

#[tokio::test]
async fn single_form_and_unknown_id() {
    let base = spawn_app(ServerConfig::default()).await;

    let found: Value = reqwest::get(format!("{base}/api/forms/1005"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found["id"], 1005);
    assert_eq!(found["dueDate"], "2026-10-31");

    for id in ["9999", "abc"] {
        let resp = reqwest::get(format!("{base}/api/forms/{id}")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains(id));
    }
}

#[tokio::test]
async fn due_soon_assigns_priority_by_days_remaining() {
    let analytics = spawn_analytics(vec![
        prediction("Quarterly Return", 20),
        prediction("Late Filing", 40),
        prediction("Seller Permit", 5),
        prediction("Annual Report", 10),
    ])
    .await;
    let base = spawn_app(config_with_analytics(analytics)).await;

    let resp = reqwest::get(format!("{base}/api/forms/due-soon")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let due = body["dueForms"].as_array().unwrap();

    let summary: Vec<(&str, &str)> = due
        .iter()
        .map(|f| (f["name"].as_str().unwrap(), f["priority"].as_str().unwrap()))
        .collect();
    assert_eq!(
        summary,
        [
            ("Seller Permit", "high"),
            ("Annual Report", "medium"),
            ("Quarterly Return", "low"),
        ]
    );
    assert_eq!(due[0]["documentUrl"], "https://forms.example/Seller Permit");
    assert_eq!(due[0]["dueDate"], "2026-10-21");
}

#[tokio::test]
async fn due_soon_is_capped() {
    let rows = (0..15).map(|i| prediction(&format!("Form {i}"), i)).collect();
    let analytics = spawn_analytics(rows).await;
    let base = spawn_app(config_with_analytics(analytics)).await;

    let body: Value = reqwest::get(format!("{base}/api/forms/due-soon"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["dueForms"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn due_soon_without_key_fails_before_calling_out() {
    let base = spawn_app(ServerConfig::default()).await;
    let resp = reqwest::get(format!("{base}/api/forms/due-soon")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "analytics API key is not configured");
}

#[tokio::test]
async fn due_soon_upstream_failure_is_generic() {
    let app = Router::new().route(
        "/api/sql/query",
        post(|| async { (StatusCode::BAD_GATEWAY, "secret upstream detail") }),
    );
    let analytics = format!("{}/api/sql/query", spawn(app).await);
    let base = spawn_app(config_with_analytics(analytics)).await;

    let resp = reqwest::get(format!("{base}/api/forms/due-soon")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Failed to fetch due forms");
}

/// Extraction stand-in that records every `answers` string it receives.
async fn spawn_extraction(fail: bool) -> (String, Arc<Mutex<Vec<String>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let log = received.clone();
    let app = Router::new().route(
        "/api/py/extract-info",
        post(move |axum::Json(body): axum::Json<AnswersPayload>| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(body.answers);
                if fail {
                    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(json!({"detail": "boom"})))
                } else {
                    (StatusCode::OK, axum::Json(json!({"extracted_info": {"city": "Oakland"}})))
                }
            }
        }),
    );
    (format!("{}/api/py", spawn(app).await), received)
}

#[tokio::test]
async fn chat_qna_forwards_answers_and_echoes_them() {
    let (extraction_url, received) = spawn_extraction(false).await;
    let base = spawn_app(ServerConfig {
        extraction_url,
        ..ServerConfig::default()
    })
    .await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/api/send-chat-qna"))
        .json(&json!({"answers": "x\n\ny"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["message"], "Business details fetched successfully");
    assert_eq!(body["data"]["answers"], "x\n\ny");
    assert_eq!(received.lock().unwrap().as_slice(), ["x\n\ny"]);
}

#[tokio::test]
async fn wizard_submission_reaches_extraction_service() {
    let (extraction_url, received) = spawn_extraction(false).await;
    let base = spawn_app(ServerConfig {
        extraction_url,
        ..ServerConfig::default()
    })
    .await;

    let mut wizard = Wizard::new(vec![Prompt::text("A"), Prompt::text("B")]).unwrap();
    wizard.start();
    wizard.record_answer("x").unwrap();
    wizard.record_answer("y").unwrap();
    let reply = wizard.submit(&ChatQnaClient::new(base)).await.unwrap();

    assert_eq!(reply.data.answers, "x\n\ny");
    assert_eq!(received.lock().unwrap().as_slice(), ["x\n\ny"]);
}

#[tokio::test]
async fn chat_qna_upstream_failure() {
    let (extraction_url, _) = spawn_extraction(true).await;
    let base = spawn_app(ServerConfig {
        extraction_url,
        ..ServerConfig::default()
    })
    .await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/api/send-chat-qna"))
        .json(&json!({"answers": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"error": "Failed to fetch business data"}));
}

#[tokio::test]
async fn chat_qna_stalled_extraction_times_out() {
    let app = Router::new().route(
        "/api/py/extract-info",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            axum::Json(json!({}))
        }),
    );
    let base = spawn_app(ServerConfig {
        extraction_url: format!("{}/api/py", spawn(app).await),
        upstream_timeout: Duration::from_millis(300),
        ..ServerConfig::default()
    })
    .await;

    let started = std::time::Instant::now();
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/send-chat-qna"))
        .json(&json!({"answers": "x"}))
        .send()
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"error": "Failed to fetch business data"}));
}

#[tokio::test]
async fn chat_qna_rejects_malformed_bodies() {
    let base = spawn_app(ServerConfig::default()).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/send-chat-qna"))
        .json(&json!({"wrong": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn chat_qna_forwards_blank_answers() {
    let (extraction_url, received) = spawn_extraction(false).await;
    let base = spawn_app(ServerConfig {
        extraction_url,
        ..ServerConfig::default()
    })
    .await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/api/send-chat-qna"))
        .json(&json!({"answers": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["answers"], "   ");
    assert_eq!(received.lock().unwrap().as_slice(), ["   "]);
}

#[tokio::test]
async fn extract_info_uses_llm() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            axum::Json(json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"business_name_dba\": \"Acme\"}"}}]
            }))
        }),
    );
    let llm_url = format!("{}/v1/chat/completions", spawn(app).await);
    let base = spawn_app(ServerConfig {
        llm_url,
        llm_key: Some("tg-test".into()),
        ..ServerConfig::default()
    })
    .await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/api/extract-info"))
        .json(&json!({"answers": "We are Acme."}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["extracted_info"]["business_name_dba"], "Acme");
}

#[tokio::test]
async fn extract_info_without_key() {
    let base = spawn_app(ServerConfig::default()).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/extract-info"))
        .json(&json!({"answers": "hello"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "LLM API key is not configured");
}

#[tokio::test]
async fn dashboard_sorts_and_summarises() {
    let base = spawn_app(ServerConfig::default()).await;

    let body: Value = reqwest::get(format!("{base}/api/dashboard?sort=name&direction=desc"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = body["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    let mut expected = names.clone();
    expected.sort_by(|a, b| b.cmp(a));
    assert_eq!(names, expected);

    assert_eq!(body["completion"]["all"]["totalCount"], 15);
    // 1005 (2026-10-31) and 1008 (2026-11-01) fall inside the window.
    let due: Vec<&str> = body["dueSoon"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["dueDate"].as_str().unwrap())
        .collect();
    assert_eq!(due, ["2026-10-31", "2026-11-01"]);

    let resp = reqwest::get(format!("{base}/api/dashboard?sort=colour")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_version() {
    let base = spawn_app(ServerConfig::default()).await;
    let body: Value = reqwest::get(format!("{base}/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "ok");
    assert!(body["version"].is_string());
}
