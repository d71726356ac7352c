//! End-to-end tests of the HTTP API and the reminder job, with the JSON store
//! in a temporary directory and the outbound HTTP services mocked.

use api_lib::{
    adapters::{ErApiRatesAdapter, GotifyAdapter, JsonFileStore, SmtpAdapter},
    config::Config,
    jobs,
    web::{api_router, state::AppState},
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use subtrack_core::{
    currency::RateTable,
    domain::{Settings, SpendingItem, Subscription},
    ports::{InsightService, PortError, PortResult, SettingsRepository, SubscriptionRepository},
};
use tempfile::TempDir;
use tokio::sync::RwLock;
use tower::ServiceExt;
use wiremock::{
    matchers::{body_partial_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

//=========================================================================================
// Test doubles and harness
//=========================================================================================

/// Records what it was asked and answers with a canned reply.
#[derive(Default)]
struct FakeInsights {
    seen: Mutex<Vec<(String, Vec<SpendingItem>)>>,
    fail: bool,
}

#[async_trait]
impl InsightService for FakeInsights {
    async fn analyze_spending(&self, api_key: &str, items: &[SpendingItem]) -> PortResult<String> {
        self.seen
            .lock()
            .unwrap()
            .push((api_key.to_string(), items.to_vec()));
        if self.fail {
            Err(PortError::Unexpected("model unavailable".to_string()))
        } else {
            Ok("## Summary\nAll good.".to_string())
        }
    }
}

struct Harness {
    _dir: TempDir,
    store: Arc<JsonFileStore>,
    state: Arc<AppState>,
    insights: Arc<FakeInsights>,
    server: MockServer,
}

impl Harness {
    async fn new() -> Self {
        Self::with_insights(FakeInsights::default()).await
    }

    async fn with_insights(insights: FakeInsights) -> Self {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        let store = Arc::new(JsonFileStore::new(dir.path()));
        let insights = Arc::new(insights);
        let client = reqwest::Client::new();

        let config = Config {
            data_dir: dir.path().to_path_buf(),
            rates_api_url: format!("{}/v6/latest/USD", server.uri()),
            ..Config::default()
        };

        let state = Arc::new(AppState {
            config: Arc::new(config.clone()),
            subscriptions: store.clone(),
            settings: store.clone(),
            rate_source: Arc::new(ErApiRatesAdapter::new(client.clone(), config.rates_api_url)),
            insights: insights.clone(),
            push_channel: Arc::new(GotifyAdapter::new(client)),
            email_channel: Arc::new(SmtpAdapter::new()),
            rates: Arc::new(RwLock::new(RateTable::fallback())),
        });

        Self {
            _dir: dir,
            store,
            state,
            insights,
            server,
        }
    }

    fn router(&self) -> Router {
        api_router(self.state.clone())
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn gotify_settings(&self) -> Value {
        json!({ "gotifyUrl": self.server.uri(), "gotifyToken": "tok" })
    }
}

fn netflix() -> Value {
    json!({
        "Name": "Netflix",
        "Price": "$10",
        "Payment Cycle": "Monthly",
        "Next Payment": "2024-06-03",
        "Category": "Entertainment",
        "Active": "Yes"
    })
}

fn assert_close(actual: &Value, expected: f64) {
    let actual = actual.as_f64().unwrap();
    assert!((actual - expected).abs() < 1e-6, "{} != {}", actual, expected);
}

//=========================================================================================
// Subscriptions
//=========================================================================================

#[tokio::test]
async fn empty_store_lists_nothing() {
    let h = Harness::new().await;
    let (status, body) = h.call(Method::GET, "/api/subscriptions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscriptions"], json!([]));
    assert_close(&body["stats"]["totalMonthlyINR"], 0.0);
    assert_eq!(body["stats"]["mostExpensive"], Value::Null);
}

#[tokio::test]
async fn created_record_is_enriched_and_counted() {
    let h = Harness::new().await;
    let (status, saved) = h.call(Method::POST, "/api/subscriptions", Some(netflix())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(saved["id"].as_str().is_some_and(|id| !id.is_empty()));

    let (_, body) = h.call(Method::GET, "/api/subscriptions", None).await;
    let record = &body["subscriptions"][0];
    assert_eq!(record["Name"], "Netflix");
    assert_eq!(record["currency"], "$");
    assert_close(&record["value"], 10.0);
    assert_close(&record["valueINR"], 855.0);
    assert_close(&record["monthlyCost"], 855.0);
    assert_close(&record["yearlyCost"], 10260.0);
    assert_eq!(record["logoUrl"], "https://logo.clearbit.com/netflix.com");

    let stats = &body["stats"];
    assert_close(&stats["totalMonthlyINR"], 855.0);
    assert_close(&stats["totalYearlyINR"], 10260.0);
    assert_close(&stats["categoryStats"]["Entertainment"], 855.0);
    assert_eq!(stats["mostExpensive"]["Name"], "Netflix");
    assert_eq!(stats["monthlyTrend"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn derived_fields_posted_back_are_not_stored() {
    let h = Harness::new().await;
    let mut payload = netflix();
    payload["valueINR"] = json!(1234.0);
    payload["monthlyCost"] = json!(1.0);
    h.call(Method::POST, "/api/subscriptions", Some(payload)).await;

    let raw = std::fs::read_to_string(h.store.subscriptions_path()).unwrap();
    assert!(!raw.contains("valueINR"));
    assert!(!raw.contains("monthlyCost"));
}

#[tokio::test]
async fn update_by_id_keeps_count_and_other_records() {
    let h = Harness::new().await;
    let (_, first) = h.call(Method::POST, "/api/subscriptions", Some(netflix())).await;
    let (_, second) = h
        .call(
            Method::POST,
            "/api/subscriptions",
            Some(json!({"Name": "Gym", "Price": "₹900", "Payment Cycle": "Quarterly", "Active": "Yes"})),
        )
        .await;

    let (status, updated) = h
        .call(
            Method::POST,
            "/api/subscriptions",
            Some(json!({"id": first["id"], "Active": "No"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["Name"], "Netflix");
    assert_eq!(updated["Active"], "No");

    let (_, body) = h.call(Method::GET, "/api/subscriptions", None).await;
    let list = body["subscriptions"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[1]["id"], second["id"]);
    assert_eq!(list[1]["Name"], "Gym");
    // Only the quarterly gym membership is still active.
    assert_close(&body["stats"]["totalMonthlyINR"], 300.0);
    assert_close(&body["stats"]["totalYearlyINR"], 3600.0);
}

#[tokio::test]
async fn delete_removes_and_unknown_id_is_noop() {
    let h = Harness::new().await;
    let (_, saved) = h.call(Method::POST, "/api/subscriptions", Some(netflix())).await;

    let (status, body) = h.call(Method::DELETE, "/api/subscriptions/nope", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(h.store.list_subscriptions().await.unwrap().len(), 1);

    let uri = format!("/api/subscriptions/{}", saved["id"].as_str().unwrap());
    let (status, _) = h.call(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.store.list_subscriptions().await.unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_data_file_is_a_500_with_message() {
    let h = Harness::new().await;
    std::fs::write(h.store.subscriptions_path(), "not json").unwrap();
    let (status, body) = h.call(Method::GET, "/api/subscriptions", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Failed to parse"));
}

#[tokio::test]
async fn display_currency_follows_settings() {
    let h = Harness::new().await;
    h.call(Method::POST, "/api/subscriptions", Some(netflix())).await;
    h.call(Method::POST, "/api/settings", Some(json!({"mainCurrency": "USD"})))
        .await;

    let (_, body) = h.call(Method::GET, "/api/subscriptions", None).await;
    assert_eq!(body["stats"]["display"]["currency"], "USD");
    assert_close(&body["stats"]["display"]["monthly"], 10.0);
}

//=========================================================================================
// Calendar
//=========================================================================================

#[tokio::test]
async fn calendar_groups_by_day() {
    let h = Harness::new().await;
    h.call(Method::POST, "/api/subscriptions", Some(netflix())).await;
    let (status, body) = h
        .call(Method::GET, "/api/calendar?year=2024&month=6", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"][0]["date"], "2024-06-03");
    assert_eq!(body["days"][0]["subscriptions"][0]["Name"], "Netflix");
    assert_close(&body["days"][0]["totalINR"], 855.0);

    let (status, _) = h
        .call(Method::GET, "/api/calendar?year=2024&month=13", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

//=========================================================================================
// Settings
//=========================================================================================

#[tokio::test]
async fn settings_start_empty_and_are_replaced_wholesale() {
    let h = Harness::new().await;
    let (status, body) = h.call(Method::GET, "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    h.call(
        Method::POST,
        "/api/settings",
        Some(json!({"gotifyUrl": "http://push", "smtpHost": "smtp.example.com"})),
    )
    .await;
    let (status, saved) = h
        .call(Method::POST, "/api/settings", Some(json!({"mainCurrency": "EUR"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved, json!({"mainCurrency": "EUR"}));

    let (_, body) = h.call(Method::GET, "/api/settings", None).await;
    assert_eq!(body, json!({"mainCurrency": "EUR"}));
}

#[tokio::test]
async fn stored_model_key_is_served_under_the_same_name() {
    let h = Harness::new().await;
    h.call(
        Method::POST,
        "/api/settings",
        Some(json!({"geminiApiKey": "k", "gotifyUrl": "http://push"})),
    )
    .await;

    let (status, body) = h.call(Method::GET, "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"geminiApiKey": "k", "gotifyUrl": "http://push"}));

    let raw = std::fs::read_to_string(h.store.settings_path()).unwrap();
    assert!(raw.contains("geminiApiKey"));
}

#[tokio::test]
async fn listing_survives_corrupt_settings() {
    let h = Harness::new().await;
    h.call(Method::POST, "/api/subscriptions", Some(netflix())).await;
    std::fs::write(h.store.settings_path(), "{broken").unwrap();

    let (status, body) = h.call(Method::GET, "/api/subscriptions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscriptions"].as_array().unwrap().len(), 1);
    assert_eq!(body["stats"]["display"]["currency"], "INR");
    assert_close(&body["stats"]["display"]["monthly"], 855.0);
}

//=========================================================================================
// AI analysis
//=========================================================================================

#[tokio::test]
async fn analyze_requires_a_key() {
    let h = Harness::new().await;
    let (status, body) = h.call(Method::POST, "/api/ai/analyze", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "API Key is required");
}

#[tokio::test]
async fn analyze_sends_only_active_projection() {
    let h = Harness::new().await;
    h.call(Method::POST, "/api/subscriptions", Some(netflix())).await;
    h.call(
        Method::POST,
        "/api/subscriptions",
        Some(json!({"Name": "Old", "Price": "₹1", "Active": "No"})),
    )
    .await;

    let (status, body) = h
        .call(Method::POST, "/api/ai/analyze", Some(json!({"apiKey": "sk-test"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"], "## Summary\nAll good.");

    let seen = h.insights.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "sk-test");
    assert_eq!(
        seen[0].1,
        vec![SpendingItem {
            name: "Netflix".into(),
            price: "$10".into(),
            cycle: "Monthly".into(),
            category: "Entertainment".into(),
        }]
    );
}

#[tokio::test]
async fn analyze_falls_back_to_stored_key() {
    let h = Harness::new().await;
    h.store
        .save_settings(&Settings {
            llm_api_key: Some("stored-key".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let (status, _) = h
        .call(Method::POST, "/api/ai/analyze", Some(json!({"apiKey": "  "})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.insights.seen.lock().unwrap()[0].0, "stored-key");
}

#[tokio::test]
async fn analyze_failure_is_reported() {
    let h = Harness::with_insights(FakeInsights {
        fail: true,
        ..Default::default()
    })
    .await;
    let (status, body) = h
        .call(Method::POST, "/api/ai/analyze", Some(json!({"apiKey": "k"})))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("AI Analysis failed: "));
}

//=========================================================================================
// Notification tests
//=========================================================================================

#[tokio::test]
async fn gotify_test_posts_message_with_token() {
    let h = Harness::new().await;
    h.call(Method::POST, "/api/subscriptions", Some(netflix())).await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .and(query_param("token", "tok"))
        .and(body_partial_json(json!({"title": "Subscriptions App Test", "priority": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&h.server)
        .await;

    let (status, body) = h
        .call(Method::POST, "/api/test/gotify", Some(h.gotify_settings()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
}

#[tokio::test]
async fn gotify_test_reports_server_errors() {
    let h = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    let (status, body) = h
        .call(Method::POST, "/api/test/gotify", Some(h.gotify_settings()))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Failed to send Gotify notification"));
}

#[tokio::test]
async fn unconfigured_channels_are_rejected() {
    let h = Harness::new().await;
    let (status, body) = h
        .call(Method::POST, "/api/test/gotify", Some(json!({"gotifyUrl": "http://x"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Gotify URL and token are required");

    let (status, body) = h
        .call(Method::POST, "/api/test/email", Some(json!({"smtpHost": "smtp.example.com"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "SMTP host and user are required");
}

//=========================================================================================
// Exchange rates
//=========================================================================================

#[tokio::test]
async fn refresh_applies_live_rates() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/v6/latest/USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "success",
            "base_code": "USD",
            "rates": {"USD": 1.0, "INR": 80.0, "EUR": 0.8}
        })))
        .mount(&h.server)
        .await;

    let (status, body) = h.call(Method::POST, "/api/rates/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "live");
    assert_close(&body["rates"]["$"], 80.0);
    assert_close(&body["rates"]["EUR"], 100.0);

    h.call(Method::POST, "/api/subscriptions", Some(netflix())).await;
    let (_, list) = h.call(Method::GET, "/api/subscriptions", None).await;
    assert_close(&list["stats"]["totalMonthlyINR"], 800.0);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_rates() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/v6/latest/USD"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.server)
        .await;

    let (status, _) = h.call(Method::POST, "/api/rates/refresh", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, body) = h.call(Method::GET, "/api/rates", None).await;
    assert_eq!(body["source"], "fallback");
    assert_close(&body["rates"]["$"], 85.5);
}

#[tokio::test]
async fn refresh_without_home_currency_is_rejected() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/v6/latest/USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "success",
            "base_code": "USD",
            "rates": {"USD": 1.0}
        })))
        .mount(&h.server)
        .await;

    let (status, _) = h.call(Method::POST, "/api/rates/refresh", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(*h.state.rates.read().await, RateTable::fallback());
}

//=========================================================================================
// Reminder job
//=========================================================================================

async fn seed_due_records(store: &JsonFileStore) {
    for (name, date) in [("Soon", "2024-06-03"), ("Later", "2024-06-10")] {
        store
            .save_subscription(Subscription {
                name: Some(name.into()),
                price: Some("₹99".into()),
                payment_cycle: Some("Monthly".into()),
                next_payment: Some(date.into()),
                active: Some("Yes".into()),
                ..Default::default()
            })
            .await
            .unwrap();
    }
}

fn june_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

#[tokio::test]
async fn reminder_pushes_due_records() {
    let h = Harness::new().await;
    seed_due_records(&h.store).await;
    h.store
        .save_settings(&Settings {
            gotify_url: Some(h.server.uri()),
            gotify_token: Some("tok".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/message"))
        .and(body_partial_json(json!({
            "title": "Upcoming Payments",
            "message": "You have 1 subscriptions due soon:\n- Soon (₹99) due on 2024-06-03"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;

    let report = jobs::run_reminder_check(&h.state, june_first()).await.unwrap();
    assert_eq!(report.due, 1);
    assert_eq!(report.delivered, vec!["gotify"]);
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn reminder_channel_failure_does_not_block_others() {
    let h = Harness::new().await;
    seed_due_records(&h.store).await;
    h.store
        .save_settings(&Settings {
            gotify_url: Some(h.server.uri()),
            gotify_token: Some("tok".into()),
            // Nothing listens here, so the email channel fails to connect.
            smtp_host: Some("127.0.0.1".into()),
            smtp_port: Some("1".into()),
            smtp_user: Some("me@example.com".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&h.server)
        .await;

    let report = jobs::run_reminder_check(&h.state, june_first()).await.unwrap();
    assert_eq!(report.delivered, vec!["gotify"]);
    assert_eq!(report.failed, vec!["email"]);
}

#[tokio::test]
async fn reminder_without_due_records_sends_nothing() {
    let h = Harness::new().await;
    seed_due_records(&h.store).await;
    let far_away = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let report = jobs::run_reminder_check(&h.state, far_away).await.unwrap();
    assert_eq!(report, jobs::ReminderReport::default());
}

//=========================================================================================
// Request bodies
//=========================================================================================

async fn post_raw(h: &Harness, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = h.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn malformed_body_gets_json_error() {
    let h = Harness::new().await;
    let (status, body) = post_raw(&h, "/api/subscriptions", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn mistyped_field_gets_json_error() {
    let h = Harness::new().await;
    let (status, body) = post_raw(&h, "/api/subscriptions", r#"{"Active": true}"#).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert!(h.store.list_subscriptions().await.unwrap().is_empty());

    let (status, body) = post_raw(&h, "/api/settings", r#"{"gotifyUrl": 5}"#).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}

//=========================================================================================
// Routing
//=========================================================================================

#[tokio::test]
async fn unknown_api_path_is_json_404() {
    let h = Harness::new().await;
    let (status, body) = h.call(Method::GET, "/api/nothing/here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}
