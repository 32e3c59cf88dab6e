#![allow(dead_code)]

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

use stk_gateway::{build_router, AppConfig, AppState};

pub const MOCK_TOKEN: &str = "mock-token";
pub const SHORT_CODE: &str = "174379";
pub const PASSKEY: &str = "test-passkey";

#[derive(Clone, Default)]
pub struct Recorder {
    pub calls: Arc<AtomicUsize>,
    pub bodies: Arc<Mutex<Vec<Value>>>,
}

impl Recorder {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> Option<Value> {
        self.bodies.lock().unwrap().last().cloned()
    }

    fn record(&self, body: Value) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(body);
    }
}

#[derive(Clone)]
struct DarajaState {
    token: Recorder,
    push: Recorder,
    push_status: StatusCode,
    push_response: Value,
}

pub struct MockDaraja {
    pub base_url: String,
    pub token: Recorder,
    pub push: Recorder,
}

async fn oauth(State(state): State<DarajaState>) -> Json<Value> {
    state.token.record(Value::Null);
    Json(json!({ "access_token": MOCK_TOKEN, "expires_in": "3599" }))
}

async fn stk_push(
    State(state): State<DarajaState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.push.record(body);
    let expected = format!("Bearer {MOCK_TOKEN}");
    if headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "errorCode": "404.001.03" })));
    }
    (state.push_status, Json(state.push_response.clone()))
}

pub fn accepted_response(checkout_request_id: &str) -> Value {
    json!({
        "MerchantRequestID": "29115-34620561-1",
        "CheckoutRequestID": checkout_request_id,
        "ResponseCode": "0",
        "ResponseDescription": "Success. Request accepted for processing",
        "CustomerMessage": "Success. Request accepted for processing"
    })
}

pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("failed to read listener addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server failed");
    });
    format!("http://{addr}")
}

pub async fn spawn_daraja(push_status: StatusCode, push_response: Value) -> MockDaraja {
    let state = DarajaState {
        token: Recorder::default(),
        push: Recorder::default(),
        push_status,
        push_response,
    };
    let app = Router::new()
        .route("/oauth/v1/generate", get(oauth))
        .route("/mpesa/stkpush/v1/processrequest", post(stk_push))
        .with_state(state.clone());

    MockDaraja {
        base_url: serve(app).await,
        token: state.token,
        push: state.push,
    }
}

#[derive(Clone)]
struct HookState {
    recorder: Recorder,
    status: StatusCode,
}

async fn hook(State(state): State<HookState>, Json(body): Json<Value>) -> StatusCode {
    state.recorder.record(body);
    state.status
}

/// Returns the webhook URL and its recorder.
pub async fn spawn_webhook(status: StatusCode) -> (String, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new().route("/hook", post(hook)).with_state(HookState {
        recorder: recorder.clone(),
        status,
    });
    (format!("{}/hook", serve(app).await), recorder)
}

pub fn test_config(base_url: &str, webhook_url: Option<String>) -> AppConfig {
    AppConfig {
        consumer_key: Some("consumer-key".to_string()),
        consumer_secret: Some("consumer-secret".to_string()),
        base_url_override: Some(base_url.to_string()),
        business_short_code: Some(SHORT_CODE.to_string()),
        passkey: Some(PASSKEY.to_string()),
        callback_url: Some("https://example.com/api/callback".to_string()),
        webhook_url,
        ..AppConfig::default()
    }
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new(config: AppConfig) -> Self {
        let state = AppState::new(config).expect("failed to build state");
        let router = build_router(state.clone());
        TestApp { state, router }
    }

    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }
}

pub fn push_body() -> Value {
    json!({
        "registration_id": "REG-001",
        "phone": "0712345678",
        "referral_code": "FRIEND10",
        "amount": 1500,
        "email": "jane@example.com"
    })
}

pub async fn wait_for(recorder: &Recorder, expected: usize) -> bool {
    for _ in 0..100 {
        if recorder.count() >= expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
