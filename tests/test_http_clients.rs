//! Gemini and Supabase clients against local fake servers.

mod common;

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{Engine as _, engine::general_purpose};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

use common::{png, scenario_metrics, scenario_result};
use implant_consult::backend::{
    AuthService, AuthSession, AuthUser, CatalogBackend, SessionStore, SupabaseClient,
};
use implant_consult::catalog::{CatalogItem, CatalogKind, seed};
use implant_consult::model::{CameraAngle, OptionId, RenderStyle};
use implant_consult::processing::{ImagePreprocessor, PreparedImage};
use implant_consult::{
    AiService, ConsultConfig, ConsultationSession, GeminiClient, SimulationRequest,
};

/// Requests seen by a fake server: path, headers of interest and body.
type Log = Arc<Mutex<Vec<(String, HeaderMap, Value)>>>;

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn prepared() -> PreparedImage {
    ImagePreprocessor::default().preprocess(&png(32, 32)).unwrap()
}

fn gemini_config(base_url: String) -> ConsultConfig {
    ConsultConfig {
        ai_api_key: Some("test-key".into()),
        ai_base_url: base_url,
        ..ConsultConfig::default()
    }
}

fn text_answer(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
}

/// Fake `generateContent` endpoint answering every call with `reply`.
async fn fake_gemini(status: StatusCode, reply: Value) -> (String, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .route(
            "/models/{call}",
            post(
                move |State(log): State<Log>,
                      Path(call): Path<String>,
                      headers: HeaderMap,
                      Json(body): Json<Value>| {
                    let reply = reply.clone();
                    async move {
                        log.lock().unwrap().push((call, headers, body));
                        (status, Json(reply))
                    }
                },
            ),
        )
        .with_state(log.clone());
    (serve(app).await, log)
}

#[tokio::test]
async fn recommendation_request_and_answer() {
    let answer = serde_json::to_string(&scenario_result()).unwrap();
    let (url, log) = fake_gemini(StatusCode::OK, text_answer(&format!("```json\n{}\n```", answer))).await;
    let client = GeminiClient::from_config(&gemini_config(url)).unwrap();

    let result = client.recommend(&scenario_metrics(), &prepared()).await.unwrap();
    assert_eq!(result.option1.volume, 275);
    assert_eq!(result.option2.volume, 325);
    assert!(!result.is_placeholder());

    let log = log.lock().unwrap();
    let (call, headers, body) = &log[0];
    assert_eq!(call, "gemini-2.5-flash:generateContent");
    assert_eq!(headers["x-goog-api-key"], "test-key");
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/jpeg");
    assert!(body["systemInstruction"]["parts"][0]["text"].is_string());
    assert!(
        body["safetySettings"]
            .as_array()
            .unwrap()
            .iter()
            .all(|s| s["threshold"] == "BLOCK_NONE")
    );
}

#[tokio::test]
async fn rate_limit_is_quota_and_session_degrades_to_placeholder() {
    let envelope = json!({
        "error": { "code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" }
    });
    let (url, _log) = fake_gemini(StatusCode::TOO_MANY_REQUESTS, envelope).await;
    let config = gemini_config(url);

    let client = GeminiClient::from_config(&config).unwrap();
    let err = client.recommend(&scenario_metrics(), &prepared()).await.unwrap_err();
    assert!(err.is_quota());

    let session = ConsultationSession::from_config(&config).unwrap();
    let result = session.submit(scenario_metrics(), &png(32, 32)).await.unwrap();
    assert!(result.is_placeholder());
}

#[tokio::test]
async fn prose_instead_of_json_is_malformed() {
    let (url, _log) = fake_gemini(StatusCode::OK, text_answer("Xin lỗi, tôi không thể giúp.")).await;
    let client = GeminiClient::from_config(&gemini_config(url)).unwrap();

    let err = client.recommend(&scenario_metrics(), &prepared()).await.unwrap_err();
    assert_eq!(err.category(), "malformed_response");
}

#[tokio::test]
async fn simulation_returns_inline_image_bytes() {
    let pixels = png(8, 8);
    let reply = json!({
        "candidates": [{ "content": { "parts": [
            { "text": "Here is the simulation." },
            { "inlineData": { "mimeType": "image/png", "data": general_purpose::STANDARD.encode(&pixels) } }
        ] } }]
    });
    let (url, log) = fake_gemini(StatusCode::OK, reply).await;
    let client = GeminiClient::from_config(&gemini_config(url)).unwrap();
    let metrics = scenario_metrics();
    let result = scenario_result();
    let image = prepared();

    let bytes = client
        .simulate(&SimulationRequest {
            metrics: &metrics,
            option: result.option(OptionId::First),
            image: &image,
            style: RenderStyle::Wireframe,
            angle: CameraAngle::LeftProfile,
        })
        .await
        .unwrap();
    assert_eq!(bytes, pixels);

    let log = log.lock().unwrap();
    let (call, _, body) = &log[0];
    assert_eq!(call, "gemini-2.5-flash-image:generateContent");
    let prompt = body["contents"][0]["parts"][1]["text"].as_str().unwrap();
    assert!(prompt.contains("275cc"));
    assert!(prompt.contains("330cc"));
}

#[tokio::test]
async fn simulation_stopped_for_safety_is_reported() {
    let reply = json!({ "candidates": [{ "finishReason": "IMAGE_SAFETY" }] });
    let (url, _log) = fake_gemini(StatusCode::OK, reply).await;
    let client = GeminiClient::from_config(&gemini_config(url)).unwrap();
    let metrics = scenario_metrics();
    let result = scenario_result();
    let image = prepared();

    let err = client
        .simulate(&SimulationRequest {
            metrics: &metrics,
            option: result.option(OptionId::Second),
            image: &image,
            style: RenderStyle::Photorealistic,
            angle: CameraAngle::Front,
        })
        .await
        .unwrap_err();
    assert_eq!(err.category(), "safety_block");
}

#[tokio::test]
async fn missing_key_fails_without_network() {
    let config = ConsultConfig {
        ai_base_url: "http://127.0.0.1:9".into(),
        ..ConsultConfig::default()
    };
    let client = GeminiClient::from_config(&config).unwrap();
    assert!(!client.has_api_key());

    let err = client.recommend(&scenario_metrics(), &prepared()).await.unwrap_err();
    assert_eq!(err.category(), "config");
}

/// Fake Supabase project: PostgREST, Storage and GoTrue routes.
async fn fake_supabase(log: Log) -> String {
    let app = Router::new()
        .route(
            "/rest/v1/products",
            get(|| async {
                let rows: Vec<Value> = seed::products()
                    .into_iter()
                    .map(|p| serde_json::to_value(p).unwrap())
                    .collect();
                Json(Value::Array(rows))
            }),
        )
        .route(
            "/rest/v1/clinics",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({
                        "code": "42501",
                        "message": "new row violates row-level security policy for table \"clinics\""
                    })),
                )
            }),
        )
        .route(
            "/storage/v1/object/{bucket}/{*name}",
            post(
                |State(log): State<Log>, Path((bucket, name)): Path<(String, String)>, headers: HeaderMap| async move {
                    log.lock().unwrap().push((format!("{}/{}", bucket, name), headers, Value::Null));
                    Json(json!({ "Key": format!("{}/{}", bucket, name) }))
                },
            ),
        )
        .route(
            "/auth/v1/token",
            post(|Json(body): Json<Value>| async move {
                if body["password"] != "correct horse" {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })),
                    );
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "access_token": "jwt-1",
                        "refresh_token": "r-1",
                        "expires_in": 3600,
                        "user": { "id": "admin-1", "email": body["email"] }
                    })),
                )
            }),
        )
        .route(
            "/auth/v1/user",
            get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "JWT expired" }))) }),
        )
        .with_state(log);
    serve(app).await
}

fn supabase(url: &str) -> SupabaseClient {
    SupabaseClient::with_client(reqwest::Client::new(), url, "anon-key", "resources")
}

#[tokio::test]
async fn catalog_rows_are_fetched() {
    let url = fake_supabase(Log::default()).await;
    let rows = supabase(&url).fetch_all(CatalogKind::Products).await.unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], CatalogItem::Product(seed::products().remove(0)));
}

#[tokio::test]
async fn row_level_security_rejection_carries_hint() {
    let url = fake_supabase(Log::default()).await;
    let clinic = CatalogItem::Clinic(seed::clinics().remove(0));

    let err = supabase(&url).upsert(&clinic, "jwt").await.unwrap_err();

    assert_eq!(err.category(), "backend");
    let shown = err.user_message();
    assert!(shown.contains("row-level security"));
    assert!(shown.contains("'clinics'"));
}

#[tokio::test]
async fn upload_returns_public_url() {
    let log = Log::default();
    let url = fake_supabase(log.clone()).await;

    let public = supabase(&url)
        .upload_object("catalog/a b.png", png(2, 2), "image/png", "jwt")
        .await
        .unwrap();

    assert_eq!(
        public,
        format!("{}/storage/v1/object/public/resources/catalog/a%20b.png", url)
    );
    let log = log.lock().unwrap();
    let (path, headers, _) = &log[0];
    assert_eq!(path, "resources/catalog/a b.png");
    assert_eq!(headers["x-upsert"], "false");
    assert_eq!(headers["content-type"], "image/png");
    assert_eq!(headers["authorization"], "Bearer jwt");
    assert_eq!(headers["apikey"], "anon-key");
}

#[tokio::test]
async fn login_persists_session_and_rejected_restore_clears_it() {
    let url = fake_supabase(Log::default()).await;
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));
    let auth = AuthService::new(supabase(&url), store.clone());

    let err = auth.login("admin@clinic.vn", "wrong").await.unwrap_err();
    assert_eq!(err.category(), "auth");
    assert!(err.user_message().contains("Invalid login credentials"));
    assert!(store.load().await.unwrap().is_none());

    let gate = auth.login("admin@clinic.vn", "correct horse").await.unwrap();
    assert!(gate.is_unlocked());
    let saved = store.load().await.unwrap().expect("session file");
    assert_eq!(saved.access_token, "jwt-1");
    assert_eq!(saved.user.email.as_deref(), Some("admin@clinic.vn"));
    assert!(saved.expires_at.is_some());

    let restored = auth.restore().await.unwrap();
    assert!(!restored.is_unlocked());
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn backend_outage_keeps_saved_session() {
    let app = Router::new().route(
        "/auth/v1/user",
        get(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "message": "upstream connect error" })),
            )
        }),
    );
    let url = serve(app).await;
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));
    let saved = AuthSession {
        access_token: "jwt-1".into(),
        refresh_token: None,
        expires_at: None,
        user: AuthUser {
            id: "admin-1".into(),
            email: None,
        },
    };
    store.save(&saved).await.unwrap();
    let auth = AuthService::new(supabase(&url), store.clone());

    let err = auth.restore().await.unwrap_err();

    assert_eq!(err.category(), "api");
    assert_eq!(store.load().await.unwrap(), Some(saved));
}
