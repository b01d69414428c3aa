mod common;

use axum::extract::{Multipart, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use common::signed_in_context;
use ragchat::api::{ApiError, Backend, ChatRequest, FileScope, HttpBackend};
use ragchat::attachment::Attachment;
use ragchat::credentials::{MemoryStore, SessionContext};
use ragchat_shared::{AuthRequest, RagMode, Role};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn authorized(headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some("Bearer tok") => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Could not validate credentials" })),
        )),
    }
}

/// Reads every part as `name -> [(file name, text)]`.
async fn fields(mut multipart: Multipart) -> BTreeMap<String, Vec<(Option<String>, String)>> {
    let mut out: BTreeMap<String, Vec<_>> = BTreeMap::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap();
        out.entry(name)
            .or_default()
            .push((file_name, String::from_utf8_lossy(&bytes).into_owned()));
    }
    out
}

async fn sessions(headers: HeaderMap) -> Reply {
    authorized(&headers)?;
    Ok(Json(json!({
        "sessions": [{
            "session_id": "s1",
            "messages_count": 2,
            "messages": [
                { "role": "system", "content": "You are an expert." },
                { "role": "user", "content": "hi" }
            ]
        }]
    })))
}

async fn chat(headers: HeaderMap, multipart: Multipart) -> Reply {
    authorized(&headers)?;
    let fields = fields(multipart).await;
    let text = |name: &str| fields[name][0].1.clone();
    let image = fields
        .get("image")
        .and_then(|parts| parts[0].0.clone())
        .unwrap_or_else(|| "-".into());
    Ok(Json(json!({
        "message": format!("{}|{}|{}|{}", text("message"), text("session_id"), text("rag_mode"), image),
        "image": null
    })))
}

async fn upload(headers: HeaderMap, multipart: Multipart) -> Reply {
    authorized(&headers)?;
    let fields = fields(multipart).await;
    let names: Vec<String> = fields["files"]
        .iter()
        .filter_map(|(name, _)| name.clone())
        .collect();
    Ok(Json(json!({
        "message": format!("{} with {}", names.join("+"), fields["tags"][0].1)
    })))
}

async fn remove(Path(id): Path<String>) -> Reply {
    if id == "s1" {
        Ok(Json(json!({ "message": "deleted" })))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Session not found" })),
        ))
    }
}

async fn login(Json(body): Json<Value>) -> Reply {
    if body["password"] == "secret" {
        Ok(Json(json!({
            "access_token": "tok",
            "token_type": "bearer",
            "username": body["username"],
            "is_admin": false,
            "message": "Login successful"
        })))
    } else {
        Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [{ "msg": "Invalid credentials" }] })),
        ))
    }
}

async fn serve() -> String {
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/chat/sessions", get(sessions))
        .route("/chat/sessions/{id}", delete(remove))
        .route("/chat/chat_ai", post(chat))
        .route("/admin/upload", post(upload));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

fn backend(base_url: &str, context: Arc<SessionContext>) -> HttpBackend {
    HttpBackend::new(base_url, Duration::from_secs(5), context).unwrap()
}

#[tokio::test]
async fn sessions_are_fetched_with_bearer_token() {
    let url = serve().await;
    let backend = backend(&url, signed_in_context(false));

    let sessions = backend.list_sessions().await.unwrap();

    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, "s1");
    assert_eq!(sessions[0].message_count, 2);
    assert_eq!(sessions[0].messages[0].role, Role::System);
}

#[tokio::test]
async fn missing_token_maps_to_unauthorized() {
    let url = serve().await;
    let anonymous = Arc::new(SessionContext::init(Box::new(MemoryStore::new())));
    let backend = backend(&url, anonymous);

    let err = backend.list_sessions().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.detail(), Some("Could not validate credentials"));
}

#[tokio::test]
async fn chat_sends_multipart_fields() {
    let url = serve().await;
    let backend = backend(&url, signed_in_context(false));

    let reply = backend
        .chat(ChatRequest {
            message: "Hello".into(),
            session_id: "s1".into(),
            rag_mode: RagMode::NoRag,
            image: Some(Attachment::from_bytes("cat.png", vec![0x89, 0x50, 0x4e, 0x47])),
        })
        .await
        .unwrap();

    assert_eq!(reply.message, "Hello|s1|no-rag|cat.png");
    assert!(reply.image.is_none());
}

#[tokio::test]
async fn upload_repeats_files_part() {
    let url = serve().await;
    let backend = backend(&url, signed_in_context(true));

    let reply = backend
        .upload_files(
            FileScope::Admin,
            vec![
                Attachment::from_bytes("a.pdf", b"%PDF".to_vec()),
                Attachment::from_bytes("b.txt", b"notes".to_vec()),
            ],
            "ai,notes".into(),
        )
        .await
        .unwrap();

    assert_eq!(reply.message, "a.pdf+b.txt with ai,notes");
}

#[tokio::test]
async fn delete_reports_backend_detail() {
    let url = serve().await;
    let backend = backend(&url, signed_in_context(false));

    backend.delete_session("s1").await.unwrap();
    let err = backend.delete_session("nope").await.unwrap_err();

    match err {
        ApiError::Status { status, detail } => {
            assert_eq!(status, 404);
            assert_eq!(detail, "Session not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn validation_detail_is_flattened() {
    let url = serve().await;
    let backend = backend(&url, signed_in_context(false));

    let ok = backend
        .login(&AuthRequest {
            username: "ada".into(),
            password: "secret".into(),
        })
        .await
        .unwrap();
    assert_eq!(ok.access_token, "tok");

    let err = backend
        .login(&AuthRequest {
            username: "ada".into(),
            password: "wrong".into(),
        })
        .await
        .unwrap_err();
    assert!(!err.is_unauthorized());
    assert_eq!(err.detail(), Some("Invalid credentials"));
}
