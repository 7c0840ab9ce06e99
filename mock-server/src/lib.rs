use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Invite {
    pub code: String,
    pub uses: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub message: String,
}

pub const AUDIT_LOG_REASON: &str = "x-audit-log-reason";
pub const SEEDED_INVITE: &str = "rust";
/// Size of each chunk served by `/large` and `/stream`.
pub const CHUNK_SIZE: usize = 1024;
/// Number of chunks served by `/large` and `/stream`.
pub const CHUNK_COUNT: usize = 2000;

#[derive(Clone)]
pub struct Db {
    users: Arc<RwLock<HashMap<Uuid, UserProfile>>>,
    invites: Arc<RwLock<HashMap<String, Invite>>>,
    landings: Arc<AtomicUsize>,
}

pub fn app() -> Router {
    let mut invites = HashMap::new();
    invites.insert(
        SEEDED_INVITE.to_string(),
        Invite {
            code: SEEDED_INVITE.to_string(),
            uses: 3,
            deleted_reason: None,
        },
    );
    let db = Db {
        users: Arc::default(),
        invites: Arc::new(RwLock::new(invites)),
        landings: Arc::default(),
    };
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/invites/{code}", get(get_invite).delete(delete_invite))
        .route("/headers", get(echo_headers))
        .route("/ping", get(ping))
        .route("/ratelimited", get(rate_limited))
        .route("/broken", get(broken))
        .route("/not-modified", get(not_modified))
        .route("/moved", get(moved))
        .route("/landing", get(landing))
        .route("/landings", get(landings))
        .route("/large", get(large))
        .route("/stream", get(stream))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn api_error(status: StatusCode, code: i64, message: &str) -> Response {
    (
        status,
        Json(ApiError {
            code,
            message: message.to_string(),
        }),
    )
        .into_response()
}

async fn create_user(State(db): State<Db>, Json(input): Json<CreateUser>) -> (StatusCode, Json<UserProfile>) {
    let user = UserProfile {
        id: Uuid::new_v4(),
        username: input.username,
        bot: input.bot,
    };
    db.users.write().await.insert(user.id, user.clone());
    (StatusCode::CREATED, Json(user))
}

async fn get_user(State(db): State<Db>, Path(id): Path<Uuid>) -> Response {
    match db.users.read().await.get(&id) {
        Some(user) => Json(user.clone()).into_response(),
        None => api_error(StatusCode::NOT_FOUND, 10013, "Unknown User"),
    }
}

async fn get_invite(State(db): State<Db>, Path(code): Path<String>) -> Response {
    match db.invites.read().await.get(&code) {
        Some(invite) => Json(invite.clone()).into_response(),
        None => api_error(StatusCode::NOT_FOUND, 10006, "Unknown Invite"),
    }
}

async fn delete_invite(State(db): State<Db>, Path(code): Path<String>, headers: HeaderMap) -> Response {
    let reason = headers
        .get(AUDIT_LOG_REASON)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    match db.invites.write().await.remove(&code) {
        Some(mut invite) => {
            invite.deleted_reason = reason;
            Json(invite).into_response()
        }
        None => api_error(StatusCode::NOT_FOUND, 10006, "Unknown Invite"),
    }
}

async fn echo_headers(headers: HeaderMap) -> Json<HashMap<String, Vec<String>>> {
    let mut echoed: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in &headers {
        echoed
            .entry(name.as_str().to_string())
            .or_default()
            .push(value.to_str().unwrap_or_default().to_string());
    }
    Json(echoed)
}

async fn ping() -> &'static str {
    "pong"
}

async fn rate_limited() -> Response {
    let mut response = api_error(StatusCode::TOO_MANY_REQUESTS, 0, "You are being rate limited.");
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, header::HeaderValue::from_static("1"));
    response
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

async fn not_modified() -> StatusCode {
    StatusCode::NOT_MODIFIED
}

async fn moved() -> Redirect {
    Redirect::to("/landing")
}

async fn landing(State(db): State<Db>) -> &'static str {
    db.landings.fetch_add(1, Ordering::SeqCst);
    "landed"
}

async fn landings(State(db): State<Db>) -> Json<usize> {
    Json(db.landings.load(Ordering::SeqCst))
}

/// Fixed-length body, announced up front with Content-Length.
async fn large() -> Vec<u8> {
    vec![b'x'; CHUNK_SIZE * CHUNK_COUNT]
}

/// Same payload as `/large`, sent chunked with no Content-Length.
async fn stream() -> Response {
    let chunks = futures::stream::iter((0..CHUNK_COUNT).map(|_| Ok::<_, std::io::Error>(vec![b'x'; CHUNK_SIZE])));
    Body::from_stream(chunks).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_profile_serializes_to_json() {
        let user = UserProfile {
            id: Uuid::nil(),
            username: "ada".to_string(),
            bot: false,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["username"], "ada");
        assert_eq!(json["bot"], false);
    }

    #[test]
    fn create_user_defaults_bot_to_false() {
        let input: CreateUser = serde_json::from_str(r#"{"username":"grace"}"#).unwrap();
        assert_eq!(input.username, "grace");
        assert!(!input.bot);
    }

    #[test]
    fn create_user_rejects_missing_username() {
        let result: Result<CreateUser, _> = serde_json::from_str(r#"{"bot":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn invite_omits_absent_reason() {
        let invite = Invite {
            code: "abc".to_string(),
            uses: 0,
            deleted_reason: None,
        };
        let json = serde_json::to_value(&invite).unwrap();
        assert!(json.get("deleted_reason").is_none());
    }
}
