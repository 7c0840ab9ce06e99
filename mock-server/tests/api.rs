use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, ApiError, Invite, UserProfile, AUDIT_LOG_REASON, CHUNK_COUNT, CHUNK_SIZE, SEEDED_INVITE};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn content_type(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
}

// --- users ---

#[tokio::test]
async fn create_user_returns_201() {
    let resp = app()
        .oneshot(json_request("POST", "/users", r#"{"username":"ada"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: UserProfile = body_json(resp).await;
    assert_eq!(user.username, "ada");
    assert!(!user.bot);
}

#[tokio::test]
async fn create_user_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/users", r#"{"name":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_user_returns_json_error() {
    let resp = app()
        .oneshot(get("/users/00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(content_type(&resp), "application/json");
    let err: ApiError = body_json(resp).await;
    assert_eq!(err.code, 10013);
    assert_eq!(err.message, "Unknown User");
}

#[tokio::test]
async fn bad_uuid_returns_400() {
    let resp = app().oneshot(get("/users/not-a-uuid")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn created_user_can_be_fetched() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/users", r#"{"username":"grace","bot":true}"#))
        .await
        .unwrap();
    let created: UserProfile = body_json(resp).await;

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/users/{}", created.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: UserProfile = body_json(resp).await;
    assert_eq!(fetched, created);
}

// --- invites ---

#[tokio::test]
async fn seeded_invite_is_served() {
    let resp = app().oneshot(get(&format!("/invites/{SEEDED_INVITE}"))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let invite: Invite = body_json(resp).await;
    assert_eq!(invite.code, SEEDED_INVITE);
    assert!(invite.deleted_reason.is_none());
}

#[tokio::test]
async fn delete_invite_echoes_audit_reason() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/invites/{SEEDED_INVITE}"))
                .header(AUDIT_LOG_REASON, "spam")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let invite: Invite = body_json(resp).await;
    assert_eq!(invite.deleted_reason.as_deref(), Some("spam"));
}

// --- canned responses ---

#[tokio::test]
async fn ping_is_plain_text() {
    let resp = app().oneshot(get("/ping")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(content_type(&resp).starts_with("text/plain"));
    assert_eq!(body_bytes(resp).await, "pong");
}

#[tokio::test]
async fn rate_limited_sets_retry_after() {
    let resp = app().oneshot(get("/ratelimited")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers().get(http::header::RETRY_AFTER).unwrap(), "1");
}

#[tokio::test]
async fn broken_is_500_text() {
    let resp = app().oneshot(get("/broken")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(content_type(&resp).starts_with("text/plain"));
}

#[tokio::test]
async fn not_modified_has_empty_body() {
    let resp = app().oneshot(get("/not-modified")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn moved_redirects_to_landing() {
    let resp = app().oneshot(get("/moved")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(http::header::LOCATION).unwrap(), "/landing");
}

#[tokio::test]
async fn landings_counts_visits() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app).await.unwrap().call(get("/landing")).await.unwrap();
    assert_eq!(body_bytes(resp).await, "landed");

    let resp = ServiceExt::ready(&mut app).await.unwrap().call(get("/landings")).await.unwrap();
    let count: usize = body_json(resp).await;
    assert_eq!(count, 1);
}

#[tokio::test]
async fn large_and_stream_serve_the_same_payload() {
    for uri in ["/large", "/stream"] {
        let resp = app().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_bytes(resp).await.len(), CHUNK_SIZE * CHUNK_COUNT);
    }
}
