use axum::{
    Router,
    extract::Path,
    routing::{get, post},
};
use std::sync::Arc;
use tideway_sessions::testing::{self, RecordingStore};
use tideway_sessions::{
    InMemorySessionStore, Session, SessionConfig, SessionData, SessionError, SessionId,
    SessionManager, SessionStore, SessionToken, SigningKey,
};

const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

struct Harness {
    store: Arc<RecordingStore<InMemorySessionStore>>,
    key: SigningKey,
    app: Router,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(RecordingStore::new(InMemorySessionStore::new()));
        let key = SigningKey::from_hex(KEY_HEX).unwrap();
        let manager =
            SessionManager::with_key(&SessionConfig::default(), key.clone(), store.clone()).unwrap();

        let app = Router::new()
            .route("/get/{key}", get(read))
            .route("/set-x", post(set_x))
            .route("/remove/{key}", post(remove))
            .route("/bump-twice", post(bump_twice))
            .route("/noop", get(|| async { "ok" }))
            .layer(manager.layer());

        Self { store, key, app }
    }

    async fn seed(&self, epoch: u32, x: i64) -> SessionId {
        let id = self.store.inner().create().await.unwrap();
        let mut data = SessionData::with_epoch(epoch);
        data.insert("x", serde_json::json!(x)).unwrap();
        self.store.inner().set(&id, data).await.unwrap();
        id
    }

    fn token(&self, id: &SessionId, epoch: u32) -> String {
        SessionToken::new(id.clone(), epoch).encode(&self.key)
    }

    fn decode(&self, value: &str) -> SessionToken {
        SessionToken::decode(value, &self.key).unwrap()
    }
}

async fn read(session: Session, Path(key): Path<String>) -> String {
    match session.get_value(&key).await {
        Some(value) => value.to_string(),
        None => "none".to_string(),
    }
}

async fn set_x(session: Session) -> Result<String, SessionError> {
    session.set("x", 42).await?;
    let x: Option<i64> = session.get("x").await?;
    Ok(format!("{:?}", x))
}

async fn remove(session: Session, Path(key): Path<String>) -> &'static str {
    session.remove(&key).await;
    "removed"
}

async fn bump_twice(session: Session) -> String {
    session.bump().await;
    session.bump().await;
    format!("{:?}", session.epoch().await)
}

#[tokio::test]
async fn test_no_cookie_reads_nothing_and_touches_no_storage() {
    let h = Harness::new();

    let response = testing::get(h.app.clone(), "/get/x")
        .execute()
        .await
        .assert_ok()
        .assert_no_set_cookie();

    assert_eq!(response.body_string().await, "none");
    assert_eq!(h.store.calls(), (0, 0, 0));
}

#[tokio::test]
async fn test_first_write_creates_session_with_epoch_zero() {
    let h = Harness::new();

    let response = testing::post(h.app.clone(), "/set-x").execute().await.assert_ok();
    let cookie = response.set_cookie("s").expect("session cookie");
    assert_eq!(response.body_string().await, "Some(42)");

    assert_eq!(h.store.creates(), 1);
    assert_eq!(h.store.sets(), 1);
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.max_age(), None);
    assert_eq!(h.decode(cookie.value()).epoch, 0);

    let response = testing::get(h.app.clone(), "/get/x")
        .with_cookie(&cookie)
        .execute()
        .await
        .assert_ok()
        .assert_no_set_cookie();
    assert_eq!(response.body_string().await, "42");
}

#[tokio::test]
async fn test_matching_epoch_loads_stored_value() {
    let h = Harness::new();
    let id = h.seed(1, 7).await;

    let response = testing::get(h.app.clone(), "/get/x")
        .cookie("s", &h.token(&id, 1))
        .execute()
        .await
        .assert_no_set_cookie();

    assert_eq!(response.body_string().await, "7");
    assert_eq!(h.store.sets(), 0);
}

#[tokio::test]
async fn test_stale_epoch_is_treated_as_no_session() {
    let h = Harness::new();
    let id = h.seed(2, 7).await;

    let response = testing::get(h.app.clone(), "/get/x")
        .cookie("s", &h.token(&id, 1))
        .execute()
        .await
        .assert_ok()
        .assert_cookie_cleared("s");

    assert_eq!(response.body_string().await, "none");
}

#[tokio::test]
async fn test_tampered_cookie_is_cleared() {
    let h = Harness::new();
    let id = h.seed(0, 7).await;
    let mut chars: Vec<char> = h.token(&id, 0).chars().collect();
    chars[30] = if chars[30] == 'A' { 'B' } else { 'A' };
    let token: String = chars.into_iter().collect();

    let response = testing::get(h.app.clone(), "/get/x")
        .cookie("s", &token)
        .execute()
        .await
        .assert_cookie_cleared("s");

    assert_eq!(response.body_string().await, "none");
}

#[tokio::test]
async fn test_double_bump_emits_one_cookie_with_final_epoch() {
    let h = Harness::new();
    let id = h.seed(3, 7).await;
    let old = h.token(&id, 3);

    let response = testing::post(h.app.clone(), "/bump-twice")
        .cookie("s", &old)
        .execute()
        .await
        .assert_ok();

    let cookie = response.set_cookie("s").expect("session cookie");
    assert_eq!(response.body_string().await, "Some(5)");
    assert_eq!(h.decode(cookie.value()).epoch, 5);
    assert_eq!(h.store.sets(), 1);
    assert_eq!(h.store.inner().get(&id).await.unwrap().epoch(), Some(5));

    testing::get(h.app.clone(), "/get/x")
        .cookie("s", &old)
        .execute()
        .await
        .assert_cookie_cleared("s");

    let response = testing::get(h.app.clone(), "/get/x")
        .with_cookie(&cookie)
        .execute()
        .await
        .assert_no_set_cookie();
    assert_eq!(response.body_string().await, "7");
}

#[tokio::test]
async fn test_remove_persists_full_mapping() {
    let h = Harness::new();
    let id = h.seed(0, 7).await;

    testing::post(h.app.clone(), "/remove/x")
        .cookie("s", &h.token(&id, 0))
        .execute()
        .await
        .assert_ok()
        .assert_no_set_cookie();

    assert_eq!(h.store.sets(), 1);
    let (written_id, written) = h.store.last_set().unwrap();
    assert_eq!(written_id, id);
    assert!(written.is_empty());
    assert_eq!(written.epoch(), Some(0));
}

#[tokio::test]
async fn test_untouched_session_is_not_saved() {
    let h = Harness::new();
    let id = h.seed(0, 7).await;

    testing::get(h.app.clone(), "/noop")
        .cookie("s", &h.token(&id, 0))
        .execute()
        .await
        .assert_ok()
        .assert_no_set_cookie();

    assert_eq!(h.store.calls(), (0, 0, 0));
}

#[tokio::test]
async fn test_extractor_without_layer_is_server_error() {
    let app = Router::new().route("/get/{key}", get(read));

    testing::get(app, "/get/x")
        .execute()
        .await
        .assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_empty_cookie_before_valid_one_is_skipped() {
    let h = Harness::new();
    let id = h.seed(0, 7).await;

    let response = testing::get(h.app.clone(), "/get/x")
        .header("cookie", &format!("s=; s={}", h.token(&id, 0)))
        .execute()
        .await
        .assert_no_set_cookie();

    assert_eq!(response.body_string().await, "7");
}

#[tokio::test]
async fn test_retained_session_cannot_write_after_response() {
    let h = Harness::new();
    let slot: Arc<std::sync::Mutex<Option<Session>>> = Arc::default();

    let manager =
        SessionManager::with_key(&SessionConfig::default(), h.key.clone(), h.store.clone()).unwrap();
    let app = {
        let slot = slot.clone();
        Router::new()
            .route(
                "/keep",
                post(move |session: Session| async move {
                    session.set("a", 1).await?;
                    *slot.lock().unwrap() = Some(session);
                    Ok::<_, SessionError>("kept")
                }),
            )
            .layer(manager.layer())
    };

    testing::post(app, "/keep").execute().await.assert_ok();
    assert_eq!(h.store.sets(), 1);

    let kept = slot.lock().unwrap().take().unwrap();
    assert!(matches!(kept.set("b", 2).await, Err(SessionError::Finished)));
    assert!(!kept.is_dirty().await);
    assert_eq!(h.store.sets(), 1);
}
