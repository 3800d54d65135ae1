#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use userbase::{
    account::{password::Hasher, AccountManager},
    api,
    store::{
        Account, AccountChanges, AccountStore, DynAccountStore, MemoryAccountStore, NewAccount,
        StoreError,
    },
};
use uuid::Uuid;

const CREATE_URL: &str = "/api/user/create";
const TOKEN_URL: &str = "/api/user/token";
const ME_URL: &str = "/api/user/me";

struct TestApp {
    router: Router,
    store: Arc<MemoryAccountStore>,
    manager: Arc<AccountManager>,
}

fn manager_over(store: DynAccountStore) -> Arc<AccountManager> {
    let hasher = Hasher::new(1024, 1).expect("argon2 params");
    Arc::new(AccountManager::new(store, hasher).expect("manager"))
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryAccountStore::new());
    let manager = manager_over(store.clone());
    TestApp {
        router: api::router(manager.clone()),
        store,
        manager,
    }
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: Method, uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create(router: &Router, body: Value) -> (StatusCode, Value) {
    send(router, json_request(Method::POST, CREATE_URL, None, &body)).await
}

async fn token_for(router: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        router,
        json_request(
            Method::POST,
            TOKEN_URL,
            None,
            &json!({ "email": email, "password": password }),
        ),
    )
    .await
}

async fn signed_up_token(router: &Router, email: &str, password: &str, name: &str) -> String {
    let (status, _) = create(
        router,
        json!({ "email": email, "password": password, "name": name }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = token_for(router, email, password).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn create_user_success() {
    let app = test_app();
    let (status, body) = create(
        &app.router,
        json!({ "email": "test@example.com", "password": "testpass123", "name": "Test name" }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "email": "test@example.com", "name": "Test name" }));
    assert!(body.get("password").is_none());

    let account = app
        .store
        .find_by_email("test@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(account.password_hash, "testpass123");
    assert!(account.password_hash.starts_with("$argon2id$"));
    assert!(!account.is_staff);
    assert!(!account.is_superuser);
}

#[tokio::test]
async fn create_user_normalizes_email_domain() {
    let app = test_app();
    let (status, body) = create(
        &app.router,
        json!({ "email": "  Test@EXAMPLE.com ", "password": "testpass123" }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "email": "Test@example.com", "name": "" }));
}

#[tokio::test]
async fn create_user_duplicate_email() {
    let app = test_app();
    let payload = json!({ "email": "test@example.com", "password": "testpass123", "name": "Test" });
    let (status, _) = create(&app.router, payload.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = create(&app.router, payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "email": ["user with this email already exists."] })
    );
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn create_user_password_too_short() {
    let app = test_app();
    let (status, body) = create(
        &app.router,
        json!({ "email": "test@example.com", "password": "pw", "name": "Test" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("password").is_some());
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn create_user_whitespace_password() {
    let app = test_app();
    let (status, body) = create(
        &app.router,
        json!({ "email": "a@example.com", "password": "        " }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "password": ["This field may not be blank."] }));
    assert!(app.store.is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_create_same_email_keeps_one_row() {
    let app = test_app();
    let payload = json!({ "email": "race@example.com", "password": "testpass123" });

    let (first, second) = tokio::join!(
        create(&app.router, payload.clone()),
        create(&app.router, payload.clone()),
    );

    let mut statuses = [first.0, second.0];
    statuses.sort_by_key(StatusCode::as_u16);
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn create_user_form_encoded() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri(CREATE_URL)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "email=test%40gmail.com&password=testpass123&name=TestName",
        ))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "email": "test@gmail.com", "name": "TestName" }));

    let request = Request::builder()
        .method(Method::POST)
        .uri(TOKEN_URL)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("email=test%40gmail.com&password=testpass123"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn create_user_unsupported_media_type() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri(CREATE_URL)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("email=test"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(
        body,
        json!({ "detail": "Unsupported media type \"text/plain\" in request." })
    );
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn create_user_missing_fields() {
    let app = test_app();
    let (status, body) = create(&app.router, json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "email": ["This field is required."],
            "password": ["This field is required."],
        })
    );
}

#[tokio::test]
async fn create_user_invalid_email() {
    let app = test_app();
    let (status, body) = create(
        &app.router,
        json!({ "email": "not-an-email", "password": "testpass123" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "email": ["Enter a valid email address."] }));
}

#[tokio::test]
async fn create_user_malformed_json() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri(CREATE_URL)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("detail").is_some());
}

#[tokio::test]
async fn create_token_for_user() {
    let app = test_app();
    let token = signed_up_token(&app.router, "test@example.com", "testpass123", "Test").await;
    assert_eq!(token.len(), 43);
}

#[tokio::test]
async fn create_token_is_reused() {
    let app = test_app();
    let first = signed_up_token(&app.router, "test@example.com", "testpass123", "Test").await;

    let (status, body) = token_for(&app.router, "test@example.com", "testpass123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"].as_str(), Some(first.as_str()));
}

#[tokio::test]
async fn create_token_invalid_credentials() {
    let app = test_app();
    let (status, _) = create(
        &app.router,
        json!({ "email": "test@example.com", "password": "goodpass123" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let expected = json!({ "non_field_errors": ["Unable to authenticate with provided credentials."] });

    let (status, body) = token_for(&app.router, "test@example.com", "wrongpass123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("token").is_none());
    assert_eq!(body, expected);

    let (status, body) = token_for(&app.router, "nobody@example.com", "goodpass123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("token").is_none());
    assert_eq!(body, expected);
}

#[tokio::test]
async fn create_token_missing_field() {
    let app = test_app();
    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            TOKEN_URL,
            None,
            &json!({ "email": "one", "password": "" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("token").is_none());
    assert!(body.get("password").is_some());
}

#[tokio::test]
async fn retrieve_user_unauthorized() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::GET, ME_URL, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok()),
        Some("Token")
    );
}

#[tokio::test]
async fn retrieve_profile_success() {
    let app = test_app();
    let token = signed_up_token(&app.router, "test@example.com", "testpass123", "Test name").await;

    let (status, body) = send(
        &app.router,
        empty_request(Method::GET, ME_URL, Some(&format!("Token {token}"))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "Test name", "email": "test@example.com" }));
}

#[tokio::test]
async fn retrieve_profile_with_bearer_scheme() {
    let app = test_app();
    let token = signed_up_token(&app.router, "test@example.com", "testpass123", "Test").await;

    let (status, _) = send(
        &app.router,
        empty_request(Method::GET, ME_URL, Some(&format!("Bearer {token}"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn retrieve_profile_invalid_token() {
    let app = test_app();
    let (status, body) = send(
        &app.router,
        empty_request(Method::GET, ME_URL, Some("Token not-a-real-token")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "detail": "Invalid token." }));
}

#[tokio::test]
async fn post_me_not_allowed() {
    let app = test_app();
    let token = signed_up_token(&app.router, "test@example.com", "testpass123", "Test").await;

    let (status, body) = send(
        &app.router,
        json_request(Method::POST, ME_URL, Some(&token), &json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "detail": "Method \"POST\" not allowed." }));
}

#[tokio::test]
async fn post_me_unauthenticated_is_401() {
    let app = test_app();
    let (status, _) = send(&app.router, json_request(Method::POST, ME_URL, None, &json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn update_user_profile() {
    let app = test_app();
    let token = signed_up_token(&app.router, "test@example.com", "testpass123", "Test name").await;

    let (status, body) = send(
        &app.router,
        json_request(
            Method::PATCH,
            ME_URL,
            Some(&token),
            &json!({ "name": "new name", "password": "newpassword123" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "new name", "email": "test@example.com" }));

    let account = app
        .store
        .find_by_email("test@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.name, "new name");
    assert!(app
        .manager
        .check_password(&account, &"newpassword123".to_string().into()));
    assert!(!app
        .manager
        .check_password(&account, &"testpass123".to_string().into()));

    let (status, _) = token_for(&app.router, "test@example.com", "newpassword123").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn patch_without_body_is_empty_update() {
    let app = test_app();
    let token = signed_up_token(&app.router, "test@example.com", "testpass123", "Test").await;

    let (status, body) = send(
        &app.router,
        empty_request(Method::PATCH, ME_URL, Some(&format!("Token {token}"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "Test", "email": "test@example.com" }));

    let (status, body) = send(
        &app.router,
        empty_request(Method::PUT, ME_URL, Some(&format!("Token {token}"))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("email").is_some());
    assert!(body.get("password").is_some());
}

#[tokio::test]
async fn malformed_patch_unauthenticated_is_401() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::PATCH)
        .uri(ME_URL)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn update_profile_rejects_short_password() {
    let app = test_app();
    let token = signed_up_token(&app.router, "test@example.com", "testpass123", "Test").await;

    let (status, body) = send(
        &app.router,
        json_request(Method::PATCH, ME_URL, Some(&token), &json!({ "password": "pw" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("password").is_some());
}

#[tokio::test]
async fn update_profile_rejects_taken_email() {
    let app = test_app();
    signed_up_token(&app.router, "first@example.com", "testpass123", "First").await;
    let token = signed_up_token(&app.router, "second@example.com", "testpass123", "Second").await;

    let (status, body) = send(
        &app.router,
        json_request(
            Method::PATCH,
            ME_URL,
            Some(&token),
            &json!({ "email": "first@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "email": ["user with this email already exists."] })
    );

    let (status, _) = send(
        &app.router,
        json_request(
            Method::PATCH,
            ME_URL,
            Some(&token),
            &json!({ "email": "second@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn put_requires_email_and_password() {
    let app = test_app();
    let token = signed_up_token(&app.router, "test@example.com", "testpass123", "Test").await;

    let (status, body) = send(
        &app.router,
        json_request(Method::PUT, ME_URL, Some(&token), &json!({ "name": "Only name" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("email").is_some());
    assert!(body.get("password").is_some());

    let (status, body) = send(
        &app.router,
        json_request(
            Method::PUT,
            ME_URL,
            Some(&token),
            &json!({ "email": "moved@example.com", "password": "another-pass" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "Test", "email": "moved@example.com" }));

    let (status, _) = token_for(&app.router, "moved@example.com", "another-pass").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn request_id_is_propagated() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-123")
    );
}

#[tokio::test]
async fn health_reports_database() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::GET, "/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["database"], "ok");
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
}

/// Delegates to a memory store but reports one email's account as inactive.
struct InactiveStore {
    inner: MemoryAccountStore,
    inactive_email: String,
}

impl InactiveStore {
    fn mark(&self, account: Option<Account>) -> Option<Account> {
        account.map(|mut account| {
            if account.email == self.inactive_email {
                account.is_active = false;
            }
            account
        })
    }
}

#[async_trait]
impl AccountStore for InactiveStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        self.inner.insert_account(account).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.mark(self.inner.find_by_email(email).await?))
    }

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        self.inner.email_taken(email, exclude).await
    }

    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, StoreError> {
        self.inner.update_account(id, changes).await
    }

    async fn set_privileges(
        &self,
        id: Uuid,
        is_staff: bool,
        is_superuser: bool,
    ) -> Result<Option<Account>, StoreError> {
        self.inner.set_privileges(id, is_staff, is_superuser).await
    }

    async fn get_or_create_token(
        &self,
        account_id: Uuid,
        candidate: &str,
    ) -> Result<String, StoreError> {
        self.inner.get_or_create_token(account_id, candidate).await
    }

    async fn find_token_owner(&self, key: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.mark(self.inner.find_token_owner(key).await?))
    }
}

#[tokio::test]
async fn inactive_account_is_rejected() {
    let store = Arc::new(InactiveStore {
        inner: MemoryAccountStore::new(),
        inactive_email: "gone@example.com".to_string(),
    });
    let manager = manager_over(store.clone());
    let router = api::router(manager.clone());

    let (status, _) = create(
        &router,
        json!({ "email": "gone@example.com", "password": "testpass123" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = token_for(&router, "gone@example.com", "testpass123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("token").is_none());

    let account = store
        .inner
        .find_by_email("gone@example.com")
        .await
        .unwrap()
        .unwrap();
    let token = manager.issue_token(&account).await.unwrap();

    let (status, body) = send(
        &router,
        empty_request(Method::GET, ME_URL, Some(&format!("Token {token}"))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "detail": "User inactive or deleted." }));
}
