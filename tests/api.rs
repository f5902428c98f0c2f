//! Router-level tests: the full axum app over an in-memory database.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use picblocks::{
    app::build_app,
    consumption::{repo as consumption_repo, repo_types::NewConsumption},
    db::now_utc,
    state::AppState,
};

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    async fn new() -> Self {
        let state = AppState::in_memory().await.expect("in-memory state");
        Self {
            router: build_app(state.clone()),
            state,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn register(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// Registers and logs in, returning (access token, refresh token).
    async fn sign_up(&self, username: &str) -> (String, String) {
        let (status, _) = self.register(username, "secret-pass").await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = self.login(username, "secret-pass").await;
        assert_eq!(status, StatusCode::OK);
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    async fn user_id(&self, token: &str) -> i64 {
        let (_, me) = self.call(Method::GET, "/api/auth/user", Some(token), None).await;
        me["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    async fn create_work(&self, token: &str, body: Value) -> Value {
        let (status, res) = self.call(Method::POST, "/api/works", Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::OK, "create work failed: {res}");
        res["data"].clone()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let res = app
        .router
        .clone()
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_login_and_fetch_current_user() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "alice", "password": "secret-pass", "email": "Alice@Example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert!(body["data"]["user_id"].is_string());

    let (status, body) = app.login("alice", "secret-pass").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userInfo"]["username"], "alice");
    assert_eq!(body["data"]["userInfo"]["email"], "alice@example.com");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.call(Method::GET, "/api/auth/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"]["createdAt"].is_string());
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn register_rejects_duplicates_and_bad_input() {
    let app = TestApp::new().await;
    assert_eq!(app.register("alice", "secret-pass").await.0, StatusCode::OK);

    let (status, body) = app.register("alice", "another-pass").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "username already exists");

    assert_eq!(app.register("al", "secret-pass").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(app.register("bob", "123").await.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let app = TestApp::new().await;
    app.register("alice", "secret-pass").await;

    let (s1, b1) = app.login("alice", "wrong-pass").await;
    let (s2, b2) = app.login("nobody", "secret-pass").await;
    assert_eq!(s1, StatusCode::BAD_REQUEST);
    assert_eq!(s2, StatusCode::BAD_REQUEST);
    assert_eq!(b1["message"], b2["message"]);
}

#[tokio::test]
async fn protected_routes_require_a_valid_access_token() {
    let app = TestApp::new().await;
    let (_, refresh) = app.sign_up("alice").await;

    let (status, body) = app.call(Method::GET, "/api/works", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);

    let (status, _) = app.call(Method::GET, "/api/works", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // refresh tokens are not access tokens
    let (status, _) = app.call(Method::GET, "/api/auth/user", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_presented_tokens() {
    let app = TestApp::new().await;
    let (token, refresh) = app.sign_up("alice").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/logout",
            Some(&token),
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::GET, "/api/auth/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // a fresh login still works
    assert_eq!(app.login("alice", "secret-pass").await.0, StatusCode::OK);
}

#[tokio::test]
async fn refresh_rotates_the_refresh_token() {
    let app = TestApp::new().await;
    let (_, refresh) = app.sign_up("alice").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = app.call(Method::GET, "/api/auth/user", Some(&new_token), None).await;
    assert_eq!(status, StatusCode::OK);

    // the old refresh token was single-use
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_update_and_public_profile() {
    let app = TestApp::new().await;
    let (token, _) = app.sign_up("alice").await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/auth/user",
            Some(&token),
            Some(json!({ "nickname": "Ali", "bio": "collages" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["nickname"], "Ali");

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/auth/user",
            Some(&token),
            Some(json!({ "email": "not-an-email" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.create_work(&token, json!({ "title": "shown", "status": "public" })).await;
    app.create_work(&token, json!({ "title": "hidden" })).await;

    let (_, me) = app.call(Method::GET, "/api/auth/user", Some(&token), None).await;
    let id = me["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.call(Method::GET, &format!("/api/users/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["nickname"], "Ali");
    assert_eq!(body["data"]["public_works_count"], 1);

    let (status, _) = app.call(Method::GET, "/api/users/9999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn work_lifecycle() {
    let app = TestApp::new().await;
    let (token, _) = app.sign_up("alice").await;

    let created = app
        .create_work(
            &token,
            json!({
                "title": "  Beach day ",
                "content": { "layout": "grid-3", "tiles": [{ "src": "a.png" }] },
                "cover": "https://cdn.example.com/a.png"
            }),
        )
        .await;
    assert_eq!(created["title"], "Beach day");
    assert_eq!(created["status"], "private");
    assert!(created["published_at"].is_null());
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/api/works/{id}");

    let (status, body) = app.call(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"]["layout"], "grid-3");

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "status": "public", "title": "Beach day!" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Beach day!");
    assert_eq!(body["data"]["status"], "public");
    assert!(body["data"]["published_at"].is_string());
    // untouched fields survive a partial update
    assert_eq!(body["data"]["content"]["tiles"][0]["src"], "a.png");
    assert_eq!(body["data"]["cover"], "https://cdn.example.com/a.png");

    let (status, body) = app
        .call(Method::PUT, &uri, Some(&token), Some(json!({ "status": "draft" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["published_at"].is_null());

    let (status, _) = app
        .call(Method::PUT, &uri, Some(&token), Some(json!({ "status": "archived" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.call(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn works_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let (alice, _) = app.sign_up("alice").await;
    let (bob, _) = app.sign_up("bob").await;

    let work = app.create_work(&alice, json!({ "title": "mine" })).await;
    let uri = format!("/api/works/{}", work["id"].as_str().unwrap());

    assert_eq!(app.call(Method::GET, &uri, Some(&bob), None).await.0, StatusCode::NOT_FOUND);
    assert_eq!(
        app.call(Method::PUT, &uri, Some(&bob), Some(json!({ "title": "x" }))).await.0,
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.call(Method::DELETE, &uri, Some(&bob), None).await.0, StatusCode::NOT_FOUND);

    let (_, list) = app.call(Method::GET, "/api/works", Some(&bob), None).await;
    assert_eq!(list["data"]["total"], 0);

    let (_, body) = app.call(Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(body["data"]["title"], "mine");
}

#[tokio::test]
async fn work_list_paginates_and_filters() {
    let app = TestApp::new().await;
    let (token, _) = app.sign_up("alice").await;

    for i in 0..5 {
        app.create_work(&token, json!({ "title": format!("sunset {i}") })).await;
    }
    app.create_work(&token, json!({ "title": "forest", "status": "public" })).await;

    let (status, body) = app
        .call(Method::GET, "/api/works?page=2&page_size=4", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 6);
    assert_eq!(body["data"]["page"], 2);
    assert_eq!(body["data"]["list"].as_array().unwrap().len(), 2);
    assert!(body["data"]["list"][0].get("content").is_none());

    let (_, body) = app
        .call(Method::GET, "/api/works?search=SUNSET", Some(&token), None)
        .await;
    assert_eq!(body["data"]["total"], 5);

    let (_, body) = app
        .call(Method::GET, "/api/works?status=public", Some(&token), None)
        .await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["list"][0]["title"], "forest");

    let (status, _) = app
        .call(Method::GET, "/api/works?page_size=500", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn creating_works_shows_up_in_consumption() {
    let app = TestApp::new().await;
    let (token, _) = app.sign_up("alice").await;
    let (other, _) = app.sign_up("bob").await;

    let first = app.create_work(&token, json!({ "title": "one" })).await;
    app.create_work(&token, json!({ "title": "two" })).await;
    app.create_work(&other, json!({ "title": "bob's" })).await;

    let (status, body) = app
        .call(Method::GET, "/api/consumption/history", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    let list = body["data"]["list"].as_array().unwrap();
    assert!(list.iter().all(|r| r["kind"] == "work_create" && r["amount"] == 1));

    // deleting a work keeps its history entry, detached
    let uri = format!("/api/works/{}", first["id"].as_str().unwrap());
    app.call(Method::DELETE, &uri, Some(&token), None).await;
    let (_, body) = app
        .call(Method::GET, "/api/consumption/history?kind=work_create", Some(&token), None)
        .await;
    assert_eq!(body["data"]["total"], 2);
    let detached = body["data"]["list"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["work_id"].is_null())
        .count();
    assert_eq!(detached, 1);

    let (status, body) = app
        .call(Method::GET, "/api/consumption/stats", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_count"], 2);
    assert_eq!(body["data"]["total_amount"], 2);
    assert_eq!(body["data"]["by_kind"][0]["kind"], "work_create");
    assert!(body["data"]["last_at"].is_string());

    let (status, body) = app
        .call(Method::GET, "/api/consumption/stats?days=7", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_count"], 2);

    let (status, _) = app
        .call(Method::GET, "/api/consumption/stats?days=0", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_consumption_stats() {
    let app = TestApp::new().await;
    let (token, _) = app.sign_up("alice").await;

    let (status, body) = app
        .call(Method::GET, "/api/consumption/stats", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_count"], 0);
    assert_eq!(body["data"]["total_amount"], 0);
    assert!(body["data"]["first_at"].is_null());
    assert_eq!(body["data"]["by_kind"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn cors_allows_only_the_configured_origin() {
    let app = TestApp::new().await;

    let preflight = |origin: &'static str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/works")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap()
    };

    let res = app.router.clone().oneshot(preflight("http://localhost:3000")).await.unwrap();
    assert_eq!(
        res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        res.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );

    let res = app.router.clone().oneshot(preflight("https://evil.example")).await.unwrap();
    assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn page_numbers_beyond_the_offset_range_are_rejected() {
    let app = TestApp::new().await;
    let (token, _) = app.sign_up("alice").await;

    for uri in [
        "/api/works?page=9223372036854775807&page_size=100",
        "/api/consumption/history?page=9223372036854775807",
        "/api/discover?page=9223372036854775807",
    ] {
        let (status, body) = app.call(Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["code"], 400);
    }
}

#[tokio::test]
async fn publish_autosave_and_draft() {
    let app = TestApp::new().await;
    let (token, _) = app.sign_up("alice").await;
    let (bob, _) = app.sign_up("bob").await;

    let work = app
        .create_work(&token, json!({ "title": "grid", "content": { "tiles": [1] } }))
        .await;
    let id = work["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(Method::PUT, &format!("/api/works/{id}/publish"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "published");
    assert_eq!(body["data"]["status"], "public");
    let published_at = body["data"]["published_at"].clone();
    assert!(published_at.is_string());

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/works/{id}/autosave"),
            Some(&token),
            Some(json!({ "content": { "tiles": [1, 2] } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"]["tiles"][1], 2);
    assert_eq!(body["data"]["status"], "public");
    assert_eq!(body["data"]["published_at"], published_at);
    assert_eq!(body["data"]["title"], "grid");

    // another user cannot drive someone else's work
    for action in ["publish", "draft"] {
        let (status, _) = app
            .call(Method::PUT, &format!("/api/works/{id}/{action}"), Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, body) = app
        .call(Method::PUT, &format!("/api/works/{id}/draft"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "draft");
    assert!(body["data"]["published_at"].is_null());
    assert_eq!(body["data"]["content"]["tiles"][1], 2);
}

#[tokio::test]
async fn discover_shows_only_published_works() {
    let app = TestApp::new().await;
    let (alice, _) = app.sign_up("alice").await;
    let (bob, _) = app.sign_up("bob").await;

    app.call(
        Method::PUT,
        "/api/auth/user",
        Some(&alice),
        Some(json!({ "nickname": "Ali" })),
    )
    .await;

    let shown = app
        .create_work(&alice, json!({ "title": "shown", "status": "public" }))
        .await;
    let hidden = app.create_work(&alice, json!({ "title": "hidden" })).await;
    app.create_work(&bob, json!({ "title": "bob's", "status": "public" }))
        .await;

    let (status, body) = app.call(Method::GET, "/api/discover", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    let titles: Vec<&str> = body["data"]["list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["title"].as_str().unwrap())
        .collect();
    assert!(titles.contains(&"shown") && titles.contains(&"bob's"));

    let shown_id = shown["id"].as_str().unwrap();
    let (status, body) = app
        .call(Method::GET, &format!("/api/discover/{shown_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "shown");
    assert_eq!(body["data"]["author"]["nickname"], "Ali");

    let hidden_id = hidden["id"].as_str().unwrap();
    let (status, _) = app
        .call(Method::GET, &format!("/api/discover/{hidden_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // drafting removes it from the feed
    app.call(
        Method::PUT,
        &format!("/api/works/{shown_id}/draft"),
        Some(&alice),
        None,
    )
    .await;
    let (_, body) = app.call(Method::GET, "/api/discover", None, None).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["list"][0]["author"]["nickname"], "bob");
}

#[tokio::test]
async fn user_public_works_list() {
    let app = TestApp::new().await;
    let (alice, _) = app.sign_up("alice").await;
    let (bob, _) = app.sign_up("bob").await;
    let alice_id = app.user_id(&alice).await;

    app.create_work(&alice, json!({ "title": "first", "status": "public" }))
        .await;
    app.create_work(&alice, json!({ "title": "private" })).await;
    app.create_work(&bob, json!({ "title": "bob's", "status": "public" }))
        .await;

    let (status, body) = app
        .call(Method::GET, &format!("/api/users/{alice_id}/works"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["list"][0]["title"], "first");
    assert_eq!(body["data"]["list"][0]["author"]["id"], alice_id.to_string());

    let (status, _) = app
        .call(Method::GET, "/api/users/9999/works", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn concurrent_refreshes_with_one_token_yield_one_winner() {
    let app = TestApp::new().await;
    let (_, refresh) = app.sign_up("alice").await;
    let body = json!({ "refresh_token": refresh });

    let (a, b) = tokio::join!(
        app.call(Method::POST, "/api/auth/refresh", None, Some(body.clone())),
        app.call(Method::POST, "/api/auth/refresh", None, Some(body.clone())),
    );
    let wins = [a.0, b.0].iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(wins, 1);
    assert!([a.0, b.0].contains(&StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn blank_email_clears_it() {
    let app = TestApp::new().await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "alice", "password": "secret-pass", "email": "a@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, login) = app.login("alice", "secret-pass").await;
    let token = login["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(Method::PUT, "/api/auth/user", Some(&token), Some(json!({ "bio": "hi" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "a@example.com");

    let (status, body) = app
        .call(Method::PUT, "/api/auth/user", Some(&token), Some(json!({ "email": "" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "");
    assert_eq!(body["data"]["bio"], "hi");
}

#[tokio::test]
async fn stats_window_excludes_older_records() {
    let app = TestApp::new().await;
    let (token, _) = app.sign_up("alice").await;
    let uid = app.user_id(&token).await;

    app.create_work(&token, json!({ "title": "today" })).await;

    let mut tx = app.state.db.begin().await.unwrap();
    let old = consumption_repo::insert_tx(
        &mut tx,
        &NewConsumption {
            user_id: uid,
            work_id: None,
            kind: "export",
            amount: 5,
            description: Some("old export"),
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    sqlx::query("UPDATE consumption_records SET created_at = ? WHERE id = ?")
        .bind(now_utc() - time::Duration::days(10))
        .bind(old.id)
        .execute(&app.state.db)
        .await
        .unwrap();

    let (_, all) = app
        .call(Method::GET, "/api/consumption/stats", Some(&token), None)
        .await;
    assert_eq!(all["data"]["total_count"], 2);
    assert_eq!(all["data"]["total_amount"], 6);
    assert_eq!(all["data"]["by_kind"][0]["kind"], "export");

    let (status, recent) = app
        .call(Method::GET, "/api/consumption/stats?days=1", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recent["data"]["total_count"], 1);
    assert_eq!(recent["data"]["total_amount"], 1);
    assert_eq!(recent["data"]["by_kind"].as_array().unwrap().len(), 1);
    assert_eq!(recent["data"]["by_kind"][0]["kind"], "work_create");

    // history is not windowed; the old record is last
    let (_, history) = app
        .call(Method::GET, "/api/consumption/history", Some(&token), None)
        .await;
    assert_eq!(history["data"]["total"], 2);
    assert_eq!(history["data"]["list"][1]["description"], "old export");
}
