//! Shared harness: the real router over a throwaway SQLite file, with an
//! in-memory media store standing in for R2.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::TimeDelta;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use convene_api::media::{MediaStore, PresignedUpload};
use convene_api::routes;
use convene_api::sessions::{CookiePolicy, SessionRegistry};
use convene_api::state::AppStateInner;
use convene_db::Database;

pub const PASSWORD: &str = "correct horse";

pub struct StubMedia;

impl MediaStore for StubMedia {
    fn presign_put(&self, key: &str, _content_type: &str, expires_in: u64) -> anyhow::Result<PresignedUpload> {
        Ok(PresignedUpload {
            upload_url: format!("https://upload.test/{}?expires={}", key, expires_in),
            public_url: format!("https://cdn.test/{}", key),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub sessions: SessionRegistry,
    pub db: Arc<Database>,
    path: PathBuf,
}

pub struct TestResponse {
    pub status: StatusCode,
    /// `c.id=<value>` when the response set a live session cookie.
    pub session: Option<String>,
    pub set_cookie: Vec<String>,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_ttl(TimeDelta::hours(24))
    }

    pub fn with_ttl(ttl: TimeDelta) -> Self {
        let path = std::env::temp_dir().join(format!("convene_api_test_{}.db", uuid::Uuid::new_v4()));
        let db = Arc::new(Database::open(&path).unwrap());
        let sessions = SessionRegistry::new(db.clone(), ttl, CookiePolicy::for_deployment(false, false, None));
        let state = AppStateInner::new(db.clone(), sessions.clone(), Arc::new(StubMedia));

        Self {
            router: routes::router(state),
            sessions,
            db,
            path,
        }
    }

    pub async fn send(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        self.dispatch(req).await
    }

    pub async fn dispatch(&self, req: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();

        let set_cookie: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let session = set_cookie.iter().find_map(|c| {
            let pair = c.split(';').next()?.trim();
            let value = pair.strip_prefix("c.id=")?;
            (!value.is_empty()).then(|| pair.to_string())
        });

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            session,
            set_cookie,
            body,
        }
    }

    pub async fn register(&self, name: &str, email: &str) -> TestResponse {
        self.send(
            Method::POST,
            "/user",
            None,
            Some(json!({ "name": name, "email": email, "password": PASSWORD })),
        )
        .await
    }

    /// Log in and return the cookie header value for later requests.
    pub async fn login(&self, email: &str) -> String {
        let res = self
            .send(Method::POST, "/auth", None, Some(json!({ "email": email, "password": PASSWORD })))
            .await;
        assert_eq!(res.status, StatusCode::OK, "login failed: {}", res.body);
        res.session.expect("login sets a session cookie")
    }

    /// Register and log in; returns `(user id, cookie)`.
    pub async fn signed_up(&self, name: &str, email: &str) -> (i64, String) {
        assert_eq!(self.register(name, email).await.status, StatusCode::CREATED);
        let cookie = self.login(email).await;
        let status = self.send(Method::GET, "/auth/status", Some(&cookie), None).await;
        (status.body["id"].as_i64().unwrap(), cookie)
    }

    /// Create an event as the holder of `cookie`; returns the event JSON.
    pub async fn create_event(&self, cookie: &str, title: &str) -> Value {
        let res = self
            .send(Method::POST, "/event", Some(cookie), Some(json!({ "title": title })))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "create failed: {}", res.body);
        res.body["event"].clone()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut p = self.path.clone().into_os_string();
            p.push(suffix);
            let _ = std::fs::remove_file(p);
        }
    }
}
