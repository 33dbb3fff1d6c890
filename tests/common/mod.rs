#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use forum::config::Config;
use forum::db;
use forum::routes;
use forum::state::{AppState, DbPool};
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub app: Router,
    pub pool: DbPool,
    pub config: Config,
    // Keeps the data dir alive for the duration of the test.
    pub dir: TempDir,
}

pub fn test_app() -> TestApp {
    test_app_with(|_| {})
}

pub fn test_app_with(tweak: impl FnOnce(&mut Config)) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    tweak(&mut config);
    config.resolve_paths(dir.path());
    std::fs::create_dir_all(config.uploads_path()).unwrap();

    let pool = db::create_pool(&config.db_path()).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");

    let app = routes::app(AppState::new(pool.clone(), config.clone()));
    TestApp {
        app,
        pool,
        config,
        dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Insert an account directly, with a cheap bcrypt cost.
    pub fn create_user(&self, username: &str, email: &str, password: &str) -> i64 {
        let hash = bcrypt::hash(password, 4).unwrap();
        let conn = self.pool.get().unwrap();
        forum::db::users::insert_user(&conn, email, username, Some(&hash)).unwrap()
    }

    /// Log in through the form and return the `session_token=...` cookie pair.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/login",
                &format!("username={}&password={}", username, password),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let token = set_cookie_value(&response, "session_token").expect("session cookie");
        format!("session_token={}", token)
    }

    pub fn create_post(&self, user_id: i64, content: &str) -> i64 {
        let mut conn = self.pool.get().unwrap();
        forum::db::posts::create_post(
            &mut conn,
            &forum::db::posts::NewPost {
                user_id,
                content: content.to_string(),
                category_ids: vec![],
                media: None,
            },
        )
        .unwrap()
    }

    pub fn count(&self, sql: &str) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        let pair = cookie.split(';').next()?.to_string();
        let (key, value) = pair.split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
