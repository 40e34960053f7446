//! In-process test harness: a router over a temporary SQLite database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use booklab::auth::{TokenGenerator, TokenHolder};
use booklab::server::{AppState, create_router};
use booklab::store::{SqliteStore, Store};
use booklab::types::{Doc, Group, Membership, Owner, Privacy, Repository, Role, User};

pub const SIGN_IN_PATH: &str = "/account/sign_in";

pub struct TestApp {
    pub store: Arc<SqliteStore>,
    router: Router,
    _temp_dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body is json")
    }
}

pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("booklab.db")).expect("open store");
        store.initialize().expect("initialize store");
        let store = Arc::new(store);

        let state = Arc::new(AppState::new(store.clone(), SIGN_IN_PATH));

        Self {
            store,
            router: create_router(state),
            _temp_dir: temp_dir,
        }
    }

    pub fn admin_token(&self) -> String {
        TokenGenerator::new()
            .issue(self.store.as_ref(), TokenHolder::Admin, None)
            .expect("issue admin token")
            .raw
    }

    pub fn user(&self, slug: &str) -> TestUser {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            created_at: now,
            updated_at: now,
        };
        self.store.create_user(&user).expect("create user");

        let token = TokenGenerator::new()
            .issue(self.store.as_ref(), TokenHolder::User(&user.id), None)
            .expect("issue user token")
            .raw;

        TestUser { user, token }
    }

    pub fn group(&self, slug: &str) -> Group {
        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4().to_string(),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            created_at: now,
            updated_at: now,
        };
        self.store.create_group(&group).expect("create group");
        group
    }

    pub fn member(&self, user: &TestUser, group: &Group, role: Role) {
        let now = Utc::now();
        self.store
            .upsert_membership(&Membership {
                user_id: user.user.id.clone(),
                group_id: group.id.clone(),
                role,
                created_at: now,
                updated_at: now,
            })
            .expect("save membership");
    }

    pub fn repository(&self, owner_id: &str, slug: &str, privacy: Privacy) -> Repository {
        let now = Utc::now();
        let repository = Repository {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: format!("The {slug}"),
            slug: slug.to_string(),
            description: Some(format!("About {slug}")),
            privacy,
            has_toc: true,
            stars_count: 0,
            watches_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.store
            .create_repository(&repository)
            .expect("create repository");
        repository
    }

    pub fn doc(&self, repository: &Repository, slug: &str, title: &str) -> Doc {
        let now = Utc::now();
        let doc = Doc {
            id: Uuid::new_v4().to_string(),
            repository_id: repository.id.clone(),
            slug: slug.to_string(),
            title: title.to_string(),
            body: Some(format!("Body of {title}")),
            created_at: now,
            updated_at: now,
        };
        self.store.create_doc(&doc).expect("create doc");
        doc
    }

    pub fn reload(&self, repository: &Repository) -> Repository {
        self.store
            .get_repository_by_id(&repository.id)
            .expect("load repository")
            .expect("repository exists")
    }

    pub fn owner(&self, id: &str) -> Owner {
        self.store
            .get_owner(id)
            .expect("load owner")
            .expect("owner exists")
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(build(method, uri, token).body(Body::empty()).expect("request"))
            .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token).await
    }

    pub async fn form(&self, uri: &str, token: Option<&str>, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        self.send(
            build(Method::POST, uri, token)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .expect("request"),
        )
        .await
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: &Value,
    ) -> TestResponse {
        self.send(
            build(method, uri, token)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
    }
}

fn build(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}
