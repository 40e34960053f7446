mod common;

use axum::http::{Method, StatusCode, header};
use booklab::store::Store;
use booklab::types::{Privacy, Role};
use serde_json::json;

use common::TestApp;

// ============================================================================
// Admin API
// ============================================================================

#[tokio::test]
async fn admin_provisions_users_groups_and_memberships() {
    let app = TestApp::new();
    let admin = app.admin_token();

    let user = app
        .json(
            Method::POST,
            "/api/v1/admin/users",
            Some(&admin),
            &json!({"slug": "alice", "name": "Alice"}),
        )
        .await;
    assert_eq!(user.status, StatusCode::CREATED);
    let user_id = user.json()["data"]["id"].as_str().unwrap().to_string();

    let group = app
        .json(
            Method::POST,
            "/api/v1/admin/groups",
            Some(&admin),
            &json!({"slug": "writers", "name": "Writers"}),
        )
        .await;
    assert_eq!(group.status, StatusCode::CREATED);
    let group_id = group.json()["data"]["id"].as_str().unwrap().to_string();

    let membership = app
        .json(
            Method::PUT,
            &format!("/api/v1/admin/groups/{group_id}/members/{user_id}"),
            Some(&admin),
            &json!({"role": "editor"}),
        )
        .await;
    assert_eq!(membership.status, StatusCode::OK);
    assert_eq!(membership.json()["data"]["role"], "editor");

    let members = app
        .get(
            &format!("/api/v1/admin/groups/{group_id}/members"),
            Some(&admin),
        )
        .await;
    assert_eq!(members.json()["data"][0]["user_id"], user_id.as_str());

    let token = app
        .json(
            Method::POST,
            &format!("/api/v1/admin/users/{user_id}/tokens"),
            Some(&admin),
            &json!({}),
        )
        .await;
    assert_eq!(token.status, StatusCode::CREATED);
    let raw = token.json()["data"]["token"].as_str().unwrap().to_string();
    assert!(raw.starts_with("booklab_"));

    // The issued token lets the editor create inside the group.
    let created = app
        .json(
            Method::POST,
            "/api/v1/repositories",
            Some(&raw),
            &json!({"owner_id": group_id, "name": "Handbook", "slug": "handbook"}),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["data"]["path"], "/writers/handbook");
}

#[tokio::test]
async fn account_slugs_are_shared_between_users_and_groups() {
    let app = TestApp::new();
    let admin = app.admin_token();
    app.user("alice");

    let response = app
        .json(
            Method::POST,
            "/api/v1/admin/groups",
            Some(&admin),
            &json!({"slug": "alice", "name": "Alice's group"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let reserved = app
        .json(
            Method::POST,
            "/api/v1/admin/users",
            Some(&admin),
            &json!({"slug": "api", "name": "Api"}),
        )
        .await;
    assert_eq!(reserved.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn membership_requires_a_group() {
    let app = TestApp::new();
    let admin = app.admin_token();
    let alice = app.user("alice");
    let bob = app.user("bob");

    let response = app
        .json(
            Method::PUT,
            &format!(
                "/api/v1/admin/groups/{}/members/{}",
                bob.user.id, alice.user.id
            ),
            Some(&admin),
            &json!({"role": "admin"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_and_user_tokens_are_not_interchangeable() {
    let app = TestApp::new();
    let admin = app.admin_token();
    let alice = app.user("alice");
    app.repository(&alice.user.id, "notes", Privacy::Public);

    let user_on_admin = app.get("/api/v1/admin/users", Some(&alice.token)).await;
    assert_eq!(user_on_admin.status, StatusCode::FORBIDDEN);

    let admin_on_user = app
        .get("/api/v1/repositories/alice/notes", Some(&admin))
        .await;
    assert_eq!(admin_on_user.status, StatusCode::FORBIDDEN);

    let missing = app.get("/api/v1/admin/users", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let garbage = app
        .get("/api/v1/repositories/alice/notes", Some("booklab_bad"))
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_cannot_revoke_its_own_token() {
    let app = TestApp::new();
    let admin = app.admin_token();

    let tokens = app.get("/api/v1/admin/tokens", Some(&admin)).await;
    let id = tokens.json()["data"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/admin/tokens/{id}"),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Repository API
// ============================================================================

#[tokio::test]
async fn denials_are_message_only() {
    let app = TestApp::new();
    let writers = app.group("writers");
    let stranger = app.user("stranger");
    app.repository(&writers.id, "secret", Privacy::Private);

    let anonymous = app.get("/api/v1/repositories/writers/secret", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        anonymous.json(),
        json!({"data": null, "error": "Authentication required"})
    );
    assert_eq!(
        anonymous.headers.get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer realm=\"booklab\""
    );

    let forbidden = app
        .get("/api/v1/repositories/writers/secret", Some(&stranger.token))
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(
        forbidden.json(),
        json!({"data": null, "error": "You are not authorized to perform this action"})
    );

    let wrong_owner = app
        .get("/api/v1/repositories/stranger/secret", Some(&stranger.token))
        .await;
    assert_eq!(wrong_owner.status, StatusCode::NOT_FOUND);
    assert_eq!(
        wrong_owner.json(),
        json!({"data": null, "error": "Repository not found"})
    );
}

#[tokio::test]
async fn get_includes_abilities_and_social_state() {
    let app = TestApp::new();
    let alice = app.user("alice");
    let writers = app.group("writers");
    app.member(&alice, &writers, Role::Editor);
    app.repository(&writers.id, "handbook", Privacy::Public);

    let response = app
        .get("/api/v1/repositories/writers/handbook", Some(&alice.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let data = &response.json()["data"];
    assert_eq!(data["owner"]["kind"], "group");
    assert_eq!(data["abilities"]["view"], true);
    assert_eq!(data["abilities"]["edit"], true);
    assert_eq!(data["abilities"]["administer"], false);
    assert_eq!(data["social"][0]["action_type"], "star");
    assert_eq!(data["social"][0]["active"], false);
    assert_eq!(data["social"][1]["action_type"], "watch");
}

#[tokio::test]
async fn only_administrators_update_and_delete() {
    let app = TestApp::new();
    let editor = app.user("editor");
    let admin = app.user("boss");
    let writers = app.group("writers");
    app.member(&editor, &writers, Role::Editor);
    app.member(&admin, &writers, Role::Admin);
    let repository = app.repository(&writers.id, "handbook", Privacy::Public);

    let patch = json!({"name": "Renamed", "privacy": "private", "has_toc": false});

    let denied = app
        .json(
            Method::PATCH,
            "/api/v1/repositories/writers/handbook",
            Some(&editor.token),
            &patch,
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let updated = app
        .json(
            Method::PATCH,
            "/api/v1/repositories/writers/handbook",
            Some(&admin.token),
            &patch,
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);

    let reloaded = app.reload(&repository);
    assert_eq!(reloaded.name, "Renamed");
    assert!(reloaded.is_private());
    assert!(!reloaded.has_toc);
    assert_eq!(reloaded.owner_id, writers.id);

    let not_deleted = app
        .request(
            Method::DELETE,
            "/api/v1/repositories/writers/handbook",
            Some(&editor.token),
        )
        .await;
    assert_eq!(not_deleted.status, StatusCode::FORBIDDEN);

    let deleted = app
        .request(
            Method::DELETE,
            "/api/v1/repositories/writers/handbook",
            Some(&admin.token),
        )
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert!(
        app.store
            .get_repository_by_id(&repository.id)
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn toggle_endpoints_are_idempotent() {
    let app = TestApp::new();
    let alice = app.user("alice");
    let writers = app.group("writers");
    let repository = app.repository(&writers.id, "handbook", Privacy::Public);
    let uri = "/api/v1/repositories/writers/handbook/actions/star";

    for _ in 0..2 {
        let response = app.request(Method::PUT, uri, Some(&alice.token)).await;
        assert_eq!(response.status, StatusCode::OK);
        let data = &response.json()["data"];
        assert_eq!(data["active"], true);
        assert_eq!(data["count"], 1);
    }

    let response = app.request(Method::DELETE, uri, Some(&alice.token)).await;
    assert_eq!(response.json()["data"]["count"], 0);
    assert_eq!(app.reload(&repository).stars_count, 0);

    let anonymous = app.request(Method::PUT, uri, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let unknown = app
        .request(
            Method::PUT,
            "/api/v1/repositories/writers/handbook/actions/fork",
            Some(&alice.token),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn docs_are_created_by_editors_and_listed_to_viewers() {
    let app = TestApp::new();
    let editor = app.user("editor");
    let reader = app.user("reader");
    let writers = app.group("writers");
    app.member(&editor, &writers, Role::Editor);
    app.repository(&writers.id, "handbook", Privacy::Public);
    let uri = "/api/v1/repositories/writers/handbook/docs";
    let doc = json!({"slug": "intro", "title": "Introduction", "body": "Hello"});

    let denied = app.json(Method::POST, uri, Some(&reader.token), &doc).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let created = app.json(Method::POST, uri, Some(&editor.token), &doc).await;
    assert_eq!(created.status, StatusCode::CREATED);

    let duplicate = app.json(Method::POST, uri, Some(&editor.token), &doc).await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let listed = app.get(uri, None).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.json()["data"][0]["slug"], "intro");
}

#[tokio::test]
async fn api_create_reports_validation_and_conflicts() {
    let app = TestApp::new();
    let alice = app.user("alice");
    app.repository(&alice.user.id, "notes", Privacy::Public);

    let duplicate = app
        .json(
            Method::POST,
            "/api/v1/repositories",
            Some(&alice.token),
            &json!({"owner_id": alice.user.id, "name": "Notes", "slug": "notes"}),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let invalid = app
        .json(
            Method::POST,
            "/api/v1/repositories",
            Some(&alice.token),
            &json!({"owner_id": alice.user.id, "name": "Notes", "slug": "notes", "privacy": "hidden"}),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}
