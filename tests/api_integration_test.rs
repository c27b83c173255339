mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use community_forum::routes::create_routes;
use common::test_state;

fn app() -> Router {
    create_routes(test_state())
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, json)
}

/// Register through the API and return (access_token, refresh_token, user_id)
async fn signup(app: &Router, username: &str) -> (String, String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "username": username, "email": format!("{}@example.com", username), "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {}: {}", username, body);
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "memory");
}

#[tokio::test]
async fn test_register_login_refresh_logout() {
    let app = app();
    let (access, refresh, _) = signup(&app, "alice").await;

    let (status, me) = send(&app, Method::GET, "/api/v1/auth/me", Some(access.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
    assert_eq!(me["email"], "alice@example.com");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "username": "ALICE", "email": "other@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "login": "alice@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "login": "Alice", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["token_type"], "Bearer");

    // Rotation: the new token works once, the old one is dead
    let (status, rotated) =
        send(&app, Method::POST, "/api/v1/auth/refresh", None, Some(json!({ "refresh_token": refresh }))).await;
    assert_eq!(status, StatusCode::OK);
    let next_refresh = rotated["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(next_refresh, refresh);

    let (status, _) =
        send(&app, Method::POST, "/api/v1/auth/refresh", None, Some(json!({ "refresh_token": refresh }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        send(&app, Method::POST, "/api/v1/auth/logout", None, Some(json!({ "refresh_token": next_refresh }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) =
        send(&app, Method::POST, "/api/v1/auth/logout", None, Some(json!({ "refresh_token": next_refresh }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) =
        send(&app, Method::POST, "/api/v1/auth/refresh", None, Some(json!({ "refresh_token": next_refresh }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        send(&app, Method::POST, "/api/v1/auth/logout", None, Some(json!({ "refresh_token": "never-issued" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guests_can_read_but_not_write() {
    let app = app();
    let (access, _, _) = signup(&app, "owner").await;
    let (status, _) = send(&app, Method::POST, "/api/v1/communities", Some(access.as_str()), Some(json!({ "name": "gardening" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, community) = send(&app, Method::GET, "/api/v1/communities/gardening", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(community.get("is_member").is_none());

    let (status, body) = send(&app, Method::POST, "/api/v1/communities", None, Some(json!({ "name": "other" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let (status, _) = send(&app, Method::POST, "/api/v1/communities/gardening/membership", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A bad token is rejected even on public routes
    let (status, _) = send(&app, Method::GET, "/api/v1/communities", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_membership_counts_and_posting_rights() {
    let app = app();
    let (owner, _, _) = signup(&app, "owner").await;
    let (reader, _, _) = signup(&app, "reader").await;
    send(&app, Method::POST, "/api/v1/communities", Some(owner.as_str()), Some(json!({ "name": "gardening" }))).await;

    let post_body = json!({ "title": "Tomatoes", "body": "Staking tips" });
    let (status, _) =
        send(&app, Method::POST, "/api/v1/communities/gardening/posts", Some(reader.as_str()), Some(post_body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, joined) = send(&app, Method::POST, "/api/v1/communities/gardening/membership", Some(reader.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["member_count"], 2);
    assert_eq!(joined["is_member"], true);

    let (status, _) = send(&app, Method::POST, "/api/v1/communities/gardening/membership", Some(reader.as_str()), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, members) = send(&app, Method::GET, "/api/v1/communities/gardening/members", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members["total"], 2);

    let (status, post) =
        send(&app, Method::POST, "/api/v1/communities/gardening/posts", Some(reader.as_str()), Some(post_body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["community_name"], "gardening");
    assert_eq!(post["score"], 0);

    let (status, left) = send(&app, Method::DELETE, "/api/v1/communities/gardening/membership", Some(reader.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(left["member_count"], 1);

    let (status, _) = send(&app, Method::DELETE, "/api/v1/communities/gardening/membership", Some(reader.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vote_endpoints() {
    let app = app();
    let (owner, _, _) = signup(&app, "owner").await;
    let (voter, _, _) = signup(&app, "voter").await;
    send(&app, Method::POST, "/api/v1/communities", Some(owner.as_str()), Some(json!({ "name": "gardening" }))).await;
    let (_, post) = send(
        &app,
        Method::POST,
        "/api/v1/communities/gardening/posts",
        Some(owner.as_str()),
        Some(json!({ "title": "Tomatoes" })),
    )
    .await;
    let vote_uri = format!("/api/v1/posts/{}/vote", post["id"].as_str().unwrap());

    let (status, tally) = send(&app, Method::PUT, &vote_uri, Some(voter.as_str()), Some(json!({ "value": 1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tally["score"], 1);
    assert_eq!(tally["my_vote"], 1);

    let (status, tally) = send(&app, Method::PUT, &vote_uri, Some(voter.as_str()), Some(json!({ "value": -1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tally["score"], -1);

    let (status, tally) = send(&app, Method::DELETE, &vote_uri, Some(voter.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tally["score"], 0);
    assert_eq!(tally["my_vote"], 0);

    let (status, _) = send(&app, Method::PUT, &vote_uri, Some(owner.as_str()), Some(json!({ "value": 1 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::PUT, &vote_uri, None, Some(json!({ "value": 1 }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::PUT, &vote_uri, Some(voter.as_str()), Some(json!({ "value": 3 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_requires_author_or_admin() {
    let app = app();
    let (owner, _, _) = signup(&app, "owner").await;
    let (stranger, _, _) = signup(&app, "stranger").await;
    let (admin, _, _) = signup(&app, "root_admin").await;
    send(&app, Method::POST, "/api/v1/communities", Some(owner.as_str()), Some(json!({ "name": "gardening" }))).await;
    let (_, post) = send(
        &app,
        Method::POST,
        "/api/v1/communities/gardening/posts",
        Some(owner.as_str()),
        Some(json!({ "title": "Tomatoes" })),
    )
    .await;
    let post_uri = format!("/api/v1/posts/{}", post["id"].as_str().unwrap());

    let (status, comment) = send(
        &app,
        Method::POST,
        &format!("{}/comments", post_uri),
        Some(stranger.as_str()),
        Some(json!({ "body": "Nice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_uri = format!("/api/v1/comments/{}", comment["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::DELETE, &post_uri, Some(stranger.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &comment_uri, Some(owner.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, fetched) = send(&app, Method::GET, &post_uri, None, None).await;
    assert_eq!(fetched["comment_count"], 1);

    let (status, _) = send(&app, Method::DELETE, &comment_uri, Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, fetched) = send(&app, Method::GET, &post_uri, None, None).await;
    assert_eq!(fetched["comment_count"], 0);

    let (status, _) = send(&app, Method::DELETE, &post_uri, Some(owner.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &post_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_profile_and_posts() {
    let app = app();
    let (owner, _, owner_id) = signup(&app, "owner").await;
    send(&app, Method::POST, "/api/v1/communities", Some(owner.as_str()), Some(json!({ "name": "gardening" }))).await;
    send(
        &app,
        Method::POST,
        "/api/v1/communities/gardening/posts",
        Some(owner.as_str()),
        Some(json!({ "title": "Tomatoes" })),
    )
    .await;

    let (status, profile) = send(&app, Method::GET, &format!("/api/v1/users/{}", owner_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "owner");
    assert_eq!(profile["karma"], 0);
    assert!(profile.get("email").is_none());

    let (status, posts) = send(&app, Method::GET, &format!("/api/v1/users/{}/posts", owner_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(posts["items"].as_array().unwrap().len(), 1);
    assert_eq!(posts["has_more"], false);
}

#[tokio::test]
async fn test_bad_cursor_and_limit_are_rejected() {
    let app = app();
    let (owner, _, _) = signup(&app, "owner").await;
    send(&app, Method::POST, "/api/v1/communities", Some(owner.as_str()), Some(json!({ "name": "gardening" }))).await;

    let (status, body) =
        send(&app, Method::GET, "/api/v1/communities/gardening/posts?cursor=not-a-cursor", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid cursor");

    let (status, _) = send(&app, Method::GET, "/api/v1/communities/gardening/posts?limit=51", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/api/v1/communities?offset=10001", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let app = app();
    let (owner, _, _) = signup(&app, "owner").await;
    let (voter, _, _) = signup(&app, "voter").await;
    send(&app, Method::POST, "/api/v1/communities", Some(owner.as_str()), Some(json!({ "name": "gardening" }))).await;
    let (_, post) = send(
        &app,
        Method::POST,
        "/api/v1/communities/gardening/posts",
        Some(owner.as_str()),
        Some(json!({ "title": "Tomatoes" })),
    )
    .await;
    let vote_uri = format!("/api/v1/posts/{}/vote", post["id"].as_str().unwrap());

    let bad_requests = [
        (Method::PUT, vote_uri.clone(), Some(json!({ "value": 40000 }))),
        (Method::PUT, vote_uri.clone(), Some(json!({ "value": "up" }))),
        (Method::PUT, vote_uri, Some(json!({}))),
        (Method::PUT, "/api/v1/posts/not-a-uuid/vote".to_string(), Some(json!({ "value": 1 }))),
        (Method::GET, "/api/v1/posts/not-a-uuid".to_string(), None),
        (Method::GET, "/api/v1/communities/gardening/posts?sort=hot".to_string(), None),
        (Method::GET, "/api/v1/communities/gardening/posts?limit=-1".to_string(), None),
        (Method::GET, "/api/v1/communities?offset=abc".to_string(), None),
    ];
    for (method, uri, body) in bad_requests {
        let (status, json) = send(&app, method.clone(), &uri, Some(voter.as_str()), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
        assert_eq!(json["status"], 400, "{} {}: {}", method, uri, json);
        assert!(json["error"].is_string(), "{} {}: {}", method, uri, json);
    }

    let (status, json) = send(&app, Method::GET, "/api/v1/no-such-route", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_comment_votes_stop_when_post_is_deleted() {
    let app = app();
    let (owner, _, owner_id) = signup(&app, "owner").await;
    let (voter, _, _) = signup(&app, "voter").await;
    send(&app, Method::POST, "/api/v1/communities", Some(owner.as_str()), Some(json!({ "name": "gardening" }))).await;
    let (_, post) = send(
        &app,
        Method::POST,
        "/api/v1/communities/gardening/posts",
        Some(owner.as_str()),
        Some(json!({ "title": "Tomatoes" })),
    )
    .await;
    let post_uri = format!("/api/v1/posts/{}", post["id"].as_str().unwrap());
    let (_, comment) =
        send(&app, Method::POST, &format!("{}/comments", post_uri), Some(owner.as_str()), Some(json!({ "body": "Mine" }))).await;
    let comment_vote_uri = format!("/api/v1/comments/{}/vote", comment["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::PUT, &comment_vote_uri, Some(voter.as_str()), Some(json!({ "value": 1 }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::DELETE, &post_uri, Some(owner.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::PUT, &comment_vote_uri, Some(voter.as_str()), Some(json!({ "value": 1 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Comment not found");

    let (_, profile) = send(&app, Method::GET, &format!("/api/v1/users/{}", owner_id), None, None).await;
    assert_eq!(profile["karma"], 0);
}
