//! Integration tests for the JSON API
//!
//! These tests require a running PostgreSQL database given by DATABASE_URL.

mod common;

use axum::http::StatusCode;
use common::{api, body_json, TestContext, TEST_PASSWORD};
use serde_json::json;
use taskgate_shared::lifecycle::Progress;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.send(common::page("/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_obtain_and_refresh_token() {
    let ctx = TestContext::new().await.unwrap();

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/token/")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            json!({ "username": ctx.managed.username, "password": TEST_PASSWORD }).to_string(),
        ))
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let pair = body_json(response).await;
    let access = pair["access"].as_str().unwrap().to_string();
    let refresh = pair["refresh"].as_str().unwrap().to_string();

    // The issued access token works against the task list
    let response = ctx
        .send(api("GET", "/tasks/", &format!("Bearer {}", access), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/token/refresh/")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(json!({ "refresh": refresh }).to_string()))
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["access"].is_string());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_obtain_token_with_wrong_password() {
    let ctx = TestContext::new().await.unwrap();

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/token/")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            json!({ "username": ctx.managed.username, "password": "wrong" }).to_string(),
        ))
        .unwrap();
    let response = ctx.send(request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "unauthorized");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_task_api_requires_credentials() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.send(common::page("/tasks/", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx.send(api("GET", "/tasks/", "Bearer not-a-token", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A session token is not an access token
    let session = ctx.session(&ctx.managed);
    let token = session.split_once('=').unwrap().1;
    let response = ctx
        .send(api("GET", "/tasks/", &format!("Bearer {}", token), None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_list_own_tasks_only() {
    let ctx = TestContext::new().await.unwrap();
    let mine = ctx.task_for(&ctx.managed, "Mine").await.unwrap();
    ctx.task_for(&ctx.other, "Not mine").await.unwrap();

    let response = ctx
        .send(api("GET", "/tasks/", &ctx.bearer(&ctx.managed), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let tasks = body_json(response).await;
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], mine.id.to_string());
    assert_eq!(tasks[0]["status"], "Pending");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_task_list_is_for_user_group_only() {
    let ctx = TestContext::new().await.unwrap();

    for account in [&ctx.admin, &ctx.superadmin] {
        let response = ctx.send(api("GET", "/tasks/", &ctx.bearer(account), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "forbidden");
    }

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_complete_own_task() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.task_for(&ctx.managed, "Write docs").await.unwrap();

    let response = ctx
        .send(api(
            "PATCH",
            &format!("/tasks/{}/", task.id),
            &ctx.bearer(&ctx.managed),
            Some(json!({
                "status": "Completed",
                "completion_report": "  Wrote the docs  ",
                "worked_hours": 3
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "Completed");
    assert_eq!(body["completion_report"], "Wrote the docs");
    assert_eq!(body["worked_hours"], 3);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_complete_without_report_is_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.task_for(&ctx.managed, "Half done").await.unwrap();

    let response = ctx
        .send(api(
            "PUT",
            &format!("/tasks/{}/", task.id),
            &ctx.bearer(&ctx.managed),
            Some(json!({ "status": "Completed", "worked_hours": 0 })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"completion_report"));
    assert!(fields.contains(&"worked_hours"));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_reopening_clears_completion_fields() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx
        .task_with(
            &ctx.managed,
            "Done once",
            Progress::Completed {
                report: "Finished".to_string(),
                worked_hours: 2,
            },
        )
        .await
        .unwrap();

    let response = ctx
        .send(api(
            "PATCH",
            &format!("/tasks/{}/", task.id),
            &ctx.bearer(&ctx.managed),
            Some(json!({ "status": "In Progress" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "In Progress");
    assert!(body["completion_report"].is_null());
    assert!(body["worked_hours"].is_null());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_updating_someone_elses_task_is_not_found() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.task_for(&ctx.other, "Not yours").await.unwrap();

    let response = ctx
        .send(api(
            "PATCH",
            &format!("/tasks/{}/", task.id),
            &ctx.bearer(&ctx.managed),
            Some(json!({ "status": "In Progress" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_unknown_status_is_a_validation_error() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.task_for(&ctx.managed, "Typo").await.unwrap();

    let response = ctx
        .send(api(
            "PATCH",
            &format!("/tasks/{}/", task.id),
            &ctx.bearer(&ctx.managed),
            Some(json!({ "status": "Done" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_report_requires_completed_task() {
    let ctx = TestContext::new().await.unwrap();
    let pending = ctx.task_for(&ctx.managed, "Pending").await.unwrap();
    let completed = ctx
        .task_with(
            &ctx.managed,
            "Completed",
            Progress::Completed {
                report: "All good".to_string(),
                worked_hours: 5,
            },
        )
        .await
        .unwrap();

    let response = ctx
        .send(api(
            "GET",
            &format!("/tasks/{}/report/", pending.id),
            &ctx.bearer(&ctx.admin),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .send(api(
            "GET",
            &format!("/tasks/{}/report/", completed.id),
            &ctx.bearer(&ctx.admin),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["completion_report"], "All good");
    assert_eq!(body["worked_hours"], 5);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_report_scope() {
    let ctx = TestContext::new().await.unwrap();
    let unmanaged = ctx
        .task_with(
            &ctx.other,
            "Elsewhere",
            Progress::Completed {
                report: "Done".to_string(),
                worked_hours: 1,
            },
        )
        .await
        .unwrap();
    let path = format!("/tasks/{}/report/", unmanaged.id);

    // Admin does not manage `other`
    let response = ctx.send(api("GET", &path, &ctx.bearer(&ctx.admin), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx.send(api("GET", &path, &ctx.bearer(&ctx.superadmin), None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Users can't read reports at all
    let response = ctx.send(api("GET", &path, &ctx.bearer(&ctx.other), None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}
