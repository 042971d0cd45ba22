mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_record_completion() {
    let pool = common::setup_test_db();
    let user = common::create_test_user(&pool, "Ertil", "ertil@example.com", "secret").await;
    let saved = common::create_test_workout(&pool, user.id).await;
    let app = common::create_test_app(pool);

    let response = common::post_json(
        app,
        "/api/history",
        json!({ "workoutId": saved.workout.id, "userId": user.id }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = common::body_json(response).await;
    assert_eq!(body["workout_id"], saved.workout.id);
    assert_eq!(body["user_id"], user.id);
    assert!(body["completed_at"].is_string());
}

#[tokio::test]
async fn test_record_missing_fields_names_them() {
    let pool = common::setup_test_db();
    let app = common::create_test_app(pool);

    let response = common::post_json(app, "/api/history", json!({ "userId": 1 })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "workoutId is required");
}

#[tokio::test]
async fn test_record_unknown_workout_is_not_found() {
    let pool = common::setup_test_db();
    let user = common::create_test_user(&pool, "Ertil", "ertil@example.com", "secret").await;
    let app = common::create_test_app(pool);

    let response = common::post_json(
        app,
        "/api/history",
        json!({ "workoutId": 999, "userId": user.id }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_history_newest_first() {
    let pool = common::setup_test_db();
    let user = common::create_test_user(&pool, "Ertil", "ertil@example.com", "secret").await;
    let saved = common::create_test_workout(&pool, user.id).await;

    for _ in 0..2 {
        let app = common::create_test_app(pool.clone());
        let response = common::post_json(
            app,
            "/api/history",
            json!({ "workoutId": saved.workout.id, "userId": user.id }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let app = common::create_test_app(pool);
    let response = common::get(app, &format!("/api/users/{}/history", user.id)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0]["id"].as_i64().unwrap() > history[1]["id"].as_i64().unwrap());
    assert_eq!(history[0]["name"], "Quick Burn");
}

#[tokio::test]
async fn test_user_history_empty() {
    let pool = common::setup_test_db();
    let app = common::create_test_app(pool);

    let body = common::body_json(common::get(app, "/api/users/7/history").await).await;

    assert_eq!(body, json!({ "history": [] }));
}
