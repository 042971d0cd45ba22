mod common;

use axum::http::StatusCode;
use fitos::db::DbPool;

async fn seed_catalog(pool: &DbPool) {
    common::create_test_exercise(pool, "Barbell Bench Press", "Chest", "Intermediate", "Barbell").await;
    common::create_test_exercise(pool, "Push Up", "Chest", "Beginner", "Bodyweight").await;
    common::create_test_exercise(pool, "Superman Hold", "Lower Back", "Beginner", "Bodyweight").await;
    common::create_test_exercise(pool, "Barbell Row", "Lats", "Intermediate", "Barbell").await;
}

fn names(body: &serde_json::Value) -> Vec<String> {
    body["exercises"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_list_returns_page_and_total() {
    let pool = common::setup_test_db();
    seed_catalog(&pool).await;
    let app = common::create_test_app(pool);

    let response = common::get(app, "/api/exercises").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["total"], 4);
    assert_eq!(
        names(&body),
        vec!["Barbell Bench Press", "Barbell Row", "Push Up", "Superman Hold"]
    );
}

#[tokio::test]
async fn test_exercise_json_shape() {
    let pool = common::setup_test_db();
    seed_catalog(&pool).await;
    let app = common::create_test_app(pool);

    let body = common::body_json(common::get(app, "/api/exercises?search=push").await).await;

    let exercise = &body["exercises"][0];
    assert_eq!(exercise["name"], "Push Up");
    assert_eq!(exercise["type"], "reps");
    assert_eq!(exercise["equipment"], "None");
    assert_eq!(exercise["target_muscles"], serde_json::json!(["chest"]));
    assert!(exercise["video_urls"].is_array());
}

#[tokio::test]
async fn test_filters_combine() {
    let pool = common::setup_test_db();
    seed_catalog(&pool).await;
    let app = common::create_test_app(pool);

    let response = common::get(app, "/api/exercises?search=barbell&level=intermediate&muscle=Chest").await;

    let body = common::body_json(response).await;
    assert_eq!(names(&body), vec!["Barbell Bench Press"]);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_bodyweight_filter_matches_no_equipment() {
    let pool = common::setup_test_db();
    seed_catalog(&pool).await;
    let app = common::create_test_app(pool);

    let body = common::body_json(common::get(app, "/api/exercises?equipment=Bodyweight").await).await;

    assert_eq!(names(&body), vec!["Push Up", "Superman Hold"]);
}

#[tokio::test]
async fn test_muscle_filter_normalizes_tag() {
    let pool = common::setup_test_db();
    seed_catalog(&pool).await;
    let app = common::create_test_app(pool);

    let body = common::body_json(common::get(app, "/api/exercises?muscle=lower%20back").await).await;

    assert_eq!(names(&body), vec!["Superman Hold"]);
}

#[tokio::test]
async fn test_empty_params_are_ignored() {
    let pool = common::setup_test_db();
    seed_catalog(&pool).await;
    let app = common::create_test_app(pool);

    let response = common::get(app, "/api/exercises?search=&level=&equipment=&muscle=&limit=").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn test_pagination_keeps_total() {
    let pool = common::setup_test_db();
    seed_catalog(&pool).await;
    let app = common::create_test_app(pool);

    let body = common::body_json(common::get(app, "/api/exercises?limit=2&offset=1").await).await;

    assert_eq!(names(&body), vec!["Barbell Row", "Push Up"]);
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let pool = common::setup_test_db();
    seed_catalog(&pool).await;
    let app = common::create_test_app(pool);

    let body = common::body_json(common::get(app, "/api/exercises?search=%25").await).await;

    assert_eq!(body["total"], 0);
}
