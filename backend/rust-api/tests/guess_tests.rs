mod common;

use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_exact_guess_solves_with_top_score() {
    let app = common::create_test_app();

    let (status, json) = app.guess("device-exact-01", "Luna", "  Dog ").await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["correct"], true);
    assert_eq!(json["similarity"], 1.0);
    assert_eq!(json["score"], 999);
    assert_eq!(json["state"], "solved");
    assert_eq!(json["attempts_used"], 1);
    assert_eq!(json["attempts_remaining"], 0);
    assert_eq!(json["revealed_word"], "dog");
    assert_eq!(json["is_anonymous"], true);
    assert_eq!(json["player_name"], "Luna");
}

#[tokio::test]
async fn test_exact_guess_does_not_need_the_embedding_service() {
    let app = common::create_test_app_with(Arc::new(common::OfflineEmbedder));

    let (status, json) = app.guess("device-exact-02", "Nube", "puppy").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "body: {}", json);

    let (status, json) = app.guess("device-exact-02", "Nube", "dog").await;
    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["correct"], true);
    assert_eq!(json["similarity"], 1.0);
    assert_eq!(json["score"], 999);
    assert_eq!(json["attempts_used"], 1);
}

#[tokio::test]
async fn test_close_guess_is_scored_by_similarity() {
    let app = common::create_test_app();

    let (status, json) = app.guess("device-close-01", "Sol", "puppy").await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["correct"], false);
    let similarity = json["similarity"].as_f64().unwrap();
    assert!((similarity - 0.8).abs() < 1e-4, "similarity {}", similarity);
    assert!(json["score"].as_u64().unwrap() > 700);
    assert_eq!(json["state"], "in_progress");
    assert_eq!(json["attempts_remaining"], 11);
    assert!(json.get("revealed_word").is_none());

    // A worse guess keeps the best similarity.
    let (_, json) = app.guess("device-close-01", "Sol", "banana").await;
    assert_eq!(json["similarity"], 0.0);
    let best = json["best_similarity"].as_f64().unwrap();
    assert!((best - 0.8).abs() < 1e-4);
}

#[tokio::test]
async fn test_solved_challenge_refuses_more_guesses() {
    let app = common::create_test_app();
    app.guess("device-solved-01", "Nube", "dog").await;

    let (status, json) = app.guess("device-solved-01", "Nube", "cat").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "ALREADY_SOLVED");
}

#[tokio::test]
async fn test_attempt_cap_reveals_word_and_refuses_thirteenth() {
    let app = common::create_test_app();

    let mut last = serde_json::Value::Null;
    for i in 0..12 {
        let (status, json) = app
            .guess("device-cap-0001", "Rio", &format!("wrong{}", i))
            .await;
        assert_eq!(status, StatusCode::OK, "attempt {}: {}", i + 1, json);
        last = json;
    }
    assert_eq!(last["state"], "exhausted");
    assert_eq!(last["attempts_remaining"], 0);
    // First challenge for this player: no bonus, so the word is revealed.
    assert_eq!(last["bonus_offer"], false);
    assert_eq!(last["revealed_word"], "dog");

    let (status, json) = app.guess("device-cap-0001", "Rio", "dog").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "NO_ATTEMPTS_REMAINING");
}

#[tokio::test]
async fn test_embedding_failure_does_not_consume_attempt() {
    let app = common::create_test_app();

    let (status, json) = app.guess("device-boom-001", "Mar", "boom").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "DEPENDENCY_UNAVAILABLE");

    let (status, json) = app.guess("device-boom-001", "Mar", "cat").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["attempts_used"], 1);
}

#[tokio::test]
async fn test_invalid_guesses_are_rejected() {
    let app = common::create_test_app();

    let (status, json) = app.guess("device-bad-0001", "Pez", "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let long = "a".repeat(31);
    let (status, _) = app.guess("device-bad-0001", "Pez", &long).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // No device token and no bearer token.
    let (status, _) = app
        .post_json("/api/v1/guess", json!({ "guess": "cat" }), &[])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = app
        .post_json("/api/v1/guess", json!({ "nope": true }), &[])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_registered_player_guesses_with_bearer_token() {
    let app = common::create_test_app();
    let bearer = app.bearer_for("42", "Ana");

    let (status, json) = app
        .post_json(
            "/api/v1/guess",
            json!({ "guess": "perro", "locale": "es" }),
            &[("authorization", bearer.as_str())],
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["correct"], true);
    assert_eq!(json["is_anonymous"], false);
    assert_eq!(json["player_name"], "Ana");
    assert_eq!(json["revealed_word"], "perro");
}

#[tokio::test]
async fn test_challenge_status_reflects_progress() {
    let app = common::create_test_app();

    let (status, json) = app.get("/api/v1/challenge?locale=en", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["word_length"], 3);
    assert_eq!(json["category"], "animal");
    assert!(json["progress"].is_null());
    assert_eq!(json["is_anonymous"], true);

    app.guess("device-status-1", "Sombra", "cat").await;
    let (status, json) = app
        .get("/api/v1/challenge?locale=es&device_token=device-status-1", &[])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["word_length"], 5);
    assert_eq!(json["progress"]["attempts_used"], 1);
    assert_eq!(json["attempts"].as_array().unwrap().len(), 1);
    assert_eq!(json["attempts"][0]["guess"], "cat");
    assert_eq!(json["attempts_until_hint"], 8);
}
