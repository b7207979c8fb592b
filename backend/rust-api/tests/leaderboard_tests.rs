mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use wordpulse_api::{
    models::{ban::BanRecord, challenge::Challenge},
    store::GameStore,
};

#[tokio::test]
async fn test_day_leaderboard_orders_solved_first() {
    let app = common::create_test_app();
    app.guess("device-lb-0001", "Primero", "puppy").await;
    app.guess("device-lb-0002", "Segundo", "dog").await;
    // Viewing the challenge without guessing does not put a player on the board.
    let bearer = app.bearer_for("7", "Mirón");
    let (status, _) = app
        .get("/api/v1/challenge", &[("authorization", bearer.as_str())])
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app.get("/api/v1/leaderboard", &[]).await;
    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert!(json.get("word").is_none());

    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[0]["player_name"], "Segundo");
    assert_eq!(entries[0]["solved"], true);
    assert_eq!(entries[1]["rank"], 2);
    assert_eq!(entries[1]["player_name"], "Primero");
}

#[tokio::test]
async fn test_past_day_shows_word_and_future_is_rejected() {
    let app = common::create_test_app();
    let yesterday = Utc::now().date_naive() - Duration::days(1);
    app.store
        .insert_challenge(&Challenge {
            id: "challenge-past".to_string(),
            word_id: common::WORD_ID.to_string(),
            date: yesterday,
            category_en: "animal".to_string(),
            category_es: "animal".to_string(),
            hint_en: None,
            hint_es: None,
            created_at: Utc::now() - Duration::days(1),
        })
        .await
        .unwrap();

    let (status, json) = app.get("/api/v1/leaderboard?days_ago=1&locale=es", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["word"], "perro");
    assert_eq!(json["date"], yesterday.to_string());

    let tomorrow = Utc::now().date_naive() + Duration::days(1);
    let (status, _) = app
        .get(&format!("/api/v1/leaderboard?date={}", tomorrow), &[])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_global_leaderboard_by_score() {
    let app = common::create_test_app();
    app.guess("device-glb-001", "Alto", "dog").await;
    app.guess("device-glb-002", "Bajo", "puppy").await;
    app.guess("device-glb-003", "Nulo", "banana").await;

    let (status, json) = app.get("/api/v1/leaderboard/global?metric=score", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["metric"], "score");
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["player_name"], "Alto");
    assert_eq!(entries[0]["total_score"], 999);
    assert_eq!(entries[1]["player_name"], "Bajo");
    assert_eq!(entries[2]["rank"], 3);

    let (_, json) = app.get("/api/v1/leaderboard/global", &[]).await;
    assert_eq!(json["metric"], "solved");
    // Bajo and Nulo solved nothing, so only Alto is on the solved board.
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["player_name"], "Alto");
    assert_eq!(entries[0]["solved_count"], 1);
    assert_eq!(entries[0]["rank"], 1);
}

#[tokio::test]
async fn test_banned_address_is_rejected_before_any_write() {
    let app = common::create_test_app();
    let now = Utc::now();
    app.store
        .upsert_ban(&BanRecord {
            address: "198.51.100.23".to_string(),
            reason: "daily attempt limit exceeded".to_string(),
            banned_at: now,
            expires_at: now + Duration::hours(24),
        })
        .await
        .unwrap();

    let (status, json) = app
        .post_json(
            "/api/v1/guess",
            serde_json::json!({
                "guess": "dog",
                "device_token": "device-ban-0001",
                "nickname": "Bandido",
            }),
            &[("x-forwarded-for", "198.51.100.23")],
        )
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["banned"], true);

    assert!(app
        .store
        .find_player_by_device("device-ban-0001")
        .await
        .unwrap()
        .is_none());
}
