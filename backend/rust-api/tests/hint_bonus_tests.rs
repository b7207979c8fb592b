mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use wordpulse_api::{
    models::{challenge::Challenge, player::Player, progress::Progress},
    store::GameStore,
    utils::text::nickname_key,
};

async fn request_hint(app: &common::TestApp, device: &str) -> (StatusCode, serde_json::Value) {
    app.post_json(
        "/api/v1/hint",
        json!({ "locale": "en", "device_token": device }),
        &[],
    )
    .await
}

#[tokio::test]
async fn test_hint_locked_until_ninth_attempt() {
    let app = common::create_test_app();
    let device = "device-hint-001";

    let (status, json) = request_hint(&app, device).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "HINT_LOCKED");

    for i in 0..8 {
        app.guess(device, "Bruma", &format!("miss{}", i)).await;
    }
    let (status, json) = request_hint(&app, device).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "HINT_LOCKED");

    let (_, outcome) = app.guess(device, "Bruma", "miss8").await;
    assert_eq!(outcome["hint_available"], true);
    assert_eq!(outcome["attempts_until_hint"], 0);

    let (status, json) = request_hint(&app, device).await;
    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["hint"], common::HINT_TEXT);
    assert_eq!(json["attempts_used"], 9);
    assert_eq!(json["cached"], false);

    let (_, json) = request_hint(&app, device).await;
    assert_eq!(json["hint"], common::HINT_TEXT);
    assert_eq!(json["cached"], true);
}

#[tokio::test]
async fn test_hint_refused_after_solving() {
    let app = common::create_test_app();
    let device = "device-hint-002";
    for i in 0..9 {
        app.guess(device, "Trueno", &format!("miss{}", i)).await;
    }
    app.guess(device, "Trueno", "dog").await;

    let (status, json) = request_hint(&app, device).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "HINT_AFTER_SOLVE");
}

/// Gives the player one finished challenge yesterday so today's row carries an offer.
async fn seed_returning_player(app: &common::TestApp, device: &str, nickname: &str) {
    let player = Player::anonymous(device, nickname, nickname_key(nickname));
    app.store.insert_player(&player).await.unwrap();

    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let challenge = Challenge {
        id: "challenge-yesterday".to_string(),
        word_id: common::WORD_ID.to_string(),
        date: yesterday,
        category_en: "animal".to_string(),
        category_es: "animal".to_string(),
        hint_en: None,
        hint_es: None,
        created_at: Utc::now() - Duration::days(1),
    };
    app.store.insert_challenge(&challenge).await.unwrap();

    let mut progress = Progress::new(&player.id, &challenge.id, yesterday, false);
    progress.attempts_count = 3;
    progress.solved = true;
    progress.best_similarity = 1.0;
    progress.score = 990;
    app.store.insert_progress(&progress).await.unwrap();
}

#[tokio::test]
async fn test_accepted_bonus_grants_exactly_one_extra_attempt() {
    let app = common::create_test_app();
    let device = "device-bonus-01";
    seed_returning_player(&app, device, "Cometa").await;

    let mut last = serde_json::Value::Null;
    for i in 0..12 {
        let (status, json) = app.guess(device, "Cometa", &format!("miss{}", i)).await;
        assert_eq!(status, StatusCode::OK, "attempt {}: {}", i + 1, json);
        last = json;
    }
    assert_eq!(last["bonus_offer"], true);
    assert!(last.get("revealed_word").is_none());

    let (status, json) = app
        .post_json(
            "/api/v1/bonus/accept",
            json!({ "locale": "en", "device_token": device }),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["bonus_granted"], true);
    assert_eq!(json["attempts_remaining"], 1);
    assert_eq!(json["max_attempts"], 13);

    let (status, json) = app.guess(device, "Cometa", "miss12").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["attempts_used"], 13);
    assert_eq!(json["state"], "exhausted");
    assert_eq!(json["revealed_word"], "dog");

    let (status, json) = app.guess(device, "Cometa", "dog").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "NO_ATTEMPTS_REMAINING");

    let (status, _) = app
        .post_json(
            "/api/v1/bonus/accept",
            json!({ "device_token": device }),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_declined_bonus_reveals_word() {
    let app = common::create_test_app();
    let device = "device-bonus-02";
    seed_returning_player(&app, device, "Aurora").await;

    for i in 0..12 {
        app.guess(device, "Aurora", &format!("miss{}", i)).await;
    }

    let (status, json) = app
        .post_json(
            "/api/v1/bonus/decline",
            json!({ "locale": "es", "device_token": device }),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["bonus_declined"], true);
    assert_eq!(json["bonus_granted"], false);
    assert_eq!(json["revealed_word"], "perro");

    let (status, _) = app
        .post_json(
            "/api/v1/bonus/accept",
            json!({ "device_token": device }),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_first_time_player_cannot_accept_bonus() {
    let app = common::create_test_app();
    let device = "device-bonus-03";
    for i in 0..12 {
        app.guess(device, "Niebla", &format!("miss{}", i)).await;
    }

    let (status, json) = app
        .post_json(
            "/api/v1/bonus/accept",
            json!({ "device_token": device }),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "BONUS_NOT_ELIGIBLE");
}
