mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_nickname_validation() {
    let app = common::create_test_app();

    let validate = |nickname: &'static str, device: Option<&'static str>| {
        let app = &app;
        async move {
            let (status, json) = app
                .post_json(
                    "/api/v1/nickname/validate",
                    json!({ "nickname": nickname, "device_token": device }),
                    &[],
                )
                .await;
            assert_eq!(status, StatusCode::OK, "body: {}", json);
            json
        }
    };

    let json = validate("Lobo Gris", None).await;
    assert_eq!(json["valid"], true);
    assert!(json.get("error").is_none());

    let json = validate("x", None).await;
    assert_eq!(json["valid"], false);
    assert!(json["error"].as_str().unwrap().contains("at least"));

    let json = validate("sh1t", None).await;
    assert_eq!(json["valid"], false);
}

#[tokio::test]
async fn test_nickname_taken_is_case_insensitive() {
    let app = common::create_test_app();
    app.guess("device-nick-001", "Estrella", "cat").await;

    let (_, json) = app
        .post_json(
            "/api/v1/nickname/validate",
            json!({ "nickname": "  ESTRELLA ", "device_token": "device-nick-002" }),
            &[],
        )
        .await;
    assert_eq!(json["valid"], false);
    assert!(json["error"].as_str().unwrap().contains("taken"));

    // The owner's device may keep its own nickname.
    let (_, json) = app
        .post_json(
            "/api/v1/nickname/validate",
            json!({ "nickname": "estrella", "device_token": "device-nick-001" }),
            &[],
        )
        .await;
    assert_eq!(json["valid"], true);

    // Playing with a taken nickname from another device is refused.
    let (status, json) = app.guess("device-nick-002", "estrella", "cat").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("taken"));
}

#[tokio::test]
async fn test_recent_attempts_feed() {
    let app = common::create_test_app();
    app.guess("device-feed-001", "Halcon", "cat").await;
    app.guess("device-feed-001", "Halcon", "puppy").await;

    let (status, json) = app.get("/api/v1/attempts/recent", &[]).await;
    assert_eq!(status, StatusCode::OK);
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["guess"], "puppy");
    assert_eq!(items[0]["player_name"], "Halcon");
    assert_eq!(items[0]["is_anonymous"], true);
    assert_eq!(items[1]["guess"], "cat");
}
