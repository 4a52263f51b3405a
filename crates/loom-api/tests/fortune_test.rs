mod common;

use axum::http::StatusCode;
use chrono::Duration;
use loom_test_support::{SequenceRng, fixed_now};
use serde_json::{Value, json};
use uuid::Uuid;

async fn submit_roll(app: &axum::Router, game_id: &str, scene_id: &str, actor: Uuid) -> String {
    let (status, submission) = common::post_json(
        app.clone(),
        &format!("/api/v1/games/{game_id}/scenes/{scene_id}/fortune-rolls"),
        &json!({ "actor_id": actor, "question": "Does the bridge hold?", "odds": "fifty_fifty" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submission["beat"]["significance"], "minor");
    assert_eq!(submission["roll"]["tension"], 5);
    submission["roll"]["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_plain_yes_resolves_to_minor_canon_beat() {
    // Arrange
    let (app, store) = common::build_test_app();
    let member = Uuid::new_v4();
    let (game_id, scene_id) = common::game_with_scene(&app, &[member]).await;
    let roll_id = submit_roll(&app, &game_id, &scene_id, member).await;
    let later = common::build_test_app_with(
        store,
        SequenceRng::new(vec![30]),
        fixed_now() + Duration::hours(6),
    );

    // Act
    let (status, view) =
        common::get_json(later, &format!("/api/v1/games/{game_id}/fortune-rolls/{roll_id}")).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["result"], "yes");
    assert_eq!(view["beat_status"], "canon");
    assert_eq!(view["chances"]["exceptional_yes"], 10);
    assert_eq!(view["chances"]["yes"], 40);
}

#[tokio::test]
async fn test_exceptional_result_sends_beat_to_a_vote() {
    // Arrange
    let (app, store) = common::build_test_app();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let (game_id, scene_id) = common::game_with_scene(&app, &[alice, bob]).await;
    let roll_id = submit_roll(&app, &game_id, &scene_id, alice).await;
    let later = common::build_test_app_with(
        store,
        SequenceRng::new(vec![0]),
        fixed_now() + Duration::hours(7),
    );

    // Act
    let (_, game) = common::get_json(later.clone(), &format!("/api/v1/games/{game_id}")).await;
    let (status, view) =
        common::get_json(later, &format!("/api/v1/games/{game_id}/fortune-rolls/{roll_id}")).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["result"], "exceptional_yes");
    assert_eq!(view["beat_status"], "proposed");
    let open: Vec<&Value> = game["open_proposals"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|p| p["proposal_type"] == "beat_proposal")
        .collect();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["proposer_id"], alice.to_string());
}

#[tokio::test]
async fn test_roll_stays_pending_inside_contest_window() {
    // Arrange
    let (app, store) = common::build_test_app();
    let member = Uuid::new_v4();
    let (game_id, scene_id) = common::game_with_scene(&app, &[member]).await;
    let roll_id = submit_roll(&app, &game_id, &scene_id, member).await;
    let almost = common::build_test_app_with(
        store,
        SequenceRng::new(vec![]),
        fixed_now() + Duration::hours(5),
    );

    // Act
    let (status, view) =
        common::get_json(almost, &format!("/api/v1/games/{game_id}/fortune-rolls/{roll_id}")).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["result"], Value::Null);
    assert_eq!(view["beat_status"], "proposed");
}
