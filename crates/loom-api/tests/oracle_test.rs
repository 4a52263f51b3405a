mod common;

use axum::http::StatusCode;
use loom_test_support::{SequenceRng, fixed_now};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_world_oracle_tie_is_broken_by_rng() {
    // Arrange
    let (app, store) = common::build_test_app();
    let members = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
    let (game_id, scene_id) = common::game_with_scene(&app, &members).await;
    let (status, invocation) = common::post_json(
        app.clone(),
        &format!("/api/v1/games/{game_id}/scenes/{scene_id}/oracles"),
        &json!({
            "actor_id": members[0],
            "question": "Why did the bells stop?",
            "word_seeds": { "action": "Conceal", "descriptor": "Sacred" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invocation["oracle"]["interpretations"].as_array().unwrap().len(), 3);
    let oracle_uri = format!(
        "/api/v1/games/{game_id}/oracles/{}",
        invocation["oracle"]["id"].as_str().unwrap()
    );
    for (voter, index) in [(members[1], 0), (members[2], 2)] {
        let (status, _) = common::post_json(
            app.clone(),
            &format!("{oracle_uri}/votes"),
            &json!({ "actor_id": voter, "interpretation_index": index }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let picker = common::build_test_app_with(store, SequenceRng::new(vec![1]), fixed_now());

    // Act
    let (status, oracle) = common::post_json(
        picker.clone(),
        &format!("{oracle_uri}/selection"),
        &json!({ "actor_id": members[0], "interpretation_index": -2 }),
    )
    .await;
    let (_, view) = common::get_json(picker, &oracle_uri).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        oracle["selected_interpretation"],
        "The storm is a warning, not an accident."
    );
    assert_eq!(view["tallies"][0]["votes"], 1);
    assert_eq!(view["tallies"][2]["votes"], 1);
}

#[tokio::test]
async fn test_custom_interpretation_is_selected_verbatim() {
    // Arrange
    let (app, _) = common::build_test_app();
    let member = Uuid::new_v4();
    let (game_id, scene_id) = common::game_with_scene(&app, &[member]).await;
    let (_, invocation) = common::post_json(
        app.clone(),
        &format!("/api/v1/games/{game_id}/scenes/{scene_id}/oracles"),
        &json!({ "actor_id": member, "question": "Who is at the door?", "oracle_type": "personal" }),
    )
    .await;

    // Act
    let (status, oracle) = common::post_json(
        app,
        &format!(
            "/api/v1/games/{game_id}/oracles/{}/selection",
            invocation["oracle"]["id"].as_str().unwrap()
        ),
        &json!({
            "actor_id": member,
            "interpretation_index": -1,
            "custom_text": "My sister, home at last."
        }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(oracle["selected_interpretation"], "My sister, home at last.");
}

#[tokio::test]
async fn test_out_of_range_index_returns_422() {
    let (app, _) = common::build_test_app();
    let member = Uuid::new_v4();
    let (game_id, scene_id) = common::game_with_scene(&app, &[member]).await;
    let (_, invocation) = common::post_json(
        app.clone(),
        &format!("/api/v1/games/{game_id}/scenes/{scene_id}/oracles"),
        &json!({ "actor_id": member, "question": "Who is at the door?" }),
    )
    .await;

    let (status, json) = common::post_json(
        app,
        &format!(
            "/api/v1/games/{game_id}/oracles/{}/votes",
            invocation["oracle"]["id"].as_str().unwrap()
        ),
        &json!({ "actor_id": member, "interpretation_index": 3 }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "validation_error");
}
