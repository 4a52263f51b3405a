mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_solo_act_proposal_is_auto_approved() {
    // Arrange
    let (app, _) = common::build_test_app();
    let member = Uuid::new_v4();
    let game_id = common::create_game(&app, &[member]).await;
    common::post_json(
        app.clone(),
        &format!("/api/v1/games/{game_id}/proposals"),
        &json!({ "actor_id": member, "kind": "ready_to_play" }),
    )
    .await;

    // Act
    let (status, outcome) = common::post_json(
        app.clone(),
        &format!("/api/v1/games/{game_id}/acts"),
        &json!({ "actor_id": member, "guiding_question": "What did the tide take?" }),
    )
    .await;
    let (_, view) = common::get_json(app, &format!("/api/v1/games/{game_id}")).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["auto_approved"], true);
    assert_eq!(outcome["proposal"]["status"], "approved");
    assert_eq!(view["status"], "active");
    assert_eq!(view["acts"][0]["status"], "active");
    assert_eq!(view["acts"][0]["title"], "Act 1");
}

#[tokio::test]
async fn test_two_player_scene_needs_second_vote() {
    // Arrange
    let (app, _) = common::build_test_app();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let game_id = common::create_game(&app, &[alice, bob]).await;
    let (_, start) = common::post_json(
        app.clone(),
        &format!("/api/v1/games/{game_id}/proposals"),
        &json!({ "actor_id": alice, "kind": "world_doc_approval" }),
    )
    .await;
    common::post_json(
        app.clone(),
        &format!(
            "/api/v1/games/{game_id}/proposals/{}/votes",
            start["proposal"]["id"].as_str().unwrap()
        ),
        &json!({ "actor_id": bob, "choice": "yes" }),
    )
    .await;
    let (_, act) = common::post_json(
        app.clone(),
        &format!("/api/v1/games/{game_id}/acts"),
        &json!({ "actor_id": alice, "guiding_question": "Who rules the marsh?" }),
    )
    .await;
    let (_, act_vote) = common::post_json(
        app.clone(),
        &format!(
            "/api/v1/games/{game_id}/proposals/{}/votes",
            act["proposal"]["id"].as_str().unwrap()
        ),
        &json!({ "actor_id": bob, "choice": "yes" }),
    )
    .await;
    assert_eq!(act_vote["resolved"], true);
    let act_id = act["proposal"]["subject"]["act_id"].as_str().unwrap();

    // Act
    let (status, scene) = common::post_json(
        app.clone(),
        &format!("/api/v1/games/{game_id}/acts/{act_id}/scenes"),
        &json!({ "actor_id": bob, "guiding_question": "Who waits at the ford?", "tension": 7 }),
    )
    .await;
    let scene_id = scene["proposal"]["subject"]["scene_id"].as_str().unwrap().to_owned();
    let (_, before) =
        common::get_json(app.clone(), &format!("/api/v1/games/{game_id}/scenes/{scene_id}")).await;
    let (_, vote) = common::post_json(
        app.clone(),
        &format!(
            "/api/v1/games/{game_id}/proposals/{}/votes",
            scene["proposal"]["id"].as_str().unwrap()
        ),
        &json!({ "actor_id": alice, "choice": "yes" }),
    )
    .await;
    let (_, after) =
        common::get_json(app, &format!("/api/v1/games/{game_id}/scenes/{scene_id}")).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scene["auto_approved"], false);
    assert_eq!(before["scene"]["status"], "proposed");
    assert_eq!(before["open_proposals"][0]["tally"]["yes"], 1);
    assert_eq!(vote["resolved"], true);
    assert_eq!(after["scene"]["status"], "active");
    assert_eq!(after["scene"]["tension"], 7);
}

#[tokio::test]
async fn test_challenged_beat_is_revised_and_voted_back_to_canon() {
    // Arrange
    let (app, _) = common::build_test_app();
    let author = Uuid::new_v4();
    let (game_id, scene_id) = common::game_with_scene(&app, &[author]).await;
    let (_, submission) = common::post_json(
        app.clone(),
        &format!("/api/v1/games/{game_id}/scenes/{scene_id}/beats"),
        &json!({
            "actor_id": author,
            "events": [
                { "type": "narrative", "content": "The dragon sleeps beneath the chapel." },
                { "type": "roll", "notation": "2d6", "reason": "stealth" }
            ]
        }),
    )
    .await;
    assert_eq!(submission["beat"]["status"], "canon");
    let beat_uri = format!(
        "/api/v1/games/{game_id}/beats/{}",
        submission["beat"]["id"].as_str().unwrap()
    );
    let (status, challenged) = common::post_json(
        app.clone(),
        &format!("{beat_uri}/challenge"),
        &json!({ "actor_id": author, "reason": "contradicts lore" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(challenged["status"], "challenged");

    // Act
    let (status, revision) = common::post_json(
        app.clone(),
        &format!("{beat_uri}/challenge/accept"),
        &json!({ "actor_id": author, "revised_content": "The dragon sleeps beneath the old mill." }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revision["proposal"]["auto_approved"], true);
    assert_eq!(revision["beat"]["status"], "canon");
    assert_eq!(revision["beat"]["challenge_outcome"], "accepted_revision");
    assert_eq!(revision["beat"]["challenge_reason"], "contradicts lore");
    assert_eq!(revision["beat"]["events"][1]["type"], "roll");
}

#[tokio::test]
async fn test_duplicate_act_proposal_returns_conflict() {
    // Arrange
    let (app, _) = common::build_test_app();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let game_id = common::create_game(&app, &[alice, bob]).await;
    let (_, start) = common::post_json(
        app.clone(),
        &format!("/api/v1/games/{game_id}/proposals"),
        &json!({ "actor_id": alice, "kind": "ready_to_play" }),
    )
    .await;
    common::post_json(
        app.clone(),
        &format!(
            "/api/v1/games/{game_id}/proposals/{}/votes",
            start["proposal"]["id"].as_str().unwrap()
        ),
        &json!({ "actor_id": bob, "choice": "yes" }),
    )
    .await;
    let act = json!({ "actor_id": alice, "guiding_question": "Who rules the marsh?" });
    common::post_json(app.clone(), &format!("/api/v1/games/{game_id}/acts"), &act).await;

    // Act
    let (status, json) =
        common::post_json(app, &format!("/api/v1/games/{game_id}/acts"), &act).await;

    // Assert
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "duplicate_open_proposal");
}
