use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn valid_message_is_published_to_main_queue() {
    let app = TestApp::spawn().await;

    let res = app
        .post_json(
            routes::PUBLISH,
            &json!({"id": 1, "name": "widget", "price": 9.99}),
        )
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["id"], 1);
    assert!(res.body["correlation_id"].is_string());
    assert!(res.body["timestamp"].is_string());

    let queued = app.broker.peek(&app.mq.queue).await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].payload["name"], "widget");
    assert_eq!(queued[0].payload["price"], 9.99);
    assert_eq!(
        queued[0].correlation_id.map(|c| c.to_string()),
        res.body["correlation_id"].as_str().map(str::to_string)
    );
}

#[tokio::test]
async fn caller_timestamp_is_overwritten() {
    let app = TestApp::spawn().await;

    let res = app
        .post_json(
            routes::PUBLISH,
            &json!({
                "id": 4,
                "name": "widget",
                "price": 1.5,
                "timestamp": "1999-12-31T23:59:59Z"
            }),
        )
        .await;

    assert_eq!(res.status, 200);
    let queued = app.broker.peek(&app.mq.queue).await;
    assert_ne!(queued[0].payload["timestamp"], "1999-12-31T23:59:59Z");
}

#[tokio::test]
async fn blank_name_fails_before_reaching_broker() {
    let app = TestApp::spawn().await;

    let res = app
        .post_json(routes::PUBLISH, &json!({"id": 2, "name": "", "price": 5.0}))
        .await;

    assert_eq!(res.status, 500);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert!(res.body["message"].as_str().unwrap().contains("name"));
    assert_eq!(app.broker.queue_depth(&app.mq.queue).await, 0);
    assert_eq!(app.broker.queue_depth(&app.mq.dlx_queue).await, 0);
}

#[tokio::test]
async fn missing_or_non_positive_fields_are_rejected() {
    let app = TestApp::spawn().await;

    for body in [
        json!({"name": "widget", "price": 1.0}),
        json!({"id": 5, "price": 1.0}),
        json!({"id": 5, "name": "widget"}),
        json!({"id": 5, "name": "widget", "price": 0}),
        json!({"id": 5, "name": "widget", "price": -3.2}),
    ] {
        let res = app.post_json(routes::PUBLISH, &body).await;
        assert_eq!(res.status, 500, "body {body} should be rejected");
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    assert_eq!(app.broker.queue_depth(&app.mq.queue).await, 0);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = TestApp::spawn().await;

    let res = app.post_raw(routes::PUBLISH, "{not json").await;

    assert_eq!(res.status, 500);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert!(
        res.body["message"]
            .as_str()
            .unwrap()
            .starts_with("Message body could not be read")
    );
    assert_eq!(app.broker.queue_depth(&app.mq.queue).await, 0);
}

#[tokio::test]
async fn broker_outage_returns_500_without_driver_detail() {
    let app = TestApp::spawn().await;
    app.broker.set_unavailable(true);

    let res = app
        .post_json(
            routes::PUBLISH,
            &json!({"id": 6, "name": "widget", "price": 2.0}),
        )
        .await;

    assert_eq!(res.status, 500);
    assert_eq!(res.body["code"], "PUBLISH_FAILED");
    let message = res.body["message"].as_str().unwrap();
    assert!(!message.contains("connection unavailable"));
}

#[tokio::test]
async fn negative_confirm_still_answers_200() {
    let app = TestApp::spawn().await;
    app.broker.set_nack_publishes(true);

    let res = app
        .post_json(
            routes::PUBLISH,
            &json!({"id": 7, "name": "widget", "price": 2.0}),
        )
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(app.broker.queue_depth(&app.mq.queue).await, 0);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::spawn().await;

    let res = app.get("/scalar").await;

    assert_eq!(res.status, 200);
}
