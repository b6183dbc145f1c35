use common::Message;
use receiver::store::DeadLetterRecorder;
use serde_json::json;

use crate::common::{TestApp, eventually, routes};

#[tokio::test]
async fn empty_database_lists_nothing() {
    let app = TestApp::spawn().await;

    let messages = app.get(routes::MESSAGES).await;
    assert_eq!(messages.status, 200);
    assert_eq!(messages.body, json!([]));

    let dead_letters = app.get(routes::DEAD_LETTERS).await;
    assert_eq!(dead_letters.status, 200);
    assert_eq!(dead_letters.body, json!([]));

    app.stop().await;
}

#[tokio::test]
async fn messages_are_listed_in_id_order() {
    let app = TestApp::spawn().await;

    for id in [3, 1, 2] {
        app.publisher
            .publish(Message::new(id, format!("item-{id}"), 2.5).unwrap())
            .await
            .unwrap();
    }

    eventually(|| async {
        app.get(routes::MESSAGES)
            .await
            .body
            .as_array()
            .is_some_and(|rows| rows.len() == 3)
    })
    .await;

    let first = app.get(routes::MESSAGES).await;
    let second = app.get(routes::MESSAGES).await;
    assert_eq!(first.body, second.body);

    let rows = first.body.as_array().unwrap();
    let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(rows[0]["name"], "item-1");
    assert_eq!(rows[0]["price"], 2.5);
    assert!(rows[0]["timestamp"].is_string());

    app.stop().await;
}

#[tokio::test]
async fn dead_letters_are_listed() {
    let app = TestApp::spawn().await;

    app.dead_letters
        .record(r#"{"id":9,"name":"widget","price":1.0}"#, "failed in primary queue")
        .await
        .unwrap();

    let res = app.get(routes::DEAD_LETTERS).await;
    assert_eq!(res.status, 200);

    let rows = res.body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], 1);
    assert_eq!(rows[0]["error_reason"], "failed in primary queue");
    assert!(
        rows[0]["message_content"]
            .as_str()
            .unwrap()
            .contains("widget")
    );
    assert!(rows[0]["timestamp"].is_string());

    app.stop().await;
}

#[tokio::test]
async fn storage_failure_hides_driver_detail() {
    let app = TestApp::spawn().await;
    app.gateway.set_down(true);

    let res = app.get(routes::MESSAGES).await;
    assert_eq!(res.status, 500);
    assert_eq!(res.body["code"], "STORAGE_ERROR");

    let message = res.body["message"].as_str().unwrap();
    assert!(!message.contains("10.0.0.5"));
    assert!(!message.contains("os error"));

    app.stop().await;
}

#[tokio::test]
async fn scalar_docs_are_served() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .get(format!("http://{}/scalar", app.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    app.stop().await;
}
