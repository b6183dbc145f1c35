use common::{Message, mq::MessageEnvelope};
use mq::{Broker, DeliveryState};
use receiver::store::{DeadLetterRecorder, MessageGateway};
use serde_json::json;

use crate::common::{TestApp, eventually};

async fn settled_on(app: &TestApp, queue: &str) -> Vec<DeliveryState> {
    app.broker
        .ledger()
        .await
        .into_iter()
        .filter(|record| record.queue == queue && record.state.is_terminal())
        .map(|record| record.state)
        .collect()
}

#[tokio::test]
async fn published_message_is_persisted_and_acknowledged() {
    let app = TestApp::spawn().await;

    let receipt = app
        .publisher
        .publish(Message::new(1, "widget", 9.99).unwrap())
        .await
        .unwrap();

    eventually(|| async { !app.gateway.find_all().await.unwrap().is_empty() }).await;
    eventually(|| async { !settled_on(&app, &app.mq.queue).await.is_empty() }).await;

    let stored = app.gateway.find_all().await.unwrap();
    assert_eq!(stored, vec![receipt.message]);
    assert_eq!(
        settled_on(&app, &app.mq.queue).await,
        vec![DeliveryState::Acknowledged]
    );
    assert!(app.dead_letters.find_all().await.unwrap().is_empty());

    app.stop().await;
}

#[tokio::test]
async fn duplicate_id_is_dead_lettered_without_overwriting() {
    let app = TestApp::spawn().await;

    let first = app
        .publisher
        .publish(Message::new(1, "widget", 9.99).unwrap())
        .await
        .unwrap();
    eventually(|| async { app.gateway.exists_by_id(1).await.unwrap() }).await;

    app.publisher
        .publish(Message::new(1, "widget v2", 19.99).unwrap())
        .await
        .unwrap();
    eventually(|| async { !app.dead_letters.find_all().await.unwrap().is_empty() }).await;

    assert_eq!(app.gateway.find_all().await.unwrap(), vec![first.message]);

    let records = app.dead_letters.find_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].message_content.contains("widget v2"));
    assert_eq!(records[0].error_reason, "failed in primary queue");

    assert_eq!(
        settled_on(&app, &app.mq.queue).await,
        vec![
            DeliveryState::Acknowledged,
            DeliveryState::Rejected { requeue: false }
        ]
    );

    app.stop().await;
}

#[tokio::test]
async fn invalid_payload_on_the_wire_is_dead_lettered_not_stored() {
    let app = TestApp::spawn().await;
    let envelope = MessageEnvelope {
        message_type: "message".into(),
        message_id: "2".into(),
        correlation_id: None,
        metadata: Default::default(),
        payload: json!({"id": 2, "name": "", "price": 5.0}),
        routing_key: None,
    };

    app.broker
        .publish(&app.mq.exchange, &app.mq.routing_key, envelope)
        .await
        .unwrap();

    eventually(|| async { app.dead_letters.find_all().await.unwrap().len() == 1 }).await;

    assert!(app.gateway.find_all().await.unwrap().is_empty());
    assert_eq!(
        settled_on(&app, &app.mq.queue).await,
        vec![DeliveryState::Rejected { requeue: false }]
    );
    let records = app.dead_letters.find_all().await.unwrap();
    assert!(records[0].message_content.contains(r#""name":"""#));

    app.stop().await;
}

#[tokio::test]
async fn storage_outage_dead_letters_exactly_once() {
    let app = TestApp::spawn().await;
    app.gateway.set_down(true);

    app.publisher
        .publish(Message::new(3, "gizmo", 4.5).unwrap())
        .await
        .unwrap();

    eventually(|| async { !app.dead_letters.find_all().await.unwrap().is_empty() }).await;
    eventually(|| async { settled_on(&app, &app.mq.dlx_queue).await.len() == 1 }).await;

    assert_eq!(
        settled_on(&app, &app.mq.queue).await,
        vec![DeliveryState::Rejected { requeue: false }]
    );
    assert_eq!(
        settled_on(&app, &app.mq.dlx_queue).await,
        vec![DeliveryState::Acknowledged]
    );

    let records = app.dead_letters.find_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].message_content.contains("gizmo"));

    app.gateway.set_down(false);
    assert!(app.gateway.find_all().await.unwrap().is_empty());
    assert_eq!(app.broker.queue_depth(&app.mq.queue).await, 0);
    assert_eq!(app.broker.queue_depth(&app.mq.dlx_queue).await, 0);

    app.stop().await;
}

#[tokio::test]
async fn every_delivery_reaches_a_terminal_state() {
    let app = TestApp::spawn().await;

    for id in 1..=5 {
        app.publisher
            .publish(Message::new(id, "widget", 1.0).unwrap())
            .await
            .unwrap();
    }
    app.publisher
        .publish(Message::new(3, "again", 1.0).unwrap())
        .await
        .unwrap();

    eventually(|| async { app.gateway.find_all().await.unwrap().len() == 5 }).await;
    eventually(|| async { app.dead_letters.find_all().await.unwrap().len() == 1 }).await;
    eventually(|| async { app.broker.in_flight().await == 0 }).await;

    let ledger = app.broker.ledger().await;
    assert_eq!(ledger.len(), 7);
    assert!(ledger.iter().all(|record| record.state.is_terminal()));

    app.stop().await;
}
