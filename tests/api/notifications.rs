use serde_json::json;
use sqlx::Row;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{spawn_app, TestApp};

fn post_body(title: &str, slug: &str, content: &str, published: bool) -> serde_json::Value {
    json!({
        "title": title,
        "slug": slug,
        "author": "Ada",
        "content": content,
        "published": published
    })
}

async fn pending_queue_len(app: &TestApp) -> i64 {
    sqlx::query("SELECT COUNT(*) as count FROM notification_delivery_queue")
        .fetch_one(&app.db_pool)
        .await
        .unwrap()
        .get("count")
}

#[tokio::test]
async fn publishing_a_new_post_notifies_each_active_subscriber_once() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("one@example.com").await;
    app.create_confirmed_subscriber("two@example.com").await;

    let _mock_guard = Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount_as_scoped(&app.email_server)
        .await;

    let response = app
        .post_create_post(&post_body("Hello", "hello", "Body text", true))
        .await;
    assert_eq!(201, response.status().as_u16());

    app.dispatch_all_pending_emails().await;

    let notifications = app.notification_requests().await;
    assert_eq!(notifications.len(), 2);
    // Each recipient gets their own unsubscribe token.
    let bodies: Vec<&str> = notifications
        .iter()
        .map(|n| n["textContent"].as_str().unwrap())
        .collect();
    assert_ne!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn creating_an_unpublished_post_sends_nothing() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("one@example.com").await;

    let response = app
        .post_create_post(&post_body("Draft", "draft", "Body", false))
        .await;
    assert_eq!(201, response.status().as_u16());

    assert_eq!(pending_queue_len(&app).await, 0);
}

#[tokio::test]
async fn resaving_a_published_post_does_not_notify_again() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("one@example.com").await;

    let _mock_guard = Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount_as_scoped(&app.email_server)
        .await;

    app.post_create_post(&post_body("Hello", "hello", "Body", true))
        .await;
    app.dispatch_all_pending_emails().await;

    // An edit to an already-published post is not a publish edge.
    let response = app
        .put_update_post("hello", &post_body("Hello v2", "hello", "Body v2", true))
        .await;
    assert_eq!(200, response.status().as_u16());

    assert_eq!(pending_queue_len(&app).await, 0);
    assert_eq!(app.notification_requests().await.len(), 1);
}

#[tokio::test]
async fn each_publish_edge_triggers_exactly_one_run() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("one@example.com").await;

    Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;

    // published: true -> false -> true is two distinct edges.
    app.post_create_post(&post_body("Hello", "hello", "Body", true))
        .await;
    app.dispatch_all_pending_emails().await;
    app.put_update_post("hello", &post_body("Hello", "hello", "Body", false))
        .await;
    app.dispatch_all_pending_emails().await;
    app.put_update_post("hello", &post_body("Hello", "hello", "Body", true))
        .await;
    app.dispatch_all_pending_emails().await;

    assert_eq!(app.notification_requests().await.len(), 2);
}

#[tokio::test]
async fn a_subscriber_who_unsubscribes_after_the_snapshot_is_skipped() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("keeper@example.com").await;
    app.create_confirmed_subscriber("leaver@example.com").await;

    // Publish first: both ids are snapshotted and queued.
    let response = app
        .post_create_post(&post_body("Hello", "hello", "Body", true))
        .await;
    assert_eq!(201, response.status().as_u16());
    assert_eq!(pending_queue_len(&app).await, 2);

    // Unsubscribe one of them before the queue is drained.
    let token = app.subscriber_token("leaver@example.com").await;
    app.api_client
        .post(format!("{}/blog/unsubscribe/{}", app.address, token))
        .send()
        .await
        .unwrap();

    let _mock_guard = Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount_as_scoped(&app.email_server)
        .await;

    app.dispatch_all_pending_emails().await;

    let notifications = app.notification_requests().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0]["to"][0]["email"].as_str().unwrap(),
        "keeper@example.com"
    );
}

#[tokio::test]
async fn enqueue_failure_falls_back_to_in_process_delivery() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("one@example.com").await;

    // Break the queue backend; the chunk must be delivered inline instead
    // of being dropped.
    sqlx::query("DROP TABLE notification_delivery_queue")
        .execute(&app.db_pool)
        .await
        .unwrap();

    let _mock_guard = Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount_as_scoped(&app.email_server)
        .await;

    let response = app
        .post_create_post(&post_body("Hello", "hello", "Body", true))
        .await;

    assert_eq!(201, response.status().as_u16());
    assert_eq!(app.notification_requests().await.len(), 1);
}

#[tokio::test]
async fn publishing_succeeds_even_when_the_transport_fails() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("one@example.com").await;

    Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.email_server)
        .await;

    let response = app
        .post_create_post(&post_body("Hello", "hello", "Body", true))
        .await;
    assert_eq!(201, response.status().as_u16());

    // Delivery fails per recipient, the run still completes and the queue
    // drains without retries.
    app.dispatch_all_pending_emails().await;
    assert_eq!(pending_queue_len(&app).await, 0);
}

#[tokio::test]
async fn the_notification_email_carries_excerpt_and_links() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("one@example.com").await;

    Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;

    let long_content = "word ".repeat(100);
    app.post_create_post(&post_body("A long read", "a-long-read", &long_content, true))
        .await;
    app.dispatch_all_pending_emails().await;

    let notifications = app.notification_requests().await;
    assert_eq!(notifications.len(), 1);
    let text = notifications[0]["textContent"].as_str().unwrap();
    assert_eq!(
        notifications[0]["subject"].as_str().unwrap(),
        "New post: A long read"
    );
    // 500 characters of content truncate to 300 plus an ellipsis.
    assert!(text.contains("..."));
    assert!(text.contains("/blog/a-long-read"));
    let token = app.subscriber_token("one@example.com").await;
    assert!(text.contains(&format!("/blog/unsubscribe/{token}")));
}
