use sqlx::Row;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::spawn_app;

#[tokio::test]
async fn a_management_request_for_an_unknown_email_shows_an_inline_message() {
    let app = spawn_app().await;

    Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_manage_request("email=nobody%40example.com".into())
        .await;

    assert_eq!(200, response.status().as_u16());
    let html = response.text().await.unwrap();
    assert!(html.contains("No subscription found for that email address."));
}

#[tokio::test]
async fn a_management_request_sends_a_token_link() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("ursula@example.com").await;

    let _mock_guard = Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount_as_scoped(&app.email_server)
        .await;

    app.post_manage_request("email=ursula%40example.com".into())
        .await;

    let email_request = app
        .email_server
        .received_requests()
        .await
        .unwrap()
        .pop()
        .unwrap();
    let link = app.get_confirmation_link(&email_request);
    assert!(link.path().starts_with("/blog/subscribe/manage/"));
}

#[tokio::test]
async fn the_management_dashboard_shows_status_and_unsubscribes_on_post() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("ursula@example.com").await;
    let token = app.subscriber_token("ursula@example.com").await;
    let manage_url = format!("{}/blog/subscribe/manage/{}", app.address, token);

    let dashboard = reqwest::get(&manage_url).await.unwrap();
    let html = dashboard.text().await.unwrap();
    assert!(html.contains("ursula@example.com"));
    assert!(html.contains("active"));

    let response = app.api_client.post(&manage_url).send().await.unwrap();
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("You have been unsubscribed"));

    let row = sqlx::query("SELECT active FROM subscribers WHERE email = $1")
        .bind("ursula@example.com")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert!(!row.get::<bool, _>("active"));
}

#[tokio::test]
async fn the_unsubscribe_link_shows_a_confirmation_page_and_deactivates_on_post() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("ursula@example.com").await;
    let token = app.subscriber_token("ursula@example.com").await;
    let unsubscribe_url = format!("{}/blog/unsubscribe/{}", app.address, token);

    let page = reqwest::get(&unsubscribe_url).await.unwrap();
    assert!(page.text().await.unwrap().contains("ursula@example.com"));

    let response = app.api_client.post(&unsubscribe_url).send().await.unwrap();
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("You have been unsubscribed"));

    let row = sqlx::query("SELECT active FROM subscribers WHERE email = $1")
        .bind("ursula@example.com")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert!(!row.get::<bool, _>("active"));
}

#[tokio::test]
async fn the_unsubscribe_link_stays_valid_after_use() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("ursula@example.com").await;
    let token = app.subscriber_token("ursula@example.com").await;
    let unsubscribe_url = format!("{}/blog/unsubscribe/{}", app.address, token);

    app.api_client.post(&unsubscribe_url).send().await.unwrap();
    // The token is not rotated on unsubscribe: a second POST is an
    // idempotent no-op, not an invalid-link error.
    let response = app.api_client.post(&unsubscribe_url).send().await.unwrap();

    assert!(response
        .text()
        .await
        .unwrap()
        .contains("You have been unsubscribed"));
    let token_after = app.subscriber_token("ursula@example.com").await;
    assert_eq!(token, token_after);
}
