use once_cell::sync::Lazy;
use serde_json::Value;
use sqlx::{Connection, Executor, PgConnection, PgPool, Row};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use portfolio::configuration::{get_configuration, DatabaseSettings};
use portfolio::domain::ApplicationBaseUrl;
use portfolio::email_client::EmailClient;
use portfolio::notifications::{try_execute_task, ExecutionOutcome};
use portfolio::startup::{get_connection_pool, Application};
use portfolio::telemetry::{get_tracing_subscriber, init_subscriber};

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    };
});

pub struct TestApp {
    pub port: u16,
    pub address: String,
    pub db_pool: PgPool,
    pub email_server: MockServer,
    pub email_client: EmailClient,
    pub base_url: ApplicationBaseUrl,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn post_subscribe(&self, body: String) -> reqwest::Response {
        self.api_client
            .post(format!("{}/blog/subscribe", &self.address))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_manage_request(&self, body: String) -> reqwest::Response {
        self.api_client
            .post(format!("{}/blog/subscribe/manage", &self.address))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_create_post(&self, body: &Value) -> reqwest::Response {
        self.api_client
            .post(format!("{}/api/posts", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn put_update_post(&self, slug: &str, body: &Value) -> reqwest::Response {
        self.api_client
            .put(format!("{}/api/posts/{slug}", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// All URLs found in the text body of a captured email, rewritten to the
    /// test application's port.
    pub fn links_in(&self, email_request: &wiremock::Request) -> Vec<reqwest::Url> {
        let body = serde_json::from_slice::<Value>(&email_request.body).unwrap();
        linkify::LinkFinder::new()
            .links(body["textContent"].as_str().unwrap())
            .filter(|l| *l.kind() == linkify::LinkKind::Url)
            .map(|l| {
                let mut link = reqwest::Url::parse(l.as_str()).unwrap();
                assert_eq!(link.host_str().unwrap(), "127.0.0.1");
                link.set_port(Some(self.port)).unwrap();
                link
            })
            .collect()
    }

    pub fn get_confirmation_link(&self, email_request: &wiremock::Request) -> reqwest::Url {
        let links = self.links_in(email_request);
        assert_eq!(links.len(), 1);
        links[0].clone()
    }

    /// Subscribes and follows the emailed confirmation link.
    pub async fn create_confirmed_subscriber(&self, email: &str) {
        let _mock_guard = Mock::given(path("/v3/smtp/email"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .named("Create confirmed subscriber")
            .expect(1)
            .mount_as_scoped(&self.email_server)
            .await;

        let body = serde_urlencoded::to_string([("email", email)]).unwrap();
        self.post_subscribe(body)
            .await
            .error_for_status()
            .unwrap();

        let email_request = self
            .email_server
            .received_requests()
            .await
            .unwrap()
            .pop()
            .unwrap();
        let confirmation_link = self.get_confirmation_link(&email_request);
        reqwest::get(confirmation_link)
            .await
            .unwrap()
            .error_for_status()
            .unwrap();
    }

    pub async fn subscriber_token(&self, email: &str) -> Uuid {
        sqlx::query("SELECT token FROM subscribers WHERE email = $1")
            .bind(email)
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to fetch subscriber token.")
            .get("token")
    }

    /// Drains the notification delivery queue, standing in for the worker
    /// process.
    pub async fn dispatch_all_pending_emails(&self) {
        loop {
            if let ExecutionOutcome::EmptyQueue =
                try_execute_task(&self.db_pool, &self.email_client, &self.base_url)
                    .await
                    .unwrap()
            {
                break;
            }
        }
    }

    /// Captured transport requests that carry a post notification.
    pub async fn notification_requests(&self) -> Vec<Value> {
        self.email_server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
            .filter(|b| {
                b["subject"]
                    .as_str()
                    .unwrap_or_default()
                    .starts_with("New post:")
            })
            .collect()
    }
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let email_server = MockServer::start().await;

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.database.database_name = Uuid::new_v4().to_string();
        c.application.port = 0;
        c.email.endpoint = email_server.uri();
        // Deterministic delivery in tests: blocking sends, queue-backed
        // fan-out drained explicitly via dispatch_all_pending_emails.
        c.notifications.detached_send = false;
        c.notifications.queue_enabled = true;
        c
    };
    configure_database(&configuration.database).await;

    let application = Application::build(configuration.clone())
        .await
        .expect("Failed to build application.");
    let application_port = application.port();
    let address = format!("http://localhost:{}", application_port);
    tokio::spawn(application.run_until_stopped());

    TestApp {
        port: application_port,
        address,
        db_pool: get_connection_pool(&configuration.database),
        email_server,
        email_client: configuration
            .email
            .client()
            .expect("Failed to build email client."),
        base_url: configuration.application.base_url.clone(),
        api_client: reqwest::Client::new(),
    }
}

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");

    connection_pool
}
