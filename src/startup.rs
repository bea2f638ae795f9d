use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::configuration::{DatabaseSettings, Settings};
use crate::notifications::{ChunkBackend, DeliveryQueue, Dispatcher, Notifier};
use crate::routes::{
    api_contact, api_projects, api_resume, api_skills, api_testimonials, create_post, get_site,
    health_check, home, manage_dashboard, manage_request, manage_request_form, manage_unsubscribe,
    post_detail, post_list, subscribe, subscribe_confirm, subscribe_form, unsubscribe,
    unsubscribe_form, update_post,
};
use crate::AppState;

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(configuration: Settings) -> anyhow::Result<Self> {
        let pg_connection_pool = get_connection_pool(&configuration.database);

        let email_client = Arc::new(configuration.email.client()?);
        let dispatcher = Arc::new(Dispatcher::new(
            email_client,
            configuration.notifications.detached_send,
        ));
        let application_base_url = Arc::new(configuration.application.base_url.clone());
        let backend = if configuration.notifications.queue_enabled {
            ChunkBackend::Queue(DeliveryQueue::new(pg_connection_pool.clone()))
        } else {
            ChunkBackend::Local
        };
        let notifier = Arc::new(Notifier::new(
            pg_connection_pool.clone(),
            dispatcher.clone(),
            backend,
            application_base_url.clone(),
            configuration.notifications.batch_size,
        ));

        let app_state = AppState {
            pg_connection_pool,
            dispatcher,
            notifier,
            application_base_url,
        };

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(address).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router: build_router(app_state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        axum::serve(self.listener, self.router).await
    }
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(2))
        .connect_lazy_with(configuration.with_db())
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health_check", get(health_check))
        .route("/", get(home))
        .route("/blog", get(post_list))
        .route("/blog/subscribe", get(subscribe_form).post(subscribe))
        .route("/blog/subscribe/confirm/:token", get(subscribe_confirm))
        .route(
            "/blog/subscribe/manage",
            get(manage_request_form).post(manage_request),
        )
        .route(
            "/blog/subscribe/manage/:token",
            get(manage_dashboard).post(manage_unsubscribe),
        )
        .route(
            "/blog/unsubscribe/:token",
            get(unsubscribe_form).post(unsubscribe),
        )
        .route("/blog/:slug", get(post_detail))
        .route("/api/contact", post(api_contact))
        .route("/api/site", get(get_site))
        .route("/api/projects", get(api_projects))
        .route("/api/skills", get(api_skills))
        .route("/api/resume", get(api_resume))
        .route("/api/testimonials", get(api_testimonials))
        .route("/api/posts", post(create_post))
        .route("/api/posts/:slug", put(update_post))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
