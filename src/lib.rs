use std::sync::Arc;

use sqlx::PgPool;

use domain::ApplicationBaseUrl;
use notifications::{Dispatcher, Notifier};

pub mod blog;
pub mod configuration;
pub mod domain;
pub mod email_client;
pub mod notifications;
pub mod portfolio;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pg_connection_pool: PgPool,
    pub dispatcher: Arc<Dispatcher>,
    pub notifier: Arc<Notifier>,
    pub application_base_url: Arc<ApplicationBaseUrl>,
}
