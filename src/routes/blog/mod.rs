mod manage;
mod posts;
mod subscriptions;

pub use manage::*;
pub use posts::*;
pub use subscriptions::*;

use askama_axum::Template;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::routes::error_chain_fmt;

/// Shared "invalid or expired link" page for every token-authenticated
/// route.
#[derive(Template)]
#[template(path = "blog/unsubscribe_invalid.html")]
pub(crate) struct InvalidLinkPage;

#[derive(thiserror::Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        tracing::error!("{self:?}");
        match self {
            Self::UnexpectedError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "").into_response(),
        }
    }
}
