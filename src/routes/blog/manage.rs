use askama_axum::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::Deserialize;

use anyhow::Context;

use super::{InvalidLinkPage, SubscriptionError};
use crate::blog::subscribers;
use crate::domain::{SubscriberEmail, SubscriberToken};
use crate::notifications::render;
use crate::AppState;

#[derive(Template)]
#[template(path = "blog/manage_request.html")]
struct ManageRequestPage {
    message: String,
}

#[derive(Template)]
#[template(path = "blog/manage_sent.html")]
struct ManageSentPage {
    email: String,
}

#[derive(Template)]
#[template(path = "blog/manage_dashboard.html")]
struct ManageDashboardPage {
    email: String,
    active: bool,
    token: String,
}

#[derive(Template)]
#[template(path = "blog/unsubscribe_confirm.html")]
struct UnsubscribeConfirmPage {
    email: String,
    token: String,
}

#[derive(Template)]
#[template(path = "blog/unsubscribe_success.html")]
struct UnsubscribeSuccessPage {
    email: String,
}

#[derive(Deserialize)]
pub struct ManageFormData {
    pub email: String,
}

pub async fn manage_request_form() -> Response {
    ManageRequestPage {
        message: String::new(),
    }
    .into_response()
}

/// Emails a token link for self-service management. An unknown address gets
/// an inline message rather than an error: subscriber existence is only
/// revealed to the inbox owner.
#[tracing::instrument(
    name = "Requesting a subscription management link",
    skip(state, form),
    fields(subscriber_email = %form.email)
)]
pub async fn manage_request(
    state: State<AppState>,
    form: Form<ManageFormData>,
) -> Result<Response, SubscriptionError> {
    let email = match SubscriberEmail::parse(form.email.clone()) {
        Ok(email) => email,
        Err(_) => {
            return Ok(ManageRequestPage {
                message: "Please provide a valid email address.".to_string(),
            }
            .into_response())
        }
    };

    let subscriber = match subscribers::find_by_email(&state.pg_connection_pool, &email)
        .await
        .context("Failed to look up the subscriber.")?
    {
        Some(subscriber) => subscriber,
        None => {
            return Ok(ManageRequestPage {
                message: "No subscription found for that email address.".to_string(),
            }
            .into_response())
        }
    };

    let management = render::management_email(
        &subscriber.email,
        &subscriber.token,
        &state.application_base_url,
    );
    state.dispatcher.send(management).await;

    Ok(ManageSentPage {
        email: subscriber.email.to_string(),
    }
    .into_response())
}

#[tracing::instrument(name = "Showing the subscription dashboard", skip(state, token))]
pub async fn manage_dashboard(
    state: State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, SubscriptionError> {
    let token = match SubscriberToken::parse(&token) {
        Ok(token) => token,
        Err(_) => return Ok(InvalidLinkPage.into_response()),
    };
    match subscribers::find_by_token(&state.pg_connection_pool, &token)
        .await
        .context("Failed to look up the subscriber.")?
    {
        Some(subscriber) => Ok(ManageDashboardPage {
            email: subscriber.email.to_string(),
            active: subscriber.active,
            token: subscriber.token.to_string(),
        }
        .into_response()),
        None => Ok(InvalidLinkPage.into_response()),
    }
}

#[tracing::instrument(name = "Unsubscribing via the dashboard", skip(state, token))]
pub async fn manage_unsubscribe(
    state: State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, SubscriptionError> {
    unsubscribe_inner(&state, &token).await
}

#[tracing::instrument(name = "Showing the unsubscribe confirmation", skip(state, token))]
pub async fn unsubscribe_form(
    state: State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, SubscriptionError> {
    let token = match SubscriberToken::parse(&token) {
        Ok(token) => token,
        Err(_) => return Ok(InvalidLinkPage.into_response()),
    };
    match subscribers::find_by_token(&state.pg_connection_pool, &token)
        .await
        .context("Failed to look up the subscriber.")?
    {
        Some(subscriber) => Ok(UnsubscribeConfirmPage {
            email: subscriber.email.to_string(),
            token: subscriber.token.to_string(),
        }
        .into_response()),
        None => Ok(InvalidLinkPage.into_response()),
    }
}

#[tracing::instrument(name = "Unsubscribing a subscriber", skip(state, token))]
pub async fn unsubscribe(
    state: State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, SubscriptionError> {
    unsubscribe_inner(&state, &token).await
}

/// The token survives unsubscribing, so the link stays valid and repeating
/// the POST is harmless.
async fn unsubscribe_inner(state: &AppState, token: &str) -> Result<Response, SubscriptionError> {
    let token = match SubscriberToken::parse(token) {
        Ok(token) => token,
        Err(_) => return Ok(InvalidLinkPage.into_response()),
    };
    match subscribers::deactivate_by_token(&state.pg_connection_pool, &token)
        .await
        .context("Failed to deactivate the subscriber.")?
    {
        Some(subscriber) => Ok(UnsubscribeSuccessPage {
            email: subscriber.email.to_string(),
        }
        .into_response()),
        None => Ok(InvalidLinkPage.into_response()),
    }
}
