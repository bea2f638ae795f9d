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
#[template(path = "blog/subscribe.html")]
struct SubscribePage {
    message: String,
}

#[derive(Template)]
#[template(path = "blog/subscribe_success.html")]
struct SubscribeSuccessPage {
    email: String,
}

#[derive(Template)]
#[template(path = "blog/subscribe_confirmed.html")]
struct SubscribeConfirmedPage {
    email: String,
}

#[derive(Deserialize)]
pub struct SubscribeFormData {
    pub email: String,
}

pub async fn subscribe_form() -> Response {
    SubscribePage {
        message: String::new(),
    }
    .into_response()
}

/// Double opt-in entry point: records (or re-uses) a pending row and sends a
/// confirmation link. An already-active subscriber short-circuits to the
/// success page without another email.
#[tracing::instrument(
    name = "Adding a new subscriber",
    skip(state, form),
    fields(subscriber_email = %form.email)
)]
pub async fn subscribe(
    state: State<AppState>,
    form: Form<SubscribeFormData>,
) -> Result<Response, SubscriptionError> {
    let email = match SubscriberEmail::parse(form.email.clone()) {
        Ok(email) => email,
        Err(_) => {
            return Ok(SubscribePage {
                message: "Please provide a valid email address.".to_string(),
            }
            .into_response())
        }
    };

    let subscriber = subscribers::get_or_insert_pending(&state.pg_connection_pool, &email)
        .await
        .context("Failed to store the pending subscriber.")?;
    if subscriber.active {
        return Ok(SubscribeSuccessPage {
            email: subscriber.email.to_string(),
        }
        .into_response());
    }

    let confirmation = render::confirmation_email(
        &subscriber.email,
        &subscriber.token,
        &state.application_base_url,
    );
    state.dispatcher.send(confirmation).await;

    Ok(SubscribeSuccessPage {
        email: subscriber.email.to_string(),
    }
    .into_response())
}

/// Confirmation links are single-use: activating rotates the token, so a
/// second visit with the same link lands on the invalid-link page.
#[tracing::instrument(name = "Confirming a pending subscriber", skip(state, token))]
pub async fn subscribe_confirm(
    state: State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, SubscriptionError> {
    let token = match SubscriberToken::parse(&token) {
        Ok(token) => token,
        Err(_) => return Ok(InvalidLinkPage.into_response()),
    };
    match subscribers::confirm_by_token(&state.pg_connection_pool, &token)
        .await
        .context("Failed to confirm the subscriber.")?
    {
        Some(subscriber) => Ok(SubscribeConfirmedPage {
            email: subscriber.email.to_string(),
        }
        .into_response()),
        None => Ok(InvalidLinkPage.into_response()),
    }
}
