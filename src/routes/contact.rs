use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::portfolio::insert_contact_message;
use crate::AppState;

#[derive(Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[tracing::instrument(
    name = "Storing a contact message",
    skip(state, form),
    fields(sender_email = %form.email)
)]
pub async fn api_contact(state: State<AppState>, form: Json<ContactForm>) -> Response {
    match insert_contact_message(
        &state.pg_connection_pool,
        &form.name,
        &form.email,
        &form.message,
    )
    .await
    {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}
