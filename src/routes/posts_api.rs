use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::blog::posts::{self, Post, PostData};
use crate::utils::{e400, e500};
use crate::AppState;

/// Creating a post is the create-as-published half of the publish trigger:
/// the notifier runs after the insert has committed.
#[tracing::instrument(
    name = "Creating a post",
    skip(state, data),
    fields(post_title = %data.title, published = data.published)
)]
pub async fn create_post(
    state: State<AppState>,
    data: Json<PostData>,
) -> Result<(StatusCode, Json<Post>), StatusCode> {
    let post = posts::create_post(&state.pg_connection_pool, &data)
        .await
        .map_err(e400)?;
    state.notifier.post_saved(&post, false, true).await;
    Ok((StatusCode::CREATED, Json(post)))
}

/// Updating a post carries the pre-update `published` value into the
/// notifier so only the unpublished-to-published edge fans out.
#[tracing::instrument(name = "Updating a post", skip(state, data))]
pub async fn update_post(
    state: State<AppState>,
    Path(slug): Path<String>,
    data: Json<PostData>,
) -> Result<Response, StatusCode> {
    match posts::update_post(&state.pg_connection_pool, &slug, &data)
        .await
        .map_err(e500)?
    {
        Some((post, was_published)) => {
            state.notifier.post_saved(&post, was_published, false).await;
            Ok(Json(post).into_response())
        }
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}
