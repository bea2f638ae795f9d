use askama_axum::Template;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::blog::posts::{self, Post};
use crate::utils::e500;
use crate::AppState;

#[derive(Template)]
#[template(path = "blog/post_list.html")]
struct PostListPage {
    posts: Vec<Post>,
    q: String,
}

#[derive(Template)]
#[template(path = "blog/post_detail.html")]
struct PostDetailPage {
    post: Post,
}

#[derive(Deserialize)]
pub struct ListParams {
    q: Option<String>,
}

pub async fn post_list(
    state: State<AppState>,
    params: Query<ListParams>,
) -> Result<Response, StatusCode> {
    let q = params.q.clone().unwrap_or_default();
    let posts = posts::list_published(&state.pg_connection_pool, params.q.as_deref())
        .await
        .map_err(e500)?;
    Ok(PostListPage { posts, q }.into_response())
}

pub async fn post_detail(
    state: State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, StatusCode> {
    match posts::get_published_by_slug(&state.pg_connection_pool, &slug)
        .await
        .map_err(e500)?
    {
        Some(post) => Ok(PostDetailPage { post }.into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}
