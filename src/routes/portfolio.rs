use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::portfolio::{self, Project, ResumeEntry, SiteSettings, Skill, Testimonial};
use crate::utils::e500;
use crate::AppState;

pub async fn get_site(state: State<AppState>) -> Result<Json<SiteSettings>, StatusCode> {
    let settings = portfolio::get_site_settings(&state.pg_connection_pool)
        .await
        .map_err(e500)?;
    Ok(Json(settings))
}

pub async fn api_projects(state: State<AppState>) -> Result<Json<Vec<Project>>, StatusCode> {
    let projects = portfolio::list_projects(&state.pg_connection_pool)
        .await
        .map_err(e500)?;
    Ok(Json(projects))
}

pub async fn api_skills(state: State<AppState>) -> Result<Json<Vec<Skill>>, StatusCode> {
    let skills = portfolio::list_skills(&state.pg_connection_pool)
        .await
        .map_err(e500)?;
    Ok(Json(skills))
}

pub async fn api_resume(state: State<AppState>) -> Result<Json<Vec<ResumeEntry>>, StatusCode> {
    let entries = portfolio::list_resume_entries(&state.pg_connection_pool)
        .await
        .map_err(e500)?;
    Ok(Json(entries))
}

pub async fn api_testimonials(
    state: State<AppState>,
) -> Result<Json<Vec<Testimonial>>, StatusCode> {
    let testimonials = portfolio::list_testimonials(&state.pg_connection_pool)
        .await
        .map_err(e500)?;
    Ok(Json(testimonials))
}
