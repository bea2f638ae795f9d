use askama_axum::Template;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::blog::posts::{self, Post};
use crate::portfolio::{self, Project, ResumeEntry, SiteSettings, Skill, Testimonial};
use crate::utils::e500;
use crate::AppState;

#[derive(Template)]
#[template(path = "home.html")]
struct HomePage {
    settings: SiteSettings,
    projects: Vec<Project>,
    skills: Vec<Skill>,
    resume: Vec<ResumeEntry>,
    testimonials: Vec<Testimonial>,
    posts: Vec<Post>,
}

pub async fn home(state: State<AppState>) -> Result<Response, StatusCode> {
    let pool = &state.pg_connection_pool;
    let settings = portfolio::get_site_settings(pool).await.map_err(e500)?;
    let projects = portfolio::list_projects(pool).await.map_err(e500)?;
    let skills = portfolio::list_skills(pool).await.map_err(e500)?;
    let resume = portfolio::list_resume_entries(pool).await.map_err(e500)?;
    let testimonials = portfolio::list_testimonials(pool).await.map_err(e500)?;
    let posts = posts::list_recent_published(pool, 5).await.map_err(e500)?;

    Ok(HomePage {
        settings,
        projects,
        skills,
        resume,
        testimonials,
        posts,
    }
    .into_response())
}
