use chrono::Utc;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct SiteSettings {
    pub site_name: String,
    pub tagline: String,
    pub about: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "My Portfolio".to_string(),
            tagline: String::new(),
            about: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub url: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub level: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumeEntry {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub period_start: String,
    pub period_end: String,
    pub description: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Testimonial {
    pub id: Uuid,
    pub author: String,
    pub quote: String,
    pub sort_order: i32,
}

/// The singleton settings row; a missing row falls back to defaults so a
/// fresh database still renders.
#[tracing::instrument(name = "Fetch site settings", skip_all)]
pub async fn get_site_settings(pg_pool: &PgPool) -> Result<SiteSettings, sqlx::Error> {
    let row = sqlx::query("SELECT site_name, tagline, about FROM site_settings LIMIT 1")
        .fetch_optional(pg_pool)
        .await?;
    match row {
        Some(row) => Ok(SiteSettings {
            site_name: row.try_get("site_name")?,
            tagline: row.try_get("tagline")?,
            about: row.try_get("about")?,
        }),
        None => Ok(SiteSettings::default()),
    }
}

#[tracing::instrument(name = "List projects", skip_all)]
pub async fn list_projects(pg_pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, title, slug, description, url, sort_order FROM projects ORDER BY sort_order, title",
    )
    .fetch_all(pg_pool)
    .await?;
    rows.iter()
        .map(|row: &PgRow| {
            Ok(Project {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                slug: row.try_get("slug")?,
                description: row.try_get("description")?,
                url: row.try_get("url")?,
                sort_order: row.try_get("sort_order")?,
            })
        })
        .collect()
}

#[tracing::instrument(name = "List skills", skip_all)]
pub async fn list_skills(pg_pool: &PgPool) -> Result<Vec<Skill>, sqlx::Error> {
    let rows = sqlx::query("SELECT id, name, level, sort_order FROM skills ORDER BY sort_order")
        .fetch_all(pg_pool)
        .await?;
    rows.iter()
        .map(|row: &PgRow| {
            Ok(Skill {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                level: row.try_get("level")?,
                sort_order: row.try_get("sort_order")?,
            })
        })
        .collect()
}

#[tracing::instrument(name = "List resume entries", skip_all)]
pub async fn list_resume_entries(pg_pool: &PgPool) -> Result<Vec<ResumeEntry>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, title, company, period_start, period_end, description, sort_order
         FROM resume_entries ORDER BY sort_order",
    )
    .fetch_all(pg_pool)
    .await?;
    rows.iter()
        .map(|row: &PgRow| {
            Ok(ResumeEntry {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                company: row.try_get("company")?,
                period_start: row.try_get("period_start")?,
                period_end: row.try_get("period_end")?,
                description: row.try_get("description")?,
                sort_order: row.try_get("sort_order")?,
            })
        })
        .collect()
}

#[tracing::instrument(name = "List testimonials", skip_all)]
pub async fn list_testimonials(pg_pool: &PgPool) -> Result<Vec<Testimonial>, sqlx::Error> {
    let rows =
        sqlx::query("SELECT id, author, quote, sort_order FROM testimonials ORDER BY sort_order")
            .fetch_all(pg_pool)
            .await?;
    rows.iter()
        .map(|row: &PgRow| {
            Ok(Testimonial {
                id: row.try_get("id")?,
                author: row.try_get("author")?,
                quote: row.try_get("quote")?,
                sort_order: row.try_get("sort_order")?,
            })
        })
        .collect()
}

#[tracing::instrument(name = "Insert contact message", skip(pg_pool, message))]
pub async fn insert_contact_message(
    pg_pool: &PgPool,
    name: &str,
    email: &str,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO contact_messages (id, name, email, message, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(message)
    .bind(Utc::now())
    .execute(pg_pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {e:?}");
        e
    })?;
    Ok(())
}
