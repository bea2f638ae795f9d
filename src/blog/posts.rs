use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub author: String,
    pub content: String,
    pub category: String,
    pub tags: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Rough reading time at 200 wpm, never below one minute.
    pub fn reading_time_minutes(&self) -> usize {
        let words = self.content.split_whitespace().count();
        std::cmp::max(1, (words + 100) / 200)
    }

    pub fn path(&self) -> String {
        format!("/blog/{}", self.slug)
    }
}

/// Incoming payload for the post mutation endpoints. A missing slug is
/// derived from the title.
#[derive(Debug, Deserialize)]
pub struct PostData {
    pub title: String,
    pub slug: Option<String>,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub published: bool,
}

pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut last_was_dash = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn post_from_row(row: &PgRow) -> Result<Post, sqlx::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        author: row.try_get("author")?,
        content: row.try_get("content")?,
        category: row.try_get("category")?,
        tags: row.try_get("tags")?,
        published: row.try_get("published")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const POST_COLUMNS: &str =
    "id, title, slug, author, content, category, tags, published, created_at, updated_at";

#[tracing::instrument(name = "Insert new post", skip(pg_pool, data), fields(post_title = %data.title))]
pub async fn create_post(pg_pool: &PgPool, data: &PostData) -> Result<Post, sqlx::Error> {
    let slug = match &data.slug {
        Some(slug) if !slug.is_empty() => slug.clone(),
        _ => slugify(&data.title),
    };
    let now = Utc::now();
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO posts (id, title, slug, author, content, category, tags, published, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&data.title)
    .bind(&slug)
    .bind(&data.author)
    .bind(&data.content)
    .bind(&data.category)
    .bind(&data.tags)
    .bind(data.published)
    .bind(now)
    .fetch_one(pg_pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {e:?}");
        e
    })?;
    post_from_row(&row)
}

/// Updates a post in place and reports the pre-update `published` value so
/// the caller can detect the unpublished-to-published edge. `None` when no
/// post carries this slug.
#[tracing::instrument(name = "Update post", skip(pg_pool, data))]
pub async fn update_post(
    pg_pool: &PgPool,
    slug: &str,
    data: &PostData,
) -> Result<Option<(Post, bool)>, sqlx::Error> {
    let mut transaction = pg_pool.begin().await?;

    let was_published: Option<bool> = sqlx::query("SELECT published FROM posts WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&mut *transaction)
        .await?
        .map(|row| row.try_get("published"))
        .transpose()?;
    let Some(was_published) = was_published else {
        return Ok(None);
    };

    let new_slug = match &data.slug {
        Some(s) if !s.is_empty() => s.clone(),
        _ => slug.to_string(),
    };
    let row = sqlx::query(&format!(
        r#"
        UPDATE posts
        SET title = $1, slug = $2, author = $3, content = $4, category = $5,
            tags = $6, published = $7, updated_at = $8
        WHERE slug = $9
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(&data.title)
    .bind(&new_slug)
    .bind(&data.author)
    .bind(&data.content)
    .bind(&data.category)
    .bind(&data.tags)
    .bind(data.published)
    .bind(Utc::now())
    .bind(slug)
    .fetch_one(&mut *transaction)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {e:?}");
        e
    })?;
    transaction.commit().await?;

    Ok(Some((post_from_row(&row)?, was_published)))
}

#[tracing::instrument(name = "Fetch post by id", skip(pg_pool))]
pub async fn get_by_id(pg_pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
        .bind(post_id)
        .fetch_optional(pg_pool)
        .await?
        .map(|row| post_from_row(&row))
        .transpose()
}

#[tracing::instrument(name = "Fetch published post by slug", skip(pg_pool))]
pub async fn get_published_by_slug(
    pg_pool: &PgPool,
    slug: &str,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE slug = $1 AND published = TRUE"
    ))
    .bind(slug)
    .fetch_optional(pg_pool)
    .await?
    .map(|row| post_from_row(&row))
    .transpose()
}

/// Published posts, newest first, optionally filtered by a case-insensitive
/// search over title, content, author, tags and category.
#[tracing::instrument(name = "List published posts", skip(pg_pool))]
pub async fn list_published(
    pg_pool: &PgPool,
    search: Option<&str>,
) -> Result<Vec<Post>, sqlx::Error> {
    let rows = match search.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => {
            let pattern = format!("%{q}%");
            sqlx::query(&format!(
                r#"
                SELECT {POST_COLUMNS} FROM posts
                WHERE published = TRUE
                  AND (title ILIKE $1 OR content ILIKE $1 OR author ILIKE $1
                       OR tags ILIKE $1 OR category ILIKE $1)
                ORDER BY created_at DESC
                "#
            ))
            .bind(pattern)
            .fetch_all(pg_pool)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {POST_COLUMNS} FROM posts WHERE published = TRUE ORDER BY created_at DESC"
            ))
            .fetch_all(pg_pool)
            .await?
        }
    };
    rows.iter().map(post_from_row).collect()
}

#[tracing::instrument(name = "List recent published posts", skip(pg_pool))]
pub async fn list_recent_published(
    pg_pool: &PgPool,
    limit: i64,
) -> Result<Vec<Post>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE published = TRUE ORDER BY created_at DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pg_pool)
    .await?;
    rows.iter().map(post_from_row).collect()
}
