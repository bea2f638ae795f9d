use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{SubscriberEmail, SubscriberToken};

/// A subscriber row. Rows are created in the pending state (`active=false`)
/// and are never hard-deleted; unsubscribing flips `active` back off.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub active: bool,
    pub token: SubscriberToken,
    pub created_at: DateTime<Utc>,
}

fn subscriber_from_row(row: &PgRow) -> Result<Subscriber, sqlx::Error> {
    let email: String = row.try_get("email")?;
    let email = SubscriberEmail::parse(email).map_err(|e| sqlx::Error::Decode(e.into()))?;
    let token: Uuid = row.try_get("token")?;
    Ok(Subscriber {
        id: row.try_get("id")?,
        email,
        active: row.try_get("active")?,
        token: SubscriberToken::from(token),
        created_at: row.try_get("created_at")?,
    })
}

const SUBSCRIBER_COLUMNS: &str = "id, email, active, token, created_at";

#[tracing::instrument(name = "Fetch subscriber by email", skip(pg_pool))]
pub async fn find_by_email(
    pg_pool: &PgPool,
    email: &SubscriberEmail,
) -> Result<Option<Subscriber>, sqlx::Error> {
    sqlx::query(&format!(
        "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE email = $1"
    ))
    .bind(email.as_ref())
    .fetch_optional(pg_pool)
    .await?
    .map(|row| subscriber_from_row(&row))
    .transpose()
}

#[tracing::instrument(name = "Fetch subscriber by token", skip_all)]
pub async fn find_by_token(
    pg_pool: &PgPool,
    token: &SubscriberToken,
) -> Result<Option<Subscriber>, sqlx::Error> {
    sqlx::query(&format!(
        "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE token = $1"
    ))
    .bind(token.as_uuid())
    .fetch_optional(pg_pool)
    .await?
    .map(|row| subscriber_from_row(&row))
    .transpose()
}

/// Returns the existing row for this email, or inserts a fresh pending one.
/// Re-subscribing while pending keeps the already-issued token so earlier
/// confirmation links stay valid.
#[tracing::instrument(name = "Get or insert pending subscriber", skip(pg_pool))]
pub async fn get_or_insert_pending(
    pg_pool: &PgPool,
    email: &SubscriberEmail,
) -> Result<Subscriber, sqlx::Error> {
    if let Some(existing) = find_by_email(pg_pool, email).await? {
        return Ok(existing);
    }
    sqlx::query(
        r#"
        INSERT INTO subscribers (id, email, active, token, created_at)
        VALUES ($1, $2, FALSE, $3, $4)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email.as_ref())
    .bind(SubscriberToken::generate().as_uuid())
    .bind(Utc::now())
    .execute(pg_pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {e:?}");
        e
    })?;
    // Re-read to cover a concurrent insert winning the unique race.
    find_by_email(pg_pool, email)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Activates the subscriber holding this token and rotates the token in the
/// same statement. `None` means the token matched no row: either it never
/// existed or it was already spent by a previous confirmation.
#[tracing::instrument(name = "Confirm subscriber by token", skip_all)]
pub async fn confirm_by_token(
    pg_pool: &PgPool,
    token: &SubscriberToken,
) -> Result<Option<Subscriber>, sqlx::Error> {
    sqlx::query(&format!(
        r#"
        UPDATE subscribers
        SET active = TRUE, token = $1
        WHERE token = $2
        RETURNING {SUBSCRIBER_COLUMNS}
        "#
    ))
    .bind(SubscriberToken::generate().as_uuid())
    .bind(token.as_uuid())
    .fetch_optional(pg_pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {e:?}");
        e
    })?
    .map(|row| subscriber_from_row(&row))
    .transpose()
}

/// Sets `active=false` for the subscriber holding this token. The token is
/// deliberately not rotated: the unsubscribe link stays valid and repeated
/// POSTs are idempotent.
#[tracing::instrument(name = "Deactivate subscriber by token", skip_all)]
pub async fn deactivate_by_token(
    pg_pool: &PgPool,
    token: &SubscriberToken,
) -> Result<Option<Subscriber>, sqlx::Error> {
    sqlx::query(&format!(
        r#"
        UPDATE subscribers
        SET active = FALSE
        WHERE token = $1
        RETURNING {SUBSCRIBER_COLUMNS}
        "#
    ))
    .bind(token.as_uuid())
    .fetch_optional(pg_pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {e:?}");
        e
    })?
    .map(|row| subscriber_from_row(&row))
    .transpose()
}

/// Snapshot of every active subscriber id, ascending, taken at
/// notification-decision time.
#[tracing::instrument(name = "Snapshot active subscriber ids", skip_all)]
pub async fn active_subscriber_ids(pg_pool: &PgPool) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows = sqlx::query("SELECT id FROM subscribers WHERE active = TRUE ORDER BY id")
        .fetch_all(pg_pool)
        .await?;
    rows.iter().map(|row| row.try_get("id")).collect()
}

/// Re-fetch filtered on `active=true`: a subscriber who unsubscribed after
/// the snapshot must not receive the email. Best-effort, not transactional
/// with the send itself.
#[tracing::instrument(name = "Fetch active subscriber by id", skip(pg_pool))]
pub async fn get_active_by_id(
    pg_pool: &PgPool,
    subscriber_id: Uuid,
) -> Result<Option<Subscriber>, sqlx::Error> {
    sqlx::query(&format!(
        "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE id = $1 AND active = TRUE"
    ))
    .bind(subscriber_id)
    .fetch_optional(pg_pool)
    .await?
    .map(|row| subscriber_from_row(&row))
    .transpose()
}
