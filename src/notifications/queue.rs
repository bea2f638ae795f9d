use std::time::Duration;

use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{field::display, Span};
use uuid::Uuid;

use crate::blog::{posts, subscribers};
use crate::configuration::Settings;
use crate::domain::ApplicationBaseUrl;
use crate::email_client::EmailClient;
use crate::notifications::render;
use crate::startup::get_connection_pool;

/// Queue-table handle used by the fan-out scheduler. A chunk is enqueued as
/// one transaction; the worker drains it row by row.
#[derive(Clone)]
pub struct DeliveryQueue {
    pool: PgPool,
}

impl DeliveryQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(
        name = "Enqueue notification chunk",
        skip(self, subscriber_ids),
        fields(chunk_len = subscriber_ids.len())
    )]
    pub async fn enqueue_chunk(
        &self,
        post_id: Uuid,
        subscriber_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        let mut transaction = self.pool.begin().await?;
        for subscriber_id in subscriber_ids {
            sqlx::query(
                r#"
                INSERT INTO notification_delivery_queue (post_id, subscriber_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(post_id)
            .bind(subscriber_id)
            .execute(&mut *transaction)
            .await?;
        }
        transaction.commit().await
    }
}

pub enum ExecutionOutcome {
    TaskCompleted,
    EmptyQueue,
}

/// Processes one queued delivery. Send failures are logged and the task is
/// still completed: there is no durable retry beyond the immediate attempt.
#[tracing::instrument(
    skip_all,
    fields(post_id = tracing::field::Empty, subscriber_id = tracing::field::Empty),
    err
)]
pub async fn try_execute_task(
    pool: &PgPool,
    email_client: &EmailClient,
    base_url: &ApplicationBaseUrl,
) -> anyhow::Result<ExecutionOutcome> {
    let task = dequeue_task(pool).await?;
    let Some((transaction, post_id, subscriber_id)) = task else {
        return Ok(ExecutionOutcome::EmptyQueue);
    };

    Span::current()
        .record("post_id", display(post_id))
        .record("subscriber_id", display(subscriber_id));

    match posts::get_by_id(pool, post_id).await? {
        Some(post) => {
            match subscribers::get_active_by_id(pool, subscriber_id).await? {
                Some(subscriber) => {
                    let email = render::post_notification(&post, &subscriber, base_url);
                    if let Err(e) = email_client
                        .send_email(
                            &email.recipient,
                            &email.subject,
                            &email.text_body,
                            email.html_body.as_deref(),
                        )
                        .await
                    {
                        tracing::error!(
                            "Failed to deliver a post notification to a subscriber. Skipping. {e:#}"
                        );
                    }
                }
                // Unsubscribed (or removed) since the snapshot was taken.
                None => {}
            }
        }
        None => {
            tracing::warn!("The post behind a queued notification no longer exists. Skipping.");
        }
    }

    delete_task(transaction, post_id, subscriber_id).await?;

    Ok(ExecutionOutcome::TaskCompleted)
}

type PgTransaction = Transaction<'static, Postgres>;

#[tracing::instrument(skip_all)]
async fn dequeue_task(
    pool: &PgPool,
) -> anyhow::Result<Option<(PgTransaction, Uuid, Uuid)>> {
    let mut transaction = pool.begin().await?;
    let row = sqlx::query(
        r#"
        SELECT post_id, subscriber_id
        FROM notification_delivery_queue
        FOR UPDATE
        SKIP LOCKED
        LIMIT 1
        "#,
    )
    .fetch_optional(&mut *transaction)
    .await?;
    if let Some(row) = row {
        Ok(Some((
            transaction,
            row.try_get("post_id")?,
            row.try_get("subscriber_id")?,
        )))
    } else {
        Ok(None)
    }
}

#[tracing::instrument(skip_all)]
async fn delete_task(
    mut transaction: PgTransaction,
    post_id: Uuid,
    subscriber_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        DELETE FROM notification_delivery_queue
        WHERE
            post_id = $1 AND
            subscriber_id = $2
        "#,
    )
    .bind(post_id)
    .bind(subscriber_id)
    .execute(&mut *transaction)
    .await?;
    transaction.commit().await?;
    Ok(())
}

async fn worker_loop(
    pool: PgPool,
    email_client: EmailClient,
    base_url: ApplicationBaseUrl,
) -> anyhow::Result<()> {
    loop {
        match try_execute_task(&pool, &email_client, &base_url).await {
            Ok(ExecutionOutcome::EmptyQueue) => {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Err(_) => {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Ok(ExecutionOutcome::TaskCompleted) => {}
        }
    }
}

pub async fn run_worker_until_stopped(configuration: Settings) -> anyhow::Result<()> {
    let connection_pool = get_connection_pool(&configuration.database);
    let email_client = configuration.email.client()?;
    worker_loop(
        connection_pool,
        email_client,
        configuration.application.base_url,
    )
    .await
}
