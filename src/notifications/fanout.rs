use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::blog::posts::Post;
use crate::blog::subscribers;
use crate::domain::ApplicationBaseUrl;
use crate::notifications::trigger::{ChunkBackend, Notifier};
use crate::notifications::{render, Dispatcher};

/// Splits the subscriber snapshot into contiguous batches and hands each one
/// off. Queue handoff failure downgrades that chunk to an immediate
/// in-process delivery instead of dropping it.
#[tracing::instrument(
    name = "Fanning out notification chunks",
    skip_all,
    fields(post_slug = %post.slug, subscriber_count = snapshot.len())
)]
pub(crate) async fn dispatch_notification(notifier: &Notifier, post: &Post, snapshot: Vec<Uuid>) {
    let batch_size = notifier.batch_size.max(1);
    for chunk in snapshot.chunks(batch_size) {
        match &notifier.backend {
            ChunkBackend::Queue(queue) => {
                if let Err(e) = queue.enqueue_chunk(post.id, chunk).await {
                    tracing::warn!(
                        "Failed to enqueue a notification chunk. Delivering it in-process. {e:?}"
                    );
                    deliver_chunk(
                        &notifier.pool,
                        &notifier.dispatcher,
                        &notifier.base_url,
                        post,
                        chunk,
                    )
                    .await;
                }
            }
            ChunkBackend::Local => {
                let pool = notifier.pool.clone();
                let dispatcher = notifier.dispatcher.clone();
                let base_url = notifier.base_url.clone();
                let post = post.clone();
                let chunk = chunk.to_vec();
                tokio::spawn(async move {
                    deliver_chunk(&pool, &dispatcher, &base_url, &post, &chunk).await;
                });
            }
        }
    }
}

/// Per-recipient delivery for one chunk. Each subscriber is re-fetched with
/// `active=true` so anyone who unsubscribed after the snapshot is skipped,
/// and one recipient's failure never aborts the rest.
#[tracing::instrument(
    name = "Delivering notification chunk",
    skip_all,
    fields(post_slug = %post.slug, chunk_len = chunk.len())
)]
pub(crate) async fn deliver_chunk(
    pool: &PgPool,
    dispatcher: &Arc<Dispatcher>,
    base_url: &ApplicationBaseUrl,
    post: &Post,
    chunk: &[Uuid],
) {
    for &subscriber_id in chunk {
        let subscriber = match subscribers::get_active_by_id(pool, subscriber_id).await {
            Ok(Some(subscriber)) => subscriber,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Failed to fetch subscriber {subscriber_id}. Skipping. {e:?}");
                continue;
            }
        };
        let email = render::post_notification(post, &subscriber, base_url);
        dispatcher.send(email).await;
    }
}
