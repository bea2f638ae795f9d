use std::sync::Arc;

use sqlx::PgPool;

use crate::blog::posts::Post;
use crate::blog::subscribers;
use crate::domain::ApplicationBaseUrl;
use crate::notifications::fanout;
use crate::notifications::{DeliveryQueue, Dispatcher};

/// Notify exactly once per publish edge: a post that is published now and
/// was either just created or previously unpublished. Re-saving an
/// already-published post stays silent.
pub fn publish_edge(was_published: bool, now_published: bool, created: bool) -> bool {
    now_published && (created || !was_published)
}

/// Where notification chunks go: a queue table drained by a worker process,
/// or detached in-process tasks. Chosen once at startup.
pub enum ChunkBackend {
    Queue(DeliveryQueue),
    Local,
}

/// Post-commit hook of the post mutation service. Decides whether a save is
/// a publish edge and, if so, snapshots the active audience and fans out.
pub struct Notifier {
    pub(crate) pool: PgPool,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) backend: ChunkBackend,
    pub(crate) base_url: Arc<ApplicationBaseUrl>,
    pub(crate) batch_size: usize,
}

impl Notifier {
    pub fn new(
        pool: PgPool,
        dispatcher: Arc<Dispatcher>,
        backend: ChunkBackend,
        base_url: Arc<ApplicationBaseUrl>,
        batch_size: usize,
    ) -> Self {
        Self {
            pool,
            dispatcher,
            backend,
            base_url,
            batch_size,
        }
    }

    /// Never fails the caller: the triggering save has already committed and
    /// must appear to succeed regardless of what happens downstream.
    #[tracing::instrument(
        name = "Evaluating post save for notification",
        skip(self, post),
        fields(post_slug = %post.slug, was_published, created)
    )]
    pub async fn post_saved(&self, post: &Post, was_published: bool, created: bool) {
        if !publish_edge(was_published, post.published, created) {
            return;
        }
        let snapshot = match subscribers::active_subscriber_ids(&self.pool).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!("Failed to snapshot active subscribers: {e:?}");
                return;
            }
        };
        if snapshot.is_empty() {
            tracing::info!("No active subscribers. Skipping the notification run.");
            return;
        }
        tracing::info!(
            subscriber_count = snapshot.len(),
            "Starting a notification run."
        );
        fanout::dispatch_notification(self, post, snapshot).await;
    }
}
