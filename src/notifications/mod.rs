mod dispatcher;
mod fanout;
pub mod queue;
pub mod render;
mod trigger;

pub use dispatcher::{Dispatcher, OutgoingEmail};
pub use queue::{run_worker_until_stopped, try_execute_task, DeliveryQueue, ExecutionOutcome};
pub use trigger::{publish_edge, ChunkBackend, Notifier};
