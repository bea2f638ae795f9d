use std::fmt::{Debug, Display};

use tokio::task::JoinError;

use portfolio::configuration::get_configuration;
use portfolio::notifications::run_worker_until_stopped;
use portfolio::startup::Application;
use portfolio::telemetry::{get_tracing_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_tracing_subscriber("portfolio".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().expect("Failed to read configuration.");

    let application = Application::build(configuration.clone()).await?;
    let application_task = tokio::spawn(application.run_until_stopped());

    if configuration.notifications.queue_enabled {
        let worker_task = tokio::spawn(run_worker_until_stopped(configuration));
        tokio::select! {
            o = application_task => report_exit("API", o),
            o = worker_task => report_exit("Delivery worker", o),
        };
    } else {
        report_exit("API", application_task.await);
    }

    Ok(())
}

fn report_exit(task_name: &str, outcome: Result<Result<(), impl Debug + Display>, JoinError>) {
    match outcome {
        Ok(Ok(())) => {
            tracing::info!("{task_name} has exited")
        }
        Ok(Err(e)) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "{task_name} failed",
            )
        }
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "{task_name} task failed to complete",
            )
        }
    }
}
