use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::engine::RunOutcome;
use crate::progress::ProgressTracker;

/// Builds the pooled client shared by every request of one batch.
pub(crate) fn build_client(request_timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(request_timeout).build()
}

async fn fetch(client: Client, url: Url) -> reqwest::Result<StatusCode> {
    let response = client.get(url).send().await?;
    Ok(response.status())
}

/// Fires `tracker.total()` concurrent GETs at `url` and drains them.
///
/// This future is the only place the tracker is advanced, so progress
/// reports arrive one at a time and in increasing order. `client` and every
/// pooled connection it holds are dropped when this returns.
pub(crate) async fn run_batch(
    client: Client,
    url: Url,
    tracker: Arc<ProgressTracker>,
    cancel: CancellationToken,
) -> RunOutcome {
    let total = tracker.total();
    let mut tasks = JoinSet::new();

    for id in 0..total {
        let client = client.clone();
        let url = url.clone();
        tasks.spawn(async move { (id, fetch(client, url).await) });
    }

    info!("Dispatched {} requests to {}", total, url);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                let in_flight = tasks.len();
                tasks.shutdown().await;
                info!(
                    "Batch cancelled: completed={}, abandoned={}",
                    tracker.completed(),
                    in_flight
                );
                return RunOutcome::Cancelled;
            }

            joined = tasks.join_next() => {
                match joined {
                    Some(Ok((id, Ok(status)))) => {
                        debug!("Request {} finished with status {}", id, status);
                    }
                    Some(Ok((id, Err(e)))) => {
                        warn!("Request {} failed: {}", id, e);
                    }
                    Some(Err(e)) => {
                        error!("Request task died: {}", e);
                    }
                    None => {
                        info!("Batch complete: {} requests finished", tracker.completed());
                        return RunOutcome::Completed;
                    }
                }
                tracker.on_request_finished();
            }
        }
    }
}
