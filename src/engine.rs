use std::sync::{Arc, OnceLock};

use reqwest::Client;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError};
use crate::fanout;
use crate::progress::{ProgressCallback, ProgressTracker};

/// How a batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// Lifecycle of a [`DispatchEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    /// The run task ended without reaching an outcome, e.g. a progress
    /// callback panicked or the runtime shut down underneath it.
    Aborted,
}

impl RunState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Aborted
        )
    }

    fn outcome(self) -> Option<RunOutcome> {
        match self {
            RunState::Completed => Some(RunOutcome::Completed),
            RunState::Cancelled => Some(RunOutcome::Cancelled),
            RunState::Idle | RunState::Running | RunState::Aborted => None,
        }
    }
}

impl From<RunOutcome> for RunState {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed => RunState::Completed,
            RunOutcome::Cancelled => RunState::Cancelled,
        }
    }
}

struct RunHandle {
    cancel: CancellationToken,
}

/// Publishes the terminal run state when the run task goes away, including
/// when it unwinds or is dropped before the batch returns.
struct FinalState {
    state: Arc<watch::Sender<RunState>>,
    outcome: Option<RunOutcome>,
}

impl Drop for FinalState {
    fn drop(&mut self) {
        let state = match self.outcome {
            Some(outcome) => outcome.into(),
            None => {
                error!("Run aborted before the batch finished");
                RunState::Aborted
            }
        };
        self.state.send_replace(state);
    }
}

/// Floods one URL with a fixed number of concurrent GET requests.
///
/// The engine is single-use: it is started once and then either runs to
/// completion or is cancelled. `start` and `cancel` never block and may be
/// called from any thread; the batch itself runs on the runtime behind the
/// `Handle` given at construction, and every progress callback is invoked
/// from that runtime.
pub struct DispatchEngine {
    runtime: Handle,
    config: EngineConfig,
    tracker: Arc<ProgressTracker>,
    state: Arc<watch::Sender<RunState>>,
    run: OnceLock<RunHandle>,
}

impl DispatchEngine {
    /// Validates `url` and `total_requests` and builds an idle engine.
    pub fn new<F>(
        runtime: Handle,
        url: &str,
        total_requests: u64,
        callback: F,
    ) -> Result<Self, EngineError>
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        let config = EngineConfig::new(url, total_requests)?;
        Ok(Self::with_config(runtime, config, callback))
    }

    pub fn with_config<F>(runtime: Handle, config: EngineConfig, callback: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        let callback: ProgressCallback = Arc::new(callback);
        let tracker = Arc::new(ProgressTracker::new(config.total_requests(), callback));
        let (state, _) = watch::channel(RunState::Idle);

        Self {
            runtime,
            config,
            tracker,
            state: Arc::new(state),
            run: OnceLock::new(),
        }
    }

    /// Schedules the batch on the runtime and returns immediately.
    pub fn start(&self) -> Result<(), EngineError> {
        if self.run.get().is_some() {
            return Err(EngineError::InvalidState("engine has already been started"));
        }

        let client =
            fanout::build_client(self.config.request_timeout()).map_err(ConfigError::Client)?;

        let mut launched = false;
        self.run.get_or_init(|| {
            launched = true;
            self.launch(client)
        });

        if !launched {
            return Err(EngineError::InvalidState("engine has already been started"));
        }
        Ok(())
    }

    fn launch(&self, client: Client) -> RunHandle {
        let cancel = CancellationToken::new();
        let batch = fanout::run_batch(
            client,
            self.config.url().clone(),
            Arc::clone(&self.tracker),
            cancel.clone(),
        );

        self.state.send_replace(RunState::Running);
        let mut finish = FinalState {
            state: Arc::clone(&self.state),
            outcome: None,
        };

        self.runtime.spawn(async move {
            finish.outcome = Some(batch.await);
        });

        info!(
            "Started run: url={}, requests={}, refresh_rate={}",
            self.config.url(),
            self.config.total_requests(),
            self.tracker.refresh_rate()
        );

        RunHandle { cancel }
    }

    /// Requests cooperative cancellation of the running batch.
    ///
    /// Returns as soon as the signal is raised. Requests already on the wire
    /// may still finish and be reported. Cancelling a finished run is a no-op.
    pub fn cancel(&self) -> Result<(), EngineError> {
        let run = self
            .run
            .get()
            .ok_or(EngineError::InvalidState("cancel called before start"))?;

        run.cancel.cancel();
        debug!("Cancellation requested at completed={}", self.completed());
        Ok(())
    }

    /// Resolves once the batch has completed or been cancelled.
    ///
    /// Fails with [`EngineError::Aborted`] if the run task died first.
    pub async fn wait(&self) -> Result<RunOutcome, EngineError> {
        if self.run.get().is_none() {
            return Err(EngineError::InvalidState("wait called before start"));
        }

        let mut rx = self.state.subscribe();
        let state = *rx
            .wait_for(RunState::is_finished)
            .await
            .map_err(|_| EngineError::InvalidState("run state channel closed"))?;

        state.outcome().ok_or(EngineError::Aborted)
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn completed(&self) -> u64 {
        self.tracker.completed()
    }

    pub fn total(&self) -> u64 {
        self.tracker.total()
    }

    pub fn refresh_rate(&self) -> u64 {
        self.tracker.refresh_rate()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
