//! Drives one pipeline run at a time and publishes its state.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::error::{RunError, TransportError};
use super::interpreter::LogInterpreter;
use super::line::LogLine;
use super::reassembler::LineReassembler;
use super::state::{PipelineRunState, RunPhase};
use super::transport::{PipelineTransport, RunRequest};

/// Owns the single active-run slot and the observable run state.
///
/// State snapshots are published on a `watch` channel after every processed
/// line, so observers always see a consistent `PipelineRunState`. The slot is
/// the state's own phase: a run holds it while its phase is active.
pub struct RunController {
    transport: Arc<dyn PipelineTransport>,
    interpreter: Arc<LogInterpreter>,
    state: Arc<watch::Sender<PipelineRunState>>,
}

impl RunController {
    pub fn new<T: PipelineTransport + 'static>(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    pub fn from_arc(transport: Arc<dyn PipelineTransport>) -> Self {
        let (state, _) = watch::channel(PipelineRunState::default());
        Self {
            transport,
            interpreter: Arc::new(LogInterpreter::default()),
            state: Arc::new(state),
        }
    }

    pub fn with_interpreter(mut self, interpreter: LogInterpreter) -> Self {
        self.interpreter = Arc::new(interpreter);
        self
    }

    /// Receiver for state snapshots of this and all later runs.
    pub fn subscribe(&self) -> watch::Receiver<PipelineRunState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> PipelineRunState {
        self.state.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().is_active()
    }

    /// Starts a run on a new task. Must be called within a tokio runtime.
    ///
    /// Rejected requests leave the current state untouched.
    pub fn start_run(&self, request: RunRequest) -> Result<RunHandle, RunError> {
        if request.max_scrolls == 0 {
            return Err(RunError::InvalidRequest(
                "maxScrolls must be at least 1".to_string(),
            ));
        }
        if request.source_id.trim().is_empty() {
            return Err(RunError::InvalidRequest(
                "source id must not be empty".to_string(),
            ));
        }

        let run = ActiveRun::acquire(Arc::clone(&self.state))?;
        let updates = self.state.subscribe();
        let run_id = run.run_id.clone();

        let span = info_span!(
            "pipeline_run",
            run_id = %run_id,
            source_id = %request.source_id,
            max_scrolls = request.max_scrolls
        );
        let transport = Arc::clone(&self.transport);
        let interpreter = Arc::clone(&self.interpreter);
        let task = tokio::spawn(drive(transport, interpreter, request, run).instrument(span));

        Ok(RunHandle {
            run_id,
            task,
            updates,
        })
    }
}

/// A started run.
pub struct RunHandle {
    run_id: String,
    task: JoinHandle<PipelineRunState>,
    updates: watch::Receiver<PipelineRunState>,
}

impl RunHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Receiver positioned at the run's current snapshot.
    pub fn updates(&self) -> watch::Receiver<PipelineRunState> {
        self.updates.clone()
    }

    /// Waits for the run to end and returns its terminal state.
    pub async fn wait(self) -> PipelineRunState {
        match self.task.await {
            Ok(state) => state,
            Err(e) => {
                warn!(run_id = %self.run_id, "Run task ended abnormally: {}", e);
                self.updates.borrow().clone()
            }
        }
    }
}

/// Holds the active-run slot for one run.
///
/// Dropping it while the run still looks active marks the run `Failed`, so
/// the slot is released even if the run task is aborted or panics.
struct ActiveRun {
    run_id: String,
    state: Arc<watch::Sender<PipelineRunState>>,
}

impl ActiveRun {
    fn acquire(state: Arc<watch::Sender<PipelineRunState>>) -> Result<Self, RunError> {
        let run_id = Uuid::new_v4().to_string();
        let mut acquired = false;
        state.send_if_modified(|current| {
            if current.is_active() {
                return false;
            }
            *current = PipelineRunState::begin(&run_id);
            acquired = true;
            true
        });

        if acquired {
            Ok(Self { run_id, state })
        } else {
            Err(RunError::AlreadyRunning)
        }
    }

    fn process_line(&self, interpreter: &LogInterpreter, line: LogLine) {
        if line.is_blank() {
            return;
        }
        self.update(|state| {
            let events = interpreter.interpret(line.as_str(), &state.progress);
            let before = state.phase;
            state.push_line(line);
            for event in &events {
                state.apply(event);
            }
            if state.phase != before {
                info!(phase = %state.phase, "Run entered new phase");
            }
        });
    }

    fn finish(&self) -> PipelineRunState {
        self.update(PipelineRunState::finish);
        self.snapshot()
    }

    fn fail(&self, error: &TransportError) -> PipelineRunState {
        self.update(|state| state.fail(error));
        self.snapshot()
    }

    /// Modifies the published state only while it still belongs to this run.
    fn update(&self, modify: impl FnOnce(&mut PipelineRunState)) {
        let run_id = self.run_id.as_str();
        let owned = self.state.send_if_modified(|state| {
            if !state.is_active() || state.run_id.as_deref() != Some(run_id) {
                return false;
            }
            modify(state);
            true
        });
        if !owned {
            warn!("Run no longer owns the published state, update dropped");
        }
    }

    fn snapshot(&self) -> PipelineRunState {
        self.state.borrow().clone()
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        let run_id = self.run_id.as_str();
        self.state.send_if_modified(|state| {
            if state.is_active() && state.run_id.as_deref() == Some(run_id) {
                state.fail("run ended before completion");
                true
            } else {
                false
            }
        });
    }
}

async fn drive(
    transport: Arc<dyn PipelineTransport>,
    interpreter: Arc<LogInterpreter>,
    request: RunRequest,
    run: ActiveRun,
) -> PipelineRunState {
    info!("Starting pipeline run");

    let mut chunks = match transport.open(&request).await {
        Ok(chunks) => chunks,
        Err(e) => {
            warn!("Failed to open run stream: {}", e);
            return run.fail(&e);
        }
    };

    let mut reassembler = LineReassembler::new();
    let failure = loop {
        match chunks.next().await {
            Some(Ok(chunk)) => {
                for line in reassembler.feed(&chunk) {
                    run.process_line(&interpreter, line);
                }
            }
            Some(Err(e)) => break Some(e),
            None => break None,
        }
    };

    // The trailing partial line is processed before the terminal transition.
    for line in reassembler.flush() {
        run.process_line(&interpreter, line);
    }

    let terminal = match failure {
        None => run.finish(),
        Some(e) => {
            warn!("Run stream failed: {}", e);
            run.fail(&e)
        }
    };

    debug!(
        posts_found = terminal.counters.posts_found,
        jobs_extracted = terminal.counters.jobs_extracted,
        jobs_uploaded = terminal.counters.jobs_uploaded,
        "Run finished"
    );
    if terminal.phase == RunPhase::Done {
        info!("Pipeline run completed");
    }
    terminal
}
