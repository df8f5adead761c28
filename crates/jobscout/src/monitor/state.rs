//! Progress model derived from a run's log output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::line::LogLine;

/// Coarse stage of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Scraping,
    Structuring,
    Uploading,
    Done,
    Failed,
}

impl RunPhase {
    /// A run in this phase still owns the controller.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RunPhase::Scraping | RunPhase::Structuring | RunPhase::Uploading
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "Idle"),
            RunPhase::Scraping => write!(f, "Scraping posts"),
            RunPhase::Structuring => write!(f, "Extracting job data"),
            RunPhase::Uploading => write!(f, "Uploading jobs"),
            RunPhase::Done => write!(f, "Done"),
            RunPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Named run counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Counter {
    PostsFound,
    JobsExtracted,
    JobsUploaded,
}

/// Per-phase progress bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressChannel {
    Scrape,
    Structure,
    Upload,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    pub posts_found: u64,
    pub jobs_extracted: u64,
    pub jobs_uploaded: u64,
}

impl Counters {
    pub fn get(&self, counter: Counter) -> u64 {
        match counter {
            Counter::PostsFound => self.posts_found,
            Counter::JobsExtracted => self.jobs_extracted,
            Counter::JobsUploaded => self.jobs_uploaded,
        }
    }

    /// Sets the counter to `value` unless that would lower it.
    pub fn raise(&mut self, counter: Counter, value: u64) {
        let slot = match counter {
            Counter::PostsFound => &mut self.posts_found,
            Counter::JobsExtracted => &mut self.jobs_extracted,
            Counter::JobsUploaded => &mut self.jobs_uploaded,
        };
        *slot = (*slot).max(value);
    }
}

/// Percentages in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub scrape: u8,
    pub structure: u8,
    pub upload: u8,
}

impl Progress {
    pub const COMPLETE: u8 = 100;

    pub fn get(&self, channel: ProgressChannel) -> u8 {
        match channel {
            ProgressChannel::Scrape => self.scrape,
            ProgressChannel::Structure => self.structure,
            ProgressChannel::Upload => self.upload,
        }
    }

    /// Moves the channel up to `value` (clamped to 100); never moves it down.
    pub fn raise(&mut self, channel: ProgressChannel, value: u8) {
        let slot = match channel {
            ProgressChannel::Scrape => &mut self.scrape,
            ProgressChannel::Structure => &mut self.structure,
            ProgressChannel::Upload => &mut self.upload,
        };
        *slot = (*slot).max(value.min(Self::COMPLETE));
    }

    pub fn complete(&mut self) {
        self.scrape = Self::COMPLETE;
        self.structure = Self::COMPLETE;
        self.upload = Self::COMPLETE;
    }

    pub fn is_complete(&self) -> bool {
        self.scrape == Self::COMPLETE
            && self.structure == Self::COMPLETE
            && self.upload == Self::COMPLETE
    }
}

/// Events the log interpreter derives from a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    PhaseStarted(RunPhase),
    CounterUpdated(Counter, u64),
    ProgressHint(ProgressChannel, u8),
}

/// Live state of the controller's current (or last) run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub phase: RunPhase,
    pub counters: Counters,
    pub progress: Progress,
    pub log: Vec<LogLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for PipelineRunState {
    fn default() -> Self {
        Self {
            run_id: None,
            phase: RunPhase::Idle,
            counters: Counters::default(),
            progress: Progress::default(),
            log: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }
}

impl PipelineRunState {
    /// Fresh state for a run that is starting now.
    pub fn begin(run_id: &str) -> Self {
        Self {
            run_id: Some(run_id.to_string()),
            phase: RunPhase::Scraping,
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    pub fn push_line(&mut self, line: LogLine) {
        self.log.push(line);
    }

    /// Applies one interpreted event.
    ///
    /// Only the stream's end can make a run terminal, so phase events naming
    /// a phase that is not active are ignored.
    pub fn apply(&mut self, event: &RunEvent) {
        match *event {
            RunEvent::PhaseStarted(phase) if phase.is_active() => self.phase = phase,
            RunEvent::PhaseStarted(_) => {}
            RunEvent::CounterUpdated(counter, value) => self.counters.raise(counter, value),
            RunEvent::ProgressHint(channel, value) => self.progress.raise(channel, value),
        }
    }

    /// Stream ended cleanly.
    pub fn finish(&mut self) {
        self.phase = RunPhase::Done;
        self.progress.complete();
        self.finished_at = Some(Utc::now());
    }

    /// Transport failed; records the failure as a log line.
    pub fn fail(&mut self, detail: impl std::fmt::Display) {
        self.log.push(LogLine::error(detail));
        self.phase = RunPhase::Failed;
        self.progress.complete();
        self.finished_at = Some(Utc::now());
    }
}
