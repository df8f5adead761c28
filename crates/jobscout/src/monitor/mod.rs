//! Live monitoring of remote pipeline runs.
//!
//! A run's only output is a chunked text stream. The controller turns it into
//! lines ([`LineReassembler`]), derives events from each line
//! ([`LogInterpreter`]) and folds them into an observable
//! [`PipelineRunState`].

mod controller;
mod error;
mod interpreter;
mod line;
mod reassembler;
mod state;
mod transport;

pub use controller::{RunController, RunHandle};
pub use error::{RunError, TransportError};
pub use interpreter::{Action, Hint, LogInterpreter, Matcher, Rule};
pub use line::{LineSeverity, LogLine};
pub use reassembler::LineReassembler;
pub use state::{Counter, Counters, PipelineRunState, Progress, ProgressChannel, RunEvent, RunPhase};
pub use transport::{ChunkStream, HttpPipelineTransport, PipelineTransport, RunMode, RunRequest};
