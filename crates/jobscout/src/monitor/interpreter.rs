//! Derives phase, counter and progress events from free-text run output.
//!
//! The remote job's only contract is its log text, so interpretation is a
//! prioritized table of `(matcher, action)` rules. Adding a marker means
//! adding a row; the controller never changes.
//!
//! Rules fall into two groups, phase rules and counter rules. Within each
//! group the first matching rule wins, so a single line yields at most one
//! phase transition and one counter update. Lines that match nothing produce
//! no events.

use std::sync::LazyLock;

use regex::Regex;

use super::state::{Counter, Progress, ProgressChannel, RunEvent, RunPhase};

static RE_SAVED_POSTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Saved (\d+) new posts").unwrap());
static RE_PROCESSING_JOB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Processing job (\d+)/").unwrap());
static RE_UPLOADING_JOBS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Uploading (\d+) jobs").unwrap());

/// How a rule recognizes its line.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Plain substring.
    Contains(&'static str),
    /// Regex whose first group captures an integer.
    Capture(Regex),
}

impl Matcher {
    /// `None` if the line does not match; `Some(capture)` otherwise.
    /// A capture that is not a valid `u64` counts as no match.
    fn evaluate(&self, line: &str) -> Option<Option<u64>> {
        match self {
            Matcher::Contains(needle) => line.contains(needle).then_some(None),
            Matcher::Capture(re) => {
                let caps = re.captures(line)?;
                let value = caps.get(1)?.as_str().parse::<u64>().ok()?;
                Some(Some(value))
            }
        }
    }
}

/// Progress adjustment attached to a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// Raise the channel to a fixed value.
    Set(ProgressChannel, u8),
    /// Advance the channel by `by`, but not past `ceiling`.
    Step {
        channel: ProgressChannel,
        by: u8,
        ceiling: u8,
    },
}

impl Hint {
    fn resolve(self, progress: &Progress) -> (ProgressChannel, u8) {
        match self {
            Hint::Set(channel, value) => (channel, value),
            Hint::Step {
                channel,
                by,
                ceiling,
            } => (channel, progress.get(channel).saturating_add(by).min(ceiling)),
        }
    }
}

/// What a matching rule produces.
#[derive(Debug, Clone)]
pub enum Action {
    Phase {
        phase: RunPhase,
        hints: Vec<Hint>,
    },
    Count {
        counter: Counter,
        hint: Hint,
    },
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub matcher: Matcher,
    pub action: Action,
}

impl Rule {
    pub fn phase(marker: &'static str, phase: RunPhase, hints: Vec<Hint>) -> Self {
        Self {
            matcher: Matcher::Contains(marker),
            action: Action::Phase { phase, hints },
        }
    }

    pub fn count(pattern: Regex, counter: Counter, hint: Hint) -> Self {
        Self {
            matcher: Matcher::Capture(pattern),
            action: Action::Count { counter, hint },
        }
    }

    fn is_phase_rule(&self) -> bool {
        matches!(self.action, Action::Phase { .. })
    }
}

/// Rule table evaluated against each reassembled line.
#[derive(Debug, Clone)]
pub struct LogInterpreter {
    rules: Vec<Rule>,
}

impl Default for LogInterpreter {
    fn default() -> Self {
        use ProgressChannel::{Scrape, Structure, Upload};

        Self::with_rules(vec![
            Rule::phase(
                "Step 1: Scraping",
                RunPhase::Scraping,
                vec![Hint::Set(Scrape, 10)],
            ),
            Rule::phase(
                "Step 2: Extracting",
                RunPhase::Structuring,
                vec![Hint::Set(Scrape, 100), Hint::Set(Structure, 10)],
            ),
            Rule::phase(
                "Step 3: Uploading",
                RunPhase::Uploading,
                vec![Hint::Set(Structure, 100), Hint::Set(Upload, 10)],
            ),
            Rule::count(
                RE_SAVED_POSTS.clone(),
                Counter::PostsFound,
                Hint::Set(Scrape, 80),
            ),
            Rule::count(
                RE_PROCESSING_JOB.clone(),
                Counter::JobsExtracted,
                Hint::Step {
                    channel: Structure,
                    by: 5,
                    ceiling: 90,
                },
            ),
            Rule::count(
                RE_UPLOADING_JOBS.clone(),
                Counter::JobsUploaded,
                Hint::Step {
                    channel: Upload,
                    by: 10,
                    ceiling: 90,
                },
            ),
        ])
    }
}

impl LogInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpreter over a custom rule table, highest priority first.
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Appends a lowest-priority rule.
    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the events for `line`, given the progress before it.
    pub fn interpret(&self, line: &str, progress: &Progress) -> Vec<RunEvent> {
        let mut events = Vec::new();
        let mut phase_matched = false;
        let mut counter_matched = false;
        // Step hints later in the same line see earlier hints.
        let mut view = *progress;

        for rule in &self.rules {
            let group_done = if rule.is_phase_rule() {
                &mut phase_matched
            } else {
                &mut counter_matched
            };
            if *group_done {
                continue;
            }
            let Some(capture) = rule.matcher.evaluate(line) else {
                continue;
            };

            match &rule.action {
                Action::Phase { phase, hints } => {
                    events.push(RunEvent::PhaseStarted(*phase));
                    for hint in hints {
                        let (channel, value) = hint.resolve(&view);
                        view.raise(channel, value);
                        events.push(RunEvent::ProgressHint(channel, value));
                    }
                }
                Action::Count { counter, hint } => {
                    let Some(value) = capture else {
                        continue;
                    };
                    events.push(RunEvent::CounterUpdated(*counter, value));
                    let (channel, hint_value) = hint.resolve(&view);
                    view.raise(channel, hint_value);
                    events.push(RunEvent::ProgressHint(channel, hint_value));
                }
            }
            *group_done = true;
        }

        events
    }
}
