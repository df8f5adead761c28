//! Pipeline run monitoring, end to end.

mod common;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::harness::split_at_offsets;
use common::ScriptedTransport;
use jobscout::config::ApiConfig;
use jobscout::monitor::{
    Counters, HttpPipelineTransport, PipelineRunState, RunController, RunError, RunMode,
    RunPhase, RunRequest, TransportError,
};
use jobscout::schedule::ScheduleInterval;

const BACKEND_OUTPUT: &str = "\
--- Starting Pipeline for group 123 ---
>>> Step 1: Scraping Posts (postsExtraction.py)...
[DEBUG] Script: /srv/scripts/postsExtraction.py
[+] Saved 14 new posts to posts.json
[SUCCESS] postsExtraction.py completed successfully.
>>> Step 2: Extracting Job Data (JobExtraction.py)...
DEBUG: Processing job 1/14
DEBUG: Processing job 2/14
DEBUG: Processing job 3/14
[SUCCESS] JobExtraction.py completed successfully.
>>> Step 3: Uploading to Firebase (firebaseUploader.py)...
[>] Uploading 11 jobs to Firebase...
[SUCCESS] Pipeline finished.
";

/// Fields that do not depend on timing or run identity.
fn comparable(state: &PipelineRunState) -> (RunPhase, Counters, Vec<String>) {
    (
        state.phase,
        state.counters,
        state.log.iter().map(|l| l.as_str().to_string()).collect(),
    )
}

async fn run_to_end(transport: ScriptedTransport) -> PipelineRunState {
    RunController::new(transport)
        .start_run(RunRequest::new("123", 5))
        .unwrap()
        .wait()
        .await
}

#[tokio::test]
async fn test_http_run_happy_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/run-pipeline"))
        .and(body_json(json!({
            "groupID": "123",
            "maxScrolls": 5,
            "mode": "auto",
            "intervalMinutes": 720
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(BACKEND_OUTPUT))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiConfig {
        base_url: server.uri(),
        ..ApiConfig::default()
    };
    let controller = RunController::new(HttpPipelineTransport::new(&api).unwrap());
    let request = RunRequest::new("123", 5)
        .with_mode(RunMode::Auto)
        .with_interval(ScheduleInterval::TwelveHours);

    let state = controller.start_run(request).unwrap().wait().await;

    assert_eq!(state.phase, RunPhase::Done);
    assert_eq!(
        state.counters,
        Counters {
            posts_found: 14,
            jobs_extracted: 3,
            jobs_uploaded: 11,
        }
    );
    assert!(state.progress.is_complete());
    assert_eq!(state.log.len(), BACKEND_OUTPUT.lines().count());
    assert_eq!(state.log[0].as_str(), "--- Starting Pipeline for group 123 ---");
}

#[tokio::test]
async fn test_http_error_status_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/run-pipeline"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let api = ApiConfig {
        base_url: server.uri(),
        ..ApiConfig::default()
    };
    let controller = RunController::new(HttpPipelineTransport::new(&api).unwrap());
    let state = controller
        .start_run(RunRequest::new("123", 5))
        .unwrap()
        .wait()
        .await;

    assert_eq!(state.phase, RunPhase::Failed);
    assert_eq!(
        state.log.last().unwrap().as_str(),
        "[ERROR] Failed to run pipeline: HTTP error! status: 503"
    );
    assert!(!controller.is_running());
}

#[tokio::test]
async fn test_rechunked_output_gives_identical_state() {
    let reference = run_to_end(ScriptedTransport::chunks(&[BACKEND_OUTPUT])).await;

    let len = BACKEND_OUTPUT.len();
    let cut_sets: Vec<Vec<usize>> = vec![
        vec![1],
        vec![len / 3, 2 * len / 3],
        (1..len).step_by(7).collect(),
        (1..len).collect(),
    ];
    for cuts in cut_sets {
        let chunks = split_at_offsets(BACKEND_OUTPUT, &cuts);
        let state = run_to_end(ScriptedTransport::chunks(&chunks)).await;
        assert_eq!(comparable(&state), comparable(&reference), "cuts: {:?}", cuts);
    }
}

#[tokio::test]
async fn test_mid_stream_failure_keeps_partial_line() {
    let transport = ScriptedTransport::failing_after(
        &[">>> Step 1: Scraping Posts\n[+] Saved 6 new posts\nStep 2: Extra"],
        TransportError::Stream("connection reset by peer".to_string()),
    );
    let state = run_to_end(transport).await;

    assert_eq!(state.phase, RunPhase::Failed);
    assert_eq!(state.counters.posts_found, 6);
    assert!(state.progress.is_complete());
    let tail: Vec<_> = state.log.iter().rev().take(2).map(|l| l.as_str()).collect();
    assert_eq!(
        tail,
        vec![
            "[ERROR] Failed to run pipeline: Stream read failed: connection reset by peer",
            "Step 2: Extra",
        ]
    );
}

#[tokio::test]
async fn test_observer_sees_monotonic_progress() {
    let chunks: Vec<String> = BACKEND_OUTPUT.lines().map(|l| format!("{}\n", l)).collect();
    let controller = RunController::new(ScriptedTransport::chunks(&chunks));
    let mut updates = controller.subscribe();

    let handle = controller.start_run(RunRequest::new("123", 5)).unwrap();
    let mut seen: Vec<PipelineRunState> = Vec::new();
    loop {
        let state = updates.borrow_and_update().clone();
        let terminal = state.phase.is_terminal();
        seen.push(state);
        if terminal || updates.changed().await.is_err() {
            break;
        }
    }
    handle.wait().await;

    for pair in seen.windows(2) {
        let (before, after) = (&pair[0], &pair[1]);
        if before.run_id != after.run_id {
            continue;
        }
        assert!(after.progress.scrape >= before.progress.scrape);
        assert!(after.progress.structure >= before.progress.structure);
        assert!(after.progress.upload >= before.progress.upload);
        assert!(after.counters.posts_found >= before.counters.posts_found);
        assert!(after.counters.jobs_extracted >= before.counters.jobs_extracted);
        assert!(after.log.len() >= before.log.len());
    }
    assert_eq!(seen.last().unwrap().phase, RunPhase::Done);
}

#[tokio::test]
async fn test_rejected_requests() {
    let transport = ScriptedTransport::chunks(&[BACKEND_OUTPUT]);
    let controller = RunController::new(transport);

    assert!(matches!(
        controller.start_run(RunRequest::new("123", 0)),
        Err(RunError::InvalidRequest(_))
    ));

    let handle = controller.start_run(RunRequest::new("123", 5)).unwrap();
    assert!(matches!(
        controller.start_run(RunRequest::new("456", 5)),
        Err(RunError::AlreadyRunning)
    ));
    assert_eq!(handle.wait().await.phase, RunPhase::Done);
}
