//! End-to-end runs against a scripted compute service.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::core::{Language, PipelineStage, ResourceKind, RunPhase, SourceArtifact, TaskId};
use crate::errors::UxflowError;
use crate::events::{self, CollectingEventSink};
use crate::pipeline::Orchestrator;
use crate::poll::PollConfig;
use crate::testing::{Method, Reply, ScriptedComputeApi};

const STDOUT_URL: &str = "https://outputs.example.com/tsk_1/stdout";
const STDERR_URL: &str = "https://outputs.example.com/tsk_1/stderr";

fn config() -> PipelineConfig {
    PipelineConfig::new("test-key").with_poll(
        PollConfig::new()
            .with_interval(Duration::from_millis(1))
            .with_max_iterations(Some(50)),
    )
}

fn artifact() -> SourceArtifact {
    SourceArtifact::new("#include <stdio.h>\nint main(void) { return 0; }", Language::C)
        .with_arguments("100 1.1 1.3")
}

/// A service where build and task both complete and stdout is `stdout`.
fn happy_service(stdout: &str) -> ScriptedComputeApi {
    service(stdout, Reply::text("build ok"), Reply::text(""))
}

fn service(stdout: &str, build_log: Reply, stderr: Reply) -> ScriptedComputeApi {
    ScriptedComputeApi::new()
        .on_submit("/sourcecode/builds", Reply::json(json!({"BuildID": "bld_1", "Status": "Accepted"})))
        .on_status_sequence("/builds/bld_1", &["Building", "Completed"])
        .on_fetch("/builds/bld_1/outputs", Reply::json(json!({"Build": "https://logs.example.com/bld_1"})))
        .on_raw("https://logs.example.com/bld_1", build_log)
        .on_submit("/builds/bld_1/tasks", Reply::json(json!({"TaskID": "tsk_1", "Status": "Accepted"})))
        .on_status_sequence("/tasks/tsk_1", &["In Progress", "Completed"])
        .on_fetch(
            "/tasks/tsk_1/outputs?sanitized=false",
            Reply::json(json!({"Stdout": STDOUT_URL, "Stderr": STDERR_URL})),
        )
        .on_raw(STDOUT_URL, Reply::text(stdout))
        .on_raw(STDERR_URL, stderr)
        .on_submit("/plot", Reply::json(json!({"presignedURL": "https://plots.example.com/p.png"})))
}

fn orchestrator(api: &Arc<ScriptedComputeApi>, sink: &Arc<CollectingEventSink>) -> Orchestrator {
    Orchestrator::new(api.clone(), config()).with_sink(sink.clone())
}

#[tokio::test]
async fn test_full_run_produces_plot_url() {
    let api = Arc::new(happy_service("junk Ux1234abcd rest"));
    let sink = Arc::new(CollectingEventSink::new());

    let plot = orchestrator(&api, &sink).submit_and_run(&artifact()).await.unwrap();

    assert_eq!(plot.presigned_url, "https://plots.example.com/p.png");
    let plot_calls = api.calls_to("/plot");
    assert_eq!(plot_calls.len(), 1);
    assert_eq!(plot_calls[0].body, Some(json!({"payload": "Ux1234abcd rest"})));

    let lifecycle: Vec<String> = sink
        .event_types()
        .into_iter()
        .filter(|t| t.starts_with("pipeline.") || t.starts_with("stage."))
        .collect();
    assert_eq!(
        lifecycle,
        vec![
            "pipeline.started",
            "stage.started",
            "stage.completed",
            "stage.started",
            "stage.completed",
            "stage.started",
            "stage.completed",
            "stage.started",
            "stage.completed",
            "pipeline.completed",
        ]
    );
}

#[tokio::test]
async fn test_calls_follow_stage_order() {
    let api = Arc::new(happy_service("Ux01"));
    let sink = Arc::new(CollectingEventSink::new());

    orchestrator(&api, &sink).submit_and_run(&artifact()).await.unwrap();

    let posts: Vec<String> = api
        .calls()
        .into_iter()
        .filter(|c| c.method == Method::Post)
        .map(|c| c.endpoint)
        .collect();
    assert_eq!(posts, vec!["/sourcecode/builds", "/builds/bld_1/tasks", "/plot"]);
}

#[tokio::test]
async fn test_plain_number_output_fails_extraction() {
    let api = Arc::new(happy_service("113.000000\n"));
    let sink = Arc::new(CollectingEventSink::new());

    let failure = orchestrator(&api, &sink).submit_and_run(&artifact()).await.unwrap_err();

    assert_eq!(failure.stage, PipelineStage::Extract);
    assert!(matches!(failure.source, UxflowError::MarkerNotFound { marker: "Ux" }));
    assert_eq!(api.call_count("/plot"), 0);
    assert_eq!(sink.events_of_type(events::PIPELINE_FAILED).len(), 1);
}

#[tokio::test]
async fn test_cancelled_build_stops_the_pipeline() {
    let api = Arc::new(
        ScriptedComputeApi::new()
            .on_submit("/sourcecode/builds", Reply::json(json!({"BuildID": "bld_9", "Status": "Accepted"})))
            .on_status_sequence("/builds/bld_9", &["Building", "Cancelled"]),
    );
    let sink = Arc::new(CollectingEventSink::new());

    let failure = orchestrator(&api, &sink).submit_and_run(&artifact()).await.unwrap_err();

    assert_eq!(failure.stage, PipelineStage::Build);
    assert!(matches!(
        failure.source,
        UxflowError::BuildNotCompleted(crate::core::JobStatus::Cancelled)
    ));
    assert_eq!(api.call_count("/builds/bld_9/tasks"), 0);
    assert_eq!(api.call_count("/plot"), 0);
}

#[tokio::test]
async fn test_missing_task_id_fails_before_polling() {
    let api = Arc::new(
        ScriptedComputeApi::new()
            .on_submit("/sourcecode/builds", Reply::json(json!({"BuildID": "bld_1", "Status": "Completed"})))
            .on_submit("/builds/bld_1/tasks", Reply::json(json!({"Status": "Accepted"}))),
    );
    let sink = Arc::new(CollectingEventSink::new());

    let failure = orchestrator(&api, &sink).submit_and_run(&artifact()).await.unwrap_err();

    assert_eq!(failure.stage, PipelineStage::Task);
    assert!(matches!(
        failure.source,
        UxflowError::SubmissionRejected {
            kind: ResourceKind::Task,
            ..
        }
    ));
    assert!(api.calls().iter().all(|c| !c.endpoint.starts_with("/tasks/")));
}

#[tokio::test]
async fn test_diagnostic_faults_do_not_fail_the_run() {
    let api = Arc::new(service(
        "Ux77",
        Reply::status(403, "expired"),
        Reply::fault("connection reset"),
    ));
    let sink = Arc::new(CollectingEventSink::new());
    let run = orchestrator(&api, &sink).prepare();
    let progress = run.subscribe();

    let plot = run.execute(&artifact()).await.unwrap();

    assert_eq!(plot.presigned_url, "https://plots.example.com/p.png");
    let last = progress.borrow().clone();
    assert_eq!(last.phase, RunPhase::Completed);
    assert_eq!(last.diagnostics.len(), 2);
    assert_eq!(sink.events_of_type(events::DIAGNOSTIC).len(), 2);
}

#[tokio::test]
async fn test_progress_tracks_identifiers_and_plot() {
    let api = Arc::new(happy_service("Ux42"));
    let sink = Arc::new(CollectingEventSink::new());
    let run = orchestrator(&api, &sink).prepare();
    let progress = run.subscribe();
    let run_id = run.run_id();

    run.execute(&artifact()).await.unwrap();

    let last = progress.borrow().clone();
    assert_eq!(last.run_id, run_id);
    assert_eq!(last.stage, Some(PipelineStage::Plot));
    assert_eq!(last.build_id.as_deref(), Some("bld_1"));
    assert_eq!(last.task_id.as_deref(), Some("tsk_1"));
    assert_eq!(last.plot_url.as_deref(), Some("https://plots.example.com/p.png"));
    assert!(!sink.events_of_type(events::JOB_STATUS).is_empty());
}

#[tokio::test]
async fn test_poll_timeout_is_attributed_to_task() {
    let api = Arc::new(
        ScriptedComputeApi::new()
            .on_submit("/sourcecode/builds", Reply::json(json!({"BuildID": "bld_1", "Status": "Completed"})))
            .on_submit("/builds/bld_1/tasks", Reply::json(json!({"TaskID": "tsk_1", "Status": "Accepted"})))
            .on_status_sequence("/tasks/tsk_1", &["In Progress"]),
    );
    let config = config().with_poll(
        PollConfig::new()
            .with_interval(Duration::from_millis(1))
            .with_max_iterations(Some(4)),
    );
    let orchestrator = Orchestrator::new(api.clone(), config);

    let failure = orchestrator.submit_and_run(&artifact()).await.unwrap_err();

    assert_eq!(failure.stage, PipelineStage::Task);
    assert_eq!(failure.source.code(), "POLL_TIMEOUT");
    assert_eq!(api.call_count("/tasks/tsk_1"), 4);
}

#[tokio::test]
async fn test_cancellation_during_polling() {
    let api = Arc::new(
        ScriptedComputeApi::new()
            .on_submit("/sourcecode/builds", Reply::json(json!({"BuildID": "bld_1", "Status": "Accepted"})))
            .on_status_sequence("/builds/bld_1", &["Building"]),
    );
    let config = PipelineConfig::new("test-key").with_poll(
        PollConfig::new()
            .with_interval(Duration::from_millis(5))
            .with_max_iterations(None),
    );
    let sink = Arc::new(CollectingEventSink::new());
    let run = Orchestrator::new(api.clone(), config).with_sink(sink.clone()).prepare();
    let token = run.cancel_token();
    let progress = run.subscribe();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel("user pressed stop");
    });

    let failure = tokio::time::timeout(Duration::from_secs(5), run.execute(&artifact()))
        .await
        .expect("cancelled run should stop promptly")
        .unwrap_err();
    canceller.await.unwrap();

    assert_eq!(failure.stage, PipelineStage::Build);
    assert!(matches!(failure.source, UxflowError::Cancelled(ref r) if r == "user pressed stop"));
    assert_eq!(progress.borrow().phase, RunPhase::Cancelled);
    assert_eq!(api.call_count("/builds/bld_1/tasks"), 0);
}

#[tokio::test]
async fn test_cancelled_before_start_sends_nothing() {
    let api = Arc::new(happy_service("Ux1"));
    let run = Orchestrator::new(api.clone(), config()).prepare();
    run.cancel_token().cancel("not needed");

    let failure = run.execute(&artifact()).await.unwrap_err();

    assert!(failure.is_cancelled());
    assert_eq!(failure.stage, PipelineStage::Build);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_run_timeout() {
    let api = Arc::new(
        ScriptedComputeApi::new()
            .on_submit("/sourcecode/builds", Reply::json(json!({"BuildID": "bld_1", "Status": "Accepted"})))
            .on_status_sequence("/builds/bld_1", &["Building"]),
    );
    let config = PipelineConfig::new("test-key")
        .with_run_timeout(0.05)
        .with_poll(
            PollConfig::new()
                .with_interval(Duration::from_millis(5))
                .with_max_iterations(None),
        );

    let failure = Orchestrator::new(api, config)
        .submit_and_run(&artifact())
        .await
        .unwrap_err();

    assert_eq!(failure.stage, PipelineStage::Build);
    assert_eq!(failure.source.code(), "RUN_TIMEOUT");
}

#[tokio::test]
async fn test_concurrent_runs_are_isolated() {
    let api = Arc::new(happy_service("Ux5"));
    let sink = Arc::new(CollectingEventSink::new());
    let orchestrator = orchestrator(&api, &sink);

    let first = orchestrator.prepare();
    let second = orchestrator.prepare();
    assert_ne!(first.run_id(), second.run_id());
    second.cancel_token().cancel("only the second");

    let (artifact_a, artifact_b) = (artifact(), artifact());
    let (a, b) = tokio::join!(first.execute(&artifact_a), second.execute(&artifact_b));

    assert!(a.is_ok());
    assert!(b.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn test_missing_stdout_never_reaches_plot() {
    let api = Arc::new(
        ScriptedComputeApi::new()
            .on_submit("/sourcecode/builds", Reply::json(json!({"BuildID": "bld_1", "Status": "Completed"})))
            .on_submit("/builds/bld_1/tasks", Reply::json(json!({"TaskID": "tsk_1", "Status": "Completed"})))
            .on_fetch(
                "/tasks/tsk_1/outputs?sanitized=false",
                Reply::json(json!({"Stderr": STDERR_URL})),
            )
            .on_submit("/plot", Reply::json(json!({"presignedURL": "https://plots.example.com/p.png"}))),
    );
    let sink = Arc::new(CollectingEventSink::new());

    let failure = orchestrator(&api, &sink).submit_and_run(&artifact()).await.unwrap_err();

    assert_eq!(failure.stage, PipelineStage::Task);
    assert!(matches!(failure.source, UxflowError::NoStdout));
    assert_eq!(api.call_count("/plot"), 0);
}

#[tokio::test]
async fn test_replot_existing_task() {
    let api = Arc::new(happy_service("value Ux99ff"));
    let sink = Arc::new(CollectingEventSink::new());
    let run = orchestrator(&api, &sink).prepare();
    let progress = run.subscribe();

    let plot = run.replot(&TaskId::new("tsk_1")).await.unwrap();

    assert_eq!(plot.presigned_url, "https://plots.example.com/p.png");
    assert_eq!(api.calls_to("/plot")[0].body, Some(json!({"payload": "Ux99ff"})));
    let posts: Vec<String> = api
        .calls()
        .into_iter()
        .filter(|c| c.method == Method::Post)
        .map(|c| c.endpoint)
        .collect();
    assert_eq!(posts, vec!["/plot"]);
    assert_eq!(api.call_count("/tasks/tsk_1"), 0);

    let last = progress.borrow().clone();
    assert_eq!(last.phase, RunPhase::Completed);
    assert_eq!(last.task_id.as_deref(), Some("tsk_1"));
}

#[tokio::test]
async fn test_replot_task_without_stdout() {
    let api = Arc::new(
        ScriptedComputeApi::new()
            .on_fetch("/tasks/tsk_2/outputs?sanitized=false", Reply::json(json!({"Stderr": STDERR_URL}))),
    );
    let sink = Arc::new(CollectingEventSink::new());

    let failure = orchestrator(&api, &sink)
        .replot(&TaskId::new("tsk_2"))
        .await
        .unwrap_err();

    assert_eq!(failure.stage, PipelineStage::Task);
    assert!(matches!(failure.source, UxflowError::NoStdout));
    assert_eq!(api.call_count("/plot"), 0);
    assert_eq!(sink.events_of_type(events::PIPELINE_FAILED).len(), 1);
}
