//! End-to-end runs through the scheduler: all three consumption modes,
//! control-request resolution, and the event trail a run leaves behind.

use agentloom_core::control::{ControlRequest, ControlResponse, SyncBehavior};
use agentloom_core::error::Error;
use agentloom_core::event::EventKind;
use agentloom_core::result::RunOutcome;
use agentloom_core::step::{ActionStep, ActionStepBuilder, TokenUsage};
use agentloom_events::{EventConsumer, EventEmitter};
use agentloom_runtime::{RunContext, StepExecutor, StepScheduler, SuspensionPort, YieldPoint};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_stream::StreamExt;

/// A release pipeline in miniature: plan, ask for sign-off, ship.
struct ReleaseExecutor {
    signoff_behavior: Option<SyncBehavior>,
}

#[async_trait]
impl StepExecutor for ReleaseExecutor {
    async fn execute_step(
        &self,
        ctx: &mut RunContext,
        port: &SuspensionPort,
    ) -> Result<ActionStep, Error> {
        let builder = ActionStepBuilder::new(ctx.step_number, ctx.trace_id)
            .token_usage(TokenUsage::new(100, 20));

        match ctx.step_number {
            0 => Ok(builder.model_output("plan: build, sign off, ship").finish()),
            1 => {
                // Declared default is a refusal; only the `default` policy
                // may consult it.
                let mut request = ControlRequest::confirmation("Ship release 2.4.0?")
                    .with_default(serde_json::Value::Bool(false))
                    .with_context(serde_json::json!({ "version": "2.4.0" }));
                if let Some(behavior) = self.signoff_behavior {
                    request = request.with_sync_behavior(behavior);
                }
                let signed_off = port.request_confirmation(request).await?;
                Ok(builder
                    .model_output("awaiting sign-off")
                    .observation(match signed_off {
                        Some(true) => "sign-off granted",
                        Some(false) => "sign-off refused",
                        None => "sign-off unavailable",
                    })
                    .finish())
            }
            _ => Ok(builder
                .model_output("shipping")
                .action_output(serde_json::json!({ "shipped": "2.4.0" }))
                .final_answer(true)
                .finish()),
        }
    }
}

fn scheduler(
    signoff_behavior: Option<SyncBehavior>,
    emitter: Arc<EventEmitter>,
) -> StepScheduler<ReleaseExecutor> {
    StepScheduler::new(ReleaseExecutor { signoff_behavior }, emitter)
}

#[tokio::test]
async fn sync_run_with_skip_policy_observes_missing_signoff() {
    let result = scheduler(Some(SyncBehavior::Skip), Arc::new(EventEmitter::default()))
        .run("release 2.4.0")
        .await
        .unwrap();

    assert_eq!(result.state, RunOutcome::Success);
    assert_eq!(result.steps.len(), 3);
    assert_eq!(
        result.steps[1].observations,
        vec!["sign-off unavailable".to_string()]
    );
    assert_eq!(result.output, Some(serde_json::json!({ "shipped": "2.4.0" })));
    assert_eq!(result.token_usage.total(), 360);
}

#[tokio::test]
async fn sync_run_with_approve_policy_ships() {
    let result = scheduler(
        Some(SyncBehavior::Approve),
        Arc::new(EventEmitter::default()),
    )
    .run("release 2.4.0")
    .await
    .unwrap();

    assert_eq!(result.state, RunOutcome::Success);
    assert_eq!(
        result.steps[1].observations,
        vec!["sign-off granted".to_string()]
    );
}

#[tokio::test]
async fn interactive_run_walks_the_full_protocol() {
    let mut handle =
        scheduler(None, Arc::new(EventEmitter::default())).run_interactive("release 2.4.0");

    let plan = handle.resume().await.unwrap();
    assert!(matches!(plan, YieldPoint::Step(ref s) if s.step_number == 0));

    let request = match handle.resume().await.unwrap() {
        YieldPoint::Control(request) => request,
        other => panic!("expected control yield, got {other:?}"),
    };
    assert_eq!(request.prompt, "Ship release 2.4.0?");
    assert_eq!(handle.pending_request(), Some(request.id.as_str()));

    // A second argument-less resume is rejected while suspended.
    assert!(handle.resume().await.is_err());

    let signoff = handle
        .resume_with(ControlResponse::deny(&request.id))
        .await
        .unwrap();
    assert!(
        matches!(signoff, YieldPoint::Step(ref s) if s.observations == ["sign-off refused"])
    );

    let ship = handle.resume().await.unwrap();
    assert!(matches!(ship, YieldPoint::Step(ref s) if s.is_final_answer));

    match handle.resume().await.unwrap() {
        YieldPoint::Done(result) => {
            assert_eq!(result.state, RunOutcome::Success);
            assert_eq!(result.steps.len(), 3);
        }
        other => panic!("expected terminal yield, got {other:?}"),
    }
}

#[tokio::test]
async fn streaming_run_delivers_each_step_as_it_completes() {
    let stream = scheduler(None, Arc::new(EventEmitter::default())).run_stream("release 2.4.0");
    let steps: Vec<ActionStep> = stream.collect().await;

    let numbers: Vec<usize> = steps.iter().map(|s| s.step_number).collect();
    assert_eq!(numbers, vec![0, 1, 2]);
    // Streaming auto-approves the sign-off.
    assert_eq!(steps[1].observations, vec!["sign-off granted".to_string()]);
    assert!(steps[2].is_final_answer);
}

#[tokio::test]
async fn run_leaves_an_ordered_event_trail() {
    let emitter = Arc::new(EventEmitter::default());
    let consumer = Arc::new(EventConsumer::new());
    let seen: Arc<Mutex<Vec<EventKind>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    consumer.on_any(move |event| {
        sink.lock().unwrap().push(event.kind());
        serde_json::Value::Null
    });
    emitter.connect(consumer);

    let result = scheduler(Some(SyncBehavior::Approve), emitter.clone())
        .run("release 2.4.0")
        .await
        .unwrap();
    assert!(result.is_success());
    assert!(emitter.dispatch().drain(Duration::from_secs(1)));

    let kinds = seen.lock().unwrap().clone();
    // Control events are delivered in-thread; everything else flows
    // through the dispatch worker in FIFO order.
    let lifecycle: Vec<EventKind> = kinds
        .iter()
        .copied()
        .filter(|k| !matches!(k, EventKind::ControlYielded | EventKind::ControlResumed))
        .collect();
    assert_eq!(
        lifecycle,
        vec![
            EventKind::RunStarted,
            EventKind::StepStarted,
            EventKind::StepCompleted,
            EventKind::StepStarted,
            EventKind::StepCompleted,
            EventKind::StepStarted,
            EventKind::StepCompleted,
            EventKind::RunCompleted,
        ]
    );
    assert!(kinds.contains(&EventKind::ControlYielded));
    assert!(kinds.contains(&EventKind::ControlResumed));
}

#[tokio::test]
async fn failing_step_preserves_completed_history() {
    struct Flaky;

    #[async_trait]
    impl StepExecutor for Flaky {
        async fn execute_step(
            &self,
            ctx: &mut RunContext,
            _port: &SuspensionPort,
        ) -> Result<ActionStep, Error> {
            if ctx.step_number == 1 {
                return Err(Error::Model("backend returned 500".into()));
            }
            Ok(ActionStepBuilder::new(ctx.step_number, ctx.trace_id)
                .model_output("fine so far")
                .finish())
        }
    }

    let result = StepScheduler::new(Flaky, Arc::new(EventEmitter::default()))
        .run("flaky task")
        .await
        .unwrap();

    assert_eq!(result.state, RunOutcome::Error);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(
        result.output,
        Some(serde_json::json!("Model error: backend returned 500"))
    );
}
