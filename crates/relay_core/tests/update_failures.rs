mod common;

use common::{init_logging, task, Driver};
use relay_core::{
    Effect, Failure, FailureReason, Message, Msg, Orchestrator, OrchestratorState, Step,
    StepOutcome, TaskEvent, TaskReport, Timings,
};

fn finished_report(driver: &Driver) -> TaskReport {
    match driver.events.last() {
        Some(TaskEvent::Finished(report)) => report.clone(),
        other => panic!("expected finished report, got {other:?}"),
    }
}

#[test]
fn missing_media_is_reported_and_task_continues() {
    init_logging();
    let mut driver = Driver::new(Orchestrator::default());
    driver.run(
        Msg::StartTask(task(
            &["Alice", "Bob"],
            vec![
                Message::Text("hi".into()),
                Message::Image("/gone.jpg".into()),
                Message::Video("/v.mp4".into()),
            ],
        )),
        |step| match step {
            Step::StartShare { path, .. } if path == "/gone.jpg" => StepOutcome::FileMissing,
            _ => StepOutcome::Done,
        },
    );

    let report = finished_report(&driver);
    assert_eq!(report.delivered.len(), 4);
    assert_eq!(
        report.failed,
        vec![
            Failure {
                recipient: "Alice".into(),
                index: 1,
                reason: FailureReason::ResourceMissing,
            },
            Failure {
                recipient: "Bob".into(),
                index: 1,
                reason: FailureReason::ResourceMissing,
            },
        ]
    );
    assert_eq!(report.delivered.len() + report.failed.len(), 2 * 3);
    assert!(!report.is_complete_success());
}

#[test]
fn exhausted_search_abandons_only_that_recipient() {
    init_logging();
    let timings = Timings::default();
    let mut driver = Driver::new(Orchestrator::new(timings.clone()));
    driver.run(
        Msg::StartTask(task(
            &["Ghost", "Bob"],
            vec![Message::Text("a".into()), Message::Image("/i.png".into())],
        )),
        |step| match step {
            Step::SelectSearchResult { name } if name == "Ghost" => StepOutcome::Absent,
            _ => StepOutcome::Done,
        },
    );

    let ghost_attempts = driver
        .steps
        .iter()
        .filter(|s| matches!(s, Step::SelectSearchResult { name } if name == "Ghost"))
        .count();
    assert_eq!(ghost_attempts, timings.max_step_attempts as usize);

    let report = finished_report(&driver);
    assert_eq!(report.failed.len(), 2);
    assert!(report.failed.iter().all(|f| f.recipient == "Ghost"
        && f.reason
            == FailureReason::StepExhausted {
                step: "select_search_result"
            }));
    assert_eq!(report.delivered.len(), 2);
    assert!(report.delivered.iter().all(|d| d.recipient == "Bob"));
}

#[test]
fn target_never_foreground_fails_whole_task() {
    init_logging();
    let mut driver = Driver::new(Orchestrator::default());
    driver.run(
        Msg::StartTask(task(&["Alice", "Bob"], vec![Message::Text("a".into())])),
        |_| StepOutcome::Absent,
    );

    let report = finished_report(&driver);
    assert!(report.delivered.is_empty());
    assert_eq!(report.failed.len(), 2);
    assert!(report
        .failed
        .iter()
        .all(|f| f.reason == FailureReason::TargetUnavailable));
    assert_eq!(driver.state.state(), &OrchestratorState::Completed);
}

#[test]
fn stalled_share_gives_up_after_poll_budget() {
    init_logging();
    let timings = Timings::default();
    let mut driver = Driver::new(Orchestrator::new(timings.clone()));
    driver.run(
        Msg::StartTask(task(
            &["Alice"],
            vec![Message::Image("/a.jpg".into()), Message::Image("/b.jpg".into())],
        )),
        |step| match step {
            Step::ConfirmShare => StepOutcome::Absent,
            _ => StepOutcome::Done,
        },
    );

    assert_eq!(
        driver.count_steps("confirm_share"),
        2 * timings.share_max_polls as usize
    );
    let report = finished_report(&driver);
    assert_eq!(report.failed.len(), 2);
    assert!(report
        .failed
        .iter()
        .all(|f| f.reason == FailureReason::HandOffStalled));
}

#[test]
fn stop_is_idempotent() {
    init_logging();
    let mut driver = Driver::new(Orchestrator::default());
    assert!(driver.send(Msg::StopRequested).is_empty());
    assert_eq!(driver.state.state(), &OrchestratorState::Idle);

    driver.send(Msg::StartTask(task(&["Alice"], vec![Message::Text("a".into())])));
    let ticket = driver.state.expected_ticket().expect("pending ticket");

    let first = driver.send(Msg::StopRequested);
    assert!(matches!(
        first.as_slice(),
        [Effect::Report(TaskEvent::Stopped(_))]
    ));
    assert!(driver.send(Msg::StopRequested).is_empty());
    assert_eq!(driver.state.state(), &OrchestratorState::Idle);
    assert!(!driver.state.is_active());

    // A callback scheduled before the stop must not act.
    assert!(driver.send(Msg::TimerFired { ticket }).is_empty());
}

#[test]
fn stop_after_completion_returns_to_idle() {
    init_logging();
    let mut driver = Driver::new(Orchestrator::default());
    driver.run(
        Msg::StartTask(task(&["Alice"], vec![Message::Text("a".into())])),
        |_| StepOutcome::Done,
    );
    assert_eq!(driver.state.state(), &OrchestratorState::Completed);

    assert!(driver.send(Msg::StopRequested).is_empty());
    assert_eq!(driver.state.state(), &OrchestratorState::Idle);
}

#[test]
fn surface_change_wakes_a_retry_once() {
    init_logging();
    let timings = Timings::default();
    let mut driver = Driver::new(Orchestrator::new(timings.clone()));
    driver.send(Msg::StartTask(task(&["Alice"], vec![Message::Text("a".into())])));
    let ticket = driver.state.expected_ticket().unwrap();
    driver.send(Msg::TimerFired { ticket });
    let retry = driver.send(Msg::StepFinished {
        ticket,
        outcome: StepOutcome::Absent,
    });
    assert!(matches!(
        retry.as_slice(),
        [Effect::Schedule { delay_ms, .. }] if *delay_ms == timings.retry_delay(1)
    ));

    let woken = driver.send(Msg::SurfaceChanged);
    assert!(matches!(
        woken.as_slice(),
        [Effect::Schedule { delay_ms, .. }] if *delay_ms == timings.wake_settle_ms
    ));
    assert!(driver.send(Msg::SurfaceChanged).is_empty());
}

#[test]
fn surface_change_does_not_shorten_fixed_delays() {
    init_logging();
    let mut driver = Driver::new(Orchestrator::default());
    driver.send(Msg::StartTask(task(&["Alice"], vec![Message::Text("a".into())])));
    assert!(driver.send(Msg::SurfaceChanged).is_empty());
}
