use buildtask_core::{
    crds::{
        BuildContext, BuildContextType, BuildTaskPhase, BuildTaskSpec, BuildTaskStatus,
        GitContext, ManualTrigger, RetentionSpec, TriggerSpec,
    },
    error::ObservationError,
    formatters::format_job_name,
    lifecycle::{DesiredAction, Lifecycle},
    models::{ExecutionObservation, ExecutionState, TaskRef},
    validation::validate_spec,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

const TASK: &str = "web";
const NONCES: [&str; 3] = ["", "abc", "old"];

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

fn task() -> TaskRef {
    TaskRef {
        generation: 7,
        ..TaskRef::new(TASK, "team-a")
    }
}

fn spec(
    nonce: &str,
    timeout: Option<i64>,
    successful_ttl: Option<i32>,
    failed_ttl: Option<i32>,
) -> BuildTaskSpec {
    BuildTaskSpec {
        image: "registry.local/team/web:v1".to_string(),
        context: BuildContext {
            r#type: BuildContextType::Git,
            git: Some(GitContext {
                url: "https://x/y.git".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        },
        timeout_seconds: timeout,
        retention: Some(RetentionSpec {
            successful_jobs_ttl_seconds_after_finished: successful_ttl,
            failed_jobs_ttl_seconds_after_finished: failed_ttl,
        }),
        trigger: Some(TriggerSpec {
            manual: Some(ManualTrigger {
                nonce: nonce.to_string(),
            }),
        }),
        ..Default::default()
    }
}

fn arb_phase() -> impl Strategy<Value = Option<BuildTaskPhase>> {
    prop_oneof![
        Just(None),
        Just(Some(BuildTaskPhase::Pending)),
        Just(Some(BuildTaskPhase::Running)),
        Just(Some(BuildTaskPhase::Succeeded)),
        Just(Some(BuildTaskPhase::Failed)),
    ]
}

fn arb_terminal_phase() -> impl Strategy<Value = BuildTaskPhase> {
    prop_oneof![
        Just(BuildTaskPhase::Succeeded),
        Just(BuildTaskPhase::Failed)
    ]
}

fn arb_state() -> impl Strategy<Value = ExecutionState> {
    prop_oneof![
        Just(ExecutionState::NotStarted),
        Just(ExecutionState::Running),
        Just(ExecutionState::Succeeded),
        Just(ExecutionState::Failed),
    ]
}

/// Statuses the state machine itself could have written: the tracked job is
/// named after the last consumed nonce and its trigger time.
fn arb_status() -> impl Strategy<Value = BuildTaskStatus> {
    (
        arb_phase(),
        prop::sample::select(NONCES.to_vec()),
        any::<bool>(),
        0i64..40,
        prop::option::of(0i64..40),
        any::<bool>(),
    )
        .prop_map(|(phase, nonce, has_job, start, end, has_pod)| BuildTaskStatus {
            phase,
            job_name: if has_job {
                format_job_name(TASK, nonce, base() + Duration::minutes(start))
            } else {
                String::new()
            },
            pod_name: if has_pod {
                "web-pod-1".to_string()
            } else {
                String::new()
            },
            start_time: Some(base() + Duration::minutes(start)),
            end_time: end.map(|m| base() + Duration::minutes(m)),
            last_trigger_nonce: nonce.to_string(),
            ..Default::default()
        })
}

fn observation(
    kind: u8,
    state: ExecutionState,
    status: &BuildTaskStatus,
) -> Result<Option<ExecutionObservation>, ObservationError> {
    let observed = |job_name: &str| {
        let observation = ExecutionObservation::new(job_name, state).with_pod("web-pod-2");
        match state {
            ExecutionState::Succeeded => observation.with_digest("sha256:feedface"),
            ExecutionState::Failed => observation.with_failure_reason("BackoffLimitExceeded"),
            _ => observation,
        }
    };

    match kind {
        0 => Err(ObservationError::Unavailable("connection refused".to_string())),
        1 => Ok(None),
        2 => Ok(Some(observed(&status.job_name))),
        _ => Ok(Some(observed("someone-else"))),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_evaluate_is_idempotent(
        prev in arb_status(),
        nonce in prop::sample::select(NONCES.to_vec()),
        timeout in prop::option::of(1i64..3600),
        successful_ttl in prop::option::of(0i32..7200),
        failed_ttl in prop::option::of(0i32..7200),
        kind in 0u8..4,
        state in arb_state(),
        now in 0i64..90,
    ) {
        let spec = spec(nonce, timeout, successful_ttl, failed_ttl);
        let validated = validate_spec(&spec).unwrap();
        let lifecycle = Lifecycle::default();
        let now = base() + Duration::minutes(now);

        let first = lifecycle.evaluate(&task(), &validated, &prev, observation(kind, state, &prev), now);
        let second = lifecycle.evaluate(
            &task(),
            &validated,
            &first.status,
            observation(kind, state, &prev),
            now,
        );

        prop_assert_eq!(second.status, first.status);
    }

    #[test]
    fn prop_terminal_phases_are_stable(
        phase in arb_terminal_phase(),
        nonce in prop::sample::select(NONCES.to_vec()),
        kind in 0u8..4,
        state in arb_state(),
        ended in 0i64..40,
        now in 40i64..90,
    ) {
        let spec = spec(nonce, Some(600), Some(3600), None);
        let validated = validate_spec(&spec).unwrap();
        let prev = BuildTaskStatus {
            phase: Some(phase),
            job_name: format_job_name(TASK, nonce, base()),
            last_trigger_nonce: nonce.to_string(),
            start_time: Some(base()),
            end_time: Some(base() + Duration::minutes(ended)),
            observed_generation: Some(7),
            ..Default::default()
        };

        let evaluation = Lifecycle::default().evaluate(
            &task(),
            &validated,
            &prev,
            observation(kind, state, &prev),
            base() + Duration::minutes(now),
        );

        prop_assert_eq!(&evaluation.status, &prev);
        prop_assert!(!matches!(evaluation.action, DesiredAction::CreateExecutionUnit(_)));
    }

    #[test]
    fn prop_consumed_nonce_never_creates_while_job_exists(
        prev in arb_status(),
        state in arb_state(),
        now in 0i64..90,
    ) {
        prop_assume!(!prev.job_name.is_empty());
        let spec = spec(&prev.last_trigger_nonce, Some(600), Some(60), Some(60));
        let validated = validate_spec(&spec).unwrap();

        let evaluation = Lifecycle::default().evaluate(
            &task(),
            &validated,
            &prev,
            observation(2, state, &prev),
            base() + Duration::minutes(now),
        );

        prop_assert!(!matches!(evaluation.action, DesiredAction::CreateExecutionUnit(_)));
        prop_assert_eq!(&evaluation.status.last_trigger_nonce, &prev.last_trigger_nonce);
    }

    #[test]
    fn prop_created_job_is_the_tracked_job(
        prev in arb_status(),
        nonce in prop::sample::select(NONCES.to_vec()),
        kind in 0u8..4,
        state in arb_state(),
        now in 0i64..90,
    ) {
        let spec = spec(nonce, Some(600), None, None);
        let validated = validate_spec(&spec).unwrap();

        let evaluation = Lifecycle::default().evaluate(
            &task(),
            &validated,
            &prev,
            observation(kind, state, &prev),
            base() + Duration::minutes(now),
        );

        if let DesiredAction::CreateExecutionUnit(job) = &evaluation.action {
            prop_assert_eq!(job.metadata.name.as_deref(), Some(evaluation.status.job_name.as_str()));
            prop_assert_eq!(&evaluation.status.last_trigger_nonce, nonce);
            prop_assert_eq!(evaluation.status.phase, Some(BuildTaskPhase::Pending));
        }
    }
}
