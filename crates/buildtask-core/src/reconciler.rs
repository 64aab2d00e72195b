use tracing::warn;

use crate::{
    crds::{BuildTask, BuildTaskSpec, BuildTaskStatus, Condition, ConditionStatus},
    lifecycle::{
        DesiredAction, Evaluation, Lifecycle,
        conditions::{ACCEPTED, REASON_INVALID_SPEC, REASON_VALID_SPEC, set_condition},
    },
    models::TaskRef,
    traits::{Clock, ExecutionObserver, SystemClock},
    validation::validate_spec,
};

/// One host-driven step: validate, observe, evaluate.
pub struct Reconciler<O, C = SystemClock> {
    pub lifecycle: Lifecycle,
    pub observer: O,
    pub clock: C,
}

impl<O: ExecutionObserver> Reconciler<O> {
    pub fn new(lifecycle: Lifecycle, observer: O) -> Self {
        Self {
            lifecycle,
            observer,
            clock: SystemClock,
        }
    }
}

impl<O: ExecutionObserver, C: Clock> Reconciler<O, C> {
    pub fn with_clock(lifecycle: Lifecycle, observer: O, clock: C) -> Self {
        Self {
            lifecycle,
            observer,
            clock,
        }
    }

    pub fn reconcile_resource(&self, task: &BuildTask) -> Evaluation {
        let status = task.status.clone().unwrap_or_default();
        self.reconcile(&TaskRef::from_resource(task), &task.spec, &status)
    }

    #[tracing::instrument(
        name = "reconciler.reconcile",
        skip_all,
        fields(task = %task.name, namespace = %task.namespace)
    )]
    pub fn reconcile(
        &self,
        task: &TaskRef,
        spec: &BuildTaskSpec,
        status: &BuildTaskStatus,
    ) -> Evaluation {
        let now = self.clock.now();

        let validated = match validate_spec(spec) {
            Ok(validated) => validated,
            Err(e) => {
                warn!(violations = e.violations.len(), "{}", e);
                let mut status = status.clone();
                status.observed_generation = Some(task.generation);
                set_condition(
                    &mut status.conditions,
                    Condition::new(
                        ACCEPTED,
                        ConditionStatus::False,
                        REASON_INVALID_SPEC,
                        e.to_string(),
                        task.generation,
                        now,
                    ),
                );
                return Evaluation {
                    status,
                    action: DesiredAction::None,
                    requeue_after: None,
                };
            }
        };

        let observation = if status.job_name.is_empty() {
            Ok(None)
        } else {
            self.observer.observe(&task.namespace, &status.job_name)
        };
        let observed = observation.is_ok();

        let mut evaluation = self
            .lifecycle
            .evaluate(task, &validated, status, observation, now);

        if observed {
            set_condition(
                &mut evaluation.status.conditions,
                Condition::new(
                    ACCEPTED,
                    ConditionStatus::True,
                    REASON_VALID_SPEC,
                    "Spec accepted",
                    task.generation,
                    now,
                ),
            );
        }

        evaluation
    }
}
