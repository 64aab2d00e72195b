use chrono::{DateTime, Utc};

use crate::crds::{BuildTaskPhase, BuildTaskStatus, Condition, ConditionStatus};

pub const PROGRESSING: &str = "Progressing";
pub const AVAILABLE: &str = "Available";
pub const DEGRADED: &str = "Degraded";
pub const ACCEPTED: &str = "Accepted";

pub const REASON_DEADLINE_EXCEEDED: &str = "DeadlineExceeded";
pub const REASON_JOB_FAILED: &str = "JobFailed";
pub const REASON_INVALID_SPEC: &str = "InvalidSpec";
pub const REASON_VALID_SPEC: &str = "ValidSpec";

impl Condition {
    pub fn new(
        r#type: &str,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
        observed_generation: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            r#type: r#type.to_string(),
            status,
            observed_generation: Some(observed_generation),
            last_transition_time: now,
            reason: reason.to_string(),
            message: message.into(),
        }
    }
}

pub fn find_condition<'a>(conditions: &'a [Condition], r#type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == r#type)
}

/// Upserts by type. `lastTransitionTime` only moves when the status flips.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    match conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        Some(existing) => {
            if existing.status != condition.status {
                existing.status = condition.status;
                existing.last_transition_time = condition.last_transition_time;
            }
            existing.reason = condition.reason;
            existing.message = condition.message;
            existing.observed_generation = condition.observed_generation;
        }
        None => {
            conditions.push(condition);
            conditions.sort_by(|a, b| a.r#type.cmp(&b.r#type));
        }
    }
}

/// Progressing/Available/Degraded for `phase`, all sharing one reason.
pub(crate) fn set_phase_conditions(
    status: &mut BuildTaskStatus,
    phase: BuildTaskPhase,
    reason: &str,
    message: &str,
    generation: i64,
    now: DateTime<Utc>,
) {
    let flag = |on: bool| {
        if on {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    };

    let active = matches!(phase, BuildTaskPhase::Pending | BuildTaskPhase::Running);
    for (r#type, on) in [
        (PROGRESSING, active),
        (AVAILABLE, phase == BuildTaskPhase::Succeeded),
        (DEGRADED, phase == BuildTaskPhase::Failed),
    ] {
        set_condition(
            &mut status.conditions,
            Condition::new(r#type, flag(on), reason, message, generation, now),
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_transition_time_moves_only_on_status_change() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 5, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 9, 0).unwrap();
        let mut conditions = Vec::new();

        set_condition(
            &mut conditions,
            Condition::new(PROGRESSING, ConditionStatus::True, "Pending", "", 1, t0),
        );
        set_condition(
            &mut conditions,
            Condition::new(PROGRESSING, ConditionStatus::True, "Running", "", 1, t1),
        );

        let progressing = find_condition(&conditions, PROGRESSING).unwrap();
        assert_eq!(progressing.last_transition_time, t0);
        assert_eq!(progressing.reason, "Running");

        set_condition(
            &mut conditions,
            Condition::new(PROGRESSING, ConditionStatus::False, "Succeeded", "", 2, t2),
        );

        let progressing = find_condition(&conditions, PROGRESSING).unwrap();
        assert_eq!(progressing.last_transition_time, t2);
        assert_eq!(progressing.observed_generation, Some(2));
    }

    #[test]
    fn test_conditions_stay_sorted_by_type() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut status = BuildTaskStatus::default();

        set_phase_conditions(&mut status, BuildTaskPhase::Failed, "Boom", "", 1, now);
        set_condition(
            &mut status.conditions,
            Condition::new(ACCEPTED, ConditionStatus::True, REASON_VALID_SPEC, "", 1, now),
        );

        let types: Vec<&str> = status.conditions.iter().map(|c| c.r#type.as_str()).collect();
        assert_eq!(types, [ACCEPTED, AVAILABLE, DEGRADED, PROGRESSING]);
        assert_eq!(
            find_condition(&status.conditions, DEGRADED).unwrap().status,
            ConditionStatus::True
        );
    }
}
