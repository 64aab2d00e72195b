use chrono::{DateTime, Duration, Utc};

use crate::crds::{BuildTaskPhase, BuildTaskSpec, BuildTaskStatus};

/// TTL for a terminal phase; `None` keeps the execution unit forever.
pub fn ttl_after_finished(spec: &BuildTaskSpec, phase: BuildTaskPhase) -> Option<i32> {
    let retention = spec.retention.as_ref()?;

    match phase {
        BuildTaskPhase::Succeeded => retention.successful_jobs_ttl_seconds_after_finished,
        BuildTaskPhase::Failed => retention.failed_jobs_ttl_seconds_after_finished,
        BuildTaskPhase::Pending | BuildTaskPhase::Running => None,
    }
}

pub fn expires_at(spec: &BuildTaskSpec, status: &BuildTaskStatus) -> Option<DateTime<Utc>> {
    let ttl = ttl_after_finished(spec, status.phase?)?;
    let end_time = status.end_time?;

    Some(end_time + Duration::seconds(i64::from(ttl.max(0))))
}

/// Whether the finished execution unit may be garbage-collected at `now`.
pub fn is_eligible_for_deletion(
    spec: &BuildTaskSpec,
    status: &BuildTaskStatus,
    now: DateTime<Utc>,
) -> bool {
    expires_at(spec, status).is_some_and(|expiry| now >= expiry)
}
