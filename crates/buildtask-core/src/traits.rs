use chrono::{DateTime, Utc};

use crate::{error::ObservationError, models::ExecutionObservation};

/// Read side of the job runtime.
pub trait ExecutionObserver {
    /// `Ok(None)` when no execution unit named `job_name` exists.
    fn observe(
        &self,
        namespace: &str,
        job_name: &str,
    ) -> Result<Option<ExecutionObservation>, ObservationError>;
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
