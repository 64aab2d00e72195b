use std::fmt;

use crate::{
    crds::{BuildTaskPhase, ConditionStatus},
    lifecycle::DesiredAction,
    models::ExecutionState,
    validation::{Rule, Violation},
};

impl fmt::Display for BuildTaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BuildTaskPhase::Pending => "Pending",
            BuildTaskPhase::Running => "Running",
            BuildTaskPhase::Succeeded => "Succeeded",
            BuildTaskPhase::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ExecutionState::NotStarted => "not-started",
            ExecutionState::Running => "running",
            ExecutionState::Succeeded => "succeeded",
            ExecutionState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Rule::UnionMismatch => "UnionMismatch",
            Rule::Required => "Required",
            Rule::Minimum => "Minimum",
            Rule::RootlessRequired => "RootlessRequired",
            Rule::Constraint => "Constraint",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {} ({})", self.field, self.message, self.rule)
    }
}

impl fmt::Display for DesiredAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DesiredAction::None => write!(f, "None"),
            DesiredAction::CreateExecutionUnit(job) => write!(
                f,
                "CreateExecutionUnit({})",
                job.metadata.name.as_deref().unwrap_or_default()
            ),
            DesiredAction::DeleteExecutionUnit(job_name) => {
                write!(f, "DeleteExecutionUnit({})", job_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display() {
        let violation = Violation::new("context.git.url", "must not be empty", Rule::Required);

        assert_eq!(
            violation.to_string(),
            "context.git.url: must not be empty (Required)"
        );
    }
}
