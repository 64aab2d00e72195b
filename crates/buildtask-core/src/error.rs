use thiserror::Error;

use crate::validation::Violation;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid BuildTask spec: {}", format_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join("; ")
}

/// The job runtime could not be asked about the execution unit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObservationError {
    #[error("Execution runtime unavailable: {0}")]
    Unavailable(String),
}
