use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid income: {0} (must be a finite amount >= 0)")]
    InvalidIncome(f64),

    #[error("Invalid horizon: {0}")]
    InvalidHorizon(String),

    #[error("No scenarios configured")]
    EmptyScenarioSet,

    #[error("Scenario '{0}' not found in projection")]
    UnknownScenario(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
