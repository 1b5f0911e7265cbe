//! Admission errors
//!
//! Only invalid arguments end up here. Running out of tokens is reported
//! through [`AdmissionDecision`](super::AdmissionDecision).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdmissionError {
    #[error("Invalid cost {cost}: cost must be a finite number greater than 0")]
    InvalidCost { cost: f64 },
}

impl AdmissionError {
    /// Machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            AdmissionError::InvalidCost { .. } => "INVALID_COST",
        }
    }
}
