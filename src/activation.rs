//! Activation functions attached to fields, nodes, and synaptic connections

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output nonlinearity of a dynamic step or a synaptic connection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    /// Logistic sigmoid with steepness `beta`
    Sigmoid { beta: f64 },
    /// Pass-through
    Identity,
}

impl ActivationFunction {
    pub fn sigmoid(beta: f64) -> Self {
        Self::Sigmoid { beta }
    }

    /// Broad sigmoid used for synaptic connections out of non-dynamic steps.
    pub fn broad_sigmoid() -> Self {
        Self::Sigmoid { beta: 1.0 }
    }

    /// Evaluate at a single point.
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Self::Sigmoid { beta } => 1.0 / (1.0 + (-beta * x).exp()),
            Self::Identity => x,
        }
    }
}

impl Default for ActivationFunction {
    fn default() -> Self {
        Self::Sigmoid { beta: 100.0 }
    }
}

impl fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sigmoid { beta } => write!(f, "sigmoid({})", beta),
            Self::Identity => write!(f, "identity"),
        }
    }
}
