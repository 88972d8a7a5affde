//! Serializable view of an architecture
//!
//! A snapshot captures every step's descriptor parameters and every
//! connection by step name, so two versions of an architecture can be
//! stored, compared, or inspected outside the process.

use crate::connection::{Connection, ConnectionKind};
use crate::error::Result;
use crate::steps::{ParamValue, Step};
use crate::structure::NeuralStructure;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSnapshot {
    pub name: &'static str,
    pub value: ParamValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSnapshot {
    pub index: usize,
    pub name: String,
    pub kind: &'static str,
    pub is_static: bool,
    pub is_stateful: bool,
    pub inputs: Vec<String>,
    pub params: Vec<ParamSnapshot>,
}

impl StepSnapshot {
    fn capture(index: usize, step: &Step) -> Self {
        Self {
            index,
            name: step.name().to_string(),
            kind: step.kind_name(),
            is_static: step.is_static(),
            is_stateful: step.is_stateful(),
            inputs: step.inputs().to_vec(),
            params: step
                .params()
                .into_iter()
                .map(|(name, value)| ParamSnapshot { name, value })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionSnapshot {
    pub input: String,
    pub output: String,
    pub connection: Connection,
}

/// All steps in index order, followed by all connections grouped by output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchitectureSnapshot {
    pub steps: Vec<StepSnapshot>,
    pub connections: Vec<ConnectionSnapshot>,
}

impl ArchitectureSnapshot {
    pub fn capture(structure: &NeuralStructure) -> Self {
        let steps = structure
            .steps()
            .iter()
            .enumerate()
            .map(|(index, step)| StepSnapshot::capture(index, step))
            .collect();

        let name_of = |id| {
            structure
                .step(id)
                .map(|s| s.name().to_string())
                .unwrap_or_default()
        };
        let connections = structure
            .connections()
            .map(|c| ConnectionSnapshot {
                input: name_of(c.input_step),
                output: name_of(c.output_step),
                connection: c.clone(),
            })
            .collect();

        Self { steps, connections }
    }

    pub fn step(&self, name: &str) -> Option<&StepSnapshot> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn synaptic_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|c| matches!(c.connection.kind, ConnectionKind::Synaptic(_)))
            .count()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<&NeuralStructure> for ArchitectureSnapshot {
    fn from(structure: &NeuralStructure) -> Self {
        Self::capture(structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{Field, Node, Scalar};
    use crate::structure::ConnectOptions;

    fn scene() -> NeuralStructure {
        let mut ns = NeuralStructure::new();
        let f = ns.create_named("F", Field::from_sizes(&[5, 5]).unwrap());
        let n = ns.create_named("N", Node::new());
        let s = ns.create_named("S", Scalar::new(2.0));
        ns.connect(f, n, ConnectOptions::new()).unwrap();
        ns.connect(s, n, ConnectOptions::new()).unwrap();
        ns
    }

    #[test]
    fn test_capture() {
        let snapshot = ArchitectureSnapshot::capture(&scene());
        assert_eq!(snapshot.steps.len(), 3);
        assert_eq!(snapshot.connections.len(), 2);
        assert_eq!(snapshot.synaptic_count(), 1);

        let s = snapshot.step("S").unwrap();
        assert!(s.is_static);
        assert!(s
            .params
            .iter()
            .any(|p| p.name == "value" && p.value == ParamValue::Float(2.0)));

        assert_eq!(snapshot.connections[0].input, "F");
        assert_eq!(snapshot.connections[0].output, "N");
    }

    #[test]
    fn test_to_json() {
        let json = ArchitectureSnapshot::from(&scene()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["steps"][0]["name"], "F");
        assert_eq!(value["steps"][0]["kind"], "Field");
        assert_eq!(value["steps"][2]["is_static"], true);
        assert_eq!(value["connections"][0]["output"], "N");
        assert_eq!(value["connections"][0]["connection"]["contract_dimensions"][1], 1);
    }
}
