//! Diff and merge of two architecture versions
//!
//! [`diff`] compares the live structure against a freshly parsed one without
//! touching either. [`ChangeSet::apply`] writes the differences back into the
//! live structure through [`Step::set_param`], so step observers fire, and
//! then drives the simulator callbacks for each changed step.
//!
//! Steps are matched by name. Parameters are compared by value; composite
//! values such as kernels are replaced as a whole.
//!
//! [`Step::set_param`]: crate::steps::Step::set_param

use super::Simulator;
use crate::error::{DynfieldError, Result};
use crate::steps::{ParamValue, StepId};
use crate::structure::NeuralStructure;

/// One parameter that differs between versions
#[derive(Debug, Clone, PartialEq)]
pub struct ParamChange {
    pub param: &'static str,
    pub old: ParamValue,
    pub new: ParamValue,
}

/// All differing parameters of one step
#[derive(Debug, Clone, PartialEq)]
pub struct StepChange {
    /// Id in the live structure
    pub id: StepId,
    pub name: String,
    pub changes: Vec<ParamChange>,
}

/// Result of comparing two architecture versions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Steps present in both with differing parameters
    pub changed: Vec<StepChange>,
    /// Names only in the new version (not merged)
    pub added: Vec<String>,
    /// Names only in the live version (kept as is)
    pub dropped: Vec<String>,
}

/// Compare a live structure against a new version.
///
/// A step that keeps its name but changes kind cannot be merged in place and
/// fails the whole diff.
pub fn diff(live: &NeuralStructure, new: &NeuralStructure) -> Result<ChangeSet> {
    let mut changes = ChangeSet::default();

    for (id, old_step) in live.step_ids().zip(live.steps()) {
        let Ok(new_step) = new.get_step_by_name(old_step.name()) else {
            changes.dropped.push(old_step.name().to_string());
            continue;
        };

        if old_step.kind_name() != new_step.kind_name() {
            return Err(DynfieldError::Reload(format!(
                "step \"{}\" changed kind from {} to {}",
                old_step.name(),
                old_step.kind_name(),
                new_step.kind_name()
            )));
        }

        let param_changes: Vec<ParamChange> = old_step
            .params()
            .into_iter()
            .zip(new_step.params())
            .filter(|((_, old), (_, new))| old != new)
            .map(|((param, old), (_, new))| ParamChange { param, old, new })
            .collect();

        if !param_changes.is_empty() {
            changes.changed.push(StepChange {
                id,
                name: old_step.name().to_string(),
                changes: param_changes,
            });
        }
    }

    changes.added = new
        .steps()
        .iter()
        .filter(|s| !live.contains_name(s.name()))
        .map(|s| s.name().to_string())
        .collect();

    Ok(changes)
}

impl ChangeSet {
    /// No step parameters differ.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn changed_param_count(&self) -> usize {
        self.changed.iter().map(|c| c.changes.len()).sum()
    }

    /// Write changed values into `live` and notify the simulator.
    ///
    /// Every target step is checked before the first write. Returns the
    /// number of steps updated.
    pub fn apply(&self, live: &mut NeuralStructure, simulator: &mut dyn Simulator) -> Result<usize> {
        for change in &self.changed {
            match live.step(change.id) {
                Some(step) if step.name() == change.name => {}
                _ => {
                    return Err(DynfieldError::Reload(format!(
                        "step \"{}\" is no longer at {} in the live structure",
                        change.name, change.id
                    )))
                }
            }
        }

        for name in &self.added {
            log::warn!("Step \"{}\" was added to the architecture; restart to pick it up", name);
        }
        for name in &self.dropped {
            log::warn!("Step \"{}\" was removed from the architecture; keeping the live step", name);
        }

        for change in &self.changed {
            for param in &change.changes {
                log::debug!("{}.{}: {:?} -> {:?}", change.name, param.param, param.old, param.new);
                live.set_param(change.id, param.param, param.new.clone())?;
            }

            let Some(step) = live.step(change.id) else {
                continue;
            };
            simulator.prepare_constants_and_variables_for_step(change.id, step);
            simulator.prepare_time_invariant_tensors_for_step(change.id, step);
            if step.is_static() {
                simulator.reset_step_to_initial_value(change.id, step);
            }
        }

        Ok(self.changed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::simulator::testing::RecordingSimulator;
    use crate::steps::{Field, GaussInput, Node, Scalar, Step};
    use crate::structure::ConnectOptions;
    use std::sync::{Arc, Mutex};

    fn build(resting_level: f64, scalar: f64) -> NeuralStructure {
        let mut ns = NeuralStructure::new();
        let f = ns.create_named(
            "F",
            Field::from_sizes(&[11]).unwrap().with_resting_level(resting_level),
        );
        let n = ns.create_named("N", Node::new());
        ns.create_named("S", Scalar::new(scalar));
        ns.connect(f, n, ConnectOptions::new()).unwrap();
        ns
    }

    #[test]
    fn test_merge_updates_only_changed_step() {
        let mut live = build(-5.0, 1.0);
        let new = build(-3.0, 1.0);

        let notified = Arc::new(Mutex::new(Vec::new()));
        for id in live.step_ids().collect::<Vec<_>>() {
            let n = Arc::clone(&notified);
            live.step_mut(id)
                .unwrap()
                .register_observer(move |s, p| n.lock().unwrap().push(format!("{}.{}", s.name(), p)));
        }

        let changes = diff(&live, &new).unwrap();
        assert_eq!(changes.changed.len(), 1);
        assert_eq!(changes.changed[0].name, "F");
        assert_eq!(changes.changed[0].changes[0].param, "resting_level");
        assert_eq!(changes.changed_param_count(), 1);

        let mut sim = RecordingSimulator::default();
        assert_eq!(changes.apply(&mut live, &mut sim).unwrap(), 1);

        assert_eq!(
            live.get_step_by_name("F").unwrap().param("resting_level"),
            Some(ParamValue::Float(-3.0))
        );
        assert_eq!(sim.calls_for("F"), vec!["constants", "tensors"]);
        assert!(sim.calls_for("N").is_empty());
        assert!(sim.calls_for("S").is_empty());
        assert_eq!(*notified.lock().unwrap(), vec!["F.resting_level"]);
    }

    #[test]
    fn test_static_step_is_reset() {
        let mut live = build(-5.0, 1.0);
        let new = build(-5.0, 2.5);
        let mut sim = RecordingSimulator::default();
        diff(&live, &new).unwrap().apply(&mut live, &mut sim).unwrap();
        assert_eq!(sim.calls_for("S"), vec!["constants", "tensors", "reset"]);
    }

    #[test]
    fn test_identical_versions_are_empty() {
        let live = build(-5.0, 1.0);
        let changes = diff(&live, &build(-5.0, 1.0)).unwrap();
        assert!(changes.is_empty());
        assert!(changes.added.is_empty());
        assert!(changes.dropped.is_empty());
    }

    #[test]
    fn test_added_and_dropped_are_reported_not_merged() {
        let mut live = build(-5.0, 1.0);
        live.create_named("old", Node::new());
        let mut new = build(-5.0, 1.0);
        new.create_named("fresh", Node::new());

        let changes = diff(&live, &new).unwrap();
        assert_eq!(changes.added, vec!["fresh"]);
        assert_eq!(changes.dropped, vec!["old"]);

        changes.apply(&mut live, &mut RecordingSimulator::default()).unwrap();
        assert!(live.get_step_by_name("fresh").is_err());
        assert!(live.get_step_by_name("old").is_ok());
    }

    #[test]
    fn test_kind_change_fails() {
        let mut live = NeuralStructure::new();
        live.add_step(Step::new("X", Node::new())).unwrap();
        let mut new = NeuralStructure::new();
        new.add_step(Step::new("X", GaussInput::from_sizes(&[5]).unwrap())).unwrap();

        let err = diff(&live, &new).unwrap_err();
        assert!(matches!(err, DynfieldError::Reload(_)));
    }

    #[test]
    fn test_kernel_replaced_wholesale() {
        let mut live = NeuralStructure::new();
        live.create_named("F", Field::from_sizes(&[11]).unwrap());
        let mut new = NeuralStructure::new();
        let kernel = crate::weights::WeightPattern::gauss(1.0, vec![2.0]);
        new.create_named("F", Field::from_sizes(&[11]).unwrap().with_interaction_kernel(kernel.clone()));

        let changes = diff(&live, &new).unwrap();
        changes.apply(&mut live, &mut RecordingSimulator::default()).unwrap();
        assert_eq!(
            live.get_step_by_name("F").unwrap().param("interaction_kernel"),
            Some(ParamValue::Kernel(Some(kernel)))
        );
    }

    #[test]
    fn test_apply_checks_targets_first() {
        let live = build(-5.0, 1.0);
        let changes = diff(&live, &build(-1.0, 1.0)).unwrap();

        // Different structure where id 0 is not "F"
        let mut other = NeuralStructure::new();
        other.create_named("G", Field::from_sizes(&[11]).unwrap());
        assert!(changes.apply(&mut other, &mut RecordingSimulator::default()).is_err());
        assert_eq!(
            other.get_step_by_name("G").unwrap().param("resting_level"),
            Some(ParamValue::Float(-5.0))
        );
    }
}
