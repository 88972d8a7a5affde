//! Process-wide default structure
//!
//! Convenience slot for hosts that build one architecture per process.
//! Everything else in the crate takes an explicit `&mut NeuralStructure`;
//! hot reload never swaps this slot.
//!
//! ```ignore
//! use dynfield::shared;
//!
//! shared::initialize_architecture();
//! let id = shared::create(Node::new());
//! ```

use crate::connection::Connection;
use crate::error::Result;
use crate::steps::{Step, StepId, StepKind};
use crate::structure::{ConnectOptions, Endpoint, NeuralStructure};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};

/// Structure shared between threads
pub type SharedStructure = Arc<Mutex<NeuralStructure>>;

static DEFAULT_STRUCTURE: OnceLock<RwLock<SharedStructure>> = OnceLock::new();

fn slot() -> &'static RwLock<SharedStructure> {
    DEFAULT_STRUCTURE.get_or_init(|| RwLock::new(Arc::new(Mutex::new(NeuralStructure::new()))))
}

/// Lock a shared structure, recovering from a poisoned lock.
pub fn lock(shared: &SharedStructure) -> MutexGuard<'_, NeuralStructure> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the current default structure.
pub fn default_structure() -> SharedStructure {
    Arc::clone(&slot().read().unwrap_or_else(PoisonError::into_inner))
}

/// Replace the default structure, returning the new handle.
pub fn set_default_structure(ns: NeuralStructure) -> SharedStructure {
    let shared = Arc::new(Mutex::new(ns));
    *slot().write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&shared);
    shared
}

/// Start over with an empty default structure.
pub fn initialize_architecture() -> SharedStructure {
    set_default_structure(NeuralStructure::new())
}

/// Register a step in the default structure under its exact name.
pub fn add_step(step: Step) -> Result<StepId> {
    let shared = default_structure();
    let mut ns = lock(&shared);
    ns.add_step(step)
}

/// Create a step with a unique default name in the default structure.
pub fn create(kind: impl Into<StepKind>) -> StepId {
    let shared = default_structure();
    let mut ns = lock(&shared);
    ns.create(kind)
}

/// Connect two steps of the default structure.
pub fn connect(
    input: impl Into<Endpoint>,
    output: impl Into<Endpoint>,
    options: ConnectOptions,
) -> Result<Connection> {
    let shared = default_structure();
    let mut ns = lock(&shared);
    let connection = crate::structure::connect(&mut ns, input, output, options)?.clone();
    Ok(connection)
}
