//! Hot reload of architecture files
//!
//! Patch a running simulation when its architecture file changes, without
//! rebuilding the simulator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              ArchitectureMonitor                │
//! ├─────────────────────────────────────────────────┤
//! │  Watcher thread ──paths──▶ poll_reload()        │
//! │                                                 │
//! │  1. File change detected (debounced)            │
//! │  2. Parse into a new, independent structure     │
//! │  3. diff(live, new) -> ChangeSet                │
//! │  4. Write changed parameters into live steps    │
//! │  5. Simulator rebuilds tensors per changed step │
//! │  6. Emit reload event                           │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Steps 2 and 3 never touch the live structure; any failure there aborts
//! the reload with the live structure intact.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dynfield::reload::ReloadableArchitecture;
//!
//! let mut arch = ReloadableArchitecture::from_file("scene.dfa")?;
//! let mut sim = MySimulator::compile(arch.structure());
//!
//! loop {
//!     arch.check_reload(&mut sim)?;   // between ticks
//!     sim.step(arch.structure());
//! }
//! ```

mod merge;
mod monitor;
mod simulator;

pub use merge::{diff, ChangeSet, ParamChange, StepChange};
pub use monitor::{ArchitectureMonitor, MonitorState, ReloadEvent, ReloadableArchitecture};
pub use simulator::{NullSimulator, Simulator};

use crate::config::ArchConfig;
use crate::error::Result;
use crate::ir::{ArchitectureParser, ParseMode};
use crate::structure::NeuralStructure;

/// Parse `source` as a new version of `live` and merge it in.
///
/// `.config` in the source is ignored; `config` (the live configuration)
/// governs kernel truncation of the new version.
pub fn merge_source(
    live: &mut NeuralStructure,
    source: &str,
    config: &ArchConfig,
    simulator: &mut dyn Simulator,
) -> Result<ChangeSet> {
    let new = ArchitectureParser::with_config(ParseMode::Reload, config.clone()).parse(source)?;
    let changes = diff(live, &new.structure)?;
    changes.apply(live, simulator)?;
    Ok(changes)
}
