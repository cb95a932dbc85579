/// Monitoring engine.
///
/// `checker` executes a single HTTP probe, `scheduler` owns the per-endpoint
/// check loops and on-demand checks, `types` carries the classified outcome
/// between them and into the store.
pub mod checker;
pub mod scheduler;
pub mod types;

pub use checker::Prober;
pub use scheduler::Monitor;
pub use types::ProbeOutcome;
