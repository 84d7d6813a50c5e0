//! Release execution: command dispatch, hook pipeline and attempt tracking

pub mod executor;
pub mod fsm;
pub mod hooks;
pub mod pipeline;

pub use executor::{Executor, Outcome};
pub use pipeline::{run_hooks, ReleaseHook};
