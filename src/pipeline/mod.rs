// src/pipeline/mod.rs

//! Pipeline entry points for aggregation runs.
//!
//! - `run_search`: fan out to both sources, normalize, filter, match
//! - `filter`: query constraint filtering
//! - `progress`: the event stream UI collaborators subscribe to

pub mod filter;
pub mod progress;
pub mod run;

pub use progress::{Progress, ProgressEvent, Stage};
pub use run::{RunOutcome, run_search};
