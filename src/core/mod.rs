//! Session orchestration
//!
//! Decides when to request new dialogue, what context to send with it and
//! how judge input feeds the next round.

mod debounce;
mod gate;
mod live;
mod orchestrator;

pub use debounce::DEFAULT_DEBOUNCE;
pub use live::{LiveSession, SessionSettings};
