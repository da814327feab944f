//! The crawl engine and its construction.
//!
//! Split the way the work splits: [`core`] owns the queue, dispatcher and
//! lifecycle; `process` holds the per-request state machine; `items` the
//! pipeline traversal; [`builder`] the assembly; [`yielder`] the
//! capability components use to emit new work.

mod builder;
mod core;
mod items;
mod process;
mod yielder;

pub use builder::EngineBuilder;
pub use core::Engine;
pub use yielder::{Yield, Yielder};
