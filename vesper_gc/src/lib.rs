//! Vesper garbage collector.
//!
//! An incremental tri-color mark-and-sweep collector for the playsim's
//! scripting object model. This crate is the collector core, decoupled from
//! the engine's concrete types.
//!
//! Key types:
//! - [`GcPtr<T>`]: a pointer to a managed object
//! - [`GcHeader`]: header prepended to each allocation
//! - [`Collector`]: the collector state machine
//!
//! Key traits:
//! - [`GcObject`]: implemented by each managed type; reports outgoing
//!   references and performs explicit teardown
//! - [`GcHost`]: implemented by the engine; enumerates roots and supplies
//!   the tick counter

#![no_std]
extern crate alloc;

mod collector;
mod gc_header;
mod gray_list;
mod pointer;
mod trace;

pub use collector::{Collector, GcState, GcStats, DEFAULT_PAUSE, DEFAULT_STEP_MUL};
pub use gc_header::{GcHeader, ObjectFlags};
pub use pointer::GcPtr;
pub use trace::{ClassDesc, GcHost, GcObject, Marker};

#[cfg(test)]
mod tests;
